//! Point classification engine
//!
//! Turns raw POS rows into [`Stage1Row`]s. Rows are processed strictly in
//! order: every accepted row is recorded with the repurchase resolver before
//! the next one is looked at, so repeated lines of one spreadsheet see each
//! other.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::category::{self, determine_category};
use crate::config::{ClassificationConfig, ColumnNames};
use crate::dates::{display_date, from_excel_serial, normalize_date, to_roc_compact};
use crate::error::Result;
use crate::grouping::normalize;
use crate::models::StaffRole;
use crate::points::{PointStatus, Stage1Row};
use crate::resolver::{transaction_identity, RepurchaseResolver};
use crate::rows::{RawRow, RawValue};
use crate::staff::StaffDirectory;

/// Customer id some POS exports write for walk-in sales
const UNDEFINED_CUSTOMER: &str = "undefined";

/// Why a raw row was left out of classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingCustomer,
    MissingItem,
    MissingSalesPerson,
    ZeroPrice,
    ZeroPoints,
    PharmacistOnlyItem,
    ExcludedMilkUnit,
    OutstandingDebt,
    NoBonusStaff,
}

/// Output of one classification run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    /// Accepted rows, sorted by category priority then display date
    pub rows: Vec<Stage1Row>,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl Classification {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Date cell as text: spreadsheet serials and numbers are converted first
pub fn date_text(value: Option<&RawValue>) -> String {
    match value {
        Some(RawValue::Number(n)) if *n > 0.0 && *n < 100_000.0 => from_excel_serial(*n)
            .map(to_roc_compact)
            .unwrap_or_else(|| n.to_string()),
        Some(v) => normalize_date(&v.as_text()),
        None => String::new(),
    }
}

/// Whether a debt cell marks an outstanding balance
fn has_debt(value: Option<&RawValue>) -> bool {
    match value {
        Some(RawValue::Number(n)) => *n != 0.0,
        Some(RawValue::Text(s)) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s == "否" || s.eq_ignore_ascii_case("n"))
        }
        None => false,
    }
}

/// Classifies POS rows for every staff member in one pass
pub struct Classifier<'a> {
    columns: &'a ColumnNames,
    rules: &'a ClassificationConfig,
    staff: &'a StaffDirectory,
}

impl<'a> Classifier<'a> {
    pub fn new(
        columns: &'a ColumnNames,
        rules: &'a ClassificationConfig,
        staff: &'a StaffDirectory,
    ) -> Self {
        Self {
            columns,
            rules,
            staff,
        }
    }

    /// Classify rows in order, consulting and feeding the resolver
    pub fn classify(
        &self,
        rows: &[RawRow],
        resolver: &mut RepurchaseResolver<'_>,
    ) -> Result<Classification> {
        let mut result = Classification::default();

        for (i, raw) in rows.iter().enumerate() {
            match self.accept(raw) {
                Err(reason) => {
                    debug!("Dropping row {}: {:?}", i + 2, reason);
                    *result.dropped.entry(reason).or_default() += 1;
                }
                Ok(accepted) => {
                    let id = result.rows.len();
                    let row = self.classify_row(id, accepted, resolver)?;
                    result.rows.push(row);
                }
            }
        }

        result
            .rows
            .sort_by(|a, b| {
                category::category_order(&a.category)
                    .cmp(&category::category_order(&b.category))
                    .then_with(|| a.display_date.cmp(&b.display_date))
            });

        info!(
            "Classified {} rows ({} dropped)",
            result.rows.len(),
            result.dropped_total()
        );
        Ok(result)
    }

    /// Apply the acceptance filters in order
    fn accept(&self, raw: &RawRow) -> std::result::Result<Accepted, DropReason> {
        let cols = self.columns;

        let customer_id = raw
            .text(&cols.customer_id)
            .filter(|c| c != UNDEFINED_CUSTOMER)
            .ok_or(DropReason::MissingCustomer)?;
        let item_id = raw
            .text(&cols.item_id)
            .filter(|id| !normalize(id).is_empty())
            .ok_or(DropReason::MissingItem)?;
        let sales_person = raw
            .text(&cols.sales_person)
            .ok_or(DropReason::MissingSalesPerson)?;

        let role = self.staff.role_of(&sales_person);
        let quantity = raw.number(&cols.quantity).unwrap_or(0.0).round() as i64;
        let points = raw.number(&cols.points).unwrap_or(0.0).round() as i64;
        let is_return = quantity < 0;

        if raw.number(&cols.unit_price).unwrap_or(0.0) == 0.0 {
            return Err(DropReason::ZeroPrice);
        }
        if points == 0 && !(role == StaffRole::Pharmacist && is_return) {
            return Err(DropReason::ZeroPoints);
        }

        let normalized_item = normalize(&item_id);
        if role == StaffRole::Sales
            && self
                .rules
                .pharmacist_only_items
                .iter()
                .any(|id| normalize(id) == normalized_item)
        {
            return Err(DropReason::PharmacistOnlyItem);
        }

        let item_name = raw.text(&cols.item_name).unwrap_or_default();
        let natural_category = determine_category(
            &raw.text(&cols.category).unwrap_or_default(),
            &item_name,
        );
        let unit = raw.text(&cols.unit);
        if natural_category == self.rules.milk_category
            && unit
                .as_deref()
                .is_some_and(|u| self.rules.excluded_milk_units.iter().any(|x| x == u))
        {
            return Err(DropReason::ExcludedMilkUnit);
        }

        if !is_return && has_debt(raw.get(&cols.debt)) {
            return Err(DropReason::OutstandingDebt);
        }
        if role == StaffRole::NoBonus {
            return Err(DropReason::NoBonusStaff);
        }

        Ok(Accepted {
            sales_person,
            role,
            date: date_text(raw.get(&cols.date)),
            customer_id,
            customer_name: raw.text(&cols.customer_name),
            item_id,
            item_name,
            quantity,
            unit,
            amount: raw.number(&cols.amount).unwrap_or(0.0),
            ticket_no: raw.text(&cols.ticket_no),
            points,
            natural_category,
        })
    }

    fn classify_row(
        &self,
        id: usize,
        row: Accepted,
        resolver: &mut RepurchaseResolver<'_>,
    ) -> Result<Stage1Row> {
        let identity = transaction_identity(row.ticket_no.as_deref(), &row.date);

        let status = if row.quantity < 0 {
            PointStatus::Return
        } else if category::is_repurchase_exempt(row.role, &row.natural_category)
            || category::is_zero_point(&row.natural_category)
        {
            PointStatus::Develop
        } else if resolver.is_repurchase(&row.customer_id, &row.item_id, &identity)? {
            PointStatus::Repurchase
        } else {
            PointStatus::Develop
        };

        if row.quantity > 0 {
            resolver.record(&row.customer_id, &row.item_id, &identity);
        }

        Ok(Stage1Row {
            id,
            display_date: display_date(&row.date),
            sales_person: row.sales_person,
            role: row.role,
            date: row.date,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            item_id: row.item_id,
            item_name: row.item_name,
            quantity: row.quantity,
            unit: row.unit,
            amount: row.amount,
            ticket_no: row.ticket_no,
            original_points: row.points,
            category: row.natural_category.clone(),
            natural_category: row.natural_category,
            auto_status: status,
            status,
            original_developer: None,
            repurchase_type: None,
            return_target: None,
            manual_points: None,
        })
    }
}

/// A raw row that passed the filters
struct Accepted {
    sales_person: String,
    role: StaffRole,
    date: String,
    customer_id: String,
    customer_name: Option<String>,
    item_id: String,
    item_name: String,
    quantity: i64,
    unit: Option<String>,
    amount: f64,
    ticket_no: Option<String>,
    points: i64,
    natural_category: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ADULT_DRINK, ADULT_FORMULA, DISPENSING, INFANT_FORMULA};
    use crate::grouping::ProductGroupIndex;
    use crate::models::Staff;
    use crate::resolver::NoHistory;

    fn sale(person: &str, customer: &str, item: &str, cat: &str, qty: f64, points: f64) -> RawRow {
        let cols = ColumnNames::default();
        RawRow::new()
            .with_text(&cols.sales_person, person)
            .with_text(&cols.customer_id, customer)
            .with_text(&cols.item_id, item)
            .with_text(&cols.item_name, "商品")
            .with_text(&cols.category, cat)
            .with_text(&cols.date, "1130305")
            .with_number(&cols.quantity, qty)
            .with_number(&cols.points, points)
            .with_number(&cols.unit_price, 100.0)
            .with_number(&cols.amount, 100.0 * qty)
    }

    fn pharmacist_directory() -> StaffDirectory {
        StaffDirectory::new(vec![
            Staff {
                id: "1".to_string(),
                name: "陳藥師".to_string(),
                role: StaffRole::Pharmacist,
                branch: None,
                customer_id: None,
                points_standard: None,
                cosmetic_standard: None,
            },
            Staff {
                id: "2".to_string(),
                name: "店長".to_string(),
                role: StaffRole::NoBonus,
                branch: None,
                customer_id: None,
                points_standard: None,
                cosmetic_standard: None,
            },
        ])
    }

    fn run(rows: &[RawRow], staff: &StaffDirectory, rules: &ClassificationConfig) -> Classification {
        let cols = ColumnNames::default();
        let index = ProductGroupIndex::empty();
        let mut resolver = RepurchaseResolver::new(&NoHistory, &index);
        Classifier::new(&cols, rules, staff)
            .classify(rows, &mut resolver)
            .unwrap()
    }

    #[test]
    fn test_acceptance_filters() {
        let cols = ColumnNames::default();
        let rules = ClassificationConfig {
            pharmacist_only_items: vec!["0900".to_string()],
            ..Default::default()
        };
        let staff = pharmacist_directory();
        let rows = vec![
            sale("王", "undefined", "1", "1", 1.0, 10.0),
            sale("王", "C1", "1", "1", 1.0, 0.0),
            sale("王", "C1", "1", "1", 1.0, 10.0).with_number(&cols.unit_price, 0.0),
            sale("王", "C1", "900", "1", 1.0, 10.0),
            sale("王", "C1", "2", "3", 1.0, 10.0).with_text(&cols.unit, "罐"),
            sale("王", "C1", "3", "1", 1.0, 10.0).with_number(&cols.debt, 50.0),
            sale("店長", "C1", "4", "1", 1.0, 10.0),
            // Accepted: pharmacist may sell the exclusive item, returns tolerate debt
            sale("陳藥師", "C2", "900", "1", 1.0, 10.0),
            sale("王", "C3", "5", "1", -1.0, -10.0).with_number(&cols.debt, 50.0),
            // Pharmacist returns with zero points are kept
            sale("陳藥師", "C4", "6", "6", -1.0, 0.0),
        ];

        let result = run(&rows, &staff, &rules);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.dropped[&DropReason::MissingCustomer], 1);
        assert_eq!(result.dropped[&DropReason::ZeroPoints], 1);
        assert_eq!(result.dropped[&DropReason::ZeroPrice], 1);
        assert_eq!(result.dropped[&DropReason::PharmacistOnlyItem], 1);
        assert_eq!(result.dropped[&DropReason::ExcludedMilkUnit], 1);
        assert_eq!(result.dropped[&DropReason::OutstandingDebt], 1);
        assert_eq!(result.dropped[&DropReason::NoBonusStaff], 1);
    }

    #[test]
    fn test_milk_in_boxes_is_kept() {
        let cols = ColumnNames::default();
        let rows = vec![sale("王", "C1", "2", "3", 1.0, 12.0).with_text(&cols.unit, "箱")];
        let result = run(&rows, &StaffDirectory::default(), &ClassificationConfig::default());
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].natural_category, ADULT_DRINK);
    }

    #[test]
    fn test_status_assignment() {
        let cols = ColumnNames::default();
        let rows = vec![
            sale("王", "C1", "100", "2", 3.0, 11.0).with_text(&cols.ticket_no, "T1"),
            sale("王", "C1", "100", "2", 3.0, 11.0).with_text(&cols.ticket_no, "T2"),
            sale("王", "C1", "100", "2", -1.0, -4.0).with_text(&cols.ticket_no, "T3"),
        ];
        let result = run(&rows, &StaffDirectory::default(), &ClassificationConfig::default());

        let by_id = |id: usize| result.rows.iter().find(|r| r.id == id).unwrap();
        assert_eq!(by_id(0).status, PointStatus::Develop);
        assert_eq!(by_id(0).calculated_points(), 3);
        assert_eq!(by_id(1).status, PointStatus::Repurchase);
        assert_eq!(by_id(1).calculated_points(), 1);
        assert_eq!(by_id(2).status, PointStatus::Return);
        // Untargeted returns keep their product category
        assert_eq!(by_id(2).category, ADULT_FORMULA);
        assert_eq!(by_id(2).calculated_points(), -4);
    }

    #[test]
    fn test_dispensing_exempt_from_repurchase() {
        let cols = ColumnNames::default();
        let rows = vec![
            sale("陳藥師", "C1", "50", "7", 1.0, 30.0).with_text(&cols.ticket_no, "T1"),
            sale("陳藥師", "C1", "50", "7", 1.0, 30.0).with_text(&cols.ticket_no, "T2"),
        ];
        let result = run(&rows, &pharmacist_directory(), &ClassificationConfig::default());
        assert!(result
            .rows
            .iter()
            .all(|r| r.status == PointStatus::Develop && r.natural_category == DISPENSING));
    }

    #[test]
    fn test_sorted_by_category_then_date() {
        let cols = ColumnNames::default();
        let rows = vec![
            sale("王", "C1", "1", "2", 1.0, 5.0).with_text(&cols.date, "1130310"),
            sale("王", "C2", "2", "1", 1.0, 5.0).with_text(&cols.date, "1130320"),
            sale("王", "C3", "3", "1", 1.0, 5.0).with_text(&cols.date, "1130301"),
            sale("王", "C4", "4", "ZZ", 1.0, 5.0).with_text(&cols.date, "1130101"),
        ];
        let result = run(&rows, &StaffDirectory::default(), &ClassificationConfig::default());
        let order: Vec<(&str, &str)> = result
            .rows
            .iter()
            .map(|r| (r.category.as_str(), r.display_date.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (INFANT_FORMULA, "03/01"),
                (INFANT_FORMULA, "03/20"),
                (ADULT_FORMULA, "03/10"),
                ("ZZ", "01/01"),
            ]
        );
    }

    #[test]
    fn test_date_text() {
        assert_eq!(date_text(Some(&RawValue::Number(45356.0))), "1130305");
        assert_eq!(date_text(Some(&RawValue::Number(1130305.0))), "1130305");
        assert_eq!(date_text(Some(&RawValue::Text("2024/03/05".into()))), "1130305");
        assert_eq!(date_text(None), "");
    }
}

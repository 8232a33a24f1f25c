//! Cash/voucher rewards and cosmetic brand subtotals
//!
//! Both are plain aggregations over the raw rows, independent of the
//! repurchase logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{determine_category, COSMETICS};
use crate::classify::date_text;
use crate::config::ColumnNames;
use crate::grouping::normalize;
use crate::models::StaffRole;
use crate::rows::RawRow;
use crate::staff::StaffDirectory;

/// Brand bucket for cosmetics matching no configured brand
pub const OTHER_BRAND: &str = "其他品牌";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    #[default]
    Cash,
    Voucher,
}

impl RewardKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "現金",
            Self::Voucher => "禮券",
        }
    }
}

/// A per-item reward paid for every unit sold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRule {
    pub item_id: String,
    /// Reward per unit
    pub reward: f64,
    #[serde(default)]
    pub kind: RewardKind,
}

/// A cosmetic brand recognized by keywords in the item name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticBrand {
    pub name: String,
    pub keywords: Vec<String>,
}

/// A sales line that matched a reward rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Row {
    pub sales_person: String,
    pub date: String,
    pub customer_id: Option<String>,
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub reward_per_unit: f64,
    pub kind: RewardKind,
    /// User-entered amount replacing quantity x reward
    pub custom_reward: Option<f64>,
}

impl Stage2Row {
    pub fn total(&self) -> f64 {
        self.custom_reward
            .unwrap_or(self.quantity as f64 * self.reward_per_unit)
    }
}

/// Cosmetic sales of one person, per brand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage3Summary {
    pub sales_person: String,
    pub brands: BTreeMap<String, f64>,
}

impl Stage3Summary {
    pub fn total(&self) -> f64 {
        self.brands.values().sum()
    }
}

fn bonus_person(row: &RawRow, columns: &ColumnNames, staff: &StaffDirectory) -> Option<String> {
    row.text(&columns.sales_person)
        .filter(|name| staff.role_of(name) != StaffRole::NoBonus)
}

/// Match rows against the reward rules
pub fn build_stage2(
    rows: &[RawRow],
    columns: &ColumnNames,
    rules: &[RewardRule],
    staff: &StaffDirectory,
) -> Vec<Stage2Row> {
    if rules.is_empty() {
        return Vec::new();
    }
    let by_item: BTreeMap<String, &RewardRule> =
        rules.iter().map(|r| (normalize(&r.item_id), r)).collect();

    rows.iter()
        .filter_map(|row| {
            let item_id = row.text(&columns.item_id)?;
            let rule = by_item.get(&normalize(&item_id))?;
            let sales_person = bonus_person(row, columns, staff)?;
            let quantity = row.number(&columns.quantity).unwrap_or(0.0).round() as i64;
            if quantity == 0 {
                return None;
            }
            Some(Stage2Row {
                sales_person,
                date: date_text(row.get(&columns.date)),
                customer_id: row.text(&columns.customer_id),
                item_id,
                item_name: row.text(&columns.item_name).unwrap_or_default(),
                quantity,
                reward_per_unit: rule.reward,
                kind: rule.kind,
                custom_reward: None,
            })
        })
        .collect()
}

/// Brand of a cosmetic item by the first matching keyword
pub fn brand_of<'a>(item_name: &str, brands: &'a [CosmeticBrand]) -> &'a str {
    brands
        .iter()
        .find(|b| b.keywords.iter().any(|k| !k.is_empty() && item_name.contains(k.as_str())))
        .map(|b| b.name.as_str())
        .unwrap_or(OTHER_BRAND)
}

/// Sum cosmetic sales amounts per person and brand
pub fn build_stage3(
    rows: &[RawRow],
    columns: &ColumnNames,
    brands: &[CosmeticBrand],
    staff: &StaffDirectory,
) -> Vec<Stage3Summary> {
    let mut by_person: BTreeMap<String, Stage3Summary> = BTreeMap::new();

    for row in rows {
        let item_name = row.text(&columns.item_name).unwrap_or_default();
        let category = determine_category(
            &row.text(&columns.category).unwrap_or_default(),
            &item_name,
        );
        if category != COSMETICS {
            continue;
        }
        let Some(person) = bonus_person(row, columns, staff) else {
            continue;
        };

        let amount = row.number(&columns.amount).unwrap_or(0.0);
        let summary = by_person
            .entry(person.clone())
            .or_insert_with(|| Stage3Summary {
                sales_person: person,
                brands: BTreeMap::new(),
            });
        *summary
            .brands
            .entry(brand_of(&item_name, brands).to_string())
            .or_default() += amount;
    }

    by_person.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(person: &str, item: &str, name: &str, cat: &str, qty: f64, amount: f64) -> RawRow {
        let cols = ColumnNames::default();
        RawRow::new()
            .with_text(&cols.sales_person, person)
            .with_text(&cols.customer_id, "C1")
            .with_text(&cols.item_id, item)
            .with_text(&cols.item_name, name)
            .with_text(&cols.category, cat)
            .with_number(&cols.quantity, qty)
            .with_number(&cols.amount, amount)
    }

    #[test]
    fn test_stage2_rewards() {
        let cols = ColumnNames::default();
        let rules = vec![
            RewardRule {
                item_id: "0500".to_string(),
                reward: 20.0,
                kind: RewardKind::Cash,
            },
            RewardRule {
                item_id: "600".to_string(),
                reward: 50.0,
                kind: RewardKind::Voucher,
            },
        ];
        let rows = vec![
            row("王", "500", "益生菌", "5", 3.0, 900.0),
            row("王", "600", "魚油", "5", -1.0, -500.0),
            row("王", "700", "維他命", "5", 2.0, 400.0),
        ];

        let mut stage2 = build_stage2(&rows, &cols, &rules, &StaffDirectory::default());
        assert_eq!(stage2.len(), 2);
        assert_eq!(stage2[0].total(), 60.0);
        assert_eq!(stage2[1].total(), -50.0);
        assert_eq!(stage2[1].kind, RewardKind::Voucher);

        stage2[0].custom_reward = Some(100.0);
        assert_eq!(stage2[0].total(), 100.0);
    }

    #[test]
    fn test_stage3_brand_subtotals() {
        let cols = ColumnNames::default();
        let brands = vec![CosmeticBrand {
            name: "理膚寶水".to_string(),
            keywords: vec!["理膚".to_string(), "LRP".to_string()],
        }];
        let rows = vec![
            row("王", "1", "理膚寶水 B5 修復霜", "10", 1.0, 680.0),
            row("王", "2", "LRP 防曬", "10", 1.0, 750.0),
            row("王", "3", "小眾品牌 乳液", "10", 1.0, 300.0),
            row("王", "4", "奶粉", "1", 1.0, 999.0),
            row("李", "2", "LRP 防曬", "10", 2.0, 1500.0),
        ];

        let stage3 = build_stage3(&rows, &cols, &brands, &StaffDirectory::default());
        assert_eq!(stage3.len(), 2);
        let wang = stage3.iter().find(|s| s.sales_person == "王").unwrap();
        assert_eq!(wang.brands["理膚寶水"], 1430.0);
        assert_eq!(wang.brands[OTHER_BRAND], 300.0);
        assert_eq!(wang.total(), 1730.0);
    }
}

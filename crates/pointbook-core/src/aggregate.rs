//! Per-person aggregation and the repurchase matrix
//!
//! A person's sheet holds their own DEVELOP, HALF_YEAR and RETURN rows,
//! minus returns transferred to somebody else, plus returns transferred to
//! them. Transferred returns are recomputed in the receiving person's role
//! context. REPURCHASE rows are reported through the matrix instead.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{compare_staff_ids, Staff, StaffRole};
use crate::points::{normalize_person, PointStatus, Stage1Row};
use crate::rewards::{RewardKind, Stage2Row, Stage3Summary};
use crate::staff::StaffDirectory;

/// Everything exported for one staff member
#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
    pub name: String,
    /// Directory entry, when the person is listed
    pub staff: Option<Staff>,
    pub role: StaffRole,
    /// Rows on this person's own sheet
    pub rows: Vec<Stage1Row>,
    /// Returns of other sellers transferred to this person
    pub incoming_returns: Vec<Stage1Row>,
    pub develop_points: i64,
    pub half_year_points: i64,
    /// Own returns, transferred ones excluded
    pub return_points: i64,
    pub incoming_return_points: i64,
    pub develop_count: usize,
    pub return_count: usize,
    /// Own REPURCHASE rows (not on the sheet)
    pub repurchase_count: usize,
    pub repurchase_points: i64,
    pub category_points: BTreeMap<String, i64>,
    pub rewards: Vec<Stage2Row>,
    pub cash_reward: f64,
    pub voucher_reward: f64,
    pub cosmetics: Stage3Summary,
}

impl PersonSummary {
    fn new(name: &str, directory: &StaffDirectory) -> Self {
        let staff = directory.get(name).cloned();
        Self {
            name: name.to_string(),
            role: staff.as_ref().map(|s| s.role).unwrap_or_default(),
            staff,
            rows: Vec::new(),
            incoming_returns: Vec::new(),
            develop_points: 0,
            half_year_points: 0,
            return_points: 0,
            incoming_return_points: 0,
            develop_count: 0,
            return_count: 0,
            repurchase_count: 0,
            repurchase_points: 0,
            category_points: BTreeMap::new(),
            rewards: Vec::new(),
            cash_reward: 0.0,
            voucher_reward: 0.0,
            cosmetics: Stage3Summary {
                sales_person: name.to_string(),
                brands: BTreeMap::new(),
            },
        }
    }

    /// Own sheet points plus incoming transferred returns
    pub fn total_points(&self) -> i64 {
        self.develop_points + self.half_year_points + self.return_points + self.incoming_return_points
    }

    pub fn reward_total(&self) -> f64 {
        self.cash_reward + self.voucher_reward
    }

    pub fn cosmetic_total(&self) -> f64 {
        self.cosmetics.total()
    }

    pub fn points_standard(&self) -> Option<f64> {
        self.staff.as_ref().and_then(|s| s.points_standard)
    }

    pub fn cosmetic_standard(&self) -> Option<f64> {
        self.staff.as_ref().and_then(|s| s.cosmetic_standard)
    }

    /// Points still missing to reach the standard (0 once reached)
    pub fn points_gap(&self) -> Option<f64> {
        self.points_standard()
            .map(|standard| (standard - self.total_points() as f64).max(0.0))
    }

    pub fn cosmetic_gap(&self) -> Option<f64> {
        self.cosmetic_standard()
            .map(|standard| (standard - self.cosmetic_total()).max(0.0))
    }

    fn add_own(&mut self, row: &Stage1Row) {
        let points = row.calculated_points();
        match row.status {
            PointStatus::Develop => {
                self.develop_points += points;
                self.develop_count += 1;
            }
            PointStatus::HalfYear => {
                self.half_year_points += points;
                self.develop_count += 1;
            }
            PointStatus::Return => {
                self.return_points += points;
                self.return_count += 1;
            }
            PointStatus::Repurchase | PointStatus::Delete => return,
        }
        *self.category_points.entry(row.category.clone()).or_default() += points;
        self.rows.push(row.clone());
    }

    /// Transferred return, already recomputed under this person's role
    fn add_incoming(&mut self, row: Stage1Row) {
        let points = row.calculated_points();
        self.incoming_return_points += points;
        self.return_count += 1;
        *self.category_points.entry(row.category.clone()).or_default() += points;
        self.incoming_returns.push(row);
    }
}

fn compare_people(a: &PersonSummary, b: &PersonSummary) -> Ordering {
    match (&a.staff, &b.staff) {
        (Some(x), Some(y)) => compare_staff_ids(&x.id, &y.id),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// A transferred return as it lands on the target's ledger: both the
/// target's share and the developer's share come from the target's role
fn in_target_context(row: &Stage1Row, target: &str, directory: &StaffDirectory) -> Stage1Row {
    let mut row = row.clone();
    row.role = directory.role_of(target);
    row
}

fn person_entry<'m>(
    people: &'m mut HashMap<String, PersonSummary>,
    name: &str,
    directory: &StaffDirectory,
) -> &'m mut PersonSummary {
    people
        .entry(name.to_string())
        .or_insert_with(|| PersonSummary::new(name, directory))
}

/// Group classified rows, rewards and cosmetics by person
///
/// Returned in staff id order; people missing from the directory come last.
pub fn aggregate(
    rows: &[Stage1Row],
    stage2: &[Stage2Row],
    stage3: &[Stage3Summary],
    directory: &StaffDirectory,
) -> Vec<PersonSummary> {
    let mut people: HashMap<String, PersonSummary> = HashMap::new();

    for row in rows {
        if row.status == PointStatus::Delete {
            continue;
        }
        if row.status == PointStatus::Repurchase {
            let person = person_entry(&mut people, &row.sales_person, directory);
            person.repurchase_count += 1;
            person.repurchase_points += row.calculated_points();
            continue;
        }

        match row.outgoing_target() {
            Some(target) if row.status == PointStatus::Return => {
                person_entry(&mut people, &row.sales_person, directory);
                let incoming = in_target_context(row, target, directory);
                person_entry(&mut people, target, directory).add_incoming(incoming);
            }
            _ => person_entry(&mut people, &row.sales_person, directory).add_own(row),
        }
    }

    for reward in stage2 {
        let person = person_entry(&mut people, &reward.sales_person, directory);
        match reward.kind {
            RewardKind::Cash => person.cash_reward += reward.total(),
            RewardKind::Voucher => person.voucher_reward += reward.total(),
        }
        person.rewards.push(reward.clone());
    }

    for summary in stage3 {
        person_entry(&mut people, &summary.sales_person, directory).cosmetics = summary.clone();
    }

    let mut people: Vec<PersonSummary> = people.into_values().collect();
    people.sort_by(compare_people);
    people
}

/// One seller's line of the repurchase matrix
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub seller: String,
    /// Developer name -> credit
    pub credits: BTreeMap<String, i64>,
    pub total: i64,
}

/// Cross-tabulation of developer credit: sellers x named developers
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepurchaseMatrix {
    /// Column order
    pub developers: Vec<String>,
    pub rows: Vec<MatrixRow>,
    pub totals: BTreeMap<String, i64>,
    pub grand_total: i64,
}

impl RepurchaseMatrix {
    /// Credit each named developer with full value minus the seller's points
    ///
    /// Transferred returns are credited in the target's role context, the
    /// same base [`aggregate`] charges the target with.
    pub fn build(rows: &[Stage1Row], directory: &StaffDirectory) -> Self {
        let mut developers = BTreeSet::new();
        let mut by_seller: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();

        for row in rows {
            if row.status == PointStatus::Delete {
                continue;
            }
            let Some(developer) = normalize_person(row.original_developer.as_deref()) else {
                continue;
            };
            developers.insert(developer.clone());
            let credit = match row.outgoing_target() {
                Some(target) if row.status == PointStatus::Return => {
                    in_target_context(row, target, directory).developer_credit()
                }
                _ => row.developer_credit(),
            };
            *by_seller
                .entry(row.sales_person.clone())
                .or_default()
                .entry(developer)
                .or_default() += credit;
        }

        let mut matrix = Self {
            developers: developers.into_iter().collect(),
            ..Default::default()
        };
        for (seller, credits) in by_seller {
            let total = credits.values().sum();
            for (developer, credit) in &credits {
                *matrix.totals.entry(developer.clone()).or_default() += credit;
            }
            matrix.grand_total += total;
            matrix.rows.push(MatrixRow {
                seller,
                credits,
                total,
            });
        }
        matrix
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ADULT_DRINK, ADULT_FORMULA, INFANT_FORMULA};
    use crate::points::RowEdit;
    use crate::rewards::RewardKind;

    fn row(person: &str, points: i64, qty: i64, status: PointStatus) -> Stage1Row {
        Stage1Row {
            id: 0,
            sales_person: person.to_string(),
            role: StaffRole::Sales,
            date: "1130305".to_string(),
            display_date: "03/05".to_string(),
            customer_id: "C1".to_string(),
            customer_name: None,
            item_id: "100".to_string(),
            item_name: "奶粉".to_string(),
            quantity: qty,
            unit: None,
            amount: 0.0,
            ticket_no: None,
            original_points: points,
            natural_category: INFANT_FORMULA.to_string(),
            category: INFANT_FORMULA.to_string(),
            auto_status: status,
            status,
            original_developer: None,
            repurchase_type: None,
            return_target: None,
            manual_points: None,
        }
    }

    fn pharmacist_lin() -> StaffDirectory {
        StaffDirectory::new(vec![Staff {
            id: "2".to_string(),
            name: "林".to_string(),
            role: StaffRole::Pharmacist,
            branch: None,
            customer_id: None,
            points_standard: None,
            cosmetic_standard: None,
        }])
    }

    #[test]
    fn test_aggregate_own_rows() {
        let mut deleted = row("王", 50, 1, PointStatus::Develop);
        deleted.apply(RowEdit::SetStatus(PointStatus::Delete)).unwrap();
        let mut half = row("王", 8, 1, PointStatus::Develop);
        half.apply(RowEdit::SetStatus(PointStatus::HalfYear)).unwrap();

        let rows = vec![
            row("王", 10, 1, PointStatus::Develop),
            row("王", 10, 1, PointStatus::Repurchase),
            row("王", -6, -1, PointStatus::Return),
            deleted,
            half,
        ];
        let people = aggregate(&rows, &[], &[], &StaffDirectory::default());
        assert_eq!(people.len(), 1);
        let wang = &people[0];
        assert_eq!(wang.develop_points, 10);
        assert_eq!(wang.half_year_points, 8);
        assert_eq!(wang.return_points, -6);
        assert_eq!(wang.total_points(), 12);
        assert_eq!(wang.repurchase_count, 1);
        assert_eq!(wang.repurchase_points, 5);
        assert_eq!(wang.rows.len(), 3);
    }

    #[test]
    fn test_transferred_return_moves_ledger() {
        let mut ret = row("王", -7, -1, PointStatus::Return);
        ret.apply(RowEdit::SetReturnTarget(Some("李".to_string())))
            .unwrap();
        ret.apply(RowEdit::SetOriginalDeveloper(Some("陳".to_string())))
            .unwrap();

        let rows = vec![row("王", 10, 1, PointStatus::Develop), ret];
        let people = aggregate(&rows, &[], &[], &StaffDirectory::default());

        let wang = people.iter().find(|p| p.name == "王").unwrap();
        let lee = people.iter().find(|p| p.name == "李").unwrap();
        assert_eq!(wang.total_points(), 10);
        assert_eq!(wang.return_count, 0);
        // Target takes the seller's share of the split
        assert_eq!(lee.incoming_return_points, -4);
        assert_eq!(lee.total_points(), -4);

        let matrix = RepurchaseMatrix::build(&rows, &StaffDirectory::default());
        assert_eq!(matrix.developers, vec!["陳".to_string()]);
        assert_eq!(matrix.rows[0].credits["陳"], -3);
    }

    #[test]
    fn test_transferred_return_uses_target_role() {
        let mut ret = row("王", -12, -3, PointStatus::Return);
        ret.natural_category = ADULT_DRINK.to_string();
        ret.apply(RowEdit::SetReturnTarget(Some("林".to_string())))
            .unwrap();

        let people = aggregate(&[ret.clone()], &[], &[], &pharmacist_lin());
        let lin = people.iter().find(|p| p.name == "林").unwrap();
        // Pharmacists do not divide this category by quantity
        assert_eq!(ret.calculated_points(), -4);
        assert_eq!(lin.incoming_return_points, -12);
        assert_eq!(lin.incoming_returns[0].role, StaffRole::Pharmacist);
    }

    #[test]
    fn test_transferred_split_shares_sum_to_target_base() {
        let mut ret = row("王", -12, -3, PointStatus::Return);
        ret.natural_category = ADULT_DRINK.to_string();
        ret.apply(RowEdit::SetReturnTarget(Some("林".to_string())))
            .unwrap();
        ret.apply(RowEdit::SetOriginalDeveloper(Some("陳".to_string())))
            .unwrap();
        let rows = vec![ret];
        let directory = pharmacist_lin();

        let people = aggregate(&rows, &[], &[], &directory);
        let lin = people.iter().find(|p| p.name == "林").unwrap();
        let matrix = RepurchaseMatrix::build(&rows, &directory);
        let developer_share = matrix.rows[0].credits["陳"];

        assert_eq!(lin.incoming_return_points, -6);
        assert_eq!(developer_share, -6);
        assert_eq!(lin.incoming_return_points + developer_share, -12);
    }

    #[test]
    fn test_repurchase_matrix_credit() {
        let mut a = row("王", 11, 3, PointStatus::Repurchase);
        a.natural_category = ADULT_FORMULA.to_string();
        a.original_developer = Some("李".to_string());
        let mut b = row("王", 10, 1, PointStatus::Repurchase);
        b.original_developer = Some("陳".to_string());
        let mut c = row("林", 9, 1, PointStatus::Repurchase);
        c.original_developer = Some("李".to_string());
        let mut d = row("林", 9, 1, PointStatus::Repurchase);
        d.original_developer = Some("無".to_string());

        let matrix = RepurchaseMatrix::build(&[a, b, c, d], &StaffDirectory::default());
        assert_eq!(matrix.developers, vec!["李".to_string(), "陳".to_string()]);
        // 3 - 1
        assert_eq!(matrix.rows.iter().find(|r| r.seller == "王").unwrap().credits["李"], 2);
        assert_eq!(matrix.totals["李"], 2 + 5);
        assert_eq!(matrix.totals["陳"], 5);
        assert_eq!(matrix.grand_total, 12);
    }

    #[test]
    fn test_rewards_and_cosmetics_attached() {
        let stage2 = vec![Stage2Row {
            sales_person: "王".to_string(),
            date: String::new(),
            customer_id: None,
            item_id: "1".to_string(),
            item_name: String::new(),
            quantity: 2,
            reward_per_unit: 30.0,
            kind: RewardKind::Voucher,
            custom_reward: None,
        }];
        let stage3 = vec![Stage3Summary {
            sales_person: "王".to_string(),
            brands: BTreeMap::from([("A".to_string(), 500.0)]),
        }];

        let people = aggregate(&[], &stage2, &stage3, &StaffDirectory::default());
        assert_eq!(people[0].voucher_reward, 60.0);
        assert_eq!(people[0].reward_total(), 60.0);
        assert_eq!(people[0].cosmetic_total(), 500.0);
    }
}

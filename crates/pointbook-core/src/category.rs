//! Product category derivation and role-specific category rules

use crate::models::StaffRole;

pub const INFANT_FORMULA: &str = "嬰兒奶粉";
pub const ADULT_FORMULA: &str = "成人奶粉";
pub const ADULT_DRINK: &str = "成人奶水";
pub const INFANT_FOOD: &str = "嬰幼兒食品";
pub const INFANT_CEREAL: &str = "嬰兒米麥精";
pub const HEALTH_FOOD: &str = "保健食品";
pub const MEDICINE: &str = "藥品";
pub const DISPENSING: &str = "調劑點數";
pub const PEDIATRIC_CASH: &str = "現金-小兒銷售";
pub const DIAPERS: &str = "尿布";
pub const COSMETICS: &str = "美妝";
pub const RETURN_EXCHANGE: &str = "退換貨";
pub const OTHER: &str = "其他";

/// POS category codes (leading zeros ignored)
const CATEGORY_CODES: &[(&str, &str)] = &[
    ("1", INFANT_FORMULA),
    ("2", ADULT_FORMULA),
    ("3", ADULT_DRINK),
    ("4", INFANT_FOOD),
    ("5", HEALTH_FOOD),
    ("6", MEDICINE),
    ("7", DISPENSING),
    ("8", PEDIATRIC_CASH),
    ("9", DIAPERS),
    ("10", COSMETICS),
];

/// Sort priority of categories on classified lists; unlisted sort last
const CATEGORY_ORDER: &[&str] = &[
    INFANT_FORMULA,
    INFANT_CEREAL,
    INFANT_FOOD,
    ADULT_FORMULA,
    ADULT_DRINK,
    HEALTH_FOOD,
    MEDICINE,
    DISPENSING,
    DIAPERS,
    COSMETICS,
    PEDIATRIC_CASH,
    RETURN_EXCHANGE,
];

/// Priority used for categories missing from the order table
pub const UNLISTED_ORDER: usize = 99;

/// Map a raw POS category code to its label
///
/// Infant food whose item name mentions malt (麥精) or rice (米精) cereal is
/// reported as infant cereal. Input that is already a known label passes
/// through; unknown codes are kept verbatim.
pub fn determine_category(raw: &str, item_name: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return OTHER.to_string();
    }

    let code = raw.trim_start_matches('0');
    let label = CATEGORY_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .or_else(|| {
            CATEGORY_CODES
                .iter()
                .map(|(_, label)| *label)
                .chain([INFANT_CEREAL])
                .find(|label| *label == raw)
        });

    match label {
        Some(INFANT_FOOD) if item_name.contains("麥精") || item_name.contains("米精") => {
            INFANT_CEREAL.to_string()
        }
        Some(label) => label.to_string(),
        None => raw.to_string(),
    }
}

/// Sort priority for a category label
pub fn category_order(category: &str) -> usize {
    CATEGORY_ORDER
        .iter()
        .position(|c| *c == category)
        .unwrap_or(UNLISTED_ORDER)
}

/// Whether the row's points are per package and must be divided by quantity
pub fn divides_by_quantity(role: StaffRole, category: &str) -> bool {
    match role {
        StaffRole::Sales => matches!(category, ADULT_FORMULA | ADULT_DRINK | INFANT_CEREAL),
        StaffRole::Pharmacist => category == ADULT_FORMULA,
        StaffRole::NoBonus => false,
    }
}

/// Categories never checked for repurchase (always credited as developed)
pub fn is_repurchase_exempt(role: StaffRole, category: &str) -> bool {
    role == StaffRole::Pharmacist && category == DISPENSING
}

/// Categories that never earn points, whatever the status
pub fn is_zero_point(category: &str) -> bool {
    category == PEDIATRIC_CASH
}

//! Classified sales lines and their point rules
//!
//! A [`Stage1Row`] stores only the inputs of the point calculation: the raw
//! points, quantity, natural category, role, status and the user-editable
//! attribution fields. [`Stage1Row::calculated_points`] derives the credited
//! value from them every time it is called, so an edit can never leave a
//! stale total behind.

use serde::{Deserialize, Serialize};

use crate::category::{self, RETURN_EXCHANGE};
use crate::error::{Error, Result};
use crate::models::StaffRole;

/// Developer placeholder meaning "nobody"
pub const NO_DEVELOPER: &str = "無";

/// Point status of a classified row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointStatus {
    /// First purchase of the product by the customer
    Develop,
    /// Manual: full credit, reported separately
    HalfYear,
    /// Prior purchase exists: points halved
    Repurchase,
    /// Manual: excluded from every total
    Delete,
    /// Negative quantity
    Return,
}

impl PointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Develop => "DEVELOP",
            Self::HalfYear => "HALF_YEAR",
            Self::Repurchase => "REPURCHASE",
            Self::Delete => "DELETE",
            Self::Return => "RETURN",
        }
    }

    /// Label printed on exported sheets
    pub fn label(&self) -> &'static str {
        match self {
            Self::Develop => "開發",
            Self::HalfYear => "半年",
            Self::Repurchase => "回購",
            Self::Delete => "刪除",
            Self::Return => "退貨",
        }
    }

    /// Whether users may set this status by hand
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Develop | Self::HalfYear | Self::Delete)
    }
}

impl std::str::FromStr for PointStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEVELOP" | "開發" => Ok(Self::Develop),
            "HALF_YEAR" | "半年" => Ok(Self::HalfYear),
            "REPURCHASE" | "回購" => Ok(Self::Repurchase),
            "DELETE" | "刪除" => Ok(Self::Delete),
            "RETURN" | "退貨" => Ok(Self::Return),
            _ => Err(format!("Unknown point status: {}", s)),
        }
    }
}

impl std::fmt::Display for PointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clean a staff name entered for attribution; the placeholder means none
pub fn normalize_person(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty() && *n != NO_DEVELOPER)
        .map(str::to_string)
}

/// Per-unit base value of a row's points
///
/// Categories that price points per package divide the magnitude by the
/// absolute quantity (floored); the sign of the raw points is kept.
pub fn base_points(role: StaffRole, natural_category: &str, raw_points: i64, quantity: i64) -> i64 {
    let magnitude = raw_points.abs();
    let magnitude = if category::divides_by_quantity(role, natural_category) {
        magnitude / quantity.abs().max(1)
    } else {
        magnitude
    };
    magnitude * raw_points.signum()
}

/// Split a return's points between seller and developer
///
/// The seller takes the larger half (the odd point); the developer gets the
/// rest. Both shares carry the sign of `base`.
pub fn split_return(base: i64) -> (i64, i64) {
    let seller = base.signum() * ((base.abs() + 1) / 2);
    (seller, base - seller)
}

/// A user edit to a classified row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowEdit {
    /// DEVELOP, HALF_YEAR or DELETE
    SetStatus(PointStatus),
    /// Return to the status assigned at classification
    RestoreStatus,
    SetOriginalDeveloper(Option<String>),
    SetReturnTarget(Option<String>),
    SetManualPoints(Option<i64>),
    SetRepurchaseType(Option<String>),
}

/// A classified sales line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Row {
    /// Position among accepted rows, before sorting
    pub id: usize,
    pub sales_person: String,
    pub role: StaffRole,
    /// Date as exported (normalized to ROC compact when parseable)
    pub date: String,
    /// `MM/DD`
    pub display_date: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit: Option<String>,
    pub amount: f64,
    pub ticket_no: Option<String>,
    /// Unmodified points from the source row
    pub original_points: i64,
    /// Category derived from the raw row; drives every point rule
    pub natural_category: String,
    /// Category shown and sorted on (relabeled for targeted returns)
    pub category: String,
    /// Status assigned by classification
    pub auto_status: PointStatus,
    pub status: PointStatus,
    pub original_developer: Option<String>,
    pub repurchase_type: Option<String>,
    pub return_target: Option<String>,
    pub manual_points: Option<i64>,
}

impl Stage1Row {
    /// Per-unit value as if the row were a first purchase
    pub fn full_value(&self) -> i64 {
        if category::is_zero_point(&self.natural_category) {
            return 0;
        }
        base_points(
            self.role,
            &self.natural_category,
            self.original_points,
            self.quantity,
        )
    }

    pub fn has_developer(&self) -> bool {
        normalize_person(self.original_developer.as_deref()).is_some()
    }

    /// Points credited to the ledger this row lands on
    pub fn calculated_points(&self) -> i64 {
        if let Some(points) = self.manual_points {
            return points;
        }
        if category::is_zero_point(&self.natural_category) {
            return 0;
        }

        let base = self.full_value();
        match self.status {
            PointStatus::Delete => 0,
            PointStatus::Develop | PointStatus::HalfYear => base,
            PointStatus::Repurchase if base > 0 => base / 2,
            PointStatus::Repurchase => base,
            PointStatus::Return => self.return_shares().0,
        }
    }

    /// (seller, developer) shares of a return; developer share is 0 when
    /// no developer is named
    pub fn return_shares(&self) -> (i64, i64) {
        let base = self.full_value();
        if self.has_developer() {
            split_return(base)
        } else {
            (base, 0)
        }
    }

    /// Credit owed to the named developer: full value minus the seller's points
    pub fn developer_credit(&self) -> i64 {
        if !self.has_developer() || self.status == PointStatus::Delete {
            return 0;
        }
        self.full_value() - self.calculated_points()
    }

    pub fn is_return(&self) -> bool {
        self.auto_status == PointStatus::Return
    }

    /// Return target other than the seller, if any
    pub fn outgoing_target(&self) -> Option<&str> {
        self.return_target
            .as_deref()
            .filter(|t| *t != self.sales_person)
    }

    /// Apply a user edit
    pub fn apply(&mut self, edit: RowEdit) -> Result<()> {
        match edit {
            RowEdit::SetStatus(status) => {
                if !status.is_manual() {
                    return Err(Error::InvalidData(format!(
                        "Status {} cannot be set by hand",
                        status
                    )));
                }
                if self.is_return() && status != PointStatus::Delete {
                    return Err(Error::InvalidData(format!(
                        "Return rows can only be deleted, not set to {}",
                        status
                    )));
                }
                self.status = status;
            }
            RowEdit::RestoreStatus => self.status = self.auto_status,
            RowEdit::SetOriginalDeveloper(name) => {
                self.original_developer = normalize_person(name.as_deref());
            }
            RowEdit::SetReturnTarget(name) => {
                if !self.is_return() {
                    return Err(Error::InvalidData(
                        "Only return rows can be transferred".to_string(),
                    ));
                }
                self.return_target = normalize_person(name.as_deref());
                self.category = if self.return_target.is_some() {
                    RETURN_EXCHANGE.to_string()
                } else {
                    self.natural_category.clone()
                };
            }
            RowEdit::SetManualPoints(points) => self.manual_points = points,
            RowEdit::SetRepurchaseType(kind) => {
                self.repurchase_type = kind.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
            }
        }
        Ok(())
    }
}

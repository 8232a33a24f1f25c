//! Product grouping index
//!
//! An in-memory snapshot mapping normalized item ids to the group they belong
//! to. The index is built explicitly and handed to the resolver; it is never
//! queried against the database per row. Call [`ProductGroupIndex::refresh`]
//! after groups change.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::ProductGroup;

/// Normalize an item id: trim whitespace and strip every leading zero
pub fn normalize(id: &str) -> String {
    id.trim().trim_start_matches('0').to_string()
}

/// Result of an index lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemLookup {
    /// Normalized ids treated as the same product (always includes the query)
    pub related_ids: BTreeSet<String>,
    /// Display alias per normalized id; empty for ungrouped items
    pub alias_for: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct Membership {
    group_id: i64,
    alias: String,
}

/// Normalized item id to group membership
#[derive(Debug, Clone, Default)]
pub struct ProductGroupIndex {
    members: HashMap<String, Membership>,
    groups: HashMap<i64, BTreeSet<String>>,
}

impl ProductGroupIndex {
    /// An index with no groups: every item only matches itself
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from stored groups
    ///
    /// Groups are applied in ascending id order; when two groups claim the
    /// same normalized id the later group keeps it and a warning is logged.
    pub fn from_groups(groups: &[ProductGroup]) -> Self {
        let mut ordered: Vec<&ProductGroup> = groups.iter().collect();
        ordered.sort_by_key(|g| g.id);

        let mut index = Self::default();
        for group in ordered {
            for item in &group.items {
                let normalized = normalize(&item.item_id);
                if normalized.is_empty() {
                    continue;
                }
                let previous = index.members.insert(
                    normalized.clone(),
                    Membership {
                        group_id: group.id,
                        alias: item.alias.trim().to_string(),
                    },
                );
                if let Some(previous) = previous {
                    if previous.group_id != group.id {
                        warn!(
                            "Item {} is in groups {} and {}; using group {} ('{}')",
                            normalized, previous.group_id, group.id, group.id, group.group_name
                        );
                        if let Some(set) = index.groups.get_mut(&previous.group_id) {
                            set.remove(&normalized);
                        }
                    }
                }
                index.groups.entry(group.id).or_default().insert(normalized);
            }
        }

        debug!(
            "Built product group index: {} groups, {} items",
            index.groups.len(),
            index.members.len()
        );
        index
    }

    /// Load the current groups from the database
    pub fn load(db: &Database) -> Result<Self> {
        Ok(Self::from_groups(&db.list_product_groups()?))
    }

    /// Rebuild the snapshot from the database
    pub fn refresh(&mut self, db: &Database) -> Result<()> {
        *self = Self::load(db)?;
        Ok(())
    }

    /// Related ids and aliases for an item id
    pub fn lookup(&self, item_id: &str) -> ItemLookup {
        let normalized = normalize(item_id);
        let mut lookup = ItemLookup::default();
        if normalized.is_empty() {
            return lookup;
        }

        match self.members.get(&normalized) {
            Some(membership) => {
                let related = self
                    .groups
                    .get(&membership.group_id)
                    .cloned()
                    .unwrap_or_default();
                for id in &related {
                    if let Some(m) = self.members.get(id) {
                        lookup.alias_for.insert(id.clone(), m.alias.clone());
                    }
                }
                lookup.related_ids = related;
                lookup.related_ids.insert(normalized);
            }
            None => {
                lookup.related_ids.insert(normalized);
            }
        }
        lookup
    }

    /// Display alias of a single item, if it is grouped and has one
    pub fn alias(&self, item_id: &str) -> Option<&str> {
        self.members
            .get(&normalize(item_id))
            .map(|m| m.alias.as_str())
            .filter(|a| !a.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupItem;

    fn group(id: i64, name: &str, items: &[(&str, &str)]) -> ProductGroup {
        ProductGroup {
            id,
            group_name: name.to_string(),
            items: items
                .iter()
                .map(|(item_id, alias)| GroupItem {
                    item_id: item_id.to_string(),
                    alias: alias.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("00123"), "123");
        assert_eq!(normalize(" 0456 "), "456");
        assert_eq!(normalize("A001"), "A001");
        assert_eq!(normalize("000"), "");
        assert_eq!(normalize("0"), normalize("000"));
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn test_lookup_ungrouped_is_singleton() {
        let index = ProductGroupIndex::empty();
        let lookup = index.lookup("0099");
        assert_eq!(lookup.related_ids.len(), 1);
        assert!(lookup.related_ids.contains("99"));
        assert!(lookup.alias_for.is_empty());
    }

    #[test]
    fn test_lookup_grouped() {
        let index = ProductGroupIndex::from_groups(&[group(
            1,
            "亞培安素",
            &[("00123", "安素 罐"), ("456", "安素 箱")],
        )]);

        let lookup = index.lookup("123");
        assert_eq!(
            lookup.related_ids.iter().cloned().collect::<Vec<_>>(),
            vec!["123".to_string(), "456".to_string()]
        );
        assert_eq!(lookup.alias_for.get("456").map(String::as_str), Some("安素 箱"));
        assert_eq!(index.alias("0456"), Some("安素 箱"));
    }

    #[test]
    fn test_collision_later_group_wins() {
        let index = ProductGroupIndex::from_groups(&[
            group(2, "B", &[("100", "b"), ("300", "")]),
            group(1, "A", &[("0100", "a"), ("200", "")]),
        ]);

        // Group 2 is applied last
        let lookup = index.lookup("100");
        assert!(lookup.related_ids.contains("300"));
        assert!(!lookup.related_ids.contains("200"));
        assert_eq!(index.alias("100"), Some("b"));

        // Group 1 lost the shared item
        let lookup = index.lookup("200");
        assert!(!lookup.related_ids.contains("100"));
    }
}

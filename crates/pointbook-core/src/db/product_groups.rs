//! Product group operations

use std::collections::{BTreeMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::Database;
use crate::error::{Error, Result};
use crate::grouping::normalize;
use crate::models::{GroupItem, NewProductGroup, ProductGroup};

fn validate_group(group: &NewProductGroup) -> Result<()> {
    if group.group_name.trim().is_empty() {
        return Err(Error::InvalidData("Group name is required".to_string()));
    }
    if group.items.is_empty() {
        return Err(Error::InvalidData(format!(
            "Group '{}' has no items",
            group.group_name
        )));
    }
    if let Some(item) = group.items.iter().find(|i| normalize(&i.item_id).is_empty()) {
        return Err(Error::InvalidData(format!(
            "Group '{}' contains an empty item id '{}'",
            group.group_name, item.item_id
        )));
    }
    Ok(())
}

/// Reject items whose normalized id already belongs to another group
fn check_collisions(conn: &Connection, group: &NewProductGroup, own_id: Option<i64>) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT g.group_name
        FROM product_group_items i
        JOIN product_groups g ON g.id = i.group_id
        WHERE i.item_id_normalized = ? AND g.id != ?
        LIMIT 1
        "#,
    )?;

    for item in &group.items {
        let normalized = normalize(&item.item_id);
        let other: Option<String> = stmt
            .query_row(params![normalized, own_id.unwrap_or(-1)], |row| row.get(0))
            .optional()?;
        if let Some(other) = other {
            return Err(Error::Conflict(format!(
                "Item {} already belongs to group '{}'",
                item.item_id, other
            )));
        }
    }
    Ok(())
}

pub(crate) fn insert_group_items(conn: &Connection, group_id: i64, items: &[GroupItem]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO product_group_items (group_id, item_id, item_id_normalized, alias)
        VALUES (?, ?, ?, ?)
        "#,
    )?;

    let mut seen = HashSet::new();
    for item in items {
        let normalized = normalize(&item.item_id);
        // The same product listed twice under different padding
        if !seen.insert(normalized.clone()) {
            continue;
        }
        stmt.execute(params![group_id, item.item_id.trim(), normalized, item.alias.trim()])?;
    }
    Ok(())
}

impl Database {
    /// Create a product group
    ///
    /// Fails with [`Error::Conflict`] when any item is already grouped elsewhere.
    pub fn create_product_group(&self, group: &NewProductGroup) -> Result<i64> {
        validate_group(group)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        check_collisions(&tx, group, None)?;

        tx.execute(
            "INSERT INTO product_groups (group_name) VALUES (?)",
            params![group.group_name.trim()],
        )?;
        let id = tx.last_insert_rowid();
        insert_group_items(&tx, id, &group.items)?;
        tx.commit()?;

        info!("Created product group '{}' ({} items)", group.group_name, group.items.len());
        Ok(id)
    }

    /// Replace a product group's name and items
    pub fn update_product_group(&self, id: i64, group: &NewProductGroup) -> Result<()> {
        validate_group(group)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE product_groups SET group_name = ? WHERE id = ?",
            params![group.group_name.trim(), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Product group {}", id)));
        }
        check_collisions(&tx, group, Some(id))?;

        tx.execute("DELETE FROM product_group_items WHERE group_id = ?", params![id])?;
        insert_group_items(&tx, id, &group.items)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a product group; returns whether it existed
    pub fn delete_product_group(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM product_groups WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// All product groups with their items, ordered by id
    pub fn list_product_groups(&self) -> Result<Vec<ProductGroup>> {
        let conn = self.conn()?;

        let mut groups: BTreeMap<i64, ProductGroup> = BTreeMap::new();
        let mut stmt = conn.prepare("SELECT id, group_name FROM product_groups ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ProductGroup {
                id: row.get(0)?,
                group_name: row.get(1)?,
                items: Vec::new(),
            })
        })?;
        for group in rows {
            let group = group?;
            groups.insert(group.id, group);
        }

        let mut stmt = conn
            .prepare("SELECT group_id, item_id, alias FROM product_group_items ORDER BY id")?;
        let items = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                GroupItem {
                    item_id: row.get(1)?,
                    alias: row.get(2)?,
                },
            ))
        })?;
        for item in items {
            let (group_id, item) = item?;
            if let Some(group) = groups.get_mut(&group_id) {
                group.items.push(item);
            }
        }

        Ok(groups.into_values().collect())
    }
}

//! Product group commands

use anyhow::{Context, Result};
use pointbook_core::models::{GroupItem, NewProductGroup};
use pointbook_core::Database;

/// Parse `ITEM` or `ITEM=ALIAS`
pub fn parse_group_item(arg: &str) -> GroupItem {
    match arg.split_once('=') {
        Some((item, alias)) => GroupItem {
            item_id: item.trim().to_string(),
            alias: alias.trim().to_string(),
        },
        None => GroupItem {
            item_id: arg.trim().to_string(),
            alias: String::new(),
        },
    }
}

fn new_group(name: &str, items: &[String]) -> NewProductGroup {
    NewProductGroup {
        group_name: name.to_string(),
        items: items.iter().map(|i| parse_group_item(i)).collect(),
    }
}

pub fn cmd_groups_list(db: &Database) -> Result<()> {
    let groups = db.list_product_groups()?;
    if groups.is_empty() {
        println!("No product groups");
        return Ok(());
    }

    for group in groups {
        println!("#{} {}", group.id, group.group_name);
        for item in group.items {
            if item.alias.is_empty() {
                println!("    {}", item.item_id);
            } else {
                println!("    {} ({})", item.item_id, item.alias);
            }
        }
    }
    Ok(())
}

pub fn cmd_groups_add(db: &Database, name: &str, items: &[String]) -> Result<()> {
    let id = db
        .create_product_group(&new_group(name, items))
        .with_context(|| format!("Failed to create group {}", name))?;
    println!("✅ Created group #{} {}", id, name);
    Ok(())
}

pub fn cmd_groups_update(db: &Database, id: i64, name: &str, items: &[String]) -> Result<()> {
    db.update_product_group(id, &new_group(name, items))
        .with_context(|| format!("Failed to update group #{}", id))?;
    println!("✅ Updated group #{}", id);
    Ok(())
}

pub fn cmd_groups_remove(db: &Database, id: i64) -> Result<()> {
    if db.delete_product_group(id)? {
        println!("🗑  Removed group #{}", id);
    } else {
        println!("No group #{}", id);
    }
    Ok(())
}

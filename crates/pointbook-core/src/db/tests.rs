//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn record(customer: &str, item: &str, date: &str, store: Option<&str>) -> HistoryRecord {
        HistoryRecord {
            customer_id: customer.to_string(),
            item_id: item.to_string(),
            date: date.to_string(),
            quantity: 1,
            store_name: store.map(str::to_string),
            sales_person: Some("王小明".to_string()),
            price: Some(100.0),
            unit: None,
            item_name: Some("奶粉".to_string()),
            amount: Some(100.0),
            category: None,
            points: Some(5.0),
            ticket_no: None,
        }
    }

    fn staff(id: &str, name: &str) -> Staff {
        Staff {
            id: id.to_string(),
            name: name.to_string(),
            role: StaffRole::Sales,
            branch: None,
            customer_id: None,
            points_standard: None,
            cosmetic_standard: None,
        }
    }

    fn group(name: &str, items: &[&str]) -> NewProductGroup {
        NewProductGroup {
            group_name: name.to_string(),
            items: items
                .iter()
                .map(|id| GroupItem {
                    item_id: id.to_string(),
                    alias: String::new(),
                })
                .collect(),
        }
    }

    fn seeded() -> Database {
        let db = Database::in_memory().unwrap();
        db.insert_history_chunk(&[
            record("C1", "00123", "1120105", Some("中山店")),
            record("C1", "456", "1130105", Some("中山店")),
            record("C2", "456", "1130215", Some("中山店")),
            record("C2", "789", "1130220", Some("中山店")),
            record("C3", "789", "1130301", Some("信義店")),
            record("C4", "789", "1130301", None),
            record("C5", "789", "1130302", Some("")),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_schema_exists() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
                 ('history_records', 'staff', 'product_groups', 'product_group_items', 'import_sessions')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);

        let normalized: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('history_records') WHERE name = 'item_id_normalized'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(normalized, 1);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pointbook.db");
        let path = path.to_string_lossy();

        let db = Database::new(&path).unwrap();
        db.insert_history_chunk(&[record("C1", "1", "1130101", None)])
            .unwrap();
        drop(db);

        let db = Database::new(&path).unwrap();
        assert_eq!(db.count_history().unwrap(), 1);
    }

    #[test]
    fn test_stats_by_store() {
        let db = seeded();
        let stats = db.history_stats_by_store().unwrap();

        assert_eq!(
            stats,
            vec![
                StoreStats {
                    store_name: "中山店".to_string(),
                    count: 4
                },
                StoreStats {
                    store_name: UNCLASSIFIED_STORE.to_string(),
                    count: 2
                },
                StoreStats {
                    store_name: "信義店".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_bulk_insert_is_not_deduplicated() {
        let db = Database::in_memory().unwrap();
        let rows = vec![record("C1", "1", "1130101", None); 3];
        db.bulk_insert_history(&rows, 2).unwrap();
        db.bulk_insert_history(&rows, 2).unwrap();
        assert_eq!(db.count_history().unwrap(), 6);
    }

    #[test]
    fn test_years_and_months() {
        let db = seeded();
        assert_eq!(
            db.history_years_for_store("中山店").unwrap(),
            vec!["112".to_string(), "113".to_string()]
        );

        let months = db.history_monthly_stats("中山店", "113").unwrap();
        assert_eq!(
            months,
            vec![
                MonthStats {
                    month: "01".to_string(),
                    count: 1
                },
                MonthStats {
                    month: "02".to_string(),
                    count: 2
                },
            ]
        );

        assert_eq!(
            db.history_years_for_store(UNCLASSIFIED_STORE).unwrap(),
            vec!["113".to_string()]
        );
    }

    #[test]
    fn test_delete_by_store_year_month() {
        let db = seeded();

        assert_eq!(db.delete_history_by_store_year_month("中山店", "113", "2").unwrap(), 2);
        assert_eq!(db.delete_history_by_store_year("中山店", "112").unwrap(), 1);
        assert_eq!(db.count_history().unwrap(), 4);

        // The sentinel addresses records without a store
        assert_eq!(db.delete_history_by_store(UNCLASSIFIED_STORE).unwrap(), 2);
        assert_eq!(db.delete_history_by_store("中山店").unwrap(), 1);
        assert_eq!(db.count_history().unwrap(), 1);
    }

    #[test]
    fn test_page_history() {
        let db = seeded();

        let page = db.page_history("中山店", None, None, 0, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].date, "1120105");

        let page = db.page_history("中山店", None, None, 2, 10).unwrap();
        assert_eq!(page.len(), 2);

        let month = db.page_history("中山店", Some("113"), Some("2"), 0, 10).unwrap();
        assert_eq!(month.len(), 2);
        assert!(month.iter().all(|r| r.date.starts_with("11302")));
    }

    #[test]
    fn test_has_prior_purchase_uses_normalized_ids() {
        let db = seeded();
        assert!(db.has_prior_purchase("C1", &["123".to_string()]).unwrap());
        assert!(db
            .has_prior_purchase("C1", &["999".to_string(), "456".to_string()])
            .unwrap());
        assert!(!db.has_prior_purchase("C2", &["123".to_string()]).unwrap());
        assert!(!db.has_prior_purchase("C1", &[]).unwrap());
    }

    #[test]
    fn test_staff_crud() {
        let db = Database::in_memory().unwrap();
        db.upsert_staff(&staff("10", "李大華")).unwrap();
        db.upsert_staff(&staff("002", "王小明")).unwrap();
        db.upsert_staff(&staff("1", "陳美玲")).unwrap();

        let ids: Vec<String> = db.list_staff().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["1", "002", "10"]);

        let mut updated = staff("002", "王小明");
        updated.role = StaffRole::Pharmacist;
        updated.points_standard = Some(250.0);
        db.upsert_staff(&updated).unwrap();
        let fetched = db.get_staff_by_name("王小明").unwrap().unwrap();
        assert_eq!(fetched.role, StaffRole::Pharmacist);
        assert_eq!(fetched.points_standard, Some(250.0));

        assert!(db.delete_staff("10").unwrap());
        assert!(!db.delete_staff("10").unwrap());
        assert!(db.get_staff("10").unwrap().is_none());
    }

    #[test]
    fn test_staff_name_conflict() {
        let db = Database::in_memory().unwrap();
        db.upsert_staff(&staff("1", "王小明")).unwrap();

        let result = db.upsert_staff(&staff("2", "王小明"));
        assert!(matches!(result, Err(Error::Conflict(_))));

        let result = db.upsert_staff(&staff("", "無編號"));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_product_group_crud() {
        let db = Database::in_memory().unwrap();
        let id = db.create_product_group(&group("奶粉A", &["00123", "123", "456"])).unwrap();

        let groups = db.list_product_groups().unwrap();
        assert_eq!(groups.len(), 1);
        // "00123" and "123" normalize to the same id; only the first is kept
        assert_eq!(groups[0].items.len(), 2);

        db.update_product_group(id, &group("奶粉A", &["456", "789"])).unwrap();
        let groups = db.list_product_groups().unwrap();
        assert_eq!(groups[0].items[1].item_id, "789");

        assert!(matches!(
            db.update_product_group(id + 100, &group("x", &["1"])),
            Err(Error::NotFound(_))
        ));

        assert!(db.delete_product_group(id).unwrap());
        assert!(db.list_product_groups().unwrap().is_empty());

        // Items went with the group
        let conn = db.conn().unwrap();
        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM product_group_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(items, 0);
    }

    #[test]
    fn test_product_group_collision_rejected() {
        let db = Database::in_memory().unwrap();
        let first = db.create_product_group(&group("A", &["00123"])).unwrap();

        let result = db.create_product_group(&group("B", &["123"]));
        assert!(matches!(result, Err(Error::Conflict(_))));

        // Re-saving a group with its own items is fine
        db.update_product_group(first, &group("A", &["123", "9"])).unwrap();

        assert!(matches!(
            db.create_product_group(&group("", &["1"])),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.create_product_group(&group("C", &[])),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_import_sessions() {
        let db = Database::in_memory().unwrap();
        let id = db
            .create_import_session(Some("march.csv"), "abc", Some("中山店"))
            .unwrap();
        assert!(db.find_import_session_by_hash("abc").unwrap().is_none());

        db.complete_import_session(id, 42).unwrap();
        let found = db.find_import_session_by_hash("abc").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.row_count, 42);
        assert_eq!(found.status, ImportStatus::Completed);

        let failed = db.create_import_session(None, "def", None).unwrap();
        db.fail_import_session(failed, 0, "bad header").unwrap();
        let sessions = db.list_import_sessions().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions
            .iter()
            .any(|s| s.status == ImportStatus::Failed && s.error.as_deref() == Some("bad header")));
    }

    #[test]
    fn test_backup_restore_roundtrip() {
        let db = seeded();
        db.upsert_staff(&staff("1", "王小明")).unwrap();
        let group_id = db.create_product_group(&group("A", &["123"])).unwrap();
        let backup = db.export_backup().unwrap();
        assert_eq!(backup.metadata.total_records, 7 + 1 + 1);

        let other = Database::in_memory().unwrap();
        other.insert_history_chunk(&[record("X", "1", "1130101", None)]).unwrap();
        other.upsert_staff(&staff("9", "舊資料")).unwrap();

        let stats = other.restore_backup(&backup).unwrap();
        assert_eq!(stats.history, 7);
        assert_eq!(stats.staff, 1);
        assert_eq!(stats.product_groups, 1);

        assert_eq!(other.count_history().unwrap(), 7);
        assert!(other.get_staff("9").unwrap().is_none());
        assert_eq!(other.list_product_groups().unwrap()[0].id, group_id);
        assert_eq!(other.all_history().unwrap(), db.all_history().unwrap());
    }

    #[test]
    fn test_clear_all_keeps_directory() {
        let db = seeded();
        db.upsert_staff(&staff("1", "王小明")).unwrap();
        db.create_product_group(&group("A", &["123"])).unwrap();
        db.create_import_session(None, "abc", None).unwrap();

        assert_eq!(db.clear_all().unwrap(), 7);
        assert_eq!(db.count_history().unwrap(), 0);
        assert!(db.list_import_sessions().unwrap().is_empty());
        assert_eq!(db.list_staff().unwrap().len(), 1);
        assert_eq!(db.list_product_groups().unwrap().len(), 1);
    }
}

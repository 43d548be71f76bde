//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LedgerFilter, LedgerStore};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_tx(date: NaiveDate, description: &str, amount: f64) -> NewTransaction {
        NewTransaction {
            source: TransactionSource::ChaseCredit,
            date,
            description: description.to_string(),
            amount,
            category: None,
            raw_category: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_transactions().unwrap(), 0);
        assert!(db.list_transactions(10).unwrap().is_empty());
    }

    #[test]
    fn test_transactions_schema_exists() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('transactions') WHERE name IN ('id', 'source', 'date', 'description', 'amount', 'category', 'raw_category', 'tags', 'transaction_hash')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 9, "transactions table should have 9 expected columns");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        let db = Database::new(path).unwrap();
        db.insert_transaction(&new_tx(d(2024, 1, 5), "UBER TRIP", -12.5))
            .unwrap();
        drop(db);

        let db = Database::new(path).unwrap();
        assert_eq!(db.count_transactions().unwrap(), 1);
        assert_eq!(db.path(), path);
    }

    #[test]
    fn test_insert_round_trip() {
        let db = Database::in_memory().unwrap();
        let mut tx = new_tx(d(2024, 3, 9), "STARBUCKS STORE 1234", -6.45);
        tx.source = TransactionSource::Amex;
        tx.category = Some(TransactionCategory::FoodDining);
        tx.raw_category = Some("Restaurant-Bar & Café".to_string());
        tx.tags = vec!["Coffee".to_string(), " starbucks ".to_string(), "coffee".to_string()];

        let id = db.insert_transaction(&tx).unwrap().unwrap();
        let stored = db.get_transaction(id).unwrap().unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.source, TransactionSource::Amex);
        assert_eq!(stored.date, d(2024, 3, 9));
        assert_eq!(stored.description, "STARBUCKS STORE 1234");
        assert!((stored.amount + 6.45).abs() < 1e-9);
        assert_eq!(stored.category, Some(TransactionCategory::FoodDining));
        assert_eq!(stored.raw_category.as_deref(), Some("Restaurant-Bar & Café"));
        assert_eq!(stored.tags, vec!["coffee", "starbucks"]);
    }

    #[test]
    fn test_duplicate_insert_skipped() {
        let db = Database::in_memory().unwrap();
        let tx = new_tx(d(2024, 1, 1), "NETFLIX.COM", -15.49);

        assert!(db.insert_transaction(&tx).unwrap().is_some());
        assert!(db.insert_transaction(&tx).unwrap().is_none());
        assert_eq!(db.count_transactions().unwrap(), 1);

        // Same line on another card is a different entry
        let mut other = tx.clone();
        other.source = TransactionSource::Amex;
        assert!(db.insert_transaction(&other).unwrap().is_some());
    }

    #[test]
    fn test_update_tags() {
        let db = Database::in_memory().unwrap();
        let id = db
            .insert_transaction(&new_tx(d(2024, 2, 2), "EMIRATES AIRLINES", -800.0))
            .unwrap()
            .unwrap();

        db.update_tags(id, &["Airline".to_string(), "travel".to_string()])
            .unwrap();
        let stored = db.get_transaction(id).unwrap().unwrap();
        assert_eq!(stored.tags, vec!["airline", "travel"]);

        assert!(matches!(
            db.update_tags(9999, &[]),
            Err(crate::error::Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_is_newest_first() {
        let db = Database::in_memory().unwrap();
        db.insert_transaction(&new_tx(d(2024, 1, 1), "A", -1.0)).unwrap();
        db.insert_transaction(&new_tx(d(2024, 3, 1), "B", -1.0)).unwrap();
        db.insert_transaction(&new_tx(d(2024, 2, 1), "C", -1.0)).unwrap();

        let rows = db.list_transactions(2).unwrap();
        let descriptions: Vec<_> = rows.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_search_by_keyword_matches_description_and_tags() {
        let db = Database::in_memory().unwrap();
        db.insert_transaction(&new_tx(d(2024, 1, 3), "UBER *TRIP HELP.UBER.COM", -18.0))
            .unwrap();
        let mut tagged = new_tx(d(2024, 1, 4), "SQ *BLUE BOTTLE", -5.0);
        tagged.tags = vec!["coffee".to_string()];
        db.insert_transaction(&tagged).unwrap();
        db.insert_transaction(&new_tx(d(2024, 1, 5), "100% JUICE BAR", -7.0))
            .unwrap();

        let hits = db.search_by_keyword("uber", 1000).await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = db.search_by_keyword("COFFEE", 1000).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "SQ *BLUE BOTTLE");

        // LIKE wildcards in the keyword are literal
        let hits = db.search_by_keyword("100%", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        let hits = db.search_by_keyword("_", 10).await.unwrap();
        assert!(hits.is_empty());

        assert!(db.search_by_keyword("  ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_filtered() {
        let db = Database::in_memory().unwrap();
        let mut food = new_tx(d(2024, 6, 10), "CHIPOTLE", -14.0);
        food.category = Some(TransactionCategory::FoodDining);
        db.insert_transaction(&food).unwrap();

        let mut old_food = new_tx(d(2023, 6, 10), "CHIPOTLE", -12.0);
        old_food.category = Some(TransactionCategory::FoodDining);
        db.insert_transaction(&old_food).unwrap();

        let mut travel = new_tx(d(2024, 6, 11), "DELTA AIR LINES", -350.0);
        travel.category = Some(TransactionCategory::Travel);
        travel.source = TransactionSource::Amex;
        db.insert_transaction(&travel).unwrap();

        let filter = LedgerFilter::new(500)
            .dates(Some(d(2024, 1, 1)), Some(d(2024, 12, 31)))
            .category(Some(TransactionCategory::FoodDining));
        let rows = db.get_filtered(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, d(2024, 6, 10));

        let rows = db
            .get_filtered(&LedgerFilter::new(500).source(Some(TransactionSource::Amex)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "DELTA AIR LINES");

        let rows = db.get_filtered(&LedgerFilter::new(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_unknown() {
        let db = Database::in_memory().unwrap();
        let a = db
            .insert_transaction(&new_tx(d(2024, 1, 1), "A", -1.0))
            .unwrap()
            .unwrap();
        let b = db
            .insert_transaction(&new_tx(d(2024, 5, 1), "B", -1.0))
            .unwrap()
            .unwrap();

        let rows = db.get_by_ids(&[a, 424242, b]).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a]);

        assert!(db.get_by_ids(&[]).await.unwrap().is_empty());
    }
}

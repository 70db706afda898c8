//! Contains the transaction store trait and its two implementations.
//!
//! [SQLiteTransactionStore] keeps transactions in a relational table and pushes
//! filtering and grouping into SQL. [DocumentTransactionStore] keeps them as a
//! JSON collection in a [DocumentTree] and aggregates in memory. Both follow
//! the same contract, including the not-found checks on update and delete.

mod document;
mod document_tree;
mod sqlite;

pub use document::{DocumentTransactionStore, TRANSACTIONS_PATH};
pub use document_tree::{DocumentTree, InMemoryTree, JsonFileTree};
pub use sqlite::{SQLiteTransactionStore, TABLE_NAME, initialize as initialize_db};

use crate::{
    Error,
    aggregate::{GroupTotal, SummaryQuery},
    record::{RecordField, TransactionRecord, TransactionUpdate},
};

/// Handles the creation, retrieval, update and deletion of transactions.
pub trait TransactionStore: Send + Sync {
    /// Add a new transaction to the store.
    ///
    /// Transaction IDs are not checked for uniqueness.
    fn insert(&self, record: TransactionRecord) -> Result<(), Error>;

    /// Add many transactions at once, returning how many were added.
    fn insert_many(&self, records: Vec<TransactionRecord>) -> Result<usize, Error> {
        let count = records.len();

        for record in records {
            self.insert(record)?;
        }

        Ok(count)
    }

    /// Retrieve every transaction in the store.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the store is empty.
    fn scan_all(&self) -> Result<Vec<TransactionRecord>, Error>;

    /// Retrieve the transactions where `field` equals `value`.
    ///
    /// An empty result is not an error.
    fn find_by(&self, field: RecordField, value: &str) -> Result<Vec<TransactionRecord>, Error>;

    /// Delete every transaction with the ID `transaction_id`, returning how many were removed.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no transaction has that ID.
    fn delete(&self, transaction_id: &str) -> Result<usize, Error>;

    /// Change the supplied fields of every transaction with the ID
    /// `transaction_id`, returning how many were changed.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoFieldsToUpdate] if `update` does not supply any field,
    /// - or [Error::NotFound] if no transaction has that ID.
    fn update(&self, transaction_id: &str, update: &TransactionUpdate) -> Result<usize, Error>;

    /// Filter and group the stored transactions as described by `query`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no transaction matches the query.
    fn summarize(&self, query: &SummaryQuery) -> Result<Vec<GroupTotal>, Error> {
        let records = match &query.filter {
            Some(filter) => self.find_by(filter.field, &filter.value)?,
            None => match self.scan_all() {
                Ok(records) => records,
                Err(Error::NotFound(_)) => Vec::new(),
                Err(error) => return Err(error),
            },
        };

        query.run(&records)
    }
}

pub(crate) fn no_transactions_error() -> Error {
    Error::NotFound("No transactions found".to_owned())
}

pub(crate) fn missing_transaction_error(transaction_id: &str) -> Error {
    Error::NotFound(format!("Transaction {transaction_id} not found"))
}

/// Behaviour every store must share. Each test runs against both implementations.
#[cfg(test)]
mod contract_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use crate::{
        Error, TransactionUpdate,
        aggregate::{GroupTotal, SummaryQuery},
        record::{RecordField, test_records::record},
        stores::{
            DocumentTransactionStore, InMemoryTree, SQLiteTransactionStore, TransactionStore,
            initialize_db,
        },
    };

    fn sqlite_store() -> SQLiteTransactionStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).unwrap();
        SQLiteTransactionStore::new(Arc::new(Mutex::new(connection)))
    }

    fn document_store() -> DocumentTransactionStore {
        DocumentTransactionStore::new(Arc::new(InMemoryTree::default()))
    }

    fn stores() -> Vec<(&'static str, Box<dyn TransactionStore>)> {
        vec![
            ("sqlite", Box::new(sqlite_store()) as Box<dyn TransactionStore>),
            ("document", Box::new(document_store())),
        ]
    }

    #[test]
    fn insert_then_scan_returns_record() {
        for (name, store) in stores() {
            let want = record("T1", "A", "X", 100.0, 40.0, 60.0);

            store.insert(want.clone()).unwrap();

            assert_eq!(store.scan_all().unwrap(), vec![want], "{name}");
        }
    }

    #[test]
    fn scan_of_empty_store_is_not_found() {
        for (name, store) in stores() {
            assert_eq!(
                store.scan_all(),
                Err(Error::NotFound("No transactions found".to_owned())),
                "{name}"
            );
        }
    }

    #[test]
    fn duplicate_ids_are_allowed() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();
            store.insert(record("T1", "B", "Y", 2.0, 0.0, 2.0)).unwrap();

            assert_eq!(store.scan_all().unwrap().len(), 2, "{name}");
        }
    }

    #[test]
    fn insert_many_appends_all_records() {
        for (name, store) in stores() {
            store.insert(record("T0", "A", "X", 1.0, 0.0, 1.0)).unwrap();
            let records = vec![
                record("T1", "A", "X", 1.0, 0.0, 1.0),
                record("T2", "B", "Y", 2.0, 0.0, 2.0),
            ];

            let count = store.insert_many(records).unwrap();

            assert_eq!(count, 2, "{name}");
            assert_eq!(store.scan_all().unwrap().len(), 3, "{name}");
        }
    }

    #[test]
    fn find_by_filters_on_equality() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 100.0, 0.0, 1.0)).unwrap();
            store.insert(record("T2", "B", "X", 50.0, 0.0, 2.0)).unwrap();
            store.insert(record("T3", "A", "Y", 100.0, 0.0, 3.0)).unwrap();

            let by_subsidiary = store.find_by(RecordField::Subsidiary, "A").unwrap();
            let by_amount = store.find_by(RecordField::AllocatedBudget, "100").unwrap();
            let no_match = store.find_by(RecordField::Sector, "Z").unwrap();

            let ids = |records: Vec<crate::TransactionRecord>| {
                records
                    .into_iter()
                    .map(|record| record.transaction_id)
                    .collect::<Vec<_>>()
            };
            assert_eq!(ids(by_subsidiary), vec!["T1", "T3"], "{name}");
            assert_eq!(ids(by_amount), vec!["T1", "T3"], "{name}");
            assert!(no_match.is_empty(), "{name}");
        }
    }

    #[test]
    fn delete_removes_only_matching_records() {
        for (name, store) in stores() {
            let keep = record("T2", "B", "Y", 2.0, 0.0, 2.0);
            store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();
            store.insert(keep.clone()).unwrap();
            store.insert(record("T1", "C", "Z", 3.0, 0.0, 3.0)).unwrap();

            let removed = store.delete("T1").unwrap();

            assert_eq!(removed, 2, "{name}");
            assert_eq!(store.scan_all().unwrap(), vec![keep], "{name}");
        }
    }

    #[test]
    fn delete_of_absent_id_is_not_found() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();

            assert_eq!(
                store.delete("T9"),
                Err(Error::NotFound("Transaction T9 not found".to_owned())),
                "{name}"
            );
            assert_eq!(store.scan_all().unwrap().len(), 1, "{name}");
        }
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        for (name, store) in stores() {
            let original = record("T1", "A", "X", 100.0, 40.0, 60.0);
            let other = record("T2", "B", "Y", 10.0, 1.0, 9.0);
            store.insert(original.clone()).unwrap();
            store.insert(other.clone()).unwrap();

            let updated = store
                .update(
                    "T1",
                    &TransactionUpdate {
                        spent_amount: Some(75.0),
                        ..Default::default()
                    },
                )
                .unwrap();

            let mut want = original;
            want.spent_amount = 75.0;
            assert_eq!(updated, 1, "{name}");
            assert_eq!(store.scan_all().unwrap(), vec![want, other], "{name}");
        }
    }

    #[test]
    fn update_without_fields_is_rejected() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();

            assert_eq!(
                store.update("T1", &TransactionUpdate::default()),
                Err(Error::NoFieldsToUpdate),
                "{name}"
            );
        }
    }

    #[test]
    fn update_of_absent_id_is_not_found() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();

            let result = store.update(
                "T9",
                &TransactionUpdate {
                    sector: Some("Y".to_owned()),
                    ..Default::default()
                },
            );

            assert_eq!(
                result,
                Err(Error::NotFound("Transaction T9 not found".to_owned())),
                "{name}"
            );
        }
    }

    #[test]
    fn summarize_groups_by_subsidiary_and_sector() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 100.0, 40.0, 60.0)).unwrap();
            store.insert(record("T2", "A", "X", 50.0, 10.0, 40.0)).unwrap();

            let totals = store.summarize(&SummaryQuery::overview()).unwrap();

            assert_eq!(
                totals,
                vec![GroupTotal {
                    subsidiary: Some("A".to_owned()),
                    sector: Some("X".to_owned()),
                    total_allocated: 150.0,
                    total_spent: 50.0,
                    total_remaining: 100.0,
                }],
                "{name}"
            );
        }
    }

    #[test]
    fn summarize_filters_before_grouping() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 100.0, 40.0, 60.0)).unwrap();
            store.insert(record("T2", "B", "X", 50.0, 10.0, 40.0)).unwrap();
            store.insert(record("T3", "A", "Y", 5.0, 1.0, 4.0)).unwrap();

            let mut totals = store.summarize(&SummaryQuery::for_sector("X")).unwrap();
            totals.sort_by(|a, b| a.subsidiary.cmp(&b.subsidiary));

            assert_eq!(totals.len(), 2, "{name}");
            assert_eq!(totals[0].subsidiary.as_deref(), Some("A"), "{name}");
            assert_eq!(totals[0].sector, None, "{name}");
            assert_eq!(totals[0].total_allocated, 100.0, "{name}");
            assert_eq!(totals[1].total_spent, 10.0, "{name}");
        }
    }

    #[test]
    fn grand_total_sums_everything() {
        for (name, store) in stores() {
            store.insert(record("T1", "A", "X", 100.0, 40.0, 60.0)).unwrap();
            store.insert(record("T2", "B", "Y", 50.0, 10.0, 40.0)).unwrap();

            let totals = store.summarize(&SummaryQuery::grand_total()).unwrap();

            assert_eq!(
                totals,
                vec![GroupTotal {
                    subsidiary: None,
                    sector: None,
                    total_allocated: 150.0,
                    total_spent: 50.0,
                    total_remaining: 100.0,
                }],
                "{name}"
            );
        }
    }

    #[test]
    fn summarize_without_matches_is_not_found() {
        for (name, store) in stores() {
            assert_eq!(
                store.summarize(&SummaryQuery::overview()),
                Err(Error::NotFound("No budget data available".to_owned())),
                "{name}"
            );
            assert_eq!(
                store.summarize(&SummaryQuery::grand_total()),
                Err(Error::NotFound("No budget data available".to_owned())),
                "{name}"
            );

            store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();

            assert_eq!(
                store.summarize(&SummaryQuery::for_subsidiary("B")),
                Err(Error::NotFound(
                    "No budget data found for subsidiary: B".to_owned()
                )),
                "{name}"
            );
        }
    }
}

//! Implements a transaction store on top of a [DocumentTree].

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::{
    Error,
    record::{RecordField, TransactionRecord, TransactionUpdate, value_as_text},
    stores::{
        DocumentTree, TransactionStore, missing_transaction_error, no_transactions_error,
    },
};

/// The path of the transaction collection in the document tree.
pub const TRANSACTIONS_PATH: &str = "budget_transactions";

/// Stores transactions as a JSON collection in a document tree.
///
/// The tree only supports reading and replacing whole subtrees, so every
/// write reads the collection, changes it in memory and writes it back in
/// full. Writes through the same store are serialized by a lock; writers in
/// other processes sharing the tree can still overwrite each other.
pub struct DocumentTransactionStore {
    tree: Arc<dyn DocumentTree>,
    write_lock: Mutex<()>,
}

impl DocumentTransactionStore {
    /// Create a store that keeps its transactions under [TRANSACTIONS_PATH] in `tree`.
    pub fn new(tree: Arc<dyn DocumentTree>) -> Self {
        Self {
            tree,
            write_lock: Mutex::new(()),
        }
    }

    fn lock_for_write(&self) -> Result<MutexGuard<'_, ()>, Error> {
        self.write_lock.lock().map_err(|error| {
            tracing::error!("Could not acquire document store lock: {error}");
            Error::DatabaseLockError
        })
    }

    /// Read the raw stored documents.
    ///
    /// The collection may be stored as an array or as an object keyed by
    /// arbitrary IDs; null entries (e.g. holes left in an array) are skipped.
    fn load_documents(&self) -> Result<Vec<Value>, Error> {
        let documents = match self.tree.get(TRANSACTIONS_PATH)? {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(Value::Object(map)) => map.into_iter().map(|(_, value)| value).collect(),
            Some(other) => {
                return Err(Error::DocumentStoreError(format!(
                    "expected a collection at {TRANSACTIONS_PATH}, found {other}"
                )));
            }
        };

        Ok(documents
            .into_iter()
            .filter(|document| !document.is_null())
            .collect())
    }

    fn load_records(&self) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self
            .load_documents()?
            .iter()
            .map(TransactionRecord::from_document)
            .collect())
    }

    fn save_documents(&self, documents: Vec<Value>) -> Result<(), Error> {
        self.tree.set(TRANSACTIONS_PATH, Value::Array(documents))
    }
}

fn has_transaction_id(document: &Value, transaction_id: &str) -> bool {
    document
        .get(RecordField::TransactionId.name())
        .and_then(value_as_text)
        .is_some_and(|id| id == transaction_id)
}

impl TransactionStore for DocumentTransactionStore {
    fn insert(&self, record: TransactionRecord) -> Result<(), Error> {
        self.insert_many(vec![record]).map(|_| ())
    }

    /// Append all `records` and write the collection back once.
    fn insert_many(&self, records: Vec<TransactionRecord>) -> Result<usize, Error> {
        let _guard = self.lock_for_write()?;
        let mut documents = self.load_documents()?;
        let count = records.len();

        for record in records {
            documents.push(serde_json::to_value(record)?);
        }

        self.save_documents(documents)?;

        Ok(count)
    }

    fn scan_all(&self) -> Result<Vec<TransactionRecord>, Error> {
        let records = self.load_records()?;

        if records.is_empty() {
            return Err(no_transactions_error());
        }

        Ok(records)
    }

    fn find_by(&self, field: RecordField, value: &str) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self
            .load_records()?
            .into_iter()
            .filter(|record| field.matches(record, value))
            .collect())
    }

    /// Remove the matching documents and rewrite the remaining collection.
    fn delete(&self, transaction_id: &str) -> Result<usize, Error> {
        let _guard = self.lock_for_write()?;
        let documents = self.load_documents()?;
        let total = documents.len();

        let remaining: Vec<Value> = documents
            .into_iter()
            .filter(|document| !has_transaction_id(document, transaction_id))
            .collect();
        let removed = total - remaining.len();

        if removed == 0 {
            return Err(missing_transaction_error(transaction_id));
        }

        self.save_documents(remaining)?;

        Ok(removed)
    }

    /// Patch the matching documents in place and rewrite the collection.
    ///
    /// Keys of a stored document that are not part of the update are left
    /// untouched, including keys this crate does not know about.
    fn update(&self, transaction_id: &str, update: &TransactionUpdate) -> Result<usize, Error> {
        if update.is_empty() {
            return Err(Error::NoFieldsToUpdate);
        }

        let _guard = self.lock_for_write()?;
        let mut documents = self.load_documents()?;
        let mut updated = 0;

        for document in documents.iter_mut() {
            if !has_transaction_id(document, transaction_id) {
                continue;
            }

            if let Value::Object(fields) = document {
                update.apply_to_document(fields);
                updated += 1;
            }
        }

        if updated == 0 {
            return Err(missing_transaction_error(transaction_id));
        }

        self.save_documents(documents)?;

        Ok(updated)
    }
}

//! Implements a SQLite backed transaction store.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params_from_iter,
    types::Value,
};

use crate::{
    Error,
    aggregate::{GroupTotal, SummaryQuery},
    record::{RecordField, TransactionRecord, TransactionUpdate},
    stores::{TransactionStore, missing_transaction_error, no_transactions_error},
};

/// The name of the table holding the transactions.
pub const TABLE_NAME: &str = "budget_transactions";

const SELECT_COLUMNS: &str = "Transaction_ID, Date, Subsidiary, Sector, User_ID, \
    Allocated_Budget, Spent_Amount, Remaining_Budget, Revenue_Generated, Transaction_Type";

/// Create the tables for the domain models if they do not exist yet.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget_transactions (
                Transaction_ID TEXT NOT NULL,
                Date TEXT NOT NULL,
                Subsidiary TEXT NOT NULL,
                Sector TEXT NOT NULL,
                User_ID TEXT NOT NULL,
                Allocated_Budget REAL NOT NULL,
                Spent_Amount REAL NOT NULL,
                Remaining_Budget REAL NOT NULL,
                Revenue_Generated REAL NOT NULL,
                Transaction_Type TEXT NOT NULL
                )",
        (),
    )?;

    // Transaction IDs are not unique, but update and delete look rows up by them.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_budget_transactions_id \
        ON budget_transactions(Transaction_ID);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [TransactionRecord].
fn map_transaction_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    Ok(TransactionRecord {
        transaction_id: row.get(0)?,
        date: row.get(1)?,
        subsidiary: row.get(2)?,
        sector: row.get(3)?,
        user_id: row.get(4)?,
        allocated_budget: row.get(5)?,
        spent_amount: row.get(6)?,
        remaining_budget: row.get(7)?,
        revenue_generated: row.get(8)?,
        transaction_type: row.get(9)?,
    })
}

/// Convert the text `value` into the SQL value to compare against `field`.
///
/// Returns `None` for a numeric field and a value that is not a number, since
/// such a value can never match.
fn filter_value(field: RecordField, value: &str) -> Option<Value> {
    if field.is_numeric() {
        value.trim().parse::<f64>().ok().map(Value::Real)
    } else {
        Some(Value::Text(value.to_owned()))
    }
}

/// An UPDATE statement and its positional parameters.
#[derive(Debug, PartialEq)]
struct UpdateStatement {
    sql: String,
    params: Vec<Value>,
}

/// Build the statement that applies `update` to the rows with `transaction_id`.
///
/// Column names come from [RecordField] and every value is bound as a
/// parameter, with the ID bound last.
///
/// # Errors
/// Returns [Error::NoFieldsToUpdate] if `update` does not supply any field.
fn build_update_statement(
    transaction_id: &str,
    update: &TransactionUpdate,
) -> Result<UpdateStatement, Error> {
    let assignments = update.assignments();

    if assignments.is_empty() {
        return Err(Error::NoFieldsToUpdate);
    }

    let mut set_clause_parts = Vec::with_capacity(assignments.len());
    let mut params: Vec<Value> = Vec::with_capacity(assignments.len() + 1);

    for (field, value) in assignments {
        params.push(value.into());
        set_clause_parts.push(format!("{} = ?{}", field.name(), params.len()));
    }

    params.push(Value::Text(transaction_id.to_owned()));

    let sql = format!(
        "UPDATE {TABLE_NAME} SET {} WHERE Transaction_ID = ?{}",
        set_clause_parts.join(", "),
        params.len()
    );

    Ok(UpdateStatement { sql, params })
}

/// Stores transactions in a SQLite database.
///
/// The table must have been created with [initialize] first.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("Could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl TransactionStore for SQLiteTransactionStore {
    fn insert(&self, record: TransactionRecord) -> Result<(), Error> {
        self.lock()?.execute(
            "INSERT INTO budget_transactions (Transaction_ID, Date, Subsidiary, Sector, User_ID, \
            Allocated_Budget, Spent_Amount, Remaining_Budget, Revenue_Generated, Transaction_Type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            (
                record.transaction_id,
                record.date,
                record.subsidiary,
                record.sector,
                record.user_id,
                record.allocated_budget,
                record.spent_amount,
                record.remaining_budget,
                record.revenue_generated,
                record.transaction_type,
            ),
        )?;

        Ok(())
    }

    /// Insert all `records` in a single SQL transaction.
    ///
    /// Either every record is inserted or none are.
    fn insert_many(&self, records: Vec<TransactionRecord>) -> Result<usize, Error> {
        let connection = self.lock()?;
        let tx = connection.unchecked_transaction()?;

        // Prepare the insert statement once for reuse
        let mut stmt = tx.prepare(
            "INSERT INTO budget_transactions (Transaction_ID, Date, Subsidiary, Sector, User_ID, \
            Allocated_Budget, Spent_Amount, Remaining_Budget, Revenue_Generated, Transaction_Type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;

        let mut inserted = 0;
        for record in records {
            inserted += stmt.execute((
                record.transaction_id,
                record.date,
                record.subsidiary,
                record.sector,
                record.user_id,
                record.allocated_budget,
                record.spent_amount,
                record.remaining_budget,
                record.revenue_generated,
                record.transaction_type,
            ))?;
        }

        drop(stmt);

        tx.commit()?;
        Ok(inserted)
    }

    fn scan_all(&self) -> Result<Vec<TransactionRecord>, Error> {
        let records = self
            .lock()?
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM {TABLE_NAME} ORDER BY rowid"
            ))?
            .query_map([], map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if records.is_empty() {
            return Err(no_transactions_error());
        }

        Ok(records)
    }

    fn find_by(&self, field: RecordField, value: &str) -> Result<Vec<TransactionRecord>, Error> {
        let Some(value) = filter_value(field, value) else {
            return Ok(Vec::new());
        };

        let records = self
            .lock()?
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM {TABLE_NAME} WHERE {} = ?1 ORDER BY rowid",
                field.name()
            ))?
            .query_map([value], map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn delete(&self, transaction_id: &str) -> Result<usize, Error> {
        let rows_affected = self.lock()?.execute(
            "DELETE FROM budget_transactions WHERE Transaction_ID = :transaction_id",
            &[(":transaction_id", &transaction_id)],
        )?;

        if rows_affected == 0 {
            return Err(missing_transaction_error(transaction_id));
        }

        Ok(rows_affected)
    }

    fn update(&self, transaction_id: &str, update: &TransactionUpdate) -> Result<usize, Error> {
        let statement = build_update_statement(transaction_id, update)?;

        let rows_affected = self
            .lock()?
            .execute(&statement.sql, params_from_iter(statement.params.iter()))?;

        if rows_affected == 0 {
            return Err(missing_transaction_error(transaction_id));
        }

        Ok(rows_affected)
    }

    /// Filter and group the transactions in SQL.
    ///
    /// Groups are returned in whatever order SQLite produces them.
    fn summarize(&self, query: &SummaryQuery) -> Result<Vec<GroupTotal>, Error> {
        let key_fields = query.group_by.fields();
        let key_columns: Vec<&str> = key_fields.iter().map(|field| field.name()).collect();

        let mut select_parts = key_columns.clone();
        select_parts.extend([
            "SUM(Allocated_Budget)",
            "SUM(Spent_Amount)",
            "SUM(Remaining_Budget)",
            "COUNT(*)",
        ]);

        let mut query_string_parts = vec![format!(
            "SELECT {} FROM {TABLE_NAME}",
            select_parts.join(", ")
        )];
        let mut query_parameters = vec![];

        if let Some(filter) = &query.filter {
            let Some(value) = filter_value(filter.field, &filter.value) else {
                return Err(Error::NotFound(query.not_found_message()));
            };
            query_string_parts.push(format!("WHERE {} = ?1", filter.field.name()));
            query_parameters.push(value);
        }

        if !key_columns.is_empty() {
            query_string_parts.push(format!("GROUP BY {}", key_columns.join(", ")));
        }

        let query_string = query_string_parts.join(" ");
        let connection = self.lock()?;
        let mut stmt = connection.prepare(&query_string)?;
        let rows = stmt.query_map(params_from_iter(query_parameters.iter()), |row| {
            let mut total = GroupTotal {
                subsidiary: None,
                sector: None,
                total_allocated: 0.0,
                total_spent: 0.0,
                total_remaining: 0.0,
            };

            for (column, field) in key_fields.iter().enumerate() {
                let key: String = row.get(column)?;
                match field {
                    RecordField::Subsidiary => total.subsidiary = Some(key),
                    _ => total.sector = Some(key),
                }
            }

            let offset = key_fields.len();
            // SUM over zero rows is NULL.
            total.total_allocated = row.get::<_, Option<f64>>(offset)?.unwrap_or(0.0);
            total.total_spent = row.get::<_, Option<f64>>(offset + 1)?.unwrap_or(0.0);
            total.total_remaining = row.get::<_, Option<f64>>(offset + 2)?.unwrap_or(0.0);
            let count: i64 = row.get(offset + 3)?;

            Ok((total, count))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (total, count) = row?;
            // An ungrouped aggregate yields one row even when nothing matched.
            if count > 0 {
                totals.push(total);
            }
        }

        if totals.is_empty() {
            return Err(Error::NotFound(query.not_found_message()));
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::{Connection, types::Value};

    use crate::{
        Error, TransactionUpdate,
        aggregate::SummaryQuery,
        record::test_records::record,
        stores::{
            TransactionStore,
            sqlite::{SQLiteTransactionStore, UpdateStatement, build_update_statement, initialize},
        },
    };

    fn get_test_store() -> SQLiteTransactionStore {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        SQLiteTransactionStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }

    #[test]
    fn update_statement_binds_values_in_order() {
        let update = TransactionUpdate {
            date: Some("2024-05-01".to_owned()),
            spent_amount: Some(75.0),
            ..Default::default()
        };

        let statement = build_update_statement("T1", &update).unwrap();

        assert_eq!(
            statement,
            UpdateStatement {
                sql: "UPDATE budget_transactions SET Date = ?1, Spent_Amount = ?2 \
                    WHERE Transaction_ID = ?3"
                    .to_owned(),
                params: vec![
                    Value::Text("2024-05-01".to_owned()),
                    Value::Real(75.0),
                    Value::Text("T1".to_owned()),
                ],
            }
        );
    }

    #[test]
    fn update_statement_needs_a_field() {
        assert_eq!(
            build_update_statement("T1", &TransactionUpdate::default()),
            Err(Error::NoFieldsToUpdate)
        );
    }

    #[test]
    fn caller_text_is_stored_literally() {
        let store = get_test_store();
        store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();
        let hostile = "X'; DROP TABLE budget_transactions; --".to_owned();

        store
            .update(
                "T1",
                &TransactionUpdate {
                    sector: Some(hostile.clone()),
                    ..Default::default()
                },
            )
            .unwrap();

        let records = store.scan_all().unwrap();
        assert_eq!(records[0].sector, hostile);
    }

    #[test]
    fn numeric_filter_that_is_not_a_number_matches_nothing() {
        let store = get_test_store();
        store.insert(record("T1", "A", "X", 1.0, 0.0, 1.0)).unwrap();

        let records = store
            .find_by(crate::record::RecordField::SpentAmount, "lots")
            .unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn insert_many_is_atomic_on_one_connection() {
        let store = get_test_store();
        let records = (1..=20)
            .map(|i| record(&format!("T{i}"), "A", "X", i as f64, 0.0, i as f64))
            .collect();

        let count = store.insert_many(records).unwrap();

        assert_eq!(count, 20);
        let totals = store.summarize(&SummaryQuery::grand_total()).unwrap();
        assert_eq!(totals[0].total_allocated, 210.0);
    }
}

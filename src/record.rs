//! The transaction record model and the partial update applied to it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The text used for a missing text field when a record is decoded from a document.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A single budget transaction.
///
/// The serialized field names match the columns of the budget spreadsheet, so
/// the same type is used for JSON request bodies, CSV rows and stored documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Caller-supplied identifier. Uniqueness is not enforced.
    #[serde(rename = "Transaction_ID")]
    pub transaction_id: String,
    /// Free-form date text, stored as given.
    #[serde(rename = "Date")]
    pub date: String,
    /// The company in the group that the budget belongs to.
    #[serde(rename = "Subsidiary")]
    pub subsidiary: String,
    /// The business area, e.g. "Retail" or "Technology".
    #[serde(rename = "Sector")]
    pub sector: String,
    /// Who recorded the transaction.
    #[serde(rename = "User_ID")]
    pub user_id: String,
    /// The amount budgeted.
    #[serde(rename = "Allocated_Budget")]
    pub allocated_budget: f64,
    /// The amount spent so far.
    #[serde(rename = "Spent_Amount")]
    pub spent_amount: f64,
    /// Stored as given, never derived from the allocated and spent amounts.
    #[serde(rename = "Remaining_Budget")]
    pub remaining_budget: f64,
    /// Revenue attributed to the transaction.
    #[serde(rename = "Revenue_Generated")]
    pub revenue_generated: f64,
    /// Free-form category such as "Expense" or "Investment".
    #[serde(rename = "Transaction_Type")]
    pub transaction_type: String,
}

impl TransactionRecord {
    /// Decode a record from a stored document, tolerating missing fields.
    ///
    /// Missing or null text fields become [UNKNOWN_LABEL] and missing numbers
    /// become zero. Numbers stored where text is expected (e.g. a numeric
    /// transaction ID) are converted to their text form.
    pub fn from_document(document: &Value) -> Self {
        let text = |field: RecordField| {
            document
                .get(field.name())
                .and_then(value_as_text)
                .unwrap_or_else(|| UNKNOWN_LABEL.to_owned())
        };
        let number = |field: RecordField| {
            document
                .get(field.name())
                .and_then(value_as_number)
                .unwrap_or(0.0)
        };

        Self {
            transaction_id: text(RecordField::TransactionId),
            date: text(RecordField::Date),
            subsidiary: text(RecordField::Subsidiary),
            sector: text(RecordField::Sector),
            user_id: text(RecordField::UserId),
            allocated_budget: number(RecordField::AllocatedBudget),
            spent_amount: number(RecordField::SpentAmount),
            remaining_budget: number(RecordField::RemainingBudget),
            revenue_generated: number(RecordField::RevenueGenerated),
            transaction_type: text(RecordField::TransactionType),
        }
    }

    /// Get the value of `field` for this record.
    pub fn get(&self, field: RecordField) -> FieldValue {
        match field {
            RecordField::TransactionId => FieldValue::Text(self.transaction_id.clone()),
            RecordField::Date => FieldValue::Text(self.date.clone()),
            RecordField::Subsidiary => FieldValue::Text(self.subsidiary.clone()),
            RecordField::Sector => FieldValue::Text(self.sector.clone()),
            RecordField::UserId => FieldValue::Text(self.user_id.clone()),
            RecordField::AllocatedBudget => FieldValue::Number(self.allocated_budget),
            RecordField::SpentAmount => FieldValue::Number(self.spent_amount),
            RecordField::RemainingBudget => FieldValue::Number(self.remaining_budget),
            RecordField::RevenueGenerated => FieldValue::Number(self.revenue_generated),
            RecordField::TransactionType => FieldValue::Text(self.transaction_type.clone()),
        }
    }
}

/// Read a JSON value as text, converting numbers and booleans.
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// The fields of a [TransactionRecord].
///
/// This is the whitelist of names that may appear in generated SQL, so column
/// names never come from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    /// `Transaction_ID`
    TransactionId,
    /// `Date`
    Date,
    /// `Subsidiary`
    Subsidiary,
    /// `Sector`
    Sector,
    /// `User_ID`
    UserId,
    /// `Allocated_Budget`
    AllocatedBudget,
    /// `Spent_Amount`
    SpentAmount,
    /// `Remaining_Budget`
    RemainingBudget,
    /// `Revenue_Generated`
    RevenueGenerated,
    /// `Transaction_Type`
    TransactionType,
}

impl RecordField {
    /// The column/key name used in storage and on the wire.
    pub fn name(self) -> &'static str {
        match self {
            RecordField::TransactionId => "Transaction_ID",
            RecordField::Date => "Date",
            RecordField::Subsidiary => "Subsidiary",
            RecordField::Sector => "Sector",
            RecordField::UserId => "User_ID",
            RecordField::AllocatedBudget => "Allocated_Budget",
            RecordField::SpentAmount => "Spent_Amount",
            RecordField::RemainingBudget => "Remaining_Budget",
            RecordField::RevenueGenerated => "Revenue_Generated",
            RecordField::TransactionType => "Transaction_Type",
        }
    }

    /// Whether the field holds an amount rather than text.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            RecordField::AllocatedBudget
                | RecordField::SpentAmount
                | RecordField::RemainingBudget
                | RecordField::RevenueGenerated
        )
    }

    /// Check whether `record` holds `value` in this field.
    ///
    /// Numeric fields are compared as numbers, so "100" matches 100.0. A value
    /// that does not parse as a number never matches a numeric field.
    pub fn matches(self, record: &TransactionRecord, value: &str) -> bool {
        match record.get(self) {
            FieldValue::Text(text) => text == value,
            FieldValue::Number(number) => value
                .trim()
                .parse::<f64>()
                .is_ok_and(|wanted| wanted == number),
        }
    }
}

/// A single field value, used when binding SQL parameters or patching documents.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The value of a text field.
    Text(String),
    /// The value of an amount field.
    Number(f64),
}

impl From<FieldValue> for rusqlite::types::Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => rusqlite::types::Value::Text(text),
            FieldValue::Number(number) => rusqlite::types::Value::Real(number),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Value::String(text),
            FieldValue::Number(number) => Value::from(number),
        }
    }
}

/// A partial update of a transaction.
///
/// Only the supplied fields are changed. The transaction ID cannot be updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionUpdate {
    /// New date text.
    #[serde(rename = "Date", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// New subsidiary.
    #[serde(rename = "Subsidiary", skip_serializing_if = "Option::is_none")]
    pub subsidiary: Option<String>,
    /// New sector.
    #[serde(rename = "Sector", skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// New user ID.
    #[serde(rename = "User_ID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// New allocated amount.
    #[serde(rename = "Allocated_Budget", skip_serializing_if = "Option::is_none")]
    pub allocated_budget: Option<f64>,
    /// New spent amount.
    #[serde(rename = "Spent_Amount", skip_serializing_if = "Option::is_none")]
    pub spent_amount: Option<f64>,
    /// New remaining amount. Not recomputed from the other amounts.
    #[serde(rename = "Remaining_Budget", skip_serializing_if = "Option::is_none")]
    pub remaining_budget: Option<f64>,
    /// New revenue amount.
    #[serde(rename = "Revenue_Generated", skip_serializing_if = "Option::is_none")]
    pub revenue_generated: Option<f64>,
    /// New transaction type.
    #[serde(rename = "Transaction_Type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
}

impl TransactionUpdate {
    /// The supplied fields and their new values, in column order.
    pub fn assignments(&self) -> Vec<(RecordField, FieldValue)> {
        let text = |field, value: &Option<String>| {
            value
                .as_ref()
                .map(|value| (field, FieldValue::Text(value.clone())))
        };
        let number = |field, value: Option<f64>| value.map(|value| (field, FieldValue::Number(value)));

        [
            text(RecordField::Date, &self.date),
            text(RecordField::Subsidiary, &self.subsidiary),
            text(RecordField::Sector, &self.sector),
            text(RecordField::UserId, &self.user_id),
            number(RecordField::AllocatedBudget, self.allocated_budget),
            number(RecordField::SpentAmount, self.spent_amount),
            number(RecordField::RemainingBudget, self.remaining_budget),
            number(RecordField::RevenueGenerated, self.revenue_generated),
            text(RecordField::TransactionType, &self.transaction_type),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Returns true if no field was supplied.
    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Write the supplied fields into a stored document, leaving all other keys as they are.
    pub(crate) fn apply_to_document(&self, document: &mut Map<String, Value>) {
        for (field, value) in self.assignments() {
            document.insert(field.name().to_owned(), value.into());
        }
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::record::{
        FieldValue, RecordField, TransactionRecord, TransactionUpdate, UNKNOWN_LABEL,
        test_records::record,
    };

    #[test]
    fn deserializes_spreadsheet_field_names() {
        let record: TransactionRecord = serde_json::from_value(json!({
            "Transaction_ID": "T1",
            "Date": "2024-01-05",
            "Subsidiary": "Acme Retail",
            "Sector": "Marketing",
            "User_ID": "U7",
            "Allocated_Budget": 100.0,
            "Spent_Amount": 40.0,
            "Remaining_Budget": 60.0,
            "Revenue_Generated": 12.5,
            "Transaction_Type": "Expense"
        }))
        .unwrap();

        assert_eq!(record.transaction_id, "T1");
        assert_eq!(record.subsidiary, "Acme Retail");
        assert_eq!(record.remaining_budget, 60.0);
        assert_eq!(record.revenue_generated, 12.5);
    }

    #[test]
    fn document_with_missing_fields_uses_defaults() {
        let document = json!({
            "Transaction_ID": 42,
            "Sector": "IT",
            "Allocated_Budget": 10,
            "Spent_Amount": "4.5"
        });

        let record = TransactionRecord::from_document(&document);

        assert_eq!(record.transaction_id, "42");
        assert_eq!(record.subsidiary, UNKNOWN_LABEL);
        assert_eq!(record.sector, "IT");
        assert_eq!(record.allocated_budget, 10.0);
        assert_eq!(record.spent_amount, 4.5);
        assert_eq!(record.remaining_budget, 0.0);
    }

    #[test]
    fn numeric_field_matches_by_value() {
        let record = record("T1", "A", "X", 100.0, 40.0, 60.0);

        assert!(RecordField::AllocatedBudget.matches(&record, "100"));
        assert!(RecordField::AllocatedBudget.matches(&record, "100.0"));
        assert!(!RecordField::AllocatedBudget.matches(&record, "abc"));
        assert!(RecordField::Subsidiary.matches(&record, "A"));
        assert!(!RecordField::Subsidiary.matches(&record, "a"));
    }

    #[test]
    fn update_lists_only_supplied_fields() {
        let update = TransactionUpdate {
            spent_amount: Some(75.0),
            sector: Some("Ops".to_owned()),
            ..Default::default()
        };

        assert_eq!(
            update.assignments(),
            vec![
                (RecordField::Sector, FieldValue::Text("Ops".to_owned())),
                (RecordField::SpentAmount, FieldValue::Number(75.0)),
            ]
        );
        assert!(!update.is_empty());
        assert!(TransactionUpdate::default().is_empty());
    }

    #[test]
    fn update_from_empty_body_is_empty() {
        let update: TransactionUpdate = serde_json::from_value(json!({})).unwrap();

        assert!(update.is_empty());
    }

    #[test]
    fn apply_to_document_keeps_other_keys() {
        let mut document = json!({
            "Transaction_ID": "T1",
            "Spent_Amount": 10.0,
            "Notes": "kept"
        })
        .as_object()
        .cloned()
        .unwrap();
        let update = TransactionUpdate {
            spent_amount: Some(75.0),
            ..Default::default()
        };

        update.apply_to_document(&mut document);

        assert_eq!(document["Spent_Amount"], json!(75.0));
        assert_eq!(document["Notes"], json!("kept"));
        assert_eq!(document["Transaction_ID"], json!("T1"));
    }
}

//! Group-by-sum aggregation of transaction amounts.
//!
//! Records are filtered first (see [SummaryQuery]) and then bucketed by
//! subsidiary, sector, both or neither. Each bucket sums the allocated, spent
//! and remaining amounts with plain floating-point addition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    record::{RecordField, TransactionRecord},
};

/// The fields records are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// A single group holding every record.
    None,
    /// One group per subsidiary.
    Subsidiary,
    /// One group per sector.
    Sector,
    /// One group per subsidiary and sector pair.
    SubsidiaryAndSector,
}

impl GroupBy {
    /// The record fields that make up the group key.
    pub fn fields(self) -> &'static [RecordField] {
        match self {
            GroupBy::None => &[],
            GroupBy::Subsidiary => &[RecordField::Subsidiary],
            GroupBy::Sector => &[RecordField::Sector],
            GroupBy::SubsidiaryAndSector => &[RecordField::Subsidiary, RecordField::Sector],
        }
    }

    fn includes_subsidiary(self) -> bool {
        matches!(self, GroupBy::Subsidiary | GroupBy::SubsidiaryAndSector)
    }

    fn includes_sector(self) -> bool {
        matches!(self, GroupBy::Sector | GroupBy::SubsidiaryAndSector)
    }
}

/// The summed amounts for one group.
///
/// Key fields that are not part of the grouping are left out when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    /// The subsidiary of the group, if grouped by subsidiary.
    #[serde(
        rename = "Subsidiary",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subsidiary: Option<String>,
    /// The sector of the group, if grouped by sector.
    #[serde(rename = "Sector", default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Sum of the allocated amounts.
    pub total_allocated: f64,
    /// Sum of the spent amounts.
    pub total_spent: f64,
    /// Sum of the remaining amounts as stored.
    pub total_remaining: f64,
}

impl GroupTotal {
    fn empty(subsidiary: Option<String>, sector: Option<String>) -> Self {
        Self {
            subsidiary,
            sector,
            total_allocated: 0.0,
            total_spent: 0.0,
            total_remaining: 0.0,
        }
    }

    fn add(&mut self, record: &TransactionRecord) {
        self.total_allocated += record.allocated_budget;
        self.total_spent += record.spent_amount;
        self.total_remaining += record.remaining_budget;
    }
}

/// An equality match on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    /// The field to compare.
    pub field: RecordField,
    /// The wanted value. Parsed as a number for amount fields.
    pub value: String,
}

/// Which records to summarize and how to group them.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryQuery {
    /// Only records matching this filter are summed, if set.
    pub filter: Option<RecordFilter>,
    /// How the matching records are bucketed.
    pub group_by: GroupBy,
}

impl SummaryQuery {
    /// Totals for every subsidiary and sector pair.
    pub fn overview() -> Self {
        Self {
            filter: None,
            group_by: GroupBy::SubsidiaryAndSector,
        }
    }

    /// Totals for a single subsidiary, broken down by sector.
    pub fn for_subsidiary(subsidiary: &str) -> Self {
        Self {
            filter: Some(RecordFilter {
                field: RecordField::Subsidiary,
                value: subsidiary.to_owned(),
            }),
            group_by: GroupBy::Sector,
        }
    }

    /// Totals for a single sector, broken down by subsidiary.
    pub fn for_sector(sector: &str) -> Self {
        Self {
            filter: Some(RecordFilter {
                field: RecordField::Sector,
                value: sector.to_owned(),
            }),
            group_by: GroupBy::Subsidiary,
        }
    }

    /// The grand total over all records.
    pub fn grand_total() -> Self {
        Self {
            filter: None,
            group_by: GroupBy::None,
        }
    }

    /// The message for the error returned when the query matches no records.
    pub fn not_found_message(&self) -> String {
        match &self.filter {
            Some(RecordFilter {
                field: RecordField::Subsidiary,
                value,
            }) => format!("No budget data found for subsidiary: {value}"),
            Some(RecordFilter {
                field: RecordField::Sector,
                value,
            }) => format!("No budget data found for sector: {value}"),
            Some(RecordFilter { field, value }) => {
                format!("No budget data found for {}: {value}", field.name())
            }
            None => "No budget data available".to_owned(),
        }
    }

    /// Run the query over in-memory `records`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if no record passes the filter.
    pub fn run(&self, records: &[TransactionRecord]) -> Result<Vec<GroupTotal>, Error> {
        let matching: Vec<TransactionRecord> = match &self.filter {
            Some(filter) => records
                .iter()
                .filter(|record| filter.field.matches(record, &filter.value))
                .cloned()
                .collect(),
            None => records.to_vec(),
        };

        aggregate(&matching, self.group_by).map_err(|error| match error {
            Error::NotFound(_) => Error::NotFound(self.not_found_message()),
            error => error,
        })
    }
}

/// Sum the amounts of `records` per group.
///
/// Groups are returned in the order their first record appears in `records`.
///
/// # Errors
/// Returns [Error::NotFound] if `records` is empty. An empty input never
/// produces an empty list.
pub fn aggregate(
    records: &[TransactionRecord],
    group_by: GroupBy,
) -> Result<Vec<GroupTotal>, Error> {
    if records.is_empty() {
        return Err(Error::NotFound("No budget data available".to_owned()));
    }

    let mut totals: Vec<GroupTotal> = Vec::new();
    let mut group_index: HashMap<(Option<&str>, Option<&str>), usize> = HashMap::new();

    for record in records {
        let subsidiary = group_by
            .includes_subsidiary()
            .then_some(record.subsidiary.as_str());
        let sector = group_by.includes_sector().then_some(record.sector.as_str());

        let index = *group_index.entry((subsidiary, sector)).or_insert_with(|| {
            totals.push(GroupTotal::empty(
                subsidiary.map(str::to_owned),
                sector.map(str::to_owned),
            ));
            totals.len() - 1
        });

        totals[index].add(record);
    }

    Ok(totals)
}

//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/budget/sector/{sector}', use [format_endpoint].

/// The root route which greets the caller.
pub const ROOT: &str = "/";
/// The HTML dashboard with the budget summary.
pub const DASHBOARD: &str = "/dashboard";

/// The route for the totals grouped by subsidiary and sector.
pub const BUDGET_SUMMARY: &str = "/budget/summary";
/// The route for the per-sector totals of one subsidiary.
pub const BUDGET_BY_SUBSIDIARY: &str = "/budget/subsidiary/{subsidiary}";
/// The route for the per-subsidiary totals of one sector.
pub const BUDGET_BY_SECTOR: &str = "/budget/sector/{sector}";
/// The route for the totals over every transaction.
pub const BUDGET_TOTAL: &str = "/budget/total";

/// The route to list all transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to add a transaction.
pub const ADD_TRANSACTION: &str = "/transactions/add";
/// The route to update the transactions with a given ID.
pub const UPDATE_TRANSACTION: &str = "/transactions/update/{transaction_id}";
/// The route to delete the transactions with a given ID.
pub const DELETE_TRANSACTION: &str = "/transactions/delete/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/budget/sector/{sector}', '{sector}' is the parameter.
///
/// `value` is inserted as is, so it should not contain characters that need
/// percent-encoding. This function assumes that an endpoint path only
/// contains ASCII characters and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, value: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        value,
        &endpoint_path[param_end..]
    )
}

//! The read-only dashboard page with the budget summary.
//!
//! The page is guarded by the same bearer token check as the JSON routes, so
//! a plain browser visit gets a 401. Open it with a client that sends the
//! header, e.g. `curl -H "Authorization: Bearer <token>" http://127.0.0.1:8000/dashboard`,
//! or a browser extension that adds it.

use std::sync::{Arc, OnceLock};

use axum::extract::State;
use maud::{DOCTYPE, Markup, html};
use numfmt::{Formatter, Precision};

use crate::{
    Error, TransactionStore,
    access::Viewer,
    aggregate::{GroupTotal, SummaryQuery},
    record::UNKNOWN_LABEL,
};

const TABLE_STYLE: &str = "border-collapse: collapse; min-width: 40rem;";
const CELL_STYLE: &str = "border: 1px solid #ccc; padding: 0.25rem 0.75rem;";
const AMOUNT_STYLE: &str = "border: 1px solid #ccc; padding: 0.25rem 0.75rem; text-align: right;";

/// Render the budget summary per subsidiary and sector with a grand total.
///
/// An empty store shows a message instead of an error page. Requires an
/// `Authorization: Bearer` header with a token whose role can view.
pub async fn get_dashboard_page(
    _: Viewer,
    State(store): State<Arc<dyn TransactionStore>>,
) -> Result<Markup, Error> {
    let summary = match store.summarize(&SummaryQuery::overview()) {
        Ok(summary) => summary,
        Err(Error::NotFound(_)) => Vec::new(),
        Err(error) => return Err(error),
    };

    Ok(dashboard_view(&summary, &grand_total(&summary)))
}

fn grand_total(summary: &[GroupTotal]) -> GroupTotal {
    summary.iter().fold(
        GroupTotal {
            subsidiary: None,
            sector: None,
            total_allocated: 0.0,
            total_spent: 0.0,
            total_remaining: 0.0,
        },
        |mut total, group| {
            total.total_allocated += group.total_allocated;
            total.total_spent += group.total_spent;
            total.total_remaining += group.total_remaining;
            total
        },
    )
}

fn dashboard_view(summary: &[GroupTotal], total: &GroupTotal) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Budget Dashboard" }
            }

            body style="font-family: sans-serif; margin: 2rem;"
            {
                h1 { "Budget Dashboard" }

                section #summary
                {
                    h2 { "Budget Summary" }

                    @if summary.is_empty() {
                        p #no-data { "No budget data available" }
                    } @else {
                        (summary_table(summary, total))
                    }
                }
            }
        }
    }
}

fn summary_table(summary: &[GroupTotal], total: &GroupTotal) -> Markup {
    html! {
        table style=(TABLE_STYLE)
        {
            thead
            {
                tr
                {
                    th style=(CELL_STYLE) { "Subsidiary" }
                    th style=(CELL_STYLE) { "Sector" }
                    th style=(CELL_STYLE) { "Allocated" }
                    th style=(CELL_STYLE) { "Spent" }
                    th style=(CELL_STYLE) { "Remaining" }
                }
            }

            tbody
            {
                @for group in summary {
                    tr
                    {
                        td style=(CELL_STYLE) { (group.subsidiary.as_deref().unwrap_or(UNKNOWN_LABEL)) }
                        td style=(CELL_STYLE) { (group.sector.as_deref().unwrap_or(UNKNOWN_LABEL)) }
                        td style=(AMOUNT_STYLE) { (format_currency(group.total_allocated)) }
                        td style=(AMOUNT_STYLE) { (format_currency(group.total_spent)) }
                        td style=(AMOUNT_STYLE) { (format_currency(group.total_remaining)) }
                    }
                }
            }

            tfoot #grand-total
            {
                tr
                {
                    th style=(CELL_STYLE) colspan="2" { "Total" }
                    td style=(AMOUNT_STYLE) { (format_currency(total.total_allocated)) }
                    td style=(AMOUNT_STYLE) { (format_currency(total.total_spent)) }
                    td style=(AMOUNT_STYLE) { (format_currency(total.total_remaining)) }
                }
            }
        }
    }
}

/// Format `number` as a dollar amount with two decimal places, e.g. "$1,234.50".
///
/// The amount is rounded to the nearest cent first, so float noise such as
/// `0.1 + 0.2 - 0.3` renders as "$0.00".
pub(crate) fn format_currency(number: f64) -> String {
    static DOLLARS_FMT: OnceLock<Formatter> = OnceLock::new();

    let dollars_fmt = DOLLARS_FMT.get_or_init(|| {
        Formatter::currency("$")
            .expect("\"$\" is a valid currency symbol")
            .precision(Precision::Decimals(0))
    });

    let total_cents = (number.abs() * 100.0).round();
    if total_cents == 0.0 {
        return "$0.00".to_owned();
    }

    let dollars = (total_cents / 100.0).trunc();
    let cents = (total_cents - dollars * 100.0) as u8;
    // Zero is hardcoded as "0" by numfmt.
    let dollars = if dollars == 0.0 {
        "$0".to_owned()
    } else {
        dollars_fmt.fmt_string(dollars)
    };
    let sign = if number < 0.0 { "-" } else { "" };

    format!("{sign}{dollars}.{cents:02}")
}

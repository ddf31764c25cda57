//! Tally - a plain-text double-entry accounting engine
//! ---
//!
//! Tally parses a line-oriented journal format, keeps every transaction's
//! postings summing to zero, aggregates balances, registers, calendar
//! periods and summary statistics, and auto-categorizes bank-export CSV
//! rows into posting pairs with a Naive-Bayes classifier trained on the
//! journal itself.
//!
//! The journal text format is the crate's de-facto interface:
//!
//! ```text
//! ; comments attach to the transaction that follows
//! 2024/01/15 Coffee Shop
//!     Expenses:Food:Coffee    4.50
//!     Assets:Cash
//! ```
//!
//! A transaction header is `YYYY/MM/DD payee` (`-` and `.` separators are
//! accepted on input; `/` is canonical on output). Postings are indented by
//! four spaces or a tab, with two or more spaces between account name and
//! amount; at most one posting per transaction may omit its amount and is
//! inferred as the negation of the others. Account hierarchy is implied by
//! `:`-separated name prefixes; accounts are never pre-registered. Blank
//! lines separate transactions, and by convention a journal file ends with
//! two blank lines after the final transaction.
//!
//! Everything here is a pure, synchronous function over immutable inputs;
//! file and terminal handling belong to the client code.

extern crate pest;
#[macro_use]
extern crate pest_derive;

/// Monetary values with epsilon-tolerant comparisons.
pub mod amount;

/// Naive-Bayes payee classification against destination accounts.
pub mod classify;

/// The CSV-to-posting-pair import pipeline.
pub mod import;

/// JSON transaction records and journal export.
pub mod json;

/// Balance, register, period, and statistics aggregation, plus journal
/// filters and the equity snapshot.
pub mod ledger;

/// Our main parser entrypoint.
pub mod parser;

/// Plain-text report rendering.
pub mod report;

mod transaction;

pub use amount::Amount;
pub use classify::{Classifier, UNKNOWN_ACCOUNT};
pub use import::{import_csv, ImportOptions};
pub use ledger::{
    account_totals, accounts, balances, balances_by_period, equity, filter_by_date,
    filter_by_payee, register, stats, transactions_by_period, AccountBalance, BalanceOptions,
    BalanceReport, LedgerStats, Period, PeriodBalances, PeriodBucket, RegisterRow, TimeSinceLast,
};
pub use parser::parse;
pub use transaction::{Posting, Transaction};

use thiserror::Error;

/// Errors that abort a whole operation.
///
/// Everything else - garbage lines, malformed header dates, unparsable CSV
/// rows - is tolerated and only shrinks the output; a transaction is either
/// fully finalized and balanced or not present at all.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("multiple empty accounts in transaction `{payee}'")]
    MultipleElided { payee: String },

    #[error("transaction not balanced: {payee} (diff: {difference})")]
    Unbalanced { payee: String, difference: Amount },

    #[error("unable to find an account matching `{hint}'")]
    NoMatchingAccount { hint: String },

    #[error("unable to find required column(s) in the CSV header: {missing}")]
    MissingCsvColumns { missing: String },

    #[error("journal has no transactions")]
    EmptyJournal,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

use crate::amount::Amount;
use crate::transaction::{Posting, Transaction};
use crate::LedgerError;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use indexmap::{IndexMap, IndexSet};

use std::collections::HashSet;
use std::fmt;

/// A summed balance for one account name.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountBalance {
    pub name: String,
    pub balance: Amount,
}

/// Display options for the consolidated balance report.
///
/// `filters` are case-sensitive substrings matched against account names
/// (empty means all). `max_depth` counts colon-separated segments; `None`
/// is unlimited. Zero balances are dropped unless `include_empty` is set.
#[derive(Clone, Debug, Default)]
pub struct BalanceOptions {
    pub filters: Vec<String>,
    pub max_depth: Option<usize>,
    pub include_empty: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BalanceReport {
    pub accounts: Vec<AccountBalance>,
    /// Sum of the unconsolidated leaf balances, not of the displayed rows.
    pub total: Amount,
}

/// Calendar partition granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    Monthly,
    Quarterly,
    SemiYearly,
    Yearly,
}

impl Period {
    fn key_for(&self, date: NaiveDate) -> String {
        match self {
            Period::Monthly => format!("{}-{:02}", date.year(), date.month()),
            Period::Quarterly => format!("{}-Q{}", date.year(), (date.month() + 2) / 3),
            Period::SemiYearly => {
                format!("{}-H{}", date.year(), if date.month() <= 6 { 1 } else { 2 })
            }
            Period::Yearly => date.year().to_string(),
        }
    }
}

/// One calendar bucket. `start`/`end` are the first and last transaction
/// dates actually present, not the calendar boundaries.
#[derive(Clone, Debug)]
pub struct PeriodBucket<'t> {
    pub key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub transactions: Vec<&'t Transaction>,
}

#[derive(Clone, Debug)]
pub struct PeriodBalances {
    pub key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Leaf balances of this bucket alone; periods never carry totals
    /// forward into each other.
    pub balances: Vec<AccountBalance>,
}

/// One register row. The running total accumulates over every matching
/// posting in chronological order, across transaction boundaries.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterRow<'t> {
    pub date: NaiveDate,
    pub payee: &'t str,
    pub account: &'t str,
    pub amount: Amount,
    pub running: Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeSinceLast {
    Hours(i64),
    Days(i64),
}

impl fmt::Display for TimeSinceLast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSinceLast::Hours(hours) => {
                write!(f, "{} hour{}", hours, if *hours == 1 { "" } else { "s" })
            }
            TimeSinceLast::Days(days) => {
                write!(f, "{} day{}", days, if *days == 1 { "" } else { "s" })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerStats {
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Inclusive day count from first to last transaction date.
    pub days: i64,
    pub transaction_count: usize,
    pub posting_count: usize,
    pub unique_payees: usize,
    pub unique_accounts: usize,
    pub transactions_per_day: f64,
    pub postings_per_day: f64,
    pub since_last: TimeSinceLast,
}

fn matches_filters(account: &str, filters: &[String]) -> bool {
    filters.is_empty() || filters.iter().any(|f| account.contains(f.as_str()))
}

fn totals_over<'t, I>(transactions: I, filters: &[String]) -> Vec<AccountBalance>
where
    I: IntoIterator<Item = &'t Transaction>,
{
    let mut totals: IndexMap<String, Amount> = IndexMap::new();
    for transaction in transactions {
        for posting in &transaction.postings {
            // null amounts cannot survive finalization, but stay skippable
            let Some(amount) = posting.amount else { continue };
            if !matches_filters(&posting.account, filters) {
                continue;
            }
            let entry = totals
                .entry(posting.account.clone())
                .or_insert_with(Amount::zero);
            *entry = *entry + amount;
        }
    }

    let mut result: Vec<AccountBalance> = totals
        .into_iter()
        .map(|(name, balance)| AccountBalance { name, balance })
        .collect();
    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

/// Sum amounts per exact leaf account name, flat lexicographic order.
pub fn account_totals(transactions: &[Transaction], filters: &[String]) -> Vec<AccountBalance> {
    totals_over(transactions, filters)
}

/// Consolidate leaf balances for display: every colon-separated prefix of a
/// leaf accumulates the leaf's balance, accounts deeper than `max_depth`
/// fold into their ancestor at that depth, and the output is a pre-order
/// hierarchical walk (segment-wise comparison, parents first).
pub fn rollup(leaves: &[AccountBalance], options: &BalanceOptions) -> BalanceReport {
    let mut rolled: IndexMap<String, Amount> = IndexMap::new();
    for leaf in leaves {
        let segments: Vec<&str> = leaf.name.split(':').collect();
        let visible = match options.max_depth {
            Some(limit) => segments.len().min(limit),
            None => segments.len(),
        };
        for depth in 1..=visible {
            let entry = rolled
                .entry(segments[..depth].join(":"))
                .or_insert_with(Amount::zero);
            *entry = *entry + leaf.balance;
        }
    }

    let mut accounts: Vec<AccountBalance> = rolled
        .into_iter()
        .filter(|(_, balance)| options.include_empty || !balance.is_zero())
        .map(|(name, balance)| AccountBalance { name, balance })
        .collect();
    accounts.sort_by(|a, b| {
        let a_parts: Vec<&str> = a.name.split(':').collect();
        let b_parts: Vec<&str> = b.name.split(':').collect();
        a_parts.cmp(&b_parts)
    });

    let total = leaves
        .iter()
        .fold(Amount::zero(), |acc, leaf| acc + leaf.balance);

    BalanceReport { accounts, total }
}

/// The consolidated balance report over a whole journal.
pub fn balances(transactions: &[Transaction], options: &BalanceOptions) -> BalanceReport {
    rollup(&account_totals(transactions, &options.filters), options)
}

/// Partition transactions into calendar buckets, in chronological order of
/// each bucket's first transaction.
pub fn transactions_by_period(transactions: &[Transaction], period: Period) -> Vec<PeriodBucket<'_>> {
    let mut grouped: IndexMap<String, Vec<&Transaction>> = IndexMap::new();
    for transaction in transactions {
        grouped
            .entry(period.key_for(transaction.date))
            .or_default()
            .push(transaction);
    }

    let mut buckets: Vec<PeriodBucket<'_>> = grouped
        .into_iter()
        .map(|(key, mut group)| {
            group.sort_by(|a, b| a.date.cmp(&b.date));
            let start = group[0].date;
            let end = group[group.len() - 1].date;
            PeriodBucket {
                key,
                start,
                end,
                transactions: group,
            }
        })
        .collect();
    buckets.sort_by(|a, b| a.start.cmp(&b.start));
    buckets
}

/// Leaf balances computed independently within each calendar bucket.
pub fn balances_by_period(transactions: &[Transaction], period: Period) -> Vec<PeriodBalances> {
    transactions_by_period(transactions, period)
        .into_iter()
        .map(|bucket| PeriodBalances {
            balances: totals_over(bucket.transactions.iter().copied(), &[]),
            key: bucket.key,
            start: bucket.start,
            end: bucket.end,
        })
        .collect()
}

pub(crate) fn register_over<'t, I>(transactions: I, filters: &[String]) -> Vec<RegisterRow<'t>>
where
    I: IntoIterator<Item = &'t Transaction>,
{
    let mut rows = Vec::new();
    let mut running = Amount::zero();
    for transaction in transactions {
        for posting in &transaction.postings {
            let Some(amount) = posting.amount else { continue };
            if !matches_filters(&posting.account, filters) {
                continue;
            }
            running = running + amount;
            rows.push(RegisterRow {
                date: transaction.date,
                payee: &transaction.payee,
                account: &posting.account,
                amount,
                running,
            });
        }
    }
    rows
}

/// The chronological register: one row per matching posting with a running
/// total.
pub fn register<'t>(transactions: &'t [Transaction], filters: &[String]) -> Vec<RegisterRow<'t>> {
    register_over(transactions, filters)
}

fn time_since(last: NaiveDate, now: DateTime<Utc>) -> TimeSinceLast {
    let midnight = last.and_time(NaiveTime::MIN).and_utc();
    let seconds = now.signed_duration_since(midnight).num_seconds();
    if seconds <= 0 {
        return TimeSinceLast::Hours(0);
    }
    if seconds < 86_400 {
        // any leftover minute pushes to the next whole hour
        TimeSinceLast::Hours((seconds + 3_599) / 3_600)
    } else {
        TimeSinceLast::Days((seconds + 86_399) / 86_400)
    }
}

/// Summary statistics over the whole journal. `now` is injected so the
/// computation stays a pure function of its inputs; time since the last
/// post is measured from midnight UTC of the last transaction date.
pub fn stats(transactions: &[Transaction], now: DateTime<Utc>) -> Result<LedgerStats, LedgerError> {
    let first = transactions.first().ok_or(LedgerError::EmptyJournal)?.date;
    let last = transactions[transactions.len() - 1].date;
    let days = (last - first).num_days() + 1;
    let divisor = days.max(1) as f64;

    let mut payees: HashSet<&str> = HashSet::new();
    let mut account_names: HashSet<&str> = HashSet::new();
    let mut posting_count = 0usize;
    for transaction in transactions {
        payees.insert(&transaction.payee);
        for posting in &transaction.postings {
            account_names.insert(&posting.account);
            posting_count += 1;
        }
    }

    Ok(LedgerStats {
        first,
        last,
        days,
        transaction_count: transactions.len(),
        posting_count,
        unique_payees: payees.len(),
        unique_accounts: account_names.len(),
        transactions_per_day: transactions.len() as f64 / divisor,
        postings_per_day: posting_count as f64 / divisor,
        since_last: time_since(last, now),
    })
}

pub(crate) fn distinct_accounts(transactions: &[Transaction]) -> IndexSet<String> {
    let mut names: IndexSet<String> = IndexSet::new();
    for transaction in transactions {
        for posting in &transaction.postings {
            names.insert(posting.account.clone());
        }
    }
    names
}

/// Every distinct account name, flat lexicographic order.
pub fn accounts(transactions: &[Transaction]) -> Vec<String> {
    let mut names: Vec<String> = distinct_accounts(transactions).into_iter().collect();
    names.sort();
    names
}

/// Keep transactions dated within `start..=end`.
pub fn filter_by_date(
    transactions: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| t.date >= start && t.date <= end)
        .cloned()
        .collect()
}

/// Keep transactions whose payee contains `needle`, case-insensitive.
pub fn filter_by_payee(transactions: &[Transaction], needle: &str) -> Vec<Transaction> {
    let needle = needle.to_lowercase();
    transactions
        .iter()
        .filter(|t| t.payee.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Collapse the journal into a single `Opening Balances` transaction dated
/// at the last input transaction, carrying every non-zero account balance.
/// Useful for archiving old transactions. `None` when there is nothing to
/// carry.
pub fn equity(transactions: &[Transaction]) -> Option<Transaction> {
    let last = transactions.last()?;

    let mut balances: IndexMap<String, Amount> = IndexMap::new();
    for transaction in transactions {
        for posting in &transaction.postings {
            let Some(amount) = posting.amount else { continue };
            let entry = balances
                .entry(posting.account.clone())
                .or_insert_with(Amount::zero);
            *entry = *entry + amount;
        }
    }

    let mut carried: Vec<(String, Amount)> = balances
        .into_iter()
        .filter(|(_, balance)| !balance.is_zero())
        .collect();
    if carried.is_empty() {
        return None;
    }
    carried.sort_by(|a, b| a.0.cmp(&b.0));

    let mut snapshot = Transaction::new(last.date, "Opening Balances");
    for (account, balance) in carried {
        snapshot.postings.push(Posting {
            account,
            amount: Some(balance),
        });
    }
    Some(snapshot)
}

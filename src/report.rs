use crate::ledger::{
    register_over, rollup, transactions_by_period, BalanceOptions, BalanceReport, LedgerStats,
    Period, PeriodBalances, RegisterRow,
};
use crate::transaction::{Transaction, DATE_FORMAT};

/// Default report width, in characters.
pub const DEFAULT_COLUMNS: usize = 79;

/// Render a consolidated balance report: one `name … amount` line per
/// account, then a dashed rule and the right-aligned grand total.
pub fn render_balances(report: &BalanceReport, columns: usize) -> String {
    let mut out = String::new();
    for account in &report.accounts {
        let balance = account.balance.to_string();
        let padding = columns.saturating_sub(account.name.len() + balance.len());
        out.push_str(&account.name);
        out.push_str(&" ".repeat(padding));
        out.push_str(&balance);
        out.push('\n');
    }
    if !report.accounts.is_empty() {
        out.push_str(&"-".repeat(columns));
        out.push('\n');
        let total = report.total.to_string();
        out.push_str(&" ".repeat(columns.saturating_sub(total.len())));
        out.push_str(&total);
        out.push('\n');
    }
    out
}

/// Render per-period balance sections, each consolidated with the same
/// display options and introduced by a `start - end` banner.
pub fn render_balances_by_period(
    periods: &[PeriodBalances],
    options: &BalanceOptions,
    columns: usize,
) -> String {
    let mut out = String::new();
    for (index, period) in periods.iter().enumerate() {
        if index > 0 {
            out.push('\n');
            out.push_str(&"=".repeat(columns));
            out.push('\n');
        }
        out.push_str(&format!(
            "{} - {}\n",
            period.start.format(DATE_FORMAT),
            period.end.format(DATE_FORMAT)
        ));
        out.push_str(&"=".repeat(columns));
        out.push('\n');
        out.push_str(&render_balances(&rollup(&period.balances, options), columns));
    }
    out
}

/// Render register rows in fixed-width columns: date, payee, account,
/// posting amount, running total. Ten characters for the date and each
/// number; the remainder splits one-third payee, two-thirds account.
pub fn render_register(rows: &[RegisterRow<'_>], columns: usize) -> String {
    if rows.is_empty() {
        return "No transactions in the period.\n".to_string();
    }

    let remaining = columns.saturating_sub(34);
    let payee_width = remaining / 3;
    let account_width = remaining - payee_width;

    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "{:<10.10} {:<pw$.pw$} {:<aw$.aw$} {:>10.10} {:>10.10}\n",
            row.date.format(DATE_FORMAT).to_string(),
            row.payee,
            row.account,
            row.amount.to_string(),
            row.running.to_string(),
            pw = payee_width,
            aw = account_width,
        ));
    }
    out
}

/// Render one register section per calendar bucket; the running total
/// restarts with each bucket.
pub fn render_register_by_period(
    transactions: &[Transaction],
    period: Period,
    filters: &[String],
    columns: usize,
) -> String {
    let mut out = String::new();
    for (index, bucket) in transactions_by_period(transactions, period).iter().enumerate() {
        if index > 0 {
            out.push_str(&"=".repeat(columns));
            out.push('\n');
        }
        out.push_str(&format!(
            "{} - {}\n",
            bucket.start.format(DATE_FORMAT),
            bucket.end.format(DATE_FORMAT)
        ));
        out.push_str(&"=".repeat(columns));
        out.push('\n');
        out.push_str(&render_register(
            &register_over(bucket.transactions.iter().copied(), filters),
            columns,
        ));
    }
    out
}

/// Render the labeled summary block.
pub fn render_stats(stats: &LedgerStats) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Time period               : {} to {} ({} day{})\n",
        stats.first.format("%Y-%m-%d"),
        stats.last.format("%Y-%m-%d"),
        stats.days,
        if stats.days == 1 { "" } else { "s" }
    ));
    out.push_str(&format!("Unique payees             : {}\n", stats.unique_payees));
    out.push_str(&format!("Unique accounts           : {}\n", stats.unique_accounts));
    out.push_str(&format!(
        "Number of transactions    : {} ({:.1} per day)\n",
        stats.transaction_count, stats.transactions_per_day
    ));
    out.push_str(&format!(
        "Number of postings        : {} ({:.1} per day)\n",
        stats.posting_count, stats.postings_per_day
    ));
    out.push_str(&format!("Time since last post      : {}\n", stats.since_last));
    out
}

/// Render the account listing with rule lines and a trailing count.
pub fn render_accounts(accounts: &[String], columns: usize) -> String {
    let mut out = String::from("Accounts in ledger:\n");
    out.push_str(&"-".repeat(columns));
    out.push('\n');
    for name in accounts {
        out.push_str(name);
        out.push('\n');
    }
    out.push_str(&"-".repeat(columns));
    out.push('\n');
    out.push_str(&format!("Total: {} accounts\n", accounts.len()));
    out
}

/// Re-emit transactions as canonical journal text, keeping only those with
/// a posting matching any filter (all when the filter list is empty). One
/// blank line separates transactions.
pub fn render_transactions(transactions: &[Transaction], filters: &[String]) -> String {
    let mut out = String::new();
    for transaction in transactions {
        let included = filters.is_empty()
            || transaction
                .postings
                .iter()
                .any(|p| filters.iter().any(|f| p.account.contains(f.as_str())));
        if included {
            out.push_str(&transaction.to_string());
            out.push('\n');
        }
    }
    out
}

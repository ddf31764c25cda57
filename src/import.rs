use crate::amount::Amount;
use crate::classify::Classifier;
use crate::ledger::distinct_accounts;
use crate::transaction::{Posting, Transaction};
use crate::LedgerError;

use chrono::{NaiveDate, NaiveDateTime};

/// Options for a CSV import run.
#[derive(Clone, Debug)]
pub struct ImportOptions {
    /// Negate every parsed amount.
    pub negate: bool,
    /// Keep rows that match an existing transaction.
    pub allow_matching: bool,
    /// Scale factor applied to every parsed amount.
    pub scale: f64,
    /// Preferred date layout, tried before the fallback formats.
    pub date_format: String,
    pub delimiter: u8,
}

impl Default for ImportOptions {
    fn default() -> ImportOptions {
        ImportOptions {
            negate: false,
            allow_matching: false,
            scale: 1.0,
            date_format: "%m/%d/%Y".to_string(),
            delimiter: b',',
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Columns {
    date: Option<usize>,
    payee: Option<usize>,
    amount: Option<usize>,
    note: Option<usize>,
    uuid: Option<usize>,
    buyer: Option<usize>,
}

/// Convert bank-export CSV rows into balanced posting pairs against the
/// journal they will join.
///
/// Fatal errors: no account matches `account_hint`, or the CSV header lacks
/// a date/payee/amount column. Individual rows with unparsable dates or
/// amounts are skipped.
pub fn generate(
    transactions: &[Transaction],
    csv_text: &str,
    account_hint: &str,
    class_substring: &str,
    options: &ImportOptions,
) -> Result<Vec<Transaction>, LedgerError> {
    let destination = find_destination(transactions, account_hint)?;
    let classifier = Classifier::train(transactions, class_substring);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.trim().as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(LedgerError::MissingCsvColumns {
                missing: "date, payee, amount".to_string(),
            })
        }
    };
    let columns = detect_columns(&header)?;

    let mut generated = Vec::new();
    for record in records {
        let Ok(record) = record else {
            tracing::debug!("skipping unreadable csv record");
            continue;
        };

        let date_text = cell(&record, columns.date);
        let Some(date) = parse_row_date(date_text, &options.date_format) else {
            tracing::debug!(date = date_text, "skipping row with unparsable date");
            continue;
        };

        let payee = cell(&record, columns.payee).to_string();

        let Some(parsed) = parse_csv_amount(cell(&record, columns.amount)) else {
            tracing::debug!(%payee, "skipping row with unparsable amount");
            continue;
        };
        let mut value = parsed * options.scale;
        if options.negate {
            value = -value;
        }
        let amount = Amount::new(value);

        if !options.allow_matching && is_duplicate(transactions, date, &payee) {
            tracing::debug!(%payee, "skipping row matching an existing transaction");
            continue;
        }

        let class = classifier.classify(&payee);

        let mut entry = Transaction::new(date, &payee);
        if let Some(note) = non_empty(cell(&record, columns.note)) {
            entry.comments.push(format!(";{}", note));
        }
        if let Some(uuid) = non_empty(cell(&record, columns.uuid)) {
            entry.comments.push(format!("; UUID: {}", uuid));
        }
        if let Some(buyer) = non_empty(cell(&record, columns.buyer)) {
            entry.comments.push(format!("; Buyer: {}", buyer));
        }
        entry.postings.push(Posting {
            account: destination.clone(),
            amount: Some(amount),
        });
        entry.postings.push(Posting {
            account: class,
            amount: Some(-amount),
        });
        generated.push(entry);
    }

    Ok(generated)
}

/// [`generate`], rendered to journal text ready to append: one block per
/// transaction, blank-line separated.
pub fn import_csv(
    transactions: &[Transaction],
    csv_text: &str,
    account_hint: &str,
    class_substring: &str,
    options: &ImportOptions,
) -> Result<String, LedgerError> {
    let generated = generate(transactions, csv_text, account_hint, class_substring, options)?;
    let mut output = String::new();
    for transaction in &generated {
        output.push_str(&transaction.to_string());
        output.push('\n');
    }
    Ok(output)
}

/// Resolve the destination account: of all known account names containing
/// `hint` (case-insensitive), the last one in discovery order wins.
fn find_destination(transactions: &[Transaction], hint: &str) -> Result<String, LedgerError> {
    let needle = hint.to_lowercase();
    let mut matched: Option<String> = None;
    for name in distinct_accounts(transactions) {
        if name.to_lowercase().contains(&needle) {
            matched = Some(name);
        }
    }
    matched.ok_or_else(|| LedgerError::NoMatchingAccount {
        hint: hint.to_string(),
    })
}

fn detect_columns(header: &csv::StringRecord) -> Result<Columns, LedgerError> {
    let mut columns = Columns::default();
    for (index, field) in header.iter().enumerate() {
        let name = field.trim().to_lowercase();
        if name.contains("date") {
            columns.date = Some(index);
        } else if name.contains("description") || name.contains("payee") {
            columns.payee = Some(index);
        } else if name.contains("amount") || name.contains("expense") {
            columns.amount = Some(index);
        } else if name.contains("note") {
            columns.note = Some(index);
        } else if name.contains("uuid") {
            columns.uuid = Some(index);
        } else if name.contains("buyer") {
            columns.buyer = Some(index);
        }
    }

    let mut missing = Vec::new();
    if columns.date.is_none() {
        missing.push("date");
    }
    if columns.payee.is_none() {
        missing.push("payee");
    }
    if columns.amount.is_none() {
        missing.push("amount");
    }
    if !missing.is_empty() {
        return Err(LedgerError::MissingCsvColumns {
            missing: missing.join(", "),
        });
    }
    Ok(columns)
}

fn cell<'r>(record: &'r csv::StringRecord, index: Option<usize>) -> &'r str {
    index
        .and_then(|i| record.get(i))
        .unwrap_or("")
        .trim()
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%Y%m%d",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Try the configured format, then its separator variants, then the broad
/// fallback list (day-first, ISO, month-first, compact, with-time).
fn parse_row_date(text: &str, configured: &str) -> Option<NaiveDate> {
    let text = text.trim();

    if !configured.is_empty() {
        if let Ok(date) = NaiveDate::parse_from_str(text, configured) {
            return Some(date);
        }
        for variant in separator_variants(configured) {
            if variant != configured {
                if let Ok(date) = NaiveDate::parse_from_str(text, &variant) {
                    return Some(date);
                }
            }
        }
    }

    for format in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(text, format) {
            return Some(stamp.date());
        }
    }
    None
}

fn separator_variants(format: &str) -> [String; 4] {
    [
        format.replace('/', "-"),
        format.replace('-', "/"),
        format.replace('/', "."),
        format.replace('.', "/"),
    ]
}

/// CSV amount rule: parenthesized values gain a leading minus, everything
/// but digits, `.`, `,`, `-` is stripped, an odd count of minus signs makes
/// the value negative (so `--5` is positive five), then commas become
/// decimal points. An empty cell is zero; a non-numeric remainder is
/// `None` and skips the row.
fn parse_csv_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let unwrapped = if trimmed.len() >= 3 && trimmed.starts_with('(') && trimmed.ends_with(')') {
        format!("-{}", &trimmed[1..trimmed.len() - 1])
    } else {
        trimmed.to_string()
    };

    let kept: String = unwrapped
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if kept.is_empty() {
        return Some(0.0);
    }

    let negative = kept.matches('-').count() % 2 == 1;
    let digits = kept.replace('-', "").replace(',', ".");
    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(if negative { -value } else { value })
}

fn is_duplicate(transactions: &[Transaction], date: NaiveDate, payee: &str) -> bool {
    let first_word = payee.split_whitespace().next().unwrap_or("");
    transactions
        .iter()
        .any(|t| t.date == date && t.payee.starts_with(first_word))
}

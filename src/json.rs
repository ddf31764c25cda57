use crate::transaction::Transaction;
use crate::LedgerError;

use serde::{Deserialize, Serialize};

/// A single transfer described as JSON, the interchange shape used by
/// automation around the journal. `id` is an opaque passthrough; this crate
/// never generates identifiers.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub date: String,
    pub payee: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(rename = "sourceaccount")]
    pub source_account: String,
    #[serde(rename = "targetaccount")]
    pub target_account: String,
    pub amount: f64,
}

impl TransactionRecord {
    /// Render the record as a journal transaction: the amount goes to the
    /// source account, its negation to the target, the note becomes a
    /// leading comment.
    pub fn to_transaction_text(&self) -> String {
        let mut out = String::new();
        if let Some(note) = self.note.as_deref().filter(|n| !n.is_empty()) {
            out.push_str(&format!("; {}\n", note));
        }
        out.push_str(&format!("{} {}\n", self.date, self.payee));
        if !self.source_account.is_empty() {
            out.push_str(&account_line(&self.source_account, self.amount));
        }
        if !self.target_account.is_empty() {
            out.push_str(&account_line(&self.target_account, -self.amount));
        }
        out
    }
}

fn account_line(account: &str, amount: f64) -> String {
    let padding = 65usize.saturating_sub(account.len());
    format!("    {}{}{:>10.2}\n", account, " ".repeat(padding), amount)
}

/// Serialize parsed transactions as pretty JSON.
pub fn to_json(transactions: &[Transaction]) -> Result<String, LedgerError> {
    Ok(serde_json::to_string_pretty(transactions)?)
}

/// Deserialize one [`TransactionRecord`] from JSON.
pub fn record_from_json(input: &str) -> Result<TransactionRecord, LedgerError> {
    Ok(serde_json::from_str(input)?)
}

#[cfg(test)]
mod tests {
    use crate::json::{record_from_json, to_json, TransactionRecord};
    use crate::parser::parse;

    use anyhow::Result;

    #[test]
    fn record_renders_a_posting_pair() {
        let record = TransactionRecord {
            id: None,
            date: "2024/01/15".to_string(),
            payee: "Transfer".to_string(),
            note: Some("monthly savings".to_string()),
            source_account: "Assets:Savings".to_string(),
            target_account: "Assets:Checking".to_string(),
            amount: 250.0,
        };
        let text = record.to_transaction_text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "; monthly savings");
        assert_eq!(lines[1], "2024/01/15 Transfer");
        assert!(lines[2].starts_with("    Assets:Savings"));
        assert!(lines[2].ends_with("250.00"));
        assert!(lines[3].starts_with("    Assets:Checking"));
        assert!(lines[3].ends_with("-250.00"));
    }

    #[test]
    fn rendered_record_parses_back_balanced() -> Result<()> {
        let record = TransactionRecord {
            id: Some("abc-123".to_string()),
            date: "2024/01/15".to_string(),
            payee: "Transfer".to_string(),
            note: None,
            source_account: "Assets:Savings".to_string(),
            target_account: "Assets:Checking".to_string(),
            amount: 250.0,
        };
        let mut text = record.to_transaction_text();
        text.push('\n');

        let transactions = parse(&text)?;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].postings.len(), 2);
        Ok(())
    }

    #[test]
    fn record_round_trips_through_json() -> Result<()> {
        let input = r#"{
            "id": "abc-123",
            "date": "2024/01/15",
            "payee": "Transfer",
            "note": "monthly savings",
            "sourceaccount": "Assets:Savings",
            "targetaccount": "Assets:Checking",
            "amount": 250.0
        }"#;
        let record = record_from_json(input)?;
        assert_eq!(record.payee, "Transfer");
        assert_eq!(record.source_account, "Assets:Savings");

        let json = serde_json::to_string(&record)?;
        assert!(json.contains("\"sourceaccount\":\"Assets:Savings\""));
        Ok(())
    }

    #[test]
    fn journal_exports_as_json() -> Result<()> {
        let txns = parse("2024/01/01 Coffee\n    Expenses:Food    5.00\n    Assets:Cash\n\n")?;
        let json = to_json(&txns)?;
        assert!(json.contains("\"payee\": \"Coffee\""));
        assert!(json.contains("\"Expenses:Food\""));
        assert!(json.contains("\"date\": \"2024-01-01\""));
        Ok(())
    }
}

use crate::amount::Amount;
use crate::transaction::{Posting, Transaction};
use crate::LedgerError;

use chrono::NaiveDate;
use pest::Parser;

#[derive(Parser)]
#[grammar = "journal.pest"]
pub struct JournalParser;

/// Parses journal input as a string slice; reading from files is left to
/// the client code.
///
/// The parser is a single-pass, line-oriented state machine. Garbage lines
/// and headers with malformed dates are tolerated (the affected transaction
/// is dropped), but a transaction that breaks the double-entry invariants
/// aborts the whole parse.
pub fn parse(input: &str) -> Result<Vec<Transaction>, LedgerError> {
    let mut transactions: Vec<Transaction> = Vec::new();
    let mut current: Option<Transaction> = None;
    let mut comments: Vec<String> = Vec::new();

    for raw in input.lines() {
        let line = raw.trim_end();
        match classify(line) {
            Line::Blank => {
                if let Some(transaction) = current.take() {
                    finish(transaction, &mut comments, &mut transactions)?;
                }
            }
            Line::Comment => comments.push(line.to_string()),
            Line::Header { date, payee } => {
                if let Some(transaction) = current.take() {
                    finish(transaction, &mut comments, &mut transactions)?;
                }
                match parse_header_date(date) {
                    Some(date) => current = Some(Transaction::new(date, payee)),
                    None => tracing::warn!(line, "skipping transaction with malformed date"),
                }
            }
            Line::Posting { body } => {
                if let Some(transaction) = current.as_mut() {
                    transaction.postings.push(split_posting(body));
                }
            }
            Line::Other => {}
        }
    }

    if let Some(transaction) = current.take() {
        finish(transaction, &mut comments, &mut transactions)?;
    }

    // stable sort: same-date transactions keep their file order
    transactions.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(transactions)
}

fn finish(
    mut transaction: Transaction,
    comments: &mut Vec<String>,
    out: &mut Vec<Transaction>,
) -> Result<(), LedgerError> {
    transaction.finalize()?;
    transaction.comments = std::mem::take(comments);
    out.push(transaction);
    Ok(())
}

enum Line<'l> {
    Blank,
    Comment,
    Header { date: &'l str, payee: &'l str },
    Posting { body: &'l str },
    Other,
}

fn classify(line: &str) -> Line<'_> {
    let Ok(mut pairs) = JournalParser::parse(Rule::line, line) else {
        return Line::Other;
    };
    let Some(inner) = pairs.next().and_then(|top| top.into_inner().next()) else {
        return Line::Other;
    };

    match inner.as_rule() {
        Rule::comment_line => Line::Comment,
        Rule::header_line => {
            let mut parts = inner.into_inner();
            match (parts.next(), parts.next()) {
                (Some(date), Some(payee)) => Line::Header {
                    date: date.as_str(),
                    payee: payee.as_str(),
                },
                _ => Line::Other,
            }
        }
        Rule::posting_line => {
            let body = inner.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Line::Posting { body }
        }
        Rule::blank_line => Line::Blank,
        _ => Line::Other,
    }
}

fn parse_header_date(token: &str) -> Option<NaiveDate> {
    let normalized = token.replace(['.', '-'], "/");
    NaiveDate::parse_from_str(&normalized, "%Y/%m/%d").ok()
}

/// Split a posting body into account name and optional amount.
///
/// The account is separated from the value by a run of two or more spaces.
/// Without such a run, the last whitespace-delimited token is tried as the
/// value. If neither yields a numeric amount, the whole line is the account
/// name and the posting is elided.
fn split_posting(body: &str) -> Posting {
    let line = body.trim();

    if let Some((name, value)) = split_on_gap(line) {
        if let Ok(amount) = Amount::parse(value) {
            return Posting {
                account: name.to_string(),
                amount: Some(amount),
            };
        }
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() >= 2 {
        if let Ok(amount) = Amount::parse(tokens[tokens.len() - 1]) {
            return Posting {
                account: tokens[..tokens.len() - 1].join(" "),
                amount: Some(amount),
            };
        }
    }

    Posting {
        account: line.to_string(),
        amount: None,
    }
}

fn split_on_gap(line: &str) -> Option<(&str, &str)> {
    let mut gap_start: Option<usize> = None;
    let mut run = 0usize;

    for (index, ch) in line.char_indices() {
        if ch == ' ' || ch == '\t' {
            if run == 0 {
                gap_start = Some(index);
            }
            run += 1;
        } else {
            if run >= 2 {
                let start = gap_start?;
                return Some((line[..start].trim(), line[index..].trim()));
            }
            run = 0;
            gap_start = None;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use crate::amount::Amount;
    use crate::parser::parse;
    use crate::LedgerError;

    use anyhow::Result;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_a_single_transaction_with_elision() -> Result<()> {
        let journal = "2024/01/01 Coffee\n    Expenses:Food    5.00\n    Assets:Cash\n\n";
        let transactions = parse(journal)?;

        assert_eq!(transactions.len(), 1);
        let txn = &transactions[0];
        assert_eq!(txn.date, date(2024, 1, 1));
        assert_eq!(txn.payee, "Coffee");
        assert_eq!(txn.postings[0].account, "Expenses:Food");
        assert_eq!(txn.postings[0].amount, Some(Amount::new(5.0)));
        assert_eq!(txn.postings[1].account, "Assets:Cash");
        assert_eq!(txn.postings[1].amount, Some(Amount::new(-5.0)));
        Ok(())
    }

    #[test]
    fn accepts_dash_and_dot_date_separators() -> Result<()> {
        let journal = "2024-01-02 Dashes\n    A    1.00\n    B\n\n\
                       2024.01.03 Dots\n    A    1.00\n    B\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].date, date(2024, 1, 2));
        assert_eq!(transactions[1].date, date(2024, 1, 3));
        Ok(())
    }

    #[test]
    fn header_without_blank_line_closes_previous_transaction() -> Result<()> {
        let journal = "2024/01/01 First\n    A    1.00\n    B\n2024/01/02 Second\n    A    2.00\n    B\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].payee, "First");
        assert_eq!(transactions[1].payee, "Second");
        Ok(())
    }

    #[test]
    fn malformed_date_skips_only_that_transaction() -> Result<()> {
        let journal = "2024/01/01 Good\n    A    1.00\n    B\n\n\
                       2024/13/45 Bad\n    A    99.00\n    B\n\n\
                       2024/02/01 Also Good\n    A    2.00\n    B\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].payee, "Good");
        assert_eq!(transactions[1].payee, "Also Good");
        Ok(())
    }

    #[test]
    fn unbalanced_transaction_aborts_the_parse() {
        let journal = "2024/01/01 Lopsided\n    A    5.00\n    B    1.00\n\n";
        match parse(journal) {
            Err(LedgerError::Unbalanced { payee, .. }) => assert_eq!(payee, "Lopsided"),
            other => panic!("expected Unbalanced, got {:?}", other),
        }
    }

    #[test]
    fn doubly_elided_transaction_aborts_the_parse() {
        let journal = "2024/01/01 Empty\n    A\n    B\n\n";
        assert!(matches!(
            parse(journal),
            Err(LedgerError::MultipleElided { .. })
        ));
    }

    #[test]
    fn comments_attach_to_the_following_transaction() -> Result<()> {
        let journal = "; opening note\n2024/01/01 First\n    A    1.00\n    B\n\n\
                       ; second note\n2024/01/02 Second\n    A    2.00\n    B\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].comments, vec!["; opening note"]);
        assert_eq!(transactions[1].comments, vec!["; second note"]);
        Ok(())
    }

    #[test]
    fn indented_comment_inside_a_transaction_is_not_a_posting() -> Result<()> {
        let journal = "2024/01/01 Noted\n    A    1.00\n    ; in-body remark\n    B\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].postings.len(), 2);
        assert_eq!(transactions[0].comments, vec!["    ; in-body remark"]);
        Ok(())
    }

    #[test]
    fn posting_split_falls_back_to_last_token() -> Result<()> {
        let journal = "2024/01/01 Single Spaces\n    Assets:Cash 5.00\n    Expenses:Food\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].postings[0].account, "Assets:Cash");
        assert_eq!(transactions[0].postings[0].amount, Some(Amount::new(5.0)));
        Ok(())
    }

    #[test]
    fn account_names_may_contain_single_spaces() -> Result<()> {
        let journal = "2024/01/01 Mixed\n    Assets:Petty Cash  7.00\n    Equity:Opening Balances\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].postings[0].account, "Assets:Petty Cash");
        assert_eq!(transactions[0].postings[0].amount, Some(Amount::new(7.0)));
        assert_eq!(
            transactions[0].postings[1].account,
            "Equity:Opening Balances"
        );
        assert_eq!(transactions[0].postings[1].amount, Some(Amount::new(-7.0)));
        Ok(())
    }

    #[test]
    fn tab_indented_postings_are_recognized() -> Result<()> {
        let journal = "2024/01/01 Tabs\n\tExpenses:Food\t\t3.25\n\tAssets:Cash\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].postings[0].account, "Expenses:Food");
        assert_eq!(transactions[0].postings[0].amount, Some(Amount::new(3.25)));
        Ok(())
    }

    #[test]
    fn currency_glyphs_and_parentheses_in_posting_values() -> Result<()> {
        let journal =
            "2024/01/01 Glyphs\n    Expenses:Food    $45.00\n    Assets:Bank    (45.00)\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].postings[0].amount, Some(Amount::new(45.0)));
        assert_eq!(transactions[0].postings[1].amount, Some(Amount::new(-45.0)));
        Ok(())
    }

    #[test]
    fn garbage_lines_are_ignored() -> Result<()> {
        let journal = "random noise\n2024/01/01 Real\n    A    1.00\n    B\nnot a posting\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].postings.len(), 2);
        Ok(())
    }

    #[test]
    fn transactions_are_stably_sorted_by_date() -> Result<()> {
        let journal = "2024/02/01 Later\n    A    1.00\n    B\n\n\
                       2024/01/01 Tie One\n    A    1.00\n    B\n\n\
                       2024/01/01 Tie Two\n    A    2.00\n    B\n\n";
        let transactions = parse(journal)?;
        assert_eq!(transactions[0].payee, "Tie One");
        assert_eq!(transactions[1].payee, "Tie Two");
        assert_eq!(transactions[2].payee, "Later");
        Ok(())
    }

    #[test]
    fn end_of_input_finalizes_an_open_transaction() -> Result<()> {
        let journal = "2024/01/01 NoTrailingBlank\n    A    1.00\n    B";
        let transactions = parse(journal)?;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].postings[1].amount, Some(Amount::new(-1.0)));
        Ok(())
    }

    #[test]
    fn empty_input_yields_no_transactions() -> Result<()> {
        assert!(parse("")?.is_empty());
        assert!(parse("\n\n\n")?.is_empty());
        Ok(())
    }
}

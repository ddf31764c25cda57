use crate::amount::Amount;
use crate::LedgerError;

use chrono::NaiveDate;
use serde::Serialize;

use std::fmt;

/// Canonical date layout for rendered journal text. Input accepts `-` and
/// `.` separators as well; output always uses `/`.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Acceptance band for the zero-sum check at finalization. One display
/// precision unit, deliberately looser than [`crate::amount::COMPARISON_EPSILON`],
/// to absorb real-world rounding in imported data.
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// One account/amount line within a transaction. A posting with no amount
/// is elided; its value is inferred when the transaction is finalized.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Posting {
    pub account: String,
    pub amount: Option<Amount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub payee: String,
    pub postings: Vec<Posting>,
    pub comments: Vec<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, payee: &str) -> Transaction {
        Transaction {
            date,
            payee: payee.to_string(),
            postings: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Enforce the double-entry invariants, once, at the end of parsing.
    ///
    /// At most one posting may be elided; it is filled with the negated sum
    /// of the others. Afterwards the postings must sum to zero within
    /// [`BALANCE_TOLERANCE`].
    pub(crate) fn finalize(&mut self) -> Result<(), LedgerError> {
        let mut total = Amount::zero();
        let mut elided: Option<usize> = None;

        for (index, posting) in self.postings.iter().enumerate() {
            match posting.amount {
                Some(amount) => total = total + amount,
                None => {
                    if elided.is_some() {
                        return Err(LedgerError::MultipleElided {
                            payee: self.payee.clone(),
                        });
                    }
                    elided = Some(index);
                }
            }
        }

        if let Some(index) = elided {
            self.postings[index].amount = Some(-total);
        }

        let check = self
            .postings
            .iter()
            .filter_map(|posting| posting.amount)
            .fold(Amount::zero(), |acc, amount| acc + amount);
        if !check.is_zero() && check.value().abs() > BALANCE_TOLERANCE {
            return Err(LedgerError::Unbalanced {
                payee: self.payee.clone(),
                difference: check,
            });
        }

        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.comments {
            writeln!(f, "{}", comment)?;
        }
        writeln!(f, "{} {}", self.date.format(DATE_FORMAT), self.payee)?;
        for posting in &self.postings {
            match posting.amount {
                Some(amount) => writeln!(f, "    {}    {}", posting.account, amount)?,
                None => writeln!(f, "    {}", posting.account)?,
            }
        }
        Ok(())
    }
}

use crate::transaction::Transaction;

use indexmap::{IndexMap, IndexSet};

/// Sentinel returned when there is nothing to classify against, or the
/// input tokenizes to nothing.
pub const UNKNOWN_ACCOUNT: &str = "unknown:unknown";

/// Likelihood floor for classes with no trained words, keeping log-scores
/// finite.
const FLOOR_PROBABILITY: f64 = 1e-11;

#[derive(Clone, Debug, Default)]
struct ClassData {
    freqs: IndexMap<String, u64>,
    total: u64,
}

/// A Naive-Bayes model over payee text, with destination accounts as
/// classes.
///
/// Word likelihoods use add-one smoothing over the class's own vocabulary;
/// class priors are smoothed by the class count. The model is an immutable
/// value: train once per run, classify, discard.
#[derive(Clone, Debug)]
pub struct Classifier {
    classes: Vec<String>,
    data: Vec<ClassData>,
}

impl Classifier {
    /// Discover classes and train from an existing journal.
    ///
    /// Every distinct account name containing `class_substring`
    /// (case-insensitive) becomes a class, in first-seen order. Each
    /// transaction's payee tokens are counted toward every class its
    /// postings touch.
    pub fn train(transactions: &[Transaction], class_substring: &str) -> Classifier {
        let needle = class_substring.to_lowercase();

        let mut classes: IndexSet<String> = IndexSet::new();
        for transaction in transactions {
            for posting in &transaction.postings {
                if posting.account.to_lowercase().contains(&needle) {
                    classes.insert(posting.account.clone());
                }
            }
        }

        let mut data = vec![ClassData::default(); classes.len()];
        for transaction in transactions {
            let words = tokenize(&transaction.payee);
            for posting in &transaction.postings {
                let Some(index) = classes.get_index_of(posting.account.as_str()) else {
                    continue;
                };
                let class = &mut data[index];
                for word in &words {
                    *class.freqs.entry(word.clone()).or_insert(0) += 1;
                    class.total += 1;
                }
            }
        }

        Classifier {
            classes: classes.into_iter().collect(),
            data,
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Predict a destination account for payee text.
    pub fn classify(&self, payee: &str) -> String {
        let words = tokenize(payee);
        if words.is_empty() || self.classes.is_empty() {
            return UNKNOWN_ACCOUNT.to_string();
        }
        let scores = self.log_scores(&words);
        self.classes[find_max(&scores)].clone()
    }

    /// P(class), Laplace-smoothed by the number of classes, not documents.
    fn priors(&self) -> Vec<f64> {
        let class_count = self.classes.len() as f64;
        let total_words: u64 = self.data.iter().map(|class| class.total).sum();
        self.data
            .iter()
            .map(|class| (class.total as f64 + 1.0) / (total_words as f64 + class_count))
            .collect()
    }

    fn log_scores(&self, words: &[String]) -> Vec<f64> {
        let priors = self.priors();
        self.data
            .iter()
            .enumerate()
            .map(|(index, class)| {
                let mut score = priors[index].ln();
                for word in words {
                    score += word_probability(class, word).ln();
                }
                score
            })
            .collect()
    }
}

/// P(word|class) with add-one smoothing over this class's vocabulary.
fn word_probability(class: &ClassData, word: &str) -> f64 {
    let vocabulary = class.freqs.len();
    if class.total == 0 || vocabulary == 0 {
        return FLOOR_PROBABILITY;
    }
    let count = class.freqs.get(word).copied().unwrap_or(0);
    (count as f64 + 1.0) / (class.total as f64 + vocabulary as f64)
}

/// Index of the highest score; ties keep the earliest class.
fn find_max(scores: &[f64]) -> usize {
    let mut best = 0;
    for index in 1..scores.len() {
        if scores[best] < scores[index] {
            best = index;
        }
    }
    best
}

/// Lowercase and split on whitespace; identical for training and
/// classification input.
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.trim().to_lowercase();
    lowered.split_whitespace().map(str::to_string).collect()
}

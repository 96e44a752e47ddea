//! Token Budgeter — estimates the model-token cost of a text and shrinks it to fit.
//!
//! The estimator only needs to be deterministic and monotonic; it bounds request
//! size, it does not have to agree with the remote service's billing.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use crate::extraction::errors::BudgetError;

/// Each truncation round keeps this fraction of the current character length.
const SHRINK_NUMERATOR: usize = 9;
const SHRINK_DENOMINATOR: usize = 10;

/// Hard stop for the shrink loop. 0.9^512 takes any realistic upload to zero
/// characters long before this is reached.
pub const MAX_TRUNCATION_ROUNDS: usize = 512;

/// Approximate characters per token for the heuristic estimator.
const CHARS_PER_TOKEN: usize = 4;

/// Counts how many model tokens a text is expected to cost.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// `cl100k_base` byte-pair encoding.
pub struct Cl100kEstimator {
    bpe: CoreBPE,
}

impl Cl100kEstimator {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }
}

impl TokenEstimator for Cl100kEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &'static str {
        "cl100k"
    }
}

/// ~4 characters per token, rounded up.
pub struct CharHeuristicEstimator;

impl TokenEstimator for CharHeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(CHARS_PER_TOKEN)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Which estimator the budgeter counts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EstimatorKind {
    #[default]
    Cl100k,
    Heuristic,
}

impl std::str::FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cl100k" | "cl100k_base" => Ok(EstimatorKind::Cl100k),
            "heuristic" | "chars" => Ok(EstimatorKind::Heuristic),
            other => Err(format!("unknown token estimator '{other}' (expected cl100k|heuristic)")),
        }
    }
}

/// Builds the configured estimator, falling back to the heuristic if the BPE
/// tables cannot be loaded.
pub fn build_estimator(kind: EstimatorKind) -> Arc<dyn TokenEstimator> {
    match kind {
        EstimatorKind::Heuristic => Arc::new(CharHeuristicEstimator),
        EstimatorKind::Cl100k => match Cl100kEstimator::new() {
            Ok(estimator) => Arc::new(estimator),
            Err(e) => {
                warn!("Failed to load cl100k_base tables, using character heuristic: {e}");
                Arc::new(CharHeuristicEstimator)
            }
        },
    }
}

/// Upper bound on tokens submitted to the completion service. Always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget(NonZeroUsize);

impl TokenBudget {
    pub fn new(tokens: usize) -> Option<Self> {
        NonZeroUsize::new(tokens).map(Self)
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

#[derive(Clone)]
pub struct TokenBudgeter {
    estimator: Arc<dyn TokenEstimator>,
    budget: TokenBudget,
}

impl TokenBudgeter {
    pub fn new(estimator: Arc<dyn TokenEstimator>, budget: TokenBudget) -> Self {
        Self { estimator, budget }
    }

    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    pub fn estimate(&self, text: &str) -> usize {
        self.estimator.estimate(text)
    }

    /// Truncates `text` against the configured budget.
    pub fn fit(&self, text: &str) -> Result<String, BudgetError> {
        truncate(self.estimator.as_ref(), text, self.budget.get())
    }
}

/// Shrinks `text` from the end until `estimator` puts it at or under `budget`.
///
/// Each round cuts the string to 90% of its current character count. The loop
/// is capped at [`MAX_TRUNCATION_ROUNDS`] and fails closed if the estimator
/// never reports a fit (including when even the empty string is over budget).
pub fn truncate(
    estimator: &dyn TokenEstimator,
    text: &str,
    budget: usize,
) -> Result<String, BudgetError> {
    let mut current = text;
    let mut estimate = estimator.estimate(current);
    let mut rounds = 0;

    while estimate > budget {
        if rounds == MAX_TRUNCATION_ROUNDS || current.is_empty() {
            warn!(
                "Truncation did not converge: {} tokens left after {} rounds (budget {})",
                estimate, rounds, budget
            );
            return Err(BudgetError {
                budget,
                estimate,
                rounds,
            });
        }

        let char_count = current.chars().count();
        let keep = char_count * SHRINK_NUMERATOR / SHRINK_DENOMINATOR;
        current = prefix_chars(current, keep);
        estimate = estimator.estimate(current);
        rounds += 1;
    }

    if rounds > 0 {
        debug!(
            "Truncated {} -> {} chars in {} rounds ({} tokens, budget {})",
            text.len(),
            current.len(),
            rounds,
            estimate,
            budget
        );
    }

    Ok(current.to_string())
}

/// The first `n` characters of `s`, cut on a char boundary.
fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

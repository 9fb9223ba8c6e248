//! Score Aggregation
//!
//! Reduces normalized audit results to category scores and one overall
//! score. Pure functions, no I/O.
//!
//! # Scoring Formula
//!
//! ```text
//! Category = Σ(score_i × weight_i) / Σ(weight_i)      over audits with a score
//! Overall  = (Π score_c ^ weight_c) ^ (1 / Σ weight_c)  over categories
//! ```
//!
//! # Degenerate Input
//!
//! - Audits with a null score (informative, manual, notApplicable, error)
//!   are left out of the category mean entirely
//! - A category whose remaining weight sum is 0 scores null
//! - A null category counts as 0 in the overall product, weight included
//! - An overall weight sum of 0 scores null
//! - No categories at all is an error: there is nothing to report
//!
//! # Example
//!
//! Three audits weighted `[1, 1, 1]` scoring `[1, 0.5, null]`:
//!
//! Category = (1×1 + 0.5×1) / (1 + 1) = 0.75

mod category;
mod overall;

pub use category::{score_category, weighted_arithmetic_mean, WeightedScore};
pub use overall::weighted_geometric_mean;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::ReportConfig;
use crate::error::ScoringError;
use crate::models::{AuditResult, CategoryResult};

/// Category and overall scores of one run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportScores {
    pub score: Option<f64>,
    pub categories: IndexMap<String, CategoryResult>,
}

/// Score every configured category, then the overall score.
///
/// Categories keep configuration order.
pub fn compute_report_result(
    audits: &IndexMap<String, AuditResult>,
    config: &ReportConfig,
) -> Result<ReportScores, ScoringError> {
    if config.categories.is_empty() {
        return Err(ScoringError::NoCategories);
    }

    let mut categories = IndexMap::with_capacity(config.categories.len());
    for (id, category) in &config.categories {
        categories.insert(id.clone(), score_category(id, category, audits)?);
    }

    let weights = config.overall_weights();
    let items: Vec<WeightedScore<'_>> = weights
        .iter()
        .map(|(id, weight)| {
            let score = categories.get(id).and_then(|c: &CategoryResult| c.score);
            WeightedScore::new(id, score, *weight)
        })
        .collect();
    let score = weighted_geometric_mean(&items)?;

    for (id, category) in &categories {
        debug!("  {}: {:?}", id, category.score);
    }
    info!(
        "Scored {} categories, overall {}",
        categories.len(),
        score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "n/a".to_string())
    );

    Ok(ReportScores { score, categories })
}

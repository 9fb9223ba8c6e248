//! Overall score: weighted geometric mean over category scores

use super::category::WeightedScore;
use crate::error::ScoringError;

/// `(Π score^weight)^(1/Σweight)` in input order.
///
/// - a `None` score counts as base 0 and its weight still counts
/// - zero-weight entries are skipped entirely
/// - any zero base with positive weight makes the result exactly 0
/// - `Σweight = 0` gives `None`
pub fn weighted_geometric_mean(items: &[WeightedScore<'_>]) -> Result<Option<f64>, ScoringError> {
    let mut weight_sum = 0.0;
    let mut log_sum = 0.0;
    let mut has_zero = false;

    for item in items {
        item.validate()?;
        if item.weight == 0.0 {
            continue;
        }
        weight_sum += item.weight;

        let base = item.score.unwrap_or(0.0);
        if base == 0.0 {
            has_zero = true;
        } else {
            log_sum += item.weight * base.ln();
        }
    }

    if weight_sum == 0.0 {
        return Ok(None);
    }
    if has_zero {
        return Ok(Some(0.0));
    }
    Ok(Some((log_sum / weight_sum).exp()))
}

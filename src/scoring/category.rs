//! Category scores: weighted arithmetic mean over scored audits

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::CategoryConfig;
use crate::error::ScoringError;
use crate::models::{AuditRefResult, AuditResult, CategoryResult};

/// One `(score, weight)` pair, labelled for error reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore<'a> {
    pub id: &'a str,
    pub score: Option<f64>,
    pub weight: f64,
}

impl<'a> WeightedScore<'a> {
    pub fn new(id: &'a str, score: Option<f64>, weight: f64) -> Self {
        Self { id, score, weight }
    }

    pub(crate) fn validate(&self) -> Result<(), ScoringError> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(ScoringError::InvalidWeight {
                id: self.id.to_string(),
                weight: self.weight,
            });
        }
        if let Some(score) = self.score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ScoringError::ScoreOutOfRange {
                    id: self.id.to_string(),
                    score,
                });
            }
        }
        Ok(())
    }
}

/// `Σ(score·weight) / Σweight` over entries with a score.
///
/// Entries with a `None` score are left out of both sums. Returns `None`
/// when the remaining weight sum is zero.
pub fn weighted_arithmetic_mean(items: &[WeightedScore<'_>]) -> Result<Option<f64>, ScoringError> {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;

    for item in items {
        item.validate()?;
        if let Some(score) = item.score {
            weighted_sum += score * item.weight;
            weight_sum += item.weight;
        }
    }

    if weight_sum == 0.0 {
        return Ok(None);
    }
    Ok(Some(weighted_sum / weight_sum))
}

/// Score one configured category against the audit results.
///
/// Audit refs keep configured order. A ref whose audit produced no result,
/// or a result in an unscored display mode, stays in the output for display
/// and is excluded from the score. A binary or numeric result without a
/// score is an error.
pub fn score_category(
    id: &str,
    category: &CategoryConfig,
    audits: &IndexMap<String, AuditResult>,
) -> Result<CategoryResult, ScoringError> {
    let mut items = Vec::with_capacity(category.audit_refs.len());
    for audit_ref in &category.audit_refs {
        let score = match audits.get(&audit_ref.id) {
            Some(result) if result.score_display_mode.is_scored() => match result.score {
                Some(score) => Some(score),
                None => {
                    return Err(ScoringError::MissingScore {
                        id: audit_ref.id.clone(),
                        mode: result.score_display_mode.to_string(),
                    })
                }
            },
            // Only binary and numeric results count, whatever number they carry
            Some(_) => None,
            None => {
                warn!("Category {} references audit {} with no result", id, audit_ref.id);
                None
            }
        };
        items.push(WeightedScore::new(&audit_ref.id, score, audit_ref.weight));
    }

    let score = weighted_arithmetic_mean(&items)?;
    debug!("Category {} scored {:?} from {} refs", id, score, items.len());

    Ok(CategoryResult {
        id: id.to_string(),
        title: category.title.clone(),
        description: category.description.clone(),
        manual_description: category.manual_description.clone(),
        supported_modes: category.supported_modes.clone(),
        score,
        audit_refs: category
            .audit_refs
            .iter()
            .map(|r| AuditRefResult {
                id: r.id.clone(),
                weight: r.weight,
                group: r.group.clone(),
                acronym: r.acronym.clone(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditRefConfig;
    use crate::models::ScoreDisplayMode;

    fn ws(score: Option<f64>, weight: f64) -> WeightedScore<'static> {
        WeightedScore::new("a", score, weight)
    }

    #[test]
    fn test_nulls_are_excluded_regardless_of_weight() {
        let items = [ws(Some(1.0), 1.0), ws(None, 5.0), ws(Some(0.0), 1.0)];
        assert_eq!(weighted_arithmetic_mean(&items).unwrap(), Some(0.5));
    }

    #[test]
    fn test_three_audits_with_one_not_applicable() {
        let items = [ws(Some(1.0), 1.0), ws(Some(0.5), 1.0), ws(None, 1.0)];
        assert_eq!(weighted_arithmetic_mean(&items).unwrap(), Some(0.75));
    }

    #[test]
    fn test_zero_weight_is_null_not_nan() {
        let items = [ws(Some(1.0), 0.0), ws(Some(0.3), 0.0)];
        assert_eq!(weighted_arithmetic_mean(&items).unwrap(), None);
        assert_eq!(weighted_arithmetic_mean(&[]).unwrap(), None);
        assert_eq!(weighted_arithmetic_mean(&[ws(None, 3.0)]).unwrap(), None);
    }

    #[test]
    fn test_order_does_not_matter() {
        let forward = [ws(Some(0.2), 2.0), ws(Some(0.9), 1.0), ws(Some(0.6), 3.0)];
        let mut backward = forward;
        backward.reverse();
        let a = weighted_arithmetic_mean(&forward).unwrap().unwrap();
        let b = weighted_arithmetic_mean(&backward).unwrap().unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            weighted_arithmetic_mean(&[ws(Some(1.0), -1.0)]),
            Err(ScoringError::InvalidWeight { .. })
        ));
        assert!(matches!(
            weighted_arithmetic_mean(&[ws(Some(1.0), f64::NAN)]),
            Err(ScoringError::InvalidWeight { .. })
        ));
        assert!(matches!(
            weighted_arithmetic_mean(&[ws(Some(1.5), 1.0)]),
            Err(ScoringError::ScoreOutOfRange { .. })
        ));
    }

    fn result(id: &str, score: Option<f64>, mode: ScoreDisplayMode) -> (String, AuditResult) {
        let result = AuditResult {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            score,
            score_display_mode: mode,
            numeric_value: None,
            numeric_unit: None,
            display_value: None,
            explanation: None,
            error_message: None,
            warnings: Vec::new(),
            details: None,
        };
        (id.to_string(), result)
    }

    fn category(ids: &[&str]) -> CategoryConfig {
        CategoryConfig {
            title: "Mixed".into(),
            description: None,
            manual_description: None,
            supported_modes: None,
            audit_refs: ids
                .iter()
                .map(|id| AuditRefConfig {
                    id: id.to_string(),
                    weight: 1.0,
                    group: None,
                    acronym: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_unscored_modes_ignore_stray_scores() {
        let audits: IndexMap<String, AuditResult> = [
            result("ok", Some(1.0), ScoreDisplayMode::Binary),
            result("info", Some(0.0), ScoreDisplayMode::Informative),
            result("err", Some(0.0), ScoreDisplayMode::Error),
            result("na", Some(0.0), ScoreDisplayMode::NotApplicable),
        ]
        .into_iter()
        .collect();

        let scored = score_category("mixed", &category(&["ok", "info", "err", "na"]), &audits).unwrap();
        assert_eq!(scored.score, Some(1.0));
        assert_eq!(scored.audit_refs.len(), 4);
    }

    #[test]
    fn test_scored_mode_without_score_is_an_error() {
        let audits: IndexMap<String, AuditResult> = [
            result("ok", Some(1.0), ScoreDisplayMode::Binary),
            result("blank", None, ScoreDisplayMode::Numeric),
        ]
        .into_iter()
        .collect();

        let err = score_category("mixed", &category(&["ok", "blank"]), &audits).unwrap_err();
        assert_eq!(
            err,
            ScoringError::MissingScore {
                id: "blank".to_string(),
                mode: "numeric".to_string()
            }
        );
    }
}

//! Scoring curves for numeric audits

use crate::error::ScoringError;

/// erfc^-1(0.2), places the p10 control point at a score of 0.9
const INVERSE_ERFC_ONE_FIFTH: f64 = 0.906_193_802_436_823_2;

/// Abramowitz and Stegun approximation of the error function (7.1.26),
/// max error 1.5e-7
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();

    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;

    let t = 1.0 / (1.0 + p * x);
    let y = t * (a1 + t * (a2 + t * (a3 + t * (a4 + t * a5))));
    sign * (1.0 - y * (-x * x).exp())
}

/// Score a "lower is better" metric on a log-normal curve.
///
/// `median` maps to 0.5 and `p10` maps to 0.9. Scores are clamped into the
/// band of the segment the value falls in so rounding never moves a value
/// across a control point.
pub fn log_normal_score(p10: f64, median: f64, value: f64) -> Result<f64, ScoringError> {
    if !(p10 > 0.0 && median > 0.0 && p10 < median) {
        return Err(ScoringError::InvalidCurve { p10, median });
    }
    if value <= 0.0 {
        return Ok(1.0);
    }

    let x_log_ratio = (value / median).max(f64::MIN_POSITIVE).ln();
    let p10_log_ratio = -(p10 / median).max(f64::MIN_POSITIVE).ln();
    let standardized_x = x_log_ratio * INVERSE_ERFC_ONE_FIFTH / p10_log_ratio;
    let complementary_percentile = (1.0 - erf(standardized_x)) / 2.0;

    let score = if value <= p10 {
        complementary_percentile.clamp(0.9, 1.0)
    } else if value <= median {
        complementary_percentile.clamp(0.5, 0.899_999_999_999_999_9)
    } else {
        complementary_percentile.clamp(0.0, 0.499_999_999_999_999_94)
    };
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_points() {
        assert!((log_normal_score(100.0, 400.0, 400.0).unwrap() - 0.5).abs() < 1e-6);
        assert!((log_normal_score(100.0, 400.0, 100.0).unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_monotonic_and_bounded() {
        let mut previous = 1.0;
        for value in [1.0, 50.0, 100.0, 200.0, 400.0, 800.0, 5000.0, 1e9] {
            let score = log_normal_score(100.0, 400.0, value).unwrap();
            assert!((0.0..=1.0).contains(&score));
            assert!(score <= previous, "{} scored above a smaller value", value);
            previous = score;
        }
    }

    #[test]
    fn test_band_clamping() {
        // Just past the median never reaches 0.5
        assert!(log_normal_score(100.0, 400.0, 400.001).unwrap() < 0.5);
        // Just past p10 never reaches 0.9
        assert!(log_normal_score(100.0, 400.0, 100.001).unwrap() < 0.9);
    }

    #[test]
    fn test_zero_value_is_perfect() {
        assert_eq!(log_normal_score(100.0, 400.0, 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_invalid_curve() {
        assert!(log_normal_score(400.0, 100.0, 1.0).is_err());
        assert!(log_normal_score(0.0, 100.0, 1.0).is_err());
        assert!(log_normal_score(100.0, 100.0, 1.0).is_err());
    }

    #[test]
    fn test_erf() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
    }
}

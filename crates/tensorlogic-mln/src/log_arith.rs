//! Log-domain accumulation.

/// Differences below this are treated as vanishing when adding in log space.
pub const LOG_ADD_CUTOFF: f64 = -200.0;

/// Compute `ln(exp(log_x) + exp(log_y))` without leaving log space.
///
/// The larger operand becomes the base. When the smaller term is more than
/// 200 nats below it, the base is returned unchanged.
pub fn log_add(log_x: f64, log_y: f64) -> f64 {
    let (log_x, log_y) = if log_y > log_x {
        (log_y, log_x)
    } else {
        (log_x, log_y)
    };

    if log_x == f64::NEG_INFINITY {
        return log_x;
    }

    let neg_diff = log_y - log_x;
    if neg_diff < LOG_ADD_CUTOFF {
        return log_x;
    }

    log_x + neg_diff.exp().ln_1p()
}

/// Fold a sequence of log-domain terms with [`log_add`].
///
/// An empty sequence sums to negative infinity.
pub fn log_sum<I>(terms: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    terms.into_iter().fold(f64::NEG_INFINITY, log_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_log_add_matches_direct_sum() {
        let got = log_add(-2.0, -1.0);
        let expected = ((-2.0f64).exp() + (-1.0f64).exp()).ln();
        assert_abs_diff_eq!(got, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(got, -0.686_738_6, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_infinity_is_identity() {
        assert_eq!(log_add(3.5, f64::NEG_INFINITY), 3.5);
        assert_eq!(log_add(f64::NEG_INFINITY, -7.25), -7.25);
        assert_eq!(
            log_add(f64::NEG_INFINITY, f64::NEG_INFINITY),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_underflow_cutoff_returns_base_exactly() {
        let base = 12.0;
        assert_eq!(log_add(base, base - 200.5), base);
        assert_eq!(log_add(base - 200.5, base), base);
        // Just inside the cutoff the small term still contributes.
        assert!(log_add(0.0, -30.0) > 0.0);
    }

    #[test]
    fn test_log_sum_empty_and_uniform() {
        assert_eq!(log_sum(std::iter::empty()), f64::NEG_INFINITY);
        let four_halves = log_sum([0.5f64.ln(); 4]);
        assert_abs_diff_eq!(four_halves, 2.0f64.ln(), epsilon = 1e-12);
    }
}

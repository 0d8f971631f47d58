/// Percentage of available points earned, rounded half away from zero to one decimal.
///
/// Returns `0.0` when no points are available.
pub fn ratio_value(total_score: i64, total_points: i64) -> f64 {
    if total_points <= 0 {
        return 0.0;
    }
    let pct = total_score as f64 / total_points as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Display form of [`ratio_value`], always with exactly one decimal.
///
/// | Score / Points | Ratio  |
/// |----------------|--------|
/// | 8 / 10         | `80.0` |
/// | 2 / 3          | `66.7` |
/// | 1 / 16         | `6.3`  |
/// | 5 / 0          | `0.0`  |
pub fn ratio(total_score: i64, total_points: i64) -> String {
    format!("{:.1}", ratio_value(total_score, total_points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_boundaries() {
        assert_eq!(ratio(8, 10), "80.0");
        assert_eq!(ratio(10, 10), "100.0");
        assert_eq!(ratio(0, 10), "0.0");
        assert_eq!(ratio(2, 3), "66.7");
        assert_eq!(ratio(1, 3), "33.3");
        assert_eq!(ratio(1, 16), "6.3");
        assert_eq!(ratio(1, 8), "12.5");
    }

    #[test]
    fn test_ratio_with_zero_points() {
        assert_eq!(ratio(0, 0), "0.0");
        assert_eq!(ratio(5, 0), "0.0");
    }

    #[test]
    fn test_ratio_stays_within_half_a_tenth() {
        for points in 1..=40 {
            for score in 0..=points {
                let rendered = ratio(score, points);
                let (_, decimals) = rendered.split_once('.').unwrap();
                assert_eq!(decimals.len(), 1);

                let exact = score as f64 / points as f64 * 100.0;
                let parsed: f64 = rendered.parse().unwrap();
                assert!((parsed - exact).abs() <= 0.05 + 1e-9, "{score}/{points}");
            }
        }
    }
}

//! Point weight normalization.
//!
//! Stored weights that are missing or non-positive read as 1. Nothing here
//! writes back to storage; a normalized map only reaches the backend through
//! an explicit save.

use std::collections::{BTreeMap, HashMap};

use crate::grades::types::ProblemRef;

/// Stored weight if positive, otherwise 1.
pub fn effective_points(stored: Option<i64>) -> i64 {
    match stored {
        Some(p) if p > 0 => p,
        _ => 1,
    }
}

/// Parses a raw points input. Decimals are truncated; blank, negative or
/// non-numeric input yields `None`.
pub fn parse_points_input(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = match trimmed.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f = trimmed.parse::<f64>().ok().filter(|f| f.is_finite())?;
            if f.abs() >= i64::MAX as f64 {
                return None;
            }
            f.trunc() as i64
        }
    };

    (parsed >= 0).then_some(parsed)
}

/// Resolves the point weight of every problem from the user's edits.
///
/// A valid edit wins and is raised to at least 1. Without a valid edit the
/// stored weight is kept when positive, else 1.
pub fn normalize_points(
    problems: &[ProblemRef],
    edits: &HashMap<i64, String>,
) -> BTreeMap<i64, i64> {
    problems
        .iter()
        .map(|p| {
            let points = edits
                .get(&p.problem_id)
                .and_then(|raw| parse_points_input(raw))
                .map(|v| v.max(1))
                .unwrap_or_else(|| p.effective_points());
            (p.problem_id, points)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(id: i64, points: Option<i64>) -> ProblemRef {
        ProblemRef {
            problem_id: id,
            problem_title: format!("P{id}"),
            points,
        }
    }

    fn edits(pairs: &[(i64, &str)]) -> HashMap<i64, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_effective_points() {
        assert_eq!(effective_points(Some(5)), 5);
        assert_eq!(effective_points(Some(0)), 1);
        assert_eq!(effective_points(Some(-2)), 1);
        assert_eq!(effective_points(None), 1);
    }

    #[test]
    fn test_parse_points_input() {
        assert_eq!(parse_points_input("10"), Some(10));
        assert_eq!(parse_points_input(" 7 "), Some(7));
        assert_eq!(parse_points_input("3.9"), Some(3));
        assert_eq!(parse_points_input("0"), Some(0));
        assert_eq!(parse_points_input(""), None);
        assert_eq!(parse_points_input("-1"), None);
        assert_eq!(parse_points_input("abc"), None);
        assert_eq!(parse_points_input("NaN"), None);
    }

    #[test]
    fn test_edits_override_and_clamp_to_one() {
        let problems = vec![problem(1, Some(5)), problem(2, Some(5)), problem(3, Some(5))];
        let result = normalize_points(&problems, &edits(&[(1, "20"), (2, "0")]));

        assert_eq!(result[&1], 20);
        assert_eq!(result[&2], 1);
        assert_eq!(result[&3], 5);
    }

    #[test]
    fn test_invalid_edits_fall_back_to_stored() {
        let problems = vec![problem(1, Some(4)), problem(2, None), problem(3, Some(0))];
        let result = normalize_points(&problems, &edits(&[(1, "x"), (2, ""), (3, "-5")]));

        assert_eq!(result[&1], 4);
        assert_eq!(result[&2], 1);
        assert_eq!(result[&3], 1);
    }

    #[test]
    fn test_edits_for_unknown_problems_are_ignored() {
        let problems = vec![problem(1, Some(2))];
        let result = normalize_points(&problems, &edits(&[(99, "50")]));

        assert_eq!(result.len(), 1);
        assert_eq!(result[&1], 2);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let problems = vec![problem(1, Some(0)), problem(2, Some(3)), problem(3, None)];
        let e = edits(&[(1, "0"), (2, "12"), (3, "bad")]);

        let once = normalize_points(&problems, &e);

        let saved: Vec<ProblemRef> = problems
            .iter()
            .map(|p| problem(p.problem_id, Some(once[&p.problem_id])))
            .collect();
        let twice = normalize_points(&saved, &e);

        assert_eq!(once, twice);
        assert_eq!(once, normalize_points(&problems, &e));
    }
}

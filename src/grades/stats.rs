use serde::Serialize;

use crate::grades::ratio::ratio_value;
use crate::grades::types::StudentGradeEntry;

/// Score distribution of one gradable item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStatistics {
    pub student_count: usize,
    /// Students with at least one submitted problem.
    pub submitted_count: usize,
    pub total_points: i64,
    pub mean_score: f64,
    pub stddev_score: f64,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub mean_ratio: f64,
}

/// Summarizes the enriched entries of one item. Spreads are population
/// figures; an empty item reports zeros and no min/max.
pub fn item_statistics(entries: &[StudentGradeEntry]) -> ItemStatistics {
    let n = entries.len();
    let (mean_score, stddev_score, mean_ratio) = if n == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let count = n as f64;
        let mean_score = entries.iter().map(|e| e.total_score as f64).sum::<f64>() / count;
        let variance = entries
            .iter()
            .map(|e| (e.total_score as f64 - mean_score).powi(2))
            .sum::<f64>()
            / count;
        let mean_ratio = entries
            .iter()
            .map(|e| ratio_value(e.total_score, e.total_points))
            .sum::<f64>()
            / count;
        (mean_score, variance.sqrt(), mean_ratio)
    };

    ItemStatistics {
        student_count: n,
        submitted_count: entries
            .iter()
            .filter(|e| e.problem_grades.values().any(|g| g.submitted))
            .count(),
        total_points: entries.first().map(|e| e.total_points).unwrap_or(0),
        mean_score,
        stddev_score,
        min_score: entries.iter().map(|e| e.total_score).min(),
        max_score: entries.iter().map(|e| e.total_score).max(),
        mean_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::types::ProblemGrade;

    fn entry(user_id: i64, score: i64, submitted: bool) -> StudentGradeEntry {
        let mut e = StudentGradeEntry {
            user_id,
            total_score: score,
            total_points: 10,
            ..Default::default()
        };
        e.problem_grades.insert(
            1,
            ProblemGrade {
                score: Some(score),
                submitted,
                points: 10,
                ..Default::default()
            },
        );
        e
    }

    #[test]
    fn test_score_spread() {
        let entries: Vec<_> = [2, 4, 4, 4, 5, 5, 7, 9]
            .iter()
            .enumerate()
            .map(|(i, score)| entry(i as i64, *score, true))
            .collect();
        let stats = item_statistics(&entries);

        assert_eq!(stats.mean_score, 5.0);
        assert_eq!(stats.stddev_score, 2.0);
    }

    #[test]
    fn test_item_statistics() {
        let entries = vec![entry(1, 10, true), entry(2, 6, true), entry(3, 2, false)];
        let stats = item_statistics(&entries);

        assert_eq!(stats.student_count, 3);
        assert_eq!(stats.submitted_count, 2);
        assert_eq!(stats.total_points, 10);
        assert_eq!(stats.mean_score, 6.0);
        assert_eq!(stats.min_score, Some(2));
        assert_eq!(stats.max_score, Some(10));
        assert!((stats.mean_ratio - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_item_statistics_empty() {
        let stats = item_statistics(&[]);

        assert_eq!(stats.student_count, 0);
        assert_eq!(stats.min_score, None);
        assert_eq!(stats.mean_score, 0.0);
        assert_eq!(stats.stddev_score, 0.0);
    }
}

//! Data types shared by the aggregation pipeline, the REST client and the CSV writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::grades::points::effective_points;
use crate::grades::ratio::ratio;

/// Whether a gradable item is a regular assignment or a quiz (coding test).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Assignment,
    Quiz,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Assignment => "assignment",
            ItemKind::Quiz => "quiz",
        }
    }
}

/// A single problem inside a gradable item together with its point weight.
///
/// `points` is the value as stored by the backend. It may be missing or
/// non-positive; use [`ProblemRef::effective_points`] for display and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRef {
    pub problem_id: i64,
    pub problem_title: String,
    #[serde(default)]
    pub points: Option<i64>,
}

impl ProblemRef {
    pub fn effective_points(&self) -> i64 {
        effective_points(self.points)
    }
}

/// An assignment or quiz, the unit students are scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradableItem {
    pub id: i64,
    pub title: String,
    pub kind: ItemKind,
    pub problems: Vec<ProblemRef>,
}

impl GradableItem {
    pub fn assignment(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            kind: ItemKind::Assignment,
            problems: Vec::new(),
        }
    }

    pub fn quiz(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            kind: ItemKind::Quiz,
            problems: Vec::new(),
        }
    }

    pub fn with_problems(mut self, problems: Vec<ProblemRef>) -> Self {
        self.problems = problems;
        self
    }

    /// Sum of effective problem points. Identical for every student of the item.
    pub fn total_points(&self) -> i64 {
        self.problems.iter().map(ProblemRef::effective_points).sum()
    }
}

/// One student's result on one problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProblemGrade {
    /// `None` means ungraded, which is distinct from an earned zero.
    pub score: Option<i64>,
    pub submitted: bool,
    pub is_on_time: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub points: i64,
    pub problem_title: Option<String>,
}

/// One student's performance on one gradable item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentGradeEntry {
    pub user_id: i64,
    pub student_name: String,
    pub student_id: String,
    pub total_score: i64,
    pub total_points: i64,
    pub problem_grades: BTreeMap<i64, ProblemGrade>,
}

impl StudentGradeEntry {
    pub fn ratio(&self) -> String {
        ratio(self.total_score, self.total_points)
    }

    pub fn score_for(&self, problem_id: i64) -> Option<i64> {
        self.problem_grades.get(&problem_id).and_then(|g| g.score)
    }
}

/// Per-item cell group of a course row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub total_score: i64,
    pub total_points: i64,
    pub ratio: String,
    pub problems: BTreeMap<i64, ProblemGrade>,
}

impl From<&StudentGradeEntry> for ItemSummary {
    fn from(entry: &StudentGradeEntry) -> Self {
        Self {
            total_score: entry.total_score,
            total_points: entry.total_points,
            ratio: entry.ratio(),
            problems: entry.problem_grades.clone(),
        }
    }
}

/// One student's results across every item of the section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentCourseRow {
    pub user_id: i64,
    pub student_name: String,
    pub student_id: String,
    pub assignments: BTreeMap<i64, ItemSummary>,
    pub quizzes: BTreeMap<i64, ItemSummary>,
}

impl StudentCourseRow {
    pub fn new(user_id: i64, student_name: String, student_id: String) -> Self {
        Self {
            user_id,
            student_name,
            student_id,
            assignments: BTreeMap::new(),
            quizzes: BTreeMap::new(),
        }
    }

    pub fn summary(&self, item: &GradableItem) -> Option<&ItemSummary> {
        match item.kind {
            ItemKind::Assignment => self.assignments.get(&item.id),
            ItemKind::Quiz => self.quizzes.get(&item.id),
        }
    }

    pub fn course_total_score(&self) -> i64 {
        self.assignments
            .values()
            .chain(self.quizzes.values())
            .map(|s| s.total_score)
            .sum()
    }
}

/// The full cross-item, cross-student grade view of a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseGradeMatrix {
    pub items: Vec<GradableItem>,
    pub students: Vec<StudentCourseRow>,
}

impl CourseGradeMatrix {
    /// Points available across all items, applied uniformly to every student.
    pub fn course_total_points(&self) -> i64 {
        self.items.iter().map(GradableItem::total_points).sum()
    }

    pub fn course_ratio(&self, row: &StudentCourseRow) -> String {
        ratio(row.course_total_score(), self.course_total_points())
    }
}

/// Section metadata used for export file names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInfo {
    pub section_id: i64,
    pub course_title: String,
    pub section_number: i64,
}

/// Single grade write with an optional grader comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeUpdate {
    pub user_id: i64,
    pub problem_id: i64,
    pub score: i64,
    pub comment: Option<String>,
}

/// One row of a bulk grade write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkGrade {
    pub user_id: i64,
    pub problem_id: i64,
    pub score: i64,
}

/// The accepted submission of a student for one problem.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedCode {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<String>,
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

    #[test]
    fn test_total_points_normalizes_unset_weights() {
        let item = GradableItem::assignment(1, "HW1").with_problems(vec![
            problem(1, Some(10)),
            problem(2, None),
            problem(3, Some(0)),
            problem(4, Some(-3)),
        ]);

        assert_eq!(item.total_points(), 13);
    }

    #[test]
    fn test_course_totals_span_assignments_and_quizzes() {
        let mut row = StudentCourseRow::new(7, "Kim".into(), "2021001".into());
        row.assignments.insert(
            1,
            ItemSummary {
                total_score: 8,
                total_points: 10,
                ratio: "80.0".into(),
                problems: BTreeMap::new(),
            },
        );
        row.quizzes.insert(
            1,
            ItemSummary {
                total_score: 3,
                total_points: 5,
                ratio: "60.0".into(),
                problems: BTreeMap::new(),
            },
        );

        let matrix = CourseGradeMatrix {
            items: vec![
                GradableItem::assignment(1, "HW1").with_problems(vec![problem(1, Some(10))]),
                GradableItem::quiz(1, "Quiz").with_problems(vec![problem(9, Some(5))]),
            ],
            students: vec![row.clone()],
        };

        assert_eq!(row.course_total_score(), 11);
        assert_eq!(matrix.course_total_points(), 15);
        assert_eq!(matrix.course_ratio(&row), "73.3");
        assert_eq!(row.summary(&matrix.items[1]).map(|s| s.total_score), Some(3));
    }
}

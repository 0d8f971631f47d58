//! Traits for reading grades from and writing grades/points to the course backend.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::grades::types::{AcceptedCode, BulkGrade, GradeUpdate, ProblemRef, StudentGradeEntry};

/// Read access to per-item grade records plus grade writes.
///
/// Entries returned here are raw: `total_points` and the per-problem
/// `points` are whatever the backend sent. The aggregator recomputes them
/// from the item's problem list.
#[async_trait::async_trait]
pub trait GradeSource: Send + Sync {
    async fn get_assignment_grades(
        &self,
        section_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<StudentGradeEntry>>;

    async fn get_quiz_grades(
        &self,
        section_id: i64,
        quiz_id: i64,
    ) -> Result<Vec<StudentGradeEntry>>;

    async fn get_assignment_problems(
        &self,
        section_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<ProblemRef>>;

    async fn save_grade(
        &self,
        section_id: i64,
        assignment_id: i64,
        update: &GradeUpdate,
    ) -> Result<()>;

    async fn save_bulk_grades(
        &self,
        section_id: i64,
        assignment_id: i64,
        grades: &[BulkGrade],
    ) -> Result<()>;

    async fn get_student_accepted_code(
        &self,
        section_id: i64,
        assignment_id: i64,
        user_id: i64,
        problem_id: i64,
    ) -> Result<AcceptedCode>;
}

/// Write access to per-problem point weights.
#[async_trait::async_trait]
pub trait PointsStore: Send + Sync {
    async fn set_bulk_problem_points(
        &self,
        section_id: i64,
        assignment_id: i64,
        problem_points: &BTreeMap<i64, i64>,
    ) -> Result<()>;
}

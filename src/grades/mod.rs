//! Grade aggregation, normalization and editing.
//!
//! Per-assignment and per-quiz grade records are fetched concurrently,
//! enriched with normalized point weights, and merged into a per-student
//! course matrix keyed by `user_id`.

pub mod aggregate;
pub mod points;
pub mod query;
pub mod ratio;
pub mod stats;
pub mod types;
pub mod workflow;

pub use aggregate::{GradeAggregator, ItemGrades, merge_course_matrix};
pub use points::normalize_points;
pub use types::{CourseGradeMatrix, GradableItem, ItemKind, ProblemRef, StudentGradeEntry};

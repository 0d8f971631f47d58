//! Search and ordering of displayed student rows.
//!
//! CSV exports are written in the order produced here, so an export always
//! mirrors the table the user filtered.

use clap::ValueEnum;

use crate::grades::types::{StudentCourseRow, StudentGradeEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Keep the order the rows were built in.
    #[default]
    None,
    Name,
    StudentId,
    /// Highest total first.
    Total,
}

/// Anything that renders as one student line.
pub trait StudentRow {
    fn student_name(&self) -> &str;
    fn student_id(&self) -> &str;
    fn total_score(&self) -> i64;
}

impl StudentRow for StudentGradeEntry {
    fn student_name(&self) -> &str {
        &self.student_name
    }

    fn student_id(&self) -> &str {
        &self.student_id
    }

    fn total_score(&self) -> i64 {
        self.total_score
    }
}

impl StudentRow for StudentCourseRow {
    fn student_name(&self) -> &str {
        &self.student_name
    }

    fn student_id(&self) -> &str {
        &self.student_id
    }

    fn total_score(&self) -> i64 {
        self.course_total_score()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    pub search: Option<String>,
    pub sort: SortKey,
}

impl StudentQuery {
    pub fn matches<R: StudentRow>(&self, row: &R) -> bool {
        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        row.student_name().to_lowercase().contains(&needle)
            || row.student_id().to_lowercase().contains(&needle)
    }

    /// Filters and orders borrowed rows. Sorting is stable; ties keep build order.
    pub fn apply<'a, R: StudentRow>(&self, rows: &'a [R]) -> Vec<&'a R> {
        let mut out: Vec<&R> = rows.iter().filter(|r| self.matches(*r)).collect();

        match self.sort {
            SortKey::None => {}
            SortKey::Name => out.sort_by(|a, b| a.student_name().cmp(b.student_name())),
            SortKey::StudentId => out.sort_by(|a, b| a.student_id().cmp(b.student_id())),
            SortKey::Total => out.sort_by(|a, b| b.total_score().cmp(&a.total_score())),
        }

        out
    }
}

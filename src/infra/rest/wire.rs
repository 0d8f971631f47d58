//! JSON shapes of the course backend and their conversion into domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::grades::types::{
    BulkGrade, GradableItem, ItemKind, ProblemGrade, StudentGradeEntry,
};

/// List endpoints answer either with a bare array or with `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(v) => v,
            Listing::Wrapped { data } => data,
        }
    }
}

/// Single-object endpoints may also be wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Single<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Single<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Single::Wrapped { data } => data,
            Single::Bare(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireItem {
    #[serde(alias = "assignmentId", alias = "quizId")]
    id: i64,
    #[serde(default)]
    title: String,
}

impl WireItem {
    pub(crate) fn into_item(self, kind: ItemKind) -> GradableItem {
        GradableItem {
            id: self.id,
            title: self.title,
            kind,
            problems: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireGradeEntry {
    user_id: i64,
    #[serde(default)]
    student_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    student_id: String,
    #[serde(default)]
    total_score: i64,
    #[serde(default)]
    total_points: i64,
    #[serde(default)]
    problem_grades: Vec<WireProblemGrade>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProblemGrade {
    problem_id: i64,
    #[serde(default)]
    problem_title: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    submitted: bool,
    #[serde(default)]
    is_on_time: bool,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    points: Option<i64>,
}

impl From<WireGradeEntry> for StudentGradeEntry {
    fn from(w: WireGradeEntry) -> Self {
        let problem_grades: BTreeMap<i64, ProblemGrade> = w
            .problem_grades
            .into_iter()
            .map(|g| {
                (
                    g.problem_id,
                    ProblemGrade {
                        score: g.score,
                        submitted: g.submitted,
                        is_on_time: g.is_on_time,
                        submitted_at: g.submitted_at,
                        points: g.points.unwrap_or(0),
                        problem_title: g.problem_title,
                    },
                )
            })
            .collect();

        StudentGradeEntry {
            user_id: w.user_id,
            student_name: w.student_name,
            student_id: w.student_id,
            total_score: w.total_score,
            total_points: w.total_points,
            problem_grades,
        }
    }
}

/// Student numbers arrive as strings from some endpoints and as numbers from others.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkGradesBody<'a> {
    pub(crate) grades: &'a [BulkGrade],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProblemPointsBody<'a> {
    pub(crate) problem_points: &'a BTreeMap<i64, i64>,
}

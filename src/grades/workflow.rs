//! Grade and point-weight writes.
//!
//! Writes are delegated straight to the backend and never retried. Nothing
//! here patches in-memory tables; callers refetch to observe a change.

use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::grades::points::normalize_points;
use crate::grades::types::{BulkGrade, GradableItem, GradeUpdate, ItemKind, ProblemRef};
use crate::services::{GradeSource, PointsStore};

/// Where the points-edit workflow of one item currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsEditState {
    Closed,
    Loading {
        item: GradableItem,
    },
    Editing {
        item: GradableItem,
        problems: Vec<ProblemRef>,
        inputs: HashMap<i64, String>,
    },
    Saving {
        item: GradableItem,
    },
}

/// Drives `Closed -> Loading -> Editing -> Saving -> Closed` for one section.
///
/// If a `save` future is dropped mid-flight the editor stays in `Saving`
/// until [`PointsEditor::cancel`] is called.
#[derive(Debug)]
pub struct PointsEditor {
    section_id: i64,
    state: PointsEditState,
}

impl PointsEditor {
    pub fn new(section_id: i64) -> Self {
        Self {
            section_id,
            state: PointsEditState::Closed,
        }
    }

    pub fn state(&self) -> &PointsEditState {
        &self.state
    }

    /// Loads the current problem list of an assignment and pre-fills inputs
    /// with normalized points. Quizzes are rejected.
    pub async fn open<S: GradeSource + ?Sized>(
        &mut self,
        source: &S,
        item: &GradableItem,
    ) -> Result<()> {
        if self.state != PointsEditState::Closed {
            bail!("points editor is already open");
        }
        // Point weights are stored per assignment; quiz ids live in another namespace.
        if item.kind != ItemKind::Assignment {
            bail!("points of quiz {} cannot be edited", item.id);
        }
        self.state = PointsEditState::Loading { item: item.clone() };

        let problems = match source
            .get_assignment_problems(self.section_id, item.id)
            .await
            .with_context(|| format!("loading problems of assignment {}", item.id))
        {
            Ok(p) => p,
            Err(e) => {
                self.state = PointsEditState::Closed;
                return Err(e);
            }
        };

        let inputs = problems
            .iter()
            .map(|p| (p.problem_id, p.effective_points().to_string()))
            .collect();

        self.state = PointsEditState::Editing {
            item: item.clone(),
            problems,
            inputs,
        };
        Ok(())
    }

    pub fn set_input(&mut self, problem_id: i64, value: impl Into<String>) -> Result<()> {
        let PointsEditState::Editing {
            problems, inputs, ..
        } = &mut self.state
        else {
            bail!("points editor is not editing");
        };

        if !problems.iter().any(|p| p.problem_id == problem_id) {
            bail!("problem {problem_id} is not part of this item");
        }
        inputs.insert(problem_id, value.into());
        Ok(())
    }

    /// Points that would be saved right now, or `None` outside `Editing`.
    pub fn pending_points(&self) -> Option<BTreeMap<i64, i64>> {
        match &self.state {
            PointsEditState::Editing {
                problems, inputs, ..
            } => Some(normalize_points(problems, inputs)),
            _ => None,
        }
    }

    /// Saves the normalized inputs. On failure the editor returns to `Editing`
    /// with the inputs intact so the user can retry.
    pub async fn save<P: PointsStore + ?Sized>(&mut self, store: &P) -> Result<BTreeMap<i64, i64>> {
        let (item, problems, inputs) =
            match std::mem::replace(&mut self.state, PointsEditState::Closed) {
                PointsEditState::Editing {
                    item,
                    problems,
                    inputs,
                } => (item, problems, inputs),
                other => {
                    self.state = other;
                    bail!("points editor is not editing");
                }
            };

        let points = normalize_points(&problems, &inputs);
        self.state = PointsEditState::Saving { item: item.clone() };

        match store
            .set_bulk_problem_points(self.section_id, item.id, &points)
            .await
        {
            Ok(()) => {
                info!(item_id = item.id, problems = points.len(), "Problem points saved");
                self.state = PointsEditState::Closed;
                Ok(points)
            }
            Err(e) => {
                warn!(item_id = item.id, error = %e, "Problem points save failed");
                self.state = PointsEditState::Editing {
                    item: item.clone(),
                    problems,
                    inputs,
                };
                Err(e.context(format!("saving points of item {}", item.id)))
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = PointsEditState::Closed;
    }
}

/// Outcome of a best-effort save across several items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    /// `(item_id, error message)` per failed item, ordered by item id.
    pub failures: Vec<(i64, String)>,
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}개 과제의 배점이 저장되었습니다", self.saved)?;
        if self.failed > 0 {
            write!(f, " ({}개 실패)", self.failed)?;
        }
        Ok(())
    }
}

/// Saves point maps of several items concurrently.
///
/// Failures are counted, not rolled back: items that saved stay saved.
/// Values below 1 are raised to 1 before sending.
#[tracing::instrument(skip(store, points_by_item), fields(items = points_by_item.len()))]
pub async fn save_course_points<P: PointsStore + 'static>(
    store: Arc<P>,
    section_id: i64,
    points_by_item: BTreeMap<i64, BTreeMap<i64, i64>>,
) -> SaveReport {
    let mut tasks = Vec::with_capacity(points_by_item.len());

    for (item_id, points) in points_by_item {
        let store = store.clone();
        let points: BTreeMap<i64, i64> = points.into_iter().map(|(k, v)| (k, v.max(1))).collect();

        let task = tokio::spawn(async move {
            store
                .set_bulk_problem_points(section_id, item_id, &points)
                .await
        });
        tasks.push((item_id, task));
    }

    let mut report = SaveReport::default();

    for (item_id, task) in tasks {
        let outcome = match task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::new(e)),
        };

        match outcome {
            Ok(()) => report.saved += 1,
            Err(e) => {
                error!(item_id, error = %e, "Points save failed");
                report.failed += 1;
                report.failures.push((item_id, e.to_string()));
            }
        }
    }

    info!(saved = report.saved, failed = report.failed, "{}", report);
    report
}

/// Writes a batch of grades for one item through the bulk endpoint.
pub async fn save_bulk_grades<S: GradeSource + ?Sized>(
    source: &S,
    section_id: i64,
    item_id: i64,
    grades: &[BulkGrade],
) -> Result<()> {
    source
        .save_bulk_grades(section_id, item_id, grades)
        .await
        .with_context(|| format!("saving {} grades of item {item_id}", grades.len()))?;

    info!(item_id, grades = grades.len(), "Bulk grades saved");
    Ok(())
}

/// Writes one grade with an optional comment.
pub async fn save_grade<S: GradeSource + ?Sized>(
    source: &S,
    section_id: i64,
    item_id: i64,
    update: &GradeUpdate,
) -> Result<()> {
    source
        .save_grade(section_id, item_id, update)
        .await
        .with_context(|| {
            format!(
                "saving grade of user {} problem {} in item {item_id}",
                update.user_id, update.problem_id
            )
        })?;

    info!(item_id, user_id = update.user_id, problem_id = update.problem_id, "Grade saved");
    Ok(())
}

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{Instrument, debug, error, info, warn};

use crate::grades::types::{
    CourseGradeMatrix, GradableItem, ItemKind, ItemSummary, ProblemRef, StudentCourseRow,
    StudentGradeEntry,
};
use crate::services::GradeSource;

/// Default number of item fetches in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Grades of one item after its problem list has been resolved.
///
/// `item.problems` is the resolved list and every entry's totals and
/// per-problem points agree with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGrades {
    pub item: GradableItem,
    pub entries: Vec<StudentGradeEntry>,
}

impl ItemGrades {
    /// Result of a failed fetch. The problem list is cleared so the item
    /// drops out of a course matrix instead of adding unearned points.
    fn empty(item: GradableItem) -> Self {
        Self {
            item: item.with_problems(Vec::new()),
            entries: Vec::new(),
        }
    }
}

/// Collects grade records of one section from a [`GradeSource`].
pub struct GradeAggregator<S> {
    source: Arc<S>,
    section_id: i64,
    concurrency: usize,
}

impl<S: GradeSource + 'static> GradeAggregator<S> {
    pub fn new(source: Arc<S>, section_id: i64) -> Self {
        Self {
            source,
            section_id,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn section_id(&self) -> i64 {
        self.section_id
    }

    /// Fetches and enriches the grades of a single item.
    ///
    /// Never fails: a fetch or shape error is logged and yields no entries.
    pub async fn fetch_item_grades(&self, item: &GradableItem) -> ItemGrades {
        fetch_item(self.source.as_ref(), self.section_id, item).await
    }

    /// Fetches every item concurrently and merges the results by `user_id`.
    ///
    /// Results are placed back by input position before merging, so the
    /// matrix does not depend on which fetch finished first.
    #[tracing::instrument(
        skip(self, assignments, quizzes),
        fields(section_id = self.section_id, assignments = assignments.len(), quizzes = quizzes.len())
    )]
    pub async fn build_course_matrix(
        &self,
        assignments: &[GradableItem],
        quizzes: &[GradableItem],
    ) -> CourseGradeMatrix {
        let items: Vec<GradableItem> = assignments.iter().chain(quizzes).cloned().collect();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut tasks = Vec::with_capacity(items.len());

        for item in items.iter().cloned() {
            let sem = semaphore.clone();
            let source = self.source.clone();
            let section_id = self.section_id;

            let item_span = tracing::info_span!(
                "fetch_item",
                item_id = item.id,
                kind = item.kind.as_str(),
            );

            let task = tokio::spawn(
                async move {
                    let _permit = sem.acquire().await?;
                    Ok::<ItemGrades, anyhow::Error>(
                        fetch_item(source.as_ref(), section_id, &item).await,
                    )
                }
                .instrument(item_span),
            );

            tasks.push(task);
        }

        let mut fetched = Vec::with_capacity(tasks.len());
        let mut failed = 0usize;

        for (item, task) in items.into_iter().zip(tasks) {
            match task.await {
                Ok(Ok(grades)) => fetched.push(grades),
                Ok(Err(e)) => {
                    failed += 1;
                    error!(item_id = item.id, error = %e, "Item fetch aborted");
                    fetched.push(ItemGrades::empty(item));
                }
                Err(e) => {
                    failed += 1;
                    error!(item_id = item.id, error = %e, "Item fetch task failed");
                    fetched.push(ItemGrades::empty(item));
                }
            }
        }

        let matrix = merge_course_matrix(fetched);

        info!(
            items = matrix.items.len(),
            students = matrix.students.len(),
            failed,
            "Course grade matrix built"
        );

        matrix
    }
}

/// Merges per-item grades into a course matrix.
///
/// Items without problems are dropped entirely. Items keep input order; rows
/// are keyed and ordered by `user_id`, and the first name/student id seen
/// for a user wins.
pub fn merge_course_matrix(fetched: Vec<ItemGrades>) -> CourseGradeMatrix {
    let mut rows: BTreeMap<i64, StudentCourseRow> = BTreeMap::new();
    let mut items = Vec::new();

    for ItemGrades { item, entries } in fetched {
        if item.problems.is_empty() {
            debug!(item_id = item.id, kind = item.kind.as_str(), "Skipping item without problems");
            continue;
        }

        for entry in &entries {
            let row = rows.entry(entry.user_id).or_insert_with(|| {
                StudentCourseRow::new(
                    entry.user_id,
                    entry.student_name.clone(),
                    entry.student_id.clone(),
                )
            });

            let slot = match item.kind {
                ItemKind::Assignment => &mut row.assignments,
                ItemKind::Quiz => &mut row.quizzes,
            };
            slot.insert(item.id, ItemSummary::from(entry));
        }

        items.push(item);
    }

    CourseGradeMatrix {
        items,
        students: rows.into_values().collect(),
    }
}

async fn fetch_item<S: GradeSource + ?Sized>(
    source: &S,
    section_id: i64,
    item: &GradableItem,
) -> ItemGrades {
    match item.kind {
        ItemKind::Assignment => {
            let (grades, problems) = tokio::join!(
                source.get_assignment_grades(section_id, item.id),
                source.get_assignment_problems(section_id, item.id),
            );

            let entries = match grades {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(item_id = item.id, error = %e, "Assignment grade fetch failed");
                    return ItemGrades::empty(item.clone());
                }
            };

            let problems = match problems {
                Ok(p) if !p.is_empty() => p,
                Ok(_) if !item.problems.is_empty() => item.problems.clone(),
                Ok(_) => derive_problems(&entries),
                Err(e) => {
                    warn!(item_id = item.id, error = %e, "Problem list fetch failed, deriving from grades");
                    if item.problems.is_empty() {
                        derive_problems(&entries)
                    } else {
                        item.problems.clone()
                    }
                }
            };

            resolve_item(item, problems, entries)
        }
        ItemKind::Quiz => {
            let entries = match source.get_quiz_grades(section_id, item.id).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(item_id = item.id, error = %e, "Quiz grade fetch failed");
                    return ItemGrades::empty(item.clone());
                }
            };

            let problems = derive_problems(&entries);
            resolve_item(item, problems, entries)
        }
    }
}

/// Problem list taken from the first entry's grades, ordered by problem id.
fn derive_problems(entries: &[StudentGradeEntry]) -> Vec<ProblemRef> {
    let Some(first) = entries.first() else {
        return Vec::new();
    };

    first
        .problem_grades
        .iter()
        .map(|(&problem_id, grade)| ProblemRef {
            problem_id,
            problem_title: grade
                .problem_title
                .clone()
                .unwrap_or_else(|| format!("문제 {problem_id}")),
            points: (grade.points > 0).then_some(grade.points),
        })
        .collect()
}

fn resolve_item(
    item: &GradableItem,
    problems: Vec<ProblemRef>,
    entries: Vec<StudentGradeEntry>,
) -> ItemGrades {
    let item = GradableItem {
        problems,
        ..item.clone()
    };
    let total_points = item.total_points();

    let entries = entries
        .into_iter()
        .map(|entry| enrich_entry(entry, &item.problems, total_points))
        .collect::<Vec<_>>();

    debug!(
        item_id = item.id,
        problems = item.problems.len(),
        students = entries.len(),
        "Item grades resolved"
    );

    ItemGrades { item, entries }
}

/// Restricts an entry to the item's problems and recomputes its totals.
fn enrich_entry(
    mut entry: StudentGradeEntry,
    problems: &[ProblemRef],
    total_points: i64,
) -> StudentGradeEntry {
    let mut graded = BTreeMap::new();

    for problem in problems {
        if let Some(mut grade) = entry.problem_grades.remove(&problem.problem_id) {
            grade.points = problem.effective_points();
            if grade.problem_title.is_none() {
                grade.problem_title = Some(problem.problem_title.clone());
            }
            graded.insert(problem.problem_id, grade);
        }
    }

    entry.total_score = graded.values().filter_map(|g| g.score).sum();
    entry.total_points = total_points;
    entry.problem_grades = graded;
    entry
}

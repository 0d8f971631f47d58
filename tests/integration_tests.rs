use anyhow::{Result, anyhow};
use section_grades::grades::GradeAggregator;
use section_grades::grades::query::{SortKey, StudentQuery};
use section_grades::grades::types::{
    AcceptedCode, BulkGrade, GradableItem, GradeUpdate, ProblemGrade, ProblemRef,
    StudentGradeEntry,
};
use section_grades::output::{GradeTable, to_csv};
use section_grades::services::GradeSource;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Backend {
    assignment_grades: HashMap<i64, Vec<StudentGradeEntry>>,
    quiz_grades: HashMap<i64, Vec<StudentGradeEntry>>,
    problems: HashMap<i64, Vec<ProblemRef>>,
}

#[async_trait::async_trait]
impl GradeSource for Backend {
    async fn get_assignment_grades(&self, _: i64, id: i64) -> Result<Vec<StudentGradeEntry>> {
        self.assignment_grades
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found"))
    }

    async fn get_quiz_grades(&self, _: i64, id: i64) -> Result<Vec<StudentGradeEntry>> {
        Ok(self.quiz_grades.get(&id).cloned().unwrap_or_default())
    }

    async fn get_assignment_problems(&self, _: i64, id: i64) -> Result<Vec<ProblemRef>> {
        Ok(self.problems.get(&id).cloned().unwrap_or_default())
    }

    async fn save_grade(&self, _: i64, _: i64, _: &GradeUpdate) -> Result<()> {
        Ok(())
    }

    async fn save_bulk_grades(&self, _: i64, _: i64, _: &[BulkGrade]) -> Result<()> {
        Ok(())
    }

    async fn get_student_accepted_code(&self, _: i64, _: i64, _: i64, _: i64) -> Result<AcceptedCode> {
        Err(anyhow!("404 Not Found"))
    }
}

fn student(user_id: i64, name: &str, id: &str, grades: &[(i64, Option<i64>)]) -> StudentGradeEntry {
    StudentGradeEntry {
        user_id,
        student_name: name.to_string(),
        student_id: id.to_string(),
        total_score: 0,
        total_points: 0,
        problem_grades: grades
            .iter()
            .map(|(pid, score)| {
                (
                    *pid,
                    ProblemGrade {
                        score: *score,
                        submitted: score.is_some(),
                        ..Default::default()
                    },
                )
            })
            .collect::<BTreeMap<_, _>>(),
    }
}

fn backend() -> Backend {
    let mut backend = Backend::default();
    backend.problems.insert(
        1,
        vec![ProblemRef {
            problem_id: 101,
            problem_title: "P1".into(),
            points: Some(10),
        }],
    );
    backend
        .assignment_grades
        .insert(1, vec![student(1, "홍길동", "2021000", &[(101, Some(8))])]);
    backend
}

#[tokio::test]
async fn test_course_export_pipeline() {
    let aggregator = GradeAggregator::new(Arc::new(backend()), 3);

    let matrix = aggregator
        .build_course_matrix(&[GradableItem::assignment(1, "HW1")], &[])
        .await;
    let csv = to_csv(GradeTable::Course(&matrix), &StudentQuery::default());

    assert_eq!(
        csv,
        "\u{FEFF}학생명,학번,HW1 - P1 (10점),HW1 총점,전체 총점,전체 비율(%)\n\
         \"홍길동\",\"2021000\",8,8 / 10,8 / 10,80.0"
    );
}

#[tokio::test]
async fn test_course_export_merges_quiz_and_skips_broken_items() {
    let mut backend = backend();
    backend.quiz_grades.insert(
        5,
        vec![
            student(2, "Lee", "2021002", &[(501, Some(1)), (502, None)]),
            student(1, "홍길동", "2021000", &[(501, Some(1)), (502, Some(1))]),
        ],
    );
    let aggregator = GradeAggregator::new(Arc::new(backend), 3).with_concurrency(2);

    let matrix = aggregator
        .build_course_matrix(
            &[GradableItem::assignment(1, "HW1"), GradableItem::assignment(404, "Gone")],
            &[GradableItem::quiz(5, "Quiz")],
        )
        .await;

    assert_eq!(matrix.items.len(), 2);
    assert_eq!(matrix.students.len(), 2);

    let query = StudentQuery {
        search: None,
        sort: SortKey::Total,
    };
    let csv = to_csv(GradeTable::Course(&matrix), &query);
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(
        lines[0],
        "\u{FEFF}학생명,학번,HW1 - P1 (10점),HW1 총점,Quiz - 문제 501 (1점),Quiz - 문제 502 (1점),Quiz 총점,전체 총점,전체 비율(%)"
    );
    assert_eq!(lines[1], "\"홍길동\",\"2021000\",8,8 / 10,1,1,2 / 2,10 / 12,83.3");
    assert_eq!(lines[2], "\"Lee\",\"2021002\",,0 / 10,1,,1 / 2,1 / 12,8.3");
}

#[tokio::test]
async fn test_item_export_with_search() {
    let mut backend = backend();
    backend
        .assignment_grades
        .get_mut(&1)
        .unwrap()
        .push(student(2, "Lee", "2021002", &[(101, None)]));
    let aggregator = GradeAggregator::new(Arc::new(backend), 3);

    let grades = aggregator
        .fetch_item_grades(&GradableItem::assignment(1, "HW1"))
        .await;
    let query = StudentQuery {
        search: Some("lee".into()),
        sort: SortKey::None,
    };
    let csv = to_csv(
        GradeTable::Item {
            item: &grades.item,
            entries: &grades.entries,
        },
        &query,
    );

    assert_eq!(
        csv,
        "\u{FEFF}학생명,학번,P1 (10점),총점,비율(%)\n\"Lee\",\"2021002\",,0,0.0"
    );
}

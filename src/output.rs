//! CSV export of grade tables and CSV input for bulk writes.
//!
//! Exports start with a UTF-8 BOM so spreadsheet tools detect the encoding
//! of non-ASCII student names. Text cells are always quoted; numeric cells
//! never are. Ungraded problems render as an empty cell, never `0`.
//!
//! Rows are assembled by hand instead of through `csv::Writer`: the layout
//! quotes text cells but leaves headers and `score / points` cells bare,
//! which no single `QuoteStyle` produces. Input files go through `csv::Reader`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::grades::query::StudentQuery;
use crate::grades::types::{
    BulkGrade, CourseGradeMatrix, GradableItem, StudentCourseRow, StudentGradeEntry,
};

pub const BOM: &str = "\u{FEFF}";
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8";

/// What a CSV export is built from.
pub enum GradeTable<'a> {
    /// Every item of the section, one column per problem plus item totals.
    Course(&'a CourseGradeMatrix),
    /// A single item, one column per problem.
    Item {
        item: &'a GradableItem,
        entries: &'a [StudentGradeEntry],
    },
}

/// Serializes a table, keeping only rows the query matches, in query order.
pub fn to_csv(table: GradeTable<'_>, query: &StudentQuery) -> String {
    match table {
        GradeTable::Course(matrix) => course_csv(matrix, query.apply(&matrix.students)),
        GradeTable::Item { item, entries } => item_csv(item, query.apply(entries)),
    }
}

pub fn course_csv<'a>(
    matrix: &CourseGradeMatrix,
    rows: impl IntoIterator<Item = &'a StudentCourseRow>,
) -> String {
    let mut header = vec!["학생명".to_string(), "학번".to_string()];
    for item in &matrix.items {
        for p in &item.problems {
            header.push(header_cell(&format!(
                "{} - {} ({}점)",
                item.title,
                p.problem_title,
                p.effective_points()
            )));
        }
        header.push(header_cell(&format!("{} 총점", item.title)));
    }
    header.push("전체 총점".to_string());
    header.push("전체 비율(%)".to_string());

    let course_points = matrix.course_total_points();
    let mut lines = vec![header.join(",")];

    for row in rows {
        let mut cells = vec![text_cell(&row.student_name), text_cell(&row.student_id)];

        for item in &matrix.items {
            let summary = row.summary(item);
            for p in &item.problems {
                cells.push(score_cell(
                    summary
                        .and_then(|s| s.problems.get(&p.problem_id))
                        .and_then(|g| g.score),
                ));
            }
            let item_score = summary.map(|s| s.total_score).unwrap_or(0);
            cells.push(format!("{} / {}", item_score, item.total_points()));
        }

        cells.push(format!("{} / {}", row.course_total_score(), course_points));
        cells.push(matrix.course_ratio(row));
        lines.push(cells.join(","));
    }

    debug!(rows = lines.len() - 1, columns = header.len(), "Course CSV rendered");
    format!("{BOM}{}", lines.join("\n"))
}

pub fn item_csv<'a>(
    item: &GradableItem,
    rows: impl IntoIterator<Item = &'a StudentGradeEntry>,
) -> String {
    let mut header = vec!["학생명".to_string(), "학번".to_string()];
    for p in &item.problems {
        header.push(header_cell(&format!(
            "{} ({}점)",
            p.problem_title,
            p.effective_points()
        )));
    }
    header.push("총점".to_string());
    header.push("비율(%)".to_string());

    let mut lines = vec![header.join(",")];

    for entry in rows {
        let mut cells = vec![text_cell(&entry.student_name), text_cell(&entry.student_id)];
        for p in &item.problems {
            cells.push(score_cell(entry.score_for(p.problem_id)));
        }
        cells.push(entry.total_score.to_string());
        cells.push(entry.ratio());
        lines.push(cells.join(","));
    }

    debug!(item_id = item.id, rows = lines.len() - 1, "Item CSV rendered");
    format!("{BOM}{}", lines.join("\n"))
}

fn text_cell(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn header_cell(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        text_cell(s)
    } else {
        s.to_string()
    }
}

fn score_cell(score: Option<i64>) -> String {
    score.map(|s| s.to_string()).unwrap_or_default()
}

/// `<title>_성적_<date>.csv`
pub fn item_export_filename(title: &str, date: NaiveDate) -> String {
    format!("{}_성적_{}.csv", sanitize(title), date.format("%Y-%m-%d"))
}

/// `<course>_<section>분반_전체성적_<date>.csv`
pub fn course_export_filename(course_title: &str, section_number: i64, date: NaiveDate) -> String {
    format!(
        "{}_{}분반_전체성적_{}.csv",
        sanitize(course_title),
        section_number,
        date.format("%Y-%m-%d")
    )
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Writes an export into `dir`, creating it if needed. Returns the file path.
pub fn write_export(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), bytes = contents.len(), "Export written");
    Ok(path)
}

#[derive(Debug, Deserialize)]
struct GradeRow {
    user_id: i64,
    problem_id: i64,
    score: i64,
}

#[derive(Debug, Deserialize)]
struct PointsRow {
    item_id: i64,
    problem_id: i64,
    points: i64,
}

/// Reads `user_id,problem_id,score` rows.
pub fn read_bulk_grades<R: Read>(reader: R) -> Result<Vec<BulkGrade>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut grades = Vec::new();

    for result in rdr.deserialize() {
        let row: GradeRow = result.context("invalid grade row")?;
        grades.push(BulkGrade {
            user_id: row.user_id,
            problem_id: row.problem_id,
            score: row.score,
        });
    }

    Ok(grades)
}

/// Reads `item_id,problem_id,points` rows grouped by item.
pub fn read_points_table<R: Read>(reader: R) -> Result<BTreeMap<i64, BTreeMap<i64, i64>>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut table: BTreeMap<i64, BTreeMap<i64, i64>> = BTreeMap::new();

    for result in rdr.deserialize() {
        let row: PointsRow = result.context("invalid points row")?;
        table
            .entry(row.item_id)
            .or_default()
            .insert(row.problem_id, row.points);
    }

    Ok(table)
}

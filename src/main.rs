//! CLI entry point for the section grade tool.
//!
//! Provides subcommands for listing a section's gradable items, exporting
//! single-item and course-wide grade CSVs, and editing grades and problem
//! point weights on the course backend.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use section_grades::config::Config;
use section_grades::fetch::auth::BearerToken;
use section_grades::fetch::{BasicClient, HttpClient};
use section_grades::grades::query::{SortKey, StudentQuery};
use section_grades::grades::stats::item_statistics;
use section_grades::grades::types::{GradableItem, GradeUpdate};
use section_grades::grades::workflow::{PointsEditor, save_bulk_grades, save_course_points, save_grade};
use section_grades::grades::GradeAggregator;
use section_grades::infra::rest::RestGradeSource;
use section_grades::output::{
    GradeTable, course_export_filename, item_export_filename, read_bulk_grades,
    read_points_table, to_csv, write_export,
};
use section_grades::services::{GradeSource, SectionCatalog};
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type Backend = RestGradeSource<Box<dyn HttpClient>>;

#[derive(Parser)]
#[command(name = "section_grades")]
#[command(about = "Aggregate, export and edit section grades", long_about = None)]
struct Cli {
    /// Section id on the course backend
    #[arg(short, long)]
    section: i64,

    /// Maximum number of concurrent item fetches (overrides GRADES_FETCH_CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ItemArgs {
    /// Assignment id
    #[arg(long)]
    assignment: Option<i64>,

    /// Quiz (coding test) id
    #[arg(long)]
    quiz: Option<i64>,
}

#[derive(Args)]
struct TableArgs {
    /// Directory to write the CSV into
    #[arg(short, long, default_value = "exports")]
    output_dir: PathBuf,

    /// Only export students whose name or student id contains this text
    #[arg(long)]
    search: Option<String>,

    /// Row order of the export
    #[arg(long, value_enum, default_value_t = SortKey::None)]
    sort: SortKey,
}

impl TableArgs {
    fn query(&self) -> StudentQuery {
        StudentQuery {
            search: self.search.clone(),
            sort: self.sort,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the assignments and quizzes of the section
    ListItems,
    /// Export the grades of one assignment or quiz
    ExportItem {
        #[command(flatten)]
        item: ItemArgs,

        #[command(flatten)]
        table: TableArgs,
    },
    /// Export every assignment and quiz of the section in one CSV
    ExportCourse {
        #[command(flatten)]
        table: TableArgs,
    },
    /// Change problem point weights of one assignment (e.g. --points 101=10)
    SetPoints {
        #[arg(long)]
        assignment: i64,

        /// PROBLEM_ID=POINTS pairs
        #[arg(long = "points", value_parser = parse_points_edit, required = true)]
        points: Vec<(i64, String)>,
    },
    /// Change point weights of several items from a CSV (item_id,problem_id,points)
    ImportPoints {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Save grades of one assignment from a CSV (user_id,problem_id,score)
    ImportGrades {
        #[arg(long)]
        assignment: i64,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Save a single grade
    Grade {
        #[arg(long)]
        assignment: i64,
        #[arg(long)]
        user: i64,
        #[arg(long)]
        problem: i64,
        #[arg(long)]
        score: i64,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Print a student's accepted code for a problem
    AcceptedCode {
        #[arg(long)]
        assignment: i64,
        #[arg(long)]
        user: i64,
        #[arg(long)]
        problem: i64,
    },
}

fn parse_points_edit(raw: &str) -> Result<(i64, String), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PROBLEM_ID=POINTS, got {raw}"))?;
    let id = id
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid problem id {id}: {e}"))?;
    Ok((id, value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/section_grades.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("section_grades.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let concurrency = cli.concurrency.unwrap_or(config.fetch_concurrency);
    let backend = Arc::new(build_backend(&config)?);
    let section = cli.section;

    match cli.command {
        Commands::ListItems => {
            let assignments = backend.list_assignments(section).await?;
            let quizzes = backend.list_quizzes(section).await?;

            for item in assignments.iter().chain(&quizzes) {
                info!(
                    item_id = item.id,
                    kind = item.kind.as_str(),
                    title = %item.title,
                    "Item"
                );
            }

            info!(
                assignments = assignments.len(),
                quizzes = quizzes.len(),
                "Item list summary"
            );
        }
        Commands::ExportItem { item, table } => {
            let item = resolve_item(backend.as_ref(), section, &item).await?;
            let aggregator = GradeAggregator::new(backend.clone(), section);
            let grades = aggregator.fetch_item_grades(&item).await;

            let stats = item_statistics(&grades.entries);
            info!(
                item_id = grades.item.id,
                students = stats.student_count,
                submitted = stats.submitted_count,
                mean = stats.mean_score,
                stddev = stats.stddev_score,
                min = ?stats.min_score,
                max = ?stats.max_score,
                mean_ratio = stats.mean_ratio,
                "Item statistics"
            );

            let csv = to_csv(
                GradeTable::Item {
                    item: &grades.item,
                    entries: &grades.entries,
                },
                &table.query(),
            );
            let file_name = item_export_filename(&grades.item.title, Utc::now().date_naive());
            write_export(&table.output_dir, &file_name, &csv)?;
        }
        Commands::ExportCourse { table } => {
            let section_info = backend.get_section(section).await?;
            let assignments = backend.list_assignments(section).await?;
            let quizzes = backend.list_quizzes(section).await?;

            let aggregator =
                GradeAggregator::new(backend.clone(), section).with_concurrency(concurrency);
            let matrix = aggregator.build_course_matrix(&assignments, &quizzes).await;

            if matrix.items.is_empty() {
                warn!("No gradable item has problems; the export only has name columns");
            }

            let csv = to_csv(GradeTable::Course(&matrix), &table.query());
            let file_name = course_export_filename(
                &section_info.course_title,
                section_info.section_number,
                Utc::now().date_naive(),
            );
            write_export(&table.output_dir, &file_name, &csv)?;
        }
        Commands::SetPoints { assignment, points } => {
            let selected = ItemArgs {
                assignment: Some(assignment),
                quiz: None,
            };
            let item = resolve_item(backend.as_ref(), section, &selected).await?;
            let mut editor = PointsEditor::new(section);

            editor.open(backend.as_ref(), &item).await?;
            for (problem_id, value) in points {
                editor.set_input(problem_id, value)?;
            }
            let saved = editor.save(backend.as_ref()).await?;

            info!(item_id = item.id, points = ?saved, "배점이 저장되었습니다");
        }
        Commands::ImportPoints { file } => {
            let reader =
                File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let table = read_points_table(reader)?;
            for (item_id, points) in &table {
                if let Some((problem_id, _)) = points.iter().find(|(_, v)| **v < 0) {
                    bail!("negative points for item {item_id} problem {problem_id}");
                }
            }

            let report = save_course_points(backend.clone(), section, table).await;
            if report.failed > 0 {
                for (item_id, message) in &report.failures {
                    warn!(item_id, error = %message, "Item points not saved");
                }
            }
            info!("{}", report);
        }
        Commands::ImportGrades { assignment, file } => {
            let reader =
                File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let grades = read_bulk_grades(reader)?;
            if grades.is_empty() {
                bail!("{} has no grade rows", file.display());
            }

            save_bulk_grades(backend.as_ref(), section, assignment, &grades).await?;
        }
        Commands::Grade {
            assignment,
            user,
            problem,
            score,
            comment,
        } => {
            let update = GradeUpdate {
                user_id: user,
                problem_id: problem,
                score,
                comment,
            };
            save_grade(backend.as_ref(), section, assignment, &update).await?;
        }
        Commands::AcceptedCode {
            assignment,
            user,
            problem,
        } => {
            let code = backend
                .get_student_accepted_code(section, assignment, user, problem)
                .await?;

            info!(
                language = %code.language,
                submitted_at = ?code.submitted_at,
                result = ?code.result,
                "Accepted code"
            );
            println!("{}", code.code);
        }
    }

    Ok(())
}

fn build_backend(config: &Config) -> Result<Backend> {
    let basic = BasicClient::with_timeout(config.http_timeout)?;
    let client: Box<dyn HttpClient> = match &config.api_token {
        Some(token) => Box::new(BearerToken::new(basic, token)?),
        None => Box::new(basic),
    };
    Ok(RestGradeSource::new(client, config.api_base_url.clone()))
}

/// Looks the selected item up in the section listing to get its title.
async fn resolve_item(backend: &Backend, section: i64, args: &ItemArgs) -> Result<GradableItem> {
    let (id, items) = match (args.assignment, args.quiz) {
        (Some(id), _) => (id, backend.list_assignments(section).await?),
        (None, Some(id)) => (id, backend.list_quizzes(section).await?),
        (None, None) => bail!("either --assignment or --quiz is required"),
    };

    items
        .into_iter()
        .find(|i| i.id == id)
        .with_context(|| format!("item {id} not found in section {section}"))
}

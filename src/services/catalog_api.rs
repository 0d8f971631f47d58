//! Trait for discovering the gradable items of a section.

use anyhow::Result;

use crate::grades::types::{GradableItem, SectionInfo};

/// Abstraction over the section listing endpoints of the course backend.
///
/// Items come back without problems; the aggregator resolves problem lists
/// per item when it fetches grades.
#[async_trait::async_trait]
pub trait SectionCatalog: Send + Sync {
    async fn get_section(&self, section_id: i64) -> Result<SectionInfo>;

    async fn list_assignments(&self, section_id: i64) -> Result<Vec<GradableItem>>;

    async fn list_quizzes(&self, section_id: i64) -> Result<Vec<GradableItem>>;
}

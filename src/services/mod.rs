//! Collaborator contracts the aggregation code depends on.

pub mod catalog_api;
pub mod grade_api;

pub use catalog_api::SectionCatalog;
pub use grade_api::{GradeSource, PointsStore};

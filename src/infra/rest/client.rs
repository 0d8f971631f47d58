use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use std::collections::BTreeMap;
use tracing::debug;

use super::wire::{BulkGradesBody, Listing, ProblemPointsBody, Single, WireGradeEntry, WireItem};
use crate::fetch::{HttpClient, get_json, send_json};
use crate::grades::types::{
    AcceptedCode, BulkGrade, GradableItem, GradeUpdate, ItemKind, ProblemRef, SectionInfo,
    StudentGradeEntry,
};
use crate::services::{GradeSource, PointsStore, SectionCatalog};

/// Course backend reached over its REST API.
pub struct RestGradeSource<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> RestGradeSource<C> {
    pub fn new(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn section_url(&self, section_id: i64, path: &str) -> String {
        format!("{}/api/sections/{}{}", self.base_url, section_id, path)
    }

    async fn grade_entries(&self, url: &str) -> Result<Vec<StudentGradeEntry>> {
        let listing: Listing<WireGradeEntry> = get_json(&self.client, url).await?;
        let entries: Vec<StudentGradeEntry> =
            listing.into_vec().into_iter().map(Into::into).collect();

        debug!(url, entries = entries.len(), "Grade entries fetched");
        Ok(entries)
    }

    async fn items(&self, url: &str, kind: ItemKind) -> Result<Vec<GradableItem>> {
        let listing: Listing<WireItem> = get_json(&self.client, url).await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(|w| w.into_item(kind))
            .collect())
    }
}

#[async_trait]
impl<C: HttpClient> GradeSource for RestGradeSource<C> {
    async fn get_assignment_grades(
        &self,
        section_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<StudentGradeEntry>> {
        let url = self.section_url(section_id, &format!("/assignments/{assignment_id}/grades"));
        self.grade_entries(&url).await
    }

    async fn get_quiz_grades(&self, section_id: i64, quiz_id: i64) -> Result<Vec<StudentGradeEntry>> {
        let url = self.section_url(section_id, &format!("/quizzes/{quiz_id}/grades"));
        self.grade_entries(&url).await
    }

    async fn get_assignment_problems(
        &self,
        section_id: i64,
        assignment_id: i64,
    ) -> Result<Vec<ProblemRef>> {
        let url = self.section_url(section_id, &format!("/assignments/{assignment_id}/problems"));
        let listing: Listing<ProblemRef> = get_json(&self.client, &url).await?;
        Ok(listing.into_vec())
    }

    async fn save_grade(
        &self,
        section_id: i64,
        assignment_id: i64,
        update: &GradeUpdate,
    ) -> Result<()> {
        let url = self.section_url(section_id, &format!("/assignments/{assignment_id}/grades"));
        send_json(&self.client, Method::POST, &url, update).await
    }

    async fn save_bulk_grades(
        &self,
        section_id: i64,
        assignment_id: i64,
        grades: &[BulkGrade],
    ) -> Result<()> {
        let url = self.section_url(
            section_id,
            &format!("/assignments/{assignment_id}/grades/bulk"),
        );
        send_json(&self.client, Method::POST, &url, &BulkGradesBody { grades }).await
    }

    async fn get_student_accepted_code(
        &self,
        section_id: i64,
        assignment_id: i64,
        user_id: i64,
        problem_id: i64,
    ) -> Result<AcceptedCode> {
        let url = self.section_url(
            section_id,
            &format!(
                "/assignments/{assignment_id}/students/{user_id}/problems/{problem_id}/accepted-code"
            ),
        );
        let code: Single<AcceptedCode> = get_json(&self.client, &url).await?;
        Ok(code.into_inner())
    }
}

#[async_trait]
impl<C: HttpClient> PointsStore for RestGradeSource<C> {
    async fn set_bulk_problem_points(
        &self,
        section_id: i64,
        assignment_id: i64,
        problem_points: &BTreeMap<i64, i64>,
    ) -> Result<()> {
        let url = self.section_url(
            section_id,
            &format!("/assignments/{assignment_id}/problems/points"),
        );
        send_json(
            &self.client,
            Method::PUT,
            &url,
            &ProblemPointsBody { problem_points },
        )
        .await
    }
}

#[async_trait]
impl<C: HttpClient> SectionCatalog for RestGradeSource<C> {
    async fn get_section(&self, section_id: i64) -> Result<SectionInfo> {
        let section: Single<SectionInfo> =
            get_json(&self.client, &self.section_url(section_id, "")).await?;
        Ok(section.into_inner())
    }

    async fn list_assignments(&self, section_id: i64) -> Result<Vec<GradableItem>> {
        self.items(&self.section_url(section_id, "/assignments"), ItemKind::Assignment)
            .await
    }

    async fn list_quizzes(&self, section_id: i64) -> Result<Vec<GradableItem>> {
        self.items(&self.section_url(section_id, "/quizzes"), ItemKind::Quiz)
            .await
    }
}

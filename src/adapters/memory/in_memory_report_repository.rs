//! In-memory diagnosis report repository.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::assessment::{DiagnosisReport, ElementId};
use crate::domain::foundation::{DomainError, ReportId, Timestamp, UserId};
use crate::ports::ReportRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryReportRepository {
    reports: Arc<RwLock<Vec<DiagnosisReport>>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn save_report(
        &self,
        user_id: &UserId,
        element_id: ElementId,
        report: &str,
        predicted_label: Option<&str>,
    ) -> Result<ReportId, DomainError> {
        let id = ReportId::new();
        self.reports.write().await.push(DiagnosisReport {
            id,
            user_id: user_id.clone(),
            element_id,
            report: report.to_string(),
            predicted_label: predicted_label.map(str::to_string),
            created_at: Timestamp::now(),
        });
        Ok(id)
    }

    async fn find_reports_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DiagnosisReport>, DomainError> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .rev()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }
}

//! Report repository port - saved diagnosis reports per user and element.

use crate::domain::assessment::{DiagnosisReport, ElementId};
use crate::domain::foundation::{DomainError, ReportId, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn save_report(
        &self,
        user_id: &UserId,
        element_id: ElementId,
        report: &str,
        predicted_label: Option<&str>,
    ) -> Result<ReportId, DomainError>;

    /// All reports of the user, newest first.
    async fn find_reports_by_user(&self, user_id: &UserId)
        -> Result<Vec<DiagnosisReport>, DomainError>;
}

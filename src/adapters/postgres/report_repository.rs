//! PostgreSQL implementation of ReportRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::schema::get_or_create_user;
use crate::domain::assessment::{DiagnosisReport, ElementId};
use crate::domain::foundation::{DomainError, ReportId, Timestamp, UserId};
use crate::ports::ReportRepository;

type ReportRow = (
    uuid::Uuid,
    i32,
    String,
    Option<String>,
    chrono::DateTime<chrono::Utc>,
);

#[derive(Clone)]
pub struct PostgresReportRepository {
    pool: PgPool,
}

impl PostgresReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PostgresReportRepository {
    async fn save_report(
        &self,
        user_id: &UserId,
        element_id: ElementId,
        report: &str,
        predicted_label: Option<&str>,
    ) -> Result<ReportId, DomainError> {
        let user_uuid = get_or_create_user(&self.pool, user_id.as_str()).await?;
        let id = ReportId::new();

        sqlx::query(
            r#"
            INSERT INTO diagnosis_reports (id, user_id, element_id, report, predicted_label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_uuid)
        .bind(element_id.value() as i32)
        .bind(report)
        .bind(predicted_label)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert report: {}", e)))?;

        Ok(id)
    }

    async fn find_reports_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DiagnosisReport>, DomainError> {
        let rows: Vec<ReportRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.element_id, r.report, r.predicted_label, r.created_at
            FROM diagnosis_reports r
            JOIN users u ON u.id = r.user_id
            WHERE u.external_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch reports: {}", e)))?;

        rows.into_iter()
            .map(|(id, element_id, report, predicted_label, created_at)| {
                let element_id = ElementId::new(element_id.max(0) as u32)
                    .map_err(|e| DomainError::database(format!("Invalid element_id: {}", e)))?;
                Ok(DiagnosisReport {
                    id: ReportId::from_uuid(id),
                    user_id: user_id.clone(),
                    element_id,
                    report,
                    predicted_label,
                    created_at: Timestamp::from_datetime(created_at),
                })
            })
            .collect()
    }
}

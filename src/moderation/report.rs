//! Post reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::{AgoraError, Result};

/// Lifecycle of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Open => "open",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(ReportStatus::Open),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(format!("unknown report status: {s}")),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user report about a post.
#[derive(Debug, Clone)]
pub struct Report {
    pub id: i64,
    pub post_id: i64,
    /// Thread of the reported post.
    pub thread_id: i64,
    /// Community of the reported post.
    pub community_id: i64,
    pub reporter_id: i64,
    pub reporter_username: String,
    pub reason: String,
    pub status: ReportStatus,
    /// Moderator who resolved or dismissed the report.
    pub handled_by: Option<i64>,
    pub handled_at: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: i64,
    post_id: i64,
    thread_id: i64,
    community_id: i64,
    reporter_id: i64,
    reporter_username: String,
    reason: String,
    status: String,
    handled_by: Option<i64>,
    handled_at: Option<String>,
    created_at: String,
}

impl ReportRow {
    fn into_report(self) -> Report {
        Report {
            id: self.id,
            post_id: self.post_id,
            thread_id: self.thread_id,
            community_id: self.community_id,
            reporter_id: self.reporter_id,
            reporter_username: self.reporter_username,
            reason: self.reason,
            status: self.status.parse().unwrap_or(ReportStatus::Open),
            handled_by: self.handled_by,
            handled_at: self.handled_at,
            created_at: self.created_at,
        }
    }
}

const REPORT_SELECT: &str = "SELECT r.id, r.post_id, p.thread_id, b.community_id, r.reporter_id,
        u.username AS reporter_username, r.reason, r.status, r.handled_by, r.handled_at,
        r.created_at
     FROM reports r
     JOIN posts p ON p.id = r.post_id
     JOIN threads t ON t.id = p.thread_id
     JOIN boards b ON b.id = t.board_id
     JOIN users u ON u.id = r.reporter_id";

/// Repository for reports.
pub struct ReportRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ReportRepository<'a> {
    /// Create a new ReportRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// File a report. A user may have only one open report per post; the
    /// `idx_reports_one_open` index enforces it.
    pub async fn create(&self, post_id: i64, reporter_id: i64, reason: &str) -> Result<Report> {
        let inserted = sqlx::query_scalar(
            "INSERT INTO reports (post_id, reporter_id, reason) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(post_id)
        .bind(reporter_id)
        .bind(reason)
        .fetch_one(self.pool)
        .await;

        let id: i64 = match inserted {
            Ok(id) => id,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AgoraError::Conflict(
                    "you already have an open report for this post".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AgoraError::NotFound("report".to_string()))
    }

    /// Get a report by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Report>> {
        let sql = format!("{REPORT_SELECT} WHERE r.id = ?");
        let row: Option<ReportRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(ReportRow::into_report))
    }

    /// List reports of a community, newest first, optionally by status.
    pub async fn list_by_community(
        &self,
        community_id: i64,
        status: Option<ReportStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Report>> {
        let sql = format!(
            "{REPORT_SELECT} WHERE b.community_id = ? AND (? IS NULL OR r.status = ?)
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT ? OFFSET ?"
        );
        let status = status.map(|s| s.as_str());
        let rows: Vec<ReportRow> = sqlx::query_as(&sql)
            .bind(community_id)
            .bind(status)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(ReportRow::into_report).collect())
    }

    /// Count reports of a community, optionally by status.
    pub async fn count_by_community(
        &self,
        community_id: i64,
        status: Option<ReportStatus>,
    ) -> Result<i64> {
        let status = status.map(|s| s.as_str());
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports r
             JOIN posts p ON p.id = r.post_id
             JOIN threads t ON t.id = p.thread_id
             JOIN boards b ON b.id = t.board_id
             WHERE b.community_id = ? AND (? IS NULL OR r.status = ?)",
        )
        .bind(community_id)
        .bind(status)
        .bind(status)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Close an open report. Returns false if it was missing or already closed.
    pub async fn close(&self, id: i64, status: ReportStatus, handled_by: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE reports SET status = ?, handled_by = ?, handled_at = datetime('now')
             WHERE id = ? AND status = 'open'",
        )
        .bind(status.as_str())
        .bind(handled_by)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

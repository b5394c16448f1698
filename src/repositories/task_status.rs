use sqlx::{PgPool, Row};

use super::TaskStatusStore;
use crate::{error::AppResult, models::TaskStatusRecord};

/// Postgres 任务状态库（scheduler 的 task_checks 表）
#[derive(Debug, Clone)]
pub struct PgTaskStatusStore {
    pool: PgPool,
}

impl PgTaskStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TaskStatusStore for PgTaskStatusStore {
    async fn latest_status(&self, task_id: i64) -> AppResult<Option<TaskStatusRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, task_id, status, comment, check_time
            FROM task_checks
            WHERE task_id = $1
            ORDER BY check_time DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(TaskStatusRecord {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            status: row.try_get("status")?,
            comment: row.try_get("comment")?,
            check_time: row.try_get("check_time")?,
        }))
    }
}

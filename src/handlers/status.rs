use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    handlers::AppState,
    response::ApiResponse,
    services::SyncSummary,
};

/// 任务最新执行状态
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskStatusResponse {
    pub task_id: i64,
    /// 库中保存的原始状态
    pub status: String,
    pub comment: String,
    pub check_time: DateTime<Utc>,
    /// 对应的 Nagios 返回码，状态无法映射时为空
    pub nagios_code: Option<i16>,
}

#[utoipa::path(
    post,
    path = "/nagios/refresh-status",
    responses(
        (status = 200, description = "备份状态已推送到Nagios", body = SyncSummary),
        (status = 502, description = "无法连接Nagios或发送失败"),
        (status = 500, description = "任务状态无法映射")
    ),
    tag = "Nagios"
)]
pub async fn refresh_status(
    State(app_state): State<AppState>,
) -> AppResult<Json<ApiResponse<SyncSummary>>> {
    let summary = app_state.syncer.sync_statuses().await?;
    Ok(Json(ApiResponse::success_with_message(
        summary,
        "Nagios 状态已更新".to_string(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}/status",
    params(
        ("id" = i64, Path, description = "备份任务ID")
    ),
    responses(
        (status = 200, description = "获取成功", body = TaskStatusResponse),
        (status = 404, description = "任务没有执行记录")
    ),
    tag = "Nagios"
)]
pub async fn get_task_status(
    State(app_state): State<AppState>,
    Path(task_id): Path<i64>,
) -> AppResult<Json<ApiResponse<TaskStatusResponse>>> {
    let record = app_state
        .task_statuses
        .latest_status(task_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("任务 {} 的执行记录", task_id)))?;

    let nagios_code = record.nagios_state().ok().map(|state| state.code());
    Ok(Json(ApiResponse::success(TaskStatusResponse {
        task_id: record.task_id,
        status: record.status,
        comment: record.comment,
        check_time: record.check_time,
        nagios_code,
    })))
}

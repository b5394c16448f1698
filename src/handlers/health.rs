use axum::{extract::State, response::Json};
use std::collections::HashMap;

use crate::{
    handlers::AppState,
    response::{ApiResponse, ResponseCode},
};

/// 健康检查处理器
pub async fn health_check() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(serde_json::json!({"status": "ok"})))
}

/// 数据库健康检查处理器
pub async fn db_health_check(
    State(app_state): State<AppState>,
) -> Json<ApiResponse<serde_json::Value>> {
    match &app_state.database {
        Some(db) => match db.health_check().await {
            Ok(true) => {
                let timestamp = chrono::Utc::now().to_rfc3339();
                let mut details = HashMap::new();
                details.insert("database", "healthy");
                details.insert("timestamp", timestamp.as_str());
                Json(ApiResponse::success(serde_json::json!(details)))
            }
            Ok(false) => Json(ApiResponse::error_with_data(
                ResponseCode::UNAVAILABLE,
                "数据库连接异常".to_string(),
                serde_json::json!({"status": "unhealthy"}),
            )),
            Err(e) => {
                tracing::error!("数据库健康检查失败: {}", e);
                Json(ApiResponse::error_with_data(
                    ResponseCode::UNAVAILABLE,
                    format!("数据库健康检查失败: {}", e),
                    serde_json::json!({"status": "error"}),
                ))
            }
        },
        None => Json(ApiResponse::error_with_data(
            ResponseCode::UNAVAILABLE,
            "数据库未配置或连接失败".to_string(),
            serde_json::json!({"status": "unavailable"}),
        )),
    }
}

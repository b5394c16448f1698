use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{error::AppResult, handlers::AppState};

/// 配置文件下载参数：带 `file` 时以附件形式返回
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileQuery {
    pub file: Option<String>,
}

/// 纯文本的 Nagios 配置响应
#[derive(Debug)]
pub struct PlainTextConfig {
    body: String,
    filename: Option<String>,
}

impl PlainTextConfig {
    pub fn new(body: String, query: ConfigFileQuery) -> Self {
        Self {
            body,
            filename: query.file.as_deref().and_then(attachment_filename),
        }
    }
}

impl IntoResponse for PlainTextConfig {
    fn into_response(self) -> Response {
        let mut response = (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body,
        )
            .into_response();

        if let Some(filename) = self.filename {
            let disposition = format!("attachment; filename={}", filename);
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, value);
            }
        }
        response
    }
}

/// 文件名只保留字母数字与 `.`、`-`、`_`
fn attachment_filename(raw: &str) -> Option<String> {
    let name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let name = name.trim_start_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// hosts.cfg
pub async fn get_hosts(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_hosts().await?;
    Ok(PlainTextConfig::new(body, query))
}

/// hosts_ext_info.cfg
pub async fn get_host_ext_info(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_host_ext_info().await?;
    Ok(PlainTextConfig::new(body, query))
}

pub async fn get_check_templates(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_check_templates().await?;
    Ok(PlainTextConfig::new(body, query))
}

/// 指定名称的检查
pub async fn get_checks(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_checks(&name).await?;
    Ok(PlainTextConfig::new(body, query))
}

pub async fn get_all_checks(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_all_checks().await?;
    Ok(PlainTextConfig::new(body, query))
}

pub async fn get_backup_checks(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_backup_checks().await?;
    Ok(PlainTextConfig::new(body, query))
}

pub async fn get_hardware_checks(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_hardware_checks().await?;
    Ok(PlainTextConfig::new(body, query))
}

pub async fn get_service_checks(
    State(app_state): State<AppState>,
    Query(query): Query<ConfigFileQuery>,
) -> AppResult<PlainTextConfig> {
    let body = app_state.renderer.render_service_checks().await?;
    Ok(PlainTextConfig::new(body, query))
}

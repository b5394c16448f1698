use crate::handlers::{
    AppState, db_health_check, get_all_checks, get_backup_checks, get_check_templates,
    get_checks, get_hardware_checks, get_host_ext_info, get_hosts, get_service_checks,
    get_task_status, health_check, refresh_status,
};
use axum::{Router, routing::get};

/// 创建API路由
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .route("/api/health/db", get(db_health_check))
        // Nagios 配置文件
        .route("/nagios/hosts.cfg", get(get_hosts))
        .route("/nagios/hosts_ext_info.cfg", get(get_host_ext_info))
        .route("/nagios/check_templates.cfg", get(get_check_templates))
        .route("/nagios/checks.cfg", get(get_all_checks))
        .route("/nagios/checks/{name}", get(get_checks))
        .route("/nagios/backup_checks.cfg", get(get_backup_checks))
        .route("/nagios/hardware.cfg", get(get_hardware_checks))
        .route("/nagios/services.cfg", get(get_service_checks))
        // 备份状态同步
        .route(
            "/nagios/refresh-status",
            get(refresh_status).post(refresh_status),
        )
        .route("/api/tasks/{id}/status", get(get_task_status))
}

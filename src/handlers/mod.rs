pub mod health;
pub mod nagios_config;
pub mod status;

use std::sync::Arc;

use crate::{
    database::Database,
    repositories::TaskStatusStore,
    services::{ConfigRenderer, StatusSyncer},
};

pub use health::{db_health_check, health_check};
pub use nagios_config::{
    get_all_checks, get_backup_checks, get_check_templates, get_checks, get_hardware_checks,
    get_host_ext_info, get_hosts, get_service_checks,
};
pub use status::{get_task_status, refresh_status};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub database: Option<Database>,
    pub renderer: Arc<ConfigRenderer>,
    pub syncer: Arc<StatusSyncer>,
    pub task_statuses: Arc<dyn TaskStatusStore>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// 任务执行状态（库内取值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl TaskStatus {
    /// 解析库中保存的状态文本，大小写不敏感
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OK" => Some(TaskStatus::Ok),
            "WARNING" => Some(TaskStatus::Warning),
            "CRITICAL" => Some(TaskStatus::Critical),
            "UNKNOWN" => Some(TaskStatus::Unknown),
            _ => None,
        }
    }
}

/// Nagios 被动检查的返回码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum NagiosState {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl NagiosState {
    pub fn code(self) -> i16 {
        self as i16
    }
}

impl From<TaskStatus> for NagiosState {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Ok => NagiosState::Ok,
            TaskStatus::Warning => NagiosState::Warning,
            TaskStatus::Critical => NagiosState::Critical,
            TaskStatus::Unknown => NagiosState::Unknown,
        }
    }
}

/// 一次任务执行的结果记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct TaskStatusRecord {
    pub id: i64,
    pub task_id: i64,
    /// 原始状态文本
    pub status: String,
    pub comment: String,
    pub check_time: DateTime<Utc>,
}

impl TaskStatusRecord {
    /// 映射为 Nagios 返回码，未知状态视为配置错误
    pub fn nagios_state(&self) -> AppResult<NagiosState> {
        TaskStatus::parse(&self.status)
            .map(NagiosState::from)
            .ok_or_else(|| AppError::unmapped_status(self.task_id, self.status.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> TaskStatusRecord {
        TaskStatusRecord {
            id: 1,
            task_id: 10,
            status: status.to_string(),
            comment: String::new(),
            check_time: Utc::now(),
        }
    }

    #[test]
    fn test_status_mapping_is_fixed() {
        assert_eq!(record("OK").nagios_state().unwrap().code(), 0);
        assert_eq!(record("warning").nagios_state().unwrap().code(), 1);
        assert_eq!(record("Critical").nagios_state().unwrap().code(), 2);
        assert_eq!(record("UNKNOWN").nagios_state().unwrap().code(), 3);
    }

    #[test]
    fn test_unmapped_status() {
        let err = record("PENDING").nagios_state().unwrap_err();
        assert!(matches!(
            err,
            AppError::UnmappedStatus { task_id: 10, ref status } if status == "PENDING"
        ));
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 备份任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// 文件级备份
    File,
    /// R1Soft 块级备份
    R1Soft,
    /// TSM 磁带备份
    Tsm,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::File => "file",
            BackupKind::R1Soft => "r1soft",
            BackupKind::Tsm => "tsm",
        }
    }

    pub fn all() -> [BackupKind; 3] {
        [BackupKind::File, BackupKind::R1Soft, BackupKind::Tsm]
    }
}

impl FromStr for BackupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(BackupKind::File),
            "r1soft" => Ok(BackupKind::R1Soft),
            "tsm" => Ok(BackupKind::Tsm),
            other => Err(format!("未知的备份任务类型: {}", other)),
        }
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 备份任务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupTask {
    pub id: i64,
    pub kind: BackupKind,
    pub machine_id: i64,
    pub machine_fqdn: String,
    pub active: bool,
    pub description: String,
}

/// backup_checks.cfg 中的一条记录
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BackupCheckRecord {
    pub task_id: i64,
    pub host_name: String,
    pub description: String,
}

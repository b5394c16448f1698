use serde::{Deserialize, Serialize};

/// Nagios 检查定义，`command` 可带 `%(name)s` 占位符
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NagiosCheck {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub command: String,
}

/// 拼接完整的 check_command：参数以 `!` 分隔
pub fn full_check(command: &str, options: &str) -> String {
    let options = options.trim();
    if options.is_empty() {
        command.to_string()
    } else {
        format!("{}!{}", command, options)
    }
}

/// 机器级检查分配
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineCheck {
    pub check: NagiosCheck,
    pub machine_id: i64,
    pub machine_fqdn: String,
    pub options: String,
    pub contact_groups: Vec<String>,
}

/// 网络设备级检查分配
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceCheck {
    pub check: NagiosCheck,
    pub device_id: i64,
    pub device_name: String,
    pub options: String,
    pub contact_groups: Vec<String>,
}

/// 服务级检查：作用于服务下的全部机器
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceCheck {
    pub check: NagiosCheck,
    pub service_id: i64,
    pub options: String,
    pub contact_groups: Vec<String>,
}

/// 硬件策略：按硬件型号批量下发检查
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardwarePolicy {
    pub id: i64,
    pub check: NagiosCheck,
    pub options: String,
    pub contact_groups: Vec<String>,
    pub hw_model_ids: Vec<i64>,
    pub excluded_os_ids: Vec<i64>,
    pub excluded_ips: Vec<String>,
}

impl HardwarePolicy {
    pub fn full_check(&self) -> String {
        full_check(&self.check.command, &self.options)
    }

    pub fn is_ip_excluded(&self, ip: &str) -> bool {
        self.excluded_ips.iter().any(|excluded| excluded == ip)
    }
}

/// Nagios 服务模板（register 0）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckTemplate {
    pub name: String,
    /// 继承的上级模板
    pub base: Option<String>,
    pub check_period: Option<String>,
    pub max_check_attempts: Option<i32>,
    pub normal_check_interval: Option<i32>,
    pub retry_check_interval: Option<i32>,
    pub notification_interval: Option<i32>,
    pub notification_period: Option<String>,
    pub notification_options: Option<String>,
    pub contact_groups: Vec<String>,
}

/// 渲染后的一条检查记录（check.cfg / hardware_checks.cfg / service_checks.cfg）
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckRecord {
    pub check_name: String,
    pub description: String,
    pub host_name: String,
    pub command: String,
    pub contact_groups: Vec<String>,
}

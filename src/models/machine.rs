use serde::{Deserialize, Serialize};

/// 资产库中的机器（物理机或虚拟机）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Machine {
    pub id: i64,
    /// 完全限定域名，全局唯一
    pub fqdn: String,
    /// 是否在线
    pub up: bool,
    pub os_id: Option<i64>,
    /// 物理服务器的硬件型号
    pub hw_model_id: Option<i64>,
    /// 服务IP
    pub service_ip: Option<String>,
    /// 带外管理IP（iLO/iDRAC 等）
    pub management_ip: Option<String>,
    /// 机器上登记的全部IP
    pub ip_addresses: Vec<String>,
    /// 负责人联系组
    pub contact_groups: Vec<String>,
}

impl Machine {
    /// 机器的全部IP：登记IP加上服务IP与管理IP
    pub fn all_ips(&self) -> impl Iterator<Item = &str> {
        self.ip_addresses
            .iter()
            .map(String::as_str)
            .chain(self.service_ip.as_deref())
            .chain(self.management_ip.as_deref())
    }

    /// 任一IP命中排除列表
    pub fn has_any_ip_in(&self, excluded: &[String]) -> bool {
        self.all_ips().any(|ip| excluded.iter().any(|e| e == ip))
    }
}

/// 操作系统
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatingSystem {
    pub id: i64,
    pub name: String,
    /// 系统类型：Linux、Windows、Solaris ...
    pub os_type: String,
    pub logo: Option<String>,
}

/// 无法上架的网络设备（交换机、UPS、存储控制器等）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkedDevice {
    pub id: i64,
    pub name: String,
    pub hw_model_id: Option<i64>,
    pub main_ip: Option<String>,
}

/// 业务服务
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub id: i64,
    pub name: String,
}

/// hosts.cfg 中的一条 host 记录
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HostRecord {
    pub fqdn: String,
    pub service_ip: String,
    pub contact_groups: Vec<String>,
    pub parents: Vec<String>,
}

/// hostgroup 记录（每个服务一个）
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HostGroupRecord {
    pub name: String,
    pub members: Vec<String>,
}

/// hostextinfo 记录：同一操作系统的在线机器共享图标
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HostExtInfoRecord {
    pub logo: String,
    pub host_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_any_ip_in_covers_management_ip() {
        let machine = Machine {
            id: 1,
            fqdn: "srv01.example.org".to_string(),
            up: true,
            os_id: None,
            hw_model_id: Some(3),
            service_ip: Some("10.0.0.1".to_string()),
            management_ip: Some("192.168.0.1".to_string()),
            ip_addresses: vec!["10.0.1.1".to_string()],
            contact_groups: vec![],
        };

        assert!(machine.has_any_ip_in(&["192.168.0.1".to_string()]));
        assert!(machine.has_any_ip_in(&["10.0.1.1".to_string()]));
        assert!(!machine.has_any_ip_in(&["10.9.9.9".to_string()]));
    }
}

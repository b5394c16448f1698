use std::collections::HashMap;

use super::{AssetRepository, TaskStatusStore};
use crate::{
    error::AppResult,
    models::{
        BackupKind, BackupTask, CheckTemplate, DeviceCheck, HardwarePolicy, Machine,
        MachineCheck, NetworkedDevice, OperatingSystem, Service, ServiceCheck, TaskStatusRecord,
    },
};

/// 内存资产库，与 Postgres 实现保持相同的过滤与排序语义
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetRepository {
    pub machines: Vec<Machine>,
    /// machine_id -> 父节点
    pub parents: HashMap<i64, Vec<String>>,
    pub services: Vec<Service>,
    /// service_id -> machine_id 列表
    pub service_members: HashMap<i64, Vec<i64>>,
    pub devices: Vec<NetworkedDevice>,
    pub operating_systems: Vec<OperatingSystem>,
    pub machine_checks: Vec<MachineCheck>,
    pub device_checks: Vec<DeviceCheck>,
    pub service_checks: Vec<ServiceCheck>,
    pub hardware_policies: Vec<HardwarePolicy>,
    pub check_templates: Vec<CheckTemplate>,
    pub backup_tasks: Vec<BackupTask>,
}

impl MemoryAssetRepository {
    fn machine(&self, machine_id: i64) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == machine_id)
    }

    fn is_machine_up(&self, machine_id: i64) -> bool {
        self.machine(machine_id).is_some_and(|m| m.up)
    }

    fn sorted_by_fqdn(mut machines: Vec<Machine>) -> Vec<Machine> {
        machines.sort_by(|a, b| a.fqdn.cmp(&b.fqdn));
        machines
    }
}

#[async_trait::async_trait]
impl AssetRepository for MemoryAssetRepository {
    async fn up_machines(&self) -> AppResult<Vec<Machine>> {
        let up: Vec<Machine> = self.machines.iter().filter(|m| m.up).cloned().collect();
        Ok(Self::sorted_by_fqdn(up))
    }

    async fn host_parents(&self, machine_id: i64) -> AppResult<Vec<String>> {
        let mut parents = self.parents.get(&machine_id).cloned().unwrap_or_default();
        parents.sort();
        Ok(parents)
    }

    async fn services(&self) -> AppResult<Vec<Service>> {
        let mut services = self.services.clone();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn service_machines(&self, service_id: i64) -> AppResult<Vec<Machine>> {
        let members: Vec<Machine> = self
            .service_members
            .get(&service_id)
            .map(|ids| ids.iter().filter_map(|id| self.machine(*id).cloned()).collect())
            .unwrap_or_default();
        Ok(Self::sorted_by_fqdn(members))
    }

    async fn networked_devices(&self, hw_model_id: Option<i64>) -> AppResult<Vec<NetworkedDevice>> {
        let mut devices: Vec<NetworkedDevice> = self
            .devices
            .iter()
            .filter(|d| hw_model_id.is_none() || d.hw_model_id == hw_model_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }

    async fn operating_systems(&self, os_types: &[&str]) -> AppResult<Vec<OperatingSystem>> {
        let mut systems: Vec<OperatingSystem> = self
            .operating_systems
            .iter()
            .filter(|os| os_types.contains(&os.os_type.as_str()))
            .cloned()
            .collect();
        systems.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(systems)
    }

    async fn machine_checks(&self, check_name: Option<&str>) -> AppResult<Vec<MachineCheck>> {
        let mut checks: Vec<MachineCheck> = self
            .machine_checks
            .iter()
            .filter(|c| self.is_machine_up(c.machine_id))
            .filter(|c| check_name.is_none_or(|name| c.check.name == name))
            .cloned()
            .collect();
        checks.sort_by(|a, b| {
            (a.machine_fqdn.as_str(), a.check.name.as_str())
                .cmp(&(b.machine_fqdn.as_str(), b.check.name.as_str()))
        });
        Ok(checks)
    }

    async fn device_checks(&self, check_name: Option<&str>) -> AppResult<Vec<DeviceCheck>> {
        let mut checks: Vec<DeviceCheck> = self
            .device_checks
            .iter()
            .filter(|c| check_name.is_none_or(|name| c.check.name == name))
            .cloned()
            .collect();
        checks.sort_by(|a, b| {
            (a.device_name.as_str(), a.check.name.as_str())
                .cmp(&(b.device_name.as_str(), b.check.name.as_str()))
        });
        Ok(checks)
    }

    async fn has_machine_check(&self, machine_id: i64, check_id: i64) -> AppResult<bool> {
        Ok(self
            .machine_checks
            .iter()
            .any(|c| c.machine_id == machine_id && c.check.id == check_id))
    }

    async fn service_checks(&self) -> AppResult<Vec<ServiceCheck>> {
        Ok(self.service_checks.clone())
    }

    async fn hardware_policies(&self) -> AppResult<Vec<HardwarePolicy>> {
        let mut policies = self.hardware_policies.clone();
        policies.sort_by_key(|p| p.id);
        Ok(policies)
    }

    async fn physical_machines_of_model(&self, hw_model_id: i64) -> AppResult<Vec<Machine>> {
        let machines: Vec<Machine> = self
            .machines
            .iter()
            .filter(|m| m.up && m.hw_model_id == Some(hw_model_id))
            .cloned()
            .collect();
        Ok(Self::sorted_by_fqdn(machines))
    }

    async fn check_templates(&self) -> AppResult<Vec<CheckTemplate>> {
        let mut templates = self.check_templates.clone();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn active_backup_tasks(&self, kind: Option<BackupKind>) -> AppResult<Vec<BackupTask>> {
        let mut tasks: Vec<BackupTask> = self
            .backup_tasks
            .iter()
            .filter(|t| t.active && self.is_machine_up(t.machine_id))
            .filter(|t| kind.is_none_or(|k| t.kind == k))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| (a.machine_fqdn.as_str(), a.id).cmp(&(b.machine_fqdn.as_str(), b.id)));
        Ok(tasks)
    }
}

/// 内存任务状态库
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStatusStore {
    pub records: Vec<TaskStatusRecord>,
}

#[async_trait::async_trait]
impl TaskStatusStore for MemoryTaskStatusStore {
    async fn latest_status(&self, task_id: i64) -> AppResult<Option<TaskStatusRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.task_id == task_id)
            .max_by_key(|r| (r.check_time, r.id))
            .cloned())
    }
}

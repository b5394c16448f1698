//! 资产库与任务状态库的查询接口。
//!
//! 核心逻辑只依赖这里的 trait；`asset`/`task_status` 为 Postgres 实现，
//! `memory` 为内存实现。

pub mod asset;
pub mod memory;
pub mod task_status;

pub use asset::PgAssetRepository;
pub use memory::{MemoryAssetRepository, MemoryTaskStatusStore};
pub use task_status::PgTaskStatusStore;

use crate::{
    error::AppResult,
    models::{
        BackupKind, BackupTask, CheckTemplate, DeviceCheck, HardwarePolicy, Machine,
        MachineCheck, NetworkedDevice, OperatingSystem, Service, ServiceCheck, TaskStatusRecord,
    },
};

/// 资产库只读查询
#[async_trait::async_trait]
pub trait AssetRepository: Send + Sync {
    /// 在线机器，按 fqdn 升序
    async fn up_machines(&self) -> AppResult<Vec<Machine>>;

    /// 机器在网络拓扑中的父节点名称
    async fn host_parents(&self, machine_id: i64) -> AppResult<Vec<String>>;

    /// 全部业务服务，按名称升序
    async fn services(&self) -> AppResult<Vec<Service>>;

    /// 服务下的机器（含离线机器），按 fqdn 升序
    async fn service_machines(&self, service_id: i64) -> AppResult<Vec<Machine>>;

    /// 网络设备，可按硬件型号过滤，按名称升序
    async fn networked_devices(&self, hw_model_id: Option<i64>) -> AppResult<Vec<NetworkedDevice>>;

    /// 指定类型的操作系统，按名称升序
    async fn operating_systems(&self, os_types: &[&str]) -> AppResult<Vec<OperatingSystem>>;

    /// 在线机器上的检查分配，可按检查名称过滤
    async fn machine_checks(&self, check_name: Option<&str>) -> AppResult<Vec<MachineCheck>>;

    /// 网络设备上的检查分配，可按检查名称过滤
    async fn device_checks(&self, check_name: Option<&str>) -> AppResult<Vec<DeviceCheck>>;

    /// 机器是否已有该检查的机器级配置
    async fn has_machine_check(&self, machine_id: i64, check_id: i64) -> AppResult<bool>;

    /// 服务级检查
    async fn service_checks(&self) -> AppResult<Vec<ServiceCheck>>;

    /// 硬件策略，按 id 升序
    async fn hardware_policies(&self) -> AppResult<Vec<HardwarePolicy>>;

    /// 指定型号的在线物理机，按 fqdn 升序
    async fn physical_machines_of_model(&self, hw_model_id: i64) -> AppResult<Vec<Machine>>;

    /// Nagios 服务模板
    async fn check_templates(&self) -> AppResult<Vec<CheckTemplate>>;

    /// 启用且所在机器在线的备份任务，可按类型过滤，按机器 fqdn 升序
    async fn active_backup_tasks(&self, kind: Option<BackupKind>) -> AppResult<Vec<BackupTask>>;
}

/// 任务状态库
#[async_trait::async_trait]
pub trait TaskStatusStore: Send + Sync {
    /// 任务最近一次执行结果；没有记录时返回 `None`
    async fn latest_status(&self, task_id: i64) -> AppResult<Option<TaskStatusRecord>>;
}

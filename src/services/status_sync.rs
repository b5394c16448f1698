use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::{
    config::SyncConfig,
    error::AppResult,
    repositories::{AssetRepository, TaskStatusStore},
};

use super::nagios_text::nagios_safe;
use super::nsca_client::{PassiveCheckResult, RelayFactory};

/// 一次同步的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SyncSummary {
    /// 已提交的结果数
    pub submitted: usize,
    /// 没有执行记录而跳过的任务数
    pub skipped: usize,
}

/// 同步运行状态，Flushed 与 Failed 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    NotStarted,
    Collecting,
    Submitting,
    Flushed,
    Failed,
}

struct SyncRun {
    state: SyncState,
}

impl SyncRun {
    fn new() -> Self {
        Self {
            state: SyncState::NotStarted,
        }
    }

    fn transition(&mut self, next: SyncState) {
        debug!(from = ?self.state, to = ?next, "备份状态同步状态变更");
        self.state = next;
    }
}

/// 备份任务状态同步器：把每个启用任务的最新执行结果通过 NSCA 推送给 Nagios
pub struct StatusSyncer {
    assets: Arc<dyn AssetRepository>,
    statuses: Arc<dyn TaskStatusStore>,
    relay_factory: Arc<dyn RelayFactory>,
    last_state: RwLock<SyncState>,
}

impl StatusSyncer {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        statuses: Arc<dyn TaskStatusStore>,
        relay_factory: Arc<dyn RelayFactory>,
    ) -> Self {
        Self {
            assets,
            statuses,
            relay_factory,
            last_state: RwLock::new(SyncState::NotStarted),
        }
    }

    /// 最近一次同步结束时的状态
    pub async fn last_state(&self) -> SyncState {
        *self.last_state.read().await
    }

    /// 执行一次同步。
    ///
    /// 没有执行记录的任务计入 `skipped`；状态无法映射或传输失败时整次同步失败。
    pub async fn sync_statuses(&self) -> AppResult<SyncSummary> {
        let mut run = SyncRun::new();
        let result = self.run(&mut run).await;

        match &result {
            Ok(summary) => info!(
                submitted = summary.submitted,
                skipped = summary.skipped,
                "备份状态已同步到Nagios"
            ),
            Err(e) => {
                run.transition(SyncState::Failed);
                error!(error = %e, "备份状态同步失败");
            }
        }

        *self.last_state.write().await = run.state;
        result
    }

    async fn run(&self, run: &mut SyncRun) -> AppResult<SyncSummary> {
        run.transition(SyncState::Collecting);
        let (results, skipped) = self.collect().await?;

        if results.is_empty() {
            debug!(skipped, "没有需要提交的结果，不建立NSCA连接");
            run.transition(SyncState::Flushed);
            return Ok(SyncSummary {
                submitted: 0,
                skipped,
            });
        }

        run.transition(SyncState::Submitting);
        let mut relay = self.relay_factory.create();
        relay.open().await?;
        for result in &results {
            relay.submit(
                &result.host_name,
                &result.description,
                result.state,
                &result.output,
            )?;
        }
        let submitted = relay.flush().await?;
        run.transition(SyncState::Flushed);

        Ok(SyncSummary { submitted, skipped })
    }

    /// 按任务 id 升序收集每个任务的最新结果
    async fn collect(&self) -> AppResult<(Vec<PassiveCheckResult>, usize)> {
        let mut tasks = self.assets.active_backup_tasks(None).await?;
        tasks.sort_by_key(|task| task.id);

        let mut results = Vec::with_capacity(tasks.len());
        let mut skipped = 0;

        for task in tasks {
            let Some(record) = self.statuses.latest_status(task.id).await? else {
                debug!(task_id = task.id, host = %task.machine_fqdn, "任务没有执行记录，跳过");
                skipped += 1;
                continue;
            };

            let state = record.nagios_state()?;
            debug!(
                task_id = task.id,
                host = %task.machine_fqdn,
                status = %record.status,
                check_time = %record.check_time,
                "任务最新状态"
            );

            let output = if record.comment.trim().is_empty() {
                record.status
            } else {
                record.comment
            };
            results.push(PassiveCheckResult {
                host_name: task.machine_fqdn,
                description: nagios_safe(&task.description),
                state,
                output,
            });
        }

        Ok((results, skipped))
    }

    /// 定时同步循环，超时由循环负责，核心同步本身不设超时
    pub async fn start_sync_loop(self: Arc<Self>, config: SyncConfig) {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let run_timeout = Duration::from_secs(config.run_timeout_secs);

        loop {
            ticker.tick().await;
            match tokio::time::timeout(run_timeout, self.sync_statuses()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "定时备份状态同步失败，等待下一轮"),
                Err(_) => {
                    *self.last_state.write().await = SyncState::Failed;
                    warn!(
                        timeout_secs = config.run_timeout_secs,
                        "定时备份状态同步超时，等待下一轮"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{BackupKind, BackupTask, Machine, NagiosState, TaskStatusRecord};
    use crate::repositories::{MemoryAssetRepository, MemoryTaskStatusStore};
    use crate::services::nsca_client::StatusRelay;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    type Batches = Arc<Mutex<Vec<Vec<PassiveCheckResult>>>>;

    #[derive(Clone, Default)]
    struct RecordingFactory {
        batches: Batches,
        opened: Arc<Mutex<usize>>,
        refuse_connection: bool,
        fail_flush: bool,
    }

    impl RecordingFactory {
        fn batches(&self) -> Vec<Vec<PassiveCheckResult>> {
            self.batches.lock().unwrap().clone()
        }

        fn opened(&self) -> usize {
            *self.opened.lock().unwrap()
        }
    }

    struct RecordingRelay {
        factory: RecordingFactory,
        pending: Vec<PassiveCheckResult>,
    }

    #[async_trait::async_trait]
    impl StatusRelay for RecordingRelay {
        async fn open(&mut self) -> AppResult<()> {
            *self.factory.opened.lock().unwrap() += 1;
            if self.factory.refuse_connection {
                return Err(AppError::connection("127.0.0.1:5667: connection refused"));
            }
            Ok(())
        }

        fn submit(
            &mut self,
            host_name: &str,
            description: &str,
            state: NagiosState,
            message: &str,
        ) -> AppResult<()> {
            self.pending.push(PassiveCheckResult {
                host_name: host_name.to_string(),
                description: description.to_string(),
                state,
                output: message.to_string(),
            });
            Ok(())
        }

        async fn flush(&mut self) -> AppResult<usize> {
            if self.factory.fail_flush {
                return Err(AppError::relay("127.0.0.1:5667: broken pipe"));
            }
            let batch = std::mem::take(&mut self.pending);
            let count = batch.len();
            self.factory.batches.lock().unwrap().push(batch);
            Ok(count)
        }
    }

    impl RelayFactory for RecordingFactory {
        fn create(&self) -> Box<dyn StatusRelay> {
            Box::new(RecordingRelay {
                factory: self.clone(),
                pending: Vec::new(),
            })
        }
    }

    fn machine(id: i64, fqdn: &str, up: bool) -> Machine {
        Machine {
            id,
            fqdn: fqdn.to_string(),
            up,
            os_id: None,
            hw_model_id: None,
            service_ip: None,
            management_ip: None,
            ip_addresses: vec![],
            contact_groups: vec![],
        }
    }

    fn task(id: i64, machine_id: i64, fqdn: &str, active: bool, description: &str) -> BackupTask {
        BackupTask {
            id,
            kind: BackupKind::File,
            machine_id,
            machine_fqdn: fqdn.to_string(),
            active,
            description: description.to_string(),
        }
    }

    fn record(id: i64, task_id: i64, status: &str, comment: &str, hour: u32) -> TaskStatusRecord {
        TaskStatusRecord {
            id,
            task_id,
            status: status.to_string(),
            comment: comment.to_string(),
            check_time: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
        }
    }

    fn assets() -> MemoryAssetRepository {
        MemoryAssetRepository {
            machines: vec![
                machine(1, "srv01.example.org", true),
                machine(2, "srv02.example.org", true),
                machine(3, "old.example.org", false),
            ],
            backup_tasks: vec![
                task(2, 2, "srv02.example.org", true, "Backup diario (home)"),
                task(1, 1, "srv01.example.org", true, "Backup /var, nocturno"),
                task(3, 3, "old.example.org", true, "Backup antiguo"),
                task(4, 1, "srv01.example.org", false, "Backup desactivado"),
            ],
            ..Default::default()
        }
    }

    fn syncer(
        assets: MemoryAssetRepository,
        statuses: MemoryTaskStatusStore,
        factory: &RecordingFactory,
    ) -> StatusSyncer {
        StatusSyncer::new(
            Arc::new(assets),
            Arc::new(statuses),
            Arc::new(factory.clone()),
        )
    }

    #[tokio::test]
    async fn test_sync_submits_latest_status_and_skips_missing() {
        // T1 有两条记录，只提交最新的 CRITICAL；T2 没有记录
        let statuses = MemoryTaskStatusStore {
            records: vec![
                record(10, 1, "OK", "", 1),
                record(11, 1, "CRITICAL", "disk full", 2),
                record(12, 3, "OK", "", 2),
                record(13, 4, "WARNING", "", 2),
            ],
        };
        let factory = RecordingFactory::default();
        let syncer = syncer(assets(), statuses, &factory);

        let summary = syncer.sync_statuses().await.unwrap();
        assert_eq!(
            summary,
            SyncSummary {
                submitted: 1,
                skipped: 1
            }
        );
        assert_eq!(syncer.last_state().await, SyncState::Flushed);

        let batches = factory.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![PassiveCheckResult {
                host_name: "srv01.example.org".to_string(),
                description: "Backup /var nocturno".to_string(),
                state: NagiosState::Critical,
                output: "disk full".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_sync_orders_by_task_id() {
        let statuses = MemoryTaskStatusStore {
            records: vec![record(1, 2, "warning", "lento", 3), record(2, 1, "ok", "", 3)],
        };
        let factory = RecordingFactory::default();
        let syncer = syncer(assets(), statuses, &factory);

        syncer.sync_statuses().await.unwrap();
        let batch = &factory.batches()[0];
        let hosts: Vec<&str> = batch.iter().map(|r| r.host_name.as_str()).collect();
        assert_eq!(hosts, vec!["srv01.example.org", "srv02.example.org"]);
        // 没有备注时以状态文本作为输出
        assert_eq!(batch[0].output, "ok");
        assert_eq!(batch[1].description, "Backup diario home");
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let statuses = MemoryTaskStatusStore {
            records: vec![record(1, 1, "OK", "fine", 1), record(2, 2, "UNKNOWN", "?", 1)],
        };
        let factory = RecordingFactory::default();
        let syncer = syncer(assets(), statuses, &factory);

        let first = syncer.sync_statuses().await.unwrap();
        let second = syncer.sync_statuses().await.unwrap();
        assert_eq!(first, second);

        let batches = factory.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], batches[1]);
        assert_eq!(factory.opened(), 2);
    }

    #[tokio::test]
    async fn test_sync_without_active_tasks() {
        let assets = MemoryAssetRepository {
            machines: vec![machine(1, "srv01.example.org", true)],
            ..Default::default()
        };
        let factory = RecordingFactory::default();
        let syncer = syncer(assets, MemoryTaskStatusStore::default(), &factory);

        let summary = syncer.sync_statuses().await.unwrap();
        assert_eq!(summary, SyncSummary::default());
        assert_eq!(syncer.last_state().await, SyncState::Flushed);
        assert_eq!(factory.opened(), 0);
        assert!(factory.batches().is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_status_fails_run() {
        let statuses = MemoryTaskStatusStore {
            records: vec![record(1, 1, "OK", "", 1), record(2, 2, "PENDING", "", 1)],
        };
        let factory = RecordingFactory::default();
        let syncer = syncer(assets(), statuses, &factory);

        let err = syncer.sync_statuses().await.unwrap_err();
        assert!(matches!(err, AppError::UnmappedStatus { task_id: 2, .. }));
        assert_eq!(syncer.last_state().await, SyncState::Failed);
        assert_eq!(factory.opened(), 0);
        assert!(factory.batches().is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_fails_run() {
        let statuses = MemoryTaskStatusStore {
            records: vec![record(1, 1, "OK", "", 1)],
        };
        let factory = RecordingFactory {
            refuse_connection: true,
            ..Default::default()
        };
        let syncer = syncer(assets(), statuses, &factory);

        let err = syncer.sync_statuses().await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(syncer.last_state().await, SyncState::Failed);
        assert!(factory.batches().is_empty());
    }

    #[tokio::test]
    async fn test_flush_failure_fails_run() {
        let statuses = MemoryTaskStatusStore {
            records: vec![record(1, 1, "OK", "", 1), record(2, 2, "CRITICAL", "", 1)],
        };
        let factory = RecordingFactory {
            fail_flush: true,
            ..Default::default()
        };
        let syncer = syncer(assets(), statuses, &factory);

        let err = syncer.sync_statuses().await.unwrap_err();
        assert!(matches!(err, AppError::Relay(_)));
        assert_eq!(syncer.last_state().await, SyncState::Failed);
        assert_eq!(factory.opened(), 1);
        assert!(factory.batches().is_empty());
    }
}

// 服务层模块
pub mod config_renderer;
pub mod nagios_text;
pub mod nsca_client;
pub mod status_sync;

pub use config_renderer::{BackupCheckGroup, ConfigRenderer, RenderedChecks};
pub use nsca_client::{NscaClient, NscaRelayFactory, PassiveCheckResult, RelayFactory, StatusRelay};
pub use status_sync::{StatusSyncer, SyncState, SyncSummary};

use crate::{
    handlers::status::TaskStatusResponse,
    services::{SyncState, SyncSummary},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::status::refresh_status,
        crate::handlers::status::get_task_status,
    ),
    components(schemas(SyncSummary, SyncState, TaskStatusResponse)),
    tags(
        (name = "Nagios", description = "Nagios 被动检查同步与任务状态")
    ),
    info(
        title = "Arritranco Nagios API",
        version = "0.1.0",
        description = "Nagios 配置生成与备份状态推送"
    )
)]
pub struct ApiDoc;

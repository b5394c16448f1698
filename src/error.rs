use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::{ApiResponse, ResponseCode};

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("模板渲染错误: {0}")]
    Template(#[from] tera::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    /// 检查命令模板引用了无法解析的占位符
    #[error("检查命令替换失败: {target} 缺少占位符 {placeholder} 的取值")]
    ConfigSubstitution { target: String, placeholder: String },

    /// 无法连接到 NSCA 服务端
    #[error("无法连接监控主机: {0}")]
    Connection(String),

    /// 批量提交被动检查结果失败
    #[error("被动检查结果发送失败: {0}")]
    Relay(String),

    /// 任务状态不在固定的状态映射表中
    #[error("任务 {task_id} 的状态值 {status:?} 无法映射为Nagios状态")]
    UnmappedStatus { task_id: i64, status: String },

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("资源不存在: {resource}")]
    NotFound { resource: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            AppError::Database(_) => (ResponseCode::DATABASE_ERROR, self.to_string()),
            AppError::Template(_) => (ResponseCode::RENDER_ERROR, self.to_string()),
            AppError::Io(_) => (ResponseCode::INTERNAL_ERROR, "文件IO错误".to_string()),
            AppError::Config(_) => (ResponseCode::INTERNAL_ERROR, "配置错误".to_string()),
            AppError::ConfigSubstitution { .. } => (ResponseCode::RENDER_ERROR, self.to_string()),
            AppError::Connection(_) | AppError::Relay(_) => {
                (ResponseCode::RELAY_ERROR, self.to_string())
            }
            AppError::UnmappedStatus { .. } => (ResponseCode::INTERNAL_ERROR, self.to_string()),
            AppError::Internal(_) => (ResponseCode::INTERNAL_ERROR, "服务器内部错误".to_string()),
            AppError::NotFound { resource } => {
                (ResponseCode::NOT_FOUND, format!("资源不存在: {}", resource))
            }
        };

        // 记录错误日志
        tracing::error!("应用错误: {}", self);

        ApiResponse::<()>::error(code, message).into_response()
    }
}

/// 应用程序Result类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误构造辅助函数
impl AppError {
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn substitution<T: Into<String>, P: Into<String>>(target: T, placeholder: P) -> Self {
        Self::ConfigSubstitution {
            target: target.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn connection<T: Into<String>>(msg: T) -> Self {
        Self::Connection(msg.into())
    }

    pub fn relay<T: Into<String>>(msg: T) -> Self {
        Self::Relay(msg.into())
    }

    pub fn unmapped_status<T: Into<String>>(task_id: i64, status: T) -> Self {
        Self::UnmappedStatus {
            task_id,
            status: status.into(),
        }
    }

    /// 传输层错误（打开连接或批量发送）会使整次同步失败
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Connection(_) | AppError::Relay(_))
    }
}

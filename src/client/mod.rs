// 文件管理 API 客户端模块

pub mod error;
pub mod file_manager;
pub mod middleware;
pub mod session;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use file_manager::{
    FileManagerClient, FileManagerClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
pub use middleware::{AuthHeader, Middleware, MiddlewareChain, PropagateErrors};
pub use session::Session;
pub use types::*;

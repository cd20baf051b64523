// File Manager Client Library
// 文件管理服务客户端核心库

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 文件管理API客户端模块
pub mod client;

// 响应式状态模块
pub mod store;

// 应用状态模块
pub mod state;

// 导出常用类型
pub use client::{
    ApiError, ApiResult, FileEntry, FileKind, FileManagerClient, Middleware, MiddlewareChain,
    Session, UploadFile,
};
pub use config::AppConfig;
pub use state::AppState;
pub use store::{Subscription, Writable};

// 文件管理 API 错误类型

use reqwest::StatusCode;
use thiserror::Error;

/// API 调用失败
///
/// 本层只有一种对外错误："传输/响应失败"。
/// 网络错误、非 2xx 状态码、响应体解析失败都原样携带底层错误返回，
/// 不重试、不转换，由调用方根据状态码或消息自行分支。
#[derive(Debug, Error)]
pub enum ApiError {
    /// reqwest 返回的原始错误（连接失败、超时、非 2xx 状态、读取响应体失败）
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// 响应体 JSON 解析失败
    #[error(transparent)]
    Body(#[from] serde_json::Error),

    /// 令牌无法作为 HTTP 头的值发送（包含控制字符等）
    #[error("invalid Authorization header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

impl ApiError {
    /// 服务器返回的状态码（仅当错误由非 2xx 响应引起时存在）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Transport(e) => e.status(),
            ApiError::Body(_) | ApiError::Header(_) => None,
        }
    }

    /// 是否为连接失败
    pub fn is_connect(&self) -> bool {
        matches!(self, ApiError::Transport(e) if e.is_connect())
    }

    /// 是否为超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport(e) if e.is_timeout())
    }

    /// 是否为响应体解析失败
    pub fn is_decode(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_decode(),
            ApiError::Body(_) => true,
            ApiError::Header(_) => false,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

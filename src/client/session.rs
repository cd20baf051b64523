// 会话上下文

use parking_lot::RwLock;
use std::sync::Arc;

/// 客户端会话
///
/// 持有可选的授权令牌，显式传入客户端而不是放在全局变量里。
/// 克隆出的 `Session` 共享同一个令牌槽位，任意一份修改后，
/// 之后发出的所有请求都会看到新值。
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    /// 创建没有令牌的会话
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有令牌创建会话
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(token);
        session
    }

    /// 当前令牌（克隆）
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// 是否持有令牌
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// 设置令牌，原样作为 Authorization 头的值发送
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// 清除令牌，之后的请求不再携带 Authorization 头
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }
}

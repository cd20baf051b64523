//! 请求/响应中间件
//!
//! 在真正发送请求前后统一处理横切逻辑（注入授权头、错误透传），
//! 不需要修改每个调用点。
//!
//! 执行顺序为洋葱模型：
//! - 请求阶段按注册顺序执行 `on_request`
//! - 响应阶段按注册的逆序执行 `on_response`

use super::error::ApiResult;
use super::session::Session;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 中间件
///
/// 两个钩子都有透传的默认实现，只需覆盖关心的一侧。
pub trait Middleware: Send + Sync {
    /// 名称（用于日志和调试输出）
    fn name(&self) -> &'static str;

    /// 请求发出前调用，可修改请求
    fn on_request(&self, _request: &mut Request, _session: &Session) -> ApiResult<()> {
        Ok(())
    }

    /// 收到响应（或传输失败）后调用
    fn on_response(&self, result: ApiResult<Response>) -> ApiResult<Response> {
        result
    }
}

/// 授权头注入
///
/// 会话持有令牌时，在每个请求上设置 `Authorization: <token>`（原样，不加 `Bearer ` 前缀）；
/// 没有令牌时不设置该头。令牌在发送时读取，修改令牌对之后所有请求立即生效。
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthHeader;

impl Middleware for AuthHeader {
    fn name(&self) -> &'static str {
        "auth_header"
    }

    fn on_request(&self, request: &mut Request, session: &Session) -> ApiResult<()> {
        if let Some(token) = session.token() {
            let mut value = HeaderValue::from_str(&token)?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(())
    }
}

/// 错误透传
///
/// 成功时原样返回；失败时把原始错误继续抛给调用方，不重试、不转换。
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateErrors;

impl Middleware for PropagateErrors {
    fn name(&self) -> &'static str {
        "propagate_errors"
    }

    fn on_response(&self, result: ApiResult<Response>) -> ApiResult<Response> {
        // 失败不在这里吞掉，也不记录为已处理
        result
    }
}

/// 有序的中间件链
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// 空链
    pub fn new() -> Self {
        Self::default()
    }

    /// 默认链：授权头注入 + 错误透传
    pub fn standard() -> Self {
        let mut chain = Self::new();
        chain.push(AuthHeader);
        chain.push(PropagateErrors);
        chain
    }

    /// 追加一个中间件到链尾
    pub fn push<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.layers.push(Arc::new(middleware));
    }

    /// 追加一个共享的中间件
    pub fn push_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 按顺序列出中间件名称
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    /// 请求阶段：按注册顺序执行，遇到错误立即返回
    pub fn apply_request(&self, request: &mut Request, session: &Session) -> ApiResult<()> {
        for layer in &self.layers {
            layer.on_request(request, session)?;
        }
        debug!(
            "请求中间件执行完成: {} {} (layers={})",
            request.method(),
            request.url().path(),
            self.layers.len()
        );
        Ok(())
    }

    /// 响应阶段：按注册的逆序执行
    pub fn apply_response(&self, result: ApiResult<Response>) -> ApiResult<Response> {
        self.layers
            .iter()
            .rev()
            .fold(result, |acc, layer| layer.on_response(acc))
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

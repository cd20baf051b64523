// 应用状态

use crate::client::{ApiResult, FileEntry, FileManagerClient, Session, UploadFile};
use crate::config::AppConfig;
use crate::store::Writable;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// 当前用户信息（普通共享对象，修改不会通知任何人）
pub type UserState = Arc<RwLock<Map<String, Value>>>;

/// 应用全局状态
///
/// 启动时创建，关闭时调用 [`AppState::shutdown`] 断开所有订阅
#[derive(Clone)]
pub struct AppState {
    /// 文件列表
    pub file_list: Writable<Vec<FileEntry>>,
    /// 通用接口数据
    pub api_data: Writable<Vec<Value>>,
    /// 当前用户
    pub user: UserState,
    /// 会话（授权令牌）
    pub session: Session,
    /// 文件管理客户端
    pub client: FileManagerClient,
    /// 应用配置
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let session = match config.client.token {
            Some(ref token) => Session::with_token(token.clone()),
            None => Session::new(),
        };
        let client = FileManagerClient::from_config(&config.client, session.clone())?;

        info!("应用状态初始化完成: base_url={}", client.base_url());

        Ok(Self {
            file_list: Writable::default(),
            api_data: Writable::default(),
            user: Arc::new(RwLock::new(Map::new())),
            session,
            client,
            config: Arc::new(config),
        })
    }

    /// 拉取文件列表并写入 `file_list`
    ///
    /// 失败时原样返回错误，store 保持原值
    pub async fn refresh_file_list(&self, prefix: Option<&str>) -> ApiResult<Vec<FileEntry>> {
        let files = self.client.list(prefix).await?;
        debug!("获取到 {} 个文件/文件夹", files.len());
        self.file_list.set(files.clone());
        Ok(files)
    }

    /// 创建文件夹，响应体写入 `api_data`
    pub async fn create_folder(&self, name: &str) -> ApiResult<Value> {
        let body = self.client.create_folder(name).await?;
        self.api_data.set(body_to_items(&body));
        Ok(body)
    }

    /// 上传文件，响应体写入 `api_data`
    pub async fn upload(&self, path: &str, file: UploadFile) -> ApiResult<Value> {
        let body = self.client.upload(path, file).await?;
        self.api_data.set(body_to_items(&body));
        Ok(body)
    }

    /// 直接访问用户对象
    pub fn user(&self) -> &UserState {
        &self.user
    }

    /// 关闭：断开所有 store 订阅
    pub fn shutdown(&self) {
        let total = self.file_list.subscriber_count() + self.api_data.subscriber_count();
        self.file_list.clear_subscribers();
        self.api_data.clear_subscribers();
        info!("应用状态已关闭，移除 {} 个订阅", total);
    }
}

/// 把响应体转换为 `api_data` 中的条目
///
/// 数组展开，`null` 视为空，其他值作为单个条目
fn body_to_items(body: &Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

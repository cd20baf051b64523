// 文件管理客户端实现

use super::error::{ApiError, ApiResult};
use super::middleware::{Middleware, MiddlewareChain};
use super::session::Session;
use super::types::{CreateFolderRequest, FileEntry, UploadFile};
use crate::config::ClientConfig;
use anyhow::{Context, Result};
use reqwest::multipart;
use reqwest::{Client, Request, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 默认服务地址
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// 默认请求超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const PING_PATH: &str = "/api";
const LIST_PATH: &str = "/api/file";
const CREATE_FOLDER_PATH: &str = "/api/file/folder";
const UPLOAD_PATH: &str = "/api/file/upload";

/// 客户端构建器
#[derive(Debug)]
pub struct FileManagerClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
    session: Session,
    middleware: MiddlewareChain,
}

impl FileManagerClientBuilder {
    fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            session: Session::new(),
            middleware: MiddlewareChain::standard(),
        }
    }

    /// 设置服务地址（所有相对路径都基于它解析）
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// 使用外部会话（令牌由调用方管理）
    pub fn session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// 在默认链之后追加中间件
    pub fn middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middleware.push(middleware);
        self
    }

    /// 追加共享中间件
    pub fn middleware_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push_shared(middleware);
        self
    }

    /// 替换整条中间件链
    pub fn middleware_chain(mut self, chain: MiddlewareChain) -> Self {
        self.middleware = chain;
        self
    }

    pub fn build(self) -> Result<FileManagerClient> {
        let base_url = parse_base_url(&self.base_url)?;

        let mut builder = Client::builder().timeout(self.timeout);
        if let Some(ref ua) = self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        info!(
            "初始化文件管理客户端: base_url={}, timeout={:?}, 令牌={}, 中间件={:?}",
            base_url,
            self.timeout,
            if self.session.has_token() {
                "已设置"
            } else {
                "未设置"
            },
            self.middleware
        );

        Ok(FileManagerClient {
            client,
            base_url,
            session: self.session,
            middleware: self.middleware,
        })
    }
}

/// 校验并解析服务地址，只接受 http/https
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("无效的服务地址: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!("不支持的协议: {} (服务地址: {})", other, raw),
    }
}

/// 文件管理客户端
///
/// 所有操作共享同一个 HTTP 客户端和中间件链，返回解包后的响应体。
#[derive(Debug, Clone)]
pub struct FileManagerClient {
    /// HTTP客户端
    client: Client,
    /// 服务地址
    base_url: Url,
    /// 会话（授权令牌）
    session: Session,
    /// 请求/响应中间件
    middleware: MiddlewareChain,
}

impl FileManagerClient {
    pub fn builder() -> FileManagerClientBuilder {
        FileManagerClientBuilder::new()
    }

    /// 使用默认配置创建客户端
    pub fn new(base_url: &str, session: Session) -> Result<Self> {
        Self::builder().base_url(base_url).session(session).build()
    }

    /// 从配置创建客户端
    pub fn from_config(config: &ClientConfig, session: Session) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(config.base_url.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .session(session);
        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 拼接完整 URL，保留服务地址中已有的路径前缀
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{}", self.base_url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }

    /// 连通性检查，返回服务端的响应文本
    pub async fn ping(&self) -> ApiResult<String> {
        debug!("ping: {}", self.endpoint(PING_PATH));

        let request = self.client.get(self.endpoint(PING_PATH)).build()?;
        let response = self.execute(request).await?;
        Ok(response.text().await?)
    }

    /// 获取文件列表
    ///
    /// # 参数
    /// * `prefix` - 目录前缀，省略时发送空字符串
    pub async fn list(&self, prefix: Option<&str>) -> ApiResult<Vec<FileEntry>> {
        self.list_as(prefix).await
    }

    /// 获取文件列表，响应体按调用方指定的类型解析
    pub async fn list_as<T>(&self, prefix: Option<&str>) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let prefix = prefix.unwrap_or("");
        info!("获取文件列表: prefix={:?}", prefix);

        let request = self
            .client
            .get(self.endpoint(LIST_PATH))
            .query(&[("prefix", prefix)])
            .build()?;

        let response = self.execute(request).await?;
        unwrap_body(response).await
    }

    /// 创建文件夹
    ///
    /// 名称不做本地校验，由服务端决定是否接受
    pub async fn create_folder(&self, name: &str) -> ApiResult<Value> {
        info!("创建文件夹: name={:?}", name);

        let request = self
            .client
            .post(self.endpoint(CREATE_FOLDER_PATH))
            .json(&CreateFolderRequest {
                name: name.to_string(),
            })
            .build()?;

        let response = self.execute(request).await?;
        unwrap_body(response).await
    }

    /// 上传文件
    ///
    /// # 参数
    /// * `path` - 目标目录
    /// * `file` - 文件内容，作为 multipart 的 `file` 字段发送
    pub async fn upload(&self, path: &str, file: UploadFile) -> ApiResult<Value> {
        info!(
            "上传文件: path={:?}, file={}, size={}",
            path,
            file.file_name,
            file.len()
        );

        // 每个文件部分都带 Content-Type，服务端按该头判断文件类型
        let part = multipart::Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&file.mime)?;

        // 构建 multipart form：path + file 两个字段
        let form = multipart::Form::new()
            .text("path", path.to_string())
            .part("file", part);

        let request = self
            .client
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(form)
            .build()?;

        let response = self.execute(request).await?;
        unwrap_body(response).await
    }

    /// 经过中间件链发送请求
    ///
    /// 非 2xx 状态在响应中间件执行前就转换为错误
    async fn execute(&self, mut request: Request) -> ApiResult<Response> {
        self.middleware.apply_request(&mut request, &self.session)?;

        let method = request.method().clone();
        let url = request.url().clone();

        let result = self
            .client
            .execute(request)
            .await
            .and_then(Response::error_for_status)
            .map_err(ApiError::from);

        match &result {
            Ok(response) => debug!("{} {} -> {}", method, url.path(), response.status()),
            Err(e) => debug!("{} {} -> 失败: {}", method, url.path(), e),
        }

        self.middleware.apply_response(result)
    }
}

/// 解包响应体，丢弃状态码和响应头
///
/// 空响应体按 JSON `null` 处理
async fn unwrap_body<T>(response: Response) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    let bytes = response.bytes().await?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::FileKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, session: Session) -> FileManagerClient {
        FileManagerClient::new(&server.uri(), session).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = FileManagerClient::new(DEFAULT_BASE_URL, Session::new()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
        assert!(!client.session().has_token());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(FileManagerClient::new("not a url", Session::new()).is_err());
        assert!(FileManagerClient::new("ftp://localhost", Session::new()).is_err());
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = FileManagerClient::new("http://localhost:8080", Session::new()).unwrap();
        assert_eq!(
            client.endpoint(LIST_PATH).as_str(),
            "http://localhost:8080/api/file"
        );

        let client = FileManagerClient::new("http://example.com/proxy/", Session::new()).unwrap();
        assert_eq!(
            client.endpoint(UPLOAD_PATH).as_str(),
            "http://example.com/proxy/api/file/upload"
        );
    }

    #[tokio::test]
    async fn test_list_without_prefix_sends_empty_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .and(query_param("prefix", ""))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let files = client.list(None).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_prefix_with_reserved_characters() {
        let prefix = "a b&c=d/é#x?y+z";
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .and(query_param("prefix", prefix))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        client.list(Some(prefix)).await.unwrap();

        // 保留字符被编码，不会拆出额外的查询参数
        let requests = server.received_requests().await.unwrap();
        let pairs: Vec<_> = requests[0].url.query_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, prefix);
        assert!(requests[0].url.fragment().is_none());
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .and(query_param("prefix", "photos/2022"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "summer/", "type": 1, "originalName": "photos/2022/summer/"},
                {"name": "a.png", "type": 0, "size": 42, "contentType": "image/png"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let files = client.list(Some("photos/2022")).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].kind, FileKind::Folder);
        assert_eq!(files[1].name, "a.png");
        assert_eq!(files[1].size, 42);
    }

    #[tokio::test]
    async fn test_list_as_raw_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"anything": true})))
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let body: Value = client.list_as(Some("x")).await.unwrap();
        assert_eq!(body, json!({"anything": true}));
    }

    #[tokio::test]
    async fn test_create_folder_sends_json_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/file/folder"))
            .and(body_json(json!({"name": "docs"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("null\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let body = client.create_folder("docs").await.unwrap();
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_upload_sends_two_multipart_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/file/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let file = UploadFile::new("x.png", b"fake-png-bytes".to_vec());
        let body = client.upload("/a/b", file).await.unwrap();
        assert_eq!(body, Value::Null);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];

        let content_type = request
            .headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data"));

        let body = String::from_utf8_lossy(&request.body);
        assert_eq!(body.matches("Content-Disposition: form-data").count(), 2);
        assert!(body.contains("name=\"path\"\r\n\r\n/a/b\r\n"));
        assert!(body.contains("name=\"file\"; filename=\"x.png\""));
        assert!(body.contains("Content-Type: image/png"));
        assert!(body.contains("fake-png-bytes"));
    }

    #[tokio::test]
    async fn test_upload_unknown_extension_uses_octet_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/file/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        client
            .upload("/docs", UploadFile::new("notes.txt", b"hello".to_vec()))
            .await
            .unwrap();
        client
            .upload("/docs", UploadFile::new("Makefile", b"all:".to_vec()))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        for (request, name) in requests.iter().zip(["notes.txt", "Makefile"]) {
            let body = String::from_utf8_lossy(&request.body);
            let file_part = body
                .split(&format!("filename=\"{}\"", name))
                .nth(1)
                .unwrap();
            assert!(file_part.starts_with("\r\nContent-Type: application/octet-stream\r\n"));
        }
    }

    #[tokio::test]
    async fn test_authorization_header_follows_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let session = Session::new();
        let client = client_for(&server, session.clone());

        client.list(None).await.unwrap();
        session.set_token("abc123");
        client.list(None).await.unwrap();
        client.create_folder("docs").await.ok();
        session.clear_token();
        client.list(None).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].headers.get("authorization").is_none());
        assert_eq!(requests[1].headers.get("authorization").unwrap(), "abc123");
        assert_eq!(requests[2].headers.get("authorization").unwrap(), "abc123");
        assert!(requests[3].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_authorization_header_is_sent_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/file/upload"))
            .and(header("authorization", "abc123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::with_token("abc123"));
        client
            .upload("/", UploadFile::new("a.pdf", b"%PDF".to_vec()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/file/folder"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"message": "upload failed"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let err = client.create_folder("docs").await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
    }

    #[tokio::test]
    async fn test_network_error_is_propagated() {
        let client = FileManagerClient::new("http://127.0.0.1:1", Session::new()).unwrap();

        let err = client.list(None).await.unwrap_err();
        assert!(err.is_connect());

        let err = client.create_folder("docs").await.unwrap_err();
        assert!(err.is_connect());

        let err = client
            .upload("/a", UploadFile::new("a.png", vec![0u8; 4]))
            .await
            .unwrap_err();
        assert!(err.is_connect());
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = FileManagerClient::builder()
            .base_url(server.uri())
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let err = client.list(None).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(!err.is_connect());
        assert!(err.status().is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/file"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        let err = client.list(None).await.unwrap_err();
        assert!(err.is_decode());
        assert!(err.status().is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello world"))
            .mount(&server)
            .await;

        let client = client_for(&server, Session::new());
        assert_eq!(client.ping().await.unwrap(), "Hello world");
    }
}

// 文件管理 API 数据类型

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 条目类型 (0=文件, 1=文件夹)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FileKind {
    #[default]
    File,
    Folder,
}

impl From<i32> for FileKind {
    fn from(value: i32) -> Self {
        match value {
            1 => FileKind::Folder,
            _ => FileKind::File,
        }
    }
}

impl From<FileKind> for i32 {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::File => 0,
            FileKind::Folder => 1,
        }
    }
}

/// 文件/文件夹信息
///
/// 字段全部可缺省，客户端只做反序列化，不做额外校验。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileEntry {
    /// 显示名称
    pub name: String,

    /// 条目类型
    #[serde(rename = "type")]
    pub kind: FileKind,

    /// 创建时间
    pub created_at: Option<DateTime<Utc>>,

    /// 所在前缀
    pub prefix: String,

    /// 文件大小（字节）
    pub size: i64,

    /// MIME 类型
    pub content_type: String,

    /// 所有者
    pub owner: String,

    /// 存储中的完整对象名
    pub original_name: String,
}

impl FileEntry {
    /// 是否是文件夹
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    /// 是否是文件
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// 创建文件夹请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

/// 未知类型文件的 MIME
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// 待上传的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// multipart 中的文件名
    pub file_name: String,
    /// 文件内容
    pub data: Vec<u8>,
    /// MIME 类型（无法从扩展名推断时为 application/octet-stream）
    pub mime: String,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let mime = guess_mime(&file_name)
            .unwrap_or(DEFAULT_MIME)
            .to_string();
        Self {
            file_name,
            data: data.into(),
            mime,
        }
    }

    /// 覆盖 MIME 类型
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// 从本地文件读取
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("无效的文件路径: {:?}", path))?
            .to_string();

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("读取本地文件失败: {:?}", path))?;

        Ok(Self::new(file_name, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 根据扩展名推断服务端接受的 MIME 类型
///
/// 服务端只接收 png/jpeg/gif/webp/pdf，其他扩展名返回 None
pub fn guess_mime(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

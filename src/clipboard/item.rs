//! 剪贴板条目数据模型
//!
//! `ClipboardItem` 是分类器输出、历史存储持有、持久化层编码的唯一规范记录。
//! `id` 一经分配不再改变，其余字段在重新捕获或编辑时可被替换。

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::representation::{Representation, RepresentationSet};

/// 条目的稳定标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 规范条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Text,
    Image,
    File,
    Url,
    Rtf,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Text => "text",
            ItemType::Image => "image",
            ItemType::File => "file",
            ItemType::Url => "url",
            ItemType::Rtf => "rtf",
        }
    }
}

/// 内容子类别标签，仅文本条目携带
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTag {
    Color,
    Email,
    Phone,
    Code,
    Json,
    Address,
}

/// 复制来源应用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceApp {
    pub bundle_id: String,
    pub name: String,
}

/// 剪贴板历史条目
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardItem {
    pub id: ItemId,
    /// 展示 / 纯文本内容；图片为尺寸描述，文件为文件名列表
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub item_type: ItemType,
    pub image_bytes: Option<Vec<u8>>,
    pub file_urls: Option<Vec<PathBuf>>,
    pub source_app: Option<SourceApp>,
    pub rich_text_bytes: Option<Vec<u8>>,
    pub detected_tags: BTreeSet<ContentTag>,
}

impl ClipboardItem {
    pub fn new(item_type: ItemType, content: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            content: content.into(),
            timestamp: Utc::now(),
            item_type,
            image_bytes: None,
            file_urls: None,
            source_app: None,
            rich_text_bytes: None,
            detected_tags: BTreeSet::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ItemType::Text, content)
    }

    pub fn with_image_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.image_bytes = Some(bytes);
        self
    }

    pub fn with_file_urls(mut self, files: Vec<PathBuf>) -> Self {
        self.file_urls = Some(files);
        self
    }

    pub fn with_rich_text(mut self, bytes: Vec<u8>) -> Self {
        self.rich_text_bytes = Some(bytes);
        self
    }

    pub fn with_source_app(mut self, source_app: Option<SourceApp>) -> Self {
        self.source_app = source_app;
        self
    }

    /// 去重键
    ///
    /// - 图片（带字节）：图片字节的 SHA-256
    /// - 文件 / 文件型图片：排序后逗号拼接的绝对路径
    /// - 文本 / URL / RTF：内容字符串本身
    pub fn unique_identifier(&self) -> String {
        match self.item_type {
            ItemType::Image => match (&self.image_bytes, &self.file_urls) {
                (Some(bytes), _) => hash_bytes(bytes),
                (None, Some(files)) => join_sorted_paths(files),
                (None, None) => self.content.clone(),
            },
            ItemType::File => self
                .file_urls
                .as_deref()
                .map(join_sorted_paths)
                .unwrap_or_else(|| self.content.clone()),
            ItemType::Text | ItemType::Url | ItemType::Rtf => self.content.clone(),
        }
    }

    /// 将条目还原为可写回剪贴板的表示集合
    pub fn to_representations(&self) -> RepresentationSet {
        let mut reps = RepresentationSet::new();
        match self.item_type {
            ItemType::Text => {
                reps.push(Representation::PlainText(self.content.clone()));
            }
            ItemType::Url => {
                reps.push(Representation::Url(self.content.clone()));
                reps.push(Representation::PlainText(self.content.clone()));
            }
            ItemType::Rtf => {
                if let Some(rtf) = &self.rich_text_bytes {
                    reps.push(Representation::RichText(rtf.clone()));
                }
                reps.push(Representation::PlainText(self.content.clone()));
            }
            ItemType::Image => {
                if let Some(bytes) = &self.image_bytes {
                    reps.push(Representation::Image(bytes.clone()));
                }
                if let Some(files) = &self.file_urls {
                    reps.push(Representation::FileUrls(files.clone()));
                }
            }
            ItemType::File => {
                if let Some(files) = &self.file_urls {
                    reps.push(Representation::FileUrls(files.clone()));
                }
            }
        }
        reps
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

fn join_sorted_paths(files: &[PathBuf]) -> String {
    let mut paths: Vec<String> = files
        .iter()
        .map(|p| {
            std::path::absolute(p)
                .unwrap_or_else(|_| p.clone())
                .to_string_lossy()
                .to_string()
        })
        .collect();
    paths.sort();
    paths.join(",")
}

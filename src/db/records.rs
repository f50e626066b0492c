//! 持久化记录格式
//!
//! 每条历史 / 片段编码为一个独立的 JSON 对象，二进制字段使用 base64。
//! 解码按记录进行，单条损坏不影响其余记录。

use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clipboard::{ClipboardItem, ContentTag, ItemId, ItemType, SourceApp, detect_tags};
use crate::error::AppError;
use crate::expansion::{Snippet, SnippetId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(rename = "fileURLPaths", default, skip_serializing_if = "Option::is_none")]
    pub file_url_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<SourceApp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtf_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_tags: Option<Vec<ContentTag>>,
}

impl From<&ClipboardItem> for ItemRecord {
    fn from(item: &ClipboardItem) -> Self {
        Self {
            id: item.id.to_string(),
            content: item.content.clone(),
            timestamp: item.timestamp,
            item_type: item.item_type,
            image_base64: item
                .image_bytes
                .as_deref()
                .map(|bytes| general_purpose::STANDARD.encode(bytes)),
            file_url_paths: item.file_urls.as_ref().map(|files| {
                files
                    .iter()
                    .map(|f| f.to_string_lossy().to_string())
                    .collect()
            }),
            source_app: item.source_app.clone(),
            rtf_base64: item
                .rich_text_bytes
                .as_deref()
                .map(|bytes| general_purpose::STANDARD.encode(bytes)),
            detected_tags: (!item.detected_tags.is_empty())
                .then(|| item.detected_tags.iter().copied().collect()),
        }
    }
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, AppError> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|e| AppError::Database(format!("字段 {} base64 解码失败: {}", field, e)))
}

impl TryFrom<ItemRecord> for ClipboardItem {
    type Error = AppError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let id = ItemId::parse(&record.id)
            .ok_or_else(|| AppError::Database(format!("无效的条目 id: {}", record.id)))?;

        let image_bytes = record
            .image_base64
            .as_deref()
            .map(|value| decode_base64("imageBase64", value))
            .transpose()?;
        let rich_text_bytes = record
            .rtf_base64
            .as_deref()
            .map(|value| decode_base64("rtfBase64", value))
            .transpose()?;

        // 旧记录可能没有标签，文本条目重新识别
        let detected_tags = match (record.item_type, record.detected_tags) {
            (ItemType::Text, Some(tags)) => tags.into_iter().collect(),
            (ItemType::Text, None) => detect_tags(&record.content),
            _ => Default::default(),
        };

        Ok(ClipboardItem {
            id,
            content: record.content,
            timestamp: record.timestamp,
            item_type: record.item_type,
            image_bytes,
            file_urls: record
                .file_url_paths
                .map(|paths| paths.into_iter().map(PathBuf::from).collect()),
            source_app: record.source_app,
            rich_text_bytes,
            detected_tags,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetRecord {
    pub id: String,
    pub name: String,
    pub trigger: String,
    pub content: String,
    pub is_enabled: bool,
}

impl From<&Snippet> for SnippetRecord {
    fn from(snippet: &Snippet) -> Self {
        Self {
            id: snippet.id.to_string(),
            name: snippet.name.clone(),
            trigger: snippet.trigger.clone(),
            content: snippet.content.clone(),
            is_enabled: snippet.enabled,
        }
    }
}

impl TryFrom<SnippetRecord> for Snippet {
    type Error = AppError;

    fn try_from(record: SnippetRecord) -> Result<Self, Self::Error> {
        let id = SnippetId::parse(&record.id)
            .ok_or_else(|| AppError::Database(format!("无效的片段 id: {}", record.id)))?;
        Ok(Snippet {
            id,
            name: record.name,
            trigger: record.trigger,
            content: record.content,
            enabled: record.is_enabled,
        })
    }
}

/// 解码一条 JSON 记录
pub fn decode_item(json: &str) -> Result<ClipboardItem, AppError> {
    let record: ItemRecord = serde_json::from_str(json)
        .map_err(|e| AppError::Database(format!("解析历史记录失败: {}", e)))?;
    record.try_into()
}

pub fn encode_item(item: &ClipboardItem) -> Result<String, AppError> {
    serde_json::to_string(&ItemRecord::from(item))
        .map_err(|e| AppError::Database(format!("序列化历史记录失败: {}", e)))
}

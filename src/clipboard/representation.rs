//! 剪贴板表示集合与资源抽象
//!
//! 系统剪贴板在同一次复制中可能同时携带多种表示（图片字节、文件引用、
//! URL、RTF、纯文本）。`RepresentationSet` 按写入顺序保存这些表示，
//! `ClipboardResource` 则抽象出外部剪贴板的三项能力：
//! 单调递增的变更计数、一次性读取全部表示、原子写入多种表示。

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;

use super::item::SourceApp;

/// 表示种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    Image,
    FileUrls,
    Url,
    RichText,
    PlainText,
}

/// 单个表示及其原始数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    /// 已编码的图片字节（PNG / TIFF / JPEG ...）
    Image(Vec<u8>),
    FileUrls(Vec<PathBuf>),
    Url(String),
    /// RTF 原始字节
    RichText(Vec<u8>),
    PlainText(String),
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Representation::Image(_) => RepresentationKind::Image,
            Representation::FileUrls(_) => RepresentationKind::FileUrls,
            Representation::Url(_) => RepresentationKind::Url,
            Representation::RichText(_) => RepresentationKind::RichText,
            Representation::PlainText(_) => RepresentationKind::PlainText,
        }
    }
}

/// 一次读取得到的全部表示
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepresentationSet {
    reps: Vec<Representation>,
    /// 写入该内容的前台应用（平台能提供时）
    pub source_app: Option<SourceApp>,
}

impl RepresentationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加表示；同种类的旧表示会被替换
    pub fn push(&mut self, rep: Representation) {
        let kind = rep.kind();
        self.reps.retain(|r| r.kind() != kind);
        self.reps.push(rep);
    }

    pub fn with(mut self, rep: Representation) -> Self {
        self.push(rep);
        self
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().with(Representation::PlainText(text.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.reps.is_empty()
    }

    pub fn kinds(&self) -> Vec<RepresentationKind> {
        self.reps.iter().map(Representation::kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Representation> {
        self.reps.iter()
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.reps.iter().find_map(|r| match r {
            Representation::Image(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn file_urls(&self) -> Option<&[PathBuf]> {
        self.reps.iter().find_map(|r| match r {
            Representation::FileUrls(files) => Some(files.as_slice()),
            _ => None,
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.reps.iter().find_map(|r| match r {
            Representation::Url(url) => Some(url.as_str()),
            _ => None,
        })
    }

    pub fn rich_text(&self) -> Option<&[u8]> {
        self.reps.iter().find_map(|r| match r {
            Representation::RichText(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn plain_text(&self) -> Option<&str> {
        self.reps.iter().find_map(|r| match r {
            Representation::PlainText(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// 外部共享剪贴板资源
///
/// 实现方需保证 `write` 对多种表示是原子的，并返回写入后的变更计数，
/// 以便调用方在同一临界区内登记“自身写入”。
pub trait ClipboardResource: Send + Sync {
    /// 当前变更计数，每次任何进程写入剪贴板都会递增
    fn change_count(&self) -> Result<u64, AppError>;

    /// 一次性读取当前全部表示
    fn read(&self) -> Result<RepresentationSet, AppError>;

    /// 原子写入，返回写入后的变更计数
    fn write(&self, reps: &RepresentationSet) -> Result<u64, AppError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    change_count: u64,
    contents: RepresentationSet,
}

/// 进程内剪贴板
///
/// 用于测试与无头运行：`external_write` 模拟其他应用写入，
/// 与真实系统剪贴板一样会推进变更计数。
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    state: Mutex<MemoryState>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("内存剪贴板锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 模拟外部应用写入
    pub fn external_write(&self, reps: RepresentationSet) -> u64 {
        let mut state = self.lock();
        state.change_count += 1;
        state.contents = reps;
        state.change_count
    }

    pub fn contents(&self) -> RepresentationSet {
        self.lock().contents.clone()
    }
}

impl ClipboardResource for MemoryClipboard {
    fn change_count(&self) -> Result<u64, AppError> {
        Ok(self.lock().change_count)
    }

    fn read(&self) -> Result<RepresentationSet, AppError> {
        Ok(self.lock().contents.clone())
    }

    fn write(&self, reps: &RepresentationSet) -> Result<u64, AppError> {
        let mut state = self.lock();
        state.change_count += 1;
        state.contents = reps.clone();
        Ok(state.change_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_replaces_same_kind() {
        let reps = RepresentationSet::plain("a").with(Representation::PlainText("b".into()));
        assert_eq!(reps.kinds(), vec![RepresentationKind::PlainText]);
        assert_eq!(reps.plain_text(), Some("b"));
    }

    #[test]
    fn memory_clipboard_counts_every_write() {
        let clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.change_count().unwrap(), 0);
        clipboard.external_write(RepresentationSet::plain("x"));
        let count = clipboard.write(&RepresentationSet::plain("y")).unwrap();
        assert_eq!(count, 2);
        assert_eq!(clipboard.read().unwrap().plain_text(), Some("y"));
    }
}

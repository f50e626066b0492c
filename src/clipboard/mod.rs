//! 剪贴板核心模块
//!
//! # 设计思路
//!
//! 统一管理剪贴板相关的核心能力：
//! - **表示与资源**：`representation` 抽象外部共享剪贴板（变更计数 / 读取 / 原子写入）
//! - **分类**：`classifier` 把一次读取的多种表示归一为 `ClipboardItem`
//! - **标签**：`tagger` + `code_detection` 识别颜色、邮箱、代码等子类别
//! - **快捷操作**：`quick_actions` 基于标签给出可执行的变换
//! - **监控**：`monitor` 轮询变更计数并写入历史
//! - **自写抑制**：`ChangeTracker` + `ClipboardWriter`，防止应用自身写入被当成新复制
//!
//! # 实现思路
//!
//! 旧方案是“写入前置忽略标志，监听器消费一次”，但标志与真实写入之间
//! 没有顺序保证：监听器可能在标志设置前读到变化，也可能把外部变化误吞。
//! 现在改为记录计数：
//!
//! - `ChangeTracker` 持有“最后已知的变更计数”，由一把互斥锁保护。
//! - `ClipboardWriter::write` 在持锁期间完成写入并登记写入后的计数。
//! - 轮询端在同一把锁内比较计数并读取内容，因此自身写入永远不会被视为外部变化。
//! - 所有内部写入（复制历史条目、片段展开、恢复剪贴板）都必须经过 `ClipboardWriter`。

pub mod arboard_backend;
pub mod classifier;
pub mod code_detection;
pub mod item;
pub mod monitor;
pub mod quick_actions;
pub mod representation;
pub mod tagger;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AppError;

pub use classifier::classify;
pub use item::{ClipboardItem, ContentTag, ItemId, ItemType, SourceApp};
pub use monitor::{MonitorHandle, PasteboardMonitor};
pub use representation::{
    ClipboardResource, MemoryClipboard, Representation, RepresentationKind, RepresentationSet,
};
pub use tagger::detect_tags;

// ============================================================================
// 变更计数跟踪
// ============================================================================

/// 最后已知的剪贴板变更计数
///
/// `None` 表示尚未建立基线，第一次轮询只登记计数而不捕获内容。
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last_seen: Mutex<Option<u64>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<u64>> {
        match self.last_seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("剪贴板计数锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    pub fn last_seen(&self) -> Option<u64> {
        *self.lock()
    }
}

// ============================================================================
// ClipboardWriter：唯一的内部写入通道
// ============================================================================

/// 剪贴板读写句柄
///
/// 克隆开销很小，监控器、历史存储与展开引擎共享同一个 `ChangeTracker`。
#[derive(Clone)]
pub struct ClipboardWriter {
    resource: Arc<dyn ClipboardResource>,
    tracker: Arc<ChangeTracker>,
}

impl ClipboardWriter {
    pub fn new(resource: Arc<dyn ClipboardResource>) -> Self {
        Self {
            resource,
            tracker: Arc::new(ChangeTracker::new()),
        }
    }

    pub fn resource(&self) -> &Arc<dyn ClipboardResource> {
        &self.resource
    }

    pub fn tracker(&self) -> &Arc<ChangeTracker> {
        &self.tracker
    }

    /// 写入剪贴板并登记写入后的计数，返回该计数
    pub fn write(&self, reps: &RepresentationSet) -> Result<u64, AppError> {
        let mut last_seen = self.tracker.lock();
        let count = self.resource.write(reps)?;
        *last_seen = Some(count);
        log::debug!("🚫 已登记自身写入，变更计数: {}", count);
        Ok(count)
    }

    pub fn read(&self) -> Result<RepresentationSet, AppError> {
        self.resource.read()
    }

    pub fn change_count(&self) -> Result<u64, AppError> {
        self.resource.change_count()
    }

    /// 以当前计数作为基线，已在剪贴板中的内容不会被捕获
    pub fn prime(&self) -> Result<u64, AppError> {
        let mut last_seen = self.tracker.lock();
        let count = self.resource.change_count()?;
        *last_seen = Some(count);
        Ok(count)
    }

    /// 轮询端使用：计数变化时读取内容并推进基线
    ///
    /// 返回 `Ok(None)` 表示无外部变化（包括自身写入）。
    /// 读取失败时基线保持不变，下次轮询会重试。
    pub fn detect_change_and_read(&self) -> Result<Option<RepresentationSet>, AppError> {
        let mut last_seen = self.tracker.lock();
        let current = self.resource.change_count()?;

        match *last_seen {
            Some(seen) if seen == current => return Ok(None),
            None => {
                *last_seen = Some(current);
                return Ok(None);
            }
            Some(_) => {}
        }

        let reps = self.resource.read()?;
        *last_seen = Some(current);
        Ok(Some(reps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<MemoryClipboard>, ClipboardWriter) {
        let clipboard = Arc::new(MemoryClipboard::new());
        let writer = ClipboardWriter::new(clipboard.clone());
        (clipboard, writer)
    }

    #[test]
    fn first_detection_only_establishes_baseline() {
        let (clipboard, writer) = setup();
        clipboard.external_write(RepresentationSet::plain("already there"));
        assert!(writer.detect_change_and_read().unwrap().is_none());
        assert_eq!(writer.tracker().last_seen(), Some(1));
    }

    #[test]
    fn own_write_is_not_reported() {
        let (_clipboard, writer) = setup();
        writer.prime().unwrap();
        writer.write(&RepresentationSet::plain("mine")).unwrap();
        assert!(writer.detect_change_and_read().unwrap().is_none());
    }

    #[test]
    fn external_write_is_reported_once() {
        let (clipboard, writer) = setup();
        writer.prime().unwrap();
        clipboard.external_write(RepresentationSet::plain("theirs"));

        let reps = writer.detect_change_and_read().unwrap().expect("应检测到外部变化");
        assert_eq!(reps.plain_text(), Some("theirs"));
        assert!(writer.detect_change_and_read().unwrap().is_none());
    }

    #[test]
    fn external_write_after_own_write_is_reported() {
        let (clipboard, writer) = setup();
        writer.prime().unwrap();
        writer.write(&RepresentationSet::plain("mine")).unwrap();
        clipboard.external_write(RepresentationSet::plain("theirs"));

        let reps = writer.detect_change_and_read().unwrap().expect("应检测到外部变化");
        assert_eq!(reps.plain_text(), Some("theirs"));
    }
}

//! 历史记录存储
//!
//! # 设计思路
//!
//! `HistoryStore` 是条目集合的唯一所有者，维护三条不变量：
//! - 最前面的条目是最近使用的
//! - 任意两条记录的去重键（`unique_identifier`）不同
//! - 有上限时（`max_size > 0`），每次插入后长度不超过上限
//!
//! # 实现思路
//!
//! - 集合以 `Arc<Vec<ClipboardItem>>` 保存，修改时 `Arc::make_mut` 写时复制，
//!   读者拿到的快照永远是某次修改完成后的完整状态。
//! - 所有修改都在同一把互斥锁内完成，随后通过 `broadcast` 发布 `HistoryEvent`，
//!   订阅方（持久化、界面）收到事件后再取快照。
//! - 文本条目在插入与编辑时由 `tagger` 重新打标签。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::clipboard::{ClipboardItem, ClipboardWriter, ItemId, ItemType, detect_tags};
use crate::error::AppError;

pub const DEFAULT_MAX_HISTORY_SIZE: usize = 200;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// `add` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// 与最前面的条目重复，顺序不变，仅刷新时间戳
    Ignored,
    /// 已存在，移动到最前并刷新时间戳，沿用原 id
    Promoted(ItemId),
    /// 新条目
    Inserted(ItemId),
}

/// 历史变化通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Inserted(ItemId),
    Promoted(ItemId),
    Updated(ItemId),
    Removed(ItemId),
    /// 超出上限被从尾部淘汰的条目
    Evicted(Vec<ItemId>),
    Cleared,
    /// 整体替换（导入）
    Replaced,
}

#[derive(Debug)]
struct HistoryState {
    items: Arc<Vec<ClipboardItem>>,
    max_size: usize,
}

impl HistoryState {
    /// 截断尾部，返回被淘汰的 id
    fn enforce_bound(&mut self) -> Vec<ItemId> {
        if self.max_size == 0 || self.items.len() <= self.max_size {
            return Vec::new();
        }
        let max_size = self.max_size;
        let items = Arc::make_mut(&mut self.items);
        items.drain(max_size..).map(|item| item.id).collect()
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// 把 `index` 处的条目移到最前并刷新时间戳
    fn promote(&mut self, index: usize) -> ItemId {
        let items = Arc::make_mut(&mut self.items);
        let mut item = items.remove(index);
        item.timestamp = Utc::now();
        let id = item.id;
        items.insert(0, item);
        id
    }
}

pub struct HistoryStore {
    state: Mutex<HistoryState>,
    events: broadcast::Sender<HistoryEvent>,
}

impl HistoryStore {
    /// `max_size == 0` 表示不限制
    pub fn new(max_size: usize) -> Self {
        Self::with_items(Vec::new(), max_size)
    }

    /// 以已加载的条目初始化，重复键只保留靠前的一条
    pub fn with_items(items: Vec<ClipboardItem>, max_size: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut state = HistoryState {
            items: Arc::new(dedupe_keep_first(items)),
            max_size,
        };
        state.enforce_bound();
        Self {
            state: Mutex::new(state),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("历史记录锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    fn publish(&self, event: HistoryEvent) {
        // 没有订阅者时发送失败，属正常情况
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }

    /// 当前完整快照
    pub fn snapshot(&self) -> Arc<Vec<ClipboardItem>> {
        Arc::clone(&self.lock().items)
    }

    pub fn get(&self, id: ItemId) -> Option<ClipboardItem> {
        self.lock().items.iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_history_size(&self) -> usize {
        self.lock().max_size
    }

    /// 记录一次捕获
    pub fn add(&self, mut item: ClipboardItem) -> AddOutcome {
        let key = item.unique_identifier();

        let (outcome, evicted) = {
            let mut state = self.lock();

            if state
                .items
                .first()
                .is_some_and(|front| front.unique_identifier() == key)
            {
                // 顺序不变，只刷新时间戳
                let front = &mut Arc::make_mut(&mut state.items)[0];
                front.timestamp = Utc::now();
                let id = front.id;
                drop(state);
                self.publish(HistoryEvent::Updated(id));
                return AddOutcome::Ignored;
            }

            let existing = state
                .items
                .iter()
                .position(|entry| entry.unique_identifier() == key);

            match existing {
                Some(index) => (AddOutcome::Promoted(state.promote(index)), Vec::new()),
                None => {
                    item.id = ItemId::new();
                    item.timestamp = Utc::now();
                    retag(&mut item);
                    let id = item.id;
                    Arc::make_mut(&mut state.items).insert(0, item);
                    (AddOutcome::Inserted(id), state.enforce_bound())
                }
            }
        };

        match outcome {
            AddOutcome::Promoted(id) => {
                log::debug!("📋 重复内容移至最前: {}", id);
                self.publish(HistoryEvent::Promoted(id));
            }
            AddOutcome::Inserted(id) => {
                log::debug!("📋 新增历史条目: {}", id);
                self.publish(HistoryEvent::Inserted(id));
            }
            AddOutcome::Ignored => {}
        }
        if !evicted.is_empty() {
            log::debug!("📋 超出上限，淘汰 {} 条", evicted.len());
            self.publish(HistoryEvent::Evicted(evicted));
        }

        outcome
    }

    /// 把条目写回剪贴板并移到最前
    ///
    /// 写入经由 `ClipboardWriter` 完成，监控器不会把它当成新的复制。
    pub fn copy_to_clipboard(&self, id: ItemId, writer: &ClipboardWriter) -> Result<(), AppError> {
        let item = self
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("历史条目 {}", id)))?;

        writer.write(&item.to_representations())?;

        let promoted = {
            let mut state = self.lock();
            state.position(id).map(|index| state.promote(index))
        };
        if let Some(id) = promoted {
            self.publish(HistoryEvent::Promoted(id));
        }
        Ok(())
    }

    /// 按 id 删除，不存在时无操作
    pub fn delete(&self, id: ItemId) -> bool {
        let removed = {
            let mut state = self.lock();
            match state.position(id) {
                Some(index) => {
                    Arc::make_mut(&mut state.items).remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.publish(HistoryEvent::Removed(id));
        }
        removed
    }

    /// 原地替换内容，保留 id、时间戳与类型
    pub fn update_content(&self, id: ItemId, content: impl Into<String>) -> Result<(), AppError> {
        let content = content.into();
        {
            let mut state = self.lock();
            let index = state
                .position(id)
                .ok_or_else(|| AppError::NotFound(format!("历史条目 {}", id)))?;
            let item = &mut Arc::make_mut(&mut state.items)[index];
            item.content = content;
            retag(item);
        }
        self.publish(HistoryEvent::Updated(id));
        Ok(())
    }

    pub fn clear(&self) {
        {
            let mut state = self.lock();
            if state.items.is_empty() {
                return;
            }
            state.items = Arc::new(Vec::new());
        }
        self.publish(HistoryEvent::Cleared);
    }

    /// 调整上限并立即截断
    pub fn set_max_history_size(&self, max_size: usize) {
        let evicted = {
            let mut state = self.lock();
            state.max_size = max_size;
            state.enforce_bound()
        };
        if !evicted.is_empty() {
            self.publish(HistoryEvent::Evicted(evicted));
        }
    }

    /// 整体替换（导入），重复键只保留靠前的一条
    pub fn replace_all(&self, items: Vec<ClipboardItem>) {
        {
            let mut state = self.lock();
            state.items = Arc::new(dedupe_keep_first(items));
            state.enforce_bound();
        }
        self.publish(HistoryEvent::Replaced);
    }
}

fn retag(item: &mut ClipboardItem) {
    if item.item_type == ItemType::Text {
        item.detected_tags = detect_tags(&item.content);
    } else {
        item.detected_tags.clear();
    }
}

fn dedupe_keep_first(items: Vec<ClipboardItem>) -> Vec<ClipboardItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.unique_identifier()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ContentTag, MemoryClipboard, RepresentationSet};

    fn contents(store: &HistoryStore) -> Vec<String> {
        store.snapshot().iter().map(|item| item.content.clone()).collect()
    }

    #[test]
    fn front_duplicate_only_refreshes_timestamp() {
        let store = HistoryStore::new(10);
        assert!(matches!(store.add(ClipboardItem::text("a")), AddOutcome::Inserted(_)));
        assert_eq!(store.add(ClipboardItem::text("a")), AddOutcome::Ignored);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_elsewhere_is_promoted_with_original_id() {
        let store = HistoryStore::new(10);
        let AddOutcome::Inserted(first_id) = store.add(ClipboardItem::text("a")) else {
            panic!("应为新增");
        };
        store.add(ClipboardItem::text("b"));
        let before = store.get(first_id).expect("条目应存在").timestamp;

        assert_eq!(store.add(ClipboardItem::text("a")), AddOutcome::Promoted(first_id));
        assert_eq!(contents(&store), vec!["a", "b"]);
        assert!(store.get(first_id).expect("条目应存在").timestamp >= before);
    }

    #[test]
    fn tail_is_evicted_when_bounded() {
        let store = HistoryStore::new(2);
        let mut events = store.subscribe();
        let AddOutcome::Inserted(oldest) = store.add(ClipboardItem::text("a")) else {
            panic!("应为新增");
        };
        store.add(ClipboardItem::text("b"));
        store.add(ClipboardItem::text("c"));

        assert_eq!(contents(&store), vec!["c", "b"]);
        let mut saw_eviction = false;
        while let Ok(event) = events.try_recv() {
            if event == HistoryEvent::Evicted(vec![oldest]) {
                saw_eviction = true;
            }
        }
        assert!(saw_eviction);
    }

    #[test]
    fn zero_means_unbounded() {
        let store = HistoryStore::new(0);
        for i in 0..500 {
            store.add(ClipboardItem::text(i.to_string()));
        }
        assert_eq!(store.len(), 500);
    }

    #[test]
    fn text_items_are_tagged_on_insert_and_edit() {
        let store = HistoryStore::new(10);
        let AddOutcome::Inserted(id) = store.add(ClipboardItem::text("#FF00FF")) else {
            panic!("应为新增");
        };
        assert!(store.get(id).expect("条目应存在").detected_tags.contains(&ContentTag::Color));

        store.update_content(id, "mail a@b.co").expect("编辑应成功");
        let item = store.get(id).expect("条目应存在");
        assert_eq!(item.content, "mail a@b.co");
        assert!(item.detected_tags.contains(&ContentTag::Email));
        assert!(!item.detected_tags.contains(&ContentTag::Color));
    }

    #[test]
    fn update_preserves_id_timestamp_and_type() {
        let store = HistoryStore::new(10);
        let AddOutcome::Inserted(id) = store.add(ClipboardItem::new(ItemType::Url, "https://a.io")) else {
            panic!("应为新增");
        };
        let before = store.get(id).expect("条目应存在");
        store.update_content(id, "https://b.io").expect("编辑应成功");
        let after = store.get(id).expect("条目应存在");
        assert_eq!(after.timestamp, before.timestamp);
        assert_eq!(after.item_type, ItemType::Url);
        assert!(store.update_content(ItemId::new(), "x").is_err());
    }

    #[test]
    fn delete_missing_is_noop() {
        let store = HistoryStore::new(10);
        store.add(ClipboardItem::text("a"));
        assert!(!store.delete(ItemId::new()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn copy_to_clipboard_writes_and_promotes() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let writer = ClipboardWriter::new(clipboard.clone());
        writer.prime().expect("建立基线");

        let store = HistoryStore::new(10);
        let AddOutcome::Inserted(id) = store.add(ClipboardItem::text("a")) else {
            panic!("应为新增");
        };
        store.add(ClipboardItem::text("b"));

        store.copy_to_clipboard(id, &writer).expect("复制应成功");
        assert_eq!(clipboard.contents(), RepresentationSet::plain("a"));
        assert_eq!(contents(&store), vec!["a", "b"]);
        assert!(writer.detect_change_and_read().expect("读取").is_none());
    }

    #[test]
    fn shrinking_bound_truncates_immediately() {
        let store = HistoryStore::new(0);
        for text in ["a", "b", "c", "d"] {
            store.add(ClipboardItem::text(text));
        }
        store.set_max_history_size(2);
        assert_eq!(contents(&store), vec!["d", "c"]);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutations() {
        let store = HistoryStore::new(10);
        store.add(ClipboardItem::text("a"));
        let snapshot = store.snapshot();
        store.add(ClipboardItem::text("b"));
        store.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(store.is_empty());
    }
}

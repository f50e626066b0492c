//! 片段展开引擎
//!
//! # 设计思路
//!
//! 全局键盘监听把每次按键交给 `TriggerEngine`，引擎维护一个滚动缓冲区，
//! 当缓冲区以某个启用片段的触发词结尾时，把触发词替换为片段内容：
//!
//! 1. 发送与触发词字符数相同的退格
//! 2. 保存剪贴板的全部表示
//! 3. 把片段内容写入剪贴板（经 `ClipboardWriter`，监控器不会记录）
//! 4. 发送粘贴组合键
//! 5. 等待恢复延迟后还原剪贴板
//!
//! # 实现思路
//!
//! - 匹配与缓冲区更新在同一把锁内同步完成，展开序列在独立的 tokio 任务中执行。
//! - 展开序列逐个执行：后触发的展开排队等待前一个完成还原，
//!   保存下来的永远是用户自己的剪贴板内容，而不是上一个片段。
//! - 还原前检查两件事：引擎仍处于启用状态、剪贴板计数仍等于片段写入时的计数。
//!   用户在等待期间复制了别的内容时跳过还原，不会覆盖新内容。
//! - `stop()` 通过 `CancellationToken` 取消所有等待中的还原。
//! - 片段已写入剪贴板后注入失败，仍按同样的条件还原，再返回错误。
//! - 没有输入模拟权限时不展开，只记录一次警告。

mod buffer;
mod snippet;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clipboard::{ClipboardWriter, RepresentationSet};
use crate::error::AppError;
use crate::input::{InputInjector, KeyKind, KeyStroke};

pub use buffer::{DEFAULT_BUFFER_LEN, TriggerBuffer};
pub use snippet::{Snippet, SnippetId, SnippetLibrary};

pub const DEFAULT_RESTORE_DELAY_MS: u64 = 300;
pub const DEFAULT_PASTE_SETTLE_MS: u64 = 30;

/// 退格键对缓冲区的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackspacePolicy {
    /// 清空整个缓冲区
    #[default]
    Clear,
    /// 只删除最后一个字符
    PopOne,
}

/// 多个触发词同时作为后缀命中时的选择规则
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerPrecedence {
    /// 按注册顺序，先注册者优先
    #[default]
    FirstRegistered,
    /// 最长的触发词优先，长度相同时按注册顺序
    LongestMatch,
}

#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    pub buffer_len: usize,
    pub restore_delay: Duration,
    /// 写入剪贴板后、发送粘贴前的等待
    pub paste_settle: Duration,
    pub backspace_policy: BackspacePolicy,
    pub precedence: TriggerPrecedence,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            buffer_len: DEFAULT_BUFFER_LEN,
            restore_delay: Duration::from_millis(DEFAULT_RESTORE_DELAY_MS),
            paste_settle: Duration::from_millis(DEFAULT_PASTE_SETTLE_MS),
            backspace_policy: BackspacePolicy::default(),
            precedence: TriggerPrecedence::default(),
        }
    }
}

/// 一次展开的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    /// 剪贴板已还原为展开前的内容
    Restored,
    /// 等待期间剪贴板被其他写入修改，或引擎已停用，未还原
    RestoreSkipped,
    /// 引擎停止，等待中的还原被取消
    Cancelled,
}

/// 在片段列表中查找以缓冲区结尾的触发词
pub fn find_match<'a>(
    buffer: &TriggerBuffer,
    snippets: &'a [Snippet],
    precedence: TriggerPrecedence,
) -> Option<&'a Snippet> {
    let mut candidates = snippets
        .iter()
        .filter(|s| s.enabled && buffer.ends_with(&s.trigger));

    match precedence {
        TriggerPrecedence::FirstRegistered => candidates.next(),
        TriggerPrecedence::LongestMatch => candidates.fold(None, |best: Option<&Snippet>, s| {
            match best {
                Some(b) if b.trigger.chars().count() >= s.trigger.chars().count() => Some(b),
                _ => Some(s),
            }
        }),
    }
}

pub struct TriggerEngine {
    buffer: Mutex<TriggerBuffer>,
    snippets: Arc<SnippetLibrary>,
    writer: ClipboardWriter,
    injector: Arc<dyn InputInjector>,
    config: ExpansionConfig,
    active: AtomicBool,
    warned_untrusted: AtomicBool,
    cancel: CancellationToken,
    /// 整个展开序列期间持有
    sequence: Arc<AsyncMutex<()>>,
}

impl TriggerEngine {
    pub fn new(
        snippets: Arc<SnippetLibrary>,
        writer: ClipboardWriter,
        injector: Arc<dyn InputInjector>,
        config: ExpansionConfig,
    ) -> Self {
        Self {
            buffer: Mutex::new(TriggerBuffer::new(config.buffer_len)),
            snippets,
            writer,
            injector,
            config,
            active: AtomicBool::new(true),
            warned_untrusted: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            sequence: Arc::new(AsyncMutex::new(())),
        }
    }

    fn lock_buffer(&self) -> MutexGuard<'_, TriggerBuffer> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("触发缓冲区锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    /// 临时启用 / 停用展开，停用时清空缓冲区
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
        if !active {
            self.lock_buffer().clear();
        }
    }

    /// 停止引擎并取消所有等待中的还原，不可再次启用
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        self.lock_buffer().clear();
        log::info!("⌨️ 片段展开引擎已停止");
    }

    pub fn buffer_contents(&self) -> String {
        self.lock_buffer().as_string()
    }

    /// 处理一次按键；命中触发词时返回展开任务句柄
    pub fn handle_key(&self, stroke: KeyStroke) -> Option<JoinHandle<Result<ExpansionOutcome, AppError>>> {
        if !self.is_active() {
            return None;
        }

        let snippet = {
            let mut buffer = self.lock_buffer();

            if stroke.modifiers.is_chord() {
                buffer.clear();
                return None;
            }

            match stroke.kind {
                KeyKind::Character(c) => buffer.push(c),
                KeyKind::Backspace => match self.config.backspace_policy {
                    BackspacePolicy::Clear => {
                        buffer.clear();
                        return None;
                    }
                    BackspacePolicy::PopOne => {
                        buffer.pop()?;
                    }
                },
                KeyKind::Other => return None,
            }

            let snippets = self.snippets.list();
            let found = find_match(&buffer, &snippets, self.config.precedence).cloned();
            if found.is_some() {
                buffer.clear();
            }
            found
        }?;

        if !self.injector.is_trusted() {
            if !self.warned_untrusted.swap(true, Ordering::SeqCst) {
                log::warn!("⌨️ 缺少输入模拟权限，片段展开已跳过");
            }
            return None;
        }

        log::debug!("⌨️ 触发片段「{}」", snippet.name);
        let task = ExpansionTask {
            writer: self.writer.clone(),
            injector: Arc::clone(&self.injector),
            restore_delay: self.config.restore_delay,
            paste_settle: self.config.paste_settle,
            cancel: self.cancel.clone(),
            sequence: Arc::clone(&self.sequence),
        };
        Some(tokio::spawn(task.run(snippet)))
    }

    /// 消费按键通道直到通道关闭或引擎停止
    pub async fn run(self: Arc<Self>, mut keys: UnboundedReceiver<KeyStroke>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                stroke = keys.recv() => match stroke {
                    Some(stroke) => {
                        self.handle_key(stroke);
                    }
                    None => break,
                },
            }
        }
    }
}

/// 展开序列所需的全部状态，脱离引擎单独运行
struct ExpansionTask {
    writer: ClipboardWriter,
    injector: Arc<dyn InputInjector>,
    restore_delay: Duration,
    paste_settle: Duration,
    cancel: CancellationToken,
    sequence: Arc<AsyncMutex<()>>,
}

impl ExpansionTask {
    async fn run(self, snippet: Snippet) -> Result<ExpansionOutcome, AppError> {
        let _turn = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(ExpansionOutcome::Cancelled),
            guard = self.sequence.lock() => guard,
        };

        self.injector.backspaces(snippet.trigger.chars().count())?;

        let saved = self.writer.read()?;
        let written = self.writer.write(&RepresentationSet::plain(snippet.content.as_str()))?;

        if !self.paste_settle.is_zero() {
            tokio::time::sleep(self.paste_settle).await;
        }
        if let Err(err) = self.injector.paste() {
            log::warn!("⌨️ 发送粘贴失败，还原剪贴板: {}", err);
            if let Err(restore_err) = self.restore_if_unchanged(&saved, written) {
                log::error!("⌨️ 还原剪贴板失败: {}", restore_err);
            }
            return Err(err);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => {
                log::debug!("⌨️ 引擎已停止，取消剪贴板还原");
                return Ok(ExpansionOutcome::Cancelled);
            }
            _ = tokio::time::sleep(self.restore_delay) => {}
        }

        if self.cancel.is_cancelled() {
            return Ok(ExpansionOutcome::Cancelled);
        }

        self.restore_if_unchanged(&saved, written)
    }

    /// 剪贴板计数仍是片段写入时的值才写回保存的内容
    fn restore_if_unchanged(&self, saved: &RepresentationSet, written: u64) -> Result<ExpansionOutcome, AppError> {
        let current = self.writer.change_count()?;
        if current != written {
            log::debug!("⌨️ 剪贴板在等待期间被修改（{} → {}），跳过还原", written, current);
            return Ok(ExpansionOutcome::RestoreSkipped);
        }

        self.writer.write(saved)?;
        Ok(ExpansionOutcome::Restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(text: &str) -> TriggerBuffer {
        let mut buffer = TriggerBuffer::default();
        for c in text.chars() {
            buffer.push(c);
        }
        buffer
    }

    #[test]
    fn first_registered_wins_by_default() {
        let snippets = vec![Snippet::new("short", "em", "1"), Snippet::new("long", ";;em", "2")];
        let buffer = buffer_with("x;;em");
        let found = find_match(&buffer, &snippets, TriggerPrecedence::FirstRegistered);
        assert_eq!(found.map(|s| s.name.as_str()), Some("short"));
    }

    #[test]
    fn longest_match_prefers_longer_trigger() {
        let snippets = vec![Snippet::new("short", "em", "1"), Snippet::new("long", ";;em", "2")];
        let buffer = buffer_with("x;;em");
        let found = find_match(&buffer, &snippets, TriggerPrecedence::LongestMatch);
        assert_eq!(found.map(|s| s.name.as_str()), Some("long"));
    }

    #[test]
    fn disabled_snippets_never_match() {
        let mut snippet = Snippet::new("off", ";;x", "1");
        snippet.enabled = false;
        let buffer = buffer_with(";;x");
        assert!(find_match(&buffer, &[snippet], TriggerPrecedence::FirstRegistered).is_none());
    }
}

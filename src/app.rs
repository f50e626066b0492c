//! 应用上下文
//!
//! # 设计思路
//!
//! 不使用进程级单例：历史存储、剪贴板写入句柄、片段库、展开引擎、
//! 监控任务与持久化任务都由 `AppContext` 持有，生命周期随上下文创建与关闭。
//!
//! # 实现思路
//!
//! - 构造时从数据库加载历史与片段；损坏记录已在加载阶段跳过。
//! - `start()` 启动监控与持久化订阅；持久化订阅在每个 `HistoryEvent` 后保存快照。
//! - `shutdown()` 先停止展开引擎与监控，再做最后一次保存。
//! - 用户动作（复制 / 粘贴 / 快捷操作 / 截屏导入）统一经 `ClipboardWriter` 写剪贴板。

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::capture::{CaptureOutput, CaptureService, CaptureTarget, StaticCaptureService};
use crate::clipboard::quick_actions::{self, QuickAction};
use crate::clipboard::{
    ClipboardItem, ClipboardResource, ClipboardWriter, ItemId, MonitorHandle, PasteboardMonitor,
    Representation, RepresentationSet, classify,
};
use crate::db::{Database, LoadReport, export_history_json, import_history_json};
use crate::error::AppError;
use crate::expansion::{SnippetId, SnippetLibrary, TriggerEngine};
use crate::history::{AddOutcome, HistoryStore};
use crate::input::{InputInjector, KeyStroke};
use crate::settings::AppSettings;

#[derive(Default)]
struct Tasks {
    monitor: Option<MonitorHandle>,
    persistence: Option<JoinHandle<()>>,
    expansion: Option<JoinHandle<()>>,
}

pub struct AppContext {
    settings: AppSettings,
    store: Arc<HistoryStore>,
    writer: ClipboardWriter,
    snippets: Arc<SnippetLibrary>,
    engine: Arc<TriggerEngine>,
    injector: Arc<dyn InputInjector>,
    capture: Arc<dyn CaptureService>,
    db: Option<Arc<Database>>,
    tasks: Mutex<Tasks>,
}

impl AppContext {
    /// 组装上下文；有数据库时加载已保存的历史与片段
    pub fn new(
        settings: AppSettings,
        clipboard: Arc<dyn ClipboardResource>,
        injector: Arc<dyn InputInjector>,
        db: Option<Arc<Database>>,
    ) -> Result<Self, AppError> {
        let (history, snippets) = match &db {
            Some(db) => {
                let report = db.load_history()?;
                if report.skipped > 0 {
                    log::warn!("💾 加载历史时跳过 {} 条损坏记录", report.skipped);
                }
                log::info!("💾 已加载 {} 条历史", report.items.len());
                (report.items, db.load_snippets()?)
            }
            None => (Vec::new(), Vec::new()),
        };

        let store = Arc::new(HistoryStore::with_items(history, settings.max_history_size));
        let writer = ClipboardWriter::new(clipboard);
        let snippets = Arc::new(SnippetLibrary::with_snippets(snippets));
        let engine = Arc::new(TriggerEngine::new(
            Arc::clone(&snippets),
            writer.clone(),
            Arc::clone(&injector),
            settings.expansion_config(),
        ));
        engine.set_active(settings.expansion_enabled);

        Ok(Self {
            settings,
            store,
            writer,
            snippets,
            engine,
            injector,
            capture: Arc::new(StaticCaptureService::unavailable()),
            db,
            tasks: Mutex::new(Tasks::default()),
        })
    }

    pub fn with_capture_service(mut self, capture: Arc<dyn CaptureService>) -> Self {
        self.capture = capture;
        self
    }

    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("任务句柄锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    pub fn writer(&self) -> &ClipboardWriter {
        &self.writer
    }

    pub fn snippets(&self) -> &Arc<SnippetLibrary> {
        &self.snippets
    }

    pub fn engine(&self) -> &Arc<TriggerEngine> {
        &self.engine
    }

    /// 启动剪贴板监控与持久化订阅，须在 tokio 运行时内调用
    pub fn start(&self) -> Result<(), AppError> {
        let mut tasks = self.tasks();

        if tasks.monitor.is_none() {
            let monitor = PasteboardMonitor::new(
                self.writer.clone(),
                Arc::clone(&self.store),
                self.settings.poll_interval_ms,
            );
            tasks.monitor = Some(monitor.start()?);
        }

        if tasks.persistence.is_none() {
            if let Some(db) = &self.db {
                tasks.persistence = Some(spawn_persistence(Arc::clone(&self.store), Arc::clone(db)));
            }
        }

        Ok(())
    }

    /// 把按键通道接入展开引擎
    pub fn start_expansion(&self, keys: UnboundedReceiver<KeyStroke>) {
        let mut tasks = self.tasks();
        if tasks.expansion.is_none() {
            tasks.expansion = Some(tokio::spawn(Arc::clone(&self.engine).run(keys)));
            log::info!("⌨️ 片段展开引擎已启动");
        }
    }

    /// 停止所有后台任务并保存最终快照
    pub async fn shutdown(&self) {
        self.engine.stop();

        let (monitor, persistence, expansion) = {
            let mut tasks = self.tasks();
            (tasks.monitor.take(), tasks.persistence.take(), tasks.expansion.take())
        };

        if let Some(monitor) = monitor {
            monitor.stop().await;
        }
        if let Some(expansion) = expansion {
            let _ = expansion.await;
        }
        if let Some(persistence) = persistence {
            persistence.abort();
        }
        if let Err(err) = self.persist_history() {
            log::error!("💾 退出前保存历史失败: {}", err);
        }
    }

    fn persist_history(&self) -> Result<(), AppError> {
        match &self.db {
            Some(db) => db.save_history(&self.store.snapshot()),
            None => Ok(()),
        }
    }

    fn persist_snippets(&self) -> Result<(), AppError> {
        match &self.db {
            Some(db) => db.save_snippets(&self.snippets.list()),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // 历史条目动作
    // ------------------------------------------------------------------

    pub fn copy_item(&self, id: ItemId) -> Result<(), AppError> {
        self.store.copy_to_clipboard(id, &self.writer)
    }

    /// 复制条目并向前台应用发送粘贴组合键
    pub fn paste_item(&self, id: ItemId) -> Result<(), AppError> {
        if !self.injector.is_trusted() {
            return Err(AppError::Input("缺少输入模拟权限".to_string()));
        }
        self.copy_item(id)?;
        self.injector.paste()
    }

    /// 执行快捷操作；文本变换的结果写入剪贴板并记入历史
    pub fn apply_quick_action(&self, id: ItemId, action: QuickAction) -> Result<(), AppError> {
        let item = self
            .store
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("历史条目 {}", id)))?;

        match action {
            QuickAction::RevealInFileBrowser => {
                let path = item
                    .file_urls
                    .as_ref()
                    .and_then(|files| files.first())
                    .ok_or_else(|| AppError::Clipboard("条目没有文件引用".to_string()))?;
                quick_actions::reveal_in_file_browser(path)
            }
            QuickAction::ComposeEmail | QuickAction::CallPhone => {
                let url = quick_actions::action_url(action, &item.content)
                    .ok_or_else(|| AppError::Clipboard("条目中没有可用的地址".to_string()))?;
                quick_actions::open_with_handler(&url)
            }
            _ => {
                let text = quick_actions::apply_text_action(action, &item.content)?;
                self.writer.write(&RepresentationSet::plain(text.as_str()))?;
                self.store.add(ClipboardItem::text(text));
                Ok(())
            }
        }
    }

    /// 截屏或 OCR 的结果写入剪贴板并记入历史
    pub fn ingest_capture(&self, target: CaptureTarget, recognize_text: bool) -> Result<AddOutcome, AppError> {
        let output = if recognize_text {
            self.capture.recognize_text(target)?
        } else {
            self.capture.capture_image(target)?
        };

        let reps = match output {
            CaptureOutput::Image(bytes) => RepresentationSet::new().with(Representation::Image(bytes)),
            CaptureOutput::Text(text) => RepresentationSet::plain(text),
        };

        self.writer.write(&reps)?;
        Ok(match classify(&reps) {
            Some(item) => self.store.add(item),
            None => AddOutcome::Ignored,
        })
    }

    pub fn export_history(&self) -> Result<String, AppError> {
        export_history_json(&self.store.snapshot())
    }

    /// 用导入的记录替换当前历史，返回导入报告
    pub fn import_history(&self, json: &str) -> Result<LoadReport, AppError> {
        let report = import_history_json(json)?;
        self.store.replace_all(report.items.clone());
        log::info!("💾 导入 {} 条历史，跳过 {} 条", report.items.len(), report.skipped);
        Ok(report)
    }

    // ------------------------------------------------------------------
    // 片段管理（修改后立即保存）
    // ------------------------------------------------------------------

    pub fn add_snippet(&self, name: &str, trigger: &str, content: &str) -> Result<SnippetId, AppError> {
        let id = self.snippets.add(name, trigger, content)?;
        self.persist_snippets()?;
        Ok(id)
    }

    pub fn update_snippet(
        &self,
        id: SnippetId,
        name: &str,
        trigger: &str,
        content: &str,
    ) -> Result<(), AppError> {
        self.snippets.update(id, name, trigger, content)?;
        self.persist_snippets()
    }

    pub fn set_snippet_enabled(&self, id: SnippetId, enabled: bool) -> Result<(), AppError> {
        self.snippets.set_enabled(id, enabled)?;
        self.persist_snippets()
    }

    pub fn remove_snippet(&self, id: SnippetId) -> Result<bool, AppError> {
        let removed = self.snippets.remove(id);
        if removed {
            self.persist_snippets()?;
        }
        Ok(removed)
    }
}

/// 订阅历史事件，每次变化后在阻塞线程中保存快照
fn spawn_persistence(store: Arc<HistoryStore>, db: Arc<Database>) -> JoinHandle<()> {
    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    let snapshot = store.snapshot();
                    let db = Arc::clone(&db);
                    match tokio::task::spawn_blocking(move || db.save_history(&snapshot)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => log::error!("💾 保存历史失败: {}", err),
                        Err(err) => log::error!("💾 保存任务执行失败: {}", err),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

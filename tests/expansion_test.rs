// 片段展开的完整序列：退格、写入、粘贴、还原
use std::sync::Arc;
use std::time::Duration;

use clipstack::clipboard::{
    ClipboardResource, ClipboardWriter, MemoryClipboard, PasteboardMonitor, RepresentationSet,
};
use clipstack::error::AppError;
use clipstack::expansion::{
    BackspacePolicy, ExpansionConfig, ExpansionOutcome, SnippetLibrary, TriggerEngine,
};
use clipstack::history::HistoryStore;
use clipstack::input::{InjectedInput, InputInjector, KeyStroke, Modifiers, RecordingInjector};
use tokio::task::JoinHandle;

type ExpansionHandle = JoinHandle<Result<ExpansionOutcome, AppError>>;

struct Harness {
    clipboard: Arc<MemoryClipboard>,
    writer: ClipboardWriter,
    injector: Arc<RecordingInjector>,
    engine: TriggerEngine,
}

fn harness(config: ExpansionConfig) -> Harness {
    let clipboard = Arc::new(MemoryClipboard::new());
    clipboard.external_write(RepresentationSet::plain("original"));

    let writer = ClipboardWriter::new(clipboard.clone());
    writer.prime().expect("prime baseline");

    let library = SnippetLibrary::new();
    library.add("email", ";;em", "hello@example.com").expect("add snippet");

    let resource: Arc<dyn ClipboardResource> = clipboard.clone();
    let injector = Arc::new(RecordingInjector::observing(resource));
    let engine = TriggerEngine::new(Arc::new(library), writer.clone(), injector.clone(), config);
    Harness {
        clipboard,
        writer,
        injector,
        engine,
    }
}

fn type_text(engine: &TriggerEngine, text: &str) -> Option<ExpansionHandle> {
    let mut handle = None;
    for stroke in KeyStroke::typed(text) {
        if let Some(h) = engine.handle_key(stroke) {
            handle = Some(h);
        }
    }
    handle
}

#[tokio::test(start_paused = true)]
async fn expands_and_restores_clipboard() {
    let h = harness(ExpansionConfig::default());

    let task = type_text(&h.engine, ";;em").expect("trigger should fire");
    let outcome = task.await.expect("join").expect("expansion");

    assert_eq!(outcome, ExpansionOutcome::Restored);
    assert_eq!(
        h.injector.recorded(),
        vec![
            InjectedInput::Backspaces(4),
            InjectedInput::Paste(Some("hello@example.com".to_string())),
        ]
    );
    assert_eq!(h.clipboard.contents().plain_text(), Some("original"));
    assert_eq!(h.engine.buffer_contents(), "");
}

#[tokio::test(start_paused = true)]
async fn restore_skipped_when_user_copies_meanwhile() {
    let h = harness(ExpansionConfig::default());

    let task = type_text(&h.engine, ";;em").expect("trigger should fire");
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.clipboard.external_write(RepresentationSet::plain("copied by user"));

    let outcome = task.await.expect("join").expect("expansion");
    assert_eq!(outcome, ExpansionOutcome::RestoreSkipped);
    assert_eq!(h.clipboard.contents().plain_text(), Some("copied by user"));
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_restore() {
    let h = harness(ExpansionConfig::default());

    let task = type_text(&h.engine, ";;em").expect("trigger should fire");
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.engine.stop();

    let outcome = task.await.expect("join").expect("expansion");
    assert_eq!(outcome, ExpansionOutcome::Cancelled);
    assert_eq!(h.clipboard.contents().plain_text(), Some("hello@example.com"));
    assert!(h.engine.handle_key(KeyStroke::character('x')).is_none());
}

#[tokio::test]
async fn untrusted_injector_never_expands() {
    let h = harness(ExpansionConfig::default());
    h.injector.set_trusted(false);

    assert!(type_text(&h.engine, ";;em").is_none());
    assert!(h.injector.recorded().is_empty());
    assert_eq!(h.engine.buffer_contents(), "");
    assert_eq!(h.clipboard.contents().plain_text(), Some("original"));
}

#[tokio::test]
async fn chord_resets_buffer() {
    let h = harness(ExpansionConfig::default());

    type_text(&h.engine, ";;");
    let command = Modifiers {
        command: true,
        ..Modifiers::default()
    };
    assert!(h.engine.handle_key(KeyStroke::character('c').with_modifiers(command)).is_none());
    assert_eq!(h.engine.buffer_contents(), "");

    assert!(type_text(&h.engine, "em").is_none());
    assert!(h.injector.recorded().is_empty());
}

#[tokio::test]
async fn backspace_clears_by_default() {
    let h = harness(ExpansionConfig::default());

    type_text(&h.engine, ";;ex");
    h.engine.handle_key(KeyStroke::backspace());
    assert_eq!(h.engine.buffer_contents(), "");
    assert!(type_text(&h.engine, "m").is_none());
}

#[tokio::test(start_paused = true)]
async fn backspace_pop_one_allows_correction() {
    let h = harness(ExpansionConfig {
        backspace_policy: BackspacePolicy::PopOne,
        ..ExpansionConfig::default()
    });

    type_text(&h.engine, ";;ex");
    h.engine.handle_key(KeyStroke::backspace());
    assert_eq!(h.engine.buffer_contents(), ";;e");

    let task = type_text(&h.engine, "m").expect("corrected trigger should fire");
    assert_eq!(task.await.expect("join").expect("expansion"), ExpansionOutcome::Restored);
}

#[tokio::test(start_paused = true)]
async fn overlapping_expansions_restore_user_clipboard() {
    let h = harness(ExpansionConfig::default());

    let first = type_text(&h.engine, ";;em").expect("first trigger should fire");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = type_text(&h.engine, " ;;em").expect("second trigger should fire");

    assert_eq!(first.await.expect("join").expect("expansion"), ExpansionOutcome::Restored);
    assert_eq!(second.await.expect("join").expect("expansion"), ExpansionOutcome::Restored);
    assert_eq!(h.clipboard.contents().plain_text(), Some("original"));

    let pasted = InjectedInput::Paste(Some("hello@example.com".to_string()));
    assert_eq!(
        h.injector.recorded(),
        vec![
            InjectedInput::Backspaces(4),
            pasted.clone(),
            InjectedInput::Backspaces(4),
            pasted,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn expansion_writes_are_not_recorded_in_history() {
    let h = harness(ExpansionConfig::default());
    let store = Arc::new(HistoryStore::new(50));
    let monitor = PasteboardMonitor::new(h.writer.clone(), store.clone(), 500);

    let task = type_text(&h.engine, ";;em").expect("trigger should fire");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(monitor.poll_once().expect("poll during restore delay"), None);

    assert_eq!(task.await.expect("join").expect("expansion"), ExpansionOutcome::Restored);
    assert_eq!(monitor.poll_once().expect("poll after restore"), None);
    assert!(store.is_empty());
}

/// 粘贴总是失败的注入器
struct FailingPaste;

impl InputInjector for FailingPaste {
    fn is_trusted(&self) -> bool {
        true
    }

    fn backspaces(&self, _count: usize) -> Result<(), AppError> {
        Ok(())
    }

    fn paste(&self) -> Result<(), AppError> {
        Err(AppError::Input("paste rejected".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn failed_paste_still_restores_clipboard() {
    let clipboard = Arc::new(MemoryClipboard::new());
    clipboard.external_write(RepresentationSet::plain("original"));
    let writer = ClipboardWriter::new(clipboard.clone());
    writer.prime().expect("prime baseline");

    let library = SnippetLibrary::new();
    library.add("email", ";;em", "hello@example.com").expect("add snippet");
    let engine = TriggerEngine::new(
        Arc::new(library),
        writer,
        Arc::new(FailingPaste),
        ExpansionConfig::default(),
    );

    let task = type_text(&engine, ";;em").expect("trigger should fire");
    let result = task.await.expect("join");

    assert!(matches!(result, Err(AppError::Input(_))));
    assert_eq!(clipboard.contents().plain_text(), Some("original"));
}

#[tokio::test(start_paused = true)]
async fn pop_one_matches_when_backspace_reveals_trigger() {
    let h = harness(ExpansionConfig {
        backspace_policy: BackspacePolicy::PopOne,
        ..ExpansionConfig::default()
    });

    assert!(type_text(&h.engine, ";;emx").is_none());
    let task = h.engine.handle_key(KeyStroke::backspace()).expect("trigger revealed by backspace");

    assert_eq!(task.await.expect("join").expect("expansion"), ExpansionOutcome::Restored);
    assert_eq!(h.injector.recorded()[0], InjectedInput::Backspaces(4));
}

// 轮询监控：自写抑制、外部变化捕获、停止语义
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clipstack::clipboard::{
    ClipboardWriter, ItemType, MemoryClipboard, PasteboardMonitor, Representation,
    RepresentationSet,
};
use clipstack::history::{AddOutcome, HistoryStore};

fn setup(interval_ms: u64) -> (Arc<MemoryClipboard>, ClipboardWriter, Arc<HistoryStore>, PasteboardMonitor) {
    let clipboard = Arc::new(MemoryClipboard::new());
    let writer = ClipboardWriter::new(clipboard.clone());
    let store = Arc::new(HistoryStore::new(50));
    let monitor = PasteboardMonitor::new(writer.clone(), store.clone(), interval_ms);
    (clipboard, writer, store, monitor)
}

#[test]
fn copy_then_poll_does_not_duplicate() {
    let (clipboard, writer, store, monitor) = setup(500);
    writer.prime().expect("prime baseline");

    clipboard.external_write(RepresentationSet::plain("first"));
    assert!(matches!(monitor.poll_once().expect("poll"), Some(AddOutcome::Inserted(_))));
    clipboard.external_write(RepresentationSet::plain("second"));
    monitor.poll_once().expect("poll");

    let first_id = store.snapshot()[1].id;
    store.copy_to_clipboard(first_id, &writer).expect("copy");
    assert_eq!(monitor.poll_once().expect("poll"), None);

    let contents: Vec<String> = store.snapshot().iter().map(|i| i.content.clone()).collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[test]
fn unclassifiable_payload_is_dropped() {
    let (clipboard, writer, store, monitor) = setup(500);
    writer.prime().expect("prime baseline");

    clipboard.external_write(RepresentationSet::plain("   \n"));
    assert_eq!(monitor.poll_once().expect("poll"), None);
    assert!(store.is_empty());
}

#[test]
fn file_copy_is_classified() {
    let (clipboard, writer, store, monitor) = setup(500);
    writer.prime().expect("prime baseline");

    clipboard.external_write(
        RepresentationSet::new()
            .with(Representation::FileUrls(vec![PathBuf::from("/tmp/report.pdf")]))
            .with(Representation::PlainText("report.pdf".into())),
    );
    monitor.poll_once().expect("poll");

    let item = store.snapshot()[0].clone();
    assert_eq!(item.item_type, ItemType::File);
    assert_eq!(item.content, "report.pdf");
}

#[tokio::test(start_paused = true)]
async fn background_loop_captures_external_changes() {
    let (clipboard, _writer, store, monitor) = setup(100);
    clipboard.external_write(RepresentationSet::plain("before start"));
    let handle = monitor.start().expect("start monitor");

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(store.is_empty(), "content present at start is not captured");

    clipboard.external_write(RepresentationSet::plain("https://example.com"));
    tokio::time::sleep(Duration::from_millis(250)).await;

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].item_type, ItemType::Url);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_capture_after_stop() {
    let (clipboard, _writer, store, monitor) = setup(100);
    let handle = monitor.start().expect("start monitor");
    handle.stop().await;

    clipboard.external_write(RepresentationSet::plain("too late"));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.is_empty());
}

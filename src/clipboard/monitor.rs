//! 剪贴板轮询监控
//!
//! 外部剪贴板没有推送通知，只有单调递增的变更计数。监控器按固定间隔
//! 比较计数，变化时读取一次全部表示、分类并写入历史。
//! 读取失败按指数退避重试（100ms 起，5s 封顶），不会空转。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::history::{AddOutcome, HistoryStore};

use super::classifier::classify;
use super::item::ClipboardItem;
use super::ClipboardWriter;

pub const POLL_INTERVAL_DEFAULT_MS: u64 = 500;
pub const POLL_INTERVAL_MIN_MS: u64 = 50;
pub const POLL_INTERVAL_MAX_MS: u64 = 5_000;
const READ_RETRY_BASE_DELAY_MS: u64 = 100;
const READ_RETRY_MAX_DELAY_MS: u64 = 5_000;

pub fn normalize_poll_interval_ms(value_ms: u64) -> u64 {
    value_ms.clamp(POLL_INTERVAL_MIN_MS, POLL_INTERVAL_MAX_MS)
}

fn compute_retry_backoff_ms(failures: u32) -> u64 {
    let exp = 1_u64 << failures.saturating_sub(1).min(6);
    READ_RETRY_BASE_DELAY_MS
        .saturating_mul(exp)
        .min(READ_RETRY_MAX_DELAY_MS)
}

pub struct PasteboardMonitor {
    writer: ClipboardWriter,
    store: Arc<HistoryStore>,
    interval: Duration,
}

impl PasteboardMonitor {
    pub fn new(writer: ClipboardWriter, store: Arc<HistoryStore>, interval_ms: u64) -> Self {
        Self {
            writer,
            store,
            interval: Duration::from_millis(normalize_poll_interval_ms(interval_ms)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 检测外部变化并分类，不修改历史
    fn detect(&self) -> Result<Option<ClipboardItem>, AppError> {
        let Some(reps) = self.writer.detect_change_and_read()? else {
            return Ok(None);
        };

        match classify(&reps) {
            Some(item) => Ok(Some(item)),
            None => {
                log::debug!("📋 剪贴板内容无可识别的表示，已忽略: {:?}", reps.kinds());
                Ok(None)
            }
        }
    }

    fn record(&self, item: ClipboardItem) -> AddOutcome {
        log::debug!(
            "📋 捕获 {} 条目（{} 字符）",
            item.item_type.as_str(),
            item.content.chars().count()
        );
        self.store.add(item)
    }

    /// 执行一次轮询
    ///
    /// 无变化、自身写入或无法分类时返回 `Ok(None)`。
    pub fn poll_once(&self) -> Result<Option<AddOutcome>, AppError> {
        Ok(self.detect()?.map(|item| self.record(item)))
    }

    /// 建立基线并在后台任务中开始轮询
    ///
    /// 启动时剪贴板里已有的内容不会被捕获。
    pub fn start(self) -> Result<MonitorHandle, AppError> {
        let baseline = self.writer.prime()?;
        log::info!(
            "📋 剪贴板监控已启动，间隔 {}ms，基线计数 {}",
            self.interval.as_millis(),
            baseline
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        Ok(MonitorHandle { cancel, task })
    }

    async fn run(self, cancel: CancellationToken) {
        let mut failures: u32 = 0;

        loop {
            let wait = if failures == 0 {
                self.interval
            } else {
                self.interval + Duration::from_millis(compute_retry_backoff_ms(failures))
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            match self.detect() {
                Ok(Some(item)) => {
                    failures = 0;
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.record(item);
                }
                Ok(None) => failures = 0,
                Err(err) => {
                    failures = failures.saturating_add(1);
                    log::warn!(
                        "📋 读取剪贴板失败（第 {} 次），{}ms 后重试: {}",
                        failures,
                        compute_retry_backoff_ms(failures),
                        err
                    );
                }
            }
        }

        log::info!("📋 剪贴板监控已停止");
    }
}

/// 运行中的监控任务
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// 取消并等待任务退出；返回后不会再有轮询修改历史
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            log::error!("📋 剪贴板监控任务异常退出: {}", err);
        }
    }
}

//! # clipstack: 应用入口
//!
//! 本文件仅负责初始化日志、加载设置、组装 `AppContext` 并等待退出信号。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::sync::Arc;

use clipstack::app::AppContext;
use clipstack::clipboard::arboard_backend::ArboardClipboard;
use clipstack::clipboard::{ClipboardResource, MemoryClipboard, tagger};
use clipstack::db::Database;
use clipstack::error::AppError;
use clipstack::input::EnigoInjector;
use clipstack::settings;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("启动失败: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // 正则写错时在启动阶段直接失败
    tagger::ensure_patterns_compiled();

    let data_dir = settings::resolve_data_dir()?;
    let app_settings = settings::load_settings_from_path(&settings::settings_file_path(&data_dir));
    log::info!("setup: 数据目录 {}", data_dir.display());

    let db = match Database::open(&app_settings.db_path(&data_dir)?) {
        Ok(db) => Some(Arc::new(db)),
        Err(err) => {
            log::error!("setup: 数据库初始化失败，历史将不会保存: {err}");
            None
        }
    };

    let clipboard: Arc<dyn ClipboardResource> = match ArboardClipboard::new() {
        Ok(clipboard) => Arc::new(clipboard),
        Err(err) => {
            log::error!("setup: 无法访问系统剪贴板，改用进程内剪贴板: {err}");
            Arc::new(MemoryClipboard::new())
        }
    };

    let app = AppContext::new(app_settings, clipboard, Arc::new(EnigoInjector::new()), db)?;
    app.start()?;

    #[cfg(feature = "global-hook")]
    {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        clipstack::input::spawn_global_listener(tx);
        app.start_expansion(rx);
    }
    #[cfg(not(feature = "global-hook"))]
    log::info!("⌨️ 未启用 global-hook 特性，片段展开不会接收按键");

    tokio::signal::ctrl_c().await?;
    log::info!("收到退出信号，正在关闭");
    app.shutdown().await;
    Ok(())
}

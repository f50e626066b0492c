//! 应用设置
//!
//! 设置保存在数据目录下的 `settings.json`（camelCase 字段）。
//! 文件缺失时使用默认值；文件损坏时记录警告并回退默认值，不阻止启动。
//! 读取后统一做数值归一化（轮询间隔、缓冲区长度等夹到合法范围）。
//! `dataDir` 只影响数据库位置，设置文件本身始终位于默认数据目录。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::clipboard::monitor::{POLL_INTERVAL_DEFAULT_MS, normalize_poll_interval_ms};
use crate::error::AppError;
use crate::expansion::{
    BackspacePolicy, DEFAULT_BUFFER_LEN, DEFAULT_PASTE_SETTLE_MS, DEFAULT_RESTORE_DELAY_MS,
    ExpansionConfig, TriggerPrecedence,
};
use crate::history::DEFAULT_MAX_HISTORY_SIZE;

/// 覆盖默认数据目录的环境变量
pub const DATA_DIR_ENV: &str = "CLIPSTACK_DATA_DIR";

const SETTINGS_FILE_NAME: &str = "settings.json";
const DB_FILE_NAME: &str = "clipstack.db";

const TRIGGER_BUFFER_MIN_LEN: usize = 8;
const TRIGGER_BUFFER_MAX_LEN: usize = 256;
const RESTORE_DELAY_MIN_MS: u64 = 50;
const RESTORE_DELAY_MAX_MS: u64 = 5_000;
const PASTE_SETTLE_MAX_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// 0 表示不限制
    pub max_history_size: usize,
    pub poll_interval_ms: u64,
    pub trigger_buffer_len: usize,
    pub restore_delay_ms: u64,
    pub paste_settle_ms: u64,
    pub expansion_enabled: bool,
    pub backspace_policy: BackspacePolicy,
    pub trigger_precedence: TriggerPrecedence,
    /// 自定义数据库目录
    pub data_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            poll_interval_ms: POLL_INTERVAL_DEFAULT_MS,
            trigger_buffer_len: DEFAULT_BUFFER_LEN,
            restore_delay_ms: DEFAULT_RESTORE_DELAY_MS,
            paste_settle_ms: DEFAULT_PASTE_SETTLE_MS,
            expansion_enabled: true,
            backspace_policy: BackspacePolicy::default(),
            trigger_precedence: TriggerPrecedence::default(),
            data_dir: None,
        }
    }
}

impl AppSettings {
    /// 把数值字段夹到合法范围
    pub fn normalized(mut self) -> Self {
        self.poll_interval_ms = normalize_poll_interval_ms(self.poll_interval_ms);
        self.trigger_buffer_len = self
            .trigger_buffer_len
            .clamp(TRIGGER_BUFFER_MIN_LEN, TRIGGER_BUFFER_MAX_LEN);
        self.restore_delay_ms = self
            .restore_delay_ms
            .clamp(RESTORE_DELAY_MIN_MS, RESTORE_DELAY_MAX_MS);
        self.paste_settle_ms = self.paste_settle_ms.min(PASTE_SETTLE_MAX_MS);
        if self.data_dir.as_ref().is_some_and(|dir| dir.as_os_str().is_empty()) {
            self.data_dir = None;
        }
        self
    }

    pub fn expansion_config(&self) -> ExpansionConfig {
        ExpansionConfig {
            buffer_len: self.trigger_buffer_len,
            restore_delay: Duration::from_millis(self.restore_delay_ms),
            paste_settle: Duration::from_millis(self.paste_settle_ms),
            backspace_policy: self.backspace_policy,
            precedence: self.trigger_precedence,
        }
    }

    /// 数据库文件路径：优先 `dataDir`，否则默认数据目录
    pub fn db_path(&self, default_data_dir: &Path) -> Result<PathBuf, AppError> {
        let dir = self.data_dir.as_deref().unwrap_or(default_data_dir);
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Storage(format!("创建数据目录 '{}' 失败: {}", dir.display(), e)))?;
        Ok(dir.join(DB_FILE_NAME))
    }
}

/// 默认数据目录：环境变量优先，否则平台约定目录
pub fn resolve_data_dir() -> Result<PathBuf, AppError> {
    let dir = match std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => ProjectDirs::from("com", "clipstack", "clipstack")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| AppError::Storage("无法确定用户数据目录".to_string()))?,
    };
    fs::create_dir_all(&dir)
        .map_err(|e| AppError::Storage(format!("创建应用数据目录失败: {}", e)))?;
    Ok(dir)
}

pub fn settings_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE_NAME)
}

/// 读取设置；缺失或损坏时回退默认值
pub fn load_settings_from_path(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str::<AppSettings>(&content).map_err(|e| e.to_string()));

    match parsed {
        Ok(settings) => settings.normalized(),
        Err(err) => {
            log::warn!("设置文件无效，使用默认设置: {}", err);
            AppSettings::default()
        }
    }
}

pub fn save_settings_to_path(path: &Path, settings: &AppSettings) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Config(format!("序列化设置失败: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}

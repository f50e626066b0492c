use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

use crate::clipboard::ClipboardResource;
use crate::error::AppError;

/// 合成键盘输入的能力
///
/// 没有辅助功能权限时 `is_trusted` 返回 `false`，调用方应直接放弃注入。
pub trait InputInjector: Send + Sync {
    fn is_trusted(&self) -> bool;

    /// 连续发送 `count` 次退格
    fn backspaces(&self, count: usize) -> Result<(), AppError>;

    /// 发送平台粘贴组合键（macOS 为 Cmd+V，其余为 Ctrl+V）
    fn paste(&self) -> Result<(), AppError>;
}

/// 基于 enigo 的系统输入注入
///
/// 每次调用都新建 `Enigo` 连接，避免跨线程持有平台句柄。
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoInjector;

impl EnigoInjector {
    pub fn new() -> Self {
        Self
    }

    fn connect() -> Result<Enigo, AppError> {
        Enigo::new(&Settings::default())
            .map_err(|e| AppError::Input(format!("初始化输入模拟失败: {}", e)))
    }
}

impl InputInjector for EnigoInjector {
    fn is_trusted(&self) -> bool {
        match Self::connect() {
            Ok(_) => true,
            Err(err) => {
                log::debug!("⌨️ 输入模拟不可用: {}", err);
                false
            }
        }
    }

    fn backspaces(&self, count: usize) -> Result<(), AppError> {
        let mut enigo = Self::connect()?;
        for _ in 0..count {
            enigo
                .key(Key::Backspace, Click)
                .map_err(|e| AppError::Input(format!("模拟退格失败: {}", e)))?;
        }
        Ok(())
    }

    fn paste(&self) -> Result<(), AppError> {
        let mut enigo = Self::connect()?;

        #[cfg(target_os = "macos")]
        {
            enigo
                .key(Key::Meta, Press)
                .and_then(|_| enigo.key(Key::Unicode('v'), Click))
                .and_then(|_| enigo.key(Key::Meta, Release))
                .map_err(|e| AppError::Input(format!("模拟粘贴失败: {}", e)))?;
        }

        #[cfg(not(target_os = "macos"))]
        {
            enigo
                .key(Key::Control, Press)
                .and_then(|_| enigo.key(Key::Unicode('v'), Click))
                .and_then(|_| enigo.key(Key::Control, Release))
                .map_err(|e| AppError::Input(format!("模拟粘贴失败: {}", e)))?;
        }

        Ok(())
    }
}

/// `RecordingInjector` 记录下的一次注入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedInput {
    Backspaces(usize),
    /// 粘贴时剪贴板中的纯文本（未关联剪贴板时为 `None`）
    Paste(Option<String>),
}

/// 只记录、不真正注入的替身，用于测试与无头运行
pub struct RecordingInjector {
    trusted: AtomicBool,
    log: Mutex<Vec<InjectedInput>>,
    clipboard: Option<Arc<dyn ClipboardResource>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self {
            trusted: AtomicBool::new(true),
            log: Mutex::new(Vec::new()),
            clipboard: None,
        }
    }

    /// 粘贴时同时记下剪贴板里的文本
    pub fn observing(clipboard: Arc<dyn ClipboardResource>) -> Self {
        Self {
            clipboard: Some(clipboard),
            ..Self::new()
        }
    }

    pub fn set_trusted(&self, trusted: bool) {
        self.trusted.store(trusted, Ordering::SeqCst);
    }

    fn log(&self) -> MutexGuard<'_, Vec<InjectedInput>> {
        match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn recorded(&self) -> Vec<InjectedInput> {
        self.log().clone()
    }
}

impl InputInjector for RecordingInjector {
    fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::SeqCst)
    }

    fn backspaces(&self, count: usize) -> Result<(), AppError> {
        self.log().push(InjectedInput::Backspaces(count));
        Ok(())
    }

    fn paste(&self) -> Result<(), AppError> {
        let pasted = match &self.clipboard {
            Some(clipboard) => clipboard.read()?.plain_text().map(str::to_string),
            None => None,
        };
        self.log().push(InjectedInput::Paste(pasted));
        Ok(())
    }
}

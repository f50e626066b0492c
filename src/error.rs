//! 错误类型
//!
//! 剪贴板、输入注入、持久化、片段校验与截屏服务的失败都归入 `AppError`，
//! 公开的可失败操作一律返回 `Result<T, AppError>`，调用方用 `?` 传播。
//!
//! `io::Error` 与 `CaptureError` 可直接 `?` 转换；其余后端错误在边界处
//! 以 `AppError::Xxx(format!("...: {}", e))` 的形式带上上下文。
//! `Serialize` 输出错误消息字符串，供需要跨进程传递错误的调用方使用。

use serde::Serialize;

use crate::capture::CaptureError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 输入模拟失败（退格 / 粘贴组合键）
    #[error("输入模拟失败: {0}")]
    Input(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 数据库操作失败
    #[error("数据库错误: {0}")]
    Database(String),

    /// 设置文件读写失败
    #[error("配置错误: {0}")]
    Config(String),

    /// 片段（snippet）校验失败，如触发词冲突
    #[error("片段错误: {0}")]
    Snippet(String),

    /// OCR / 截屏服务返回的类型化错误
    #[error("{0}")]
    Capture(#[from] CaptureError),

    /// 按 id 查找的条目不存在
    #[error("条目不存在: {0}")]
    NotFound(String),
}

/// 序列化为错误消息字符串
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

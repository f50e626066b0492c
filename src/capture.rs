//! 截屏 / OCR 服务接口
//!
//! 截屏与文字识别由平台服务提供，本模块只定义调用约定：
//! 成功时返回图片或识别出的文本，失败时返回类型化的 `CaptureError`，
//! 由 `AppContext::ingest_capture` 写入剪贴板并记录到历史。

use serde::Serialize;

/// 截取范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    /// 用户框选的区域
    Area,
    Window,
    FullScreen,
}

/// 服务产出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutput {
    /// 已编码的图片字节（PNG）
    Image(Vec<u8>),
    /// OCR 识别出的文本
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("没有可用的显示器")]
    NoDisplay,

    #[error("未识别到文字")]
    NoTextFound,

    #[error("文字识别失败: {0}")]
    RecognitionFailed(String),

    #[error("缺少屏幕录制权限")]
    PermissionDenied,

    #[error("截屏失败: {0}")]
    CaptureFailed(String),
}

impl Serialize for CaptureError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// 平台截屏 / OCR 服务
pub trait CaptureService: Send + Sync {
    fn capture_image(&self, target: CaptureTarget) -> Result<CaptureOutput, CaptureError>;

    fn recognize_text(&self, target: CaptureTarget) -> Result<CaptureOutput, CaptureError>;
}

/// 预设结果的服务替身，未接入平台服务时也作为默认实现
#[derive(Debug, Clone)]
pub struct StaticCaptureService {
    result: Result<CaptureOutput, CaptureError>,
}

impl StaticCaptureService {
    pub fn returning(result: Result<CaptureOutput, CaptureError>) -> Self {
        Self { result }
    }

    /// 没有平台服务时的默认行为
    pub fn unavailable() -> Self {
        Self::returning(Err(CaptureError::NoDisplay))
    }
}

impl CaptureService for StaticCaptureService {
    fn capture_image(&self, _target: CaptureTarget) -> Result<CaptureOutput, CaptureError> {
        self.result.clone()
    }

    fn recognize_text(&self, _target: CaptureTarget) -> Result<CaptureOutput, CaptureError> {
        match &self.result {
            Ok(CaptureOutput::Text(text)) if text.trim().is_empty() => Err(CaptureError::NoTextFound),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn blank_recognition_is_no_text_found() {
        let service = StaticCaptureService::returning(Ok(CaptureOutput::Text("  ".into())));
        assert_eq!(service.recognize_text(CaptureTarget::Area), Err(CaptureError::NoTextFound));
    }

    #[test]
    fn capture_errors_convert_into_app_error() {
        let err: AppError = CaptureError::PermissionDenied.into();
        assert!(matches!(err, AppError::Capture(CaptureError::PermissionDenied)));
        assert_eq!(err.to_string(), "缺少屏幕录制权限");
    }
}

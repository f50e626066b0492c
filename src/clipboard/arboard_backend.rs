//! 基于 `arboard` 的系统剪贴板适配
//!
//! `arboard` 不提供原生的变更计数，这里用内容指纹合成：
//! 每次查询时对文本、图片与文件列表做 SHA-256，指纹变化即计数加一。
//! 自身写入后立即重算指纹并推进计数，与 `ClipboardWriter` 的登记保持一致。
//! 内容完全相同的外部重复复制不会推进计数，这与历史去重的结果一致。

use std::borrow::Cow;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use arboard::{Clipboard, ImageData};
use image::{ImageFormat, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::AppError;

use super::representation::{ClipboardResource, Representation, RepresentationSet};

#[derive(Debug, Default)]
struct FingerprintState {
    change_count: u64,
    fingerprint: Option<[u8; 32]>,
}

/// 原始读取结果，图片保持 RGBA 以便计算指纹
#[derive(Default)]
struct RawContents {
    text: Option<String>,
    image: Option<ImageData<'static>>,
    files: Option<Vec<PathBuf>>,
}

pub struct ArboardClipboard {
    clipboard: Mutex<Clipboard>,
    state: Mutex<FingerprintState>,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, AppError> {
        let clipboard = Clipboard::new().map_err(|e| AppError::Clipboard(e.to_string()))?;
        Ok(Self {
            clipboard: Mutex::new(clipboard),
            state: Mutex::new(FingerprintState::default()),
        })
    }

    fn clipboard(&self) -> MutexGuard<'_, Clipboard> {
        match self.clipboard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("系统剪贴板句柄锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, FingerprintState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("剪贴板指纹锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    fn read_raw(&self) -> RawContents {
        let mut clipboard = self.clipboard();
        let files = clipboard
            .get()
            .file_list()
            .ok()
            .filter(|files| !files.is_empty());
        let image = clipboard.get_image().ok().map(|image| ImageData {
            width: image.width,
            height: image.height,
            bytes: Cow::Owned(image.bytes.into_owned()),
        });
        let text = clipboard.get_text().ok();
        RawContents { text, image, files }
    }

    /// 读取并推进计数；指纹未变时计数不变
    fn observe(&self) -> RawContents {
        let raw = self.read_raw();
        let fingerprint = fingerprint(&raw);
        let mut state = self.state();
        if state.fingerprint != Some(fingerprint) {
            state.fingerprint = Some(fingerprint);
            state.change_count += 1;
        }
        raw
    }
}

fn fingerprint(raw: &RawContents) -> [u8; 32] {
    let mut hasher = Sha256::new();
    if let Some(text) = &raw.text {
        hasher.update(b"text:");
        hasher.update(text.as_bytes());
    }
    if let Some(image) = &raw.image {
        hasher.update(b"image:");
        hasher.update((image.width as u64).to_le_bytes());
        hasher.update((image.height as u64).to_le_bytes());
        hasher.update(&image.bytes);
    }
    if let Some(files) = &raw.files {
        hasher.update(b"files:");
        for file in files {
            hasher.update(file.to_string_lossy().as_bytes());
            hasher.update([0]);
        }
    }
    hasher.finalize().into()
}

fn encode_png(image: &ImageData<'_>) -> Option<Vec<u8>> {
    let rgba = RgbaImage::from_raw(image.width as u32, image.height as u32, image.bytes.to_vec())?;
    let mut buffer = Cursor::new(Vec::new());
    match rgba.write_to(&mut buffer, ImageFormat::Png) {
        Ok(()) => Some(buffer.into_inner()),
        Err(err) => {
            log::warn!("剪贴板图片编码 PNG 失败: {}", err);
            None
        }
    }
}

fn decode_to_image_data(bytes: &[u8]) -> Result<ImageData<'static>, AppError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| AppError::Clipboard(format!("解码图片失败: {}", e)))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData {
        width: width as usize,
        height: height as usize,
        bytes: Cow::Owned(rgba.into_raw()),
    })
}

impl ClipboardResource for ArboardClipboard {
    fn change_count(&self) -> Result<u64, AppError> {
        self.observe();
        Ok(self.state().change_count)
    }

    fn read(&self) -> Result<RepresentationSet, AppError> {
        let raw = self.read_raw();
        let mut reps = RepresentationSet::new();

        if let Some(image) = raw.image.as_ref().and_then(encode_png) {
            reps.push(Representation::Image(image));
        }
        if let Some(files) = raw.files {
            reps.push(Representation::FileUrls(files));
        }
        if let Some(text) = raw.text {
            reps.push(Representation::PlainText(text));
        }
        Ok(reps)
    }

    fn write(&self, reps: &RepresentationSet) -> Result<u64, AppError> {
        {
            let mut clipboard = self.clipboard();
            if let Some(bytes) = reps.image() {
                clipboard
                    .set_image(decode_to_image_data(bytes)?)
                    .map_err(|e| AppError::Clipboard(e.to_string()))?;
            } else if let Some(text) = reps.plain_text().or(reps.url()) {
                clipboard
                    .set_text(text.to_string())
                    .map_err(|e| AppError::Clipboard(e.to_string()))?;
            } else if let Some(files) = reps.file_urls() {
                // 文件引用以换行分隔的路径文本写回
                let joined = files
                    .iter()
                    .map(|f| f.to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                clipboard
                    .set_text(joined)
                    .map_err(|e| AppError::Clipboard(e.to_string()))?;
            } else if reps.is_empty() {
                clipboard.clear().map_err(|e| AppError::Clipboard(e.to_string()))?;
            }
        }

        let fingerprint = fingerprint(&self.read_raw());
        let mut state = self.state();
        state.fingerprint = Some(fingerprint);
        state.change_count += 1;
        Ok(state.change_count)
    }
}

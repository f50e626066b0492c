//! 载荷分类模块
//!
//! # 设计思路
//!
//! 一次复制可能同时放入多种表示（例如浏览器复制图片时附带 URL 与文本）。
//! 本模块把“可用表示集合”映射为唯一的规范条目，按固定优先级取第一个命中：
//!
//! 1. 图片字节 → `Image`，描述取像素尺寸
//! 2. 文件引用 → 单个图片扩展名文件归为 `Image`（保留文件引用），否则 `File`
//! 3. 专用 URL 表示 → `Url`
//! 4. RTF 且提取出的纯文本非空 → `Rtf`
//! 5. 纯文本 → 可解析为带 scheme 的 URL 时为 `Url`，否则 `Text`
//! 6. 均未命中 → `None`，调用方静默丢弃
//!
//! # 实现思路
//!
//! - 纯函数，相同输入得到相同的类型与字段（`id` / `timestamp` 除外）。
//! - 图片尺寸只解析文件头（`ImageReader::into_dimensions`），不做整图解码。
//! - RTF 纯文本提取为一个小型状态机：跳过控制字与目标组，解码转义。

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageReader;
use url::Url;

use super::item::{ClipboardItem, ItemType};
use super::representation::RepresentationSet;

/// 被视为图片的文件扩展名（小写）
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif", "ico", "svg",
];

/// 对一次读取到的表示集合分类
pub fn classify(reps: &RepresentationSet) -> Option<ClipboardItem> {
    let item = classify_inner(reps)?;
    Some(item.with_source_app(reps.source_app.clone()))
}

fn classify_inner(reps: &RepresentationSet) -> Option<ClipboardItem> {
    if let Some(bytes) = reps.image().filter(|b| !b.is_empty()) {
        return Some(
            ClipboardItem::new(ItemType::Image, describe_image(bytes)).with_image_bytes(bytes.to_vec()),
        );
    }

    if let Some(files) = reps.file_urls().filter(|f| !f.is_empty()) {
        return Some(classify_files(files));
    }

    if let Some(url) = reps.url().map(str::trim).filter(|u| !u.is_empty()) {
        return Some(ClipboardItem::new(ItemType::Url, url));
    }

    if let Some(rtf) = reps.rich_text() {
        let plain = extract_rtf_text(rtf);
        if !plain.is_empty() {
            return Some(ClipboardItem::new(ItemType::Rtf, plain).with_rich_text(rtf.to_vec()));
        }
    }

    if let Some(text) = reps.plain_text().filter(|t| !t.trim().is_empty()) {
        let item_type = if is_url_with_scheme(text.trim()) {
            ItemType::Url
        } else {
            ItemType::Text
        };
        let content = match item_type {
            ItemType::Url => text.trim().to_string(),
            _ => text.to_string(),
        };
        return Some(ClipboardItem::new(item_type, content));
    }

    None
}

fn classify_files(files: &[PathBuf]) -> ClipboardItem {
    if let [single] = files {
        if has_image_extension(single) {
            return ClipboardItem::new(ItemType::Image, file_name(single))
                .with_file_urls(files.to_vec());
        }
    }

    let names: Vec<String> = files.iter().map(|f| file_name(f)).collect();
    ClipboardItem::new(ItemType::File, names.join(", ")).with_file_urls(files.to_vec())
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// 由图片头部得到描述文本，例如 `Image 800×600`
pub fn describe_image(bytes: &[u8]) -> String {
    let dimensions = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    match dimensions {
        Some((width, height)) => format!("Image {}×{}", width, height),
        None => match infer::get(bytes) {
            Some(kind) => format!("Image ({})", kind.mime_type()),
            None => "Image".to_string(),
        },
    }
}

/// 判断字符串是否为带 scheme 的绝对 URL
///
/// 要求无空白，且带主机名或属于 `mailto` / `tel` / `file` 这类无主机 scheme，
/// 避免把 `note:xxx`、`localhost:8080` 之类的文本误判为链接。
pub fn is_url_with_scheme(text: &str) -> bool {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(text) {
        Ok(url) => url.has_host() || matches!(url.scheme(), "mailto" | "tel" | "file"),
        Err(_) => false,
    }
}

/// RTF 中内容不可见、需整体跳过的目标组
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "fldinst",
    "expandedcolortbl",
];

/// 从 RTF 字节中提取纯文本
pub fn extract_rtf_text(bytes: &[u8]) -> String {
    let source = String::from_utf8_lossy(bytes);
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut out = String::new();
    // 每层组是否处于跳过状态，子组继承父组
    let mut skip_stack: Vec<bool> = vec![false];
    let mut i = 0;

    while i < len {
        let skipping = skip_stack.last().copied().unwrap_or(false);
        match chars[i] {
            '{' => {
                skip_stack.push(skipping);
                i += 1;
            }
            '}' => {
                if skip_stack.len() > 1 {
                    skip_stack.pop();
                }
                i += 1;
            }
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };

                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < len && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();

                    let param_start = i;
                    if i < len && (chars[i] == '-' || chars[i].is_ascii_digit()) {
                        i += 1;
                        while i < len && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                    let param: Option<i32> = if param_start < i {
                        chars[param_start..i].iter().collect::<String>().parse().ok()
                    } else {
                        None
                    };
                    if i < len && chars[i] == ' ' {
                        i += 1;
                    }

                    if SKIPPED_DESTINATIONS.contains(&word.as_str()) {
                        if let Some(top) = skip_stack.last_mut() {
                            *top = true;
                        }
                        continue;
                    }
                    if skipping {
                        continue;
                    }

                    match word.as_str() {
                        "par" | "line" => out.push('\n'),
                        "tab" => out.push('\t'),
                        "emdash" => out.push('—'),
                        "endash" => out.push('–'),
                        "bullet" => out.push('•'),
                        "lquote" | "rquote" => out.push('\''),
                        "ldblquote" | "rdblquote" => out.push('"'),
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65_536 } else { code };
                                if let Some(ch) = char::from_u32(code as u32) {
                                    out.push(ch);
                                }
                                i = skip_unicode_fallback(&chars, i);
                            }
                        }
                        _ => {}
                    }
                } else {
                    match next {
                        '\'' => {
                            let hex: String = chars.iter().skip(i + 1).take(2).collect();
                            if !skipping {
                                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                                    out.push(char::from(byte));
                                }
                            }
                            i += 1 + hex.len();
                        }
                        '*' => {
                            if let Some(top) = skip_stack.last_mut() {
                                *top = true;
                            }
                            i += 1;
                        }
                        '\\' | '{' | '}' => {
                            if !skipping {
                                out.push(next);
                            }
                            i += 1;
                        }
                        '~' => {
                            if !skipping {
                                out.push(' ');
                            }
                            i += 1;
                        }
                        '\n' | '\r' => {
                            if !skipping {
                                out.push('\n');
                            }
                            i += 1;
                        }
                        _ => i += 1,
                    }
                }
            }
            '\r' | '\n' => i += 1,
            c => {
                if !skipping {
                    out.push(c);
                }
                i += 1;
            }
        }
    }

    out.trim().to_string()
}

/// `\uN` 之后跟随一个供旧阅读器使用的替代字符，需跳过
fn skip_unicode_fallback(chars: &[char], i: usize) -> usize {
    match (chars.get(i), chars.get(i + 1)) {
        (Some('\\'), Some('\'')) => (i + 4).min(chars.len()),
        (Some('\\'), _) | (Some('{'), _) | (Some('}'), _) | (None, _) => i,
        (Some(_), _) => i + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::representation::Representation;

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn image_bytes_win_over_everything() {
        let reps = RepresentationSet::plain("caption")
            .with(Representation::Image(tiny_png()))
            .with(Representation::Url("https://example.com/a.png".into()));
        let item = classify(&reps).expect("classified");
        assert_eq!(item.item_type, ItemType::Image);
        assert_eq!(item.content, "Image 3×2");
        assert!(item.image_bytes.is_some());
    }

    #[test]
    fn undecodable_image_still_classifies() {
        let reps = RepresentationSet::new().with(Representation::Image(vec![0, 1, 2, 3]));
        let item = classify(&reps).expect("classified");
        assert_eq!(item.item_type, ItemType::Image);
        assert_eq!(item.content, "Image");
    }

    #[test]
    fn single_image_file_is_image_with_file_reference() {
        let reps = RepresentationSet::new().with(Representation::FileUrls(vec![PathBuf::from("photo.png")]));
        let item = classify(&reps).expect("classified");
        assert_eq!(item.item_type, ItemType::Image);
        assert_eq!(item.file_urls, Some(vec![PathBuf::from("photo.png")]));
        assert_eq!(item.content, "photo.png");
    }

    #[test]
    fn multiple_files_join_names() {
        let reps = RepresentationSet::new().with(Representation::FileUrls(vec![
            PathBuf::from("/tmp/a.png"),
            PathBuf::from("/tmp/report.pdf"),
        ]));
        let item = classify(&reps).expect("classified");
        assert_eq!(item.item_type, ItemType::File);
        assert_eq!(item.content, "a.png, report.pdf");
    }

    #[test]
    fn url_representation_beats_rich_text() {
        let reps = RepresentationSet::new()
            .with(Representation::RichText(br"{\rtf1 hello}".to_vec()))
            .with(Representation::Url("https://example.com".into()));
        assert_eq!(classify(&reps).unwrap().item_type, ItemType::Url);
    }

    #[test]
    fn rich_text_with_empty_plain_falls_through_to_string() {
        let reps = RepresentationSet::plain("fallback")
            .with(Representation::RichText(br"{\rtf1{\fonttbl\f0 Helvetica;}}".to_vec()));
        let item = classify(&reps).unwrap();
        assert_eq!(item.item_type, ItemType::Text);
        assert_eq!(item.content, "fallback");
    }

    #[test]
    fn rtf_extraction_strips_control_words() {
        let rtf = br"{\rtf1\ansi{\fonttbl\f0\fswiss Helvetica;}{\colortbl;\red255\green0\blue0;}\f0\pard Hello \b bold\b0\par caf\'e9 \u8364? end}";
        assert_eq!(extract_rtf_text(rtf), "Hello bold\ncaf\u{e9} \u{20ac} end");
    }

    #[test]
    fn rtf_item_keeps_rich_bytes() {
        let rtf = br"{\rtf1\ansi Styled}".to_vec();
        let reps = RepresentationSet::plain("Styled").with(Representation::RichText(rtf.clone()));
        let item = classify(&reps).unwrap();
        assert_eq!(item.item_type, ItemType::Rtf);
        assert_eq!(item.content, "Styled");
        assert_eq!(item.rich_text_bytes, Some(rtf));
    }

    #[test]
    fn plain_strings() {
        assert_eq!(classify(&RepresentationSet::plain("https://example.com")).unwrap().item_type, ItemType::Url);
        assert_eq!(classify(&RepresentationSet::plain("hello world")).unwrap().item_type, ItemType::Text);
        assert_eq!(classify(&RepresentationSet::plain("localhost:8080")).unwrap().item_type, ItemType::Text);
        assert_eq!(classify(&RepresentationSet::plain("mailto:a@b.co")).unwrap().item_type, ItemType::Url);
    }

    #[test]
    fn blank_or_empty_set_is_dropped() {
        assert!(classify(&RepresentationSet::new()).is_none());
        assert!(classify(&RepresentationSet::plain("   \n")).is_none());
    }
}

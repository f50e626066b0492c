//! 快捷操作模块
//!
//! # 设计思路
//!
//! 标签只说明“这是什么”，快捷操作回答“可以拿它做什么”：
//!
//! | 标签 / 类型 | 操作 |
//! |------|------|
//! | `color` | 复制为 HEX / RGB / HSL |
//! | `json` | 美化 / 压缩 / 转义为字符串字面量 |
//! | `email` | 通过 `mailto:` 撰写邮件 |
//! | `phone` | 通过 `tel:` 拨号 |
//! | `code` | 去除公共缩进 / 包装为 Markdown 代码块 |
//! | `file` | 在文件管理器中显示 |
//!
//! # 实现思路
//!
//! - `suggest_actions` 只依据条目类型与标签给出建议，不做 I/O。
//! - 文本变换（`apply_text_action`）是纯函数，结果交给调用方写回剪贴板。
//! - 协议处理器操作（`action_url`）只生成 URL，打开动作由平台层完成。
//! - 仅 `reveal_in_file_browser` 触达系统命令。

use std::path::Path;

use crate::error::AppError;

use super::item::{ClipboardItem, ContentTag, ItemType};
use super::tagger::{EMAIL, FUNCTIONAL_COLOR, HEX_COLOR, find_phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    CopyAsHex,
    CopyAsRgb,
    CopyAsHsl,
    PrettyPrintJson,
    MinifyJson,
    EscapeJson,
    ComposeEmail,
    CallPhone,
    StripIndentation,
    WrapAsCodeBlock,
    RevealInFileBrowser,
}

/// 根据条目类型与标签列出可用操作
pub fn suggest_actions(item: &ClipboardItem) -> Vec<QuickAction> {
    let mut actions = Vec::new();

    if item.item_type == ItemType::File
        || (item.item_type == ItemType::Image && item.file_urls.is_some())
    {
        actions.push(QuickAction::RevealInFileBrowser);
    }

    for tag in &item.detected_tags {
        match tag {
            ContentTag::Color => actions.extend([
                QuickAction::CopyAsHex,
                QuickAction::CopyAsRgb,
                QuickAction::CopyAsHsl,
            ]),
            ContentTag::Json => actions.extend([
                QuickAction::PrettyPrintJson,
                QuickAction::MinifyJson,
                QuickAction::EscapeJson,
            ]),
            ContentTag::Email => actions.push(QuickAction::ComposeEmail),
            ContentTag::Phone => actions.push(QuickAction::CallPhone),
            ContentTag::Code => {
                actions.extend([QuickAction::StripIndentation, QuickAction::WrapAsCodeBlock])
            }
            ContentTag::Address => {}
        }
    }

    actions
}

/// 执行纯文本变换类操作
pub fn apply_text_action(action: QuickAction, text: &str) -> Result<String, AppError> {
    match action {
        QuickAction::CopyAsHex => Ok(parse_color(text)?.to_hex()),
        QuickAction::CopyAsRgb => Ok(parse_color(text)?.to_rgb_string()),
        QuickAction::CopyAsHsl => Ok(parse_color(text)?.to_hsl_string()),
        QuickAction::PrettyPrintJson => {
            let value = parse_json(text)?;
            serde_json::to_string_pretty(&value)
                .map_err(|e| AppError::Clipboard(format!("JSON 格式化失败: {}", e)))
        }
        QuickAction::MinifyJson => {
            let value = parse_json(text)?;
            serde_json::to_string(&value)
                .map_err(|e| AppError::Clipboard(format!("JSON 压缩失败: {}", e)))
        }
        QuickAction::EscapeJson => serde_json::to_string(text)
            .map_err(|e| AppError::Clipboard(format!("JSON 转义失败: {}", e))),
        QuickAction::StripIndentation => Ok(strip_common_indentation(text)),
        QuickAction::WrapAsCodeBlock => Ok(format!("```\n{}\n```", text.trim_end_matches('\n'))),
        QuickAction::ComposeEmail | QuickAction::CallPhone | QuickAction::RevealInFileBrowser => {
            Err(AppError::Clipboard(format!("{:?} 不是文本变换操作", action)))
        }
    }
}

/// 生成协议处理器 URL（`mailto:` / `tel:`）
pub fn action_url(action: QuickAction, text: &str) -> Option<String> {
    match action {
        QuickAction::ComposeEmail => EMAIL.find(text).map(|m| format!("mailto:{}", m.as_str())),
        QuickAction::CallPhone => find_phone(text).map(|raw| {
            let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
            if raw.starts_with('+') {
                format!("tel:+{}", digits)
            } else {
                format!("tel:{}", digits)
            }
        }),
        _ => None,
    }
}

fn parse_json(text: &str) -> Result<serde_json::Value, AppError> {
    serde_json::from_str(text.trim()).map_err(|e| AppError::Clipboard(format!("JSON 解析失败: {}", e)))
}

/// 去除所有非空行共有的前导空白，空白行输出为空行
pub fn strip_common_indentation(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    // 非空行的前 indent 字节都是 ASCII 空格或制表符
    text.lines()
        .map(|line| if line.trim().is_empty() { "" } else { &line[indent..] })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// 颜色解析与转换
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_rgb_string(&self) -> String {
        if self.a < 1.0 {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, trim_float(self.a))
        } else {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        }
    }

    pub fn to_hsl_string(&self) -> String {
        let (h, s, l) = rgb_to_hsl(self.r, self.g, self.b);
        if self.a < 1.0 {
            format!("hsla({}, {}%, {}%, {})", h, s, l, trim_float(self.a))
        } else {
            format!("hsl({}, {}%, {}%)", h, s, l)
        }
    }
}

fn trim_float(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// 解析文本中的颜色
///
/// 整段文本不是颜色时，取其中第一个能解析的颜色片段（如 `color: #abc;`）。
pub fn parse_color(text: &str) -> Result<Rgba, AppError> {
    if let Some(color) = parse_color_literal(text.trim()) {
        return Ok(color);
    }
    color_candidates(text)
        .into_iter()
        .find_map(parse_color_literal)
        .ok_or_else(|| AppError::Clipboard(format!("无法识别的颜色: {}", text.trim())))
}

/// 文本中的颜色片段，按出现位置排序
fn color_candidates(text: &str) -> Vec<&str> {
    let mut found: Vec<(usize, &str)> = Vec::new();

    for m in HEX_COLOR.find_iter(text) {
        // 匹配可能带着前面的一个分隔字符
        if let Some(offset) = m.as_str().find('#') {
            let start = m.start() + offset;
            found.push((start, &text[start..m.end()]));
        }
    }
    for m in FUNCTIONAL_COLOR.find_iter(text) {
        if let Some(close) = text[m.start()..].find(')') {
            found.push((m.start(), &text[m.start()..=m.start() + close]));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, candidate)| candidate).collect()
}

/// 解析单个 `#RGB` / `#RRGGBB` / `rgb[a](...)` / `hsl[a](...)`
fn parse_color_literal(literal: &str) -> Option<Rgba> {
    if let Some(hex) = literal.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = literal.to_ascii_lowercase();
    let open = lower.find('(')?;
    let close = lower.rfind(')')?;
    if close <= open {
        return None;
    }
    let name = lower[..open].trim();
    let args: Vec<&str> = lower[open + 1..close]
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if args.len() < 3 {
        return None;
    }
    let alpha = match args.get(3) {
        Some(raw) => parse_alpha(raw)?,
        None => 1.0,
    };

    match name {
        "rgb" | "rgba" => {
            let channel = |raw: &str| -> Option<u8> {
                let value = match raw.strip_suffix('%') {
                    Some(pct) => pct.parse::<f64>().ok()? * 2.55,
                    None => raw.parse::<f64>().ok()?,
                };
                Some(value.round().clamp(0.0, 255.0) as u8)
            };
            Some(Rgba {
                r: channel(args[0])?,
                g: channel(args[1])?,
                b: channel(args[2])?,
                a: alpha,
            })
        }
        "hsl" | "hsla" => {
            let hue = args[0].trim_end_matches("deg").parse::<f64>().ok()?;
            let pct = |raw: &str| raw.trim_end_matches('%').parse::<f64>().ok();
            let s = pct(args[1])?;
            let l = pct(args[2])?;
            let (r, g, b) = hsl_to_rgb(hue, s / 100.0, l / 100.0);
            Some(Rgba { r, g, b, a: alpha })
        }
        _ => None,
    }
}

fn parse_alpha(raw: &str) -> Option<f64> {
    let value = match raw.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok()? / 100.0,
        None => raw.parse::<f64>().ok()?,
    };
    Some(value.clamp(0.0, 1.0))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    Some(Rgba {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
        a: 1.0,
    })
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (i64, i64, i64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        return (0, 0, (l * 100.0).round() as i64);
    }

    let s = delta / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (
        h.round() as i64 % 360,
        (s * 100.0).round() as i64,
        (l * 100.0).round() as i64,
    )
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r1), to_u8(g1), to_u8(b1))
}

// ============================================================================
// 在文件管理器中显示
// ============================================================================

/// 在系统文件管理器中定位文件
#[cfg(target_os = "macos")]
pub fn reveal_in_file_browser(path: &Path) -> Result<(), AppError> {
    std::process::Command::new("open")
        .arg("-R")
        .arg(path)
        .spawn()
        .map_err(|e| AppError::Input(format!("打开文件位置失败: {}", e)))?;
    Ok(())
}

#[cfg(target_os = "windows")]
pub fn reveal_in_file_browser(path: &Path) -> Result<(), AppError> {
    let mut select = std::ffi::OsString::from("/select,");
    select.push(path.as_os_str());
    std::process::Command::new("explorer")
        .arg(select)
        .spawn()
        .map_err(|e| AppError::Input(format!("打开文件位置失败: {}", e)))?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn reveal_in_file_browser(path: &Path) -> Result<(), AppError> {
    let parent = path.parent().unwrap_or(path);
    std::process::Command::new("xdg-open")
        .arg(parent)
        .spawn()
        .map_err(|e| AppError::Input(format!("打开文件位置失败: {}", e)))?;
    Ok(())
}

/// 交给系统协议处理器打开（`mailto:` / `tel:`）
pub fn open_with_handler(url: &str) -> Result<(), AppError> {
    #[cfg(target_os = "macos")]
    let mut command = std::process::Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = std::process::Command::new("xdg-open");

    command
        .arg(url)
        .spawn()
        .map_err(|e| AppError::Input(format!("打开协议处理器失败: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::tagger::detect_tags;

    fn tagged(text: &str) -> ClipboardItem {
        let mut item = ClipboardItem::text(text);
        item.detected_tags = detect_tags(text);
        item
    }

    #[test]
    fn color_conversions() {
        assert_eq!(apply_text_action(QuickAction::CopyAsRgb, "#FF00FF").unwrap(), "rgb(255, 0, 255)");
        assert_eq!(apply_text_action(QuickAction::CopyAsHsl, "#f0f").unwrap(), "hsl(300, 100%, 50%)");
        assert_eq!(apply_text_action(QuickAction::CopyAsHex, "rgb(18, 52, 86)").unwrap(), "#123456");
        assert_eq!(apply_text_action(QuickAction::CopyAsHex, "hsl(120, 100%, 25%)").unwrap(), "#008000");
        assert_eq!(
            apply_text_action(QuickAction::CopyAsRgb, "rgba(1, 2, 3, 0.5)").unwrap(),
            "rgba(1, 2, 3, 0.5)"
        );
        assert!(apply_text_action(QuickAction::CopyAsHex, "not a color").is_err());
    }

    #[test]
    fn json_actions() {
        let text = "{ \"a\" : [1, 2] }";
        assert_eq!(apply_text_action(QuickAction::MinifyJson, text).unwrap(), "{\"a\":[1,2]}");
        assert!(apply_text_action(QuickAction::PrettyPrintJson, text).unwrap().contains("\n  \"a\""));
        assert_eq!(apply_text_action(QuickAction::EscapeJson, "say \"hi\"").unwrap(), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn code_actions() {
        let code = "    fn a() {\n        b();\n    }";
        assert_eq!(
            apply_text_action(QuickAction::StripIndentation, code).unwrap(),
            "fn a() {\n    b();\n}"
        );
        assert_eq!(apply_text_action(QuickAction::WrapAsCodeBlock, "x\n").unwrap(), "```\nx\n```");
    }

    #[test]
    fn strip_indentation_blanks_whitespace_only_lines() {
        let code = "    fn a() {\n  \u{3000}\n    let x = 1;\n \u{a0}\n    }";
        assert_eq!(
            apply_text_action(QuickAction::StripIndentation, code).unwrap(),
            "fn a() {\n\nlet x = 1;\n\n}"
        );
    }

    #[test]
    fn color_embedded_in_text() {
        let item = tagged("color: #abc;");
        for action in suggest_actions(&item) {
            assert!(apply_text_action(action, &item.content).is_ok(), "{:?} 应可执行", action);
        }
        assert_eq!(apply_text_action(QuickAction::CopyAsHex, "color: #abc;").unwrap(), "#AABBCC");
        assert_eq!(
            apply_text_action(QuickAction::CopyAsHex, "background: rgb(18, 52, 86) !important").unwrap(),
            "#123456"
        );
        assert_eq!(
            apply_text_action(QuickAction::CopyAsRgb, "see hsl(120, 100%, 25%) and #fff").unwrap(),
            "rgb(0, 128, 0)"
        );
    }

    #[test]
    fn protocol_urls() {
        assert_eq!(action_url(QuickAction::ComposeEmail, "ping a@b.co").as_deref(), Some("mailto:a@b.co"));
        assert_eq!(
            action_url(QuickAction::CallPhone, "+1 (555) 123-4567").as_deref(),
            Some("tel:+15551234567")
        );
        assert_eq!(
            action_url(QuickAction::CallPhone, "v 12.34.56 call +1 555 123 4567").as_deref(),
            Some("tel:+15551234567")
        );
        assert!(action_url(QuickAction::CallPhone, "build 12.34.56").is_none());
        assert!(action_url(QuickAction::StripIndentation, "x").is_none());
    }

    #[test]
    fn suggestions_follow_tags() {
        assert_eq!(
            suggest_actions(&tagged("#FF00FF")),
            vec![QuickAction::CopyAsHex, QuickAction::CopyAsRgb, QuickAction::CopyAsHsl]
        );
        assert!(suggest_actions(&tagged("hello")).is_empty());

        let file = ClipboardItem::new(ItemType::File, "a.pdf")
            .with_file_urls(vec![std::path::PathBuf::from("/tmp/a.pdf")]);
        assert_eq!(suggest_actions(&file), vec![QuickAction::RevealInFileBrowser]);
    }
}

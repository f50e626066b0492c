//! 内容标签模块
//!
//! # 设计思路
//!
//! 文本条目可能同时属于多个子类别（例如一段 JSON 里含邮箱），
//! 因此每个检测器都是独立、互不排斥的纯函数，结果合并为标签集合。
//! 标签既用于历史列表的徽标，也驱动 `quick_actions` 的操作建议。
//!
//! # 实现思路
//!
//! - 检测器以表驱动方式登记在 `DETECTORS` 中，便于单独测试与扩展。
//! - 正则统一放在 `Lazy` 静态里，首次使用时编译；模式写错直接 panic，
//!   启动阶段由 `ensure_patterns_compiled` 提前触发，不会静默失效。

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::code_detection;
use super::item::ContentTag;

/// `#RGB` / `#RRGGBB`，前面不能紧贴单词字符
pub(crate) static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9A-Za-z_&#])#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})\b").expect("颜色正则编译失败")
});

/// `rgb(...)` / `rgba(...)` / `hsl(...)` / `hsla(...)` 的数值前缀
pub(crate) static FUNCTIONAL_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:rgba?|hsla?)\(\s*-?\d+(?:\.\d+)?(?:%|deg)?\s*[,\s]\s*-?\d+(?:\.\d+)?%?")
        .expect("函数式颜色正则编译失败")
});

pub(crate) static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("邮箱正则编译失败")
});

/// 宽松的国际电话格式：可选 `+`、数字与分隔符
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\(?\d[\d\s().\-]{5,}\d").expect("电话正则编译失败")
});

static ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^\s*\d{1,5}\s+(?:[A-Za-z0-9.'\-]+\s+)+?(?:St|Ave|Blvd|Dr|Rd|Ln|Ct|Way|Pl|Hwy|Cir)\b\.?",
    )
    .expect("地址正则编译失败")
});

const MIN_PHONE_DIGITS: usize = 7;

type Detector = fn(&str) -> bool;

/// 标签 → 检测器
const DETECTORS: &[(ContentTag, Detector)] = &[
    (ContentTag::Color, is_color),
    (ContentTag::Email, is_email),
    (ContentTag::Phone, is_phone),
    (ContentTag::Json, is_json),
    (ContentTag::Code, code_detection::is_likely_code),
    (ContentTag::Address, is_address),
];

/// 启动时调用，确保所有检测正则都能编译
pub fn ensure_patterns_compiled() {
    Lazy::force(&HEX_COLOR);
    Lazy::force(&FUNCTIONAL_COLOR);
    Lazy::force(&EMAIL);
    Lazy::force(&PHONE);
    Lazy::force(&ADDRESS);
    code_detection::force_compile();
}

/// 对文本运行全部检测器
pub fn detect_tags(text: &str) -> BTreeSet<ContentTag> {
    DETECTORS
        .iter()
        .filter(|(_, detect)| detect(text))
        .map(|(tag, _)| *tag)
        .collect()
}

pub fn is_color(text: &str) -> bool {
    HEX_COLOR.is_match(text) || FUNCTIONAL_COLOR.is_match(text)
}

pub fn is_email(text: &str) -> bool {
    EMAIL.is_match(text)
}

pub fn is_phone(text: &str) -> bool {
    find_phone(text).is_some()
}

/// 第一个数字足够多的电话号码片段
pub(crate) fn find_phone(text: &str) -> Option<&str> {
    PHONE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|raw| raw.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS)
}

pub fn is_json(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

pub fn is_address(text: &str) -> bool {
    ADDRESS.is_match(text)
}

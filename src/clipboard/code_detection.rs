//! 代码特征检测模块
//!
//! # 设计思路
//!
//! 用户经常复制代码片段，历史列表需要为其打上 `code` 标签以提供
//! “去除缩进 / 包装为代码块”等快捷操作。单一正则很容易误判自然语言，
//! 因此这里改为加权打分：多个弱信号叠加到阈值才认定为代码。
//!
//! # 实现思路
//!
//! - 少于 3 行直接排除。
//! - 信号与分值：成对花括号 +2、成对圆括号 +1、分号 +2、箭头（`->` / `=>`）+2、
//!   注释标记 +1、超过 1/3 的行有缩进 +2、每命中一个关键字 +2（封顶 +6）。
//! - 关键字使用 `RegexSet` 一次性多模式匹配，通过 `once_cell::sync::Lazy`
//!   在首次调用时编译，后续零成本复用。

use once_cell::sync::Lazy;
use regex::RegexSet;

/// 认定为代码所需的最低分
pub const CODE_SCORE_THRESHOLD: u32 = 4;

const MIN_CODE_LINES: usize = 3;
const KEYWORD_SCORE_CAP: u32 = 6;

/// 预编译的关键字集合，每条模式命中计 2 分
static CODE_KEYWORDS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"\bfunc ",
        r"\bdef ",
        r"\bfn ",
        r"\bfunction ",
        r"\bclass ",
        r"\bimport ",
        r"\breturn ",
        r"\bconst ",
        r"\blet ",
        r"\bvar ",
        r"\bpublic ",
        r"\bprivate ",
        r"\bstruct ",
        r"#include\b",
    ])
    .expect("代码关键字正则编译失败")
});

/// 注释标记：`//`、`/*`、行首 `#` 注释、行首 `--`
static COMMENT_MARKERS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"//", r"/\*", r"(?m)^\s*#\s", r"(?m)^\s*--\s"]).expect("注释标记正则编译失败")
});

pub(crate) fn force_compile() {
    Lazy::force(&CODE_KEYWORDS);
    Lazy::force(&COMMENT_MARKERS);
}

fn has_pair(text: &str, open: char, close: char) -> bool {
    match (text.find(open), text.rfind(close)) {
        (Some(start), Some(end)) => start < end,
        _ => false,
    }
}

/// 计算文本的代码特征分；不足 3 行返回 0
pub fn code_score(text: &str) -> u32 {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < MIN_CODE_LINES {
        return 0;
    }

    let mut score = 0;
    if has_pair(text, '{', '}') {
        score += 2;
    }
    if has_pair(text, '(', ')') {
        score += 1;
    }
    if text.contains(';') {
        score += 2;
    }
    if text.contains("->") || text.contains("=>") {
        score += 2;
    }
    if COMMENT_MARKERS.is_match(text) {
        score += 1;
    }

    let indented = lines
        .iter()
        .filter(|line| line.starts_with(' ') || line.starts_with('\t'))
        .count();
    if indented * 3 > lines.len() {
        score += 2;
    }

    let keyword_hits = CODE_KEYWORDS.matches(text).iter().count() as u32;
    score += (keyword_hits * 2).min(KEYWORD_SCORE_CAP);

    score
}

/// 判断文本是否可能为代码
pub fn is_likely_code(text: &str) -> bool {
    code_score(text) >= CODE_SCORE_THRESHOLD
}

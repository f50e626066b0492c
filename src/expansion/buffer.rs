use std::collections::VecDeque;

pub const DEFAULT_BUFFER_LEN: usize = 50;

/// 最近键入字符的滚动缓冲区
///
/// 超出上限时从头部丢弃，只保留最近的 `max_len` 个字符。
#[derive(Debug, Clone)]
pub struct TriggerBuffer {
    chars: VecDeque<char>,
    max_len: usize,
}

impl TriggerBuffer {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            chars: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    pub fn push(&mut self, c: char) {
        self.chars.push_back(c);
        while self.chars.len() > self.max_len {
            self.chars.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop_back()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// 缓冲区是否以 `suffix` 结尾（按字符比较）
    pub fn ends_with(&self, suffix: &str) -> bool {
        let wanted = suffix.chars().count();
        if wanted == 0 || wanted > self.chars.len() {
            return false;
        }
        self.chars
            .iter()
            .skip(self.chars.len() - wanted)
            .copied()
            .eq(suffix.chars())
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

impl Default for TriggerBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_from_the_front() {
        let mut buffer = TriggerBuffer::new(3);
        for c in "abcde".chars() {
            buffer.push(c);
        }
        assert_eq!(buffer.as_string(), "cde");
    }

    #[test]
    fn suffix_matching_counts_chars_not_bytes() {
        let mut buffer = TriggerBuffer::default();
        for c in "xx;;é".chars() {
            buffer.push(c);
        }
        assert!(buffer.ends_with(";;é"));
        assert!(!buffer.ends_with("x;;é"));
        assert!(!buffer.ends_with(""));
        assert!(!buffer.ends_with("longer than the buffer"));
    }
}

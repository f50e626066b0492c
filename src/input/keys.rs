/// 按下按键时生效的修饰键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub command: bool,
    pub control: bool,
    pub option: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Shift 只改变字符，不算组合键
    pub fn is_chord(&self) -> bool {
        self.command || self.control || self.option
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// 产生可打印字符的按键
    Character(char),
    Backspace,
    /// 方向键、功能键等不产生字符的按键
    Other,
}

/// 一次按键事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub kind: KeyKind,
    pub modifiers: Modifiers,
}

impl KeyStroke {
    pub fn character(c: char) -> Self {
        Self {
            kind: KeyKind::Character(c),
            modifiers: Modifiers::default(),
        }
    }

    pub fn backspace() -> Self {
        Self {
            kind: KeyKind::Backspace,
            modifiers: Modifiers::default(),
        }
    }

    pub fn other() -> Self {
        Self {
            kind: KeyKind::Other,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// 把一段文本拆成逐字符按键，测试与回放使用
    pub fn typed(text: &str) -> Vec<Self> {
        text.chars().map(Self::character).collect()
    }
}

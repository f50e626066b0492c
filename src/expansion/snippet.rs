//! 片段库
//!
//! 触发词必须非空，且在所有启用的片段之间唯一；
//! 新增、编辑、启用三个入口都会校验。停用的片段不参与冲突检查。

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(Uuid);

impl SnippetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: SnippetId,
    pub name: String,
    pub trigger: String,
    pub content: String,
    pub enabled: bool,
}

impl Snippet {
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: SnippetId::new(),
            name: name.into(),
            trigger: trigger.into(),
            content: content.into(),
            enabled: true,
        }
    }
}

/// 按注册顺序保存的片段集合
#[derive(Debug, Default)]
pub struct SnippetLibrary {
    snippets: Mutex<Arc<Vec<Snippet>>>,
}

impl SnippetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已加载的片段初始化；与前面启用片段冲突的会被停用
    pub fn with_snippets(snippets: Vec<Snippet>) -> Self {
        let mut accepted: Vec<Snippet> = Vec::with_capacity(snippets.len());
        for mut snippet in snippets {
            if snippet.enabled && validate(&accepted, &snippet.trigger, Some(snippet.id)).is_err() {
                log::warn!("⌨️ 片段「{}」触发词无效或冲突，已停用", snippet.name);
                snippet.enabled = false;
            }
            accepted.push(snippet);
        }
        Self {
            snippets: Mutex::new(Arc::new(accepted)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Vec<Snippet>>> {
        match self.snippets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("片段库锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 全部片段（含停用的），按注册顺序
    pub fn list(&self) -> Arc<Vec<Snippet>> {
        Arc::clone(&self.lock())
    }

    pub fn get(&self, id: SnippetId) -> Option<Snippet> {
        self.lock().iter().find(|s| s.id == id).cloned()
    }

    pub fn add(
        &self,
        name: impl Into<String>,
        trigger: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<SnippetId, AppError> {
        let snippet = Snippet::new(name, trigger, content);
        let mut guard = self.lock();
        validate(&guard, &snippet.trigger, None)?;
        let id = snippet.id;
        Arc::make_mut(&mut guard).push(snippet);
        Ok(id)
    }

    pub fn update(
        &self,
        id: SnippetId,
        name: impl Into<String>,
        trigger: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), AppError> {
        let trigger = trigger.into();
        let mut guard = self.lock();
        let index = position(&guard, id)?;
        if guard[index].enabled {
            validate(&guard, &trigger, Some(id))?;
        } else if trigger.trim().is_empty() {
            return Err(AppError::Snippet("触发词不能为空".to_string()));
        }
        let snippet = &mut Arc::make_mut(&mut guard)[index];
        snippet.name = name.into();
        snippet.trigger = trigger;
        snippet.content = content.into();
        Ok(())
    }

    pub fn set_enabled(&self, id: SnippetId, enabled: bool) -> Result<(), AppError> {
        let mut guard = self.lock();
        let index = position(&guard, id)?;
        if enabled && !guard[index].enabled {
            let trigger = guard[index].trigger.clone();
            validate(&guard, &trigger, Some(id))?;
        }
        Arc::make_mut(&mut guard)[index].enabled = enabled;
        Ok(())
    }

    pub fn remove(&self, id: SnippetId) -> bool {
        let mut guard = self.lock();
        match guard.iter().position(|s| s.id == id) {
            Some(index) => {
                Arc::make_mut(&mut guard).remove(index);
                true
            }
            None => false,
        }
    }
}

fn position(snippets: &[Snippet], id: SnippetId) -> Result<usize, AppError> {
    snippets
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| AppError::NotFound(format!("片段 {}", id)))
}

fn validate(snippets: &[Snippet], trigger: &str, except: Option<SnippetId>) -> Result<(), AppError> {
    if trigger.trim().is_empty() {
        return Err(AppError::Snippet("触发词不能为空".to_string()));
    }
    let conflict = snippets
        .iter()
        .filter(|s| s.enabled && Some(s.id) != except)
        .any(|s| s.trigger == trigger);
    if conflict {
        return Err(AppError::Snippet(format!("触发词已被占用: {}", trigger)));
    }
    Ok(())
}

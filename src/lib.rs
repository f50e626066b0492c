//! # clipstack: 剪贴板历史与片段展开库
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  系统剪贴板 (ClipboardResource: 变更计数 / 读取 / 原子写入)     │
//! └──────┬───────────────────────────────────────────▲───────────┘
//!        │ 轮询计数                                   │ 写入 + 登记计数
//!        ↓                                            │
//! │  clipboard::monitor ── PasteboardMonitor        ClipboardWriter
//! │       │                                         ↑      ↑
//! │       ↓                                         │      │
//! │  clipboard::classifier ── 表示集合 → ClipboardItem      │
//! │       │                                         │      │
//! │       ↓                                         │      │
//! │  history ── HistoryStore ── 去重 / 置顶 / 淘汰 ──┘      │
//! │       │         └─ tagger 打标签                        │
//! │       ├─ broadcast<HistoryEvent> → 持久化 (db)          │
//! │       └─ snapshot() → 界面                              │
//! │                                                        │
//! │  input::listener ─ KeyStroke → expansion::TriggerEngine ┘
//! │                                    └─ InputInjector（退格 / 粘贴）
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`clipboard`] | 表示集合、分类、标签、快捷操作、轮询监控、自写抑制 |
//! | [`history`] | 去重、按最近使用排序、有上限的历史存储与事件通知 |
//! | [`expansion`] | 触发缓冲区、片段库、展开序列与剪贴板还原 |
//! | [`input`] | 按键模型、输入注入（enigo）、全局键盘监听（rdev，可选） |
//! | [`capture`] | 截屏 / OCR 服务接口与类型化错误 |
//! | [`db`] | SQLite 持久化：逐条 JSON 记录、导入导出 |
//! | [`settings`] | `settings.json` 读写、数据目录解析 |
//! | [`app`] | `AppContext`：组装以上组件并管理后台任务生命周期 |

pub mod app;
pub mod capture;
pub mod clipboard;
pub mod db;
pub mod error;
pub mod expansion;
pub mod history;
pub mod input;
pub mod settings;

//! 输入模块（分层门面）
//!
//! - `keys`：按键事件模型，展开引擎只认识这一层
//! - `injector`：输入模拟能力（退格 / 粘贴组合键），enigo 实现与测试替身
//! - `listener`：全局键盘监听（`global-hook` 特性，rdev）

#[path = "input/injector.rs"]
mod injector;
#[path = "input/keys.rs"]
mod keys;
#[cfg(feature = "global-hook")]
#[path = "input/listener.rs"]
mod listener;

pub use injector::{EnigoInjector, InjectedInput, InputInjector, RecordingInjector};
pub use keys::{KeyKind, KeyStroke, Modifiers};
#[cfg(feature = "global-hook")]
pub use listener::spawn_global_listener;

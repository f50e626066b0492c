//! 全局键盘监听
//!
//! `rdev::listen` 会阻塞调用线程，因此在独立线程中运行，
//! 把原始事件翻译为 `KeyStroke` 后经通道交给展开引擎。
//! 修饰键状态由本线程自行维护。

use std::thread;

use rdev::{Event, EventType, Key};
use tokio::sync::mpsc::UnboundedSender;

use super::keys::{KeyKind, KeyStroke, Modifiers};

fn update_modifiers(modifiers: &mut Modifiers, key: Key, pressed: bool) -> bool {
    match key {
        Key::MetaLeft | Key::MetaRight => modifiers.command = pressed,
        Key::ControlLeft | Key::ControlRight => modifiers.control = pressed,
        Key::Alt | Key::AltGr => modifiers.option = pressed,
        Key::ShiftLeft | Key::ShiftRight => modifiers.shift = pressed,
        _ => return false,
    }
    true
}

fn translate(event: &Event, key: Key, modifiers: Modifiers) -> KeyStroke {
    let kind = match key {
        Key::Backspace => KeyKind::Backspace,
        _ => event
            .name
            .as_deref()
            .and_then(|name| {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_control() => Some(c),
                    _ => None,
                }
            })
            .map(KeyKind::Character)
            .unwrap_or(KeyKind::Other),
    };
    KeyStroke { kind, modifiers }
}

/// 在后台线程启动全局键盘监听
///
/// 接收端关闭后事件被丢弃；`rdev` 无法中途退出监听，线程随进程结束。
pub fn spawn_global_listener(tx: UnboundedSender<KeyStroke>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut modifiers = Modifiers::default();
        log::info!("⌨️ 全局键盘监听已启动");

        let result = rdev::listen(move |event| match event.event_type {
            EventType::KeyPress(key) => {
                if update_modifiers(&mut modifiers, key, true) {
                    return;
                }
                let _ = tx.send(translate(&event, key, modifiers));
            }
            EventType::KeyRelease(key) => {
                update_modifiers(&mut modifiers, key, false);
            }
            _ => {}
        });

        if let Err(err) = result {
            log::error!("⌨️ 全局键盘监听失败: {:?}", err);
        }
    })
}

//! 数据库模块
//!
//! # 设计思路
//!
//! 历史与片段统一存放在一个 SQLite 文件中，使用 `rusqlite` 直接操作。
//! 每行保存一条独立的 JSON 记录（见 `records`），解码按行进行：
//! 单条记录损坏只会被跳过并计入 `LoadReport::skipped`，其余历史照常加载。
//!
//! # 实现思路
//!
//! - `Database` 以 `Mutex<Connection>` 封装连接，所有访问经 `with_conn`。
//! - 保存采用“整表覆盖”：在一个事务里清空后按快照顺序写入，
//!   历史上限默认 200 条，代价可以接受且顺序天然与快照一致。
//! - Schema 版本通过 `PRAGMA user_version` 迁移。

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::clipboard::ClipboardItem;
use crate::error::AppError;
use crate::expansion::Snippet;

mod history;
mod records;
mod schema;
mod snippets;

pub use history::{LoadReport, export_history_json, import_history_json};
pub use records::{ItemRecord, SnippetRecord, decode_item, encode_item};

/// 数据库连接封装
pub struct Database(Mutex<Connection>);

impl Database {
    /// 打开（必要时创建）数据库文件并执行迁移
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Database(format!("创建数据库目录失败: {}", e)))?;
        }
        log::info!("💾 数据库路径: {}", db_path.display());

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Database(format!("打开数据库失败: {}", e)))?;
        schema::initialize_schema(&conn)?;
        Ok(Self(Mutex::new(conn)))
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("打开内存数据库失败: {}", e)))?;
        schema::initialize_schema(&conn)?;
        Ok(Self(Mutex::new(conn)))
    }

    pub(crate) fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let conn = self
            .0
            .lock()
            .map_err(|e| AppError::Database(format!("获取数据库锁失败: {}", e)))?;
        op(&conn)
    }

    pub fn save_history(&self, items: &[ClipboardItem]) -> Result<(), AppError> {
        self.with_conn(|conn| history::save_history(conn, items))
    }

    pub fn load_history(&self) -> Result<LoadReport, AppError> {
        self.with_conn(history::load_history)
    }

    pub fn save_snippets(&self, snippets: &[Snippet]) -> Result<(), AppError> {
        self.with_conn(|conn| snippets::save_snippets(conn, snippets))
    }

    pub fn load_snippets(&self) -> Result<Vec<Snippet>, AppError> {
        self.with_conn(snippets::load_snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("clipstack.db");

        {
            let db = Database::open(&path).expect("open db");
            db.save_history(&[ClipboardItem::text("kept")]).expect("save");
        }

        let reopened = Database::open(&path).expect("reopen db");
        let report = reopened.load_history().expect("load");
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].content, "kept");
    }
}

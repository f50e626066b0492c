//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建 / 迁移表结构（`PRAGMA user_version` 记录版本）
//! - 设置 SQLite 运行参数（WAL）
//!
//! ## 表结构
//! 每行只保存一条 JSON 记录，`position` 决定顺序（0 为最前）：
//! - v1：`history(id, position, record)`
//! - v2：`snippets(id, position, record)`
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Database`

use rusqlite::Connection;

use crate::error::AppError;

pub(super) const SCHEMA_VERSION: i64 = 2;

fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Database(format!("写入数据库版本失败: {}", e)))
}

fn create_history_table(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS history (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            record TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_history_position ON history(position);",
    )
    .map_err(|e| AppError::Database(format!("创建历史表失败: {}", e)))
}

fn create_snippets_table(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snippets (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            record TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_snippets_position ON snippets(position);",
    )
    .map_err(|e| AppError::Database(format!("创建片段表失败: {}", e)))
}

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    // 内存数据库不支持 WAL，忽略失败
    conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

    let mut version = get_user_version(conn)?;

    if version < 1 {
        create_history_table(conn)?;
        set_user_version(conn, 1)?;
        version = 1;
    }

    if version < 2 {
        create_snippets_table(conn)?;
        set_user_version(conn, 2)?;
        version = 2;
    }

    if version != SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本不匹配: current={}, expected={}",
            version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

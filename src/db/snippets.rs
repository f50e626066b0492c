use rusqlite::{Connection, params};

use crate::error::AppError;
use crate::expansion::Snippet;

use super::records::SnippetRecord;

pub(crate) fn save_snippets(conn: &Connection, snippets: &[Snippet]) -> Result<(), AppError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::Database(format!("开始保存片段事务失败: {}", e)))?;

    tx.execute("DELETE FROM snippets", [])
        .map_err(|e| AppError::Database(format!("清空片段表失败: {}", e)))?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO snippets (id, position, record) VALUES (?1, ?2, ?3)")
            .map_err(|e| AppError::Database(format!("准备片段插入语句失败: {}", e)))?;
        for (position, snippet) in snippets.iter().enumerate() {
            let record = serde_json::to_string(&SnippetRecord::from(snippet))
                .map_err(|e| AppError::Database(format!("序列化片段失败: {}", e)))?;
            stmt.execute(params![snippet.id.to_string(), position as i64, record])
                .map_err(|e| AppError::Database(format!("写入片段失败: {}", e)))?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Database(format!("提交片段事务失败: {}", e)))
}

/// 按注册顺序加载片段，损坏的记录跳过
pub(crate) fn load_snippets(conn: &Connection) -> Result<Vec<Snippet>, AppError> {
    let mut stmt = conn
        .prepare("SELECT record FROM snippets ORDER BY position ASC")
        .map_err(|e| AppError::Database(format!("准备片段查询失败: {}", e)))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| AppError::Database(format!("查询片段失败: {}", e)))?;

    let mut snippets = Vec::new();
    for row in rows {
        let decoded = row
            .map_err(|e| AppError::Database(format!("读取片段行失败: {}", e)))
            .and_then(|json| {
                serde_json::from_str::<SnippetRecord>(&json)
                    .map_err(|e| AppError::Database(format!("解析片段失败: {}", e)))
            })
            .and_then(Snippet::try_from);
        match decoded {
            Ok(snippet) => snippets.push(snippet),
            Err(err) => log::warn!("💾 跳过损坏的片段记录: {}", err),
        }
    }
    Ok(snippets)
}

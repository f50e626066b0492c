use rusqlite::{Connection, params};

use crate::clipboard::ClipboardItem;
use crate::error::AppError;

use super::records::{ItemRecord, decode_item, encode_item};

/// 按记录加载的结果
#[derive(Debug, Default)]
pub struct LoadReport {
    pub items: Vec<ClipboardItem>,
    /// 解码失败被跳过的记录数
    pub skipped: usize,
}

/// 用当前快照整体覆盖历史表
pub(crate) fn save_history(conn: &Connection, items: &[ClipboardItem]) -> Result<(), AppError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::Database(format!("开始保存事务失败: {}", e)))?;

    tx.execute("DELETE FROM history", [])
        .map_err(|e| AppError::Database(format!("清空历史表失败: {}", e)))?;

    {
        let mut stmt = tx
            .prepare("INSERT INTO history (id, position, record) VALUES (?1, ?2, ?3)")
            .map_err(|e| AppError::Database(format!("准备插入语句失败: {}", e)))?;
        for (position, item) in items.iter().enumerate() {
            let record = encode_item(item)?;
            stmt.execute(params![item.id.to_string(), position as i64, record])
                .map_err(|e| AppError::Database(format!("写入历史记录失败: {}", e)))?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Database(format!("提交保存事务失败: {}", e)))?;

    log::debug!("💾 已保存 {} 条历史", items.len());
    Ok(())
}

/// 逐条解码历史，损坏的记录跳过并计数
pub(crate) fn load_history(conn: &Connection) -> Result<LoadReport, AppError> {
    let mut stmt = conn
        .prepare("SELECT id, record FROM history ORDER BY position ASC")
        .map_err(|e| AppError::Database(format!("准备历史查询失败: {}", e)))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| AppError::Database(format!("查询历史失败: {}", e)))?;

    let mut report = LoadReport::default();
    for row in rows {
        let decoded = row
            .map_err(|e| AppError::Database(format!("读取历史行失败: {}", e)))
            .and_then(|(id, record)| {
                decode_item(&record).map_err(|e| AppError::Database(format!("记录 {}: {}", id, e)))
            });
        match decoded {
            Ok(item) => report.items.push(item),
            Err(err) => {
                report.skipped += 1;
                log::warn!("💾 跳过损坏的历史记录: {}", err);
            }
        }
    }

    Ok(report)
}

/// 导出为 JSON 数组
pub fn export_history_json(items: &[ClipboardItem]) -> Result<String, AppError> {
    let records: Vec<ItemRecord> = items.iter().map(ItemRecord::from).collect();
    serde_json::to_string_pretty(&records)
        .map_err(|e| AppError::Database(format!("导出历史失败: {}", e)))
}

/// 从 JSON 数组导入；数组本身无效时报错，单条无效时跳过
pub fn import_history_json(json: &str) -> Result<LoadReport, AppError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| AppError::Database(format!("解析导入文件失败: {}", e)))?;

    let mut report = LoadReport::default();
    for value in values {
        let decoded = serde_json::from_value::<ItemRecord>(value)
            .map_err(|e| AppError::Database(format!("解析历史记录失败: {}", e)))
            .and_then(ClipboardItem::try_from);
        match decoded {
            Ok(item) => report.items.push(item),
            Err(err) => {
                report.skipped += 1;
                log::warn!("💾 跳过无效的导入记录: {}", err);
            }
        }
    }
    Ok(report)
}

use super::{BackupRecord, HistoryStore};
use crate::constants::history as consts;
use crate::Result;
use rusqlite::{Connection, OpenFlags, Row, params};
use std::path::Path;
use tracing::debug;

const LIST_IDS_SQL: &str = "SELECT timestamp FROM backups \
     WHERE (?1 OR date_deleted IS NULL OR date_deleted IN ('', ?3, ?4, ?5)) \
     AND (?2 OR status != ?6) \
     ORDER BY timestamp DESC";

const FETCH_RECORD_SQL: &str = "SELECT timestamp, end_time, backup_dir, backup_version, \
     compressed, compression_type, database_name, database_version, data_only, date_deleted, \
     exclude_schema_filtered, exclude_table_filtered, include_schema_filtered, \
     include_table_filtered, incremental, leaf_partition_data, metadata_only, plugin, \
     plugin_version, single_data_file, without_globals, with_statistics, status \
     FROM backups WHERE timestamp = ?1";

/// gpbackup_history.db (SQLite) 只读访问
pub struct SqliteHistoryStore {
    connection: Connection,
}

impl SqliteHistoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        // 只读打开，文件不存在时直接报错而不是创建空库
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("已打开历史数据库: {}", path.display());
        Ok(Self { connection })
    }

    #[cfg(test)]
    fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn list_record_ids(&self, include_deleted: bool, include_failed: bool) -> Result<Vec<String>> {
        let mut stmt = self.connection.prepare(LIST_IDS_SQL)?;
        let ids = stmt
            .query_map(
                params![
                    include_deleted,
                    include_failed,
                    consts::DELETION_IN_PROGRESS,
                    consts::DELETION_PLUGIN_FAILED,
                    consts::DELETION_LOCAL_FAILED,
                    consts::STATUS_FAILURE,
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn fetch_record(&self, id: &str) -> Result<BackupRecord> {
        let record = self
            .connection
            .query_row(FETCH_RECORD_SQL, params![id], map_record)?;
        Ok(record)
    }

    fn close(self) -> Result<()> {
        self.connection.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<BackupRecord> {
    // 可为空的文本列统一转换为空字符串
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };
    let flag = |idx: usize| -> rusqlite::Result<bool> {
        Ok(row.get::<_, Option<bool>>(idx)?.unwrap_or(false))
    };

    Ok(BackupRecord {
        timestamp: row.get(0)?,
        end_time: text(1)?,
        backup_dir: text(2)?,
        backup_version: text(3)?,
        compressed: flag(4)?,
        compression_type: text(5)?,
        database_name: row.get(6)?,
        database_version: text(7)?,
        data_only: flag(8)?,
        date_deleted: text(9)?,
        exclude_schema_filtered: flag(10)?,
        exclude_table_filtered: flag(11)?,
        include_schema_filtered: flag(12)?,
        include_table_filtered: flag(13)?,
        incremental: flag(14)?,
        leaf_partition_data: flag(15)?,
        metadata_only: flag(16)?,
        plugin: text(17)?,
        plugin_version: text(18)?,
        single_data_file: flag(19)?,
        without_globals: flag(20)?,
        with_statistics: flag(21)?,
        status: row.get(22)?,
    })
}

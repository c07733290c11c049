//! gpbackup 历史记录加载
//!
//! 支持两种历史存储格式：
//! - `gpbackup_history.yaml`：按时间戳倒序排列的扁平日志（gpbackup 1.29.0 之前）；
//! - `gpbackup_history.db`：SQLite 索引存储（gpbackup 1.29.0 之后），本身不保证顺序。
//!
//! 两种格式都通过 [`load_history`] 返回按开始时间倒序排列的 [`History`]，
//! 后续的采集深度过滤和"最近成功备份"计算都依赖这个顺序。

mod flat_log;
mod models;
pub(crate) mod sqlite;

pub use models::{BackupRecord, History};
pub use sqlite::SqliteHistoryStore;

use crate::constants::history as consts;
use crate::{ExporterError, Result};
use std::path::Path;
use tracing::debug;

/// 历史存储格式，只通过文件扩展名判断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFormat {
    FlatLog,
    IndexedStore,
}

impl HistoryFormat {
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        if consts::FLAT_LOG_EXTENSIONS.contains(&ext) {
            Ok(HistoryFormat::FlatLog)
        } else if ext == consts::INDEXED_STORE_EXTENSION {
            Ok(HistoryFormat::IndexedStore)
        } else {
            Err(ExporterError::UnsupportedFormat(format!(
                "{} (需要 .yaml 或 .db 文件)",
                path.display()
            )))
        }
    }
}

/// 索引存储查询时是否包含已删除、已失败的备份
///
/// 只作用于 `gpbackup_history.db`；扁平日志总是返回全部记录。默认两者都包含，
/// 与扁平日志的结果保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSelection {
    pub include_deleted: bool,
    pub include_failed: bool,
}

impl Default for RecordSelection {
    fn default() -> Self {
        Self {
            include_deleted: true,
            include_failed: true,
        }
    }
}

/// 可按条件查询的历史存储
pub trait HistoryStore {
    /// 返回满足删除/失败过滤条件的记录标识（备份时间戳）
    fn list_record_ids(&self, include_deleted: bool, include_failed: bool) -> Result<Vec<String>>;

    /// 按标识读取单条记录
    fn fetch_record(&self, id: &str) -> Result<BackupRecord>;

    /// 释放存储句柄
    fn close(self) -> Result<()>;
}

/// 加载历史记录，按扩展名分派到对应的加载器
pub fn load_history(path: &Path, selection: RecordSelection) -> Result<History> {
    let history = match HistoryFormat::detect(path)? {
        HistoryFormat::FlatLog => flat_log::load(path)?,
        HistoryFormat::IndexedStore => {
            let store = SqliteHistoryStore::open(path)?;
            load_from_store(store, selection)?
        }
    };

    debug!(
        "历史记录加载完成: {} 条 ({})",
        history.backup_configs.len(),
        path.display()
    );
    Ok(history)
}

/// 从索引存储中读取记录并按时间戳倒序排列
///
/// 无论中途是否失败，存储句柄都会在返回前关闭；
/// 任何一条记录读取失败都会丢弃已读取的部分结果。
pub fn load_from_store<S: HistoryStore>(store: S, selection: RecordSelection) -> Result<History> {
    let fetched = fetch_all(&store, selection);
    let closed = store.close();

    let mut records = fetched?;
    closed?;

    sort_newest_first(&mut records);
    Ok(History {
        backup_configs: records,
    })
}

fn fetch_all<S: HistoryStore>(store: &S, selection: RecordSelection) -> Result<Vec<BackupRecord>> {
    let ids = store.list_record_ids(selection.include_deleted, selection.include_failed)?;
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        let record = store
            .fetch_record(&id)
            .map_err(|e| ExporterError::record_fetch(&id, e))?;
        records.push(record);
    }
    Ok(records)
}

/// 时间戳为定长数字字符串，字典序即时间顺序
pub(crate) fn sort_newest_first(records: &mut [BackupRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DeletionStatus;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::rc::Rc;

    /// 与 SQLite 查询中的删除/失败过滤条件一致
    fn selected(selection: RecordSelection, record: &BackupRecord) -> bool {
        (selection.include_deleted || !DeletionStatus::classify(&record.date_deleted).is_deleted())
            && (selection.include_failed || record.status != consts::STATUS_FAILURE)
    }

    fn record(timestamp: &str, status: &str, date_deleted: &str) -> BackupRecord {
        BackupRecord {
            database_name: "test".to_string(),
            timestamp: timestamp.to_string(),
            status: status.to_string(),
            date_deleted: date_deleted.to_string(),
            ..Default::default()
        }
    }

    /// 内存中的索引存储，可以指定在第几条记录读取时失败
    struct FakeStore {
        records: Vec<BackupRecord>,
        fail_on: Option<String>,
        fetched: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<bool>>,
    }

    /// 存储被移动进加载器之后，用于观察其行为
    struct Probe {
        fetched: Rc<RefCell<Vec<String>>>,
        closed: Rc<Cell<bool>>,
    }

    impl HistoryStore for FakeStore {
        fn list_record_ids(&self, include_deleted: bool, include_failed: bool) -> Result<Vec<String>> {
            let selection = RecordSelection {
                include_deleted,
                include_failed,
            };
            Ok(self
                .records
                .iter()
                .filter(|r| selected(selection, r))
                .map(|r| r.timestamp.clone())
                .collect())
        }

        fn fetch_record(&self, id: &str) -> Result<BackupRecord> {
            self.fetched.borrow_mut().push(id.to_string());
            if self.fail_on.as_deref() == Some(id) {
                return Err(ExporterError::load("模拟读取失败"));
            }
            self.records
                .iter()
                .find(|r| r.timestamp == id)
                .cloned()
                .ok_or_else(|| ExporterError::load(format!("记录不存在: {id}")))
        }

        fn close(self) -> Result<()> {
            self.closed.set(true);
            Ok(())
        }
    }

    fn fake_store(fail_on: Option<&str>) -> (FakeStore, Probe) {
        let probe = Probe {
            fetched: Rc::new(RefCell::new(Vec::new())),
            closed: Rc::new(Cell::new(false)),
        };
        let store = FakeStore {
            // 刻意打乱顺序，索引存储不保证有序
            records: vec![
                record("20230118152654", "Success", ""),
                record("20230120100000", "Failure", ""),
                record("20230119100000", "Success", "20230121000000"),
                record("20230121100000", "Success", "In progress"),
            ],
            fail_on: fail_on.map(str::to_string),
            fetched: probe.fetched.clone(),
            closed: probe.closed.clone(),
        };
        (store, probe)
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            HistoryFormat::detect(&PathBuf::from("/data/gpbackup_history.yaml")).unwrap(),
            HistoryFormat::FlatLog
        );
        assert_eq!(
            HistoryFormat::detect(&PathBuf::from("gpbackup_history.yml")).unwrap(),
            HistoryFormat::FlatLog
        );
        assert_eq!(
            HistoryFormat::detect(&PathBuf::from("/data/gpbackup_history.db")).unwrap(),
            HistoryFormat::IndexedStore
        );
        assert!(matches!(
            HistoryFormat::detect(&PathBuf::from("gpbackup_history.json")),
            Err(ExporterError::UnsupportedFormat(_))
        ));
        assert!(HistoryFormat::detect(&PathBuf::from("gpbackup_history")).is_err());
    }

    #[test]
    fn test_load_unsupported_format() {
        let result = load_history(
            &PathBuf::from("gpbackup_history.txt"),
            RecordSelection::default(),
        );
        assert!(matches!(result, Err(ExporterError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_default_selection_includes_everything() {
        let deleted = record("20230119100000", "Success", "20230121000000");
        let failed = record("20230120100000", "Failure", "");
        let deleting = record("20230121100000", "Success", "In progress");

        let default = RecordSelection::default();
        assert!(default.include_deleted && default.include_failed);
        assert!(selected(default, &deleted));
        assert!(selected(default, &failed));

        let none = RecordSelection {
            include_deleted: false,
            include_failed: false,
        };
        assert!(!selected(none, &deleted));
        assert!(!selected(none, &failed));
        assert!(selected(none, &deleting));
    }

    #[test]
    fn test_load_from_store_sorts_newest_first() {
        let (store, probe) = fake_store(None);
        let selection = RecordSelection {
            include_deleted: true,
            include_failed: true,
        };
        let history = load_from_store(store, selection).unwrap();

        let timestamps: Vec<&str> = history
            .backup_configs
            .iter()
            .map(|r| r.timestamp.as_str())
            .collect();
        assert_eq!(
            timestamps,
            vec![
                "20230121100000",
                "20230120100000",
                "20230119100000",
                "20230118152654"
            ]
        );
        assert!(probe.closed.get());
    }

    #[test]
    fn test_load_from_store_applies_selection() {
        let (store, _) = fake_store(None);
        let selection = RecordSelection {
            include_deleted: false,
            include_failed: false,
        };
        let history = load_from_store(store, selection).unwrap();

        let timestamps: Vec<&str> = history
            .backup_configs
            .iter()
            .map(|r| r.timestamp.as_str())
            .collect();
        assert_eq!(timestamps, vec!["20230121100000", "20230118152654"]);
    }

    #[test]
    fn test_load_from_store_closes_on_fetch_failure() {
        let (store, probe) = fake_store(Some("20230120100000"));
        let selection = RecordSelection {
            include_deleted: true,
            include_failed: true,
        };
        let result = load_from_store(store, selection);

        match result {
            Err(ExporterError::RecordFetch { id, .. }) => assert_eq!(id, "20230120100000"),
            other => panic!("期望 RecordFetch 错误, 实际: {other:?}"),
        }
        assert!(probe.closed.get(), "读取失败时也必须关闭存储");
    }

    #[test]
    fn test_load_from_store_stops_after_failure() {
        let (store, probe) = fake_store(Some("20230118152654"));
        let selection = RecordSelection {
            include_deleted: true,
            include_failed: true,
        };
        assert!(load_from_store(store, selection).is_err());
        // 失败的记录是第一个标识，之后的记录不再读取
        assert_eq!(*probe.fetched.borrow(), vec!["20230118152654".to_string()]);
        assert!(probe.closed.get());
    }
}

//! 数据库 include/exclude 过滤与采集深度窗口

use crate::classifier::{BackupType, parse_local_timestamp};
use crate::constants::label;
use crate::history::BackupRecord;
use chrono::{DateTime, Days, Local};

/// 一次扫描的数据库范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// 未指定 include 列表，扫描全部数据库
    AllDatabases,
    Database(String),
}

impl Scope {
    /// 根据 include 列表生成扫描范围；空字符串会被忽略
    pub fn candidates(db_include: &[String]) -> Vec<Scope> {
        let scopes: Vec<Scope> = db_include
            .iter()
            .filter(|db| !db.is_empty())
            .map(|db| Scope::Database(db.clone()))
            .collect();

        if scopes.is_empty() {
            vec![Scope::AllDatabases]
        } else {
            scopes
        }
    }

    /// `gpbackup_exporter_status` 使用的数据库标签
    pub fn status_key(&self) -> &str {
        match self {
            Scope::AllDatabases => label::ALL_DATABASES,
            Scope::Database(db) => db,
        }
    }

    fn contains(&self, record: &BackupRecord, db_exclude: &[String]) -> bool {
        match self {
            Scope::AllDatabases => !is_excluded(&record.database_name, db_exclude),
            Scope::Database(db) => record.database_name == *db,
        }
    }
}

/// 数据库是否在 exclude 列表中
pub fn is_excluded(db: &str, db_exclude: &[String]) -> bool {
    db_exclude.iter().any(|ex| !ex.is_empty() && ex == db)
}

/// 采集深度窗口：只处理开始时间晚于 `now - depth` 的备份
#[derive(Debug, Clone, Copy)]
pub struct DepthWindow {
    cutoff: Option<DateTime<Local>>,
}

impl DepthWindow {
    /// `depth_days` 为 0 时不限制
    pub fn new(depth_days: u32, now: DateTime<Local>) -> Self {
        let cutoff = if depth_days > 0 {
            now.checked_sub_days(Days::new(u64::from(depth_days)))
        } else {
            None
        };
        Self { cutoff }
    }

    pub fn cutoff(&self) -> Option<DateTime<Local>> {
        self.cutoff
    }

    /// 记录是否在窗口内；无法解析的开始时间视为早于任何截止时间
    pub fn accepts(&self, record: &BackupRecord) -> bool {
        match self.cutoff {
            None => true,
            Some(cutoff) => parse_local_timestamp(&record.timestamp)
                .map(|start| cutoff < start)
                .unwrap_or(false),
        }
    }
}

/// 单个范围的扫描结果
#[derive(Debug, Default)]
pub struct ScanOutcome<'a> {
    /// 通过过滤的记录，保持原有顺序
    pub accepted: Vec<&'a BackupRecord>,
    /// 实际访问过的记录数
    pub examined: usize,
}

/// 按顺序扫描历史记录
///
/// 记录必须按开始时间倒序排列：启用采集深度时，遇到第一条超出窗口的记录即停止扫描，
/// 之后更早的记录不会再被访问。
pub fn scan<'a>(
    records: &'a [BackupRecord],
    scope: &Scope,
    backup_type: Option<BackupType>,
    db_exclude: &[String],
    window: &DepthWindow,
) -> ScanOutcome<'a> {
    let mut outcome = ScanOutcome::default();

    for record in records {
        outcome.examined += 1;

        if !scope.contains(record, db_exclude) {
            continue;
        }
        if backup_type.is_some_and(|t| t != BackupType::classify(record)) {
            continue;
        }
        if !window.accepts(record) {
            break;
        }
        outcome.accepted.push(record);
    }

    outcome
}

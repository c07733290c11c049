//! 备份记录分类：备份类型、对象过滤方式、删除状态与持续时间
//!
//! 这里都是纯函数，不做 I/O，也不持有状态。

use crate::constants::{history, label};
use crate::history::BackupRecord;
use crate::{ExporterError, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt;
use std::str::FromStr;

/// 备份类型
///
/// - full: 包含数据库的用户数据以及全部全局、本地元数据；
/// - incremental: 包含自上次全量备份以来变化的用户数据与元数据；
/// - data-only: 只包含用户数据；
/// - metadata-only: 只包含全局和本地元数据。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackupType {
    Full,
    Incremental,
    DataOnly,
    MetadataOnly,
}

impl BackupType {
    pub const ALL: [BackupType; 4] = [
        BackupType::Full,
        BackupType::Incremental,
        BackupType::DataOnly,
        BackupType::MetadataOnly,
    ];

    /// 按 incremental > data-only > metadata-only > full 的优先级判断备份类型
    ///
    /// gpbackup 不允许 `--incremental` 与 `--data-only`/`--metadata-only` 同时使用，
    /// 但这里不依赖该约定，标志位冲突时按优先级取第一个命中的类型。
    pub fn classify(record: &BackupRecord) -> Self {
        if record.incremental {
            BackupType::Incremental
        } else if record.data_only {
            BackupType::DataOnly
        } else if record.metadata_only {
            BackupType::MetadataOnly
        } else {
            BackupType::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Full => "full",
            BackupType::Incremental => "incremental",
            BackupType::DataOnly => "data-only",
            BackupType::MetadataOnly => "metadata-only",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self> {
        BackupType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ExporterError::invalid_config(format!(
                    "未知的备份类型 '{s}'，可选值: full, incremental, data-only, metadata-only"
                ))
            })
    }
}

/// 对象过滤方式，对应 gpbackup 的 `--include-schema` 等参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFiltering {
    IncludeSchema,
    ExcludeSchema,
    IncludeTable,
    ExcludeTable,
}

impl ObjectFiltering {
    /// 按 include-schema > exclude-schema > include-table > exclude-table 取第一个命中项，
    /// 未设置任何过滤时返回 `None`
    pub fn classify(record: &BackupRecord) -> Option<Self> {
        if record.include_schema_filtered {
            Some(ObjectFiltering::IncludeSchema)
        } else if record.exclude_schema_filtered {
            Some(ObjectFiltering::ExcludeSchema)
        } else if record.include_table_filtered {
            Some(ObjectFiltering::IncludeTable)
        } else if record.exclude_table_filtered {
            Some(ObjectFiltering::ExcludeTable)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectFiltering::IncludeSchema => "include-schema",
            ObjectFiltering::ExcludeSchema => "exclude-schema",
            ObjectFiltering::IncludeTable => "include-table",
            ObjectFiltering::ExcludeTable => "exclude-table",
        }
    }

    /// 转换为标签值，未过滤时为占位值 `none`
    pub fn label(filtering: Option<Self>) -> &'static str {
        filtering.map_or(label::EMPTY_LABEL, |f| f.as_str())
    }
}

/// 备份删除状态
///
/// 取值参考 gpbackup_manager 的文档，但不限于其中列出的状态：
/// - 0: 备份仍然存在；
/// - 1: 备份已成功删除；
/// - 2: 删除进行中；
/// - 3: 上次删除未能从插件存储中删除备份；
/// - 4: 上次删除未能从本地存储中删除备份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    Exists,
    Deleted(String),
    InProgress,
    PluginDeleteFailed,
    LocalDeleteFailed,
}

impl DeletionStatus {
    pub fn classify(marker: &str) -> Self {
        match marker {
            "" => DeletionStatus::Exists,
            history::DELETION_IN_PROGRESS => DeletionStatus::InProgress,
            history::DELETION_PLUGIN_FAILED => DeletionStatus::PluginDeleteFailed,
            history::DELETION_LOCAL_FAILED => DeletionStatus::LocalDeleteFailed,
            date => DeletionStatus::Deleted(date.to_string()),
        }
    }

    pub fn code(&self) -> f64 {
        match self {
            DeletionStatus::Exists => 0.0,
            DeletionStatus::Deleted(_) => 1.0,
            DeletionStatus::InProgress => 2.0,
            DeletionStatus::PluginDeleteFailed => 3.0,
            DeletionStatus::LocalDeleteFailed => 4.0,
        }
    }

    /// `date_deleted` 标签值，只有成功删除时才是实际的删除时间
    pub fn display_date(&self) -> &str {
        match self {
            DeletionStatus::Deleted(date) => date,
            _ => label::EMPTY_LABEL,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, DeletionStatus::Deleted(_))
    }
}

/// 解析 `YYYYMMDDHHMMSS` 格式的本地时间
pub fn parse_local_timestamp(value: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value, history::TIMESTAMP_LAYOUT)
        .map_err(|_| ExporterError::timestamp_parse(value))?;
    // 夏令时回拨时取较早的时刻；落在夏令时跳变区间内的时间视为无效
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ExporterError::timestamp_parse(value))
}

/// 计算备份持续时间（秒）
///
/// 备份进行中时结束时间为空，此时返回 `TimestampParse` 错误，调用方应只跳过该指标。
pub fn compute_duration(start: &str, end: &str) -> Result<f64> {
    let start = parse_local_timestamp(start)?;
    let end = parse_local_timestamp(end)?;
    Ok((end - start).num_milliseconds() as f64 / 1000.0)
}

/// 备份状态转换为指标值：失败为 1，其他为 0
pub fn status_value(status: &str) -> f64 {
    if status == history::STATUS_FAILURE {
        1.0
    } else {
        0.0
    }
}

/// 空字符串转换为占位标签 `none`
pub fn label_or_none(value: &str) -> &str {
    if value.is_empty() {
        label::EMPTY_LABEL
    } else {
        value
    }
}

//! 把过滤后的备份记录推导为指标观测值
//!
//! 这里只做纯计算：输入历史记录、过滤参数和当前时间，输出不可变的观测值列表，
//! 不接触指标注册表。

use crate::classifier::{
    BackupType, DeletionStatus, ObjectFiltering, compute_duration, label_or_none,
    parse_local_timestamp, status_value,
};
use crate::constants::history as consts;
use crate::filter::{DepthWindow, Scope, is_excluded, scan};
use crate::history::{BackupRecord, History};
use crate::metrics::{MetricKind, Observation};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use tracing::{error, warn};

/// 数据库 -> 备份类型 -> 最近一次成功备份的结束时间
pub type LastBackupIndex = BTreeMap<String, BTreeMap<BackupType, DateTime<Local>>>;

/// 数据库（或 `all-databases`）-> 本周期数据获取是否成功
pub type DatabaseStatus = BTreeMap<String, bool>;

/// 采集过滤参数
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// 只采集指定类型的备份，`None` 表示不过滤
    pub backup_type: Option<BackupType>,
    pub db_include: Vec<String>,
    pub db_exclude: Vec<String>,
    /// 采集深度（天），0 表示不限制
    pub collect_depth_days: u32,
}

/// 一个采集周期的推导结果
#[derive(Debug, Default)]
pub struct Derivation {
    pub observations: Vec<Observation>,
    pub last_backups: LastBackupIndex,
    pub database_status: DatabaseStatus,
    /// 扫描过程中访问过的记录总数
    pub examined: usize,
    /// 通过过滤并产出指标的记录总数
    pub accepted: usize,
    /// 扫描顺序中开始时间比前一条更新的记录数，非 0 说明历史记录没有按倒序排列
    pub order_violations: usize,
}

/// 推导一个采集周期的全部观测值
///
/// `history` 为 `None` 表示本周期历史加载失败，此时只产出 `false` 的状态指标。
pub fn derive(history: Option<&History>, options: &CollectOptions, now: DateTime<Local>) -> Derivation {
    let mut derivation = Derivation::default();
    let window = DepthWindow::new(options.collect_depth_days, now);

    for scope in Scope::candidates(&options.db_include) {
        let key = scope.status_key().to_string();

        if let Scope::Database(db) = &scope {
            if is_excluded(db, &options.db_exclude) {
                warn!("数据库同时出现在 include 和 exclude 列表中: {}", db);
                mark_status(&mut derivation.database_status, key, false);
                continue;
            }
        }

        let Some(history) = history else {
            mark_status(&mut derivation.database_status, key, false);
            continue;
        };

        let outcome = scan(
            &history.backup_configs,
            &scope,
            options.backup_type,
            &options.db_exclude,
            &window,
        );
        derivation.examined += outcome.examined;
        derivation.accepted += outcome.accepted.len();

        if outcome.accepted.is_empty() {
            warn!("没有获取到备份数据: {}", key);
        }

        let mut previous: Option<&str> = None;
        for record in outcome.accepted {
            if let Some(prev) = previous {
                if record.timestamp.as_str() > prev {
                    derivation.order_violations += 1;
                    warn!(
                        "历史记录未按时间倒序排列: {} 出现在 {} 之后，最近成功备份的计算可能不准确",
                        record.timestamp, prev
                    );
                }
            }
            previous = Some(record.timestamp.as_str());

            push_backup_observations(record, &mut derivation.observations);
            track_last_backup(record, &mut derivation.last_backups);
        }

        mark_status(&mut derivation.database_status, key, true);
    }

    if derivation.last_backups.is_empty() {
        warn!("没有成功的备份");
    }
    for (db, backups) in &derivation.last_backups {
        for (backup_type, end_time) in backups {
            let seconds = (now - *end_time).num_milliseconds() as f64 / 1000.0;
            derivation.observations.push(Observation::new(
                MetricKind::BackupSinceLastCompletion,
                seconds,
                [backup_type.as_str(), db.as_str()],
            ));
        }
    }

    for (db, ok) in &derivation.database_status {
        derivation.observations.push(Observation::new(
            MetricKind::ExporterStatus,
            if *ok { 1.0 } else { 0.0 },
            [db.as_str()],
        ));
    }

    derivation
}

/// 同一个数据库键出现多次时，任一次失败即为失败
fn mark_status(status: &mut DatabaseStatus, key: String, ok: bool) {
    status
        .entry(key)
        .and_modify(|current| *current = *current && ok)
        .or_insert(ok);
}

/// 单条备份记录的状态、删除状态、信息与持续时间指标
fn push_backup_observations(record: &BackupRecord, observations: &mut Vec<Observation>) {
    let backup_type = BackupType::classify(record).as_str();
    let database = label_or_none(&record.database_name);
    let filtering = ObjectFiltering::label(ObjectFiltering::classify(record));
    let plugin = label_or_none(&record.plugin);
    let timestamp = label_or_none(&record.timestamp);
    let deletion = DeletionStatus::classify(&record.date_deleted);

    observations.push(Observation::new(
        MetricKind::BackupStatus,
        status_value(&record.status),
        [backup_type, database, filtering, plugin, timestamp],
    ));
    observations.push(Observation::new(
        MetricKind::BackupDeletionStatus,
        deletion.code(),
        [
            backup_type,
            database,
            deletion.display_date(),
            filtering,
            plugin,
            timestamp,
        ],
    ));
    observations.push(Observation::new(
        MetricKind::BackupInfo,
        1.0,
        [
            label_or_none(&record.backup_dir),
            label_or_none(&record.backup_version),
            backup_type,
            label_or_none(&record.compression_type),
            database,
            label_or_none(&record.database_version),
            filtering,
            plugin,
            label_or_none(&record.plugin_version),
            timestamp,
            if record.with_statistics { "true" } else { "false" },
        ],
    ));

    // 备份进行中时结束时间为空，只跳过持续时间指标
    match compute_duration(&record.timestamp, &record.end_time) {
        Ok(duration) => observations.push(Observation::new(
            MetricKind::BackupDuration,
            duration,
            [backup_type, database, filtering, plugin, timestamp],
        )),
        Err(e) => error!("计算备份持续时间失败 ({}): {}", record.timestamp, e),
    }
}

/// 记录最近一次成功备份的结束时间
///
/// 记录按时间倒序到达，因此同一 (数据库, 类型) 第一次出现的成功备份就是最近一次，
/// 之后出现的记录不再覆盖。
fn track_last_backup(record: &BackupRecord, index: &mut LastBackupIndex) {
    if record.status != consts::STATUS_SUCCESS {
        return;
    }
    let backup_type = BackupType::classify(record);
    let by_type = index.entry(record.database_name.clone()).or_default();
    if by_type.contains_key(&backup_type) {
        return;
    }
    match parse_local_timestamp(&record.end_time) {
        Ok(end_time) => {
            by_type.insert(backup_type, end_time);
        }
        Err(e) => warn!("成功备份的结束时间无效 ({}): {}", record.timestamp, e),
    }
}

//! 单个采集周期：重置指标 -> 加载历史 -> 推导 -> 发布

use crate::aggregator::{CollectOptions, derive};
use crate::config::ExporterConfig;
use crate::error::Result;
use crate::history::{RecordSelection, load_history};
use crate::metrics::{ExporterMetrics, Observation};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 一个采集周期的执行摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 历史记录加载成功时的记录数
    pub loaded: Option<usize>,
    pub examined: usize,
    pub accepted: usize,
    /// 实际发布的观测值数量（含导出器信息）
    pub published: usize,
    pub publish_failures: usize,
    pub order_violations: usize,
}

impl CycleReport {
    pub fn load_failed(&self) -> bool {
        self.loaded.is_none()
    }
}

/// 周期性采集执行器
///
/// 不持有任何跨周期的推导状态，只保留配置和注入的指标注册表。
pub struct Collector {
    history_file: PathBuf,
    selection: RecordSelection,
    options: CollectOptions,
    metrics: Arc<ExporterMetrics>,
    version: String,
}

impl Collector {
    pub fn new(
        config: &ExporterConfig,
        metrics: Arc<ExporterMetrics>,
        version: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            history_file: config.gpbackup.history_file.clone(),
            selection: config.record_selection(),
            options: config.collect_options()?,
            metrics,
            version: version.into(),
        })
    }

    pub fn metrics(&self) -> &Arc<ExporterMetrics> {
        &self.metrics
    }

    /// 执行一次完整的采集
    ///
    /// 历史加载失败不会中断周期，只把对应数据库的状态置为 0。
    pub fn collect_once(&self, now: DateTime<Local>) -> CycleReport {
        self.metrics.reset();

        let history = match load_history(&self.history_file, self.selection) {
            Ok(history) => Some(history),
            Err(e) => {
                error!(
                    "读取 gpbackup 历史文件失败 ({}): {}",
                    self.history_file.display(),
                    e
                );
                None
            }
        };

        let derivation = derive(history.as_ref(), &self.options, now);

        let mut observations = derivation.observations;
        observations.push(Observation::exporter_info(&self.version));
        let publish_failures = self.metrics.publish_all(&observations);

        let report = CycleReport {
            loaded: history.as_ref().map(|h| h.backup_configs.len()),
            examined: derivation.examined,
            accepted: derivation.accepted,
            published: observations.len() - publish_failures,
            publish_failures,
            order_violations: derivation.order_violations,
        };

        if report.order_violations > 0 {
            warn!(
                "本周期发现 {} 处历史记录顺序异常",
                report.order_violations
            );
        }
        info!(
            "采集完成: 加载 {} 条, 扫描 {} 条, 采集 {} 条, 发布 {} 个指标",
            report.loaded.unwrap_or_default(),
            report.examined,
            report.accepted,
            report.published
        );
        report
    }
}

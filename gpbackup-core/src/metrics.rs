//! Prometheus 指标定义与发布
//!
//! [`ExporterMetrics`] 持有独立的 `Registry`，由调用方创建并注入，不使用全局注册表。
//! 推导逻辑只产出 [`Observation`] 列表，这里负责把它们写入对应的 `GaugeVec`。

use crate::Result;
use crate::constants::metrics as names;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, error};

/// 指标文本格式的 Content-Type
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// 导出的指标种类，标签顺序与线上抓取端保持一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    BackupStatus,
    BackupDeletionStatus,
    BackupInfo,
    BackupDuration,
    BackupSinceLastCompletion,
    ExporterStatus,
    ExporterInfo,
}

impl MetricKind {
    pub const ALL: [MetricKind; 7] = [
        MetricKind::BackupStatus,
        MetricKind::BackupDeletionStatus,
        MetricKind::BackupInfo,
        MetricKind::BackupDuration,
        MetricKind::BackupSinceLastCompletion,
        MetricKind::ExporterStatus,
        MetricKind::ExporterInfo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::BackupStatus => names::BACKUP_STATUS,
            MetricKind::BackupDeletionStatus => names::BACKUP_DELETION_STATUS,
            MetricKind::BackupInfo => names::BACKUP_INFO,
            MetricKind::BackupDuration => names::BACKUP_DURATION,
            MetricKind::BackupSinceLastCompletion => names::BACKUP_SINCE_LAST_COMPLETION,
            MetricKind::ExporterStatus => names::EXPORTER_STATUS,
            MetricKind::ExporterInfo => names::EXPORTER_INFO,
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricKind::BackupStatus => "Backup status.",
            MetricKind::BackupDeletionStatus => "Backup deletion status.",
            MetricKind::BackupInfo => "Backup info.",
            MetricKind::BackupDuration => "Backup duration.",
            MetricKind::BackupSinceLastCompletion => "Seconds since the last completed backup.",
            MetricKind::ExporterStatus => "gpbackup exporter get data status.",
            MetricKind::ExporterInfo => "Information about gpbackup exporter.",
        }
    }

    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            MetricKind::BackupStatus | MetricKind::BackupDuration => &[
                "backup_type",
                "database_name",
                "object_filtering",
                "plugin",
                "timestamp",
            ],
            MetricKind::BackupDeletionStatus => &[
                "backup_type",
                "database_name",
                "date_deleted",
                "object_filtering",
                "plugin",
                "timestamp",
            ],
            MetricKind::BackupInfo => &[
                "backup_dir",
                "backup_ver",
                "backup_type",
                "compression_type",
                "database_name",
                "database_ver",
                "object_filtering",
                "plugin",
                "plugin_ver",
                "timestamp",
                "with_statistic",
            ],
            MetricKind::BackupSinceLastCompletion => &["backup_type", "database_name"],
            MetricKind::ExporterStatus => &["database_name"],
            MetricKind::ExporterInfo => &["version"],
        }
    }
}

/// 一次指标观测值：(指标, 数值, 按顺序排列的标签值)
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: MetricKind,
    pub value: f64,
    pub labels: Vec<String>,
}

impl Observation {
    pub fn new<I, S>(metric: MetricKind, value: f64, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metric,
            value,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exporter_info(version: &str) -> Self {
        Self::new(MetricKind::ExporterInfo, 1.0, [version])
    }
}

/// 导出器的全部 gauge 指标
pub struct ExporterMetrics {
    registry: Registry,
    backup_status: GaugeVec,
    backup_deletion_status: GaugeVec,
    backup_info: GaugeVec,
    backup_duration: GaugeVec,
    backup_since_last_completion: GaugeVec,
    exporter_status: GaugeVec,
    exporter_info: GaugeVec,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// 在给定的注册表上注册全部指标
    pub fn with_registry(registry: Registry) -> Result<Self> {
        Ok(Self {
            backup_status: register_gauge_vec(&registry, MetricKind::BackupStatus)?,
            backup_deletion_status: register_gauge_vec(&registry, MetricKind::BackupDeletionStatus)?,
            backup_info: register_gauge_vec(&registry, MetricKind::BackupInfo)?,
            backup_duration: register_gauge_vec(&registry, MetricKind::BackupDuration)?,
            backup_since_last_completion: register_gauge_vec(
                &registry,
                MetricKind::BackupSinceLastCompletion,
            )?,
            exporter_status: register_gauge_vec(&registry, MetricKind::ExporterStatus)?,
            exporter_info: register_gauge_vec(&registry, MetricKind::ExporterInfo)?,
            registry,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn gauge(&self, kind: MetricKind) -> &GaugeVec {
        match kind {
            MetricKind::BackupStatus => &self.backup_status,
            MetricKind::BackupDeletionStatus => &self.backup_deletion_status,
            MetricKind::BackupInfo => &self.backup_info,
            MetricKind::BackupDuration => &self.backup_duration,
            MetricKind::BackupSinceLastCompletion => &self.backup_since_last_completion,
            MetricKind::ExporterStatus => &self.exporter_status,
            MetricKind::ExporterInfo => &self.exporter_info,
        }
    }

    /// 清空所有指标的全部标签组合
    ///
    /// 每个采集周期开始前调用，避免已从历史中消失的数据库或备份类型继续上报旧值。
    pub fn reset(&self) {
        for kind in MetricKind::ALL {
            self.gauge(kind).reset();
        }
    }

    pub fn publish(&self, observation: &Observation) -> Result<()> {
        let labels: Vec<&str> = observation.labels.iter().map(String::as_str).collect();
        debug!(
            "指标 {} value={} labels={}",
            observation.metric.name(),
            observation.value,
            labels.join(",")
        );
        let gauge = self
            .gauge(observation.metric)
            .get_metric_with_label_values(&labels)?;
        gauge.set(observation.value);
        Ok(())
    }

    /// 发布全部观测值，单个指标失败只记录日志；返回失败数量
    pub fn publish_all(&self, observations: &[Observation]) -> usize {
        let mut failures = 0;
        for observation in observations {
            if let Err(e) = self.publish(observation) {
                error!("指标 {} 设置失败: {}", observation.metric.name(), e);
                failures += 1;
            }
        }
        failures
    }

    /// 以 Prometheus 文本格式输出当前注册表内容
    pub fn render(&self) -> Result<String> {
        let mut families = self.registry.gather();
        families.retain(|mf| !mf.get_metric().is_empty());

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// 读取指定标签组合的当前值，不会创建新的标签组合
    #[cfg(test)]
    pub(crate) fn value(&self, kind: MetricKind, labels: &[(&str, &str)]) -> Option<f64> {
        self.registry
            .gather()
            .iter()
            .filter(|mf| mf.get_name() == kind.name())
            .flat_map(|mf| mf.get_metric().iter())
            .find(|m| {
                labels.iter().all(|(name, value)| {
                    m.get_label()
                        .iter()
                        .any(|lp| lp.get_name() == *name && lp.get_value() == *value)
                })
            })
            .map(|m| m.get_gauge().get_value())
    }

    /// 指定指标当前的标签组合数量
    #[cfg(test)]
    pub(crate) fn series_count(&self, kind: MetricKind) -> usize {
        self.registry
            .gather()
            .iter()
            .filter(|mf| mf.get_name() == kind.name())
            .map(|mf| mf.get_metric().len())
            .sum()
    }
}

fn register_gauge_vec(registry: &Registry, kind: MetricKind) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(kind.name(), kind.help()), kind.label_names())?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

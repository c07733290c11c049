use crate::aggregator::CollectOptions;
use crate::classifier::BackupType;
use crate::constants::defaults;
use crate::error::{ExporterError, Result};
use crate::history::{HistoryFormat, RecordSelection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 导出器配置
///
/// 可以从 TOML 文件加载，命令行参数会覆盖文件中的同名配置。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ExporterConfig {
    pub gpbackup: GpbackupConfig,
    pub web: WebConfig,
    pub collect: CollectConfig,
}

/// gpbackup 历史记录相关配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GpbackupConfig {
    /// gpbackup_history.yaml 或 gpbackup_history.db 的路径
    pub history_file: PathBuf,
    pub db_include: Vec<String>,
    pub db_exclude: Vec<String>,
    /// full / incremental / data-only / metadata-only，空字符串表示不过滤
    pub backup_type: String,
    /// 只对 gpbackup_history.db 生效，关闭后查询时跳过已删除的备份
    pub collect_deleted: bool,
    /// 只对 gpbackup_history.db 生效，关闭后查询时跳过失败的备份
    pub collect_failed: bool,
}

/// HTTP 服务相关配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WebConfig {
    pub listen_address: String,
    pub endpoint: String,
    /// TLS 与 basic 认证配置文件 (YAML)，不设置时以明文 HTTP 提供服务
    pub config_file: Option<PathBuf>,
}

/// 采集周期相关配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CollectConfig {
    /// 采集间隔（秒）
    pub interval: u64,
    /// 采集深度（天），0 表示不限制
    pub depth: u32,
}

impl Default for GpbackupConfig {
    fn default() -> Self {
        let selection = RecordSelection::default();
        Self {
            history_file: PathBuf::new(),
            db_include: Vec::new(),
            db_exclude: Vec::new(),
            backup_type: String::new(),
            collect_deleted: selection.include_deleted,
            collect_failed: selection.include_failed,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: defaults::LISTEN_ADDRESS.to_string(),
            endpoint: defaults::METRICS_ENDPOINT.to_string(),
            config_file: None,
        }
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            interval: defaults::COLLECT_INTERVAL_SECS,
            depth: defaults::COLLECT_DEPTH_DAYS,
        }
    }
}

impl ExporterConfig {
    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: ExporterConfig = toml::from_str(&content)?;
        tracing::info!("已加载配置文件: {}", path.as_ref().display());
        Ok(config)
    }

    /// 启动前校验配置
    pub fn validate(&self) -> Result<()> {
        if self.gpbackup.history_file.as_os_str().is_empty() {
            return Err(ExporterError::invalid_config(
                "未指定历史文件，请设置 --gpbackup.history-file",
            ));
        }
        HistoryFormat::detect(&self.gpbackup.history_file)?;

        if self.collect.interval == 0 {
            return Err(ExporterError::invalid_config("采集间隔必须大于 0 秒"));
        }
        if !self.web.endpoint.starts_with('/') || self.web.endpoint == "/" {
            return Err(ExporterError::invalid_config(format!(
                "指标路径必须以 '/' 开头且不能是根路径: '{}'",
                self.web.endpoint
            )));
        }
        if self
            .web
            .config_file
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ExporterError::invalid_config("web 配置文件路径不能为空"));
        }
        self.backup_type()?;
        Ok(())
    }

    /// 解析备份类型过滤条件
    pub fn backup_type(&self) -> Result<Option<BackupType>> {
        match self.gpbackup.backup_type.as_str() {
            "" => Ok(None),
            value => value.parse().map(Some),
        }
    }

    pub fn collect_interval(&self) -> Duration {
        Duration::from_secs(self.collect.interval)
    }

    pub fn record_selection(&self) -> RecordSelection {
        RecordSelection {
            include_deleted: self.gpbackup.collect_deleted,
            include_failed: self.gpbackup.collect_failed,
        }
    }

    /// 转换为推导阶段使用的过滤参数
    pub fn collect_options(&self) -> Result<CollectOptions> {
        Ok(CollectOptions {
            backup_type: self.backup_type()?,
            db_include: non_empty(&self.gpbackup.db_include),
            db_exclude: non_empty(&self.gpbackup.db_exclude),
            collect_depth_days: self.collect.depth,
        })
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values.iter().filter(|v| !v.is_empty()).cloned().collect()
}

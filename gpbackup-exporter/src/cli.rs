use crate::project_info::{metadata, version_info};
use clap::Parser;
use gpbackup_core::Result;
use gpbackup_core::config::ExporterConfig;
use std::path::PathBuf;

/// gpbackup exporter - gpbackup 备份历史 Prometheus 导出器
///
/// 命令行参数优先于配置文件中的同名配置。
#[derive(Parser, Debug, Default)]
#[command(name = "gpbackup_exporter")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::EXPORTER_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// TOML 配置文件路径
    #[arg(short, long, env = "GPBACKUP_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    /// HTTP 监听地址，默认 0.0.0.0:19854
    #[arg(long = "web.listen-address", value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// 指标路径，默认 /metrics
    #[arg(long = "web.endpoint", value_name = "PATH")]
    pub endpoint: Option<String>,

    /// TLS 与 basic 认证配置文件 (YAML)
    #[arg(long = "web.config.file", value_name = "FILE")]
    pub web_config_file: Option<PathBuf>,

    /// 采集间隔（秒），默认 600
    #[arg(long = "collect.interval", value_name = "SECONDS")]
    pub collect_interval: Option<u64>,

    /// 采集深度（天），早于该时间范围的备份不采集，0 表示不限制
    #[arg(long = "collect.depth", value_name = "DAYS")]
    pub collect_depth: Option<u32>,

    /// gpbackup_history.db 或 gpbackup_history.yaml 的路径
    #[arg(
        long = "gpbackup.history-file",
        value_name = "FILE",
        env = "GPBACKUP_HISTORY_FILE"
    )]
    pub history_file: Option<PathBuf>,

    /// 只采集指定数据库，可以多次指定
    #[arg(long = "gpbackup.db-include", value_name = "DB")]
    pub db_include: Vec<String>,

    /// 排除指定数据库，可以多次指定
    #[arg(long = "gpbackup.db-exclude", value_name = "DB")]
    pub db_exclude: Vec<String>,

    /// 只采集指定类型的备份: full, incremental, data-only, metadata-only
    #[arg(long = "gpbackup.backup-type", value_name = "TYPE")]
    pub backup_type: Option<String>,

    /// 查询 gpbackup_history.db 时包含已删除的备份，默认 true
    #[arg(
        long = "gpbackup.collect-deleted",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub collect_deleted: Option<bool>,

    /// 查询 gpbackup_history.db 时包含失败的备份，默认 true
    #[arg(
        long = "gpbackup.collect-failed",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub collect_failed: Option<bool>,
}

impl Cli {
    /// 加载配置文件（如果指定），合并命令行参数并校验
    pub fn load_config(&self) -> Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::load_from_file(path)?,
            None => ExporterConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut ExporterConfig) {
        if let Some(listen_address) = &self.listen_address {
            config.web.listen_address = listen_address.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.web.endpoint = endpoint.clone();
        }
        if let Some(web_config_file) = &self.web_config_file {
            config.web.config_file = Some(web_config_file.clone());
        }
        if let Some(interval) = self.collect_interval {
            config.collect.interval = interval;
        }
        if let Some(depth) = self.collect_depth {
            config.collect.depth = depth;
        }
        if let Some(history_file) = &self.history_file {
            config.gpbackup.history_file = history_file.clone();
        }
        if !self.db_include.is_empty() {
            config.gpbackup.db_include = self.db_include.clone();
        }
        if !self.db_exclude.is_empty() {
            config.gpbackup.db_exclude = self.db_exclude.clone();
        }
        if let Some(backup_type) = &self.backup_type {
            config.gpbackup.backup_type = backup_type.clone();
        }
        if let Some(collect_deleted) = self.collect_deleted {
            config.gpbackup.collect_deleted = collect_deleted;
        }
        if let Some(collect_failed) = self.collect_failed {
            config.gpbackup.collect_failed = collect_failed;
        }
    }
}

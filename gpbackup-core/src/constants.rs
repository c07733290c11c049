/// 标签相关常量
pub mod label {
    /// 空标签占位值，任何语义为空的标签值都用它替代
    pub const EMPTY_LABEL: &str = "none";

    /// 未指定 include 列表时 `gpbackup_exporter_status` 使用的数据库标签
    pub const ALL_DATABASES: &str = "all-databases";
}

/// gpbackup 历史记录相关常量
pub mod history {
    /// 时间戳格式 (YYYYMMDDHHMMSS, 本地时区)
    pub const TIMESTAMP_LAYOUT: &str = "%Y%m%d%H%M%S";

    /// 备份状态: 成功
    pub const STATUS_SUCCESS: &str = "Success";

    /// 备份状态: 失败
    pub const STATUS_FAILURE: &str = "Failure";

    /// `datedeleted` 取值: 删除进行中
    pub const DELETION_IN_PROGRESS: &str = "In progress";

    /// `datedeleted` 取值: 从插件存储删除失败
    pub const DELETION_PLUGIN_FAILED: &str = "Plugin Backup Delete Failed";

    /// `datedeleted` 取值: 从本地存储删除失败
    pub const DELETION_LOCAL_FAILED: &str = "Local Delete Failed";

    /// 扁平 YAML 历史文件扩展名 (gpbackup 1.29.0 之前)
    pub const FLAT_LOG_EXTENSIONS: &[&str] = &["yaml", "yml"];

    /// SQLite 历史数据库扩展名 (gpbackup 1.29.0 之后)
    pub const INDEXED_STORE_EXTENSION: &str = "db";
}

/// 指标名称
pub mod metrics {
    pub const BACKUP_STATUS: &str = "gpbackup_backup_status";
    pub const BACKUP_DELETION_STATUS: &str = "gpbackup_backup_deletion_status";
    pub const BACKUP_INFO: &str = "gpbackup_backup_info";
    pub const BACKUP_DURATION: &str = "gpbackup_backup_duration_seconds";
    pub const BACKUP_SINCE_LAST_COMPLETION: &str = "gpbackup_backup_since_last_completion_seconds";
    pub const EXPORTER_STATUS: &str = "gpbackup_exporter_status";
    pub const EXPORTER_INFO: &str = "gpbackup_exporter_info";
}

/// 导出器默认配置
pub mod defaults {
    /// 默认监听地址
    pub const LISTEN_ADDRESS: &str = "0.0.0.0:19854";

    /// 默认指标路径
    pub const METRICS_ENDPOINT: &str = "/metrics";

    /// 默认采集间隔（秒）
    pub const COLLECT_INTERVAL_SECS: u64 = 600;

    /// 默认采集深度（天），0 表示不限制
    pub const COLLECT_DEPTH_DAYS: u32 = 0;
}

/// 版本信息
pub mod version {
    /// 核心库版本（自动从 Cargo.toml 同步）
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

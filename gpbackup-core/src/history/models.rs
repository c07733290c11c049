use serde::{Deserialize, Serialize};

/// gpbackup 历史文件 (`gpbackup_history.yaml`) 的顶层结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "backupconfigs", default)]
    pub backup_configs: Vec<BackupRecord>,
}

/// 一次备份操作的记录（成功、失败或进行中）
///
/// `status`、`timestamp` 与 `databasename` 为必填字段，其余字段缺失时取空值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    #[serde(rename = "backupdir", default)]
    pub backup_dir: String,
    #[serde(rename = "backupversion", default)]
    pub backup_version: String,
    #[serde(default)]
    pub compressed: bool,
    #[serde(rename = "compressiontype", default)]
    pub compression_type: String,
    #[serde(rename = "databasename")]
    pub database_name: String,
    #[serde(rename = "databaseversion", default)]
    pub database_version: String,
    #[serde(rename = "dataonly", default)]
    pub data_only: bool,
    #[serde(rename = "datedeleted", default)]
    pub date_deleted: String,
    #[serde(rename = "excludeschemafiltered", default)]
    pub exclude_schema_filtered: bool,
    #[serde(rename = "excludetablefiltered", default)]
    pub exclude_table_filtered: bool,
    #[serde(rename = "includeschemafiltered", default)]
    pub include_schema_filtered: bool,
    #[serde(rename = "includetablefiltered", default)]
    pub include_table_filtered: bool,
    #[serde(default)]
    pub incremental: bool,
    #[serde(rename = "leafpartitiondata", default)]
    pub leaf_partition_data: bool,
    #[serde(rename = "metadataonly", default)]
    pub metadata_only: bool,
    #[serde(default)]
    pub plugin: String,
    #[serde(rename = "pluginversion", default)]
    pub plugin_version: String,
    #[serde(rename = "singledatafile", default)]
    pub single_data_file: bool,
    /// 备份开始时间
    pub timestamp: String,
    /// 备份结束时间，备份进行中时为空
    #[serde(rename = "endtime", default)]
    pub end_time: String,
    #[serde(rename = "withoutglobals", default)]
    pub without_globals: bool,
    #[serde(rename = "withstatistics", default)]
    pub with_statistics: bool,
    pub status: String,
}

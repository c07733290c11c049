use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExporterError>;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("不支持的历史文件格式: {0}")]
    UnsupportedFormat(String),

    #[error("历史文件加载失败: {0}")]
    Load(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML 解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite 数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("备份记录读取失败 (timestamp={id}): {source}")]
    RecordFetch {
        id: String,
        #[source]
        source: Box<ExporterError>,
    },

    #[error("时间戳解析失败: '{value}'")]
    TimestampParse { value: String },

    #[error("指标注册错误: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ExporterError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn record_fetch(id: impl Into<String>, source: ExporterError) -> Self {
        Self::RecordFetch {
            id: id.into(),
            source: Box::new(source),
        }
    }

    pub fn timestamp_parse(value: impl Into<String>) -> Self {
        Self::TimestampParse {
            value: value.into(),
        }
    }
}

//! gpbackup exporter 项目信息模块
//!
//! gpbackup-exporter 是面向用户的主程序，项目元数据统一在这里定义，
//! gpbackup-core 作为内部库只提供技术性常量。

/// 项目元数据（自动从 gpbackup-exporter 的 Cargo.toml 同步）
pub mod metadata {
    /// 项目名称
    pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

    /// 项目描述
    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    /// 项目作者
    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 用户友好的显示名称（手动维护，用于落地页和日志）
    pub mod display {
        pub const FRIENDLY_NAME: &str = "gpbackup exporter";

        pub const DESCRIPTION_LONG: &str = "周期性读取 gpbackup 备份历史（gpbackup_history.yaml 或 gpbackup_history.db），\
            把备份状态、删除状态、持续时间和距上次成功备份的时长以 Prometheus 指标的形式导出";
    }
}

/// 版本信息
pub mod version_info {
    /// 导出器版本，同时作为 `gpbackup_exporter_info` 的 version 标签
    pub const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 核心库版本（从 gpbackup-core 获取）
    pub const CORE_VERSION: &str = gpbackup_core::constants::version::CORE_VERSION;
}

/// 获取版本信息字符串
pub fn get_version_string() -> String {
    format!(
        "{} v{} (core v{})",
        metadata::display::FRIENDLY_NAME,
        version_info::EXPORTER_VERSION,
        version_info::CORE_VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        let version = get_version_string();
        assert!(version.starts_with("gpbackup exporter v"));
        assert!(version.contains(version_info::EXPORTER_VERSION));
        assert_eq!(metadata::PROJECT_NAME, "gpbackup-exporter");
    }
}

use tracing_appender::non_blocking::WorkerGuard;

/// 日志文件路径环境变量，设置后日志输出到文件而非终端
pub const LOG_FILE_ENV: &str = "GPBACKUP_EXPORTER_LOG_FILE";

/// # gpbackup exporter 日志配置
///
/// - 库代码 (gpbackup-core) 只使用 `tracing` 宏，不初始化订阅者；
/// - `-v, --verbose` 启用 DEBUG 级别，`RUST_LOG` 优先于该参数；
/// - 设置 `GPBACKUP_EXPORTER_LOG_FILE` 后日志追加写入该文件。
///
/// ```bash
/// # 日志输出到文件
/// GPBACKUP_EXPORTER_LOG_FILE=/var/log/gpbackup_exporter.log gpbackup_exporter --gpbackup.history-file=...
///
/// # 只打开历史加载模块的调试日志
/// RUST_LOG=info,gpbackup_core::history=debug gpbackup_exporter --gpbackup.history-file=...
/// ```
///
/// 文件输出经由 `tracing-appender` 的后台线程写入，返回的 [`WorkerGuard`]
/// 必须在进程退出前一直持有，否则缓冲中的日志会丢失。
pub fn setup_logging(verbose: bool) -> std::io::Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Ok(log_file) = std::env::var(LOG_FILE_ENV) {
        // 输出到文件 - 使用详细格式便于排查
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init();
        Ok(Some(guard))
    } else {
        // 输出到终端 - 常驻进程保留时间戳
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .compact()
            .init();
        Ok(None)
    }
}

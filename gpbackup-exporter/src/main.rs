use clap::Parser;
use gpbackup_exporter::project_info::get_version_string;
use gpbackup_exporter::{Cli, ExporterApp, LOG_FILE_ENV, setup_logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志记录，guard 需要保持到进程退出
    let _log_guard = match setup_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ 无法打开日志文件 ({}): {}", LOG_FILE_ENV, e);
            std::process::exit(1);
        }
    };

    info!("🚀 启动 {}", get_version_string());

    // 配置错误在启动时直接退出，运行期间的采集错误只记录日志
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ 配置无效: {}", e);
            std::process::exit(1);
        }
    };

    let app = match ExporterApp::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 导出器初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("❌ 导出器异常退出: {:#}", e);
        std::process::exit(1);
    }
}

// 私有模块声明
mod app;
mod cli;
pub mod project_info; // 公开项目信息模块
mod server;
mod utils;

// 通过 pub use 精确控制对外暴露的接口
pub use app::ExporterApp;
pub use cli::Cli;
pub use server::router;
pub use utils::{LOG_FILE_ENV, setup_logging};

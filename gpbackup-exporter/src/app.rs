use crate::project_info::version_info;
use crate::server;
use anyhow::Context;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use chrono::Local;
use gpbackup_core::collector::Collector;
use gpbackup_core::config::ExporterConfig;
use gpbackup_core::metrics::ExporterMetrics;
use gpbackup_core::web_config::WebSecurityConfig;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

/// HTTPS 服务收到退出通知后等待进行中请求的最长时间
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// 导出器进程：HTTP 服务 + 周期采集
pub struct ExporterApp {
    config: ExporterConfig,
    metrics: Arc<ExporterMetrics>,
    collector: Arc<Collector>,
    security: Option<Arc<WebSecurityConfig>>,
}

impl ExporterApp {
    pub fn new(config: ExporterConfig) -> gpbackup_core::Result<Self> {
        let metrics = Arc::new(ExporterMetrics::new()?);
        let collector = Collector::new(&config, metrics.clone(), version_info::EXPORTER_VERSION)?;
        let security = match &config.web.config_file {
            Some(path) => Some(Arc::new(WebSecurityConfig::load_from_file(path)?)),
            None => None,
        };

        Ok(Self {
            config,
            metrics,
            collector: Arc::new(collector),
            security,
        })
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// 启动 HTTP 服务并进入采集循环，收到 SIGINT/SIGTERM 后退出
    pub async fn run(self) -> anyhow::Result<()> {
        self.log_parameters();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = self.spawn_server(shutdown_rx).await?;

        supervise(server, self.collect_loop(), shutdown_tx).await?;
        info!("导出器已停止");
        Ok(())
    }

    /// 绑定监听地址并在后台任务中提供 HTTP(S) 服务，`shutdown` 变化后优雅退出
    async fn spawn_server(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<JoinHandle<io::Result<()>>> {
        let web = &self.config.web;
        let listener = TcpListener::bind(&web.listen_address)
            .await
            .with_context(|| format!("监听地址绑定失败: {}", web.listen_address))?;
        let router = server::router(self.metrics.clone(), &web.endpoint, self.security.clone());

        let tls = self
            .security
            .as_ref()
            .and_then(|security| security.tls_server_config.as_ref());
        let Some(tls) = tls else {
            info!("🌐 HTTP 服务已启动: http://{}{}", web.listen_address, web.endpoint);
            return Ok(tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.changed().await;
                    })
                    .await
            }));
        };

        let rustls = RustlsConfig::from_pem_file(&tls.cert_file, &tls.key_file)
            .await
            .with_context(|| {
                format!(
                    "TLS 证书加载失败: cert={}, key={}",
                    tls.cert_file.display(),
                    tls.key_file.display()
                )
            })?;
        let listener = listener.into_std().context("监听套接字转换失败")?;

        let handle = Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.changed().await;
            shutdown_handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        });

        info!("🔒 HTTPS 服务已启动: https://{}{}", web.listen_address, web.endpoint);
        Ok(tokio::spawn(async move {
            axum_server::from_tcp_rustls(listener, rustls)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }))
    }

    /// 固定间隔执行采集，每个周期在阻塞线程池中同步运行，上一周期结束前不会开始下一周期
    async fn collect_loop(&self) {
        let mut interval = time::interval(self.config.collect_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("收到退出信号，停止采集");
                    break;
                }
                _ = interval.tick() => {
                    let collector = self.collector.clone();
                    let cycle = tokio::task::spawn_blocking(move || collector.collect_once(Local::now()));
                    if let Err(e) = cycle.await {
                        error!("❌ 采集任务异常退出: {}", e);
                    }
                }
            }
        }
    }

    fn log_parameters(&self) {
        let gpbackup = &self.config.gpbackup;
        info!("历史文件: {}", gpbackup.history_file.display());
        info!("采集间隔: {} 秒", self.config.collect.interval);
        if self.config.collect.depth > 0 {
            info!("采集深度: {} 天", self.config.collect.depth);
        }
        for db in gpbackup.db_include.iter().filter(|db| !db.is_empty()) {
            info!("只采集数据库: {}", db);
        }
        for db in gpbackup.db_exclude.iter().filter(|db| !db.is_empty()) {
            info!("排除数据库: {}", db);
        }
        if !gpbackup.backup_type.is_empty() {
            info!("只采集备份类型: {}", gpbackup.backup_type);
        }
        if !gpbackup.collect_deleted {
            info!("查询 gpbackup_history.db 时跳过已删除的备份");
        }
        if !gpbackup.collect_failed {
            info!("查询 gpbackup_history.db 时跳过失败的备份");
        }
        if let Some(path) = &self.config.web.config_file {
            info!("web 配置文件: {}", path.display());
        }
    }
}

/// 同时等待 HTTP 服务与采集循环
///
/// 服务任务先结束视为故障，立即返回错误；采集循环先结束（收到退出信号）
/// 则通知服务优雅退出并等待其完成。
async fn supervise(
    mut server: JoinHandle<io::Result<()>>,
    collect: impl Future<Output = ()>,
    shutdown: watch::Sender<bool>,
) -> anyhow::Result<()> {
    tokio::pin!(collect);

    let server_exit = tokio::select! {
        _ = &mut collect => None,
        result = &mut server => Some(result),
    };

    match server_exit {
        None => {
            let _ = shutdown.send(true);
            server
                .await
                .context("HTTP 服务任务异常退出")?
                .context("HTTP 服务运行失败")?;
            Ok(())
        }
        Some(result) => {
            let served = result.context("HTTP 服务任务异常退出")?;
            served.context("HTTP 服务运行失败")?;
            error!("❌ HTTP 服务意外退出，停止采集");
            anyhow::bail!("HTTP 服务意外退出")
        }
    }
}

/// 等待 SIGINT (Ctrl+C) 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("注册 Ctrl+C 信号处理失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("注册 SIGTERM 信号处理失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpbackup_core::metrics::MetricKind;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_app_collects_with_shared_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpbackup_history.yaml");
        std::fs::write(
            &path,
            "backupconfigs:\n- databasename: test\n  timestamp: \"20230118170000\"\n  endtime: \"20230118170500\"\n  status: Success\n",
        )
        .unwrap();

        let mut config = ExporterConfig::default();
        config.gpbackup.history_file = PathBuf::from(&path);
        let app = ExporterApp::new(config).unwrap();
        assert_eq!(app.config().collect.interval, 600);

        let collector = app.collector.clone();
        let report = tokio::task::spawn_blocking(move || collector.collect_once(Local::now()))
            .await
            .unwrap();
        assert_eq!(report.loaded, Some(1));

        // HTTP 路由读取的是同一个注册表
        let text = app.metrics.render().unwrap();
        assert!(text.contains(MetricKind::BackupStatus.name()));
        assert!(text.contains(&format!(
            "gpbackup_exporter_info{{version=\"{}\"}} 1",
            version_info::EXPORTER_VERSION
        )));
    }

    fn history_file(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("gpbackup_history.yaml");
        std::fs::write(&path, "backupconfigs: []\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_server_failure_ends_run() {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async {
            Err::<(), _>(io::Error::new(io::ErrorKind::AddrInUse, "address already in use"))
        });

        // 采集循环永不结束，只能由服务任务的退出打断
        let result = supervise(server, std::future::pending::<()>(), shutdown_tx).await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("HTTP 服务运行失败"));
        assert!(message.contains("address already in use"));
    }

    #[tokio::test]
    async fn test_server_returning_early_is_an_error() {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async { io::Result::Ok(()) });

        let result = supervise(server, std::future::pending::<()>(), shutdown_tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_collect_loop_end_stops_server() {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = tokio::spawn(async move {
            let _ = shutdown_rx.changed().await;
            assert!(*shutdown_rx.borrow());
            io::Result::Ok(())
        });

        supervise(server, async {}, shutdown_tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_tls_certificate_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let web_config = dir.path().join("web-config.yml");
        std::fs::write(
            &web_config,
            "tls_server_config:\n  cert_file: missing.crt\n  key_file: missing.key\n",
        )
        .unwrap();

        let mut config = ExporterConfig::default();
        config.gpbackup.history_file = history_file(dir.path());
        config.web.listen_address = "127.0.0.1:0".to_string();
        config.web.config_file = Some(web_config);
        let app = ExporterApp::new(config).unwrap();
        assert!(app.security.as_ref().unwrap().tls_server_config.is_some());

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let error = app.spawn_server(shutdown_rx).await.unwrap_err();
        assert!(format!("{:#}", error).contains("TLS 证书加载失败"));
    }

    #[tokio::test]
    async fn test_invalid_web_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let web_config = dir.path().join("web-config.yml");
        std::fs::write(&web_config, "tls_server_config:\n  key_file: server.key\n").unwrap();

        let mut config = ExporterConfig::default();
        config.gpbackup.history_file = history_file(dir.path());
        config.web.config_file = Some(web_config);
        assert!(ExporterApp::new(config).is_err());
    }

    #[tokio::test]
    async fn test_plain_http_server_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ExporterConfig::default();
        config.gpbackup.history_file = history_file(dir.path());
        config.web.listen_address = "127.0.0.1:0".to_string();
        let app = ExporterApp::new(config).unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server = app.spawn_server(shutdown_rx).await.unwrap();
        supervise(server, async {}, shutdown_tx).await.unwrap();
    }
}

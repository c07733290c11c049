//! HTTP 服务安全配置
//!
//! 对应 `--web.config.file` 指定的 YAML 文件，格式与 Prometheus exporter 通用的
//! web 配置文件一致：
//!
//! ```yaml
//! tls_server_config:
//!   cert_file: server.crt
//!   key_file: server.key
//! basic_auth_users:
//!   prometheus: $2y$10$...   # bcrypt 哈希
//! ```
//!
//! 相对路径按配置文件所在目录解析。

use crate::error::{ExporterError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebSecurityConfig {
    pub tls_server_config: Option<TlsServerConfig>,
    /// 用户名 -> bcrypt 哈希
    pub basic_auth_users: BTreeMap<String, String>,
}

/// PEM 格式的证书与私钥
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TlsServerConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl WebSecurityConfig {
    /// 加载并校验配置文件
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config: WebSecurityConfig = serde_yaml::from_str(&content)?;

        if let (Some(tls), Some(base)) = (config.tls_server_config.as_mut(), path.parent()) {
            tls.cert_file = resolve(base, &tls.cert_file);
            tls.key_file = resolve(base, &tls.key_file);
        }
        config.validate()?;

        tracing::info!(
            "已加载 web 配置文件: {} (TLS: {}, 认证用户: {})",
            path.display(),
            config.tls_server_config.is_some(),
            config.basic_auth_users.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(tls) = &self.tls_server_config {
            if tls.cert_file.as_os_str().is_empty() || tls.key_file.as_os_str().is_empty() {
                return Err(ExporterError::invalid_config(
                    "tls_server_config 必须同时指定 cert_file 和 key_file",
                ));
            }
        }
        for (user, hash) in &self.basic_auth_users {
            if user.is_empty() || hash.is_empty() {
                return Err(ExporterError::invalid_config(format!(
                    "basic_auth_users 中存在空的用户名或密码哈希: '{}'",
                    user
                )));
            }
        }
        Ok(())
    }

    pub fn requires_auth(&self) -> bool {
        !self.basic_auth_users.is_empty()
    }

    /// 校验用户名和密码，未知用户或哈希格式错误都视为失败
    pub fn authorize(&self, user: &str, password: &str) -> bool {
        self.basic_auth_users
            .get(user)
            .is_some_and(|hash| bcrypt::verify(password, hash).unwrap_or(false))
    }
}

fn resolve(base: &Path, file: &Path) -> PathBuf {
    if file.as_os_str().is_empty() || file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    }
}

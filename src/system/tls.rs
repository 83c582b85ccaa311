//! HTTPS 证书加载与主机名策略
//!
//! 只为以 `allowed_host_suffix` 结尾的 SNI 名称提供证书，
//! 其他名称（以及没有 SNI 的握手）直接拒绝。

use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use tracing::debug;

use crate::errors::{Result, SiteError};

/// 主机名是否以允许的后缀结尾（不区分大小写）
pub fn host_allowed(host: &str, suffix: &str) -> bool {
    host.to_ascii_lowercase()
        .ends_with(&suffix.to_ascii_lowercase())
}

#[derive(Debug)]
pub struct HostPolicyResolver {
    suffix: String,
    key: Arc<CertifiedKey>,
}

impl HostPolicyResolver {
    pub fn new(suffix: impl Into<String>, key: Arc<CertifiedKey>) -> Self {
        Self {
            suffix: suffix.into(),
            key,
        }
    }
}

impl ResolvesServerCert for HostPolicyResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        match client_hello.server_name() {
            Some(name) if host_allowed(name, &self.suffix) => Some(Arc::clone(&self.key)),
            other => {
                debug!("TLS: refusing handshake for host {:?}", other);
                None
            }
        }
    }
}

/// 从 PEM 文件加载证书链和私钥，构建 rustls 服务端配置
pub fn load_server_config(cert_path: &Path, key_path: &Path, suffix: &str) -> Result<ServerConfig> {
    let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_file_iter(cert_path)
        .map_err(|e| SiteError::tls(format!("{}: {}", cert_path.display(), e)))?
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| SiteError::tls(format!("{}: {}", cert_path.display(), e)))?;
    if certs.is_empty() {
        return Err(SiteError::tls(format!(
            "no certificates found in {}",
            cert_path.display()
        )));
    }

    let key = PrivateKeyDer::from_pem_file(key_path)
        .map_err(|e| SiteError::tls(format!("{}: {}", key_path.display(), e)))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let signing_key = provider
        .key_provider
        .load_private_key(key)
        .map_err(|e| SiteError::tls(format!("unsupported private key: {}", e)))?;
    let certified = Arc::new(CertifiedKey::new(certs, signing_key));

    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| SiteError::tls(e.to_string()))?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(HostPolicyResolver::new(suffix, certified)));
    Ok(config)
}

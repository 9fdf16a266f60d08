//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {path:?}")]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("failed to load certificate or key: {0}")]
    Load(#[from] std::io::Error),
}

fn require_file(kind: &'static str, path: &Path) -> Result<(), TlsError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(TlsError::MissingFile {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Load the listener's PEM certificate chain and private key.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);
    require_file("Certificate", cert_path)?;
    require_file("Private key", key_path)?;

    let config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = %tls.cert_path, "TLS certificate loaded");
    Ok(config)
}

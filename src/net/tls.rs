//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use thiserror::Error;

use crate::config::{ClientAuthMode, TlsConfig};

/// Errors raised while assembling the listener's TLS configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("no private key found in {0}")]
    MissingKey(String),

    #[error("no certificates found in {0}")]
    MissingCertificates(String),

    #[error("invalid TLS material: {0}")]
    Rustls(#[from] rustls::Error),

    #[error("failed to build client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

/// Build the rustls server configuration for the listener.
///
/// `client_auth` of `want`/`need` installs a Web PKI verifier over the
/// configured trust anchors; `want` additionally allows anonymous
/// clients.
pub fn load_rustls_config(tls: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let certs = load_certs(Path::new(&tls.cert_path))?;
    let key = load_key(Path::new(&tls.key_path))?;

    let builder = match tls.client_auth {
        ClientAuthMode::None => ServerConfig::builder().with_no_client_auth(),
        mode => {
            // Validation guarantees ca_path is present for want/need.
            let ca_path = tls.ca_path.as_deref().unwrap_or_default();
            let mut roots = RootCertStore::empty();
            for cert in load_certs(Path::new(ca_path))? {
                roots.add(cert)?;
            }
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots));
            let verifier = if mode == ClientAuthMode::Want {
                verifier.allow_unauthenticated().build()?
            } else {
                verifier.build()?
            };
            ServerConfig::builder().with_client_cert_verifier(verifier)
        }
    };

    let server_config = builder.with_single_cert(certs, key)?;
    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path).map_err(|source| TlsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<_, _>>()
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::MissingCertificates(path.display().to_string()));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file = File::open(path).map_err(|source| TlsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Io {
            path: path.display().to_string(),
            source,
        })?
        .ok_or_else(|| TlsError::MissingKey(path.display().to_string()))
}

//! TLS client configuration and handshakes.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::error::{Error, Result};
use crate::net::connection::{BoxedIo, Io};

/// TLS settings shared by every call made through one client.
///
/// The default trust store (webpki roots) is built on first use.
#[derive(Default)]
pub struct TlsSettings {
    config: OnceLock<Arc<ClientConfig>>,
}

impl TlsSettings {
    /// Use a caller-built rustls configuration.
    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        let settings = Self::default();
        let _ = settings.config.set(config);
        settings
    }

    fn config(&self) -> Result<Arc<ClientConfig>> {
        if let Some(config) = self.config.get() {
            return Ok(config.clone());
        }
        let built = Arc::new(webpki_config()?);
        Ok(self.config.get_or_init(|| built).clone())
    }

    /// Run a client handshake for `host` over `io`.
    pub async fn handshake<S: Io>(&self, host: &str, io: S) -> Result<BoxedIo> {
        let connector = TlsConnector::from(self.config()?);
        let server_name = ServerName::try_from(host.to_string()).map_err(Error::connection)?;
        let stream = connector
            .connect(server_name, io)
            .await
            .map_err(Error::connection)?;
        Ok(Box::new(stream))
    }
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("initialized", &self.config.get().is_some())
            .finish()
    }
}

fn webpki_config() -> Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(Error::connection)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

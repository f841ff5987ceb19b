//! TLS setup for PostgreSQL connection pools.

use std::fmt;
use std::sync::Arc;

use rustls::ClientConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::warn;

use crate::config::ConnectionConfig;
use crate::error::{MigrateError, Result};

/// Transport security modes, named after libpq's `sslmode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Plain TCP.
    #[default]
    Disable,
    /// Encrypt, but accept any server certificate.
    Require,
    /// Verify the certificate chain against the bundled web roots.
    VerifyCa,
    /// Verify the chain and the host name.
    VerifyFull,
}

impl SslMode {
    /// Parse a mode name. The empty string means [`SslMode::Disable`].
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(MigrateError::Config(format!(
                "invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    /// Mode of a connection config; unset means disabled.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        config
            .ssl_mode
            .as_deref()
            .map_or(Ok(SslMode::Disable), SslMode::parse)
    }

    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the rustls connector handed to the pool manager.
pub struct TlsBuilder {
    ssl_mode: SslMode,
}

impl TlsBuilder {
    pub fn new(ssl_mode: SslMode) -> Self {
        Self { ssl_mode }
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode
    }

    /// Connector for the configured mode, or `None` when TLS is disabled.
    pub fn build(&self) -> Result<Option<MakeRustlsConnect>> {
        if !self.ssl_mode.requires_tls() {
            return Ok(None);
        }
        Ok(Some(MakeRustlsConnect::new(self.client_config()?)))
    }

    fn client_config(&self) -> Result<ClientConfig> {
        match self.ssl_mode {
            SslMode::Disable => Err(MigrateError::Config(
                "no TLS configuration exists for ssl_mode=disable".into(),
            )),
            SslMode::Require => {
                warn!("ssl_mode=require: traffic is encrypted but the server certificate is not verified");
                Ok(ClientConfig::builder()
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(NoVerifier))
                    .with_no_client_auth())
            }
            SslMode::VerifyCa | SslMode::VerifyFull => {
                // rustls always checks the host name, so verify-ca behaves as verify-full.
                let mut roots = rustls::RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                Ok(ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth())
            }
        }
    }
}

/// Accepts every server certificate. Only used for `ssl_mode=require`.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        use rustls::SignatureScheme::*;
        vec![
            RSA_PKCS1_SHA256,
            RSA_PKCS1_SHA384,
            RSA_PKCS1_SHA512,
            ECDSA_NISTP256_SHA256,
            ECDSA_NISTP384_SHA384,
            ECDSA_NISTP521_SHA512,
            RSA_PSS_SHA256,
            RSA_PSS_SHA384,
            RSA_PSS_SHA512,
            ED25519,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_parsing() {
        assert_eq!(SslMode::parse("disable").unwrap(), SslMode::Disable);
        assert_eq!(SslMode::parse("Require").unwrap(), SslMode::Require);
        assert_eq!(SslMode::parse("verify-ca").unwrap(), SslMode::VerifyCa);
        assert_eq!(SslMode::parse(" verify-full ").unwrap(), SslMode::VerifyFull);
        assert_eq!(SslMode::parse("").unwrap(), SslMode::Disable);
        assert!(SslMode::parse("prefer").is_err());
    }

    #[test]
    fn test_ssl_mode_display_round_trips() {
        for mode in [
            SslMode::Disable,
            SslMode::Require,
            SslMode::VerifyCa,
            SslMode::VerifyFull,
        ] {
            assert_eq!(SslMode::parse(&mode.to_string()).unwrap(), mode);
        }
    }

    #[test]
    fn test_disable_builds_no_connector() {
        assert!(TlsBuilder::new(SslMode::Disable).build().unwrap().is_none());
        assert!(!SslMode::Disable.requires_tls());
    }

    #[test]
    fn test_tls_modes_build_connector() {
        assert!(TlsBuilder::new(SslMode::Require).build().unwrap().is_some());
        assert!(TlsBuilder::new(SslMode::VerifyFull).build().unwrap().is_some());
    }
}

//! gNMI transport: one gRPC channel per device session.

use tonic::transport::{Certificate, ClientTlsConfig, Endpoint, Identity};
use tracing::{debug, info};

use telecfg_apply::{
    ApplyError, ConnectionError, DeviceTarget, Payload, Session, Transport,
};

use crate::config::{ApplyMode, GnmiSettings};
use crate::gnmi::{CapabilityRequest, GnmiClient};
use crate::request::{
    Credentials, authorize, capabilities_failure, check_set_response, negotiate, set_failure,
    set_request,
};

const PLAINTEXT_SCHEMES: [&str; 2] = ["grpc", "http"];
const SCHEMES: &[&str] = &["grpc", "grpcs", "http", "https"];

/// Opens gNMI sessions.
///
/// Opening a session connects the channel and performs a `Capabilities`
/// exchange, which checks the credentials and that the device accepts
/// JSON_IETF. Applying sends one `Set` RPC.
#[derive(Debug, Clone)]
pub struct GnmiTransport {
    settings: GnmiSettings,
}

impl GnmiTransport {
    pub fn new(settings: GnmiSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GnmiSettings {
        &self.settings
    }

    async fn endpoint(&self, target: &DeviceTarget) -> Result<Endpoint, ConnectionError> {
        let secure = !PLAINTEXT_SCHEMES.contains(&target.scheme());
        let uri = format!(
            "{}://{}",
            if secure { "https" } else { "http" },
            target.authority(self.settings.default_port)
        );

        let mut endpoint = Endpoint::from_shared(uri)
            .map_err(|e| ConnectionError::unreachable(format!("invalid endpoint: {}", e)))?
            .connect_timeout(self.settings.timeouts.connect())
            .timeout(self.settings.timeouts.apply())
            .tcp_nodelay(true);

        if secure {
            let tls = self.tls_config(target).await?;
            endpoint = endpoint
                .tls_config(tls)
                .map_err(|e| ConnectionError::tls(e.to_string()))?;
        }

        Ok(endpoint)
    }

    async fn tls_config(&self, target: &DeviceTarget) -> Result<ClientTlsConfig, ConnectionError> {
        let tls = &self.settings.tls;
        let domain = tls
            .server_name
            .clone()
            .unwrap_or_else(|| target.host().to_string());
        let mut config = ClientTlsConfig::new().domain_name(domain);

        config = match &tls.ca_cert {
            Some(path) => {
                let pem = read_pem(path).await?;
                check_certificates(path, &pem)?;
                config.ca_certificate(Certificate::from_pem(pem))
            }
            None => config.with_native_roots(),
        };

        if let (Some(cert_path), Some(key_path)) = (&tls.client_cert, &tls.client_key) {
            let cert = read_pem(cert_path).await?;
            check_certificates(cert_path, &cert)?;
            let key = read_pem(key_path).await?;
            check_private_key(key_path, &key)?;
            config = config.identity(Identity::from_pem(cert, key));
        }

        Ok(config)
    }
}

impl Transport for GnmiTransport {
    type Session = GnmiSession;

    fn schemes(&self) -> &'static [&'static str] {
        SCHEMES
    }

    async fn open(&self, target: &DeviceTarget) -> Result<GnmiSession, ConnectionError> {
        let credentials = Credentials::from_target(target)?;
        let endpoint = self.endpoint(target).await?;

        debug!(device = %target, "Connecting gNMI channel");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| connect_failure(&e))?;
        let mut client = GnmiClient::new(channel);

        let capabilities = client
            .capabilities(authorize(CapabilityRequest {}, credentials.as_ref()))
            .await
            .map_err(|status| capabilities_failure(&status))?
            .into_inner();
        negotiate(&capabilities)?;

        info!(
            device = %target,
            gnmi_version = %capabilities.g_nmi_version,
            models = capabilities.supported_models.len(),
            "gNMI session open"
        );

        Ok(GnmiSession {
            device: target.label(),
            client,
            credentials,
            mode: self.settings.apply_mode,
            origin: self.settings.origin.clone(),
        })
    }
}

/// An open gNMI channel to one device.
#[derive(Debug)]
pub struct GnmiSession {
    device: String,
    client: GnmiClient,
    credentials: Option<Credentials>,
    mode: ApplyMode,
    origin: String,
}

impl Session for GnmiSession {
    async fn apply(&mut self, payload: &Payload) -> Result<(), ApplyError> {
        let request = authorize(
            set_request(payload, self.mode, &self.origin),
            self.credentials.as_ref(),
        );

        let response = self
            .client
            .set(request)
            .await
            .map_err(|status| set_failure(&status))?
            .into_inner();
        check_set_response(&response, self.mode)?;

        debug!(
            device = %self.device,
            mode = ?self.mode,
            timestamp = response.timestamp,
            "Set acknowledged"
        );
        Ok(())
    }

    async fn close(self) {
        // Dropping the last client handle shuts the channel down.
        drop(self.client);
        debug!(device = %self.device, "gNMI channel released");
    }
}

async fn read_pem(path: &str) -> Result<Vec<u8>, ConnectionError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ConnectionError::tls(format!("cannot read {}: {}", path, e)))
}

fn check_certificates(path: &str, pem: &[u8]) -> Result<(), ConnectionError> {
    let mut reader = pem;
    let mut count = 0;
    for cert in rustls_pemfile::certs(&mut reader) {
        cert.map_err(|e| ConnectionError::tls(format!("{}: {}", path, e)))?;
        count += 1;
    }
    if count == 0 {
        return Err(ConnectionError::tls(format!("{}: no PEM certificate found", path)));
    }
    Ok(())
}

fn check_private_key(path: &str, pem: &[u8]) -> Result<(), ConnectionError> {
    let mut reader = pem;
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ConnectionError::tls(format!("{}: no PEM private key found", path))),
        Err(e) => Err(ConnectionError::tls(format!("{}: {}", path, e))),
    }
}

/// Classify a channel connection failure from its error chain.
fn connect_failure(err: &(dyn std::error::Error + 'static)) -> ConnectionError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }

    let lower = message.to_ascii_lowercase();
    if ["certificate", "tls", "handshake"]
        .iter()
        .any(|word| lower.contains(word))
    {
        ConnectionError::tls(message)
    } else {
        ConnectionError::unreachable(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use telecfg_apply::{ConnectionCause, TargetError};

    #[test]
    fn test_scheme_checks() {
        let transport = GnmiTransport::new(GnmiSettings::default());
        for uri in ["grpc://r1", "GRPCS://r1", "http://r1:57400", "https://r1"] {
            let target = DeviceTarget::parse(uri).unwrap();
            assert!(transport.check_target(&target).is_ok(), "{uri}");
        }

        let ssh = DeviceTarget::parse("ssh://admin:pw@r1:830").unwrap();
        match transport.check_target(&ssh) {
            Err(TargetError::UnsupportedScheme {
                endpoint,
                scheme,
                supported,
            }) => {
                assert_eq!(scheme, "ssh");
                assert_eq!(endpoint, "ssh://admin:***@r1:830");
                assert!(supported.contains("grpcs"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_ca_file_is_tls_failure() {
        let mut settings = GnmiSettings::default();
        settings.tls.ca_cert = Some("/nonexistent/ca.pem".to_string());
        let transport = GnmiTransport::new(settings);

        let target = DeviceTarget::parse("grpcs://r1").unwrap();
        let err = transport.open(&target).await.unwrap_err();
        assert_eq!(err.cause, ConnectionCause::Tls);
        assert!(err.message.contains("/nonexistent/ca.pem"));
    }

    #[tokio::test]
    async fn test_ca_file_without_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a certificate").unwrap();

        let mut settings = GnmiSettings::default();
        settings.tls.ca_cert = Some(file.path().display().to_string());
        let transport = GnmiTransport::new(settings);

        let target = DeviceTarget::parse("https://r1:9339").unwrap();
        let err = transport.open(&target).await.unwrap_err();
        assert_eq!(err.cause, ConnectionCause::Tls);
        assert!(err.message.contains("no PEM certificate"));
    }

    #[test]
    fn test_connect_failure_classification() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(connect_failure(&refused).cause, ConnectionCause::Unreachable);

        let bad_cert = std::io::Error::other("invalid peer certificate: UnknownIssuer");
        assert_eq!(connect_failure(&bad_cert).cause, ConnectionCause::Tls);
    }
}

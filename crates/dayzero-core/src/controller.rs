// ── Controller connection ──
//
// Turns a `ControllerConfig` into a ready `dayzero_api::ControllerClient`.

use dayzero_api::{ControllerClient, TlsMode, TransportConfig};

use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;

/// Build a [`TransportConfig`] from the controller configuration.
pub fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

/// A client for `config`, authenticating with its API key.
pub fn connect(config: &ControllerConfig) -> Result<ControllerClient, CoreError> {
    let transport = build_transport(config);
    Ok(ControllerClient::new(
        config.url.clone(),
        config.api_key.clone(),
        &transport,
    )?)
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(tls: TlsVerification) -> ControllerConfig {
        ControllerConfig {
            url: "https://api.mist.com".parse().unwrap(),
            api_key: SecretString::from("k".to_owned()),
            org_id: None,
            tls,
            timeout: Duration::from_secs(7),
        }
    }

    #[test]
    fn transport_mirrors_config() {
        let transport = build_transport(&config(TlsVerification::SystemDefaults));
        assert!(matches!(transport.tls, TlsMode::System));
        assert_eq!(transport.timeout, Duration::from_secs(7));
    }

    #[test]
    fn missing_ca_file_is_a_config_error() {
        let err = connect(&config(TlsVerification::CustomCa("/nonexistent/ca.pem".into())))
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Config { .. }));
    }
}

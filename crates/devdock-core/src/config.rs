// ── Runtime connection configuration ──
//
// These types describe *how* to reach a DeviceDock service. They carry
// connection tuning but never touch disk -- the CLI constructs a
// `ServiceConfig` from its own config layer and hands it in.

use url::Url;

use devdock_api::{TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

impl PartialEq for TlsVerification {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SystemDefaults, Self::SystemDefaults) => true,
            (Self::CustomCa(a), Self::CustomCa(b)) => a == b,
            (Self::DangerAcceptInvalid, Self::DangerAcceptInvalid) => true,
            _ => false,
        }
    }
}

impl Eq for TlsVerification {}

/// Configuration for connecting to a single DeviceDock service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service root URL (e.g., `https://devices.example.com`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: std::time::Duration,
    /// Whether to open the live hub channel after sign-in.
    pub hub_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".parse().expect("valid default URL"),
            tls: TlsVerification::default(),
            timeout: std::time::Duration::from_secs(30),
            hub_enabled: true,
        }
    }
}

impl ServiceConfig {
    /// Translate into the api-layer transport config (with a cookie jar).
    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }

    /// The hub endpoint: service root with a ws/wss scheme and `/deviceHub`.
    pub fn hub_url(&self) -> Url {
        let scheme = if self.url.scheme() == "https" { "wss" } else { "ws" };
        let host = self.url.host_str().unwrap_or("localhost");
        let url_str = match self.url.port() {
            Some(p) => format!("{scheme}://{host}:{p}/deviceHub"),
            None => format!("{scheme}://{host}/deviceHub"),
        };
        Url::parse(&url_str).expect("invalid hub URL")
    }
}

use secrecy::Secret;
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct ApiSettings {
    /// The single RPC endpoint every operation is posted to.
    pub url: String,
    /// Per-request timeout. Unset means the transport default.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Clone)]
pub struct SessionSettings {
    /// Session JWT of the signed-in user. Absent means signed out.
    #[serde(default)]
    pub token: Option<Secret<String>>,
    /// JWT template requested from the identity provider.
    #[serde(default = "default_token_template")]
    pub token_template: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token: None,
            token_template: default_token_template(),
        }
    }
}

fn default_token_template() -> String {
    "with-email".to_string()
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector, e.g. http://tempo:4317. Spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;

    // Run either from the workspace root or from the crate directory
    let configuration_directory = if base_path.ends_with("cloud-dashboard") {
        base_path.join("config")
    } else {
        base_path.join("cloud-dashboard").join("config")
    };

    load_from(configuration_directory.join("base.yaml"))
}

/// Load settings from `path`, with `APP_`-prefixed environment overrides
/// (`APP_API__URL`, `APP_SESSION__TOKEN`, ...).
pub fn load_from(path: impl Into<std::path::PathBuf>) -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.into()).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn loads_yaml_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  host: 127.0.0.1\n  port: 8080\napi:\n  url: https://dev.example.com/api\nsession:\n  token: abc"
        )
        .unwrap();

        let settings = load_from(file.path()).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.api.url, "https://dev.example.com/api");
        assert_eq!(settings.api.timeout_seconds, None);
        assert_eq!(settings.session.token_template, "with-email");
        assert_eq!(
            settings.session.token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("abc")
        );
        assert_eq!(settings.telemetry.log_level, "info");
        assert!(settings.telemetry.otlp_endpoint.is_none());
    }
}

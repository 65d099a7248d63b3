//! Layered settings: serde defaults, then an optional file, then environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::proxy::client::AWS_REGIONS;

pub const ENV_PREFIX: &str = "DYNAMO_CONSOLE";
pub const DEFAULT_CONFIG_NAME: &str = "dynamo-console";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DynamoSettings {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Regions the `x-region` header may select besides `region`.
    pub allowed_regions: Vec<String>,
}

impl Default for DynamoSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            allowed_regions: AWS_REGIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl DynamoSettings {
    /// Static credentials, only when both halves are set.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub enabled: bool,
    pub protected_tables: Vec<String>,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            protected_tables: vec!["demo-table".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    pub static_root: PathBuf,
    pub not_found_page: Option<PathBuf>,
    pub log_format: LogFormat,
    pub dynamodb: DynamoSettings,
    pub demo: DemoSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: crate::DEFAULT_LISTEN_ADDR.to_string(),
            static_root: PathBuf::from("public"),
            not_found_page: None,
            log_format: LogFormat::default(),
            dynamodb: DynamoSettings::default(),
            demo: DemoSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or `./dynamo-console.*` when absent)
    /// and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// As [`Settings::load`], with an explicit environment map in place of
    /// the process environment when `env` is given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("demo.protected_tables")
            .with_list_parse_key("dynamodb.allowed_regions")
            .try_parsing(true)
            .source(env);

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.dynamodb.region.trim().is_empty() {
            return Err(ConfigError::Invalid("dynamodb.region must not be empty".into()));
        }
        if let Some(url) = &self.dynamodb.endpoint_url {
            url::Url::parse(url).map_err(|e| {
                ConfigError::Invalid(format!("dynamodb.endpoint_url {url:?}: {e}"))
            })?;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|e| {
            ConfigError::Invalid(format!("listen_addr {:?}: {e}", self.listen_addr))
        })
    }

    /// Defaults to `404.html` inside the static root.
    pub fn not_found_page(&self) -> PathBuf {
        self.not_found_page
            .clone()
            .unwrap_or_else(|| self.static_root.join("404.html"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();

        let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.listen_addr().unwrap().port(), 8001);
        assert_eq!(settings.not_found_page(), PathBuf::from("public/404.html"));
    }

    #[test]
    fn test_file_then_env_layering() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
listen_addr = "0.0.0.0:9000"
static_root = "/srv/console"
log_format = "json"

[dynamodb]
region = "eu-west-1"
endpoint_url = "http://localhost:8000"

[demo]
enabled = false
"#
        )
        .unwrap();

        let settings = Settings::load_with_env(
            Some(file.path()),
            env(&[
                ("DYNAMO_CONSOLE_DEMO__ENABLED", "true"),
                ("DYNAMO_CONSOLE_DEMO__PROTECTED_TABLES", "users,orders"),
                ("DYNAMO_CONSOLE_DYNAMODB__REGION", "eu-central-1"),
                ("DYNAMO_CONSOLE_DYNAMODB__ALLOWED_REGIONS", "eu-west-1,eu-west-2"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.listen_addr, "0.0.0.0:9000");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.dynamodb.region, "eu-central-1");
        assert_eq!(
            settings.dynamodb.endpoint_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert!(settings.demo.enabled);
        assert_eq!(settings.demo.protected_tables, vec!["users", "orders"]);
        assert_eq!(settings.dynamodb.allowed_regions, vec!["eu-west-1", "eu-west-2"]);
        assert_eq!(
            settings.not_found_page(),
            PathBuf::from("/srv/console/404.html")
        );
    }

    #[test]
    fn test_invalid_listen_addr_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "listen_addr = \"localhost\"\n").unwrap();

        let err = Settings::load_with_env(Some(&path), env(&[])).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Settings::load_with_env(Some(Path::new("/nonexistent/console.toml")), env(&[]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_static_credentials_need_both_keys() {
        let mut dynamo = DynamoSettings::default();
        assert_eq!(dynamo.static_credentials(), None);

        dynamo.access_key_id = Some("local".into());
        assert_eq!(dynamo.static_credentials(), None);

        dynamo.secret_access_key = Some("secret".into());
        assert_eq!(dynamo.static_credentials(), Some(("local", "secret")));
    }
}

//! Client configuration
//!
//! Settings are layered: an optional TOML file, then `TRAWL_*` environment
//! variables. Command-line flags are applied on top by the caller before
//! [`Settings::resolve`] picks the effective address and token.
//!
//! ```toml
//! address = "https://logs.example.com/"
//! token = "..."
//! request_timeout_secs = 30
//!
//! [profiles.staging]
//! address = "https://logs-staging.example.com/"
//! token = "..."
//! ```

use crate::error::ConfigError;
use ::config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "TRAWL";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw settings as loaded from file and environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Service address used when no profile is selected
    pub address: Option<String>,

    /// API token used when no profile is selected
    pub token: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,

    /// Named profiles. Names are case-insensitive and stored lowercase.
    pub profiles: BTreeMap<String, Profile>,
}

/// A named service endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub address: Option<String>,
    pub token: Option<String>,
}

/// Command-line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub token: Option<String>,
}

/// Effective configuration handed to [`crate::HttpQueryJobs`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: Url,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl Settings {
    /// `<user config dir>/trawl/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trawl").join("config.toml"))
    }

    /// Load settings from `path` (required) or the default location (optional),
    /// then overlay `TRAWL_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let file = match path {
            Some(p) => Some((p.to_path_buf(), true)),
            None => Self::default_path().map(|p| (p, false)),
        };
        if let Some((file, required)) = file {
            tracing::debug!(path = %file.display(), required, "Loading configuration file");
            builder = builder.add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Pick the address and token for `profile` (or the top-level ones), with
    /// `overrides` winning over configured values.
    pub fn resolve(
        &self,
        profile: Option<&str>,
        overrides: &Overrides,
    ) -> Result<ClientConfig, ConfigError> {
        let (address, token) = match profile {
            Some(name) => {
                let key = name.to_lowercase();
                let p = self
                    .profiles
                    .get(&key)
                    .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
                (p.address.clone(), p.token.clone())
            }
            None => (self.address.clone(), self.token.clone()),
        };
        let address = overrides.address.clone().or(address);
        let token = overrides.token.clone().or(token);

        let address = address
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::MissingAddress)?;

        Ok(ClientConfig {
            address: parse_address(&address)?,
            token: token.filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        })
    }
}

fn parse_address(address: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_file_with_profiles() {
        let file = write_config(
            r#"
            address = "http://localhost:8080/"
            request_timeout_secs = 5

            [profiles.staging]
            address = "https://staging.example.com/"
            token = "abc"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.address.as_deref(), Some("http://localhost:8080/"));
        assert_eq!(settings.request_timeout_secs, Some(5));
        assert!(settings.profiles.contains_key("staging"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/trawl/config.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_resolve_top_level() {
        let settings = Settings {
            address: Some("http://localhost:8080/".into()),
            token: Some(String::new()),
            ..Default::default()
        };

        let config = settings.resolve(None, &Overrides::default()).unwrap();
        assert_eq!(config.address.as_str(), "http://localhost:8080/");
        assert_eq!(config.token, None);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_resolve_profile() {
        let mut settings = Settings {
            address: Some("http://localhost:8080/".into()),
            ..Default::default()
        };
        settings.profiles.insert(
            "prod".into(),
            Profile {
                address: Some("https://logs.example.com/".into()),
                token: Some("secret".into()),
            },
        );

        let config = settings.resolve(Some("Prod"), &Overrides::default()).unwrap();
        assert_eq!(config.address.host_str(), Some("logs.example.com"));
        assert_eq!(config.token.as_deref(), Some("secret"));

        assert!(matches!(
            settings.resolve(Some("missing"), &Overrides::default()),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_overrides_win() {
        let settings = Settings {
            address: Some("http://localhost:8080/".into()),
            token: Some("from-file".into()),
            ..Default::default()
        };
        let overrides = Overrides {
            address: Some("https://override.example.com/".into()),
            token: None,
        };

        let config = settings.resolve(None, &overrides).unwrap();
        assert_eq!(config.address.host_str(), Some("override.example.com"));
        assert_eq!(config.token.as_deref(), Some("from-file"));

        let only_flag = Settings::default().resolve(None, &overrides).unwrap();
        assert_eq!(only_flag.token, None);
    }

    #[test]
    fn test_resolve_rejects_bad_addresses() {
        let missing = Settings::default();
        assert!(matches!(
            missing.resolve(None, &Overrides::default()),
            Err(ConfigError::MissingAddress)
        ));

        let bad_scheme = Settings {
            address: Some("ftp://logs.example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad_scheme.resolve(None, &Overrides::default()),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }
}

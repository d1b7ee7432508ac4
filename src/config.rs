//! Configuration manager for the user management client.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_HOST: &str = "http://localhost:8081";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Base URL of the user management API.
    pub host: String,
    /// Related to local storage. Memory only when absent.
    pub storage: Option<Storage>,
    /// Default `tracing` level, `RUST_LOG` wins over it.
    pub log_level: String,
    #[serde(skip)]
    path: PathBuf,
    #[serde(skip)]
    host_override: Option<String>,
}

/// File-backed storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    /// JSON file holding the `token`, `user` and `users` keys.
    pub path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            storage: None,
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
            host_override: None,
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Host taking precedence over the file, e.g. from `USERMANAGER_HOST`.
    pub fn host(mut self, host: Option<String>) -> Self {
        self.host_override = host.filter(|host| !host.is_empty());
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`) and does not end with `/`.
    fn normalize_url(url: &str) -> std::result::Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.as_str().trim_end_matches('/').to_owned())
    }

    /// Reads the configuration file from the specified path.
    ///
    /// A missing or malformed file falls back to the defaults.
    pub fn read(self) -> Result<Arc<Self>> {
        let mut config = match File::open(&self.path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(config) => config,
                Err(err) => self.error(&self.path, err),
            },
            Err(err) => self.error(&self.path, err),
        };

        if let Some(host) = self.host_override {
            config.host = host;
        }
        config.host = Self::normalize_url(&config.host)?;
        config.path = self.path;

        Ok(Arc::new(config))
    }

    /// Return a default configuration as fallback.
    fn error(&self, path: &Path, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, path = %path.display(), "cannot read configuration file");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_file() {
        let file = write(
            "host: api.example.com/\nstorage:\n  path: /tmp/usermanager.json\nlog_level: debug\n",
        );
        let config = Configuration::default()
            .path(file.path().to_path_buf())
            .read()
            .unwrap();

        assert_eq!(config.host, "https://api.example.com");
        assert_eq!(
            config.storage,
            Some(Storage {
                path: PathBuf::from("/tmp/usermanager.json")
            })
        );
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_fallback_to_defaults() {
        let config = Configuration::default()
            .path(PathBuf::from("/nonexistent/usermanager.yaml"))
            .read()
            .unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.storage, None);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);

        let file = write("host: [unterminated");
        let config = Configuration::default()
            .path(file.path().to_path_buf())
            .read()
            .unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn test_host_override() {
        let file = write("host: http://localhost:8081/api/\n");
        let config = Configuration::default()
            .path(file.path().to_path_buf())
            .host(Some("http://10.0.0.2:9000/".into()))
            .read()
            .unwrap();
        assert_eq!(config.host, "http://10.0.0.2:9000");

        let config = Configuration::default()
            .path(file.path().to_path_buf())
            .host(Some(String::new()))
            .read()
            .unwrap();
        assert_eq!(config.host, "http://localhost:8081/api");
    }

    #[test]
    fn test_invalid_host() {
        let file = write("host: \"http://[::1\"\n");
        assert!(
            Configuration::default()
                .path(file.path().to_path_buf())
                .read()
                .is_err()
        );
    }
}

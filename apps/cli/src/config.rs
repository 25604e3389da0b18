//! Credentials file.
//!
//! Looked up as `./config.txt` and then `~/config.txt`. Plain INI is
//! read as well as TOML, so values need no quoting:
//!
//! ```ini
//! [thunderdrive]
//! username = me@example.com
//! password = secret
//!
//! [proxy]
//! https = https://proxy:58080
//! http = http://proxy:58080
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use ini::{Ini, ParseOption};
use serde::Deserialize;
use thunderdrive_api::{Credentials, SessionConfig};

const FILE_NAME: &str = "config.txt";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub thunderdrive: Account,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Clone, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub https: Option<String>,
    #[serde(default)]
    pub http: Option<String>,
}

impl Config {
    /// Loads the first credentials file found.
    pub fn load() -> anyhow::Result<Self> {
        let candidates = candidate_paths();
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            bail!("credentials file not found (tried {})", tried.join(", "));
        };
        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::parse(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config = match toml::from_str::<Config>(content) {
            Ok(config) => config,
            Err(toml_err) => Self::parse_ini(content)
                .map_err(|ini_err| anyhow!("neither TOML ({toml_err}) nor INI ({ini_err:#})"))?,
        };
        if config.thunderdrive.username.is_empty() {
            bail!("[thunderdrive] username is empty");
        }
        Ok(config)
    }

    fn parse_ini(content: &str) -> anyhow::Result<Self> {
        // Backslashes in passwords are kept as written.
        let options = ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options)?;
        let account = ini
            .section(Some("thunderdrive"))
            .context("missing [thunderdrive] section")?;
        let field = |key: &str| {
            account
                .get(key)
                .map(str::to_string)
                .with_context(|| format!("[thunderdrive] has no {key}"))
        };
        let thunderdrive = Account {
            username: field("username")?,
            password: field("password")?,
        };
        let proxy = ini.section(Some("proxy")).map(|section| ProxyConfig {
            https: section.get("https").map(str::to_string),
            http: section.get("http").map(str::to_string),
        });
        Ok(Config { thunderdrive, proxy })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.thunderdrive.username.clone(),
            password: self.thunderdrive.password.clone(),
        }
    }

    /// Session options; `use_proxy` turns on the proxy section and turns
    /// off TLS verification.
    pub fn session_config(&self, use_proxy: bool) -> anyhow::Result<SessionConfig> {
        let mut session = SessionConfig::default();
        if use_proxy {
            let Some(proxy) = &self.proxy else {
                bail!("--useproxy given but the config file has no [proxy] section");
            };
            session.https_proxy = proxy.https.clone().filter(|s| !s.is_empty());
            session.http_proxy = proxy.http.clone().filter(|s| !s.is_empty());
            session.verify_tls = false;
        }
        Ok(session)
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(FILE_NAME));
    }
    paths
}

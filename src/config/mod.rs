mod auth;
mod basic;
mod gateway;
mod workspace;

pub use auth::{AuthSettings, GOOGLE_AUTH_URL, GOOGLE_REVOKE_URL, GOOGLE_TOKEN_URL};
pub use basic::BasicConfig;
pub use gateway::GatewayConfig;
pub use workspace::WorkspaceSettings;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Credential settings (see `auth` table in config.toml).
    #[serde(default)]
    pub auth: AuthSettings,

    /// Quotas, retries and HTTP client settings (see `gateway` table in config.toml).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Target resource and read/write behaviour (see `workspace` table in config.toml).
    #[serde(default)]
    pub workspace: WorkspaceSettings,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration from the TOML file (with defaults) and validates required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {}", DEFAULT_CONFIG_FILE);
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!(
                "failed to extract configuration from {}: {err}",
                DEFAULT_CONFIG_FILE
            )
        });
        if let Err(problem) = cfg.check() {
            panic!("{problem}");
        }
        cfg
    }

    /// Required fields that defaults cannot fill.
    pub fn check(&self) -> Result<(), String> {
        if self.basic.sheetwise_key.trim().is_empty() {
            return Err("basic.sheetwise_key must be set and non-empty".to_string());
        }
        if self.workspace.max_page_size == 0 {
            return Err("workspace.max_page_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Global, lazily-initialized configuration instance. First access panics on a missing or
/// invalid `config.toml`.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults_per_table() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                sheetwise_key = 12345
                dev_mode = true

                [auth]
                mode = "api_key"
                api_key = "k"

                [gateway]
                requests_per_minute = 5

                [workspace]
                resource = "https://docs.google.com/document/d/abc/edit"
                max_page_size = 50
                "#,
            ))
            .extract()
            .expect("extract");

        assert_eq!(cfg.basic.sheetwise_key, "12345");
        assert!(cfg.basic.dev_mode);
        assert_eq!(cfg.auth.mode, crate::auth::AuthMode::ApiKey);
        assert_eq!(cfg.gateway.requests_per_minute, 5);
        assert_eq!(cfg.gateway.max_retries, 3);
        assert_eq!(cfg.workspace.max_page_size, 50);
        assert_eq!(cfg.workspace.default_page_size, 100);
        assert_eq!(cfg.auth.token_url.as_str(), GOOGLE_TOKEN_URL);
    }

    #[test]
    fn check_requires_key_and_page_ceiling() {
        let mut cfg = Config::default();
        assert!(cfg.check().unwrap_err().contains("sheetwise_key"));

        cfg.basic.sheetwise_key = "k".to_string();
        assert!(cfg.check().is_ok());

        cfg.workspace.max_page_size = 0;
        assert!(cfg.check().unwrap_err().contains("max_page_size"));
    }

    #[test]
    fn unknown_gateway_keys_are_rejected() {
        let res: Result<Config, _> = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string("[gateway]\nrequests_per_hour = 5\n"))
            .extract();
        assert!(res.is_err());
    }
}

use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    admin: Option<AdminAccount>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_access_token_minutes")]
    access_token_minutes: i64,
    #[serde(default = "default_refresh_token_days")]
    refresh_token_days: i64,
}

/// Account created on startup when no user with this username exists.
#[derive(Debug, Deserialize)]
pub struct AdminAccount {
    username: String,
    email: String,
    password: String,
}

fn default_access_token_minutes() -> i64 {
    15
}

fn default_refresh_token_days() -> i64 {
    1
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    Self::from_slice(&bytes)
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let config: Self = toml::from_slice(bytes)?;
        if config.app.access_token_minutes <= 0 || config.app.refresh_token_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn admin(&self) -> Option<&AdminAccount> {
        self.admin.as_ref()
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_minutes)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_days)
    }
}

impl AdminAccount {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn config_test() {
        let config = Config::get_or_init(true).await;
        assert_eq!(config.host().bindto(), "127.0.0.1:5000"); // defaults
        assert!(config.admin().is_some());
    }

    #[test]
    fn token_lifetimes_fall_back_to_defaults() {
        let raw = br#"
            [host]
            bindto = "0.0.0.0:80"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/db"
        "#;
        let config = Config::from_slice(raw).unwrap();
        assert!(!config.app().docs());
        assert_eq!(config.app().access_token_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.app().refresh_token_ttl(), chrono::Duration::days(1));
        assert!(config.admin().is_none());
    }

    #[test]
    fn non_positive_lifetime_is_rejected() {
        let raw = br#"
            [host]
            bindto = "0.0.0.0:80"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/db"
            access_token_minutes = 0
        "#;
        assert!(matches!(
            Config::from_slice(raw),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}

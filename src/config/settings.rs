use ::config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use thiserror::Error;

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub cors: CorsSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    pub base_url: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "ChamaPlus".to_string()
}

impl Settings {
    /// Loads settings from defaults, `config/default`, `config/{CHAMAPLUS_ENV}`
    /// and `CHAMAPLUS__*` environment variables, in increasing precedence.
    /// `DATABASE_URL` and `JWT_SECRET` override everything else.
    pub fn load() -> Result<Self, SettingsError> {
        let run_env = env::var("CHAMAPLUS_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
            .add_source(
                Environment::with_prefix("CHAMAPLUS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", env::var("JWT_SECRET").ok())?;

        Self::from_builder(builder)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.max_connections", 10_i64)?
            .set_default("database.acquire_timeout_secs", 5_i64)?
            .set_default("jwt.ttl_hours", 24_i64)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("log.level", "info")
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.database.url.trim().is_empty() {
            return Err(SettingsError::Invalid("database.url must be set".to_string()));
        }
        if self.jwt.secret.len() < MIN_JWT_SECRET_LEN {
            return Err(SettingsError::Invalid(format!(
                "jwt.secret must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.jwt.ttl_hours <= 0 {
            return Err(SettingsError::Invalid("jwt.ttl_hours must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-test-secret-that-is-long-enough-for-hs256";

    fn with_required() -> ConfigBuilder<DefaultState> {
        Settings::defaults()
            .unwrap()
            .set_override("database.url", "postgres://localhost/chamaplus_test")
            .unwrap()
            .set_override("jwt.secret", SECRET)
            .unwrap()
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let settings = Settings::from_builder(with_required()).unwrap();

        assert_eq!(settings.bind_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.jwt.ttl_hours, 24);
        assert_eq!(settings.cors.allowed_origins, vec!["http://localhost:3000"]);
        assert!(settings.smtp.is_none());
        assert_eq!(settings.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("jwt.secret", SECRET)
            .unwrap();

        assert!(Settings::from_builder(builder).is_err());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let builder = with_required().set_override("jwt.secret", "short").unwrap();

        match Settings::from_builder(builder) {
            Err(SettingsError::Invalid(msg)) => assert!(msg.contains("jwt.secret")),
            other => panic!("expected invalid secret, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn smtp_section_is_parsed_with_defaults() {
        let builder = with_required()
            .set_override("smtp.server", "smtp.example.com")
            .unwrap()
            .set_override("smtp.username", "mailer")
            .unwrap()
            .set_override("smtp.password", "hunter2")
            .unwrap()
            .set_override("smtp.from_email", "noreply@example.com")
            .unwrap()
            .set_override("smtp.base_url", "https://chama.example.com")
            .unwrap();

        let smtp = Settings::from_builder(builder).unwrap().smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from_name, "ChamaPlus");
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let builder = with_required().set_override("log.level", "chatty").unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.log_level(), tracing::Level::INFO);

        let builder = with_required().set_override("log.level", "debug").unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.log_level(), tracing::Level::DEBUG);
    }
}

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakePolicy,
    /// Mail settings are optional at startup; requests report the gap instead.
    pub mail: Result<MailConfig, MailConfigMissing>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, treating blank
    /// values the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment =
            AppEnvironment::from_str(&read("APP_ENV").unwrap_or_else(|| "development".to_string()));

        let host = read("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = read("APP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = read("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let require_id_card = parse_flag(read("INTAKE_REQUIRE_ID_CARD"), "INTAKE_REQUIRE_ID_CARD")?
            .unwrap_or(true);
        let cors = parse_flag(read("INTAKE_CORS"), "INTAKE_CORS")?.unwrap_or(true);
        let max_body_bytes = match read("INTAKE_MAX_BODY_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "INTAKE_MAX_BODY_BYTES",
                })?,
            None => IntakePolicy::DEFAULT_MAX_BODY_BYTES,
        };

        let mail = MailConfig::from_lookup(&read)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake: IntakePolicy {
                require_id_card,
                cors,
                max_body_bytes,
            },
            mail,
        })
    }
}

fn parse_flag(raw: Option<String>, key: &'static str) -> Result<Option<bool>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidFlag { key }),
        },
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Per-deployment switches for the intake handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    pub require_id_card: bool,
    pub cors: bool,
    pub max_body_bytes: usize,
}

impl IntakePolicy {
    pub const DEFAULT_MAX_BODY_BYTES: usize = 12 * 1024 * 1024;
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            require_id_card: true,
            cors: true,
            max_body_bytes: Self::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// SMTP account and destination mailbox.
#[derive(Clone)]
pub struct MailConfig {
    pub user: String,
    pub password: String,
    pub receiver: String,
    pub smtp_host: String,
    pub send_timeout: Duration,
}

impl MailConfig {
    pub const DEFAULT_SMTP_HOST: &'static str = "smtp.gmail.com";
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

    fn from_lookup<F>(read: &F) -> Result<Result<Self, MailConfigMissing>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let send_timeout = match read("MAIL_SEND_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "MAIL_SEND_TIMEOUT_SECS",
                })?,
            None => Self::DEFAULT_SEND_TIMEOUT,
        };
        let smtp_host =
            read("EMAIL_SMTP_HOST").unwrap_or_else(|| Self::DEFAULT_SMTP_HOST.to_string());

        let user = read("EMAIL_USER");
        let password = read("EMAIL_PASS");
        let receiver = read("EMAIL_RECEIVER");

        Ok(match (user, password, receiver) {
            (Some(user), Some(password), Some(receiver)) => Ok(Self {
                user,
                password,
                receiver,
                smtp_host,
                send_timeout,
            }),
            (user, password, receiver) => Err(MailConfigMissing {
                user: user.is_none(),
                password: password.is_none(),
                receiver: receiver.is_none(),
            }),
        })
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("receiver", &self.receiver)
            .field("smtp_host", &self.smtp_host)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

/// Records which mail settings were absent, without their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailConfigMissing {
    pub user: bool,
    pub password: bool,
    pub receiver: bool,
}

impl fmt::Display for MailConfigMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mail settings incomplete (user missing: {}, password missing: {}, receiver missing: {})",
            self.user, self.password, self.receiver
        )
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { key: &'static str },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { key } => {
                write!(f, "{key} must be one of true/false, yes/no, on/off, 1/0")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "EMAIL_USER",
            "EMAIL_PASS",
            "EMAIL_RECEIVER",
            "EMAIL_SMTP_HOST",
            "MAIL_SEND_TIMEOUT_SECS",
            "INTAKE_REQUIRE_ID_CARD",
            "INTAKE_CORS",
            "INTAKE_MAX_BODY_BYTES",
        ] {
            env::remove_var(key);
        }
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::from_lookup(|key| env::var(key).ok()).expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.intake, IntakePolicy::default());
        assert_eq!(
            config.mail.expect_err("mail settings absent"),
            MailConfigMissing {
                user: true,
                password: true,
                receiver: true,
            }
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::from_lookup(|key| env::var(key).ok()).expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn each_missing_mail_value_is_reported() {
        let complete = [
            ("EMAIL_USER", "forms@example.org"),
            ("EMAIL_PASS", "app-password"),
            ("EMAIL_RECEIVER", "office@example.org"),
        ];

        for skipped in 0..complete.len() {
            let pairs: Vec<_> = complete
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != skipped)
                .map(|(_, pair)| *pair)
                .collect();
            let config = AppConfig::from_lookup(lookup(&pairs)).expect("config loads");
            let missing = config.mail.expect_err("one value missing");
            assert_eq!(missing.user, skipped == 0);
            assert_eq!(missing.password, skipped == 1);
            assert_eq!(missing.receiver, skipped == 2);
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[
            ("EMAIL_USER", "forms@example.org"),
            ("EMAIL_PASS", "   "),
            ("EMAIL_RECEIVER", "office@example.org"),
        ]))
        .expect("config loads");
        assert!(config.mail.expect_err("blank password").password);
    }

    #[test]
    fn complete_mail_settings_use_defaults_for_transport() {
        let config = AppConfig::from_lookup(lookup(&[
            ("EMAIL_USER", "forms@example.org"),
            ("EMAIL_PASS", "app-password"),
            ("EMAIL_RECEIVER", "office@example.org"),
            ("INTAKE_REQUIRE_ID_CARD", "no"),
        ]))
        .expect("config loads");
        let mail = config.mail.expect("mail configured");
        assert_eq!(mail.smtp_host, MailConfig::DEFAULT_SMTP_HOST);
        assert_eq!(mail.send_timeout, MailConfig::DEFAULT_SEND_TIMEOUT);
        assert!(!config.intake.require_id_card);
        assert!(!format!("{mail:?}").contains("app-password"));
    }

    #[test]
    fn rejects_unparseable_flags() {
        let err = AppConfig::from_lookup(lookup(&[("INTAKE_CORS", "sometimes")]))
            .expect_err("flag rejected");
        assert!(matches!(err, ConfigError::InvalidFlag { key: "INTAKE_CORS" }));
    }
}

//! Environment-driven configuration
//!
//! Variables may be seeded from an env file (`SATWATCH_ENV_FILE`, default
//! `local.env`). Values already present in the process environment win.

use std::time::Duration;

/// Link/terminal database pair monitored as one gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySpec {
    /// Gateway identifier, also the link database variable prefix
    pub id: String,
    /// Terminal status database variable prefix
    pub terminal_prefix: String,
}

/// Connection settings for one Postgres store
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("name", &self.name)
            .finish()
    }
}

/// Telegram delivery settings
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &REDACTED)
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Stand-in printed for secrets in `Debug` output
pub(crate) const REDACTED: &str = "<redacted>";

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub schedule: Duration,
    pub gateways: Vec<GatewaySpec>,
    /// Link store settings, `None` when the prefix is not configured
    pub link_databases: Vec<Option<DatabaseConfig>>,
    /// Terminal store settings, `None` when the prefix is not configured
    pub terminal_databases: Vec<Option<DatabaseConfig>>,
    pub site_names: Vec<(String, String)>,
    pub mentions: Vec<String>,
    pub db_max_connections: u32,
    pub allow_overlap: bool,
    pub host: String,
    pub port: u16,
}

const DEFAULT_GATEWAYS: &str = "DB_ONE_JYP:DB_FIVE_JYP,DB_ONE_MNK:DB_FIVE_MNK,DB_ONE_TMK:DB_FIVE_TMK";
const DEFAULT_SITE_NAMES: &str = "JYP=JAYAPURA,MNK=MANOKWARI,TMK=TIMIKA";
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

impl AppConfig {
    /// Load the env file (if any) and read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_file = std::env::var("SATWATCH_ENV_FILE").unwrap_or_else(|_| "local.env".into());
        match dotenvy::from_filename(&env_file) {
            Ok(path) => tracing::info!(path = %path.display(), "Loaded env file"),
            Err(e) if e.not_found() => {
                tracing::debug!(file = %env_file, "No env file found, using process environment")
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    var: "SATWATCH_ENV_FILE".to_string(),
                    reason: e.to_string(),
                })
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let telegram = TelegramConfig {
            bot_token: require("TELEGRAM_BOT_TOKEN")?,
            chat_id: require("TELEGRAM_CHAT_ID")?,
            api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(parse_number(
                "SATWATCH_DELIVERY_TIMEOUT_SECS",
                get("SATWATCH_DELIVERY_TIMEOUT_SECS"),
                30,
            )?),
        };

        let schedule_raw = get("SATWATCH_SCHEDULE").unwrap_or_else(|| "5m".to_string());
        let schedule = parse_interval(&schedule_raw).map_err(|reason| ConfigError::Invalid {
            var: "SATWATCH_SCHEDULE".to_string(),
            reason,
        })?;

        let gateways = parse_gateways(&get("SATWATCH_GATEWAYS").unwrap_or_else(|| DEFAULT_GATEWAYS.into()))?;

        let mut link_databases = Vec::with_capacity(gateways.len());
        let mut terminal_databases = Vec::with_capacity(gateways.len());
        for gateway in &gateways {
            link_databases.push(load_database(&get, &gateway.id)?);
            terminal_databases.push(load_database(&get, &gateway.terminal_prefix)?);
        }

        let site_names = parse_site_names(
            &get("SATWATCH_SITE_NAMES").unwrap_or_else(|| DEFAULT_SITE_NAMES.into()),
        )?;

        let mentions = get("SATWATCH_ALERT_MENTIONS")
            .map(|raw| split_list(&raw).map(String::from).collect())
            .unwrap_or_default();

        let db_max_connections = parse_number(
            "SATWATCH_DB_MAX_CONNECTIONS",
            get("SATWATCH_DB_MAX_CONNECTIONS"),
            gateways.len().max(1) as u32,
        )?;

        let allow_overlap = match get("SATWATCH_ALLOW_OVERLAP") {
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::Invalid {
                var: "SATWATCH_ALLOW_OVERLAP".to_string(),
                reason: format!("expected a boolean, got '{}'", v),
            })?,
            None => false,
        };

        Ok(Self {
            telegram,
            schedule,
            gateways,
            link_databases,
            terminal_databases,
            site_names,
            mentions,
            db_max_connections,
            allow_overlap,
            host: get("SATWATCH_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_number("SATWATCH_PORT", get("SATWATCH_PORT"), 8080)?,
        })
    }
}

/// Read `<PREFIX>_HOST` and friends; an unset username means "not configured"
fn load_database<F>(get: &F, prefix: &str) -> Result<Option<DatabaseConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(user) = get(&format!("{}_USERNAME", prefix)) else {
        return Ok(None);
    };

    let require = |suffix: &str| {
        let key = format!("{}_{}", prefix, suffix);
        get(&key).ok_or(ConfigError::Missing(key))
    };

    let port_key = format!("{}_PORT", prefix);
    let port = parse_number(&port_key, get(&port_key), 5432)?;

    Ok(Some(DatabaseConfig {
        host: require("HOST")?,
        port,
        user,
        password: get(&format!("{}_PASS", prefix)),
        name: require("NAME")?,
    }))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse `LINK_PREFIX:TERMINAL_PREFIX` pairs
fn parse_gateways(raw: &str) -> Result<Vec<GatewaySpec>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "SATWATCH_GATEWAYS".to_string(),
        reason,
    };

    let gateways: Vec<GatewaySpec> = split_list(raw)
        .map(|entry| {
            let (id, terminal) = entry
                .split_once(':')
                .ok_or_else(|| invalid(format!("'{}' is not LINK:TERMINAL", entry)))?;
            let (id, terminal) = (id.trim(), terminal.trim());
            if id.is_empty() || terminal.is_empty() {
                return Err(invalid(format!("'{}' has an empty prefix", entry)));
            }
            Ok(GatewaySpec {
                id: id.to_string(),
                terminal_prefix: terminal.to_string(),
            })
        })
        .collect::<Result<_, _>>()?;

    if gateways.is_empty() {
        return Err(invalid("no gateways listed".to_string()));
    }
    Ok(gateways)
}

/// Parse `CODE=NAME` pairs, keeping their order
fn parse_site_names(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    split_list(raw)
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(code, name)| (code.trim().to_string(), name.trim().to_string()))
                .filter(|(code, name)| !code.is_empty() && !name.is_empty())
                .ok_or_else(|| ConfigError::Invalid {
                    var: "SATWATCH_SITE_NAMES".to_string(),
                    reason: format!("'{}' is not CODE=NAME", entry),
                })
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    var: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("'{}' is not a valid number", v),
        }),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an interval such as "30s", "5m", "2h" or plain seconds.
///
/// Must be non-zero and shorter than 24 hours.
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    let invalid = || format!("'{}' is not an interval like '30s', '5m' or '2h'", s);

    let secs = if let Some(num) = s.strip_suffix('s') {
        num.parse::<u64>().map_err(|_| invalid())?
    } else if let Some(num) = s.strip_suffix('m') {
        num.parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(60))
            .ok_or_else(invalid)?
    } else if let Some(num) = s.strip_suffix('h') {
        num.parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(3600))
            .ok_or_else(invalid)?
    } else {
        s.parse::<u64>().map_err(|_| invalid())?
    };

    if secs == 0 {
        return Err("interval must be greater than zero".to_string());
    }
    if secs >= 24 * 3600 {
        return Err(format!(
            "interval '{}' is too long, maximum is less than 24 hours",
            s
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    Missing(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "-100200300"),
    ];

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval(" 10M ").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_interval("45").unwrap(), Duration::from_secs(45));

        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("24h").is_err());
        assert!(parse_interval("86400").is_err());
        assert!(parse_interval("*/5 * * * *").is_err());
        assert!(parse_interval("23h").is_ok());

        // Values whose seconds overflow u64 are rejected, not wrapped
        assert!(parse_interval("5124095576030432h").is_err());
        assert!(parse_interval("307445734561825861m").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(BASE)).unwrap();

        assert_eq!(config.schedule, Duration::from_secs(300));
        assert_eq!(config.gateways.len(), 3);
        assert_eq!(config.gateways[0].id, "DB_ONE_JYP");
        assert_eq!(config.gateways[0].terminal_prefix, "DB_FIVE_JYP");
        assert!(config.link_databases.iter().all(Option::is_none));
        assert_eq!(config.site_names[1], ("MNK".to_string(), "MANOKWARI".to_string()));
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.db_max_connections, 3);
        assert!(config.mentions.is_empty());
        assert!(!config.allow_overlap);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_token() {
        let err = AppConfig::from_lookup(lookup(&[("TELEGRAM_CHAT_ID", "1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref v) if v == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_database_prefixes() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("SATWATCH_GATEWAYS", "GW_A:TERM_A"),
            ("GW_A_USERNAME", "monitor"),
            ("GW_A_HOST", "10.0.0.5"),
            ("GW_A_NAME", "nms"),
            ("GW_A_PASS", "secret"),
            ("TERM_A_USERNAME", "monitor"),
            ("TERM_A_HOST", "10.0.0.6"),
            ("TERM_A_PORT", "6432"),
            ("TERM_A_NAME", "kpi"),
        ]);

        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        let link = config.link_databases[0].as_ref().unwrap();
        assert_eq!(link.port, 5432);
        assert_eq!(link.password.as_deref(), Some("secret"));

        let terminal = config.terminal_databases[0].as_ref().unwrap();
        assert_eq!(terminal.port, 6432);
        assert_eq!(terminal.password, None);

        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(!debug.contains("123:abc"));
        assert!(debug.contains("10.0.0.5"));
    }

    #[test]
    fn test_database_missing_host() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("SATWATCH_GATEWAYS", "GW_A:TERM_A"),
            ("GW_A_USERNAME", "monitor"),
            ("GW_A_NAME", "nms"),
        ]);

        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref v) if v == "GW_A_HOST"));
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SATWATCH_GATEWAYS", "GW_A"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("SATWATCH_SITE_NAMES", "JYP"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("SATWATCH_ALLOW_OVERLAP", "maybe"));
        assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_mentions_and_overlap() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("SATWATCH_ALERT_MENTIONS", "@noc_oncall, @field_team"),
            ("SATWATCH_ALLOW_OVERLAP", "true"),
            ("TELEGRAM_API_BASE", "http://127.0.0.1:9000/"),
        ]);

        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.mentions, vec!["@noc_oncall", "@field_team"]);
        assert!(config.allow_overlap);
        assert_eq!(config.telegram.api_base, "http://127.0.0.1:9000");
    }
}

use {
    crate::{
        domain::{loyalty::LoyaltyRules, money::Currency},
        services::checkout::CheckoutConfig,
    },
    std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub currency: Currency,
    pub reservation_ttl_secs: i64,
    pub sweep_interval_secs: u64,
    pub gateway_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub loyalty: LoyaltyRules,
    pub ticket_code_dir: PathBuf,
    pub ticket_code_base_url: String,
    pub ticket_code_secret: String,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let loyalty_defaults = LoyaltyRules::default();

        let currency = match lookup("CURRENCY") {
            Some(raw) => Currency::try_from(raw.as_str()).map_err(|_| ConfigError::Invalid {
                key: "CURRENCY",
                value: raw,
            })?,
            None => Currency::Usd,
        };

        Ok(Self {
            listen_addr: parse_env(&lookup, "LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_env(&lookup, "DATABASE_MAX_CONNECTIONS", 20)?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            currency,
            reservation_ttl_secs: parse_env(&lookup, "RESERVATION_TTL_SECS", 900)?,
            sweep_interval_secs: parse_env(&lookup, "SWEEP_INTERVAL_SECS", 30)?,
            gateway_timeout_secs: parse_env(&lookup, "GATEWAY_TIMEOUT_SECS", 10)?,
            request_timeout_secs: parse_env(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            loyalty: LoyaltyRules {
                points_per_unit: parse_env(
                    &lookup,
                    "LOYALTY_POINTS_PER_UNIT",
                    loyalty_defaults.points_per_unit,
                )?,
                points_per_ticket: parse_env(
                    &lookup,
                    "LOYALTY_POINTS_PER_TICKET",
                    loyalty_defaults.points_per_ticket,
                )?,
            },
            ticket_code_dir: lookup("TICKET_CODE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./ticket-codes")),
            ticket_code_base_url: lookup("TICKET_CODE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000/codes".to_string()),
            ticket_code_secret: required("TICKET_CODE_SECRET")?,
        })
    }

    pub fn checkout(&self) -> CheckoutConfig {
        CheckoutConfig {
            currency: self.currency,
            reservation_ttl: chrono::Duration::seconds(self.reservation_ttl_secs),
            gateway_timeout: self.gateway_timeout(),
        }
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Absent keys fall back to `default`; present but unparsable keys are errors.
fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

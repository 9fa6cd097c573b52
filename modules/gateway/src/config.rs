use anyhow::bail;
use compact_str::CompactString;
use dispatch::config::{CheckoutConfig, TrackingConfig};
use std::collections::HashMap;

/// Gateway configuration, loaded from the environment at startup.
///
/// Every field has a workable default so a bare `cargo run` comes up as a
/// debug instance with in-memory stores.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Postgres connection string. Absent means in-memory stores.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Stripe secret key. Absent means checkout endpoints are disabled.
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
    /// Base URL the payment provider redirects customers back to.
    #[serde(default = "default_site_domain")]
    pub site_domain: String,

    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// How many recent payments each sweep run re-checks.
    #[serde(default = "default_sweep_payment_window")]
    pub sweep_payment_window: i64,

    /// Static bearer tokens, keyed token to account email.
    #[serde(default)]
    pub auth_tokens: HashMap<CompactString, CompactString>,
    /// Emails that act as admin even before their account says so.
    #[serde(default)]
    pub bootstrap_admins: Vec<CompactString>,

    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            database_url: None,
            max_connections: default_max_connections(),
            stripe_secret_key: None,
            site_domain: default_site_domain(),
            tracking: TrackingConfig::default(),
            checkout: CheckoutConfig::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_payment_window: default_sweep_payment_window(),
            auth_tokens: HashMap::new(),
            bootstrap_admins: Vec::new(),
            debug: false,
        }
    }
}

impl Config {
    /// Reads configuration from `PARCEL_*` environment variables, plus the
    /// conventional `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("PARCEL_HTTP_PORT")? {
            config.http_port = port;
        }
        config.database_url = env_string("DATABASE_URL");
        if let Some(max) = env_u32("PARCEL_MAX_DB_CONNECTIONS")? {
            config.max_connections = max;
        }

        config.stripe_secret_key = env_string("PARCEL_STRIPE_SECRET_KEY");
        if let Some(domain) = env_string("PARCEL_SITE_DOMAIN") {
            config.site_domain = domain;
        }

        if let Some(prefix) = env_string("PARCEL_TRACKING_PREFIX") {
            config.tracking.prefix = CompactString::new(&prefix);
        }
        if let Some(len) = env_usize("PARCEL_TRACKING_SUFFIX_LEN")? {
            if len == 0 {
                bail!("PARCEL_TRACKING_SUFFIX_LEN must be greater than 0");
            }
            config.tracking.suffix_len = len;
        }
        if let Some(currency) = env_string("PARCEL_CHECKOUT_CURRENCY") {
            config.checkout.currency = CompactString::new(currency.to_ascii_lowercase());
        }

        if let Some(secs) = env_u64("PARCEL_SWEEP_INTERVAL_SECS")? {
            if secs == 0 {
                bail!("PARCEL_SWEEP_INTERVAL_SECS must be greater than 0");
            }
            config.sweep_interval_secs = secs;
        }
        if let Some(window) = env_i64("PARCEL_SWEEP_PAYMENT_WINDOW")? {
            if window <= 0 {
                bail!("PARCEL_SWEEP_PAYMENT_WINDOW must be greater than 0");
            }
            config.sweep_payment_window = window;
        }

        if let Some(raw) = env_string("PARCEL_AUTH_TOKENS") {
            config.auth_tokens = parse_auth_tokens("PARCEL_AUTH_TOKENS", &raw)?;
        }
        if let Some(raw) = env_string("PARCEL_BOOTSTRAP_ADMINS") {
            config.bootstrap_admins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(CompactString::new)
                .collect();
        }

        if let Some(debug) = env_bool("PARCEL_DEBUG")? {
            config.debug = debug;
        }

        Ok(config)
    }
}

/// Parses `token=email` pairs separated by commas.
fn parse_auth_tokens(
    name: &str,
    raw: &str,
) -> anyhow::Result<HashMap<CompactString, CompactString>> {
    let mut tokens = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((token, email)) = entry.split_once('=') else {
            bail!("{name} entries must look like token=email, got {entry:?}");
        };
        let (token, email) = (token.trim(), email.trim());
        if token.is_empty() || email.is_empty() {
            bail!("{name} entries must look like token=email, got {entry:?}");
        }
        tokens.insert(CompactString::new(token), CompactString::new(email));
    }
    Ok(tokens)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> anyhow::Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    match v.parse::<u16>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => bail!("{name} must be a u16: {e}"),
    }
}

fn env_u32(name: &str) -> anyhow::Result<Option<u32>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    match v.parse::<u32>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => bail!("{name} must be a u32: {e}"),
    }
}

fn env_u64(name: &str) -> anyhow::Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    match v.parse::<u64>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => bail!("{name} must be a u64: {e}"),
    }
}

fn env_i64(name: &str) -> anyhow::Result<Option<i64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    match v.parse::<i64>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => bail!("{name} must be an i64: {e}"),
    }
}

fn env_usize(name: &str) -> anyhow::Result<Option<usize>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    match v.parse::<usize>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => bail!("{name} must be a usize: {e}"),
    }
}

fn parse_bool(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => bail!("{name} must be a boolean (true/false/1/0)"),
    }
}

fn env_bool(name: &str) -> anyhow::Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn default_http_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    16
}

fn default_site_domain() -> String {
    "http://localhost:3000".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_sweep_payment_window() -> i64 {
    100
}

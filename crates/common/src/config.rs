//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// SMS gateway configuration.
    #[serde(default)]
    pub sms: SmsConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Admin dashboard configuration.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Authentication and account security settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for access and refresh tokens.
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
    /// Mark new accounts as email-verified without sending mail.
    #[serde(default = "default_true")]
    pub skip_email_verification: bool,
    /// Require a confirmed phone number (identity token or SMS code) on quick signup.
    #[serde(default)]
    pub require_phone_verification: bool,
    /// Failed logins before the account is locked.
    #[serde(default = "default_max_failed_logins")]
    pub max_failed_logins: i32,
    /// Lock duration in minutes.
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,
}

/// SMS gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// Gateway account SID.
    #[serde(default)]
    pub account_sid: String,
    /// Gateway auth token.
    #[serde(default)]
    pub auth_token: String,
    /// Sender number registered with the gateway.
    #[serde(default)]
    pub from_number: Option<String>,
    /// Base URL of the gateway REST API.
    #[serde(default = "default_sms_api_base")]
    pub api_base: String,
    /// Pause between consecutive sends, in milliseconds.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: None,
            api_base: default_sms_api_base(),
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

impl SmsConfig {
    /// Whether gateway credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }
}

/// File storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// `local` or `s3`.
    #[serde(default = "default_storage_kind")]
    pub kind: String,
    /// Local base path.
    #[serde(default = "default_local_path")]
    pub local_path: String,
    /// URL prefix for local files.
    #[serde(default = "default_local_url")]
    pub local_url: String,
    /// S3 endpoint.
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    /// S3 bucket.
    #[serde(default)]
    pub s3_bucket: Option<String>,
    /// S3 region.
    #[serde(default = "default_s3_region")]
    pub s3_region: String,
    /// S3 access key id.
    #[serde(default)]
    pub s3_access_key_id: Option<String>,
    /// S3 secret access key.
    #[serde(default)]
    pub s3_secret_access_key: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: default_storage_kind(),
            local_path: default_local_path(),
            local_url: default_local_url(),
            s3_endpoint: None,
            s3_bucket: None,
            s3_region: default_s3_region(),
            s3_access_key_id: None,
            s3_secret_access_key: None,
        }
    }
}

/// Admin dashboard settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Comma-separated IP allow-list for `/admin` routes. Empty allows all.
    #[serde(default)]
    pub allowed_ips: String,
}

impl AdminConfig {
    /// Parsed allow-list entries.
    #[must_use]
    pub fn allowed_ip_list(&self) -> Vec<String> {
        self.allowed_ips
            .split(',')
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_access_token_minutes() -> i64 {
    60
}

const fn default_refresh_token_days() -> i64 {
    7
}

const fn default_true() -> bool {
    true
}

const fn default_max_failed_logins() -> i32 {
    5
}

const fn default_lockout_minutes() -> i64 {
    30
}

fn default_sms_api_base() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

const fn default_send_delay_ms() -> u64 {
    1500
}

fn default_storage_kind() -> String {
    "local".to_string()
}

fn default_local_path() -> String {
    "./files".to_string()
}

fn default_local_url() -> String {
    "/files".to_string()
}

fn default_s3_region() -> String {
    "ap-northeast-2".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MAWS_ENV`)
    /// 4. Environment variables with `MAWS_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("MAWS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MAWS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

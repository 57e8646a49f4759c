//! Platform-wide statistics for superusers.
//!
//! Every section is made of counts and gallery ids only. Payloads pass
//! through [`DataSafetyValidator`] before they leave the service.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc};
use maws_common::{AppError, AppResult};
use maws_db::{
    entities::gallery,
    repositories::{
        ArtworkRepository, ClientColumnRepository, ClientRepository, GalleryRepository,
        SmsRepository, TagRepository, UserRepository,
    },
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, warn};

/// Keys that must never appear in a statistics payload (case-insensitive).
const FORBIDDEN_FIELDS: [&str; 16] = [
    "client_name",
    "client_phone",
    "client_email",
    "client_address",
    "encrypted_name",
    "encrypted_phone",
    "encrypted_email",
    "message_content",
    "conversation",
    "chat",
    "password",
    "password_hash",
    "token",
    "api_key",
    "secret_key",
    "private_key",
];

/// Substrings that must never appear in a key.
const FORBIDDEN_PATTERNS: [&str; 4] = ["personal", "private", "confidential", "sensitive"];

/// String values longer than this are logged.
const LONG_VALUE_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyViolation {
    #[error("Forbidden field detected: {0}")]
    ForbiddenField(String),
    #[error("Forbidden pattern detected: {0}")]
    ForbiddenPattern(String),
}

/// Checks statistics payloads for personal data keys.
pub struct DataSafetyValidator;

impl DataSafetyValidator {
    /// Walk every object key in `value`.
    pub fn validate(value: &Value) -> Result<(), SafetyViolation> {
        Self::check(value, "")
    }

    fn check(value: &Value, path: &str) -> Result<(), SafetyViolation> {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let current = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    let lower = key.to_lowercase();
                    if FORBIDDEN_FIELDS.contains(&lower.as_str()) {
                        return Err(SafetyViolation::ForbiddenField(current));
                    }
                    if FORBIDDEN_PATTERNS.iter().any(|p| lower.contains(p)) {
                        return Err(SafetyViolation::ForbiddenPattern(current));
                    }
                    if let Value::String(s) = child {
                        if s.chars().count() > LONG_VALUE_CHARS {
                            warn!(path = %current, chars = s.chars().count(), "Long string in statistics");
                        }
                    }
                    Self::check(child, &current)?;
                }
                Ok(())
            }
            Value::Array(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| Self::check(item, &format!("{path}[{i}]"))),
            _ => Ok(()),
        }
    }

    /// `stats` when it passes, otherwise a minimal payload with the two
    /// headline totals.
    #[must_use]
    pub fn sanitize(stats: Value) -> Value {
        match Self::validate(&stats) {
            Ok(()) => {
                info!("Statistics data validation passed");
                stats
            }
            Err(violation) => {
                error!(%violation, "Statistics sanitization failed");
                let overview = stats.get("system_overview");
                let total = |key: &str| {
                    overview
                        .and_then(|o| o.get(key))
                        .cloned()
                        .unwrap_or_else(|| json!(0))
                };
                json!({
                    "error": "Data sanitization required",
                    "safe_stats": {
                        "total_galleries": total("total_galleries"),
                        "total_users": total("total_users"),
                    },
                })
            }
        }
    }
}

/// Detail section selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatType {
    System,
    Galleries,
    Users,
    Usage,
    Security,
}

impl StatType {
    pub const NAMES: [&'static str; 5] = ["system", "galleries", "users", "usage", "security"];
}

impl FromStr for StatType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "galleries" => Ok(Self::Galleries),
            "users" => Ok(Self::Users),
            "usage" => Ok(Self::Usage),
            "security" => Ok(Self::Security),
            other => Err(AppError::BadRequest(format!(
                "Invalid stat type: {other} (available: {})",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemOverview {
    pub total_galleries: u64,
    pub active_galleries: u64,
    pub total_users: u64,
    pub active_users: u64,
    pub total_clients: u64,
    pub total_artworks: u64,
    pub total_tags: u64,
    pub total_columns: u64,
    pub total_sms_messages: u64,
    pub new_galleries_this_month: u64,
    pub new_users_this_month: u64,
    pub galleries_with_clients: usize,
    pub galleries_with_artworks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    pub active: u64,
    pub expiring_soon: u64,
    pub expired: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStatus {
    pub with_data: usize,
    pub empty: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryDistribution {
    pub signup_methods: BTreeMap<&'static str, u64>,
    pub subscription_status: SubscriptionStatus,
    pub user_count_distribution: BTreeMap<&'static str, usize>,
    pub activity_status: ActivityStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountActivity {
    pub email_verified: u64,
    pub email_unverified: u64,
    pub locked_accounts: u64,
    pub recent_login: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSecurity {
    pub strong_passwords: u64,
    pub failed_login_attempts: u64,
    pub high_failed_attempts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAnalytics {
    pub role_distribution: BTreeMap<String, u64>,
    pub activity_stats: AccountActivity,
    pub permission_stats: BTreeMap<String, u64>,
    pub security_stats: AccountSecurity,
}

/// Per-gallery counts, identified by id only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryUsage {
    pub gallery_id: String,
    pub client_count: u64,
    pub artwork_count: u64,
    pub user_count: u64,
    pub tag_count: u64,
    pub column_count: u64,
    pub created_days_ago: i64,
    pub signup_method: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageDistribution {
    pub heavy_users: usize,
    pub medium_users: usize,
    pub light_users: usize,
    pub no_data: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupTimeline {
    pub last_7_days: usize,
    pub last_30_days: usize,
    pub last_90_days: usize,
    pub older: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsagePatterns {
    pub gallery_usage_stats: Vec<GalleryUsage>,
    pub average_clients_per_gallery: f64,
    pub average_artworks_per_gallery: f64,
    pub average_users_per_gallery: f64,
    pub usage_distribution: UsageDistribution,
    pub signup_timeline: SignupTimeline,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginWindow {
    pub total_logins: u64,
    pub unique_users: u64,
    pub failed_attempts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub active_sessions: u64,
    pub total_sessions_7d: u64,
    pub average_session_minutes: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityAlerts {
    pub locked_accounts: u64,
    pub recent_password_changes: u64,
    pub unverified_emails: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessPatterns {
    pub superuser_count: u64,
    pub staff_count: u64,
    pub admin_logins_24h: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityMetrics {
    pub login_stats_24h: LoginWindow,
    pub session_stats: SessionStats,
    pub security_alerts: SecurityAlerts,
    pub access_patterns: AccessPatterns,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(total: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(total as f64 / count as f64)
    }
}

/// First instant of the month containing `now`.
fn month_start(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    now.timezone()
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Gallery counts by active-user bucket.
fn user_count_buckets<'a>(counts: impl Iterator<Item = &'a u64>) -> BTreeMap<&'static str, usize> {
    let mut buckets = BTreeMap::from([("1-3명", 0), ("4-7명", 0), ("8-10명", 0), ("10명+", 0)]);
    for &n in counts {
        let key = match n {
            0..=3 => "1-3명",
            4..=7 => "4-7명",
            8..=10 => "8-10명",
            _ => "10명+",
        };
        *buckets.entry(key).or_insert(0) += 1;
    }
    buckets
}

/// Per-gallery usage from counts keyed by gallery id.
fn usage_patterns(
    galleries: &[gallery::Model],
    counts: &PerGalleryCounts,
    now: DateTime<FixedOffset>,
) -> UsagePatterns {
    let get = |map: &HashMap<String, u64>, id: &str| map.get(id).copied().unwrap_or(0);
    let stats: Vec<GalleryUsage> = galleries
        .iter()
        .map(|g| GalleryUsage {
            gallery_id: g.id.clone(),
            client_count: get(&counts.clients, &g.id),
            artwork_count: get(&counts.artworks, &g.id),
            user_count: get(&counts.users, &g.id),
            tag_count: get(&counts.tags, &g.id),
            column_count: get(&counts.columns, &g.id),
            created_days_ago: (now.date_naive() - g.created_at.date_naive()).num_days(),
            signup_method: g.signup_method.as_str(),
        })
        .collect();

    let n = stats.len();
    let sum = |f: fn(&GalleryUsage) -> u64| stats.iter().map(f).sum::<u64>();
    let count_where = |f: &dyn Fn(&GalleryUsage) -> bool| stats.iter().filter(|&g| f(g)).count();

    UsagePatterns {
        average_clients_per_gallery: average(sum(|g| g.client_count), n),
        average_artworks_per_gallery: average(sum(|g| g.artwork_count), n),
        average_users_per_gallery: average(sum(|g| g.user_count), n),
        usage_distribution: UsageDistribution {
            heavy_users: count_where(&|g| g.client_count > 50),
            medium_users: count_where(&|g| (10..=50).contains(&g.client_count)),
            light_users: count_where(&|g| (1..10).contains(&g.client_count)),
            no_data: count_where(&|g| g.client_count == 0),
        },
        signup_timeline: SignupTimeline {
            last_7_days: count_where(&|g| g.created_days_ago <= 7),
            last_30_days: count_where(&|g| g.created_days_ago <= 30),
            last_90_days: count_where(&|g| g.created_days_ago <= 90),
            older: count_where(&|g| g.created_days_ago > 90),
        },
        gallery_usage_stats: stats,
    }
}

/// Row counts keyed by gallery id.
#[derive(Debug, Clone, Default)]
struct PerGalleryCounts {
    clients: HashMap<String, u64>,
    artworks: HashMap<String, u64>,
    users: HashMap<String, u64>,
    tags: HashMap<String, u64>,
    columns: HashMap<String, u64>,
}

/// Admin statistics service.
#[derive(Clone)]
pub struct AdminStatsService {
    gallery_repo: GalleryRepository,
    user_repo: UserRepository,
    client_repo: ClientRepository,
    artwork_repo: ArtworkRepository,
    tag_repo: TagRepository,
    column_repo: ClientColumnRepository,
    sms_repo: SmsRepository,
}

impl AdminStatsService {
    /// Create a new admin statistics service.
    #[must_use]
    pub const fn new(
        gallery_repo: GalleryRepository,
        user_repo: UserRepository,
        client_repo: ClientRepository,
        artwork_repo: ArtworkRepository,
        tag_repo: TagRepository,
        column_repo: ClientColumnRepository,
        sms_repo: SmsRepository,
    ) -> Self {
        Self {
            gallery_repo,
            user_repo,
            client_repo,
            artwork_repo,
            tag_repo,
            column_repo,
            sms_repo,
        }
    }

    /// Totals across all galleries, plus this month's new galleries and users.
    pub async fn system_overview(&self, now: DateTime<FixedOffset>) -> AppResult<SystemOverview> {
        let start = month_start(now);
        let galleries = self
            .gallery_repo
            .get_stats(now, start, now + Duration::days(30))
            .await?;
        let users = self
            .user_repo
            .get_stats(now, start, now - Duration::days(7), now - Duration::days(90))
            .await?;
        let clients = self.client_repo.count_per_gallery().await?;
        let artworks = self.artwork_repo.count_per_gallery().await?;

        Ok(SystemOverview {
            total_galleries: galleries.total,
            active_galleries: galleries.active,
            total_users: users.total,
            active_users: users.active,
            total_clients: self.client_repo.count().await?,
            total_artworks: self.artwork_repo.count().await?,
            total_tags: self.tag_repo.count().await?,
            total_columns: self.column_repo.count().await?,
            total_sms_messages: self.sms_repo.count_messages().await?,
            new_galleries_this_month: galleries.new_this_month,
            new_users_this_month: users.new_this_month,
            galleries_with_clients: clients.values().filter(|&&n| n > 0).count(),
            galleries_with_artworks: artworks.values().filter(|&&n| n > 0).count(),
        })
    }

    pub async fn gallery_distribution(
        &self,
        now: DateTime<FixedOffset>,
    ) -> AppResult<GalleryDistribution> {
        let stats = self
            .gallery_repo
            .get_stats(now, month_start(now), now + Duration::days(30))
            .await?;
        let galleries = self.gallery_repo.find_all().await?;
        let users = self.user_repo.count_active_per_gallery().await?;
        let clients = self.client_repo.count_per_gallery().await?;
        let artworks = self.artwork_repo.count_per_gallery().await?;

        let user_counts: Vec<u64> = galleries
            .iter()
            .map(|g| users.get(&g.id).copied().unwrap_or(0))
            .collect();
        let with_data = galleries
            .iter()
            .filter(|g| {
                clients.get(&g.id).copied().unwrap_or(0) + artworks.get(&g.id).copied().unwrap_or(0) > 0
            })
            .count();

        Ok(GalleryDistribution {
            signup_methods: BTreeMap::from([
                (gallery::SignupMethod::Manual.as_str(), stats.manual_signups),
                (gallery::SignupMethod::Quick.as_str(), stats.quick_signups),
                (gallery::SignupMethod::Code.as_str(), stats.code_signups),
            ]),
            subscription_status: SubscriptionStatus {
                active: stats.subscription_active,
                expiring_soon: stats.expiring_soon,
                expired: stats.expired,
                inactive: stats.total.saturating_sub(stats.active),
            },
            user_count_distribution: user_count_buckets(user_counts.iter()),
            activity_status: ActivityStatus {
                with_data,
                empty: galleries.len() - with_data,
            },
        })
    }

    pub async fn user_analytics(&self, now: DateTime<FixedOffset>) -> AppResult<UserAnalytics> {
        let stats = self
            .user_repo
            .get_stats(
                now,
                month_start(now),
                now - Duration::days(7),
                now - Duration::days(90),
            )
            .await?;

        Ok(UserAnalytics {
            role_distribution: stats.roles.into_iter().collect(),
            activity_stats: AccountActivity {
                email_verified: stats.email_verified,
                email_unverified: stats.total.saturating_sub(stats.email_verified),
                locked_accounts: stats.locked,
                recent_login: stats.recent_login,
            },
            permission_stats: stats.permissions.into_iter().collect(),
            security_stats: AccountSecurity {
                strong_passwords: stats.fresh_passwords,
                failed_login_attempts: stats.with_failed_attempts,
                high_failed_attempts: stats.high_failed_attempts,
            },
        })
    }

    pub async fn usage_patterns(&self, now: DateTime<FixedOffset>) -> AppResult<UsagePatterns> {
        let galleries = self.gallery_repo.find_active().await?;
        let counts = PerGalleryCounts {
            clients: self.client_repo.count_per_gallery().await?,
            artworks: self.artwork_repo.count_per_gallery().await?,
            users: self.user_repo.count_active_per_gallery().await?,
            tags: self.tag_repo.count_per_gallery().await?,
            columns: self.column_repo.count_per_gallery().await?,
        };
        Ok(usage_patterns(&galleries, &counts, now))
    }

    pub async fn security_metrics(&self, now: DateTime<FixedOffset>) -> AppResult<SecurityMetrics> {
        let last_24h = now - Duration::hours(24);
        let last_7d = now - Duration::days(7);
        let day = self.user_repo.get_login_stats(last_24h).await?;
        let week = self.user_repo.get_login_stats(last_7d).await?;
        let users = self
            .user_repo
            .get_stats(now, month_start(now), last_7d, last_7d)
            .await?;

        Ok(SecurityMetrics {
            login_stats_24h: LoginWindow {
                total_logins: day.logins,
                unique_users: day.unique_users,
                failed_attempts: users.with_failed_attempts,
            },
            session_stats: SessionStats {
                active_sessions: week.open_sessions,
                total_sessions_7d: week.logins,
                average_session_minutes: round2(week.avg_session_secs / 60.0),
            },
            security_alerts: SecurityAlerts {
                locked_accounts: users.locked,
                recent_password_changes: users.fresh_passwords,
                unverified_emails: users.total.saturating_sub(users.email_verified),
            },
            access_patterns: AccessPatterns {
                superuser_count: users.superusers,
                staff_count: users.staff,
                admin_logins_24h: day.admin_logins,
            },
        })
    }

    /// A section as JSON. A failing section logs and yields `{}`.
    async fn section(&self, kind: StatType, now: DateTime<FixedOffset>) -> AppResult<Value> {
        fn to_json<T: Serialize>(value: T) -> AppResult<Value> {
            serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
        }
        match kind {
            StatType::System => to_json(self.system_overview(now).await?),
            StatType::Galleries => to_json(self.gallery_distribution(now).await?),
            StatType::Users => to_json(self.user_analytics(now).await?),
            StatType::Usage => to_json(self.usage_patterns(now).await?),
            StatType::Security => to_json(self.security_metrics(now).await?),
        }
    }

    /// Every section plus metadata, sanitized.
    pub async fn dashboard(&self) -> Value {
        let now = Utc::now().fixed_offset();
        let mut stats = serde_json::Map::new();
        let mut collection_success = true;

        for (key, kind) in [
            ("system_overview", StatType::System),
            ("gallery_distribution", StatType::Galleries),
            ("user_analytics", StatType::Users),
            ("usage_patterns", StatType::Usage),
            ("security_metrics", StatType::Security),
        ] {
            let value = match self.section(kind, now).await {
                Ok(value) => value,
                Err(e) => {
                    error!(section = key, error = %e, "Statistics section failed");
                    collection_success = false;
                    json!({})
                }
            };
            stats.insert(key.to_string(), value);
        }
        stats.insert("last_updated".to_string(), json!(now.to_rfc3339()));
        stats.insert("collection_success".to_string(), json!(collection_success));

        let mut payload = DataSafetyValidator::sanitize(Value::Object(stats));
        if let Value::Object(map) = &mut payload {
            map.insert(
                "meta".to_string(),
                json!({
                    "timestamp": Utc::now().to_rfc3339(),
                    "version": env!("CARGO_PKG_VERSION"),
                    "data_privacy": "Zero-Knowledge compliant",
                }),
            );
        }
        payload
    }

    /// One section by name.
    pub async fn detail(&self, stat_type: &str) -> AppResult<Value> {
        let kind = stat_type.parse::<StatType>()?;
        let data = self.section(kind, Utc::now().fixed_offset()).await?;
        DataSafetyValidator::validate(&data).map_err(|v| AppError::Internal(v.to_string()))?;

        Ok(json!({
            "stat_type": stat_type,
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::permission::tests::test_gallery;

    #[test]
    fn test_validator_accepts_counts() {
        let payload = json!({
            "system_overview": {"total_galleries": 3},
            "usage_patterns": {"gallery_usage_stats": [{"gallery_id": "g1", "client_count": 2}]},
        });
        assert!(DataSafetyValidator::validate(&payload).is_ok());
    }

    #[test]
    fn test_validator_rejects_nested_field() {
        let payload = json!({"usage": {"rows": [{"gallery_id": "g1", "Client_Phone": "010"}]}});
        assert_eq!(
            DataSafetyValidator::validate(&payload),
            Err(SafetyViolation::ForbiddenField("usage.rows[0].Client_Phone".to_string()))
        );
    }

    #[test]
    fn test_validator_rejects_pattern() {
        let payload = json!({"personal_notes": 1});
        assert!(matches!(
            DataSafetyValidator::validate(&payload),
            Err(SafetyViolation::ForbiddenPattern(_))
        ));
        // Exact matches only for fields.
        assert!(DataSafetyValidator::validate(&json!({"token_count": 1})).is_ok());
    }

    #[test]
    fn test_sanitize_falls_back_to_totals() {
        let stats = json!({
            "system_overview": {"total_galleries": 4, "total_users": 9, "password": "x"},
        });
        let safe = DataSafetyValidator::sanitize(stats);
        assert_eq!(safe["error"], "Data sanitization required");
        assert_eq!(safe["safe_stats"]["total_galleries"], 4);
        assert_eq!(safe["safe_stats"]["total_users"], 9);
    }

    #[test]
    fn test_stat_type_parse() {
        assert_eq!("usage".parse::<StatType>().unwrap(), StatType::Usage);
        assert!(matches!("clients".parse::<StatType>(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_user_count_buckets() {
        let buckets = user_count_buckets([0, 3, 4, 10, 11].iter());
        assert_eq!(buckets["1-3명"], 2);
        assert_eq!(buckets["4-7명"], 1);
        assert_eq!(buckets["8-10명"], 1);
        assert_eq!(buckets["10명+"], 1);
    }

    #[test]
    fn test_usage_patterns() {
        let now = Utc::now().fixed_offset();
        let mut old = test_gallery("g2");
        old.created_at = now - Duration::days(120);
        let galleries = vec![test_gallery("g1"), old];
        let counts = PerGalleryCounts {
            clients: HashMap::from([("g1".to_string(), 60), ("g2".to_string(), 5)]),
            users: HashMap::from([("g1".to_string(), 3)]),
            ..Default::default()
        };

        let usage = usage_patterns(&galleries, &counts, now);
        assert_eq!(usage.average_clients_per_gallery, 32.5);
        assert_eq!(usage.average_users_per_gallery, 1.5);
        assert_eq!(
            usage.usage_distribution,
            UsageDistribution { heavy_users: 1, medium_users: 0, light_users: 1, no_data: 0 }
        );
        assert_eq!(usage.signup_timeline.last_7_days, 1);
        assert_eq!(usage.signup_timeline.older, 1);
        assert_eq!(usage.gallery_usage_stats[1].created_days_ago, 120);
        assert!(DataSafetyValidator::validate(&serde_json::to_value(&usage).unwrap()).is_ok());
    }

    #[test]
    fn test_averages_with_no_galleries() {
        let usage = usage_patterns(&[], &PerGalleryCounts::default(), Utc::now().fixed_offset());
        assert_eq!(usage.average_artworks_per_gallery, 0.0);
    }

    #[test]
    fn test_month_start() {
        let now = DateTime::parse_from_rfc3339("2026-10-16T12:30:00+09:00").unwrap();
        assert_eq!(month_start(now).to_rfc3339(), "2026-10-01T00:00:00+09:00");
    }
}

//! Signup, login and token service.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use maws_common::{AppError, AppResult, IdGenerator, TokenIssuer, TokenKind, TokenPair, config::AuthConfig};
use maws_db::{
    entities::{gallery, login_history, phone_verification, user, user::UserRole},
    repositories::{GalleryRepository, PhoneVerificationRepository, UserRepository},
};
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use super::permission::permission_map;
use super::sms::{SmsGateway, format_phone_number};

#[allow(clippy::unwrap_used)]
static MOBILE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^01[016789]\d{7,8}$").unwrap());

/// Attempts at drawing an unused registration code before giving up.
const REGISTRATION_CODE_ATTEMPTS: usize = 10;

const PHONE_CODE_TTL_MINUTES: i64 = 5;
const MAX_PHONE_CODE_ATTEMPTS: i32 = 5;
/// How long a confirmed code counts as proof of the number for quick signup.
const VERIFIED_PHONE_WINDOW_MINUTES: i64 = 30;

/// Verifies an identity token from the phone verification provider and
/// returns the verified phone number.
#[async_trait::async_trait]
pub trait PhoneVerifier: Send + Sync {
    async fn verified_phone(&self, token: &str) -> AppResult<String>;
}

/// Input for joining an existing gallery with its registration code.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 20))]
    pub registration_code: String,

    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    pub password: String,
    pub password_confirm: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,
}

/// Input for creating a gallery together with its owner account.
#[derive(Debug, Deserialize, Validate)]
pub struct QuickSignupInput {
    #[validate(length(max = 100))]
    pub gallery_name: String,

    #[validate(length(max = 20))]
    pub phone_number: String,

    /// Identity token from the phone verification provider.
    pub verification_token: Option<String>,

    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    pub password: String,
    pub password_confirm: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,
}

/// Login credentials.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request for a phone verification code.
#[derive(Debug, Deserialize)]
pub struct SendPhoneCodeInput {
    #[serde(default)]
    pub phone_number: String,
}

/// A code was issued.
#[derive(Debug, Clone, Serialize)]
pub struct PhoneCodeSent {
    /// Seconds until the code expires.
    pub expires_in: i64,
    /// Number the code went to, international form.
    pub phone_number: String,
    /// The code itself, only when no SMS sender is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

/// A code check.
#[derive(Debug, Deserialize)]
pub struct VerifyPhoneCodeInput {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhoneCodeVerified {
    pub verified: bool,
}

/// Gallery reference embedded in the user summary.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryRef {
    pub id: String,
    pub name: String,
    pub registration_code: Option<String>,
}

/// Per-user UI settings.
#[derive(Debug, Clone, Serialize)]
pub struct UserSettings {
    pub timezone: String,
    pub language: String,
    pub theme: String,
}

/// User details returned on login.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub role_display: &'static str,
    pub gallery: Option<GalleryRef>,
    pub permissions: BTreeMap<&'static str, bool>,
    pub settings: UserSettings,
}

impl UserSummary {
    #[must_use]
    pub fn new(user: &user::Model, gallery: Option<&gallery::Model>) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            role_display: user.role.display_name(),
            gallery: gallery.map(|g| GalleryRef {
                id: g.id.clone(),
                name: g.name.clone(),
                registration_code: g.registration_code.clone(),
            }),
            permissions: permission_map(user),
            settings: UserSettings {
                timezone: user.timezone_setting.clone(),
                language: user.language.clone(),
                theme: user.theme_preference.clone(),
            },
        }
    }
}

/// Result of checking a registration code before signup.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationCodeInfo {
    pub valid: bool,
    pub gallery: CodeGallery,
}

/// Gallery details shown to someone holding its registration code.
#[derive(Debug, Clone, Serialize)]
pub struct CodeGallery {
    pub name: String,
    pub user_count: u64,
    pub max_users: i32,
}

/// Successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserSummary,
}

/// Device details guessed from a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: &'static str,
    pub browser: &'static str,
    pub os: &'static str,
}

/// Classify a user agent into device type, browser family and OS family.
#[must_use]
pub fn detect_device(user_agent: &str) -> DeviceInfo {
    let ua = user_agent;
    let device_type = if ua.contains("iPad") || (ua.contains("Android") && !ua.contains("Mobile")) {
        "tablet"
    } else if ua.contains("Mobi") || ua.contains("iPhone") || ua.contains("Android") {
        "mobile"
    } else if ua.contains("Windows") || ua.contains("Macintosh") || ua.contains("X11") {
        "desktop"
    } else {
        "unknown"
    };

    let browser = if ua.contains("Edg/") {
        "Edge"
    } else if ua.contains("OPR/") {
        "Opera"
    } else if ua.contains("SamsungBrowser") {
        "Samsung Internet"
    } else if ua.contains("Chrome/") || ua.contains("CriOS") {
        "Chrome"
    } else if ua.contains("Firefox/") {
        "Firefox"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        "Other"
    };

    let os = if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Mac OS X") {
        "Mac OS X"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Other"
    };

    DeviceInfo {
        device_type,
        browser,
        os,
    }
}

/// Strip everything but ASCII digits.
#[must_use]
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Domestic form of a phone number: digits only, `82` country code
/// replaced by a leading `0`.
fn domestic_digits(value: &str) -> String {
    let digits = digits_only(value);
    match digits.strip_prefix("82") {
        Some(rest) if !rest.starts_with('0') => format!("0{rest}"),
        Some(rest) => rest.to_string(),
        None => digits,
    }
}

/// Password policy: confirmation matches, at least 8 characters, not all digits.
pub fn validate_new_password(password: &str, confirm: &str) -> AppResult<()> {
    if password != confirm {
        return Err(AppError::Validation("비밀번호가 일치하지 않습니다.".to_string()));
    }
    if password.chars().count() < 8 {
        return Err(AppError::Validation(
            "비밀번호는 8자 이상이어야 합니다.".to_string(),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "비밀번호는 숫자로만 구성될 수 없습니다.".to_string(),
        ));
    }
    Ok(())
}

/// Hash a password with Argon2.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Signup, login and token service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    gallery_repo: GalleryRepository,
    phone_codes: PhoneVerificationRepository,
    tokens: TokenIssuer,
    id_gen: IdGenerator,
    config: AuthConfig,
    phone_verifier: Option<Arc<dyn PhoneVerifier>>,
    code_sender: Option<Arc<dyn SmsGateway>>,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        gallery_repo: GalleryRepository,
        phone_codes: PhoneVerificationRepository,
        config: &AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            gallery_repo,
            phone_codes,
            tokens: TokenIssuer::from_config(config),
            id_gen: IdGenerator::new(),
            config: config.clone(),
            phone_verifier: None,
            code_sender: None,
        }
    }

    /// Attach the phone verification provider used by quick signup.
    #[must_use]
    pub fn with_phone_verifier(mut self, verifier: Arc<dyn PhoneVerifier>) -> Self {
        self.phone_verifier = Some(verifier);
        self
    }

    /// Attach the gateway that delivers phone verification codes. Without
    /// one, codes are logged and echoed back in the response.
    #[must_use]
    pub fn with_code_sender(mut self, sender: Arc<dyn SmsGateway>) -> Self {
        self.code_sender = Some(sender);
        self
    }

    /// Token issuer shared with the auth middleware.
    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    async fn ensure_unique_account(&self, username: &str, email: &str) -> AppResult<()> {
        if self.user_repo.username_exists(username).await? {
            return Err(AppError::BadRequest("이미 사용 중인 아이디입니다.".to_string()));
        }
        if self.user_repo.email_exists(email).await? {
            return Err(AppError::BadRequest("이미 사용 중인 이메일입니다.".to_string()));
        }
        Ok(())
    }

    /// Draw a registration code no gallery uses yet.
    pub async fn generate_unique_registration_code(&self) -> AppResult<String> {
        for _ in 0..REGISTRATION_CODE_ATTEMPTS {
            let code = self.id_gen.generate_registration_code();
            if !self.gallery_repo.registration_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(AppError::Internal(
            "Could not allocate a registration code".to_string(),
        ))
    }

    /// Gallery a registration code admits new users to.
    pub async fn gallery_for_code(&self, code: &str) -> AppResult<gallery::Model> {
        let gallery = self
            .gallery_repo
            .find_by_registration_code(code.trim())
            .await?
            .filter(|g| g.is_active)
            .ok_or_else(|| AppError::BadRequest("유효하지 않은 가입 코드입니다.".to_string()))?;

        if !gallery.is_subscription_active() {
            return Err(AppError::BadRequest(
                "해당 갤러리의 구독이 만료되었습니다.".to_string(),
            ));
        }

        let user_count = self.user_repo.count_active_by_gallery(&gallery.id).await?;
        if user_count >= u64::try_from(gallery.max_users).unwrap_or(0) {
            return Err(AppError::BadRequest(
                "해당 갤러리의 사용자 수가 제한에 도달했습니다.".to_string(),
            ));
        }

        Ok(gallery)
    }

    /// Check a registration code without registering.
    pub async fn validate_registration_code(&self, code: &str) -> AppResult<RegistrationCodeInfo> {
        if code.trim().is_empty() {
            return Err(AppError::BadRequest("가입 코드를 입력해주세요.".to_string()));
        }
        let gallery = self.gallery_for_code(code).await?;
        let user_count = self.user_repo.count_active_by_gallery(&gallery.id).await?;
        Ok(RegistrationCodeInfo {
            valid: true,
            gallery: CodeGallery {
                name: gallery.name,
                user_count,
                max_users: gallery.max_users,
            },
        })
    }

    /// Join a gallery as staff using its registration code.
    pub async fn register(&self, input: RegisterInput) -> AppResult<(user::Model, gallery::Model)> {
        input.validate()?;
        validate_new_password(&input.password, &input.password_confirm)?;

        let gallery = self.gallery_for_code(&input.registration_code).await?;
        self.ensure_unique_account(&input.username, &input.email)
            .await?;

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            gallery_id: Set(Some(gallery.id.clone())),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(hash_password(&input.password)?),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            phone: Set(input.phone),
            job_title: Set(input.job_title),
            role: Set(UserRole::Staff),
            email_verified: Set(self.config.skip_email_verification),
            password_changed_at: Set(Some(now.into())),
            created_at: Set(now.into()),
            ..new_user_defaults()
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, gallery_id = %gallery.id, "User registered with code");
        Ok((user, gallery))
    }

    /// Create a gallery and its owner in one step.
    pub async fn quick_signup(
        &self,
        input: QuickSignupInput,
    ) -> AppResult<(user::Model, gallery::Model)> {
        input.validate()?;

        let gallery_name = input.gallery_name.trim().to_string();
        if gallery_name.chars().count() < 2 {
            return Err(AppError::Validation(
                "갤러리명은 2글자 이상이어야 합니다.".to_string(),
            ));
        }
        if self.gallery_repo.name_exists(&gallery_name).await? {
            return Err(AppError::BadRequest("이미 사용 중인 갤러리명입니다.".to_string()));
        }

        let phone = digits_only(&input.phone_number);
        if !MOBILE_PHONE_RE.is_match(&phone) {
            return Err(AppError::Validation(
                "올바른 휴대폰 번호를 입력해주세요.".to_string(),
            ));
        }
        if self.gallery_repo.verified_phone_exists(&phone).await? {
            return Err(AppError::BadRequest("이미 사용 중인 전화번호입니다.".to_string()));
        }

        let phone_verified = self
            .verify_phone_ownership(&phone, input.verification_token.as_deref())
            .await?;

        validate_new_password(&input.password, &input.password_confirm)?;
        self.ensure_unique_account(&input.username, &input.email)
            .await?;

        let now = Utc::now();
        let gallery = self
            .gallery_repo
            .create(gallery::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(gallery_name.clone()),
                registration_code: Set(Some(self.generate_unique_registration_code().await?)),
                signup_method: Set(gallery::SignupMethod::Quick),
                verified_phone: Set(Some(phone.clone())),
                phone_verified_at: Set(phone_verified.then(|| now.into())),
                auto_generated: Set(true),
                address: Set(Some(format!("{gallery_name} 주소"))),
                phone: Set(Some(phone.clone())),
                email: Set(Some(input.email.clone())),
                website: Set(None),
                description: Set(None),
                max_users: Set(10),
                subscription_expires_at: Set(None),
                is_active: Set(true),
                created_at: Set(now.into()),
                updated_at: Set(None),
            })
            .await?;

        let user = self
            .user_repo
            .create(user::ActiveModel {
                id: Set(self.id_gen.generate()),
                gallery_id: Set(Some(gallery.id.clone())),
                username: Set(input.username),
                email: Set(input.email),
                password_hash: Set(hash_password(&input.password)?),
                first_name: Set(input.first_name),
                last_name: Set(input.last_name),
                phone: Set(Some(phone)),
                job_title: Set(input.job_title),
                role: Set(UserRole::Owner),
                email_verified: Set(self.config.skip_email_verification),
                password_changed_at: Set(Some(now.into())),
                created_at: Set(now.into()),
                ..new_user_defaults()
            })
            .await?;

        info!(gallery_id = %gallery.id, gallery = %gallery.name, user_id = %user.id, "Gallery created by quick signup");
        Ok((user, gallery))
    }

    /// Returns whether the phone number was confirmed, either by an
    /// identity token from the provider or by a code checked through
    /// [`Self::verify_phone_code`].
    async fn verify_phone_ownership(&self, phone: &str, token: Option<&str>) -> AppResult<bool> {
        if !self.config.require_phone_verification {
            return Ok(false);
        }

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let verifier = self.phone_verifier.as_ref().ok_or_else(|| {
                AppError::Config("Identity token given but no phone verifier configured".to_string())
            })?;
            let verified = verifier.verified_phone(token).await?;
            if domestic_digits(&verified) != phone {
                return Err(AppError::Validation(
                    "인증된 전화번호와 입력된 전화번호가 일치하지 않습니다.".to_string(),
                ));
            }
            return Ok(true);
        }

        let window_start =
            Utc::now().fixed_offset() - Duration::minutes(VERIFIED_PHONE_WINDOW_MINUTES);
        let confirmed = self
            .phone_codes
            .find_verified(phone)
            .await?
            .and_then(|code| code.verified_at)
            .is_some_and(|at| at >= window_start);
        if !confirmed {
            return Err(AppError::Validation("휴대폰 인증을 먼저 완료해주세요.".to_string()));
        }
        Ok(true)
    }

    /// Issue a six-digit code for a mobile number not yet tied to a gallery.
    /// Earlier codes of the number are discarded.
    pub async fn send_phone_code(&self, phone_number: &str) -> AppResult<PhoneCodeSent> {
        if phone_number.trim().is_empty() {
            return Err(AppError::BadRequest("전화번호를 입력해주세요.".to_string()));
        }
        let phone = digits_only(phone_number);
        if !MOBILE_PHONE_RE.is_match(&phone) {
            return Err(AppError::Validation(
                "올바른 전화번호 형식이 아닙니다. (예: 010-1234-5678)".to_string(),
            ));
        }
        if self.gallery_repo.verified_phone_exists(&phone).await? {
            return Err(AppError::BadRequest("이미 사용 중인 전화번호입니다.".to_string()));
        }

        let code = self.id_gen.generate_verification_code();
        let now = Utc::now();
        self.phone_codes
            .replace(phone_verification::ActiveModel {
                id: Set(self.id_gen.generate()),
                phone_number: Set(phone.clone()),
                code: Set(code.clone()),
                created_at: Set(now.into()),
                expires_at: Set((now + Duration::minutes(PHONE_CODE_TTL_MINUTES)).into()),
                verified: Set(false),
                verified_at: Set(None),
                attempts: Set(0),
            })
            .await?;

        let international = format_phone_number(&phone)?;
        let dev_code = match &self.code_sender {
            Some(sender) => {
                sender
                    .send(&international, &format!("[MAWS] 인증번호: {code}"))
                    .await
                    .map_err(|e| {
                        warn!(phone = %international, error = %e, "Failed to send verification code");
                        AppError::ExternalService("인증번호 발송에 실패했습니다.".to_string())
                    })?;
                None
            }
            None => {
                info!(phone = %international, code = %code, "Verification code issued without SMS sender");
                Some(code)
            }
        };

        Ok(PhoneCodeSent {
            expires_in: PHONE_CODE_TTL_MINUTES * 60,
            phone_number: international,
            dev_code,
        })
    }

    /// Check a code against the newest pending code of the number. Every
    /// check counts as an attempt; a code stops working once expired or
    /// after five checks.
    pub async fn verify_phone_code(
        &self,
        phone_number: &str,
        code: &str,
    ) -> AppResult<PhoneCodeVerified> {
        if phone_number.trim().is_empty() || code.trim().is_empty() {
            return Err(AppError::BadRequest(
                "전화번호와 인증번호를 입력해주세요.".to_string(),
            ));
        }
        let phone = digits_only(phone_number);
        let pending = self
            .phone_codes
            .find_pending(&phone)
            .await?
            .ok_or_else(|| AppError::Validation("인증번호를 먼저 요청해주세요.".to_string()))?;

        let now = Utc::now().fixed_offset();
        let expired = now > pending.expires_at;
        // Checks made before this one decide; the fifth check can still succeed.
        let exhausted = pending.attempts >= MAX_PHONE_CODE_ATTEMPTS;
        let accepted = !expired && !exhausted && pending.code == code.trim();
        let attempts = pending.attempts + 1;

        let mut active: phone_verification::ActiveModel = pending.into();
        active.attempts = Set(attempts);
        if accepted {
            active.verified = Set(true);
            active.verified_at = Set(Some(now));
        }
        self.phone_codes.update(active).await?;

        if accepted {
            info!(phone = %phone, "Phone number verified");
            return Ok(PhoneCodeVerified { verified: true });
        }
        if expired {
            return Err(AppError::Validation(
                "인증번호가 만료되었습니다. 새로 요청해주세요.".to_string(),
            ));
        }
        if attempts >= MAX_PHONE_CODE_ATTEMPTS {
            return Err(AppError::Validation(
                "인증 시도 횟수를 초과했습니다. 새로 요청해주세요.".to_string(),
            ));
        }
        Err(AppError::Validation(format!(
            "인증번호가 올바르지 않습니다. ({}회 남음)",
            MAX_PHONE_CODE_ATTEMPTS - attempts
        )))
    }

    /// Authenticate and open a session.
    pub async fn login(
        &self,
        input: LoginInput,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AppResult<LoginResponse> {
        input.validate()?;
        let now = Utc::now().fixed_offset();

        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if let Some(locked_until) = user.account_locked_until.filter(|until| now < *until) {
            return Err(AppError::AccountLocked(locked_until.to_rfc3339()));
        }
        if !user.is_active {
            return Err(AppError::Unauthorized);
        }

        if !verify_password(&input.password, &user.password_hash)? {
            self.record_failed_login(user, now).await?;
            return Err(AppError::Unauthorized);
        }

        let gallery = match user.gallery_id.as_deref() {
            Some(gallery_id) => {
                let gallery = self.gallery_repo.get_by_id(gallery_id).await?;
                if !gallery.is_active {
                    return Err(AppError::Forbidden(
                        "소속 갤러리가 비활성 상태입니다.".to_string(),
                    ));
                }
                if !gallery.is_subscription_active_at(now) {
                    return Err(AppError::Forbidden(
                        "갤러리 구독이 만료되었습니다.".to_string(),
                    ));
                }
                Some(gallery)
            }
            None => None,
        };

        let ip = ip_address.unwrap_or("unknown").to_string();
        let mut active: user::ActiveModel = user.into();
        active.failed_login_attempts = Set(0);
        active.account_locked_until = Set(None);
        active.last_login = Set(Some(now));
        active.last_login_ip = Set(Some(ip.clone()));
        let user = self.user_repo.update(active).await?;

        let ua = user_agent.unwrap_or_default();
        let device = detect_device(ua);
        self.user_repo
            .create_login_history(login_history::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id.clone()),
                ip_address: Set(ip),
                user_agent: Set(ua.to_string()),
                login_time: Set(now),
                logout_time: Set(None),
                session_duration_secs: Set(None),
                device_type: Set(device.device_type.to_string()),
                browser: Set(device.browser.to_string()),
                os: Set(device.os.to_string()),
                country: Set(None),
                city: Set(None),
            })
            .await?;

        let pair = self.tokens.issue_pair(&user.id, user.role.as_str())?;
        info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            access: pair.access,
            refresh: pair.refresh,
            token_type: "Bearer",
            expires_in: self.tokens.access_ttl_secs(),
            user: UserSummary::new(&user, gallery.as_ref()),
        })
    }

    async fn record_failed_login(
        &self,
        user: user::Model,
        now: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<()> {
        let attempts = user.failed_login_attempts + 1;
        let user_id = user.id.clone();
        let mut active: user::ActiveModel = user.into();
        active.failed_login_attempts = Set(attempts);
        if attempts >= self.config.max_failed_logins {
            active.account_locked_until =
                Set(Some(now + Duration::minutes(self.config.lockout_minutes)));
            warn!(user_id = %user_id, attempts, "Account locked after failed logins");
        }
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.tokens.validate(refresh_token, TokenKind::Refresh)?;
        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)?;
        self.tokens.issue_pair(&user.id, user.role.as_str())
    }

    /// Close the user's newest open session. Returns whether one was open.
    pub async fn logout(&self, user_id: &str) -> AppResult<bool> {
        let Some(session) = self.user_repo.find_latest_open_session(user_id).await? else {
            return Ok(false);
        };
        self.close_session(session).await?;
        Ok(true)
    }

    /// Close one of the user's open sessions by id.
    pub async fn force_logout(&self, user_id: &str, session_id: &str) -> AppResult<()> {
        if session_id.trim().is_empty() {
            return Err(AppError::BadRequest("세션 ID를 입력해주세요.".to_string()));
        }
        let session = self
            .user_repo
            .find_open_session(user_id, session_id.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("유효하지 않은 세션입니다.".to_string()))?;
        self.close_session(session).await
    }

    async fn close_session(&self, session: login_history::Model) -> AppResult<()> {
        let now = Utc::now().fixed_offset();
        let duration = (now - session.login_time).num_seconds().max(0);
        let user_id = session.user_id.clone();
        let session_id = session.id.clone();
        let mut active: login_history::ActiveModel = session.into();
        active.logout_time = Set(Some(now));
        active.session_duration_secs = Set(Some(duration));
        self.user_repo.update_login_history(active).await?;

        info!(user_id = %user_id, session_id = %session_id, duration_secs = duration, "Session closed");
        Ok(())
    }
}

/// Column defaults for a new gallery member.
fn new_user_defaults() -> user::ActiveModel {
    user::ActiveModel {
        emergency_contact: Set(None),
        can_manage_clients: Set(true),
        can_manage_artworks: Set(true),
        can_export_data: Set(false),
        can_send_messages: Set(false),
        can_view_reports: Set(false),
        can_manage_users: Set(false),
        can_manage_gallery_settings: Set(false),
        is_active: Set(true),
        is_staff: Set(false),
        is_superuser: Set(false),
        failed_login_attempts: Set(0),
        account_locked_until: Set(None),
        last_login: Set(None),
        last_login_ip: Set(None),
        timezone_setting: Set("Asia/Seoul".to_string()),
        language: Set("ko".to_string()),
        theme_preference: Set("light".to_string()),
        updated_at: Set(None),
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::permission::tests::{test_gallery, test_user};
    use crate::services::sms::GatewayReceipt;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            skip_email_verification: true,
            require_phone_verification: false,
            max_failed_logins: 5,
            lockout_minutes: 30,
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> AuthService {
        service_with(Arc::new(db), &test_config())
    }

    fn service_with(db: Arc<sea_orm::DatabaseConnection>, config: &AuthConfig) -> AuthService {
        AuthService::new(
            UserRepository::new(db.clone()),
            GalleryRepository::new(db.clone()),
            PhoneVerificationRepository::new(db),
            config,
        )
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_new_password("abcd1234", "abcd1234").is_ok());
        assert!(validate_new_password("abcd1234", "abcd12345").is_err());
        assert!(validate_new_password("abc123", "abc123").is_err());
        assert!(validate_new_password("12345678", "12345678").is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_detect_device() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
        assert_eq!(
            detect_device(iphone),
            DeviceInfo {
                device_type: "mobile",
                browser: "Safari",
                os: "iOS"
            }
        );

        let windows = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
        let info = detect_device(windows);
        assert_eq!(info.device_type, "desktop");
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.os, "Windows");

        let tablet = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
        assert_eq!(detect_device(tablet).device_type, "tablet");
        assert_eq!(detect_device("").device_type, "unknown");
    }

    #[test]
    fn test_domestic_digits() {
        assert_eq!(domestic_digits("+82 10-1234-5678"), "01012345678");
        assert_eq!(domestic_digits("010-1234-5678"), "01012345678");
    }

    #[tokio::test]
    async fn test_login_success_returns_tokens_and_summary() {
        let mut user = test_user("u1", UserRole::Manager);
        user.password_hash = hash_password("password123").unwrap();
        user.failed_login_attempts = 2;
        let mut updated = user.clone();
        updated.failed_login_attempts = 0;
        let history = login_history::Model {
            id: "h1".to_string(),
            user_id: "u1".to_string(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: String::new(),
            login_time: Utc::now().into(),
            logout_time: None,
            session_duration_secs: None,
            device_type: "unknown".to_string(),
            browser: "Other".to_string(),
            os: "Other".to_string(),
            country: None,
            city: None,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .append_query_results([[test_gallery("g1")]])
            .append_query_results([[updated]])
            .append_query_results([[history]])
            .into_connection();

        let svc = service(db);
        let response = svc
            .login(
                LoginInput {
                    username: "u1".to_string(),
                    password: "password123".to_string(),
                },
                Some("127.0.0.1"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.user.role_display, "매니저");
        assert_eq!(response.user.gallery.unwrap().id, "g1");
        let claims = svc.tokens().validate(&response.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[tokio::test]
    async fn test_login_wrong_password_locks_on_threshold() {
        let mut user = test_user("u1", UserRole::Staff);
        user.password_hash = hash_password("password123").unwrap();
        user.failed_login_attempts = 4;
        let mut locked = user.clone();
        locked.failed_login_attempts = 5;
        locked.account_locked_until = Some((Utc::now() + Duration::minutes(30)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .append_query_results([[locked]])
            .into_connection();

        let result = service(db)
            .login(
                LoginInput {
                    username: "u1".to_string(),
                    password: "nope-nope".to_string(),
                },
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_locked_account_rejected() {
        let mut user = test_user("u1", UserRole::Staff);
        user.password_hash = hash_password("password123").unwrap();
        user.account_locked_until = Some((Utc::now() + Duration::minutes(10)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .into_connection();

        let result = service(db)
            .login(
                LoginInput {
                    username: "u1".to_string(),
                    password: "password123".to_string(),
                },
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::AccountLocked(_))));
    }

    #[tokio::test]
    async fn test_login_expired_subscription_rejected() {
        let mut user = test_user("u1", UserRole::Owner);
        user.password_hash = hash_password("password123").unwrap();
        let mut gallery = test_gallery("g1");
        gallery.subscription_expires_at = Some((Utc::now() - Duration::days(1)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .append_query_results([[gallery]])
            .into_connection();

        let result = service(db)
            .login(
                LoginInput {
                    username: "u1".to_string(),
                    password: "password123".to_string(),
                },
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn test_quick_signup_rejects_bad_phone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(0)]])
            .into_connection();

        let result = service(db)
            .quick_signup(QuickSignupInput {
                gallery_name: "  새 갤러리 ".to_string(),
                phone_number: "02-123-4567".to_string(),
                verification_token: None,
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password: "password123".to_string(),
                password_confirm: "password123".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                job_title: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    struct StaticVerifier(&'static str);

    #[async_trait::async_trait]
    impl PhoneVerifier for StaticVerifier {
        async fn verified_phone(&self, _token: &str) -> AppResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_quick_signup_rejects_mismatched_verified_phone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(0)]])
            .append_query_results([[count_row(0)]])
            .into_connection();
        let mut config = test_config();
        config.require_phone_verification = true;
        let db = Arc::new(db);
        let service = service_with(db, &config)
            .with_phone_verifier(Arc::new(StaticVerifier("+82 10-9999-8888")));

        let result = service
            .quick_signup(QuickSignupInput {
                gallery_name: "새 갤러리".to_string(),
                phone_number: "010-1234-5678".to_string(),
                verification_token: Some("identity-token".to_string()),
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password: "password123".to_string(),
                password_confirm: "password123".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                job_title: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_quick_signup_rejects_short_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db)
            .quick_signup(QuickSignupInput {
                gallery_name: " 갤 ".to_string(),
                phone_number: "010-1234-5678".to_string(),
                verification_token: None,
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password: "password123".to_string(),
                password_confirm: "password123".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                job_title: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_validate_registration_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_gallery("g1")]])
            .append_query_results([[count_row(3)]])
            .append_query_results([[count_row(3)]])
            .into_connection();

        let info = service(db)
            .validate_registration_code("ABCD1234")
            .await
            .unwrap();
        assert!(info.valid);
        assert_eq!(info.gallery.user_count, 3);
        assert_eq!(info.gallery.max_users, 10);
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<gallery::Model>::new()])
            .into_connection();

        let result = service(db)
            .register(RegisterInput {
                registration_code: "NOPE0000".to_string(),
                username: "staff".to_string(),
                email: "staff@example.com".to_string(),
                password: "password123".to_string(),
                password_confirm: "password123".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                phone: None,
                job_title: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db);
        let pair = svc.tokens().issue_pair("u1", "staff").unwrap();

        let result = svc.refresh(&pair.access).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_logout_without_open_session() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<login_history::Model>::new()])
            .into_connection();

        assert!(!service(db).logout("u1").await.unwrap());
    }

    fn pending_code(code: &str, attempts: i32, expires_in_minutes: i64) -> phone_verification::Model {
        let now = Utc::now();
        phone_verification::Model {
            id: "pv1".to_string(),
            phone_number: "01012345678".to_string(),
            code: code.to_string(),
            created_at: now.into(),
            expires_at: (now + Duration::minutes(expires_in_minutes)).into(),
            verified: false,
            verified_at: None,
            attempts,
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        sent: std::sync::Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
    impl SmsGateway for RecordingGateway {
        async fn send(&self, to: &str, body: &str) -> AppResult<GatewayReceipt> {
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(GatewayReceipt {
                message_id: "SM1".to_string(),
                status: "queued".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_send_phone_code_without_sender_echoes_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(0)]])
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([[pending_code("482913", 0, 5)]])
            .into_connection();

        let sent = service(db).send_phone_code("010-1234-5678").await.unwrap();
        assert_eq!(sent.phone_number, "+821012345678");
        assert_eq!(sent.expires_in, 300);
        let code = sent.dev_code.unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_send_phone_code_through_sender() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(0)]])
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[pending_code("482913", 0, 5)]])
            .into_connection();
        let gateway = Arc::new(RecordingGateway::default());

        let sent = service(db)
            .with_code_sender(gateway.clone())
            .send_phone_code("01012345678")
            .await
            .unwrap();

        assert!(sent.dev_code.is_none());
        let messages = gateway.sent.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "+821012345678");
        assert!(messages[0].1.starts_with("[MAWS] 인증번호: "));
    }

    #[tokio::test]
    async fn test_send_phone_code_rejects_taken_number() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(1)]])
            .into_connection();

        let result = service(db).send_phone_code("010-1234-5678").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_send_phone_code_rejects_landline() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db).send_phone_code("02-123-4567").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_verify_phone_code_accepts_match() {
        let mut verified = pending_code("482913", 1, 5);
        verified.verified = true;
        verified.verified_at = Some(Utc::now().into());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[pending_code("482913", 0, 5)]])
            .append_query_results([[verified]])
            .into_connection();

        let result = service(db)
            .verify_phone_code("010-1234-5678", " 482913 ")
            .await
            .unwrap();
        assert!(result.verified);
    }

    #[tokio::test]
    async fn test_verify_phone_code_counts_down_attempts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[pending_code("482913", 1, 5)]])
            .append_query_results([[pending_code("482913", 2, 5)]])
            .into_connection();

        let result = service(db).verify_phone_code("01012345678", "000000").await;
        match result {
            Err(AppError::Validation(message)) => assert!(message.contains("3회 남음")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_phone_code_rejects_expired() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[pending_code("482913", 0, -1)]])
            .append_query_results([[pending_code("482913", 1, -1)]])
            .into_connection();

        let result = service(db).verify_phone_code("01012345678", "482913").await;
        match result {
            Err(AppError::Validation(message)) => assert!(message.contains("만료")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_phone_code_locked_after_five_attempts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[pending_code("482913", 5, 5)]])
            .append_query_results([[pending_code("482913", 6, 5)]])
            .into_connection();

        let result = service(db).verify_phone_code("01012345678", "482913").await;
        match result {
            Err(AppError::Validation(message)) => assert!(message.contains("초과")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_phone_code_without_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<phone_verification::Model>::new()])
            .into_connection();

        let result = service(db).verify_phone_code("01012345678", "482913").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_quick_signup_requires_confirmed_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(0)]])
            .append_query_results([[count_row(0)]])
            .append_query_results([Vec::<phone_verification::Model>::new()])
            .into_connection();
        let mut config = test_config();
        config.require_phone_verification = true;

        let result = service_with(Arc::new(db), &config)
            .quick_signup(QuickSignupInput {
                gallery_name: "새 갤러리".to_string(),
                phone_number: "010-1234-5678".to_string(),
                verification_token: None,
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password: "password123".to_string(),
                password_confirm: "password123".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                job_title: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_force_logout_closes_session() {
        let session = login_history::Model {
            id: "h1".to_string(),
            user_id: "u1".to_string(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: String::new(),
            login_time: (Utc::now() - Duration::minutes(10)).into(),
            logout_time: None,
            session_duration_secs: None,
            device_type: "desktop".to_string(),
            browser: "Chrome".to_string(),
            os: "Windows".to_string(),
            country: None,
            city: None,
        };
        let mut closed = session.clone();
        closed.logout_time = Some(Utc::now().into());
        closed.session_duration_secs = Some(600);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[session]])
            .append_query_results([[closed]])
            .into_connection();

        service(db).force_logout("u1", "h1").await.unwrap();
    }

    #[tokio::test]
    async fn test_force_logout_unknown_session() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<login_history::Model>::new()])
            .into_connection();

        let result = service(db).force_logout("u1", "h9").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db).force_logout("u1", " ").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}

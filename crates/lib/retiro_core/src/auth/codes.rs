//! One-time verification codes.
//!
//! A code is issued for a `(target, purpose)` pair, lives for a fixed time and
//! can be consumed at most once. Only the most recently issued live code for a
//! pair is ever accepted; older ones are dead weight until swept.

use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::AuthError;
use crate::config::AuthConfig;
use crate::delivery::Mailer;
use crate::models::auth::{CodePurpose, Target, VerificationCode};

/// Subject line for code messages.
const CODE_SUBJECT: &str = "Retirement Planner verification code";

/// A freshly issued code.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub id: i64,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    /// Whether the delivery collaborator accepted the message. Not a guarantee
    /// the message arrived.
    pub delivered: bool,
}

/// Draw a code uniformly from `0..10^digits`, zero-padded to `digits`.
pub fn generate_code(digits: u32) -> String {
    let upper = 10u64.pow(digits);
    let n = rng().random_range(0..upper);
    format!("{n:0width$}", width = digits as usize)
}

/// Render the message body for a code.
pub fn render_message(code: &str, config: &AuthConfig) -> String {
    format!(
        "Your verification code is {code}. It is valid for {} minutes. Do not share it with anyone.",
        config.code_ttl.num_minutes()
    )
}

/// Persist a code for `(target, purpose)` issued at `issued_at`.
pub async fn store_code(
    pool: &SqlitePool,
    target: &Target,
    purpose: CodePurpose,
    value: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<i64, AuthError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO verification_codes (target, purpose, value, issued_at, expires_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
    )
    .bind(target.as_str())
    .bind(purpose.as_str())
    .bind(value)
    .bind(issued_at.timestamp_millis())
    .bind(expires_at.timestamp_millis())
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Issue a code: generate, persist, then hand it to the mailer.
///
/// Persistence happens first so a slow or failing transport can never leave a
/// delivered code that does not validate. Delivery failures are logged and
/// reported through [`IssuedCode::delivered`], never as an error.
pub async fn issue_code(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    config: &AuthConfig,
    target: &Target,
    purpose: CodePurpose,
    issued_at: DateTime<Utc>,
) -> Result<IssuedCode, AuthError> {
    let value = generate_code(config.code_digits);
    let expires_at = issued_at + config.code_ttl;
    let id = store_code(pool, target, purpose, &value, issued_at, expires_at).await?;
    info!(code_id = id, purpose = purpose.as_str(), "verification code issued");

    let body = render_message(&value, config);
    let delivered = match mailer.send(target, CODE_SUBJECT, &body).await {
        Ok(()) => true,
        Err(e) => {
            warn!(code_id = id, mailer = mailer.name(), error = %e, "verification code delivery failed");
            false
        }
    };

    Ok(IssuedCode {
        id,
        value,
        expires_at,
        delivered,
    })
}

type CodeRow = (i64, String, String, String, i64, i64, bool);

fn code_from_row(row: CodeRow) -> Result<VerificationCode, AuthError> {
    let (id, target, purpose, value, issued_at, expires_at, consumed) = row;
    Ok(VerificationCode {
        id,
        target,
        purpose: purpose.parse()?,
        value,
        issued_at: from_millis(issued_at)?,
        expires_at: from_millis(expires_at)?,
        consumed,
    })
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AuthError::Internal(format!("timestamp out of range: {ms}")))
}

/// Most recently issued code for `(target, purpose)` that is still live at `now`.
pub async fn latest_live_code(
    pool: &SqlitePool,
    target: &Target,
    purpose: CodePurpose,
    now: DateTime<Utc>,
) -> Result<Option<VerificationCode>, AuthError> {
    let row = sqlx::query_as::<_, CodeRow>(
        "SELECT id, target, purpose, value, issued_at, expires_at, consumed \
         FROM verification_codes \
         WHERE target = ?1 AND purpose = ?2 AND consumed = 0 AND expires_at > ?3 \
         ORDER BY issued_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(target.as_str())
    .bind(purpose.as_str())
    .bind(now.timestamp_millis())
    .fetch_optional(pool)
    .await?;
    row.map(code_from_row).transpose()
}

/// Consume `presented` for `(target, purpose)` if it is the latest live code.
///
/// Returns the consumed code's ID, or `None` for a wrong, expired, used or
/// cross-purpose value. The final `UPDATE` only succeeds while the row is
/// still unconsumed, so concurrent callers presenting the same code get
/// exactly one `Some`.
pub async fn try_consume(
    pool: &SqlitePool,
    target: &Target,
    purpose: CodePurpose,
    presented: &str,
    now: DateTime<Utc>,
) -> Result<Option<i64>, AuthError> {
    let Some(code) = latest_live_code(pool, target, purpose, now).await? else {
        return Ok(None);
    };
    if code.value != presented.trim() {
        return Ok(None);
    }

    let result = sqlx::query(
        "UPDATE verification_codes SET consumed = 1 \
         WHERE id = ?1 AND consumed = 0 AND expires_at > ?2",
    )
    .bind(code.id)
    .bind(now.timestamp_millis())
    .execute(pool)
    .await?;

    if result.rows_affected() == 1 {
        Ok(Some(code.id))
    } else {
        Ok(None)
    }
}

/// Delete codes that can no longer validate. Returns the number removed.
pub async fn purge_expired_codes(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, AuthError> {
    let result =
        sqlx::query("DELETE FROM verification_codes WHERE consumed = 1 OR expires_at <= ?1")
            .bind(now.timestamp_millis())
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

//! Account registry queries.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::AuthError;
use super::codes::from_millis;
use crate::models::auth::{Account, AccountWithSecret, NewAccount, Profile, ProfileUpdate, Target};

const ACCOUNT_COLUMNS: &str = "id, username, email, phone, password_hash, role, verified, \
     gender, birth_date, job_type, location_code, salary, account_balance, \
     contribution_years, contribution_index, created_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: Option<String>,
    phone: Option<String>,
    password_hash: String,
    role: String,
    verified: bool,
    gender: i64,
    birth_date: Option<String>,
    job_type: i64,
    location_code: String,
    salary: f64,
    account_balance: f64,
    contribution_years: i64,
    contribution_index: f64,
    created_at: i64,
}

impl AccountRow {
    fn into_account(self) -> Result<AccountWithSecret, AuthError> {
        Ok(AccountWithSecret {
            account: Account {
                id: self.id,
                username: self.username,
                email: self.email,
                phone: self.phone,
                role: self.role.parse()?,
                verified: self.verified,
                profile: Profile {
                    gender: self.gender,
                    birth_date: self.birth_date,
                    job_type: self.job_type,
                    location_code: self.location_code,
                    salary: self.salary,
                    account_balance: self.account_balance,
                    contribution_years: self.contribution_years,
                    contribution_index: self.contribution_index,
                },
                created_at: from_millis(self.created_at)?,
            },
            password_hash: self.password_hash,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Create an account. Duplicate username, email or phone yields `Conflict`.
pub async fn create_account(
    pool: &SqlitePool,
    new: &NewAccount<'_>,
    now: DateTime<Utc>,
) -> Result<Account, AuthError> {
    let now_ms = now.timestamp_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO accounts \
         (username, email, phone, password_hash, role, verified, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) RETURNING id",
    )
    .bind(new.username)
    .bind(new.target.and_then(Target::email))
    .bind(new.target.and_then(Target::phone))
    .bind(new.password_hash)
    .bind(new.role.as_str())
    .bind(new.verified)
    .bind(now_ms)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AuthError::Conflict
        } else {
            AuthError::Db(e)
        }
    })?;

    get_account(pool, id).await?.ok_or(AuthError::NotFound)
}

/// Find an account whose username, email or phone matches `identifier`.
///
/// The username is compared verbatim. Email and phone are compared in the
/// normalised form they were stored in, so `Alice@X.com` finds `alice@x.com`.
/// Uniqueness constraints make at most one match expected; if several rows
/// match anyway, the oldest wins.
pub async fn find_by_identifier(
    pool: &SqlitePool,
    identifier: &str,
) -> Result<Option<AccountWithSecret>, AuthError> {
    let contact = match Target::parse(identifier) {
        Ok(target) => target.as_str().to_string(),
        Err(_) => identifier.to_string(),
    };
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts \
         WHERE username = ?1 OR email = ?2 OR phone = ?2 \
         ORDER BY id LIMIT 1"
    );
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(identifier)
        .bind(contact)
        .fetch_optional(pool)
        .await?;
    row.map(AccountRow::into_account).transpose()
}

/// Find the account owning the e-mail address or phone number `target`.
pub async fn find_by_target(
    pool: &SqlitePool,
    target: &Target,
) -> Result<Option<Account>, AuthError> {
    let column = match target {
        Target::Email(_) => "email",
        Target::Phone(_) => "phone",
    };
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = ?1");
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(target.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(AccountRow::into_account).transpose()?.map(|a| a.account))
}

/// Fetch an account by ID.
pub async fn get_account(pool: &SqlitePool, id: i64) -> Result<Option<Account>, AuthError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(AccountRow::into_account).transpose()?.map(|a| a.account))
}

/// List all accounts ordered by ID.
pub async fn list_accounts(pool: &SqlitePool) -> Result<Vec<Account>, AuthError> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id");
    let rows = sqlx::query_as::<_, AccountRow>(&sql).fetch_all(pool).await?;
    rows.into_iter()
        .map(|r| r.into_account().map(|a| a.account))
        .collect()
}

/// Replace an account's password hash. Returns whether the account exists.
pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, AuthError> {
    let result =
        sqlx::query("UPDATE accounts SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(now.timestamp_millis())
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() == 1)
}

/// Apply a partial profile update, returning the updated account.
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    update: &ProfileUpdate,
    now: DateTime<Utc>,
) -> Result<Option<Account>, AuthError> {
    let result = sqlx::query(
        "UPDATE accounts SET \
           gender = COALESCE(?1, gender), \
           birth_date = COALESCE(?2, birth_date), \
           job_type = COALESCE(?3, job_type), \
           location_code = COALESCE(?4, location_code), \
           salary = COALESCE(?5, salary), \
           account_balance = COALESCE(?6, account_balance), \
           contribution_years = COALESCE(?7, contribution_years), \
           contribution_index = COALESCE(?8, contribution_index), \
           updated_at = ?9 \
         WHERE id = ?10",
    )
    .bind(update.gender)
    .bind(update.birth_date.as_deref())
    .bind(update.job_type)
    .bind(update.location_code.as_deref())
    .bind(update.salary)
    .bind(update.account_balance)
    .bind(update.contribution_years)
    .bind(update.contribution_index)
    .bind(now.timestamp_millis())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_account(pool, id).await
}

/// Delete an account. Returns whether a row was removed.
///
/// Outstanding session tokens are not touched; they expire on their own.
pub async fn delete_account(pool: &SqlitePool, id: i64) -> Result<bool, AuthError> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Check whether any administrator account exists.
pub async fn admin_exists(pool: &SqlitePool) -> Result<bool, AuthError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE role = 'administrator')",
    )
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

//! Retiro API server binary.
//!
//! Reads configuration from flags and environment, prepares the database,
//! seeds an administrator, and serves the HTTP API until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use retiro_api::config::ApiConfig;
use retiro_core::auth::AuthError;
use retiro_core::auth::jwt::resolve_jwt_secret;
use retiro_core::config::{AuthConfig, Mode};
use retiro_core::delivery::{BrevoMailer, LogMailer, Mailer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "retiro_api_server", about = "Retiro API server")]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// SQLite connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://retiro.db")]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Deployment mode: `development` or `production`.
    #[arg(long, env = "APP_MODE", default_value = "development")]
    mode: String,

    /// Session signing key. Required in production.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// bcrypt cost factor for new password hashes.
    #[arg(long, env = "BCRYPT_COST", default_value_t = retiro_core::config::DEFAULT_BCRYPT_COST)]
    bcrypt_cost: u32,

    /// Number of digits in one-time codes.
    #[arg(long, env = "CODE_DIGITS", default_value_t = retiro_core::config::DEFAULT_CODE_DIGITS)]
    code_digits: u32,

    /// One-time code lifetime in seconds.
    #[arg(long, env = "CODE_TTL_SECS", default_value_t = retiro_core::config::DEFAULT_CODE_TTL_SECS)]
    code_ttl_secs: i64,

    /// Session token lifetime in seconds.
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = retiro_core::config::DEFAULT_SESSION_TTL_SECS)]
    session_ttl_secs: i64,

    /// Accept registrations without a code. Defaults to on in development only.
    #[arg(long, env = "ALLOW_UNVERIFIED_SIGNUP")]
    allow_unverified_signup: Option<bool>,

    /// Username of the seeded administrator.
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    admin_username: String,

    /// E-mail of the seeded administrator.
    #[arg(long, env = "ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Password of the seeded administrator. Without it, production skips seeding.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Brevo API key for e-mail delivery. Without it codes are only logged.
    #[arg(long, env = "BREVO_API_KEY", hide_env_values = true)]
    brevo_api_key: Option<String>,

    /// Sender address for Brevo e-mail.
    #[arg(long, env = "BREVO_SENDER_EMAIL")]
    brevo_sender_email: Option<String>,

    /// Sender display name for Brevo e-mail.
    #[arg(long, env = "BREVO_SENDER_NAME")]
    brevo_sender_name: Option<String>,

    /// Interval between sweeps of expired and consumed codes, in seconds.
    #[arg(long, env = "CODE_SWEEP_SECS", default_value_t = 600)]
    code_sweep_secs: u64,
}

impl Args {
    fn auth_config(&self, mode: Mode) -> Result<AuthConfig, Box<dyn std::error::Error>> {
        let secret = resolve_jwt_secret(self.jwt_secret.as_deref(), mode)?;
        let mut config = AuthConfig::new(secret, mode);
        config.bcrypt_cost = self.bcrypt_cost;
        config.code_digits = self.code_digits;
        config.code_ttl = chrono::Duration::seconds(self.code_ttl_secs);
        config.session_ttl = chrono::Duration::seconds(self.session_ttl_secs);
        if let Some(allow) = self.allow_unverified_signup {
            config.allow_unverified_signup = allow;
        }
        config.validate()?;
        Ok(config)
    }

    fn mailer(&self, mode: Mode) -> Arc<dyn Mailer> {
        match (&self.brevo_api_key, &self.brevo_sender_email) {
            (Some(key), Some(sender)) if !key.is_empty() && !sender.is_empty() => {
                info!(sender = %sender, "delivering codes via Brevo");
                Arc::new(BrevoMailer::new(
                    key.clone(),
                    sender.clone(),
                    self.brevo_sender_name.clone(),
                ))
            }
            _ => {
                if !mode.is_development() {
                    warn!("no e-mail transport configured; codes will only be logged");
                }
                Arc::new(LogMailer)
            }
        }
    }

    /// Administrator credentials to seed, if any.
    ///
    /// Development falls back to `admin@retiro.local` / `admin123`. Production
    /// seeds only when a password is given, and then also needs an e-mail.
    fn admin_seed(&self, mode: Mode) -> Result<Option<AdminSeed>, AuthError> {
        let email = non_empty(&self.admin_email);
        let password = non_empty(&self.admin_password);
        let (contact, password) = match (mode, email, password) {
            (Mode::Production, _, None) => return Ok(None),
            (Mode::Production, None, Some(_)) => {
                return Err(AuthError::Validation(
                    "ADMIN_EMAIL is required when ADMIN_PASSWORD is set".into(),
                ));
            }
            (Mode::Production, Some(email), Some(password)) => (email, password),
            (Mode::Development, email, password) => (
                email.unwrap_or("admin@retiro.local"),
                password.unwrap_or("admin123"),
            ),
        };
        Ok(Some(AdminSeed {
            username: self.admin_username.clone(),
            contact: contact.to_string(),
            password: password.to_string(),
        }))
    }
}

/// Administrator account created at startup when none exists.
#[derive(Debug)]
struct AdminSeed {
    username: String,
    contact: String,
    password: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,retiro_api=debug,retiro_core=debug")
                }),
        )
        .init();

    let args = Args::parse();
    let mode: Mode = args.mode.parse()?;
    let auth = args.auth_config(mode)?;

    info!(%mode, port = args.port, database_url = %args.database_url, "starting retiro_api_server");

    let pool = retiro_core::db::connect(&args.database_url, args.max_connections).await?;

    info!("running database migrations");
    retiro_api::migrate(&pool).await?;

    match args.admin_seed(mode)? {
        Some(seed) => {
            retiro_api::services::accounts::ensure_admin(
                &pool,
                &auth,
                &seed.username,
                &seed.contact,
                &seed.password,
            )
            .await?;
        }
        None => info!("ADMIN_PASSWORD not set; skipping administrator seeding"),
    }

    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        database_url: args.database_url.clone(),
        auth,
    };
    let state = retiro_api::AppState::new(pool.clone(), config.clone(), args.mailer(mode));
    let app = retiro_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    // Periodic sweep of dead codes; expiry is enforced at validation time
    // regardless, so a missed sweep is harmless.
    let shutdown = CancellationToken::new();
    let sweep_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        let pool = pool.clone();
        let period = Duration::from_secs(args.code_sweep_secs.max(1));
        async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        match retiro_core::auth::codes::purge_expired_codes(&pool, chrono::Utc::now()).await {
                            Ok(0) => {}
                            Ok(n) => info!(removed = n, "swept dead verification codes"),
                            Err(e) => warn!(error = %e, "verification code sweep failed"),
                        }
                    }
                }
            }
        }
    });

    info!(addr = %local_addr, "REST API listening");

    let api_result = axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown requested");
                shutdown.cancel();
            }
        })
        .await;

    shutdown.cancel();
    let _ = sweep_handle.await;
    pool.close().await;

    api_result?;

    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use edge_gatekeeper::config::{load_config, load_from_env, GatekeeperConfig};
use edge_gatekeeper::cookies::CookieService;
use edge_gatekeeper::security::{CsrfService, ThreatScreen};
use edge_gatekeeper::session::{Role, SessionIdentity, SessionService};

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Management CLI for the Edge Gatekeeper", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key
    #[arg(short, long, env = "GATEKEEPER_ADMIN_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gatekeeper status
    Status,
    /// Show rate limiter state, optionally for one identifier
    RateLimits {
        #[arg(long)]
        identifier: Option<String>,
    },
    /// Print the active redirect/alias manifest
    Manifest,
    /// Mint or decode session tokens offline
    Token {
        /// Config file supplying the session secret (defaults to environment)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Sign a session token
    Issue {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        /// SUPER_ADMIN, ADMIN, CLIENT or EMPLOYEE
        #[arg(long)]
        role: Role,
        #[arg(long)]
        tenant: Option<String>,
        /// Lifetime in seconds (defaults to the configured session TTL)
        #[arg(long)]
        ttl: Option<i64>,
    },
    /// Verify a token signature and print its claims
    Inspect { token: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (endpoint, identifier) = match cli.command {
        Commands::Token { config, action } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => load_from_env()?,
            };
            return run_token(&config, action);
        }
        Commands::Status => ("status", None),
        Commands::RateLimits { identifier } => ("rate-limits", identifier),
        Commands::Manifest => ("manifest", None),
    };

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let mut request = client.get(format!("{}/admin/{endpoint}", cli.url));
    if let Some(identifier) = identifier {
        request = request.query(&[("identifier", identifier)]);
    }

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

fn run_token(config: &GatekeeperConfig, action: TokenAction) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = SessionService::new(
        config,
        CookieService::new(config.environment.production),
        Arc::new(CsrfService::new(&config.secrets.csrf_secret, config.session.csrf_ttl_secs)),
        Arc::new(ThreatScreen::new(&config.security)),
    );

    match action {
        TokenAction::Issue {
            user_id,
            email,
            role,
            tenant,
            ttl,
        } => {
            let identity = SessionIdentity {
                user_id,
                email,
                role,
                tenant_id: tenant,
            };
            let token = sessions.create_session_with_ttl(identity, ttl.unwrap_or(sessions.ttl_secs()))?;
            println!("{token}");
        }
        TokenAction::Inspect { token } => {
            let session = sessions.verify_signature(&token)?;
            let now = Utc::now().timestamp();
            println!("{}", serde_json::to_string_pretty(&session)?);
            if let (Some(iat), Some(exp)) = (
                Utc.timestamp_opt(session.iat, 0).single(),
                Utc.timestamp_opt(session.exp, 0).single(),
            ) {
                println!("issued:  {iat}");
                println!("expires: {exp}");
            }
            if session.is_expired_at(now) {
                println!("status:  EXPIRED");
            } else {
                println!("status:  valid");
            }
        }
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

//! Runtime configuration, layered from CLI flags over environment
//! variables (a `.env` file is loaded before parsing).

use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(name = "revue-server", about = "Revue catalog API server")]
pub struct Config {
    /// Address the HTTP listener binds to
    #[arg(long, env = "REVUE_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: SocketAddr,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Secret keying both the JWT signatures and the confirmation-code HMAC
    #[arg(long, env = "REVUE_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Access-token lifetime in seconds
    #[arg(long, env = "REVUE_TOKEN_TTL_SECS", default_value_t = 86_400)]
    pub token_ttl_secs: i64,

    /// Upper bound on pooled database connections
    #[arg(long, env = "REVUE_MAX_DB_CONNECTIONS", default_value_t = 10)]
    pub max_db_connections: u32,

    /// Sender address stamped on confirmation-code emails
    #[arg(long, env = "REVUE_MAIL_FROM", default_value = "no-reply@revue.local")]
    pub mail_from: String,
}

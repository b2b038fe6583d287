use std::{path::PathBuf, time::Duration};

pub use clap::Parser;
use url::Url;
use yamdb_auth::SmtpConfig;
use yamdb_types::config::BackendConfig;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "YAMDB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "YAMDB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "YAMDB_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of server, as visible to users (used in links sent by mail)"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "YAMDB_POOL_SIZE",
        default_value_t = 50,
        help = "Maximum number of database connections"
    )]
    pub pool_size: u32,

    #[arg(
        long,
        env = "YAMDB_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Access token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "YAMDB_CODE_VALIDITY",
        default_value = "1 day",
        help = "Validity of confirmation code sent by mail, human friendly format",
        value_parser = humantime::parse_duration
    )]
    pub code_validity: Duration,

    #[arg(
        long,
        env = "YAMDB_DEFAULT_PAGE_SIZE",
        default_value = "100",
        help = "Default page size"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "YAMDB_CORS", help = "Enable permissive CORS")]
    pub cors: bool,

    #[arg(
        long,
        env = "YAMDB_SMTP_HOST",
        help = "SMTP relay host, if not set mails are stored into mail directory"
    )]
    pub smtp_host: Option<String>,

    #[arg(long, env = "YAMDB_SMTP_PORT", default_value_t = 587, help = "SMTP port")]
    pub smtp_port: u16,

    #[arg(long, env = "YAMDB_SMTP_USER", help = "SMTP user name")]
    pub smtp_user: Option<String>,

    #[arg(long, env = "YAMDB_SMTP_PASSWORD", help = "SMTP password")]
    pub smtp_password: Option<String>,

    #[arg(
        long,
        env = "YAMDB_MAIL_FROM",
        default_value = "yamdb@localhost",
        help = "Sender address of outgoing mails"
    )]
    pub mail_from: String,

    #[arg(
        long,
        env = "YAMDB_MAIL_DIR",
        help = "Directory for stored mails when SMTP is not configured, default is [data-dir]/mail"
    )]
    mail_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.backend.data_dir()
    }

    pub fn database_url(&self) -> String {
        self.backend.database_url()
    }

    pub fn mail_dir(&self) -> PathBuf {
        self.mail_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("mail"))
    }

    pub fn smtp(&self) -> Option<SmtpConfig> {
        self.smtp_host.as_ref().map(|host| SmtpConfig {
            host: host.clone(),
            port: self.smtp_port,
            from_address: self.mail_from.clone(),
            user: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
        })
    }
}

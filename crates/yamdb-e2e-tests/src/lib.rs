pub mod rest;

use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow, bail};
use rand::Rng as _;
use reqwest::{
    Client, Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::json;
use tempfile::TempDir;
use tracing::debug;
use yamdb_dal::user::{CreateUser, UserRepository};
use yamdb_server::config::{Parser, ServerConfig};
use yamdb_types::claim::Role;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "yamdb-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--code-validity",
        "10m",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Accounts present in every test database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestUser {
    Admin,
    Moderator,
    User,
    OtherUser,
    Anonymous,
}

impl TestUser {
    pub const ACCOUNTS: [TestUser; 4] = [
        TestUser::Admin,
        TestUser::Moderator,
        TestUser::User,
        TestUser::OtherUser,
    ];

    pub fn username(&self) -> &'static str {
        match self {
            TestUser::Admin => "admin",
            TestUser::Moderator => "moderator",
            TestUser::User => "usak",
            TestUser::OtherUser => "pepa",
            TestUser::Anonymous => "",
        }
    }

    pub fn email(&self) -> String {
        format!("{}@example.com", self.username())
    }

    fn role(&self) -> Role {
        match self {
            TestUser::Admin => Role::Admin,
            TestUser::Moderator => Role::Moderator,
            _ => Role::User,
        }
    }
}

/// Creates test configuration and database with [`TestUser::ACCOUNTS`]
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    let (args, guard) = test_config(test_name, &base_dir)?;
    let pool = yamdb_dal::new_pool(&args.database_url()).await?;
    yamdb_dal::migrate(&pool).await?;
    let users = UserRepository::new(pool.clone());
    for account in TestUser::ACCOUNTS {
        let mut new_user = CreateUser::signup(account.username().to_string(), account.email().parse()?);
        new_user.role = account.role();
        users.create(new_user).await?;
    }
    pool.close().await;
    Ok((args, guard))
}

pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let health_url = args.base_url.join("health")?;
    tokio::spawn(async move {
        if let Err(e) = yamdb_server::run::run(args).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = Client::new();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(response) = client.get(health_url.clone()).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
    }
    Err(anyhow!("Server did not start"))
}

/// Waits for next mail sent to the address and extracts confirmation code from it
pub async fn wait_for_code(mail_dir: &Path, email: &str, seen: usize) -> Result<String> {
    for _ in 0..50 {
        let mails = yamdb_auth::mail::read_stored_mails(mail_dir).await?;
        let mut mine = mails.into_iter().filter(|m| m.to == email);
        if let Some(mail) = mine.nth(seen) {
            return extract_code(&mail.body);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    bail!("No mail for {email}")
}

pub async fn count_mails(mail_dir: &Path, email: &str) -> Result<usize> {
    let mails = yamdb_auth::mail::read_stored_mails(mail_dir).await?;
    Ok(mails.iter().filter(|m| m.to == email).count())
}

pub fn extract_code(body: &str) -> Result<String> {
    body.lines()
        .map(str::trim)
        .find(|line| {
            line.split_once('-').is_some_and(|(ts, mac)| {
                !ts.is_empty()
                    && ts.chars().all(|c| c.is_ascii_digit())
                    && !mac.is_empty()
                    && mac.chars().all(|c| c.is_ascii_hexdigit())
            })
        })
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No code in mail body"))
}

/// Runs signup and code redemption, returns access token
pub async fn obtain_token(
    client: &Client,
    args: &ServerConfig,
    username: &str,
    email: &str,
) -> Result<String> {
    let seen = count_mails(&args.mail_dir(), email).await?;
    let api = api_url(&args.base_url)?;
    let response = client
        .post(api.join("auth/signup")?)
        .json(&json!({"username": username, "email": email}))
        .send()
        .await?;
    if !response.status().is_success() {
        bail!("Signup failed: {}", response.text().await?);
    }
    let code = wait_for_code(&args.mail_dir(), email, seen).await?;
    debug!("Got code {code} for {username}");

    let response = client
        .post(api.join("auth/token")?)
        .json(&json!({"username": username, "confirmation_code": code}))
        .send()
        .await?;
    if !response.status().is_success() {
        bail!("Token request failed: {}", response.text().await?);
    }
    let token: yamdb_app::auth::signup::TokenResponse = response.json().await?;
    Ok(token.token)
}

pub fn api_url(base_url: &Url) -> Result<Url> {
    Ok(base_url.join("api/v1/")?)
}

pub fn client_with_token(token: Option<&str>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }
    Ok(Client::builder().default_headers(headers).build()?)
}

/// Starts server and returns client authenticated as given user and API base URL
pub async fn launch_env(args: ServerConfig, user: TestUser) -> Result<(Client, Url)> {
    let api = api_url(&args.base_url)?;
    let config = args.clone();
    spawn_server(args).await?;
    let client = login_as(&config, user).await?;
    Ok((client, api))
}

pub async fn login_as(args: &ServerConfig, user: TestUser) -> Result<Client> {
    if user == TestUser::Anonymous {
        return client_with_token(None);
    }
    let token = obtain_token(&Client::new(), args, user.username(), &user.email()).await?;
    client_with_token(Some(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code() {
        let body = "Hello usak,\n\nyour confirmation code is:\n\n1700000000-0a1b2c\n\nbye";
        assert_eq!(extract_code(body).unwrap(), "1700000000-0a1b2c");
        assert!(extract_code("no code here - really").is_err());
    }
}

use anyhow::{bail, Context as _};
use clap::Parser;
use garde::Validate as _;
use tracing::info;
use yamdb_dal::user::{CreateUser, UserRepository};
use yamdb_types::{
    claim::Role,
    config::BackendConfig,
    general::{is_reserved_username, ValidEmail},
};

use crate::commands::Executor;

/// Creates user directly in the database, used to bootstrap the first admin
#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "User name")]
    pub username: String,
    #[arg(short, long, help = "User email")]
    pub email: ValidEmail,
    #[arg(short, long, default_value_t = Role::User, help = "Role of the user: user, moderator or admin")]
    pub role: Role,
    #[arg(long, help = "Superuser has admin rights regardless of role")]
    pub superuser: bool,
}

impl CreateUserCmd {
    fn payload(&self) -> anyhow::Result<CreateUser> {
        if is_reserved_username(&self.username) {
            bail!("Username {} is reserved", self.username);
        }
        let mut new_user = CreateUser::signup(self.username.clone(), self.email.clone());
        new_user.role = self.role;
        new_user.is_superuser = self.superuser;
        new_user.validate().context("Invalid user")?;
        Ok(new_user)
    }
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let new_user = self.payload()?;
        let pool = yamdb_dal::new_pool(&self.backend.database_url()).await?;
        yamdb_dal::migrate(&pool).await?;
        let repository = UserRepository::new(pool);

        let conflicts = repository
            .conflicts(Some(&new_user.username), Some(new_user.email.as_str()), None)
            .await?;
        if conflicts.any() {
            bail!("User with the same username or email already exists");
        }
        let user = repository.create(new_user).await?;
        info!("Created user {} with id {}", user.username, user.id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CreateUserCmd {
        let mut full = vec!["create-user", "--data-dir", "/tmp/yamdb-cli-test"];
        full.extend_from_slice(args);
        CreateUserCmd::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_payload() {
        let cmd = parse(&["-u", "admin", "-e", "admin@example.com", "-r", "admin"]);
        let payload = cmd.payload().unwrap();
        assert_eq!(payload.role, Role::Admin);
        assert!(!payload.is_superuser);

        let cmd = parse(&["-u", "root", "-e", "root@example.com", "--superuser"]);
        let payload = cmd.payload().unwrap();
        assert_eq!(payload.role, Role::User);
        assert!(payload.is_superuser);
    }

    #[test]
    fn test_reserved_username() {
        let cmd = parse(&["-u", "me", "-e", "me@example.com"]);
        assert!(cmd.payload().is_err());
    }

    #[test]
    fn test_invalid_role() {
        let res = CreateUserCmd::try_parse_from([
            "create-user",
            "-u",
            "usak",
            "-e",
            "usak@example.com",
            "-r",
            "boss",
        ]);
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_create_in_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_string_lossy().to_string();
        let cmd = CreateUserCmd::try_parse_from([
            "create-user",
            "--data-dir",
            &data_dir,
            "-u",
            "admin",
            "-e",
            "admin@example.com",
            "-r",
            "admin",
        ])
        .unwrap();
        cmd.run().await.unwrap();

        let again = CreateUserCmd::try_parse_from([
            "create-user",
            "--data-dir",
            &data_dir,
            "-u",
            "Admin",
            "-e",
            "other@example.com",
        ])
        .unwrap();
        assert!(again.run().await.is_err());
    }
}

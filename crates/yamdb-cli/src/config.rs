use clap::{Parser, Subcommand};

use crate::commands::create_user::CreateUserCmd;

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for yamdb - administrative tasks working directly with the database."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    CreateUser(CreateUserCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
        }
    }
}

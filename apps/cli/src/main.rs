use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, AlwaysConfirm, DeleteConfirmation, DirectoryEvent, Outcome, UserDirectory,
};
use shared::domain::UserId;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "users", about = "Manage users through the users API")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the API and redraw the list until interrupted.
    Watch,
    List,
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        phone: String,
    },
    /// Edit a user; fields left out keep their current value.
    Update {
        id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

struct PromptConfirmation;

#[async_trait]
impl DeleteConfirmation for PromptConfirmation {
    async fn confirm_delete(&self, id: &UserId) -> bool {
        let mut stdout = tokio::io::stdout();
        let prompt = format!("Are you sure you want to delete user {id}? [y/N] ");
        if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        let mut answer = String::new();
        match BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await
        {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                tracing::warn!("failed to read confirmation: {err}");
                false
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
        settings = settings.normalized()?;
    }

    let confirmation: Arc<dyn DeleteConfirmation> = match &cli.command {
        Command::Delete { yes: true, .. } => Arc::new(AlwaysConfirm),
        _ => Arc::new(PromptConfirmation),
    };
    let directory = UserDirectory::new(settings, confirmation)
        .context("failed to set up users directory")?;

    let outcome = match cli.command {
        Command::Watch => return watch(&directory).await,
        Command::List => directory.refresh().await,
        Command::Create { username, phone } => {
            directory.open_create_form();
            directory.edit_draft(|fields| {
                *fields.username = username;
                *fields.phone = phone;
            });
            directory.submit_form().await
        }
        Command::Update {
            id,
            username,
            phone,
        } => {
            refresh_or_bail(&directory).await?;
            let record = directory
                .find_user(&id)
                .ok_or_else(|| anyhow!("no user with id {id}"))?;
            directory.begin_edit(record);
            directory.edit_draft(|fields| {
                if let Some(username) = username {
                    *fields.username = username;
                }
                if let Some(phone) = phone {
                    *fields.phone = phone;
                }
            });
            directory.submit_form().await
        }
        Command::Delete { id, .. } => {
            refresh_or_bail(&directory).await?;
            directory.delete(directory.resolve_id(&id)).await
        }
    };

    println!("{}", render::render(&directory.view()));
    directory.dispose();

    match outcome {
        Outcome::Completed => Ok(()),
        Outcome::Declined => {
            println!("Nothing changed.");
            Ok(())
        }
        Outcome::Failed(failure) => Err(failure.into()),
        Outcome::Disposed => bail!("users directory was torn down before the request finished"),
    }
}

async fn refresh_or_bail(directory: &UserDirectory) -> Result<()> {
    match directory.refresh().await {
        Outcome::Failed(failure) => Err(failure).context("failed to load users"),
        _ => Ok(()),
    }
}

async fn watch(directory: &Arc<UserDirectory>) -> Result<()> {
    let mut events = directory.subscribe();
    directory.start_polling();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                break;
            }
            event = events.recv() => match event {
                Ok(DirectoryEvent::SnapshotReplaced { .. }) => {
                    println!("{}", render::render(&directory.view()));
                }
                Ok(DirectoryEvent::StatusChanged(status)) if status.error.is_some() && !status.loading => {
                    println!("{}", render::render(&directory.view()));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "view events lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    directory.dispose();
    Ok(())
}

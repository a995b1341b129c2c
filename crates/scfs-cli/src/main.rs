use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use scfs_core::{AccessConfig, AccessCoordinator, CoordinatorBuilder, CredentialStore, FileId, FileRecord, OwnerId};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scfs")]
#[command(about = "SecureCloudFS file access (local desktop service first, hosted metadata as fallback)")]
struct Cli {
    /// Account email sent to the local desktop service
    #[arg(long, global = true, env = "SCFS_EMAIL")]
    email: Option<String>,

    /// Account password sent to the local desktop service
    #[arg(long, global = true, env = "SCFS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print records as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files, newest first
    List {
        /// Owner (user id) used when falling back to the metadata store
        #[arg(long, env = "SCFS_OWNER_ID")]
        owner: String,
    },
    /// Search filenames and original paths (metadata store only)
    Search {
        /// Case-insensitive substring
        query: String,
        #[arg(long, env = "SCFS_OWNER_ID")]
        owner: String,
    },
    /// Delete a file by id
    Delete {
        id: String,
    },
    /// Download a file through the local desktop service
    Download {
        id: String,
        /// Name to save the file under (defaults to the id)
        #[arg(long)]
        filename: Option<String>,
        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Check whether the local desktop service is reachable
    Probe,
    /// Check an email/password pair against the local desktop service
    Login,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("scfs=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AccessConfig::from_env().context("invalid configuration")?;
    let credentials = CredentialStore::new();
    let coordinator = CoordinatorBuilder::from_config(&config, credentials.clone())?.build()?;

    run(&coordinator, &credentials, cli).await
}

async fn run(coordinator: &AccessCoordinator, credentials: &CredentialStore, cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    let pair = cli.email.zip(cli.password);

    // login 以外は渡された認証情報をそのまま使う（ローカル API での検証はしない）
    if !matches!(cli.command, Commands::Login) {
        if let Some((email, password)) = &pair {
            credentials.set_credentials(email.as_str(), password.as_str());
        }
    }

    match cli.command {
        Commands::Login => {
            let Some((email, password)) = pair else {
                anyhow::bail!("login needs --email and --password (or SCFS_EMAIL / SCFS_PASSWORD)");
            };
            let user = coordinator.sign_in(&email, &password).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("Signed in as {email}");
            }
        }
        Commands::List { owner } => {
            let files = coordinator.list_files(&OwnerId::new(owner)).await?;
            print_files(&files, json)?;
        }
        Commands::Search { query, owner } => {
            let files = coordinator.search_files(&OwnerId::new(owner), &query).await?;
            print_files(&files, json)?;
        }
        Commands::Delete { id } => {
            let id = FileId::new(id);
            coordinator.delete_file(&id).await?;
            println!("Deleted {id}");
        }
        Commands::Download { id, filename, out } => {
            let requested = filename.unwrap_or_else(|| id.clone());
            let file = coordinator.download_file(&FileId::new(id.as_str()), &requested).await?;
            let path = out.join(local_name(&file.filename, &id));
            tokio::fs::write(&path, &file.bytes)
                .await
                .with_context(|| format!("could not write {}", path.display()))?;
            info!(path = %path.display(), bytes = file.len(), "saved download");
            println!("Saved {} ({} bytes)", path.display(), file.len());
        }
        Commands::Probe => {
            let reachable = coordinator.probe_local_backend().await;
            if json {
                println!("{}", serde_json::json!({ "local_api_available": reachable }));
            } else if reachable {
                println!("Local desktop service is reachable");
            } else {
                println!("Local desktop service is not reachable");
            }
        }
    }
    Ok(())
}

/// Final path component only, so a stored name cannot escape `--out`.
fn local_name<'a>(filename: &'a str, fallback: &'a str) -> &'a str {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(fallback)
}

fn print_files(files: &[FileRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(files)?);
        return Ok(());
    }
    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }
    for file in files {
        println!(
            "ID: {}, Name: {}, Size: {} bytes, Uploaded: {}",
            file.id,
            file.filename,
            file.size_bytes,
            file.uploaded_at.to_rfc3339()
        );
    }
    Ok(())
}

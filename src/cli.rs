//! Command-line interface.
//!
//! Usage:
//!   mailburst config set --host smtp.example.com --username me@example.com --password s3cret
//!   mailburst recipients import list.txt      # replace the list from a text file
//!   mailburst draft set --subject "Hi" --body-file body.txt --attach report.pdf
//!   mailburst test                            # connect and log in, send nothing
//!   mailburst send                            # send the draft to every recipient
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error, or at least one recipient failed
//!   130 - Interrupted twice with Ctrl-C

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::{error, warn};

use crate::config::Settings;
use crate::dispatch::{DispatchEngine, DispatchEvent, DispatchRequest, SendOutcome};
use crate::error::AppResult;
use crate::models::EncryptionMode;
use crate::stores::{DraftStore, RecipientStore, SettingsStore};

#[derive(Debug, Parser)]
#[command(name = "mailburst", about = "Bulk mail dispatch over SMTP", version)]
pub struct Cli {
    /// Directory holding config.json, emails.json and draft.json.
    #[arg(long, global = true, env = "MAILBURST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML configuration file (default: mailburst.toml if present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send the draft (or an inline message) to every stored recipient.
    Send(SendArgs),
    /// Connect and log in with the stored settings, without sending anything.
    Test,
    /// Show or change the SMTP settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the recipient list.
    Recipients {
        #[command(subcommand)]
        action: RecipientsAction,
    },
    /// Show or edit the stored draft.
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Debug, Args)]
struct SendArgs {
    /// Subject line, overriding the stored draft.
    #[arg(long)]
    subject: Option<String>,

    /// Body text, overriding the stored draft.
    #[arg(long)]
    body: Option<String>,

    /// Read the body from a file instead.
    #[arg(long, value_name = "FILE", conflicts_with = "body")]
    body_file: Option<PathBuf>,

    /// Attach a file; repeatable. Replaces the draft's attachments.
    #[arg(long = "attach", value_name = "FILE")]
    attachments: Vec<PathBuf>,

    /// Print events as JSON lines instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the stored SMTP settings with the password masked.
    Show,
    /// Update one or more SMTP settings.
    Set(ConfigSetArgs),
    /// Merge settings from an external JSON file.
    Import { file: PathBuf },
}

#[derive(Debug, Args)]
struct ConfigSetArgs {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Login name, also used as the sender address.
    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Upgrade the connection with STARTTLS.
    #[arg(long, value_name = "BOOL")]
    tls: Option<bool>,

    /// Connect over implicit TLS; wins over --tls when both are enabled.
    #[arg(long, value_name = "BOOL")]
    ssl: Option<bool>,
}

#[derive(Debug, Subcommand)]
enum RecipientsAction {
    /// Print the stored recipients, one per line.
    List,
    /// Add one address.
    Add { address: String },
    /// Remove one address.
    Remove { address: String },
    /// Delete every stored recipient.
    Clear,
    /// Replace the list with addresses parsed from a text file.
    Import { file: PathBuf },
}

#[derive(Debug, Subcommand)]
enum DraftAction {
    /// Print the stored draft.
    Show,
    /// Update subject, body or attachments.
    Set(DraftSetArgs),
    /// Reset the draft to empty.
    Clear,
}

#[derive(Debug, Args)]
struct DraftSetArgs {
    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    body: Option<String>,

    /// Read the body from a file instead.
    #[arg(long, value_name = "FILE", conflicts_with = "body")]
    body_file: Option<PathBuf>,

    /// Attach a file; repeatable. Replaces the stored attachment list.
    #[arg(long = "attach", value_name = "FILE")]
    attachments: Vec<PathBuf>,
}

/// Parses the command line and runs the chosen command, returning the
/// process exit code.
pub async fn run() -> AppResult<i32> {
    let cli = Cli::parse();

    let mut settings = Settings::new(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Command::Send(args) => send(&settings, args).await,
        Command::Test => test(&settings).await,
        Command::Config { action } => configure(&settings, action).await,
        Command::Recipients { action } => recipients(&settings, action).await,
        Command::Draft { action } => draft(&settings, action).await,
    }
}

async fn send(settings: &Settings, args: SendArgs) -> AppResult<i32> {
    let smtp = SettingsStore::new(settings.settings_path()).load().await;
    let recipients = RecipientStore::new(settings.recipients_path()).load().await;
    if recipients.is_empty() {
        eprintln!("No recipients configured");
        return Ok(1);
    }
    let stored = DraftStore::new(settings.draft_path()).load().await;

    let subject = args.subject.unwrap_or(stored.subject);
    let body = match args.body_file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => args.body.unwrap_or(stored.body),
    };
    let attachments = if args.attachments.is_empty() {
        stored.attachments
    } else {
        args.attachments
    };

    let engine = DispatchEngine::new();
    let mut events = engine.start(DispatchRequest {
        settings: smtp.to_transport_settings(),
        recipients,
        subject,
        body,
        attachments,
    })?;

    // First Ctrl-C stops after the current recipient, a second one quits now.
    let canceller = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current recipient; Ctrl-C again to quit now.");
            canceller.request_cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let mut failed = false;
    while let Some(event) = events.recv().await {
        if args.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => error!("Could not encode event as JSON: {}", err),
            }
        } else {
            println!("{event}");
        }
        match &event {
            DispatchEvent::FatalError { .. } => failed = true,
            DispatchEvent::RecipientOutcome {
                outcome: SendOutcome::Failed { .. },
                ..
            } => failed = true,
            _ => {}
        }
    }

    Ok(i32::from(failed))
}

async fn test(settings: &Settings) -> AppResult<i32> {
    let smtp = SettingsStore::new(settings.settings_path()).load().await;
    match DispatchEngine::new()
        .test_connection(&smtp.to_transport_settings())
        .await
    {
        Ok(()) => {
            println!("SMTP connection successful.");
            Ok(0)
        }
        Err(err) => {
            println!("Connection failed: {err}");
            Ok(1)
        }
    }
}

async fn configure(settings: &Settings, action: ConfigAction) -> AppResult<i32> {
    let store = SettingsStore::new(settings.settings_path());
    match action {
        ConfigAction::Show => {
            let config = store.load().await;
            let security = match config.encryption() {
                EncryptionMode::ImplicitTls => "ssl",
                EncryptionMode::StartTls => "starttls",
                EncryptionMode::None => "none",
            };
            println!("host:     {}", config.smtp_host);
            println!("port:     {}", config.smtp_port);
            println!("security: {}", security);
            println!("username: {}", config.username);
            println!("password: {}", mask(&config.password));
        }
        ConfigAction::Set(args) => {
            let mut config = store.load().await;
            if let Some(host) = args.host {
                config.smtp_host = host;
            }
            if let Some(port) = args.port {
                config.smtp_port = port;
            }
            if let Some(username) = args.username {
                config.username = username;
            }
            if let Some(password) = args.password {
                config.password = password;
            }
            if let Some(tls) = args.tls {
                config.use_tls = tls;
            }
            if let Some(ssl) = args.ssl {
                config.use_ssl = ssl;
            }
            store.save(&config).await?;
            println!("Settings saved.");
        }
        ConfigAction::Import { file } => {
            let config = store.import(&file).await?;
            println!("Settings imported for {}", config.username);
        }
    }
    Ok(0)
}

async fn recipients(settings: &Settings, action: RecipientsAction) -> AppResult<i32> {
    let store = RecipientStore::new(settings.recipients_path());
    match action {
        RecipientsAction::List => {
            for address in store.load().await {
                println!("{address}");
            }
        }
        RecipientsAction::Add { address } => {
            if store.add(&address).await? {
                println!("Added {}", address.trim());
            } else {
                println!("{} is already on the list", address.trim());
            }
        }
        RecipientsAction::Remove { address } => {
            if store.remove(&address).await? {
                println!("Removed {}", address.trim());
            } else {
                println!("{} was not on the list", address.trim());
            }
        }
        RecipientsAction::Clear => {
            store.clear().await?;
            println!("Recipient list cleared.");
        }
        RecipientsAction::Import { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let saved = store.import_text(&text).await?;
            println!("Imported {} recipient(s)", saved.len());
        }
    }
    Ok(0)
}

async fn draft(settings: &Settings, action: DraftAction) -> AppResult<i32> {
    let store = DraftStore::new(settings.draft_path());
    match action {
        DraftAction::Show => {
            let draft = store.load().await;
            println!("subject: {}", draft.subject);
            if draft.attachments.is_empty() {
                println!("attachments: (none)");
            } else {
                println!("attachments:");
                for path in &draft.attachments {
                    println!("  {}", path.display());
                }
            }
            println!();
            println!("{}", draft.body);
        }
        DraftAction::Set(args) => {
            let mut draft = store.load().await;
            if let Some(subject) = args.subject {
                draft.subject = subject;
            }
            if let Some(path) = args.body_file {
                draft.body = tokio::fs::read_to_string(path).await?;
            } else if let Some(body) = args.body {
                draft.body = body;
            }
            if !args.attachments.is_empty() {
                draft.attachments = args.attachments;
            }
            let dropped = store.save(&draft).await?;
            for path in &dropped {
                warn!("Dropped missing attachment {}", path.display());
            }
            println!("Draft saved.");
        }
        DraftAction::Clear => {
            store.clear().await?;
            println!("Draft cleared.");
        }
    }
    Ok(0)
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        "********".to_string()
    }
}

//! Account command - linked account management.

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::style;
use tokio_util::sync::CancellationToken;

use bizline_credentials::{CredentialStore, normalize_name};
use bizline_setup::api::AccountEntry;
use bizline_setup::{HttpVerifier, SetupConfig, SetupError, SetupServer};

use super::Context;

/// Arguments for the account command.
#[derive(Args, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Link an account through the browser
    Link {
        /// Print the URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// List linked accounts
    List,

    /// Show an account (the primary one when NAME is omitted)
    Show {
        /// Account name
        name: Option<String>,
    },

    /// Make an account the primary one
    Use {
        /// Account name
        name: String,
    },

    /// Remove a linked account
    Remove {
        /// Account name
        name: String,
    },
}

/// Run the account command.
pub async fn run(args: AccountArgs, ctx: &Context) -> Result<()> {
    let store = ctx.credential_store()?;
    match args.command {
        AccountCommand::Link { no_browser } => cmd_link(store, no_browser, ctx).await,
        AccountCommand::List => cmd_list(&store, ctx).await,
        AccountCommand::Show { name } => cmd_show(&store, name.as_deref(), ctx).await,
        AccountCommand::Use { name } => cmd_use(&store, &name, ctx).await,
        AccountCommand::Remove { name } => cmd_remove(&store, &name, ctx).await,
    }
}

async fn cmd_link(store: CredentialStore, no_browser: bool, ctx: &Context) -> Result<()> {
    let api = ctx.config.api();
    let section = ctx.config.setup();

    let verifier = HttpVerifier::new(api.effective_base_url(), api.timeout())
        .map_err(|e| anyhow::anyhow!("Failed to build API client: {}", e))?;

    let config = SetupConfig {
        bind_host: section.bind_addr()?,
        ..SetupConfig::default()
    }
    .with_grace_period(section.grace_period())
    .with_request_timeout(section.request_timeout())
    .with_open_browser(section.open_browser && !no_browser);

    let server = SetupServer::new(store, Arc::new(verifier))
        .with_config(config)
        .bind()
        .await?;

    println!("{}", style("Account Linking").bold());
    println!();
    println!("Open this URL in your browser to link an account:");
    println!();
    println!("  {}", style(server.url()).cyan());
    println!();
    println!("Press Ctrl-C to cancel.");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = server.run(cancel.clone()).await;
    cancel.cancel();

    match outcome {
        Ok(result) => {
            if ctx.json_output {
                println!(
                    "{}",
                    serde_json::json!({
                        "account": result.account_name,
                        "bot": result.bot_label,
                    })
                );
            } else {
                println!();
                println!(
                    "Linked account {} ({})",
                    style(&result.account_name).green().bold(),
                    result.bot_label
                );
            }
            Ok(())
        }
        Err(e) if e.is_cancellation() => {
            match e {
                SetupError::Cancelled => println!("Account linking cancelled."),
                _ => println!("Setup page closed without linking an account."),
            }
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Account linking failed: {}", e)),
    }
}

async fn cmd_list(store: &CredentialStore, ctx: &Context) -> Result<()> {
    let accounts = store.list().await?;

    if ctx.json_output {
        let entries: Vec<AccountEntry> = accounts.into_iter().map(Into::into).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No accounts linked. Run 'bizline account link' to add one.");
        return Ok(());
    }

    println!("{}", style("Linked Accounts").bold());
    println!();
    for account in &accounts {
        let marker = if account.is_primary { "*" } else { " " };
        let created = account
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let label = if account.readable {
            account.bot_label.clone()
        } else {
            style("(unreadable)").red().to_string()
        };
        println!(
            "{} {:<20} {:<24} {}",
            style(marker).green().bold(),
            style(&account.name).cyan(),
            label,
            style(created).dim()
        );
    }

    if ctx.verbose {
        println!();
        println!("{} account(s) in namespace '{}'", accounts.len(), store.namespace());
    }

    Ok(())
}

async fn cmd_show(store: &CredentialStore, name: Option<&str>, ctx: &Context) -> Result<()> {
    let (name, credentials) = store.resolve(name).await?;
    let record = store.get_record(&name).await?;
    let is_primary = store.get_primary().await?.as_deref() == Some(name.as_str());

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "name": name,
                "isPrimary": is_primary,
                "botName": record.bot_label,
                "createdAt": record.created_at.to_rfc3339(),
                "token": credentials.masked_token(),
            }))?
        );
        return Ok(());
    }

    println!("{}", style("Account").bold());
    println!("-------");
    println!("  Name:     {}", style(&name).cyan());
    println!("  Bot:      {}", record.bot_label);
    println!("  Primary:  {}", if is_primary { "yes" } else { "no" });
    println!(
        "  Created:  {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Token:    {}", credentials.masked_token());
    if let Some(channel_id) = &credentials.channel_id {
        println!("  Channel:  {}", channel_id);
    }

    Ok(())
}

async fn cmd_use(store: &CredentialStore, name: &str, ctx: &Context) -> Result<()> {
    store.set_primary(name).await?;
    if !ctx.json_output {
        println!("Primary account is now {}", style(normalize_name(name)).cyan());
    }
    Ok(())
}

async fn cmd_remove(store: &CredentialStore, name: &str, ctx: &Context) -> Result<()> {
    store.delete(name).await?;
    if !ctx.json_output {
        println!("Removed account {}", style(normalize_name(name)).cyan());
    }
    Ok(())
}

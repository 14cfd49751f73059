//! `courier` - compose one email and send it over SMTP.
//!
//! The message comes either from a static HTML template or from a draft
//! written by a text-completion provider and confirmed by the operator.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod flow;
mod prompt;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use courier_core::settings::DEFAULT_SETTINGS_FILE;
use courier_core::{LiveSession, MailTransport, SettingsStore, TemplateStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use flow::Mode;
use prompt::Prompter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "courier", version, about)]
struct Cli {
    /// Settings file holding SMTP and provider credentials.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Directory containing `catalog.json` and the template files.
    #[arg(long, default_value = "templates")]
    templates: PathBuf,

    /// Composition mode; asked interactively when omitted.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Base URL of the completion provider API.
    #[arg(long, env = "COURIER_PROVIDER_URL")]
    provider_url: Option<Url>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=info,courier_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = SettingsStore::open(&cli.settings)
        .with_context(|| format!("loading settings from {}", cli.settings.display()))?;
    let mut prompter = Prompter::stdio();

    let mode = match cli.mode {
        Some(mode) => mode,
        None => flow::choose_mode(&mut prompter)?,
    };
    info!(?mode, "starting");

    let message = match mode {
        Mode::Templates => {
            let templates = TemplateStore::open(&cli.templates).with_context(|| {
                format!("loading templates from {}", cli.templates.display())
            })?;
            flow::compose_from_template(&mut prompter, &templates)?
        }
        Mode::Generate => {
            flow::compose_from_generation(&mut prompter, &mut settings, cli.provider_url).await?
        }
    };

    let credentials = flow::transport_credentials(&mut prompter, &mut settings).await?;

    MailTransport::new(LiveSession::new())
        .deliver(&credentials, &message)
        .await
        .context("sending email")?;

    prompter.say("Email sent.")?;
    Ok(())
}

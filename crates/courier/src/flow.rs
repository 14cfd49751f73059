//! Interactive steps that gather input for each phase.

use std::cell::RefCell;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use courier_core::generation::{GenerationClient, GenerationRequest, OpenAiProvider};
use courier_core::settings::SettingsStore;
use courier_core::template::{Bindings, DATE_PLACEHOLDER, TemplateStore};
use courier_core::validation::{parse_http_url, parse_port, resolve_host};
use courier_core::{EmailAddress, Message, MessageComposer, ProviderCredentials, TransportCredentials};
use tracing::info;
use url::Url;

use crate::prompt::Prompter;

/// Placeholder that defaults to the recipient's address.
const EMAIL_PLACEHOLDER: &str = "EMAIL";

/// How the message is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Fill in a static template.
    Templates,
    /// Draft with the completion provider.
    Generate,
}

/// Asks which mode to use.
pub fn choose_mode<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> Result<Mode> {
    let choice = prompter.choose(
        "How would you like to compose the email?",
        &["From a template", "Draft with a completion provider"],
    )?;
    Ok(if choice == 0 {
        Mode::Templates
    } else {
        Mode::Generate
    })
}

/// Template mode: pick a template, addresses, then each placeholder value.
pub fn compose_from_template<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    templates: &TemplateStore,
) -> Result<Message> {
    let names: Vec<&str> = templates.templates().iter().map(|t| t.name.as_str()).collect();
    anyhow::ensure!(!names.is_empty(), "template catalog is empty");

    let index = prompter.choose("Choose a template:", &names)?;
    let template = &templates.templates()[index];

    let sender = prompter.ask("Sender email address", None, EmailAddress::parse)?;
    let recipient = prompter.ask("Recipient email address", None, EmailAddress::parse)?;

    let mut bindings = Bindings::new();
    for token in &template.placeholders {
        if token == DATE_PLACEHOLDER {
            continue;
        }
        let default = (token == EMAIL_PLACEHOLDER).then(|| recipient.as_str());
        let value = prompter.ask_text(&format!("Value for {token}"), default)?;
        bindings.insert(token.clone(), value);
    }

    MessageComposer::new()
        .compose_from_template(templates, &template.id, sender, recipient, &bindings)
        .with_context(|| format!("composing from template {:?}", template.id))
}

/// Generate mode: provider credentials, request fields, then the review loop.
pub async fn compose_from_generation<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    settings: &mut SettingsStore,
    provider_url: Option<Url>,
) -> Result<Message> {
    let credentials = provider_credentials(prompter, settings)?;

    let mut provider = OpenAiProvider::new(credentials).context("creating provider client")?;
    if let Some(url) = provider_url {
        provider = provider.with_base_url(url);
    }
    let client = GenerationClient::new(provider);

    let request = GenerationRequest {
        situation: prompter.ask_text("What is the email about?", None)?,
        target_url: prompter.ask("Link to include", None, parse_http_url)?,
        sender_name: prompter.ask_text("Sender's name", None)?,
        sender_email: prompter.ask("Sender email address", None, EmailAddress::parse)?,
        sender_detail: prompter.ask_text("Sender's role or relationship to the recipient", None)?,
        target_name: prompter.ask_text("Recipient's name", None)?,
        target_email: prompter.ask("Recipient email address", None, EmailAddress::parse)?,
        target_detail: prompter.ask_text("Anything relevant about the recipient", None)?,
    };

    let prompter = RefCell::new(prompter);
    MessageComposer::new()
        .compose_from_generation(
            &client,
            &request,
            |draft| {
                let mut p = prompter.borrow_mut();
                // A failed write only loses the preview; confirm reports I/O errors.
                let _ = p.say(format!("\nSubject: {}\n\n{}\n", draft.subject, draft.body));
            },
            || Ok(prompter.borrow_mut().confirm("Send this email?")?),
        )
        .await
        .context("generating draft")
}

fn provider_credentials<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    settings: &mut SettingsStore,
) -> Result<ProviderCredentials> {
    let saved = ProviderCredentials::load(settings);
    let credentials = ProviderCredentials {
        org_id: prompter.ask_optional("Provider organization id (optional)", &saved.org_id)?,
        api_key: prompter.ask_secret("Provider API key", &saved.api_key)?,
        model: saved.model,
    };

    credentials.store(settings);
    settings.flush().context("saving provider settings")?;
    info!(path = %settings.path().display(), "provider settings saved");
    Ok(credentials)
}

/// Asks for SMTP settings, offering the stored ones as defaults.
pub async fn transport_credentials<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    settings: &mut SettingsStore,
) -> Result<TransportCredentials> {
    let saved = TransportCredentials::load(settings);

    let server = loop {
        let server = prompter.ask_text("SMTP server hostname", Some(&saved.server))?;
        match resolve_host(&server).await {
            Ok(()) => break server,
            Err(e) => prompter.say(format!("  {e}"))?,
        }
    };
    let saved_port = (saved.port != 0).then(|| saved.port.to_string());
    let port = prompter.ask("SMTP server port", saved_port.as_deref(), parse_port)?;
    let username = prompter.ask_text("SMTP username", Some(&saved.username))?;
    let password = prompter.ask_secret("SMTP password", &saved.password)?;

    let credentials = TransportCredentials {
        server,
        port,
        username,
        password,
    };
    credentials.store(settings);
    settings.flush().context("saving SMTP settings")?;
    info!(path = %settings.path().display(), "SMTP settings saved");
    Ok(credentials)
}

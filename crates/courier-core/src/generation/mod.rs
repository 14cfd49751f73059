//! Provider-assisted drafting.
//!
//! A [`GenerationRequest`] is rendered into a prompt, sent to a
//! [`CompletionProvider`] once, and the raw completion is parsed into a
//! [`GenerationResult`].

mod openai;
mod prompt;

pub use openai::{DEFAULT_BASE_URL, OpenAiProvider};
pub use prompt::build_prompt;

use tracing::{debug, info};
use url::Url;

use crate::validation::EmailAddress;

/// Default bound on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Errors from the completion provider.
///
/// None of these are retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The provider rejected the organization id or API key.
    #[error("Provider rejected credentials: {0}")]
    ProviderAuth(String),

    /// Network failure, timeout or server-side error.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The completion could not be parsed into subject and body.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Everything the provider is told about the message to draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// What the email is about.
    pub situation: String,
    /// Link the email should include.
    pub target_url: Url,
    /// Sender's name as it should be signed.
    pub sender_name: String,
    /// Sender's address.
    pub sender_email: EmailAddress,
    /// Sender's role or relationship to the recipient.
    pub sender_detail: String,
    /// Recipient's name.
    pub target_name: String,
    /// Recipient's address.
    pub target_email: EmailAddress,
    /// Relevant context about the recipient.
    pub target_detail: String,
}

/// A parsed draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
}

impl GenerationResult {
    /// Parses a raw completion.
    ///
    /// Leading whitespace is skipped, then the text is split at the first
    /// newline. The subject is the text after a `Subject:` label on the
    /// first line, or the whole first line if there is no label. The rest
    /// is the body.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MalformedResponse`] if there is no
    /// newline, or the subject or body is empty.
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let text = raw.trim_start();
        let (first_line, rest) = text.split_once('\n').ok_or_else(|| {
            GenerationError::MalformedResponse("no line break between subject and body".into())
        })?;

        let subject = first_line
            .find(SUBJECT_LABEL)
            .map_or(first_line, |at| &first_line[at + SUBJECT_LABEL.len()..])
            .trim();
        let body = rest.trim();

        if subject.is_empty() {
            return Err(GenerationError::MalformedResponse("empty subject".into()));
        }
        if body.is_empty() {
            return Err(GenerationError::MalformedResponse("empty body".into()));
        }

        Ok(Self {
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }
}

const SUBJECT_LABEL: &str = "Subject:";

/// A text-completion backend.
#[allow(async_fn_in_trait)]
pub trait CompletionProvider {
    /// Returns the raw completion for `prompt`, at most `max_tokens` long.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::ProviderAuth`] or
    /// [`GenerationError::ProviderUnavailable`] when the call fails, and
    /// [`GenerationError::MalformedResponse`] for an unreadable reply.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;
}

/// Drafts messages through a [`CompletionProvider`].
#[derive(Debug, Clone)]
pub struct GenerationClient<P> {
    provider: P,
    max_tokens: u32,
}

impl<P: CompletionProvider> GenerationClient<P> {
    /// Creates a client with the default token bound.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Overrides the token bound.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Makes one provider call and parses the draft.
    ///
    /// # Errors
    ///
    /// Propagates provider errors and parse failures unchanged.
    pub async fn complete(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let prompt = build_prompt(request);
        debug!(chars = prompt.len(), max_tokens = self.max_tokens, "requesting completion");

        let raw = self.provider.complete(&prompt, self.max_tokens).await?;
        let result = GenerationResult::parse(&raw)?;

        info!(subject = %result.subject, "draft generated");
        Ok(result)
    }
}

//! Completion provider backed by an `OpenAI`-compatible HTTP API.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{CompletionProvider, GenerationError};
use crate::settings::ProviderCredentials;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const COMPLETIONS_PATH: &str = "v1/completions";
const ORGANIZATION_HEADER: &str = "OpenAI-Organization";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: String,
}

/// Sends prompts to `<base_url>/v1/completions`.
#[derive(Clone)]
pub struct OpenAiProvider {
    credentials: ProviderCredentials,
    base_url: Url,
    http_client: Client,
}

impl OpenAiProvider {
    /// Creates a provider pointed at [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::ProviderUnavailable`] if the HTTP client
    /// cannot be built.
    pub fn new(credentials: ProviderCredentials) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::ProviderUnavailable(e.to_string()))?;

        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| GenerationError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            credentials,
            base_url,
            http_client,
        })
    }

    /// Points the provider at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// API root requests are sent to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self) -> Result<Url, GenerationError> {
        let mut base = self.base_url.clone();
        // Url::join drops the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(COMPLETIONS_PATH)
            .map_err(|e| GenerationError::ProviderUnavailable(e.to_string()))
    }
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let endpoint = self.endpoint()?;
        debug!(%endpoint, model = %self.credentials.model, "posting completion request");

        let mut request = self
            .http_client
            .post(endpoint)
            .bearer_auth(&self.credentials.api_key)
            .json(&CompletionRequest {
                model: &self.credentials.model,
                prompt,
                max_tokens,
            });
        if !self.credentials.org_id.is_empty() {
            request = request.header(ORGANIZATION_HEADER, &self.credentials.org_id);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::ProviderUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            // The body can echo part of the key; report the status only.
            return Err(GenerationError::ProviderAuth(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(GenerationError::ProviderUnavailable(format!("HTTP {status}")));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.without_url().to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| GenerationError::MalformedResponse("response has no choices".into()))
    }
}

//! Turns a composition strategy into a validated [`Message`].

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::error::{Error, Result};
use crate::generation::{CompletionProvider, GenerationClient, GenerationRequest, GenerationResult};
use crate::message::Message;
use crate::review::ReviewLoop;
use crate::template::{Bindings, TemplateStore, computed_bindings};
use crate::validation::EmailAddress;

/// Builds messages from templates or provider drafts.
#[derive(Debug, Clone, Copy)]
pub struct MessageComposer {
    today: NaiveDate,
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageComposer {
    /// Creates a composer whose `DATE` binding is today's local date.
    #[must_use]
    pub fn new() -> Self {
        Self {
            today: Local::now().date_naive(),
        }
    }

    /// Pins the date used for the computed `DATE` binding.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Renders a template from `templates` into a message.
    ///
    /// Computed bindings are applied first and `bindings` override them.
    ///
    /// # Errors
    ///
    /// Returns template errors for an unknown id or unreadable file, and
    /// validation errors if the rendered subject or body is empty.
    pub fn compose_from_template(
        &self,
        templates: &TemplateStore,
        template_id: &str,
        sender: EmailAddress,
        recipient: EmailAddress,
        bindings: &Bindings,
    ) -> Result<Message> {
        let mut merged = computed_bindings(self.today);
        merged.extend(bindings.iter().map(|(k, v)| (k.clone(), v.clone())));

        let rendered = templates.render(template_id, &merged)?;
        info!(template = template_id, subject = %rendered.subject, "template rendered");

        Ok(Message::new(
            sender,
            recipient,
            rendered.subject,
            rendered.body,
        )?)
    }

    /// Drafts a message with the provider, looping until `confirm` accepts.
    ///
    /// `present` is shown every draft before `confirm` is asked.
    ///
    /// # Errors
    ///
    /// Returns the first generation or confirmation error unchanged, or a
    /// validation error for the accepted draft.
    pub async fn compose_from_generation<P, F, C>(
        &self,
        client: &GenerationClient<P>,
        request: &GenerationRequest,
        present: F,
        confirm: C,
    ) -> Result<Message>
    where
        P: CompletionProvider,
        F: FnMut(&GenerationResult),
        C: FnMut() -> Result<bool>,
    {
        let mut review = ReviewLoop::new();
        let accepted = review
            .run(
                move || async move { client.complete(request).await.map_err(Error::from) },
                present,
                confirm,
            )
            .await?;
        info!(rounds = review.rounds(), "generated draft accepted");

        Ok(Message::new(
            request.sender_email.clone(),
            request.target_email.clone(),
            accepted.subject,
            accepted.body,
        )?)
    }
}

//! Human confirmation loop for generated drafts.

use tracing::{debug, info};

use crate::generation::GenerationResult;

/// Where a [`ReviewLoop`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewState {
    /// Waiting on a fresh draft.
    #[default]
    Generating,
    /// A draft has been shown and awaits a yes/no answer.
    AwaitingConfirmation,
    /// The operator accepted a draft. Terminal.
    Accepted,
}

/// Regenerates drafts until the operator accepts one.
///
/// Each round calls `generate` again; drafts are never reused. There is no
/// round limit.
#[derive(Debug, Default)]
pub struct ReviewLoop {
    state: ReviewState,
    rounds: u32,
}

impl ReviewLoop {
    /// Creates a loop in [`ReviewState::Generating`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ReviewState::Generating,
            rounds: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ReviewState {
        self.state
    }

    /// Number of times `generate` has been called.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Runs generate → present → confirm until `confirm` returns `true`.
    ///
    /// # Errors
    ///
    /// An error from `generate` or `confirm` ends the loop and is returned
    /// as is. The state is left where the failure happened.
    pub async fn run<G, Fut, P, C, E>(
        &mut self,
        mut generate: G,
        mut present: P,
        mut confirm: C,
    ) -> Result<GenerationResult, E>
    where
        G: FnMut() -> Fut,
        Fut: Future<Output = Result<GenerationResult, E>>,
        P: FnMut(&GenerationResult),
        C: FnMut() -> Result<bool, E>,
    {
        loop {
            self.state = ReviewState::Generating;
            self.rounds += 1;
            debug!(round = self.rounds, "generating draft");
            let draft = generate().await?;

            self.state = ReviewState::AwaitingConfirmation;
            present(&draft);

            if confirm()? {
                self.state = ReviewState::Accepted;
                info!(rounds = self.rounds, "draft accepted");
                return Ok(draft);
            }
            info!(round = self.rounds, "draft rejected, regenerating");
        }
    }
}

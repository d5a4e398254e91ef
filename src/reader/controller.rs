//! State machine behind the reader screen's simplify toggle.
//!
//! ```text
//! Idle --start--> Fetching --Success--> Simplified --restore--> Idle
//!                    |  \--Failure--> Idle
//!                    \--cancel--> Idle
//! ```
//!
//! The controller owns the only [`TaskHandle`]. Outcomes arrive through
//! [`ReaderController::on_outcome`] from the interactive loop; an outcome
//! whose fetch was cancelled, replaced or already settled is discarded, so
//! a late success can never switch the view.

use super::fetch::{self, ContentService, FetchEvent, FetchOutcome, FetchRequest, TaskHandle};
use crate::api::{ArticleFields, RemoteId};
use crate::util::{strip_control_chars, validate_url_for_open, UrlValidationError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

const NOTICE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderPhase {
    Idle,
    Fetching,
    Simplified,
}

#[derive(Debug)]
pub enum ReaderState {
    /// Showing the live page.
    Idle,
    Fetching {
        request: FetchRequest,
        handle: TaskHandle,
    },
    Simplified {
        url: String,
        fields: ArticleFields,
    },
}

impl ReaderState {
    pub fn phase(&self) -> ReaderPhase {
        match self {
            ReaderState::Idle => ReaderPhase::Idle,
            ReaderState::Fetching { .. } => ReaderPhase::Fetching,
            ReaderState::Simplified { .. } => ReaderPhase::Simplified,
        }
    }
}

/// Broadcast to subscribers whenever the controller changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderNotice {
    Transition { from: ReaderPhase, to: ReaderPhase },
    Failed { message: String },
}

/// What [`ReaderController::on_outcome`] did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Simplified,
    Failed { message: String },
    Discarded,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReaderError {
    #[error("A simplify request is already running")]
    Busy,
    #[error("Already showing the simplified page")]
    NotIdle,
    #[error("Cannot simplify this address: {0}")]
    InvalidUrl(#[from] UrlValidationError),
}

/// Owns the reader's simplify state and its single in-flight fetch.
///
/// `E` is the interactive loop's event type; fetch outcomes are converted
/// into it and queued behind input events.
pub struct ReaderController<S, E = FetchEvent> {
    service: S,
    events: mpsc::Sender<E>,
    timeout: Duration,
    state: ReaderState,
    generation: u64,
    notices: broadcast::Sender<ReaderNotice>,
}

impl<S, E> ReaderController<S, E>
where
    S: ContentService,
    E: From<FetchEvent> + Send + 'static,
{
    pub fn new(service: S, events: mpsc::Sender<E>, timeout: Duration) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            service,
            events,
            timeout,
            state: ReaderState::Idle,
            generation: 0,
            notices,
        }
    }

    pub fn current_state(&self) -> ReaderPhase {
        self.state.phase()
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    /// Extracted fields, present only while `Simplified`.
    pub fn fields(&self) -> Option<&ArticleFields> {
        match &self.state {
            ReaderState::Simplified { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// The request in flight, present only while `Fetching`.
    pub fn pending_request(&self) -> Option<&FetchRequest> {
        match &self.state {
            ReaderState::Fetching { request, .. } => Some(request),
            _ => None,
        }
    }

    /// Receive state transitions and failure messages from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderNotice> {
        self.notices.subscribe()
    }

    /// Begin simplifying `target_url`. Only allowed from `Idle`.
    ///
    /// Returns the generation of the new fetch.
    pub fn start(&mut self, target_url: &str, requester_id: RemoteId) -> Result<u64, ReaderError> {
        match self.state {
            ReaderState::Idle => {}
            ReaderState::Fetching { .. } => return Err(ReaderError::Busy),
            ReaderState::Simplified { .. } => return Err(ReaderError::NotIdle),
        }
        let url = validate_url_for_open(target_url)?;

        self.generation += 1;
        let request = FetchRequest::new(url.as_str(), requester_id);
        let handle = fetch::start(
            &self.service,
            request.clone(),
            self.generation,
            self.timeout,
            self.events.clone(),
        );
        tracing::debug!(generation = self.generation, url = %url, "Simplify started");
        self.transition(ReaderState::Fetching { request, handle });
        Ok(self.generation)
    }

    /// Abandon the in-flight fetch. Returns false, changing nothing, when
    /// there is none.
    pub fn cancel(&mut self) -> bool {
        let ReaderState::Fetching { handle, .. } = &self.state else {
            return false;
        };
        handle.cancel();
        tracing::debug!(generation = handle.generation(), "Simplify cancelled by user");
        self.transition(ReaderState::Idle);
        true
    }

    /// Go back to the live page, dropping the extracted fields. Returns
    /// false when not `Simplified`.
    pub fn restore(&mut self) -> bool {
        if !matches!(self.state, ReaderState::Simplified { .. }) {
            return false;
        }
        self.transition(ReaderState::Idle);
        true
    }

    /// Return to `Idle` from any state, cancelling a running fetch.
    pub fn reset(&mut self) {
        if !self.cancel() {
            self.restore();
        }
    }

    /// Apply an outcome delivered by the interactive loop.
    pub fn on_outcome(&mut self, event: FetchEvent) -> Applied {
        let request = match &self.state {
            ReaderState::Fetching { request, handle }
                if handle.generation() == event.generation && !handle.is_cancelled() =>
            {
                request.clone()
            }
            _ => {
                tracing::debug!(
                    generation = event.generation,
                    current = self.generation,
                    "Discarding simplify outcome for a fetch that is no longer live"
                );
                return Applied::Discarded;
            }
        };

        match event.outcome {
            FetchOutcome::Success { fields } => {
                self.transition(ReaderState::Simplified {
                    url: request.target_url().to_owned(),
                    fields: fields.sanitized(),
                });
                Applied::Simplified
            }
            FetchOutcome::Failure { message } => {
                let message = strip_control_chars(&message).into_owned();
                self.transition(ReaderState::Idle);
                let _ = self.notices.send(ReaderNotice::Failed {
                    message: message.clone(),
                });
                Applied::Failed { message }
            }
            FetchOutcome::Cancelled => {
                self.transition(ReaderState::Idle);
                Applied::Discarded
            }
        }
    }

    fn transition(&mut self, next: ReaderState) {
        let from = self.state.phase();
        // Dropping a replaced Fetching state cancels its handle.
        self.state = next;
        let to = self.state.phase();
        if from != to {
            // Err only means nobody is subscribed.
            let _ = self.notices.send(ReaderNotice::Transition { from, to });
        }
    }
}

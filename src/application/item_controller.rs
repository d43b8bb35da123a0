use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    domain::{DownloadState, FailureReason, Item, ItemSource, ResolvedMedia},
    page::SharedDocument,
    ui::PageRenderer,
    utils::trailing_segment,
};

use super::traits::{MediaResolver, MediaSaver};

/// Collaborators shared by every item controller of a page.
#[derive(Clone)]
pub struct ControllerDeps {
    pub resolver: Arc<dyn MediaResolver>,
    pub saver: Arc<dyn MediaSaver>,
    pub renderer: Arc<dyn PageRenderer>,
    pub document: SharedDocument,
    pub reset_delay: Duration,
}

/// Download state machine behind one item's control.
///
/// `Idle -> Resolving -> Downloading -> Succeeded | Failed -> Idle`; direct
/// items skip `Resolving`. Triggers received outside `Idle` are ignored.
pub struct ItemController {
    item: Item,
    state: Mutex<DownloadState>,
    deps: ControllerDeps,
}

impl ItemController {
    pub fn new(item: Item, deps: ControllerDeps) -> Self {
        Self {
            item,
            state: Mutex::new(DownloadState::Idle),
            deps,
        }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn identifier(&self) -> &str {
        self.item.identifier()
    }

    pub fn state(&self) -> DownloadState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one download attempt and schedule the reset of the control.
    /// Returns `None` when the trigger was ignored.
    pub async fn trigger(self: &Arc<Self>) -> Option<DownloadState> {
        let outcome = self.attempt().await?;
        self.schedule_reset();
        Some(outcome)
    }

    /// Resolve and save the item, leaving it in its terminal state.
    pub async fn attempt(&self) -> Option<DownloadState> {
        let first = match self.item.source {
            ItemSource::Api { .. } => DownloadState::Resolving,
            ItemSource::Direct { .. } => DownloadState::Downloading,
        };
        if !self.begin(first) {
            debug!(identifier = self.identifier(), "already downloading, trigger ignored");
            return None;
        }

        let media = match &self.item.source {
            ItemSource::Api { identifier, layout } => {
                match self.deps.resolver.resolve(identifier, *layout).await {
                    Ok(media) => {
                        self.transition(DownloadState::Downloading);
                        media
                    }
                    Err(e) => {
                        warn!(%identifier, error = %e, "resolution failed");
                        let failed = DownloadState::Failed(FailureReason::FetchFailed);
                        self.transition(failed);
                        return Some(failed);
                    }
                }
            }
            ItemSource::Direct { url } => ResolvedMedia {
                source_url: url.clone(),
                suggested_file_name: trailing_segment(url).unwrap_or(url).to_string(),
            },
        };

        let saved = self
            .deps
            .saver
            .save(&media.source_url, &media.suggested_file_name)
            .await;

        let outcome = if saved {
            DownloadState::Succeeded
        } else {
            DownloadState::Failed(FailureReason::SaveFailed)
        };
        self.transition(outcome);
        Some(outcome)
    }

    /// Put the control back to `Idle` once the outcome has been shown.
    pub fn schedule_reset(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(controller.deps.reset_delay).await;
            controller.transition(DownloadState::Idle);
        });
    }

    fn begin(&self, first: DownloadState) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != DownloadState::Idle {
                return false;
            }
            *state = first;
        }
        self.render(first);
        true
    }

    fn transition(&self, next: DownloadState) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.can_transition_to(next) {
                debug!(from = ?*state, to = ?next, "transition refused");
                return false;
            }
            *state = next;
        }
        self.render(next);
        true
    }

    fn render(&self, state: DownloadState) {
        let attached = self
            .deps
            .document
            .lock()
            .map(|doc| doc.is_attached(self.item.element))
            .unwrap_or(false);
        if attached {
            self.deps.renderer.item_state_changed(&self.item, state);
        }
    }
}

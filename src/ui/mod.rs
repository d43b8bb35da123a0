//! Boundary to whatever draws the injected controls.
//!
//! The engine only tells the renderer where a control belongs and what it
//! should currently show; styling is entirely the renderer's business.

use tracing::{debug, info};

use crate::domain::{BulkRun, DownloadState, Item};
use crate::page::{Document, NodeId};

pub trait PageRenderer: Send + Sync {
    /// A new item was discovered; its download control goes on `item.element`.
    fn mount_control(&self, item: &Item);

    /// Suppress an entry's caption. Runs with the page locked.
    fn hide_caption(&self, doc: &mut Document, caption: NodeId) {
        doc.hide(caption);
    }

    fn item_state_changed(&self, item: &Item, state: DownloadState);

    fn bulk_progress(&self, run: &BulkRun);
}

/// Headless renderer that only logs what would be drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl PageRenderer for TracingRenderer {
    fn mount_control(&self, item: &Item) {
        debug!(identifier = item.identifier(), "download control mounted");
    }

    fn item_state_changed(&self, item: &Item, state: DownloadState) {
        debug!(identifier = item.identifier(), label = state.label(), "item state");
    }

    fn bulk_progress(&self, run: &BulkRun) {
        info!(
            completed = run.completed,
            total = run.total,
            "{}",
            run.status
        );
    }
}

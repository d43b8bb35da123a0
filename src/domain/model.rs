use std::fmt;

use crate::page::NodeId;

use super::error::FailureReason;

/// Which page layout the items were discovered in.
///
/// The compact layout does not embed item metadata inline, so every
/// metadata request made for its items has to ask for it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Standard,
    Compact,
}

/// Where the full-resolution asset of an item comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSource {
    /// A gallery thumbnail, resolved through the metadata endpoint.
    Api {
        identifier: String,
        layout: LayoutMode,
    },
    /// A detail page preview that already links the asset.
    Direct { url: String },
}

/// One discoverable media entry on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub source: ItemSource,
    pub element: NodeId,
}

impl Item {
    pub fn identifier(&self) -> &str {
        match &self.source {
            ItemSource::Api { identifier, .. } => identifier,
            ItemSource::Direct { url } => crate::utils::trailing_segment(url).unwrap_or(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    Resolving,
    Downloading,
    Succeeded,
    Failed(FailureReason),
}

impl DownloadState {
    /// Edges of the per-item state graph.
    pub fn can_transition_to(self, next: DownloadState) -> bool {
        use DownloadState::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Idle, Downloading)
                | (Resolving, Downloading)
                | (Resolving, Failed(_))
                | (Downloading, Succeeded)
                | (Downloading, Failed(_))
                | (Succeeded, Idle)
                | (Failed(_), Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadState::Succeeded | DownloadState::Failed(_))
    }

    /// Text shown on the item's control.
    pub fn label(self) -> &'static str {
        match self {
            DownloadState::Idle => "Download",
            DownloadState::Resolving | DownloadState::Downloading => "Downloading...",
            DownloadState::Succeeded => "Downloaded",
            DownloadState::Failed(FailureReason::FetchFailed) => "Error",
            DownloadState::Failed(FailureReason::SaveFailed) => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub source_url: String,
    pub suggested_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BulkStatus {
    #[default]
    Waiting,
    NothingFound,
    AlreadyRunning,
    Processing(String),
    /// The item was still busy with a user-started download.
    Skipped(String),
    SpamProtection,
    Finished,
}

impl fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkStatus::Waiting => write!(f, "[Waiting for actions]"),
            BulkStatus::NothingFound => write!(f, "[Nothing found]"),
            BulkStatus::AlreadyRunning => write!(f, "[Already running]"),
            BulkStatus::Processing(id) => write!(f, "[Processing for {}]", id),
            BulkStatus::Skipped(id) => write!(f, "[Skipped {}, still busy]", id),
            BulkStatus::SpamProtection => write!(f, "[Spam protection. Please wait...]"),
            BulkStatus::Finished => write!(f, "[Finished]"),
        }
    }
}

/// Progress of one bulk pass. `completed` never exceeds `total` and
/// never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkRun {
    pub total: usize,
    pub completed: usize,
    pub current_identifier: Option<String>,
    pub status: BulkStatus,
    pub succeeded: usize,
    pub failed: usize,
    /// Items left alone because they were busy; also counted in `failed`.
    pub skipped: usize,
}

impl BulkRun {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn start_item(&mut self, identifier: &str) {
        self.current_identifier = Some(identifier.to_string());
        self.status = BulkStatus::Processing(identifier.to_string());
    }

    pub fn finish_item(&mut self, success: bool) {
        if self.completed < self.total {
            self.completed += 1;
        }
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn skip_item(&mut self, identifier: &str) {
        self.skipped += 1;
        self.finish_item(false);
        self.status = BulkStatus::Skipped(identifier.to_string());
    }

    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

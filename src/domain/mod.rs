pub mod error;
pub mod model;

pub use error::{DiscoveryError, DownloadError, FailureReason, ResolutionError};
pub use model::{
    BulkRun, BulkStatus, DownloadState, Item, ItemSource, LayoutMode, ResolvedMedia,
};

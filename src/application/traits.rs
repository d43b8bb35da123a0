// Seams between the engine and its I/O collaborators

use async_trait::async_trait;

use crate::domain::{LayoutMode, ResolutionError, ResolvedMedia};

/// Turns an item identifier into the location of its full-resolution asset.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(
        &self,
        identifier: &str,
        layout: LayoutMode,
    ) -> Result<ResolvedMedia, ResolutionError>;
}

/// Binary download primitive: fetch `url` and save it as `file_name`.
///
/// Never fails past its own boundary; any temporary state is cleaned up
/// before returning.
#[async_trait]
pub trait MediaSaver: Send + Sync {
    async fn save(&self, url: &str, file_name: &str) -> bool;
}

use async_trait::async_trait;

use crate::{
    api::ApiClient,
    domain::{LayoutMode, ResolutionError, ResolvedMedia},
    utils::api_file_name,
};

use super::traits::MediaResolver;

#[async_trait]
impl MediaResolver for ApiClient {
    async fn resolve(
        &self,
        identifier: &str,
        layout: LayoutMode,
    ) -> Result<ResolvedMedia, ResolutionError> {
        let metadata = self.fetch_metadata(identifier, layout).await?;

        if layout == LayoutMode::Compact {
            self.revert_layout(identifier).await;
        }

        let config = self.config();
        let suggested_file_name = api_file_name(
            &config.site_prefix,
            identifier,
            &metadata.full,
            &config.default_extension,
        );

        Ok(ResolvedMedia {
            source_url: metadata.full,
            suggested_file_name,
        })
    }
}

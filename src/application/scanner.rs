use tracing::{debug, info};
use url::Url;

use crate::{
    config::ContainerConfig,
    domain::{DiscoveryError, Item, ItemSource, LayoutMode},
    page::{Document, NodeId},
    ui::PageRenderer,
    utils::{absolutize, trailing_segment},
};

/// Class marking an element whose control has already been injected.
pub const PROCESSED_CLASS: &str = "has-download-btn";

/// Finds download candidates on the page.
///
/// Every entry is marked before it is inspected, so repeated scans never
/// hand out the same element twice.
#[derive(Debug, Clone)]
pub struct Scanner {
    containers: ContainerConfig,
    base_url: Url,
}

impl Scanner {
    pub fn new(containers: ContainerConfig, base_url: Url) -> Self {
        Self {
            containers,
            base_url,
        }
    }

    /// Locate the items container and the layout it implies.
    pub fn locate_container(&self, doc: &Document) -> Result<(NodeId, LayoutMode), DiscoveryError> {
        if let Some(node) = doc.element_by_id(&self.containers.primary) {
            return Ok((node, LayoutMode::Standard));
        }

        debug!(
            primary = %self.containers.primary,
            "primary container not found, trying fallbacks"
        );
        for (index, id) in self.containers.fallbacks.iter().enumerate() {
            if let Some(node) = doc.element_by_id(id) {
                info!(container = %id, "using fallback container");
                let layout = if index == 0 {
                    LayoutMode::Compact
                } else {
                    LayoutMode::Standard
                };
                return Ok((node, layout));
            }
        }

        let mut tried = vec![self.containers.primary.clone()];
        tried.extend(self.containers.fallbacks.iter().cloned());
        Err(DiscoveryError::ContainerNotFound {
            tried: tried.join(", "),
        })
    }

    /// Mark and return every entry not seen by an earlier scan.
    pub fn scan(&self, doc: &mut Document, renderer: &dyn PageRenderer) -> Vec<Item> {
        let (container, layout) = match self.locate_container(doc) {
            Ok(found) => found,
            Err(e) => {
                info!("{}", e);
                return Vec::new();
            }
        };

        let entries: Vec<NodeId> = doc
            .children(container)
            .into_iter()
            .filter(|&n| matches_unprocessed_li(doc, n))
            .collect();

        let mut items = Vec::new();
        for entry in entries {
            doc.add_class(entry, PROCESSED_CLASS);

            let anchor = doc.find_descendant(entry, matches_a_thumb);
            let Some(anchor) = anchor else {
                debug!("entry without a thumb link skipped");
                continue;
            };

            if let Some(caption) = doc.find_descendant(entry, matches_div_child_p) {
                renderer.hide_caption(doc, caption);
            }

            let href = doc.attr(anchor, "href").unwrap_or_default();
            let Some(identifier) = self.identifier_from(href) else {
                info!(link = %href, "could not get id from link");
                continue;
            };

            let item = Item {
                source: ItemSource::Api { identifier, layout },
                element: entry,
            };
            renderer.mount_control(&item);
            items.push(item);
        }

        items
    }

    /// The single large image preview of a detail page, if any.
    pub fn scan_preview(&self, doc: &mut Document, renderer: &dyn PageRenderer) -> Option<Item> {
        let anchor = doc.find_descendant(doc.root(), matches_unprocessed_a_preview)?;
        doc.add_class(anchor, PROCESSED_CLASS);

        let href = doc.attr(anchor, "href")?;
        let url = absolutize(&self.base_url, href)?;
        trailing_segment(url.as_str())?;

        info!(url = %url, "adding download control on view image page");
        let item = Item {
            source: ItemSource::Direct {
                url: url.to_string(),
            },
            element: anchor,
        };
        renderer.mount_control(&item);
        Some(item)
    }

    fn identifier_from(&self, href: &str) -> Option<String> {
        if href.is_empty() {
            return None;
        }
        let url = absolutize(&self.base_url, href)?;
        trailing_segment(url.as_str()).map(String::from)
    }
}

/// `li:not(.has-download-btn)`
fn matches_unprocessed_li(doc: &Document, node: NodeId) -> bool {
    doc.matches(node, "li", None) && !doc.has_class(node, PROCESSED_CLASS)
}

/// `a.thumb`
fn matches_a_thumb(doc: &Document, node: NodeId) -> bool {
    doc.matches(node, "a", Some("thumb"))
}

/// `a.preview:not(.has-download-btn)`
fn matches_unprocessed_a_preview(doc: &Document, node: NodeId) -> bool {
    doc.matches(node, "a", Some("preview")) && !doc.has_class(node, PROCESSED_CLASS)
}

/// `div > p`
fn matches_div_child_p(doc: &Document, node: NodeId) -> bool {
    doc.matches(node, "p", None)
        && doc
            .parent(node)
            .is_some_and(|parent| doc.matches(parent, "div", None))
}

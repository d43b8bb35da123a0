use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    api::ApiClient,
    application::{
        BulkDownloader, ControllerDeps, FileSaver, ItemController, MediaResolver, MediaSaver,
        PageEvent, PageWatcher, Scanner,
    },
    config::EngineConfig,
    domain::{BulkRun, DownloadState},
    page::SharedDocument,
    ui::PageRenderer,
};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Invalid base URL {0}: {1}")]
    InvalidBaseUrl(String, url::ParseError),
}

/// Everything the downloader attaches to one page.
pub struct DownloaderApp {
    config: EngineConfig,
    document: SharedDocument,
    scanner: Scanner,
    deps: ControllerDeps,
    bulk: BulkDownloader,
    controllers: Mutex<Vec<Arc<ItemController>>>,
    preview: Mutex<Option<Arc<ItemController>>>,
}

impl DownloaderApp {
    pub fn new(
        config: EngineConfig,
        document: SharedDocument,
        resolver: Arc<dyn MediaResolver>,
        saver: Arc<dyn MediaSaver>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self, SetupError> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| SetupError::InvalidBaseUrl(config.api.base_url.clone(), e))?;

        let deps = ControllerDeps {
            resolver,
            saver,
            renderer: renderer.clone(),
            document: document.clone(),
            reset_delay: config.pacing.reset_delay,
        };

        Ok(Self {
            scanner: Scanner::new(config.containers.clone(), base_url),
            bulk: BulkDownloader::new(config.pacing.clone(), renderer),
            document,
            deps,
            config,
            controllers: Mutex::new(Vec::new()),
            preview: Mutex::new(None),
        })
    }

    /// Wire the HTTP client and a file saver writing into `download_dir`.
    pub fn with_http(
        config: EngineConfig,
        document: SharedDocument,
        download_dir: impl Into<PathBuf>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self, SetupError> {
        let api_client = ApiClient::new(config.api.clone());
        let saver = FileSaver::new(api_client.clone(), download_dir);
        Self::new(
            config,
            document,
            Arc::new(api_client),
            Arc::new(saver),
            renderer,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Scan the page and register a controller for every new item.
    /// Controllers whose element has left the page are dropped.
    /// Returns how many were added.
    pub fn rescan(&self) -> usize {
        let mut doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let items = self.scanner.scan(&mut doc, self.deps.renderer.as_ref());
        let preview = self.scanner.scan_preview(&mut doc, self.deps.renderer.as_ref());

        {
            let mut slot = self.preview.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(item) = preview {
                *slot = Some(Arc::new(ItemController::new(item, self.deps.clone())));
            } else if slot
                .as_ref()
                .is_some_and(|c| !doc.is_attached(c.item().element))
            {
                *slot = None;
            }
        }

        let added = items.len();
        let mut controllers = self.controllers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = controllers.len();
        controllers.retain(|c| doc.is_attached(c.item().element));
        let removed = before - controllers.len();
        controllers.extend(
            items
                .into_iter()
                .map(|item| Arc::new(ItemController::new(item, self.deps.clone()))),
        );
        if added > 0 || removed > 0 {
            debug!(added, removed, total = controllers.len(), "items registered");
        }
        added
    }

    /// Controllers of every item still on the page, in document order.
    pub fn items(&self) -> Vec<Arc<ItemController>> {
        let doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let controllers = self.controllers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keyed: Vec<(Vec<usize>, Arc<ItemController>)> = controllers
            .iter()
            .filter_map(|c| doc.order_key(c.item().element).map(|key| (key, Arc::clone(c))))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, c)| c).collect()
    }

    fn find(&self, identifier: &str) -> Option<Arc<ItemController>> {
        self.items().into_iter().find(|c| c.identifier() == identifier)
    }

    /// Click on one item's control. `None` if the item is unknown or busy.
    pub async fn trigger(&self, identifier: &str) -> Option<DownloadState> {
        let Some(controller) = self.find(identifier) else {
            warn!(%identifier, "no such item");
            return None;
        };
        controller.trigger().await
    }

    /// Click on the detail page's full-size download control.
    pub async fn trigger_preview(&self) -> Option<DownloadState> {
        let controller = {
            let doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = self.preview.lock().unwrap_or_else(PoisonError::into_inner);
            slot.clone().filter(|c| doc.is_attached(c.item().element))
        }?;
        controller.trigger().await
    }

    pub async fn run_bulk(&self) -> BulkRun {
        self.bulk.run(self.items()).await
    }

    /// Initial scan, then rescans driven by page events until the event
    /// source closes.
    pub async fn watch(self: Arc<Self>, events: mpsc::UnboundedReceiver<PageEvent>) {
        let added = self.rescan();
        info!(added, "initial scan done");

        let app = Arc::clone(&self);
        PageWatcher::new(self.config.watch.clone())
            .run(events, move || {
                app.rescan();
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::item_controller::tests::{FakeResolver, FakeSaver, StateRecorder};
    use crate::domain::{BulkStatus, LayoutMode};
    use crate::page::{Document, NodeId};
    use crate::ui::TracingRenderer;
    use mockito::Matcher;
    use std::time::Duration;

    const GALLERY: &str = r#"
        <html><body><ul id="thumbs2">
          <li><a class="thumb" href="/123456">a</a></li>
          <li><a class="thumb" href="/234567">b</a></li>
        </ul></body></html>
    "#;

    fn app_for(server_url: &str, html: &str, dir: &std::path::Path) -> Arc<DownloaderApp> {
        let mut config = EngineConfig::default();
        config.api.base_url = server_url.to_string();
        config.api.site_prefix = "site".to_string();
        Arc::new(
            DownloaderApp::with_http(
                config,
                Document::parse_html(html).into_shared(),
                dir,
                Arc::new(TracingRenderer),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_single_download_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let full = format!("{}/cdn/123456.full.jpg", server.url());
        server
            .mock("GET", "/123456")
            .match_query(Matcher::Regex("^json$".to_string()))
            .with_body(format!(r#"{{"full": "{}"}}"#, full))
            .create_async()
            .await;
        server
            .mock("GET", "/cdn/123456.full.jpg")
            .with_body("image-data")
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = app_for(&server.url(), GALLERY, dir.path());

        assert_eq!(app.rescan(), 2);
        let outcome = app.trigger("123456").await;

        assert_eq!(outcome, Some(DownloadState::Succeeded));
        let saved = std::fs::read_to_string(dir.path().join("site_123456.jpg")).unwrap();
        assert_eq!(saved, "image-data");
    }

    #[tokio::test]
    async fn test_metadata_error_fails_without_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/123456")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let app = app_for(&server.url(), GALLERY, dir.path());
        app.rescan();

        let outcome = app.trigger("123456").await;

        assert_eq!(
            outcome,
            Some(DownloadState::Failed(
                crate::domain::FailureReason::FetchFailed
            ))
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_compact_layout_requests() {
        let mut server = mockito::Server::new_async().await;
        let full = format!("{}/cdn/a.png", server.url());
        let fetch = server
            .mock("GET", "/1")
            .match_query(Matcher::Regex("^json&screen=1$".to_string()))
            .with_body(format!(r#"{{"full": "{}"}}"#, full))
            .expect(1)
            .create_async()
            .await;
        let revert = server
            .mock("GET", "/1")
            .match_query(Matcher::Regex("^json&mobile=1$".to_string()))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/cdn/a.png")
            .with_body("png")
            .create_async()
            .await;
        let html = r#"<ul id="thumbs"><li><a class="thumb" href="/1">x</a></li></ul>"#;
        let dir = tempfile::tempdir().unwrap();
        let app = app_for(&server.url(), html, dir.path());

        app.rescan();
        let items = app.items();
        assert!(matches!(
            items[0].item().source,
            crate::domain::ItemSource::Api { layout: LayoutMode::Compact, .. }
        ));
        assert_eq!(app.trigger("1").await, Some(DownloadState::Succeeded));

        fetch.assert_async().await;
        revert.assert_async().await;
        assert!(dir.path().join("site_1.png").exists());
    }

    #[tokio::test]
    async fn test_preview_download() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/static/Tag.full.99.jpg")
            .with_body("big")
            .create_async()
            .await;
        let html = format!(
            r#"<div id="large"><a class="preview" href="{}/static/Tag.full.99.jpg">x</a></div>"#,
            server.url()
        );
        let dir = tempfile::tempdir().unwrap();
        let app = app_for(&server.url(), &html, dir.path());

        assert_eq!(app.rescan(), 0);
        assert_eq!(app.trigger_preview().await, Some(DownloadState::Succeeded));
        assert!(dir.path().join("Tag.full.99.jpg").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_on_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_for("https://www.zerochan.net", "<p>nothing</p>", dir.path());
        app.rescan();

        let run = app.run_bulk().await;

        assert_eq!(run.status, BulkStatus::NothingFound);
        assert_eq!(run.total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_registers_late_items() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_for("https://www.zerochan.net", GALLERY, dir.path());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(app.clone().watch(rx));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(app.items().len(), 2);

        {
            let mut doc = app.document().lock().unwrap();
            let list = doc.element_by_id("thumbs2").unwrap();
            let li = doc.create_element("li");
            let a = doc.create_element("a");
            doc.set_attr(a, "class", "thumb");
            doc.set_attr(a, "href", "/345678");
            doc.append_child(li, a);
            doc.append_child(list, li);
        }
        tx.send(PageEvent::Mutation { added_nodes: 1 }).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        let ids: Vec<String> = app
            .items()
            .iter()
            .map(|c| c.identifier().to_string())
            .collect();
        assert_eq!(ids, vec!["123456", "234567", "345678"]);
    }

    fn app_with_fakes(html: &str) -> (DownloaderApp, Arc<StateRecorder>, Arc<FakeSaver>) {
        let renderer = Arc::new(StateRecorder::default());
        let saver = Arc::new(FakeSaver::default());
        let resolver = FakeResolver {
            urls: ["123456", "234567", "345678"]
                .iter()
                .map(|id| (id.to_string(), format!("https://cdn.example/{}.jpg", id)))
                .collect(),
            ..Default::default()
        };
        let app = DownloaderApp::new(
            EngineConfig::default(),
            Document::parse_html(html).into_shared(),
            Arc::new(resolver),
            saver.clone(),
            renderer.clone(),
        )
        .unwrap();
        (app, renderer, saver)
    }

    fn thumb_entry(doc: &mut Document, href: &str) -> NodeId {
        let li = doc.create_element("li");
        let a = doc.create_element("a");
        doc.set_attr(a, "class", "thumb");
        doc.set_attr(a, "href", href);
        doc.append_child(li, a);
        li
    }

    fn identifiers(controllers: &[Arc<ItemController>]) -> Vec<String> {
        controllers
            .iter()
            .map(|c| c.identifier().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerendered_gallery_replaces_controllers() {
        let (app, renderer, saver) = app_with_fakes(GALLERY);
        assert_eq!(app.rescan(), 2);

        // the site swaps the whole list for a fresh copy of the same entries
        let fresh_entry = {
            let mut doc = app.document().lock().unwrap();
            let old = doc.element_by_id("thumbs2").unwrap();
            let parent = doc.parent(old).unwrap();
            doc.detach(old);
            let list = doc.create_element("ul");
            doc.set_attr(list, "id", "thumbs2");
            doc.append_child(parent, list);
            for href in ["/123456", "/234567"] {
                let li = thumb_entry(&mut doc, href);
                doc.append_child(list, li);
            }
            let first = doc.children(list)[0];
            first
        };
        assert_eq!(app.rescan(), 2);

        let items = app.items();
        assert_eq!(identifiers(&items), vec!["123456", "234567"]);
        assert_eq!(items[0].item().element, fresh_entry);
        assert_eq!(app.controllers.lock().unwrap().len(), 2);

        // the click lands on the visible control
        assert_eq!(app.trigger("123456").await, Some(DownloadState::Succeeded));
        assert_eq!(renderer.states.lock().unwrap().len(), 3);
        tokio::time::sleep(app.config().pacing.reset_delay + Duration::from_millis(1)).await;

        let run = app.run_bulk().await;
        assert_eq!(run.total, 2);
        assert_eq!(run.succeeded, 2);
        assert_eq!(saver.saved.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_after_partial_removal() {
        let (app, _, saver) = app_with_fakes(GALLERY);
        app.rescan();
        {
            let mut doc = app.document().lock().unwrap();
            let list = doc.element_by_id("thumbs2").unwrap();
            let first = doc.children(list)[0];
            doc.detach(first);
        }

        let run = app.run_bulk().await;

        assert_eq!(run.total, 1);
        assert_eq!(run.succeeded, 1);
        assert_eq!(
            saver.saved.lock().unwrap()[0].0,
            "https://cdn.example/234567.jpg"
        );
        assert_eq!(app.trigger("123456").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_follow_document_order() {
        let (app, _, saver) = app_with_fakes(GALLERY);
        app.rescan();
        {
            let mut doc = app.document().lock().unwrap();
            let list = doc.element_by_id("thumbs2").unwrap();
            let li = thumb_entry(&mut doc, "/345678");
            doc.insert_child(list, 0, li);
        }
        assert_eq!(app.rescan(), 1);

        assert_eq!(
            identifiers(&app.items()),
            vec!["345678", "123456", "234567"]
        );
        app.run_bulk().await;
        let order: Vec<String> = saver
            .saved
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect();
        assert_eq!(
            order,
            vec!["site_345678.jpg", "site_123456.jpg", "site_234567.jpg"]
        );
    }

    #[tokio::test]
    async fn test_removed_preview_is_dropped() {
        let html = r#"<div id="large"><a class="preview" href="https://static.zerochan.net/A.full.1.jpg">x</a></div>"#;
        let (app, _, saver) = app_with_fakes(html);
        app.rescan();
        {
            let mut doc = app.document().lock().unwrap();
            let large = doc.element_by_id("large").unwrap();
            doc.detach(large);
        }

        assert_eq!(app.trigger_preview().await, None);
        app.rescan();
        assert!(app.preview.lock().unwrap().is_none());
        assert!(saver.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = EngineConfig::default();
        config.api.base_url = "not a url".to_string();
        let result = DownloaderApp::with_http(
            config,
            Document::new().into_shared(),
            "/tmp",
            Arc::new(TracingRenderer),
        );
        assert!(matches!(result, Err(SetupError::InvalidBaseUrl(..))));
    }
}

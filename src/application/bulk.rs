use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::PacingConfig,
    domain::{BulkRun, BulkStatus, DownloadState},
    ui::PageRenderer,
};

use super::item_controller::ItemController;

/// Clears the running flag however the run ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Downloads every discovered item, one at a time.
///
/// Each item is followed by `inter_item_pause`; every `cooldown_every`th
/// completed item is additionally followed by `cooldown_pause`.
pub struct BulkDownloader {
    pacing: PacingConfig,
    renderer: Arc<dyn PageRenderer>,
    running: AtomicBool,
}

impl BulkDownloader {
    pub fn new(pacing: PacingConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            pacing,
            renderer,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run over `controllers` in the given order. Items discovered after the
    /// run started are not part of it.
    pub async fn run(&self, controllers: Vec<Arc<ItemController>>) -> BulkRun {
        if self.running.swap(true, Ordering::SeqCst) {
            let run = BulkRun {
                status: BulkStatus::AlreadyRunning,
                ..Default::default()
            };
            self.renderer.bulk_progress(&run);
            return run;
        }
        let _guard = RunningGuard(&self.running);

        let mut run = BulkRun::new(controllers.len());
        if run.total == 0 {
            run.status = BulkStatus::NothingFound;
            self.renderer.bulk_progress(&run);
            return run;
        }

        info!(total = run.total, "bulk download started");
        self.renderer.bulk_progress(&run);

        for controller in controllers {
            run.start_item(controller.identifier());
            self.renderer.bulk_progress(&run);

            match controller.attempt().await {
                Some(state) => {
                    controller.schedule_reset();
                    run.finish_item(state == DownloadState::Succeeded);
                }
                None => {
                    warn!(
                        identifier = controller.identifier(),
                        "item busy, skipped by bulk run"
                    );
                    run.skip_item(controller.identifier());
                }
            }
            self.renderer.bulk_progress(&run);

            tokio::time::sleep(self.pacing.inter_item_pause).await;

            if self.pacing.cooldown_every > 0 && run.completed % self.pacing.cooldown_every == 0 {
                info!(completed = run.completed, "spam protection cooldown");
                run.status = BulkStatus::SpamProtection;
                self.renderer.bulk_progress(&run);
                tokio::time::sleep(self.pacing.cooldown_pause).await;
            }
        }

        run.status = BulkStatus::Finished;
        info!(
            succeeded = run.succeeded,
            failed = run.failed,
            skipped = run.skipped,
            "bulk download finished"
        );
        self.renderer.bulk_progress(&run);
        run
    }
}

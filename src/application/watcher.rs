use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::config::WatchConfig;

/// Something that happened to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// One batch of DOM mutations.
    Mutation { added_nodes: usize },
    Scroll,
    Visibility { hidden: bool },
}

/// Decides when page events should lead to a rescan.
///
/// Mutation batches with added nodes schedule a rescan `mutation_delay`
/// later, collapsing into an already pending one. Every scroll event
/// restarts a `scroll_settle` timer. A visibility change that leaves the
/// page visible rescans at once: the event itself is the transition.
#[derive(Debug, Clone)]
pub struct RescanScheduler {
    config: WatchConfig,
    mutation_due: Option<Instant>,
    scroll_due: Option<Instant>,
}

impl RescanScheduler {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            mutation_due: None,
            scroll_due: None,
        }
    }

    /// Returns true when the event calls for an immediate rescan.
    pub fn on_event(&mut self, event: PageEvent, now: Instant) -> bool {
        match event {
            PageEvent::Mutation { added_nodes } => {
                if added_nodes > 0 && self.mutation_due.is_none() {
                    self.mutation_due = Some(now + self.config.mutation_delay);
                }
                false
            }
            PageEvent::Scroll => {
                self.scroll_due = Some(now + self.config.scroll_settle);
                false
            }
            PageEvent::Visibility { hidden } => !hidden,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.mutation_due, self.scroll_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Clear every timer that has expired; true if any did.
    pub fn take_due(&mut self, now: Instant) -> bool {
        let mut fired = false;
        for due in [&mut self.mutation_due, &mut self.scroll_due] {
            if due.is_some_and(|at| at <= now) {
                *due = None;
                fired = true;
            }
        }
        fired
    }
}

/// Drives a [`RescanScheduler`] from a stream of page events until the
/// sender side goes away.
pub struct PageWatcher {
    scheduler: RescanScheduler,
}

impl PageWatcher {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            scheduler: RescanScheduler::new(config),
        }
    }

    pub async fn run<F>(mut self, mut events: mpsc::UnboundedReceiver<PageEvent>, mut rescan: F)
    where
        F: FnMut(),
    {
        loop {
            let deadline = self.scheduler.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if self.scheduler.on_event(event, Instant::now()) {
                            debug!("page visible again, rescanning");
                            rescan();
                        }
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.scheduler.take_due(Instant::now()) {
                        rescan();
                    }
                }
            }
        }
        debug!("page watcher stopped");
    }
}

pub mod bulk;
pub mod item_controller;
pub mod resolver;
pub mod saver;
pub mod scanner;
pub mod traits;
pub mod watcher;

pub use bulk::BulkDownloader;
pub use item_controller::{ControllerDeps, ItemController};
pub use saver::FileSaver;
pub use scanner::{Scanner, PROCESSED_CLASS};
pub use traits::{MediaResolver, MediaSaver};
pub use watcher::{PageEvent, PageWatcher, RescanScheduler};

//! Instant full-resolution downloads for gallery pages.
//!
//! [`app::DownloaderApp`] attaches to a page: it scans for items, gives each
//! one a download controller, keeps rescanning as the page changes and runs
//! paced bulk downloads over everything discovered so far.

pub mod api;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod page;
pub mod ui;
pub mod utils;

pub use app::DownloaderApp;
pub use config::EngineConfig;

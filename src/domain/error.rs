use thiserror::Error;

/// The expected items container is missing from the page.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("No thumb container found (tried {tried})")]
    ContainerNotFound { tried: String },
}

#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("Metadata request failed: {0}")]
    Network(String),

    #[error("Metadata endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Malformed metadata: {0}")]
    Malformed(String),

    #[error("Invalid metadata URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("Binary request failed: {0}")]
    Fetch(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Why an item ended up in `Failed`, shown on its control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    FetchFailed,
    SaveFailed,
}

use std::time::Duration;

use url::Url;

use crate::api::ApiConfig;

/// Pacing of downloads, both bulk and single.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Pause after every bulk item, whatever its outcome.
    pub inter_item_pause: Duration,
    /// A cooldown follows every `cooldown_every`th completed bulk item.
    pub cooldown_every: usize,
    pub cooldown_pause: Duration,
    /// How long a finished item control shows its outcome before resetting.
    pub reset_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            inter_item_pause: Duration::from_millis(1350),
            cooldown_every: 11,
            cooldown_pause: Duration::from_millis(5000),
            reset_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub mutation_delay: Duration,
    pub scroll_settle: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            mutation_delay: Duration::from_millis(100),
            scroll_settle: Duration::from_millis(300),
        }
    }
}

/// Element ids of the candidate item containers, in lookup order.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub primary: String,
    /// The first fallback is the compact layout's container.
    pub fallbacks: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            primary: "thumbs2".to_string(),
            fallbacks: ["thumbs", "thumbs1", "thumbs3", "thumbs4"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiConfig,
    pub pacing: PacingConfig,
    pub watch: WatchConfig,
    pub containers: ContainerConfig,
    pub allowed_host: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            pacing: PacingConfig::default(),
            watch: WatchConfig::default(),
            containers: ContainerConfig::default(),
            allowed_host: "zerochan.net".to_string(),
        }
    }
}

impl EngineConfig {
    /// Whether the engine should attach itself to a page at `page_url`.
    pub fn is_active_on(&self, page_url: &str) -> bool {
        let Ok(url) = Url::parse(page_url) else {
            return false;
        };
        if url.scheme() != "https" {
            return false;
        }
        match url.host_str() {
            Some(host) => {
                host == self.allowed_host
                    || host
                        .strip_suffix(self.allowed_host.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }
            None => false,
        }
    }
}

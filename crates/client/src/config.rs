use std::time::Duration;

/// Default autosave debounce.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1_500;
/// Accepted autosave debounce range.
pub const MIN_AUTOSAVE_DELAY_MS: u64 = 1_000;
pub const MAX_AUTOSAVE_DELAY_MS: u64 = 2_000;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin without the `/api/v1` suffix, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Bearer token from `/auth/login`.
    pub token: Option<String>,
    /// Trailing-edge delay between the last edit and the save.
    pub autosave_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the autosave delay, clamped to 1000-2000 ms.
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.autosave_delay =
            Duration::from_millis(ms.clamp(MIN_AUTOSAVE_DELAY_MS, MAX_AUTOSAVE_DELAY_MS));
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `TASKDECK_URL`              | `http://localhost:3000` |
    /// | `TASKDECK_TOKEN`            | none                    |
    /// | `TASKDECK_AUTOSAVE_DELAY_MS`| `1500`                  |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TASKDECK_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let mut config = Self::new(base_url);

        if let Ok(token) = std::env::var("TASKDECK_TOKEN") {
            if !token.is_empty() {
                config = config.with_token(token);
            }
        }

        let delay_ms: u64 = std::env::var("TASKDECK_AUTOSAVE_DELAY_MS")
            .unwrap_or_else(|_| DEFAULT_AUTOSAVE_DELAY_MS.to_string())
            .parse()
            .expect("TASKDECK_AUTOSAVE_DELAY_MS must be a valid u64");
        config.with_autosave_delay(Duration::from_millis(delay_ms))
    }

    /// Absolute URL for an `/api/v1` path.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

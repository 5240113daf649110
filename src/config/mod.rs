use dashmap::DashMap;
use std::env;
use std::sync::Arc;

/// Configuration service preloaded from the process environment.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Whether the process runs in production mode (`APP_ENV=production`).
///
/// Advisory logging and unclassified-error logging are suppressed when true.
pub fn production() -> bool {
    env::var("APP_ENV").map(|v| v == "production").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let config = ConfigService::default();
        config.set("GREETING", "hello");
        assert_eq!(config.get("GREETING").as_deref(), Some("hello"));
        assert_eq!(config.get("MISSING"), None);
    }

    #[test]
    fn new_loads_process_environment() {
        // PATH is present in any test environment
        let config = ConfigService::new();
        assert!(config.get("PATH").is_some());
    }
}

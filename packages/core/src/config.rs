//! Service handler configuration.

use serde::Deserialize;

/// Settings shared by every service handler on one channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Origins messages may come from. Empty accepts any origin.
    pub allowed_origins: Vec<String>,

    /// Maximum number of outbound messages held while waiting for the
    /// handshake.
    pub queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            queue_capacity: 1024,
        }
    }
}

impl ServiceConfig {
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_accepts_anything() {
        let config = ServiceConfig::default();
        assert!(config.allows_origin("https://anywhere.example"));
    }

    #[test]
    fn allow_list_is_exact() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"allowed_origins": ["https://host.example"]}"#).unwrap();
        assert!(config.allows_origin("https://host.example"));
        assert!(!config.allows_origin("https://host.example.evil"));
        assert_eq!(config.queue_capacity, 1024);
    }
}

use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_nonempty(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub community_api: String,
    pub quiz_api: String,
    pub allow_anonymous: bool,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn single(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            community_api: base.clone(),
            quiz_api: base,
            allow_anonymous: false,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> Self {
        let community_api = env_nonempty("SHARP_COMMUNITY_API_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let quiz_api = env_nonempty("SHARP_QUIZ_API_ENDPOINT").unwrap_or_else(|| community_api.clone());
        let timeout_secs = env_nonempty("SHARP_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        Self {
            community_api,
            quiz_api,
            allow_anonymous: env_flag("SHARP_ALLOW_ANONYMOUS"),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn allow_anonymous(mut self, allow: bool) -> Self {
        self.allow_anonymous = allow;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub local_state_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            local_state_path: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_nonempty("SHARP_HOST").unwrap_or(defaults.host),
            port: env_nonempty("SHARP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            local_state_path: env_nonempty("LOCAL_STATE_PATH"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_endpoint_serves_both_apis() {
        let cfg = ClientConfig::single("http://localhost:9000").allow_anonymous(true);
        assert_eq!(cfg.community_api, cfg.quiz_api);
        assert!(cfg.allow_anonymous);
    }

    #[test]
    fn server_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert!(cfg.local_state_path.is_none());
    }
}

//! API server configuration.

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// CORS origins ("*" allows any)
    pub cors_origins: Vec<String>,
    /// Max accepted upload body, bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 2 * 1024 * 1024 * 1024,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(default.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or(default.cors_origins),
            // The body limit tracks the source-size limit so oversized
            // uploads are refused at the framework layer too
            max_body_size: clipsmith_media::FetchLimits::from_env().max_size as usize,
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
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }
}

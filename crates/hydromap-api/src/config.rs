use std::env;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// HTTP server configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let host = env::var("HYDROMAP_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match env::var("HYDROMAP_PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid HYDROMAP_PORT, using {}", DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let cors_origins = env::var("HYDROMAP_CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| parse_origins(DEFAULT_CORS_ORIGINS));

        Self { host, port, cors_origins }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

//! Configuration management for CodeVault.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). A missing third-party key never aborts startup: the endpoint that
//! needs it answers with a 500 and a remediation message instead.

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Origins allowed when `CORS_ORIGIN` is unset.
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://127.0.0.1:5173,http://localhost:3000,http://127.0.0.1:3000";

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub supabase: SupabaseConfig,
    pub gemini: GeminiConfig,
    pub youtube: YouTubeConfig,
    pub github: GitHubConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment ("development" or "production").
    pub environment: String,
    /// Directory holding the bundled frontend.
    pub frontend_dist: String,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for note attachments.
    pub attachments_path: String,
    pub max_attachment_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
    /// HS256 secret used to verify access tokens.
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

/// Repository search. The token is optional and only raises rate limits.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "3000").parse().unwrap_or(3000),
                environment: env_or("APP_ENV", "development"),
                frontend_dist: env_or("FRONTEND_DIST", "../frontend/dist"),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&env_or("CORS_ORIGIN", DEFAULT_CORS_ORIGINS)),
            },
            database: DatabaseConfig {
                path: env_or("DATABASE_PATH", "./data/codevault.db"),
            },
            storage: StorageConfig {
                attachments_path: env_or("ATTACHMENTS_PATH", "./data/notes_attachments"),
                max_attachment_size: env_or("MAX_ATTACHMENT_SIZE", "20971520")
                    .parse()
                    .unwrap_or(20 * 1024 * 1024), // 20MB
            },
            supabase: SupabaseConfig {
                url: env_opt("SUPABASE_URL"),
                service_key: env_opt("SUPABASE_SERVICE_KEY"),
                jwt_secret: env_opt("SUPABASE_JWT_SECRET"),
            },
            gemini: GeminiConfig {
                api_key: env_opt("GEMINI_API_KEY"),
                model: env_or("GEMINI_MODEL", "gemini-flash-latest"),
                base_url: env_or(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
            },
            youtube: YouTubeConfig {
                api_key: env_opt("YOUTUBE_API_KEY"),
                base_url: env_or("YOUTUBE_API_BASE", "https://www.googleapis.com/youtube/v3"),
            },
            github: GitHubConfig {
                token: env_opt("GITHUB_TOKEN"),
                base_url: env_or("GITHUB_API_BASE", "https://api.github.com"),
            },
        }
    }

    /// Configuration for tests and embedding: in-memory database, no
    /// third-party keys, default local origins.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "development".to_string(),
                frontend_dist: "./frontend/dist".to_string(),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            },
            database: DatabaseConfig {
                path: ":memory:".to_string(),
            },
            storage: StorageConfig {
                attachments_path: std::env::temp_dir()
                    .join(format!("codevault-test-{}", uuid::Uuid::new_v4()))
                    .to_string_lossy()
                    .into_owned(),
                max_attachment_size: 1024 * 1024,
            },
            supabase: SupabaseConfig::default(),
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-flash-latest".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
            },
            youtube: YouTubeConfig {
                api_key: None,
                base_url: "http://127.0.0.1:9".to_string(),
            },
            github: GitHubConfig {
                token: None,
                base_url: "http://127.0.0.1:9".to_string(),
            },
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional variable, treating an empty value as unset.
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_drops_blanks() {
        let origins = parse_origins(" http://a.test , ,http://b.test,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_default_origins_allow_local_dev() {
        let cors = CorsConfig {
            allowed_origins: parse_origins(DEFAULT_CORS_ORIGINS),
        };
        assert!(cors.is_allowed("http://localhost:5173"));
        assert!(cors.is_allowed("http://127.0.0.1:3000"));
        assert!(!cors.is_allowed("http://evil.example"));
    }

    #[test]
    fn test_production_flag_is_case_insensitive() {
        let mut server = Config::for_testing().server;
        assert!(!server.is_production());
        server.environment = "Production".to_string();
        assert!(server.is_production());
    }
}

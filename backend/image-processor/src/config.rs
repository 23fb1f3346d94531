/// Configuration management for image-processor
///
/// Loads configuration from environment variables with sensible defaults.
/// The destination bucket and the counter table are optional at load time:
/// their absence is reported per notification, not at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub counter: CounterConfig,
    pub processing: ProcessingConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
    /// Bucket receiving the derived renditions
    pub destination_bucket: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CounterConfig {
    /// Table holding the per-array processed counts
    pub table_name: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProcessingConfig {
    /// Withhold the processed-count increment when any rendition is missing
    pub strict_renditions: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let endpoint = non_empty_var("S3_ENDPOINT");
        Config {
            app: AppConfig {
                host: std::env::var("IMAGE_PROCESSOR_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("IMAGE_PROCESSOR_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8084),
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            storage: StorageConfig {
                region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                force_path_style: env_flag("S3_FORCE_PATH_STYLE").unwrap_or(endpoint.is_some()),
                endpoint,
                access_key_id: non_empty_var("AWS_ACCESS_KEY_ID"),
                secret_access_key: non_empty_var("AWS_SECRET_ACCESS_KEY"),
                destination_bucket: non_empty_var("SERVING_BUCKET"),
            },
            counter: CounterConfig {
                table_name: non_empty_var("DYNAMODB_TABLE_NAME"),
                endpoint: non_empty_var("DYNAMODB_ENDPOINT"),
            },
            processing: ProcessingConfig {
                strict_renditions: env_flag("STRICT_RENDITIONS").unwrap_or(false),
            },
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> Option<bool> {
    non_empty_var(name).and_then(|v| parse_flag(&v))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_is_production() {
        let app = AppConfig {
            host: "0.0.0.0".into(),
            port: 8084,
            env: "Production".into(),
        };
        assert!(app.is_production());
    }
}

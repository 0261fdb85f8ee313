use crate::defaults;
use crate::error::ChunkscribeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognition: RecognitionConfig,
    pub transcoder: TranscoderConfig,
}

/// Remote speech service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; `/up` and `/down` are appended for the two streams.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub client: String,
    /// Timeout applied to each stream of each attempt.
    pub timeout_secs: u64,
}

/// Defaults for every recognition run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    pub max_segment_duration: f64,
    pub max_retries: u32,
    pub max_concurrency: usize,
    pub language: String,
    pub sample_rate: u32,
}

/// External transcoder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscoderConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Directory for temporary segment files (system temp dir when unset).
    pub scratch_dir: Option<PathBuf>,
}

/// Per-invocation overrides layered on top of [`RecognitionConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionOverrides {
    pub max_segment_duration: Option<f64>,
    pub max_retries: Option<u32>,
    pub max_concurrency: Option<usize>,
    pub language: Option<String>,
    pub sample_rate: Option<u32>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::SERVICE_ENDPOINT.to_string(),
            api_key: None,
            client: defaults::SERVICE_CLIENT.to_string(),
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            max_segment_duration: defaults::MAX_SEGMENT_DURATION_SECS,
            max_retries: defaults::MAX_RETRIES,
            max_concurrency: defaults::MAX_CONCURRENCY,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: defaults::FFMPEG.to_string(),
            ffprobe: defaults::FFPROBE.to_string(),
            scratch_dir: None,
        }
    }
}

impl RecognitionConfig {
    /// Return a copy with every `Some` override applied.
    pub fn merge(&self, overrides: &RecognitionOverrides) -> Self {
        Self {
            max_segment_duration: overrides
                .max_segment_duration
                .unwrap_or(self.max_segment_duration),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
            max_concurrency: overrides.max_concurrency.unwrap_or(self.max_concurrency),
            language: overrides
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
            sample_rate: overrides.sample_rate.unwrap_or(self.sample_rate),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(ChunkscribeError::from)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CHUNKSCRIBE_API_KEY → service.api_key
    /// - CHUNKSCRIBE_ENDPOINT → service.endpoint
    /// - CHUNKSCRIBE_LANGUAGE → recognition.language
    /// - CHUNKSCRIBE_FFMPEG → transcoder.ffmpeg
    /// - CHUNKSCRIBE_FFPROBE → transcoder.ffprobe
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("CHUNKSCRIBE_API_KEY")
            && !key.is_empty()
        {
            self.service.api_key = Some(key);
        }

        if let Ok(endpoint) = std::env::var("CHUNKSCRIBE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.service.endpoint = endpoint;
        }

        if let Ok(language) = std::env::var("CHUNKSCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.recognition.language = language;
        }

        if let Ok(ffmpeg) = std::env::var("CHUNKSCRIBE_FFMPEG")
            && !ffmpeg.is_empty()
        {
            self.transcoder.ffmpeg = ffmpeg;
        }

        if let Ok(ffprobe) = std::env::var("CHUNKSCRIBE_FFPROBE")
            && !ffprobe.is_empty()
        {
            self.transcoder.ffprobe = ffprobe;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/chunkscribe/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("chunkscribe")
            .join("config.toml")
    }

    /// Serialize the configuration as TOML.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_chunkscribe_env() {
        remove_env("CHUNKSCRIBE_API_KEY");
        remove_env("CHUNKSCRIBE_ENDPOINT");
        remove_env("CHUNKSCRIBE_LANGUAGE");
        remove_env("CHUNKSCRIBE_FFMPEG");
        remove_env("CHUNKSCRIBE_FFPROBE");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.service.endpoint, defaults::SERVICE_ENDPOINT);
        assert_eq!(config.service.api_key, None);
        assert_eq!(config.service.client, "chromium");
        assert_eq!(config.service.timeout_secs, 60);

        assert_eq!(config.recognition.max_segment_duration, 15.0);
        assert_eq!(config.recognition.max_retries, 1);
        assert_eq!(config.recognition.max_concurrency, 20);
        assert_eq!(config.recognition.language, "en-us");
        assert_eq!(config.recognition.sample_rate, 44100);

        assert_eq!(config.transcoder.ffmpeg, "ffmpeg");
        assert_eq!(config.transcoder.ffprobe, "ffprobe");
        assert_eq!(config.transcoder.scratch_dir, None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [service]
            endpoint = "http://localhost:8080/speech"
            api_key = "secret"
            client = "test-client"
            timeout_secs = 5

            [recognition]
            max_segment_duration = 10.0
            max_retries = 3
            max_concurrency = 4
            language = "it-ch"
            sample_rate = 16000

            [transcoder]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
            ffprobe = "/opt/ffmpeg/bin/ffprobe"
            scratch_dir = "/var/tmp/chunks"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.service.endpoint, "http://localhost:8080/speech");
        assert_eq!(config.service.api_key, Some("secret".to_string()));
        assert_eq!(config.service.client, "test-client");
        assert_eq!(config.service.timeout_secs, 5);

        assert_eq!(config.recognition.max_segment_duration, 10.0);
        assert_eq!(config.recognition.max_retries, 3);
        assert_eq!(config.recognition.max_concurrency, 4);
        assert_eq!(config.recognition.language, "it-ch");
        assert_eq!(config.recognition.sample_rate, 16000);

        assert_eq!(config.transcoder.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.transcoder.ffprobe, "/opt/ffmpeg/bin/ffprobe");
        assert_eq!(
            config.transcoder.scratch_dir,
            Some(PathBuf::from("/var/tmp/chunks"))
        );
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [recognition]
            language = "de-de"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.recognition.language, "de-de");
        assert_eq!(config.recognition.max_segment_duration, 15.0);
        assert_eq!(config.service, ServiceConfig::default());
        assert_eq!(config.transcoder, TranscoderConfig::default());
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [service
            endpoint = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[recognition]\nmax_retries = \"many\"\n")
            .unwrap();

        let err = Config::load(temp_file.path()).unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ChunkscribeError>(),
                Some(ChunkscribeError::ConfigParse(_))
            ),
            "unexpected error: {err:#}"
        );
        assert!(err.to_string().starts_with("Failed to parse configuration"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_chunkscribe_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_override_api_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_chunkscribe_env();

        set_env("CHUNKSCRIBE_API_KEY", "from-env");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.api_key, Some("from-env".to_string()));
        assert_eq!(config.recognition.language, "en-us");

        clear_chunkscribe_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_chunkscribe_env();

        set_env("CHUNKSCRIBE_API_KEY", "k");
        set_env("CHUNKSCRIBE_ENDPOINT", "http://127.0.0.1:9000");
        set_env("CHUNKSCRIBE_LANGUAGE", "fr-fr");
        set_env("CHUNKSCRIBE_FFMPEG", "/usr/local/bin/ffmpeg");
        set_env("CHUNKSCRIBE_FFPROBE", "/usr/local/bin/ffprobe");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.api_key, Some("k".to_string()));
        assert_eq!(config.service.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.recognition.language, "fr-fr");
        assert_eq!(config.transcoder.ffmpeg, "/usr/local/bin/ffmpeg");
        assert_eq!(config.transcoder.ffprobe, "/usr/local/bin/ffprobe");

        clear_chunkscribe_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_chunkscribe_env();

        set_env("CHUNKSCRIBE_API_KEY", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.service.api_key, None);

        clear_chunkscribe_env();
    }

    #[test]
    fn test_merge_applies_only_present_overrides() {
        let base = RecognitionConfig::default();
        let merged = base.merge(&RecognitionOverrides {
            max_concurrency: Some(2),
            language: Some("it-ch".to_string()),
            ..Default::default()
        });

        assert_eq!(merged.max_concurrency, 2);
        assert_eq!(merged.language, "it-ch");
        assert_eq!(merged.max_segment_duration, base.max_segment_duration);
        assert_eq!(merged.max_retries, base.max_retries);
        assert_eq!(merged.sample_rate, base.sample_rate);
    }

    #[test]
    fn test_merge_with_no_overrides_is_identity() {
        let base = RecognitionConfig {
            max_segment_duration: 9.0,
            ..Default::default()
        };
        assert_eq!(base.merge(&RecognitionOverrides::default()), base);
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("chunkscribe"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[recognition]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const CONFIG_ENV_VAR: &str = "FEED_SUMMARIES_CONFIG";
const CONFIG_DIR_NAME: &str = "feed-summaries";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feeds_file: PathBuf,
    pub removed_feeds_file: PathBuf,
    pub output_folder: PathBuf,
    pub num_articles: usize,
    pub ollama_model: String,
    #[serde(default = "default_ollama_ip")]
    pub ollama_ip: String,
    #[serde(default = "default_ollama_port")]
    pub ollama_port: u16,
    /// Upper bound on article bytes sent to the model. `None` sends the whole body.
    #[serde(default)]
    pub max_article_chars: Option<usize>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub text_to_speech: TextToSpeechConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextToSpeechConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub voice: String,
    #[serde(default = "default_response_format")]
    pub response_format: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

impl Default for TextToSpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: String::new(),
            model: String::new(),
            voice: String::new(),
            response_format: default_response_format(),
            speed: default_speed(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

fn default_ollama_ip() -> String {
    "localhost".to_string()
}

fn default_ollama_port() -> u16 {
    11434
}

fn default_request_timeout() -> u64 {
    60
}

fn default_response_format() -> String {
    "mp3".to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_tts_timeout() -> u64 {
    300
}

impl Config {
    /// Locate and load the configuration.
    ///
    /// An explicit path wins, then `FEED_SUMMARIES_CONFIG`, then `./config.json`,
    /// then `~/.config/feed-summaries/config.json`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::try_load_dotenv();

        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::locate()?,
        };

        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_json(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(json).context("Failed to parse config JSON")?;

        config.feeds_file = expand_home(&config.feeds_file);
        config.removed_feeds_file = expand_home(&config.removed_feeds_file);
        config.output_folder = expand_home(&config.output_folder);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.num_articles == 0 {
            anyhow::bail!("num_articles must be at least 1");
        }

        if self.ollama_model.trim().is_empty() {
            anyhow::bail!("ollama_model must not be empty");
        }

        if self.max_article_chars == Some(0) {
            anyhow::bail!("max_article_chars must be at least 1 when set");
        }

        let tts = &self.text_to_speech;
        if tts.enabled {
            Url::parse(&tts.endpoint_url).with_context(|| {
                format!(
                    "text_to_speech.endpoint_url is not a valid URL: {:?}",
                    tts.endpoint_url
                )
            })?;

            if !(0.25..=4.0).contains(&tts.speed) {
                anyhow::bail!(
                    "text_to_speech.speed must be between 0.25 and 4.0, got {}",
                    tts.speed
                );
            }

            if tts.response_format.trim().is_empty() {
                anyhow::bail!("text_to_speech.response_format must not be empty");
            }
        }

        Ok(())
    }

    /// Base URL of the Ollama server.
    pub fn ollama_base_url(&self) -> Result<Url> {
        let raw = format!("http://{}:{}/", self.ollama_ip, self.ollama_port);
        Url::parse(&raw).with_context(|| format!("Invalid Ollama host: {}", raw))
    }

    fn locate() -> Result<PathBuf> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Ok(expand_home(Path::new(&path)));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if path.exists() {
                return Ok(path);
            }
        }

        anyhow::bail!(
            "No configuration found.\n\n\
            Create ./config.json or ~/.config/{}/{}, \
            pass --config <path>, or set {}.",
            CONFIG_DIR_NAME,
            CONFIG_FILE_NAME,
            CONFIG_ENV_VAR
        )
    }

    fn try_load_dotenv() {
        // 1. Current directory
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/feed-summaries/.env
        if let Some(config_dir) = dirs::config_dir() {
            let env_path = config_dir.join(CONFIG_DIR_NAME).join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Twilio Conversations credentials and addresses
    pub twilio: TwilioConfig,
    /// OpenAI settings for ingredient extraction
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Spoonacular settings for recipe search
    #[serde(default)]
    pub spoonacular: SpoonacularConfig,
    /// On-disk storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Read-only saved-recipes web page
    #[serde(default)]
    pub viewer: ViewerConfig,
    /// Message polling behavior
    #[serde(default)]
    pub poll: PollConfig,
}

/// Twilio Conversations API configuration. The `user_whatsapp` address is
/// both the single conversation participant and the persistence key.
#[derive(Debug, Deserialize, Clone)]
pub struct TwilioConfig {
    /// API key SID used for basic auth
    pub api_key_sid: String,
    /// API key secret used for basic auth
    pub api_key_secret: String,
    /// Conversations service SID (IS...)
    pub conversation_service_sid: String,
    /// The user's address, e.g. "whatsapp:+491700000000"
    pub user_whatsapp: String,
    /// The Twilio-side proxy address, e.g. "whatsapp:+14155238886"
    pub twilio_whatsapp: String,
    /// Override for the Conversations API endpoint (tests)
    pub base_url: Option<String>,
    /// Override for the media content endpoint (tests)
    pub media_base_url: Option<String>,
}

/// OpenAI chat/vision configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    /// API key (can also be set via OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Model identifier
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Base URL for the API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Spoonacular recipe API configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SpoonacularConfig {
    /// API key (can also be set via SPOONACULAR_API_KEY)
    pub api_key: Option<String>,
    /// Base URL for the API endpoint (tests)
    pub base_url: Option<String>,
}

/// Directories for the JSON store and downloaded media
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_img_dir")]
    pub img_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            img_dir: default_img_dir(),
        }
    }
}

/// Saved-recipes web page configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ViewerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_viewer_port")]
    pub port: u16,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_viewer_port(),
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    /// Seconds between poll ticks
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// How many recent messages each poll fetches (newest first)
    #[serde(default = "default_poll_window")]
    pub window: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            window: default_poll_window(),
        }
    }
}

// Default value functions
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    500
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_img_dir() -> String {
    "img".to_string()
}

fn default_true() -> bool {
    true
}

fn default_viewer_port() -> u16 {
    3007
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_window() -> u32 {
    50
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with NUTRISCAN__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: NUTRISCAN__TWILIO__API_KEY_SID
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Optional config file (can be missing)
            .add_source(File::with_name("config").required(false))
            // Use double underscore for nested: NUTRISCAN__OPENAI__API_KEY
            .add_source(
                Environment::with_prefix("NUTRISCAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

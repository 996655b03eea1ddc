use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ChatscanError, Result};

/// Top-level configuration for the chatscan service.
///
/// Loaded from `chatscan.toml` by default. Each section corresponds to one
/// crate of the workspace, plus the server and logging settings used by the
/// binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatscanConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl ChatscanConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ChatscanConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ChatscanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Text recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable (name on PATH or absolute path).
    pub tesseract_cmd: String,
    /// Tesseract language packs, joined with `+` on the command line.
    pub languages: Vec<String>,
    /// Tokens scoring below this (0.0 to 1.0) are excluded.
    pub min_confidence: f32,
    /// Convert the image to grayscale before recognition.
    pub grayscale: bool,
    /// Tesseract page segmentation mode (`--psm`).
    pub page_segmentation_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            languages: vec!["kor".to_string(), "eng".to_string()],
            min_confidence: 0.3,
            grayscale: true,
            page_segmentation_mode: 3,
        }
    }
}

/// Chat-bubble detection pre-pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Whether to load the detector at startup.
    pub enabled: bool,
    /// Path to a YOLOv8 ONNX export.
    pub model_path: String,
    /// Minimum class score for a box to be kept.
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed.
    pub iou_threshold: f32,
    /// Square model input size in pixels.
    pub input_size: u32,
    /// Upper bound on boxes returned per image.
    pub max_detections: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model_path: "yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: 640,
            max_detections: 100,
        }
    }
}

/// Hosted LLM settings.
///
/// The API key is never stored here; only the name of the environment
/// variable holding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Model used for text chat.
    pub model: String,
    /// Model used for image analysis.
    pub vision_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Reply when no message was provided.
    pub greeting: String,
    /// Reply when the LLM call fails.
    pub fallback_reply: String,
    /// Instruction sent alongside uploaded chat screenshots.
    pub vision_prompt: String,
    /// Prefix of the reply when image analysis fails; the error follows it.
    pub vision_error_prefix: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            vision_model: "gpt-4o".to_string(),
            temperature: 0.0,
            api_key_env: "OPENAI_API_KEY".to_string(),
            greeting: "안녕하세요! 무엇을 도와드릴까요?".to_string(),
            fallback_reply: "죄송합니다. 오류가 발생했습니다.".to_string(),
            vision_prompt: "다음 이미지를 보낸 사람과 받는 사람으로 구분하여 채팅을 분석해서 채팅 내용을 뽑아줘".to_string(),
            vision_error_prefix: "이미지 분석 중 오류가 발생했습니다: ".to_string(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// Returns `None` when the variable is unset or blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ChatscanConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.ocr.languages, vec!["kor", "eng"]);
        assert!((config.ocr.min_confidence - 0.3).abs() < f32::EPSILON);
        assert!(config.ocr.grayscale);
        assert!(!config.detection.enabled);
        assert_eq!(config.detection.input_size, 640);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.vision_model, "gpt-4o");
        assert_eq!(config.llm.temperature, 0.0);
    }

    #[test]
    fn test_llm_default_replies() {
        let llm = LlmConfig::default();
        assert_eq!(llm.greeting, "안녕하세요! 무엇을 도와드릴까요?");
        assert_eq!(llm.fallback_reply, "죄송합니다. 오류가 발생했습니다.");
        assert!(llm.vision_error_prefix.ends_with(": "));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[server]
host = "0.0.0.0"
port = 9100

[ocr]
tesseract_cmd = "/usr/local/bin/tesseract"
languages = ["eng"]
min_confidence = 0.5
grayscale = false
page_segmentation_mode = 6

[detection]
enabled = true
model_path = "/models/bubbles.onnx"
confidence_threshold = 0.4

[llm]
model = "gpt-4o-mini"
temperature = 0.2
"#;
        let file = create_temp_config(content);
        let config = ChatscanConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.ocr.tesseract_cmd, "/usr/local/bin/tesseract");
        assert_eq!(config.ocr.languages, vec!["eng"]);
        assert!((config.ocr.min_confidence - 0.5).abs() < f32::EPSILON);
        assert!(!config.ocr.grayscale);
        assert_eq!(config.ocr.page_segmentation_mode, 6);
        assert!(config.detection.enabled);
        assert_eq!(config.detection.model_path, "/models/bubbles.onnx");
        // Unspecified fields keep their defaults.
        assert_eq!(config.detection.input_size, 640);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.vision_model, "gpt-4o");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[logging]\nlevel = \"debug\"\n");
        let config = ChatscanConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.ocr.tesseract_cmd, "tesseract");
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ChatscanConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = ChatscanConfig::load(file.path());
        assert!(matches!(result, Err(ChatscanError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ChatscanConfig::load_or_default(Path::new("/nonexistent/chatscan.toml"));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chatscan.toml");

        let mut config = ChatscanConfig::default();
        config.server.port = 9999;
        config.ocr.languages = vec!["jpn".to_string()];
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = ChatscanConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 9999);
        assert_eq!(reloaded.ocr.languages, vec!["jpn"]);
        assert_eq!(reloaded.llm.greeting, config.llm.greeting);
    }

    #[test]
    fn test_api_key_reads_configured_env_var() {
        let llm = LlmConfig {
            api_key_env: "CHATSCAN_TEST_KEY_PRESENT".to_string(),
            ..LlmConfig::default()
        };
        std::env::set_var("CHATSCAN_TEST_KEY_PRESENT", "sk-test");
        assert_eq!(llm.api_key().as_deref(), Some("sk-test"));
        std::env::remove_var("CHATSCAN_TEST_KEY_PRESENT");
    }

    #[test]
    fn test_api_key_missing_or_blank() {
        let llm = LlmConfig {
            api_key_env: "CHATSCAN_TEST_KEY_BLANK".to_string(),
            ..LlmConfig::default()
        };
        std::env::remove_var("CHATSCAN_TEST_KEY_BLANK");
        assert!(llm.api_key().is_none());

        std::env::set_var("CHATSCAN_TEST_KEY_BLANK", "   ");
        assert!(llm.api_key().is_none());
        std::env::remove_var("CHATSCAN_TEST_KEY_BLANK");
    }
}

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::warn;

pub const FEATHERLESS_API_KEY: &str = "FEATHERLESS_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub featherless_api_key: String,
    pub featherless_base_url: String,
    pub featherless_model: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_image_model: String,
    pub gemini_aspect_ratio: bool,
    pub pollinations_base_url: String,
    pub pollinations_prefetch: bool,
    pub prompt_temperature: f32,
    pub prompt_max_tokens: u32,
    pub caption_temperature: f32,
    pub caption_max_tokens: u32,
    pub style_temperature: f32,
    pub style_max_tokens: u32,
    pub max_upload_bytes: usize,
    pub http_timeout_seconds: u64,
}

type Vars = HashMap<String, String>;

fn env_bool(vars: &Vars, name: &str, default: bool) -> bool {
    vars.get(name)
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_string(vars: &Vars, name: &str, default: &str) -> String {
    vars.get(name)
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn env_f32(vars: &Vars, name: &str, default: f32) -> f32 {
    vars.get(name)
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u32(vars: &Vars, name: &str, default: u32) -> u32 {
    vars.get(name)
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(vars: &Vars, name: &str, default: u64) -> u64 {
    vars.get(name)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(vars: &Vars, name: &str, default: usize) -> usize {
    vars.get(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_csv(vars: &Vars, name: &str, default: &str) -> Vec<String> {
    vars.get(name)
        .map(String::as_str)
        .unwrap_or(default)
        .split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn normalize_base_url(value: String) -> String {
    value.trim_end_matches('/').to_string()
}

fn normalize_temperature(name: &str, value: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    let clamped = if value.is_nan() { 0.7 } else { value.clamp(0.0, 1.0) };
    warn!("{name}={value} is outside [0, 1]; using {clamped}.");
    clamped
}

impl Config {
    pub fn load() -> Result<Self> {
        let vars: Vars = env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &Vars) -> Result<Self> {
        let port_raw = env_string(vars, "PORT", "8000");
        let port = port_raw
            .parse::<u16>()
            .map_err(|_| anyhow!("PORT must be a valid port number, got {port_raw:?}"))?;

        let max_upload_bytes = env_usize(vars, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            return Err(anyhow!("MAX_UPLOAD_BYTES must be greater than zero"));
        }

        let config = Config {
            host: env_string(vars, "HOST", "0.0.0.0"),
            port,
            log_level: env_string(vars, "LOG_LEVEL", "info"),
            log_dir: PathBuf::from(env_string(vars, "LOG_DIR", "logs")),
            cors_origins: env_csv(
                vars,
                "CORS_ORIGINS",
                "http://localhost:3000,https://*.vercel.app",
            ),
            featherless_api_key: env_string(vars, FEATHERLESS_API_KEY, ""),
            featherless_base_url: normalize_base_url(env_string(
                vars,
                "FEATHERLESS_BASE_URL",
                "https://api.featherless.ai/v1",
            )),
            featherless_model: env_string(
                vars,
                "FEATHERLESS_MODEL",
                "meta-llama/Meta-Llama-3.1-8B-Instruct",
            ),
            gemini_api_key: env_string(vars, GEMINI_API_KEY, ""),
            gemini_base_url: normalize_base_url(env_string(
                vars,
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            )),
            gemini_image_model: env_string(
                vars,
                "GEMINI_IMAGE_MODEL",
                "gemini-2.0-flash-exp",
            ),
            gemini_aspect_ratio: env_bool(vars, "GEMINI_ASPECT_RATIO", false),
            pollinations_base_url: normalize_base_url(env_string(
                vars,
                "POLLINATIONS_BASE_URL",
                "https://image.pollinations.ai",
            )),
            pollinations_prefetch: env_bool(vars, "POLLINATIONS_PREFETCH", false),
            prompt_temperature: normalize_temperature(
                "PROMPT_TEMPERATURE",
                env_f32(vars, "PROMPT_TEMPERATURE", 0.7),
            ),
            prompt_max_tokens: env_u32(vars, "PROMPT_MAX_TOKENS", 400).max(1),
            caption_temperature: normalize_temperature(
                "CAPTION_TEMPERATURE",
                env_f32(vars, "CAPTION_TEMPERATURE", 0.9),
            ),
            caption_max_tokens: env_u32(vars, "CAPTION_MAX_TOKENS", 600).max(1),
            style_temperature: normalize_temperature(
                "STYLE_TEMPERATURE",
                env_f32(vars, "STYLE_TEMPERATURE", 0.5),
            ),
            style_max_tokens: env_u32(vars, "STYLE_MAX_TOKENS", 300).max(1),
            max_upload_bytes,
            http_timeout_seconds: env_u64(vars, "HTTP_TIMEOUT_SECONDS", 120).max(1),
        };

        Ok(config)
    }

    pub fn warn_missing_credentials(&self) {
        if !self.has_text_credentials() {
            warn!("{FEATHERLESS_API_KEY} is not set; generation requests will fail until it is configured.");
        }
        if !self.has_image_credentials() {
            warn!("{GEMINI_API_KEY} is not set; image-conditioned generation is unavailable.");
        }
    }

    pub fn has_text_credentials(&self) -> bool {
        !self.featherless_api_key.trim().is_empty()
    }

    pub fn has_image_credentials(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vars {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = Config::from_vars(&Vars::new()).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.featherless_base_url, "https://api.featherless.ai/v1");
        assert!(!config.has_text_credentials());
        assert!(!config.has_image_credentials());
        assert!(!config.pollinations_prefetch);
    }

    #[test]
    fn reads_credentials_and_trims_base_urls() {
        let config = Config::from_vars(&vars(&[
            (FEATHERLESS_API_KEY, "rc_test"),
            (GEMINI_API_KEY, " g-key "),
            ("GEMINI_BASE_URL", "http://localhost:9000/v1beta/"),
            ("POLLINATIONS_PREFETCH", "TRUE"),
        ]))
        .unwrap();
        assert!(config.has_text_credentials());
        assert_eq!(config.gemini_api_key, "g-key");
        assert_eq!(config.gemini_base_url, "http://localhost:9000/v1beta");
        assert!(config.pollinations_prefetch);
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let config = Config::from_vars(&vars(&[(FEATHERLESS_API_KEY, "   ")])).unwrap();
        assert!(!config.has_text_credentials());
    }

    #[test]
    fn clamps_out_of_range_temperature() {
        let config = Config::from_vars(&vars(&[
            ("PROMPT_TEMPERATURE", "1.8"),
            ("CAPTION_MAX_TOKENS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.prompt_temperature, 1.0);
        assert_eq!(config.caption_max_tokens, 1);
    }

    #[test]
    fn rejects_invalid_port() {
        let err = Config::from_vars(&vars(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn splits_cors_origins() {
        let config = Config::from_vars(&vars(&[(
            "CORS_ORIGINS",
            "http://a.test, ,http://b.test",
        )]))
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}

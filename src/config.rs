use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Genoreport";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest accepted lab report upload (10 MB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OCR_MODEL: &str = "llava";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RENDER_DPI: u32 = 200;

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "genoreport=info,warn"
}

/// Get the application data directory.
/// ~/Genoreport/ unless `GENOREPORT_DATA_DIR` points elsewhere.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("GENOREPORT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Runtime settings for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub ollama_url: String,
    pub ocr_model: String,
    pub ocr_timeout_secs: u64,
    pub render_dpi: u32,
    /// Explicit directory holding the PDFium shared library, if any.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::rooted_at(app_data_dir())
    }
}

impl PipelineSettings {
    /// Settings with every path placed under `root`.
    pub fn rooted_at(root: PathBuf) -> Self {
        Self {
            database_path: root.join("genoreport.db"),
            upload_dir: root.join("uploads"),
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            ocr_model: DEFAULT_OCR_MODEL.into(),
            ocr_timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            render_dpi: DEFAULT_RENDER_DPI,
            pdfium_library_dir: None,
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var("GENOREPORT_OLLAMA_URL") {
            if !url.trim().is_empty() {
                settings.ollama_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(model) = std::env::var("GENOREPORT_OCR_MODEL") {
            if !model.trim().is_empty() {
                settings.ocr_model = model;
            }
        }
        if let Some(dir) = std::env::var_os("PDFIUM_DYNAMIC_LIB_PATH") {
            settings.pdfium_library_dir = Some(PathBuf::from(dir));
        }
        settings
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_settings_keep_paths_together() {
        let root = PathBuf::from("/var/lib/genoreport");
        let settings = PipelineSettings::rooted_at(root.clone());
        assert!(settings.database_path.starts_with(&root));
        assert!(settings.upload_dir.ends_with("uploads"));
        assert_eq!(settings.ocr_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn upload_limit_is_ten_megabytes() {
        assert_eq!(MAX_UPLOAD_BYTES, 10_485_760);
    }

    #[test]
    fn settings_serialize() {
        let settings = PipelineSettings::rooted_at(PathBuf::from("/tmp/g"));
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"ocr_model\":\"llava\""));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}

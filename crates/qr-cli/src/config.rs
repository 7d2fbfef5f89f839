//! Generator defaults loaded from `.env` and `QR_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use qr_engine::watermark::DEFAULT_DECODE_TIMEOUT;
use qr_engine::{Color, ErrorCorrection, OutputFormat, QrStyle};

/// Defaults applied before command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub style: QrStyle,
    pub logo_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            style: QrStyle::default(),
            logo_timeout: DEFAULT_DECODE_TIMEOUT,
        }
    }
}

impl GeneratorConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys keep their defaults;
    /// unparseable values are logged and ignored.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let style = defaults.style;

        let style = QrStyle {
            pixel_width: parse_or(&get, "QR_PIXEL_WIDTH", style.pixel_width),
            module_color: parse_or::<Color>(&get, "QR_MODULE_COLOR", style.module_color),
            background_color: parse_or::<Color>(
                &get,
                "QR_BACKGROUND_COLOR",
                style.background_color,
            ),
            margin_modules: parse_or(&get, "QR_MARGIN", style.margin_modules),
            error_correction: parse_or::<ErrorCorrection>(
                &get,
                "QR_ERROR_CORRECTION",
                style.error_correction,
            ),
            output_format: parse_or::<OutputFormat>(&get, "QR_OUTPUT_FORMAT", style.output_format),
        };

        let timeout_ms = parse_or(
            &get,
            "QR_LOGO_TIMEOUT_MS",
            defaults.logo_timeout.as_millis() as u64,
        );

        Self {
            style,
            logo_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get(key) else {
        return default;
    };
    if raw.trim().is_empty() {
        return default;
    }
    match raw.trim().parse() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Ignoring {key}={raw:?}: {e}");
            default
        }
    }
}

/// Load the first `.env` found in the working directory or its parents.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::debug!("No .env file found, using system environment variables");
}

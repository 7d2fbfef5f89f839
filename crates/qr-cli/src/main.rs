//! `lunr-qr`: generate a QR code image for a short link.
//!
//! Settings are layered: built-in defaults, then `QR_*` environment
//! variables (optionally from `.env`), then a `--style` JSON file, then
//! individual flags. Without `--out` the image is printed as a data URL.

mod config;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qr_engine::{
    Color, Compositor, EncodedImage, ErrorCorrection, GenerateRequest, LogoSource, OutputFormat,
    QrStyle, WatermarkConfig, generate,
};

use config::GeneratorConfig;

#[derive(Debug, Parser)]
#[command(name = "lunr-qr", version, about = "Generate a QR code, optionally with a logo")]
struct Args {
    /// Text or URL to encode.
    payload: String,

    /// Output file. The format follows the extension unless --format is given.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// JSON style file, e.g. {"pixelWidth": 300, "moduleColor": "#1d4ed8"}.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Image width in pixels.
    #[arg(short, long)]
    width: Option<u32>,

    /// Dark module color (#RGB, #RRGGBB, #RRGGBBAA).
    #[arg(long)]
    module_color: Option<Color>,

    /// Light module and quiet-zone color.
    #[arg(long)]
    background_color: Option<Color>,

    /// Quiet-zone width in modules.
    #[arg(long)]
    margin: Option<u32>,

    /// Error correction level: L, M, Q or H. Forced to H with a logo.
    #[arg(short, long)]
    error_correction: Option<ErrorCorrection>,

    /// Output format: raster (png) or vector (svg). Forced to raster with a logo.
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Logo file path or http(s) URL to place in the center.
    #[arg(long)]
    logo: Option<String>,
}

impl Args {
    fn resolve_style(&self, base: QrStyle) -> anyhow::Result<QrStyle> {
        let mut style = match &self.style {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read style file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid style file {}", path.display()))?
            }
            None => base,
        };

        if let Some(v) = self.width {
            style.pixel_width = v;
        }
        if let Some(v) = self.module_color {
            style.module_color = v;
        }
        if let Some(v) = self.background_color {
            style.background_color = v;
        }
        if let Some(v) = self.margin {
            style.margin_modules = v;
        }
        if let Some(v) = self.error_correction {
            style.error_correction = v;
        }
        match (self.format, self.out.as_deref().and_then(format_from_extension)) {
            (Some(v), _) | (None, Some(v)) => style.output_format = v,
            (None, None) => {}
        }

        Ok(style)
    }

    fn logo_source(&self) -> Option<LogoSource> {
        self.logo.as_deref().map(|logo| {
            if logo.starts_with("http://") || logo.starts_with("https://") {
                LogoSource::url(logo)
            } else {
                LogoSource::file(logo)
            }
        })
    }
}

fn format_from_extension(path: &Path) -> Option<OutputFormat> {
    path.extension()?.to_str()?.parse().ok()
}

/// Where to write `image`. A logo forces raster output, so an `.svg` target
/// gets its extension swapped to match the bytes actually produced.
fn output_path(requested: &Path, image: &EncodedImage) -> PathBuf {
    match format_from_extension(requested) {
        Some(format) if format != image.format() => {
            let path = requested.with_extension(image.file_extension());
            tracing::warn!(
                requested = %requested.display(),
                actual = %path.display(),
                format = %image.format(),
                "Output format differs from file extension, writing to adjusted path"
            );
            path
        }
        _ => requested.to_path_buf(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    config::load_dotenv();
    let config = GeneratorConfig::from_env();
    let style = args.resolve_style(config.style.clone())?;

    let compositor = Compositor::new(
        WatermarkConfig::default().with_decode_timeout(Some(config.logo_timeout)),
    );

    let mut request = GenerateRequest::new(args.payload.clone(), style);
    if let Some(logo) = args.logo_source() {
        request = request.with_logo(logo);
    }

    let image = generate(request, &compositor)
        .await
        .context("failed to generate QR code")?;

    match &args.out {
        Some(requested) => {
            let path = output_path(requested, &image);
            tokio::fs::write(&path, image.data())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                format = %image.format(),
                width = image.pixel_width(),
                "Wrote QR code"
            );
        }
        None => println!("{}", image.to_data_url()),
    }

    Ok(())
}

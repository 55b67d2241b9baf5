#![doc = include_str!("../README.md")]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use fontpull::{
    Downloader, DownloaderConfig, FontDisplay, FontFamilyQuery, FontsApi, GoogleFontsRequest,
    VariantSpec,
};

mod progress;

#[derive(Parser, Debug)]
#[command(name = "fontpull")]
#[command(about = "Build, parse and self-host Google Fonts stylesheets")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stylesheet URL for a set of families
    Build {
        /// Families as a JSON object, e.g. '{"Roboto": [300, 700], "Lato": true}'
        #[arg(long)]
        families: Option<String>,

        /// Family to request in its regular style (repeatable)
        #[arg(long, short = 'f')]
        family: Vec<String>,

        /// font-display strategy (auto, block, swap, fallback, optional)
        #[arg(long, short = 'd')]
        display: Option<FontDisplay>,

        /// Character subsets; switches to the v1 API
        #[arg(long, short = 's')]
        subset: Vec<String>,

        /// Only include glyphs for this text
        #[arg(long, short = 't')]
        text: Option<String>,
    },

    /// Print the families and options encoded in a stylesheet URL as JSON
    Parse {
        /// Google Fonts stylesheet URL
        url: String,
    },

    /// Download a stylesheet and its fonts, rewriting it to use local copies
    Download {
        /// Google Fonts stylesheet URL
        url: String,

        /// JSON file with downloader settings; flags below override it
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Stylesheet path, relative to the output directory
        #[arg(long)]
        stylesheet: Option<PathBuf>,

        /// Font directory, relative to the output directory
        #[arg(long)]
        fonts_dir: Option<PathBuf>,

        /// Path the stylesheet uses to reference the fonts
        #[arg(long)]
        fonts_prefix: Option<String>,

        /// Inline fonts as base64 data URIs instead of writing font files
        #[arg(long)]
        base64: bool,

        /// Treat the run as a replacement of any existing stylesheet
        #[arg(long)]
        overwrite: bool,

        /// Extra request header, `name: value` (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
    },
}

fn build(
    families: Option<String>,
    family: Vec<String>,
    display: Option<FontDisplay>,
    subsets: Vec<String>,
    text: Option<String>,
) -> Result<String> {
    let families: FontFamilyQuery = match families {
        Some(json) => serde_json::from_str(&json).wrap_err("Invalid --families JSON")?,
        None => FontFamilyQuery::new(),
    };

    let mut request = GoogleFontsRequest {
        families,
        display,
        subsets,
        text,
    };
    for name in family {
        request = request.family(name, VariantSpec::Present(true));
    }

    Ok(FontsApi::default().try_build_url(&request)?)
}

fn parse_header(header: &str) -> Result<(String, String)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| eyre!("Invalid header {:?}, expected `name: value`", header))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy()
                .add_directive("hyper=warn".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "Starting fontpull");

    match args.command {
        Command::Build {
            families,
            family,
            display,
            subset,
            text,
        } => {
            let url = build(families, family, display, subset, text)?;
            println!("{}", url);
        }
        Command::Parse { url } => {
            let request = fontpull::parse_url(&url);
            if request.is_empty() {
                return Err(eyre!("Not a Google Fonts stylesheet URL with families: {}", url));
            }
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Command::Download {
            url,
            config,
            output,
            stylesheet,
            fonts_dir,
            fonts_prefix,
            base64,
            overwrite,
            headers,
        } => {
            let mut config: DownloaderConfig = match config {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .wrap_err_with(|| format!("Failed to read config: {}", path.display()))?;
                    serde_json::from_str(&json)
                        .wrap_err_with(|| format!("Invalid config: {}", path.display()))?
                }
                None => DownloaderConfig::default(),
            };
            if let Some(output) = output {
                config.output_directory = output;
            }
            if let Some(stylesheet) = stylesheet {
                config.stylesheet_relative_path = stylesheet;
            }
            if let Some(fonts_dir) = fonts_dir {
                config.fonts_subdirectory = fonts_dir;
            }
            if let Some(fonts_prefix) = fonts_prefix {
                config.fonts_url_prefix = fonts_prefix;
            }
            config.inline_as_base64 |= base64;
            config.overwrite_existing |= overwrite;
            for header in &headers {
                config.request_headers.push(parse_header(header)?);
            }

            let downloader = Downloader::new(url, config)?;
            let report = downloader
                .execute_with_hooks(&progress::LogHooks)
                .await
                .wrap_err_with(|| format!("Failed to download {}", downloader.url()))?;

            if report.overwriting {
                tracing::info!("Source URL changed; font files from the previous run were kept");
            }
            tracing::info!(
                "Downloaded {} font files into {}",
                report.fonts.len(),
                report.stylesheet_path.display()
            );
        }
    }

    Ok(())
}

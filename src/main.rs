use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::error;

use notesnap::{Converter, RenderConfig, Theme, Viewport};

#[derive(Parser)]
#[command(name = "notesnap")]
#[command(version)]
#[command(about = "Render markdown notes into per-section PNG cards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every section to a PNG with headless Chrome
    Render {
        #[command(flatten)]
        common: CommonArgs,

        /// Viewport width in pixels
        #[arg(long, default_value_t = 1080)]
        width: u32,

        /// Viewport height in pixels (also the maximum image height)
        #[arg(long, default_value_t = 1920)]
        height: u32,

        /// Minimum image height in pixels
        #[arg(long, default_value_t = 800)]
        min_height: u32,

        /// Upper bound on waiting for the page to go idle, in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 30000)]
        idle_timeout: u64,

        /// Attempts per browser operation before giving up
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },

    /// Print the split blocks as JSON
    Split {
        /// Markdown input
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Write the generated HTML pages without launching a browser
    Html {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Markdown input
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (created if absent)
    #[arg(short, long, value_name = "DIR", default_value = "output_images")]
    out: PathBuf,

    /// Theme JSON file; omitted fields keep their defaults
    #[arg(long, value_name = "FILE")]
    theme: Option<PathBuf>,

    /// Directory local images are resolved against (default: the input's directory)
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Syntax highlighting theme name
    #[arg(long, value_name = "NAME")]
    code_theme: Option<String>,

    /// Watermark text (empty string disables it)
    #[arg(long, value_name = "TEXT")]
    watermark: Option<String>,
}

impl CommonArgs {
    fn config(&self) -> anyhow::Result<RenderConfig> {
        let mut theme = match &self.theme {
            Some(path) => Theme::from_path(path)?,
            None => Theme::default(),
        };
        if let Some(name) = &self.code_theme {
            theme.code_theme = name.clone();
        }
        if let Some(mark) = &self.watermark {
            theme.watermark = if mark.is_empty() { None } else { Some(mark.clone()) };
        }

        Ok(RenderConfig {
            out_dir: self.out.clone(),
            base_dir: self.base_dir.clone(),
            theme,
            ..Default::default()
        })
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Render {
            common,
            width,
            height,
            min_height,
            idle_timeout,
            retries,
        } => {
            let mut config = common.config()?;
            config.capture.viewport = Viewport { width, height };
            config.capture.min_height = min_height;
            config.capture.idle_timeout = Duration::from_millis(idle_timeout);
            config.capture.retry.max_attempts = retries;
            cmd_render(&common.input, config)
        }
        Commands::Split { input } => cmd_split(&input),
        Commands::Html { common } => {
            let converter = Converter::new(common.config()?)?;
            let written = converter
                .write_html(&common.input)
                .with_context(|| format!("rendering {}", common.input.display()))?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

#[cfg(feature = "cdp")]
fn cmd_render(input: &Path, config: RenderConfig) -> anyhow::Result<()> {
    let converter = Converter::new(config)?;
    let written = converter
        .convert_file(input, &notesnap::CancelToken::new())
        .with_context(|| format!("converting {}", input.display()))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(not(feature = "cdp"))]
fn cmd_render(_input: &Path, _config: RenderConfig) -> anyhow::Result<()> {
    anyhow::bail!("notesnap was built without the `cdp` feature; use `notesnap html` instead")
}

fn cmd_split(input: &Path) -> anyhow::Result<()> {
    let converter = Converter::new(RenderConfig::default())?;
    let blocks = converter.read_blocks(input)?;
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

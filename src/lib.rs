//! notesnap
//!
//! Turns a markdown document into a series of PNG cards, one per section,
//! suitable for social sharing.
//!
//! # Pipeline
//!
//! - **Splitter**: cuts the document into a cover and one block per `##` section
//! - **Markup renderer**: markdown to a themed, self-contained HTML page with
//!   highlighted code and inlined local images
//! - **Capturer**: drives a rendering [`Surface`] (headless Chrome by default)
//!   through load, idle wait, measure, resize and screenshot
//!
//! # Example
//!
//! ```no_run
//! use notesnap::{CancelToken, Converter, RenderConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RenderConfig {
//!     out_dir: "cards".into(),
//!     ..Default::default()
//! };
//!
//! let converter = Converter::new(config)?;
//! let written = converter.convert_file("notes.md".as_ref(), &CancelToken::new())?;
//! println!("wrote {} images", written.len());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod convert;
pub mod markup;
pub mod page;
pub mod splitter;
pub mod theme;

// Headless Chrome surface
#[cfg(feature = "cdp")]
pub mod cdp;

pub use capture::{adjusted_height, CancelToken, CaptureConfig, Capturer, RetryPolicy, Surface, SurfaceGuard};
pub use convert::Converter;
pub use markup::MarkupRenderer;
pub use page::{PageBuilder, RenderedPage};
pub use splitter::{split_document, Block, BlockKind};
pub use theme::{ChromeStyle, Theme};

#[cfg(feature = "cdp")]
pub use cdp::CdpSurface;

/// Configuration for a conversion run
///
/// Built once at startup and passed by reference to every stage.
///
/// # Examples
///
/// ```
/// let cfg = notesnap::RenderConfig::default();
/// assert_eq!(cfg.capture.viewport.width, 1080);
/// assert_eq!(cfg.out_dir, std::path::PathBuf::from("output_images"));
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Directory receiving `cover.png` and `note_NN.png`
    pub out_dir: PathBuf,
    /// Directory local image paths are resolved against.
    /// `None` means the input file's directory.
    pub base_dir: Option<PathBuf>,
    pub theme: Theme,
    pub capture: CaptureConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("output_images"),
            base_dir: None,
            theme: Theme::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        self.theme.validate()?;
        self.capture.validate()
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.capture.viewport.width, 1080);
        assert_eq!(config.capture.viewport.height, 1920);
        assert_eq!(config.capture.min_height, 800);
        assert!(config.base_dir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_capture_config_is_rejected() {
        let config = RenderConfig {
            capture: CaptureConfig {
                viewport: Viewport { width: 1080, height: 0 },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}

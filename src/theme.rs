//! Visual theme for rendered notes.
//!
//! Every value here ends up inside the generated stylesheet, so a theme is
//! validated once (`Theme::validate`) before any page is built.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Window chrome drawn around code blocks
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChromeStyle {
    pub padding: String,
    pub border_radius: String,
    pub shadow: String,
}

impl Default for ChromeStyle {
    fn default() -> Self {
        Self {
            padding: "48px".to_string(),
            border_radius: "10px".to_string(),
            shadow: "rgba(0, 0, 0, 0.55) 0px 8px 24px".to_string(),
        }
    }
}

/// Colors, fonts and decorations applied to every page
///
/// Themes are usually the default or loaded from a JSON file where any
/// field may be omitted:
///
/// ```
/// let theme: notesnap::Theme = serde_json::from_str(r##"{"accent_color": "#ffb86c"}"##).unwrap();
/// assert_eq!(theme.accent_color, "#ffb86c");
/// assert_eq!(theme.background, notesnap::Theme::default().background);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Page background behind the content panel
    pub background: String,
    /// Background of the content panel
    pub panel_background: String,
    pub text_color: String,
    /// Heading, link and watermark color
    pub accent_color: String,
    /// Heading underline and blockquote rule color
    pub border_color: String,
    pub font_family: String,
    /// Stylesheet imported for the font (http or https only)
    pub font_import_url: Option<String>,
    /// Text stamped in the bottom-right corner
    pub watermark: Option<String>,
    /// Name of a syntect theme from the bundled set
    pub code_theme: String,
    pub decorative_elements: bool,
    pub chrome: ChromeStyle,
    pub base_font_size_px: u32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: "#a6b2bd".to_string(),
            panel_background: "#151718".to_string(),
            text_color: "#e6e6e6".to_string(),
            accent_color: "#7ec4ff".to_string(),
            border_color: "#3f72af".to_string(),
            font_family: "'LXGW WenKai Screen', sans-serif".to_string(),
            font_import_url: Some(
                "https://cdn.staticfile.org/lxgw-wenkai-screen-webfont/1.6.0/lxgwwenkaiscreen.css".to_string(),
            ),
            watermark: Some("notesnap".to_string()),
            code_theme: "base16-ocean.dark".to_string(),
            decorative_elements: true,
            chrome: ChromeStyle::default(),
            base_font_size_px: 22,
        }
    }
}

impl Theme {
    /// Load a theme from a JSON file and validate it
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::InputError {
            path: path.to_path_buf(),
            source,
        })?;
        let theme: Theme = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("Invalid theme file {}: {}", path.display(), e)))?;
        theme.validate()?;
        Ok(theme)
    }

    /// Check every value that is spliced into CSS.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("background", &self.background),
            ("panel_background", &self.panel_background),
            ("text_color", &self.text_color),
            ("accent_color", &self.accent_color),
            ("border_color", &self.border_color),
            ("font_family", &self.font_family),
            ("chrome.padding", &self.chrome.padding),
            ("chrome.border_radius", &self.chrome.border_radius),
            ("chrome.shadow", &self.chrome.shadow),
        ];
        for (field, value) in values {
            check_css_value(field, value)?;
        }

        if self.code_theme.trim().is_empty() {
            return Err(Error::ConfigError("code_theme must not be empty".into()));
        }
        if !FONT_SIZE_RANGE.contains(&self.base_font_size_px) {
            return Err(Error::ConfigError(format!(
                "base_font_size_px must be within {}..={}, got {}",
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end(),
                self.base_font_size_px
            )));
        }

        if let Some(raw) = &self.font_import_url {
            let parsed = url::Url::parse(raw)
                .map_err(|e| Error::ConfigError(format!("font_import_url {:?} is not a valid URL: {}", raw, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(Error::ConfigError(format!(
                    "font_import_url must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }
}

const FONT_SIZE_RANGE: std::ops::RangeInclusive<u32> = 1..=512;

/// A CSS declaration value must not be able to end its declaration or rule.
fn check_css_value(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ConfigError(format!("{} must not be empty", field)));
    }
    if let Some(bad) = value.chars().find(|c| matches!(c, ';' | '{' | '}' | '<' | '>' | '\n' | '\r' | '\\')) {
        return Err(Error::ConfigError(format!(
            "{} contains forbidden character {:?}: {:?}",
            field, bad, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_theme_is_valid() {
        Theme::default().validate().unwrap();
    }

    #[test]
    fn rejects_values_that_escape_the_declaration() {
        let theme = Theme {
            background: "red; } body { display:none".to_string(),
            ..Default::default()
        };
        let err = theme.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref m) if m.contains("background")));

        let theme = Theme {
            chrome: ChromeStyle {
                shadow: "</style><script>".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(theme.validate().is_err());
    }

    #[test]
    fn rejects_non_http_font_import() {
        let theme = Theme {
            font_import_url: Some("javascript:alert(1)".to_string()),
            ..Default::default()
        };
        assert!(theme.validate().is_err());

        let theme = Theme {
            font_import_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(theme.validate().is_err());

        let theme = Theme {
            font_import_url: None,
            ..Default::default()
        };
        theme.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_font_size() {
        let theme: Theme = serde_json::from_str(r#"{"base_font_size_px": 4000000000}"#).unwrap();
        let err = theme.validate().unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref m) if m.contains("base_font_size_px")));

        let theme = Theme {
            base_font_size_px: 0,
            ..Default::default()
        };
        assert!(theme.validate().is_err());

        let theme = Theme {
            base_font_size_px: 512,
            ..Default::default()
        };
        theme.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let theme: Theme =
            serde_json::from_str(r#"{"watermark": null, "chrome": {"padding": "24px"}}"#).unwrap();
        assert_eq!(theme.watermark, None);
        assert_eq!(theme.chrome.padding, "24px");
        assert_eq!(theme.chrome.border_radius, "10px");
        assert_eq!(theme.code_theme, "base16-ocean.dark");
    }

    #[test]
    fn from_path_reports_invalid_json_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Theme::from_path(&path), Err(Error::ConfigError(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(Theme::from_path(&missing), Err(Error::InputError { .. })));
    }
}

//! Page assembly: wraps a rendered fragment in a complete HTML document.
//!
//! The stylesheet is built rule by rule from validated theme values and any
//! text placed in markup is escaped, so neither the theme nor the note body
//! can change the shape of the surrounding document.

use crate::splitter::BlockKind;
use crate::Theme;
use sha2::{Digest, Sha256};

/// A fully styled, self-contained HTML document for one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub kind: BlockKind,
    pub html: String,
}

impl RenderedPage {
    /// Name of the PNG captured from this page
    pub fn file_name(&self) -> String {
        format!("{}.png", self.kind.file_stem())
    }

    /// Hex SHA-256 of the document, stable for identical input and theme
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.html.as_bytes()))
    }
}

/// Minimal CSS writer: one rule at a time, declarations in order.
#[derive(Default)]
struct Stylesheet {
    css: String,
}

impl Stylesheet {
    fn import(&mut self, url: &url::Url) -> &mut Self {
        self.css.push_str(&format!("@import url(\"{}\");\n", url));
        self
    }

    fn rule(&mut self, selector: &str, declarations: &[(&str, &str)]) -> &mut Self {
        self.css.push_str(selector);
        self.css.push_str(" {\n");
        for (property, value) in declarations {
            self.css.push_str("  ");
            self.css.push_str(property);
            self.css.push_str(": ");
            self.css.push_str(value);
            self.css.push_str(";\n");
        }
        self.css.push_str("}\n");
        self
    }

    fn finish(self) -> String {
        self.css
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark::escape::escape_html(&mut out, text);
    out
}

/// Builds a `RenderedPage` from a theme and an HTML fragment.
pub struct PageBuilder<'a> {
    theme: &'a Theme,
    kind: BlockKind,
    content: String,
}

impl<'a> PageBuilder<'a> {
    pub fn new(theme: &'a Theme, kind: BlockKind) -> Self {
        Self {
            theme,
            kind,
            content: String::new(),
        }
    }

    /// Set the already-rendered body fragment
    pub fn content(mut self, fragment: String) -> Self {
        self.content = fragment;
        self
    }

    pub fn build(self) -> RenderedPage {
        let body_class = match self.kind {
            BlockKind::Cover => "cover",
            BlockKind::Section(_) => "note",
        };

        let mut html = String::with_capacity(self.content.len() + 8 * 1024);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape(&self.kind.file_stem())));
        html.push_str("<style>\n");
        html.push_str(&self.stylesheet());
        html.push_str("</style>\n</head>\n");
        html.push_str(&format!("<body class=\"{}\">\n", body_class));
        html.push_str("<main class=\"content\">\n");
        if self.theme.decorative_elements {
            html.push_str(
                "<div class=\"window-controls\">\
                 <span class=\"window-control close\"></span>\
                 <span class=\"window-control minimize\"></span>\
                 <span class=\"window-control maximize\"></span>\
                 </div>\n",
            );
        }
        html.push_str(&self.content);
        html.push_str("</main>\n");
        if let Some(mark) = self.theme.watermark.as_deref().filter(|m| !m.trim().is_empty()) {
            html.push_str(&format!("<div class=\"watermark\">{}</div>\n", escape(mark)));
        }
        html.push_str("</body>\n</html>\n");

        RenderedPage { kind: self.kind, html }
    }

    fn stylesheet(&self) -> String {
        let t = self.theme;
        let font_size = format!("{}px", t.base_font_size_px);
        let code_font_size = format!("{}px", (t.base_font_size_px.saturating_mul(2) / 3).max(12));
        let heading_rule = format!("2px solid {}", t.border_color);
        let quote_rule = format!("4px solid {}", t.border_color);

        let mut css = Stylesheet::default();
        if let Some(url) = t.font_import_url.as_deref().and_then(|u| url::Url::parse(u).ok()) {
            css.import(&url);
        }

        css.rule("*", &[("box-sizing", "border-box")])
            .rule(
                "body",
                &[
                    ("margin", "0"),
                    ("padding", "50px"),
                    ("min-height", "100vh"),
                    ("background", t.background.as_str()),
                    ("color", t.text_color.as_str()),
                    ("font-family", t.font_family.as_str()),
                    ("font-size", font_size.as_str()),
                    ("line-height", "1.6"),
                    ("display", "flex"),
                    ("justify-content", "center"),
                    ("align-items", "center"),
                ],
            )
            .rule(
                ".content",
                &[
                    ("position", "relative"),
                    ("background", t.panel_background.as_str()),
                    ("border-radius", "25px"),
                    ("padding", "56px 40px 40px"),
                    ("box-shadow", "0 10px 30px rgba(0, 0, 0, 0.3)"),
                    ("max-width", "980px"),
                    ("width", "100%"),
                    ("overflow-wrap", "break-word"),
                ],
            )
            .rule(
                "h1, h2, h3, h4, h5, h6",
                &[
                    ("color", t.accent_color.as_str()),
                    ("letter-spacing", "1px"),
                    ("text-shadow", "0 2px 4px rgba(0, 0, 0, 0.2)"),
                ],
            )
            .rule(
                "h1",
                &[
                    ("font-size", "42px"),
                    ("text-align", "center"),
                    ("border-bottom", heading_rule.as_str()),
                    ("padding-bottom", "15px"),
                ],
            )
            .rule(
                "h2",
                &[
                    ("font-size", "32px"),
                    ("margin-top", "0"),
                    ("border-bottom", heading_rule.as_str()),
                    ("padding-bottom", "12px"),
                    ("font-weight", "600"),
                ],
            )
            .rule("h3", &[("font-size", "30px")])
            .rule("h4", &[("font-size", "24px")])
            .rule("h5, h6", &[("font-size", "20px")])
            .rule(
                "body.cover .content",
                &[("text-align", "center"), ("padding", "96px 48px")],
            )
            .rule(
                "body.cover h1",
                &[("font-size", "64px"), ("border-bottom", "none")],
            )
            .rule(
                "blockquote",
                &[
                    ("border-left", quote_rule.as_str()),
                    ("margin", "20px 0"),
                    ("padding", "15px 30px"),
                    ("background", "rgba(255, 255, 255, 0.03)"),
                ],
            )
            .rule(
                "table",
                &[("border-collapse", "collapse"), ("margin", "25px 0"), ("width", "100%")],
            )
            .rule(
                "th, td",
                &[("padding", "15px"), ("border", heading_rule.as_str()), ("text-align", "left")],
            )
            .rule("th", &[("color", t.accent_color.as_str())])
            .rule(
                "a",
                &[("color", t.accent_color.as_str()), ("text-decoration", "none")],
            )
            .rule(
                "img",
                &[
                    ("max-width", "100%"),
                    ("height", "auto"),
                    ("border-radius", "8px"),
                    ("box-shadow", "0 4px 12px rgba(0, 0, 0, 0.15)"),
                ],
            )
            .rule(".code-window", &[("position", "relative"), ("margin", "2em 0")])
            .rule(
                ".code-window pre",
                &[
                    ("margin", "0"),
                    ("padding", t.chrome.padding.as_str()),
                    ("padding-top", "56px"),
                    ("border-radius", t.chrome.border_radius.as_str()),
                    ("box-shadow", t.chrome.shadow.as_str()),
                    ("overflow-x", "hidden"),
                    ("white-space", "pre-wrap"),
                ],
            )
            .rule(
                "pre, code",
                &[
                    ("font-family", "'JetBrains Mono', monospace"),
                    ("font-size", code_font_size.as_str()),
                    ("line-height", "1.5"),
                ],
            )
            .rule(
                ".window-controls",
                &[
                    ("position", "absolute"),
                    ("top", "16px"),
                    ("left", "18px"),
                    ("display", "flex"),
                    ("gap", "8px"),
                    ("z-index", "1"),
                ],
            )
            .rule(
                ".window-control",
                &[
                    ("display", "inline-block"),
                    ("width", "12px"),
                    ("height", "12px"),
                    ("border-radius", "50%"),
                ],
            )
            .rule(".window-control.close", &[("background", "#ff5f56")])
            .rule(".window-control.minimize", &[("background", "#ffbd2e")])
            .rule(".window-control.maximize", &[("background", "#27c93f")])
            .rule(
                ".watermark",
                &[
                    ("position", "fixed"),
                    ("bottom", "30px"),
                    ("right", "40px"),
                    ("font-size", "14px"),
                    ("opacity", "0.5"),
                    ("color", t.accent_color.as_str()),
                    ("transform", "rotate(-15deg)"),
                ],
            );

        if t.decorative_elements {
            css.rule(
                ".content::before",
                &[
                    ("content", "''"),
                    ("position", "absolute"),
                    ("inset", "-10px"),
                    ("border", "2px solid rgba(255, 255, 255, 0.1)"),
                    ("border-radius", "30px"),
                    ("z-index", "-1"),
                ],
            );
        }

        css.finish()
    }
}

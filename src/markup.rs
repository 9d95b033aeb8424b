//! Markdown to HTML conversion for a single block.
//!
//! Conversion itself is `pulldown-cmark`; this module only rewrites the
//! event stream on the way through: fenced code is replaced with syntect
//! highlighted HTML inside window chrome, and local images are inlined as
//! `data:` URLs so the page has no file dependencies.

use crate::page::{PageBuilder, RenderedPage};
use crate::splitter::Block;
use crate::{Error, Result, Theme};
use base64::Engine as Base64Engine;
use log::{debug, warn};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use std::path::{Path, PathBuf};
use syntect::highlighting::{Theme as CodeTheme, ThemeSet};
use syntect::parsing::SyntaxSet;

/// Renders blocks into self-contained pages using a fixed theme
pub struct MarkupRenderer {
    theme: Theme,
    base_dir: PathBuf,
    syntaxes: SyntaxSet,
    code_theme: CodeTheme,
}

impl MarkupRenderer {
    /// Create a renderer. Image paths are resolved against `base_dir`.
    ///
    /// Fails if the theme is invalid or names an unknown highlighting theme.
    pub fn new(theme: &Theme, base_dir: impl Into<PathBuf>) -> Result<Self> {
        theme.validate()?;

        let mut themes = ThemeSet::load_defaults();
        let code_theme = themes.themes.remove(&theme.code_theme).ok_or_else(|| {
            let known: Vec<_> = themes.themes.keys().cloned().collect();
            Error::ConfigError(format!(
                "Unknown code theme {:?} (available: {})",
                theme.code_theme,
                known.join(", ")
            ))
        })?;

        Ok(Self {
            theme: theme.clone(),
            base_dir: base_dir.into(),
            syntaxes: SyntaxSet::load_defaults_newlines(),
            code_theme,
        })
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Produce the full page for a block. Malformed markdown is rendered
    /// best-effort and never fails.
    pub fn render_block(&self, block: &Block) -> RenderedPage {
        let fragment = self.render_markdown(&block.text);
        PageBuilder::new(&self.theme, block.kind).content(fragment).build()
    }

    /// Convert markdown into an HTML fragment (no document wrapper).
    pub fn render_markdown(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut events = Vec::new();
        let mut code: Option<(String, String)> = None;

        for event in Parser::new_ext(markdown, options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or("").to_string(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((lang, String::new()));
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, buf)) = code.as_mut() {
                        buf.push_str(&text);
                    }
                }
                Event::End(Tag::CodeBlock(_)) => {
                    if let Some((lang, source)) = code.take() {
                        events.push(Event::Html(CowStr::from(self.code_window(&lang, &source))));
                    }
                }
                Event::Start(Tag::Image(link_type, dest, title)) => {
                    let dest = self.embed_image(dest);
                    events.push(Event::Start(Tag::Image(link_type, dest, title)));
                }
                other => events.push(other),
            }
        }

        let mut out = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn code_window(&self, lang: &str, source: &str) -> String {
        let syntax = if lang.is_empty() {
            self.syntaxes.find_syntax_plain_text()
        } else {
            self.syntaxes
                .find_syntax_by_token(lang)
                .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
        };

        let highlighted = syntect::html::highlighted_html_for_string(source, &self.syntaxes, syntax, &self.code_theme)
            .unwrap_or_else(|e| {
                warn!("Highlighting failed for {:?} block, using plain text: {}", lang, e);
                let mut escaped = String::new();
                // Writing into a String cannot fail.
                let _ = pulldown_cmark::escape::escape_html(&mut escaped, source);
                format!("<pre><code>{}</code></pre>", escaped)
            });

        format!(
            "<div class=\"code-window\"><div class=\"window-controls\">\
             <span class=\"window-control close\"></span>\
             <span class=\"window-control minimize\"></span>\
             <span class=\"window-control maximize\"></span>\
             </div>{}</div>\n",
            highlighted
        )
    }

    /// Replace a local image path with a `data:` URL when the file can be read.
    fn embed_image<'a>(&self, dest: CowStr<'a>) -> CowStr<'a> {
        if !is_local_reference(&dest) {
            return dest;
        }
        let path = self.resolve_local(&dest);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!("Embedding image {} ({} bytes)", path.display(), bytes.len());
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                CowStr::from(format!("data:{};base64,{}", mime_for(&path), encoded))
            }
            Err(e) => {
                warn!("Leaving image reference {:?} unresolved: {}", dest.as_ref(), e);
                dest
            }
        }
    }

    /// File a local reference points at: the percent-decoded path when that
    /// file exists, otherwise the reference as written.
    fn resolve_local(&self, dest: &str) -> PathBuf {
        if let Ok(decoded) = percent_encoding::percent_decode_str(dest).decode_utf8() {
            let path = self.base_dir.join(decoded.as_ref());
            if path.is_file() {
                return path;
            }
        }
        self.base_dir.join(dest)
    }
}

fn is_local_reference(dest: &str) -> bool {
    !(dest.is_empty()
        || dest.starts_with('#')
        || dest.starts_with("data:")
        || dest.starts_with("//")
        || dest.contains("://"))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::BlockKind;

    fn renderer(base: &Path) -> MarkupRenderer {
        MarkupRenderer::new(&Theme::default(), base).unwrap()
    }

    #[test]
    fn unknown_code_theme_is_a_config_error() {
        let theme = Theme {
            code_theme: "no-such-theme".to_string(),
            ..Default::default()
        };
        match MarkupRenderer::new(&theme, ".") {
            Err(Error::ConfigError(msg)) => assert!(msg.contains("no-such-theme")),
            other => panic!("expected config error, got {:?}", other.err()),
        }
    }

    #[test]
    fn fenced_code_is_highlighted_inside_window_chrome() {
        let r = renderer(Path::new("."));
        let html = r.render_markdown("```rust\nfn main() {}\n```\n");
        assert!(html.contains("class=\"code-window\""));
        assert_eq!(html.matches("window-control ").count(), 3);
        assert!(html.contains("<pre style=\"background-color:"));
        assert!(html.contains("main"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let r = renderer(Path::new("."));
        let html = r.render_markdown("```klingon\n<b>qapla'</b>\n```\n");
        assert!(html.contains("code-window"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn tables_and_strikethrough_are_enabled() {
        let r = renderer(Path::new("."));
        let html = r.render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn existing_local_image_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), b"\x89PNG\r\n\x1a\nfake").unwrap();
        let r = renderer(dir.path());
        let html = r.render_markdown("![alt](pic.png)");
        assert!(html.contains("src=\"data:image/png;base64,"));
        assert!(!html.contains("src=\"pic.png\""));
    }

    #[test]
    fn percent_encoded_image_path_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my pic.png"), b"\x89PNG").unwrap();
        let r = renderer(dir.path());
        let html = r.render_markdown("![a](my%20pic.png) ![b](<my pic.png>)");
        assert_eq!(html.matches("src=\"data:image/png;base64,").count(), 2);
        assert!(!html.contains("my%20pic.png"));
    }

    #[test]
    fn literal_percent_in_file_name_still_resolves() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("100%25.gif"), b"GIF89a").unwrap();
        let r = renderer(dir.path());
        let html = r.render_markdown("![a](100%25.gif)");
        assert!(html.contains("src=\"data:image/gif;base64,R0lGODlh\""));
    }

    #[test]
    fn missing_local_image_is_left_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let html = r.render_markdown("![alt](missing/nope.png)");
        assert!(html.contains("src=\"missing/nope.png\""));
    }

    #[test]
    fn remote_images_are_not_touched() {
        let r = renderer(Path::new("."));
        let html = r.render_markdown("![x](https://example.com/a.png)");
        assert!(html.contains("src=\"https://example.com/a.png\""));
    }

    #[test]
    fn malformed_markdown_still_renders() {
        let r = renderer(Path::new("."));
        let page = r.render_block(&Block {
            kind: BlockKind::Section(1),
            text: "## Broken\n[unclosed](\n```\nnever closed".to_string(),
        });
        assert!(page.html.contains("Broken"));
        assert!(page.html.contains("never closed"));
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn local_reference_detection() {
        assert!(is_local_reference("img/a.png"));
        assert!(is_local_reference("/abs/a.png"));
        assert!(!is_local_reference("http://x/a.png"));
        assert!(!is_local_reference("data:image/png;base64,AAAA"));
        assert!(!is_local_reference("//cdn/x.png"));
        assert!(!is_local_reference("#anchor"));
    }
}

//! End-to-end conversion: input file to images on disk.

use crate::capture::{Capturer, Surface, SurfaceGuard};
use crate::markup::MarkupRenderer;
use crate::page::RenderedPage;
use crate::splitter::{split_document, Block};
use crate::{CancelToken, CaptureConfig, Error, RenderConfig, Result};
use log::info;
use std::path::{Path, PathBuf};

/// Runs the split, render and capture stages with one configuration
pub struct Converter {
    config: RenderConfig,
}

impl Converter {
    /// Validate `config` and build a converter
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Read `input` and split it into blocks
    pub fn read_blocks(&self, input: &Path) -> Result<Vec<Block>> {
        let text = std::fs::read_to_string(input).map_err(|source| Error::InputError {
            path: input.to_path_buf(),
            source,
        })?;
        let blocks = split_document(&text);
        let sections = blocks.iter().filter(|b| !b.is_cover()).count();
        info!(
            "{}: {} block(s), {} section(s){}",
            input.display(),
            blocks.len(),
            sections,
            if blocks.len() > sections { " plus cover" } else { "" }
        );
        Ok(blocks)
    }

    /// Read, split and render `input` without touching a browser
    pub fn render_pages(&self, input: &Path) -> Result<Vec<RenderedPage>> {
        let blocks = self.read_blocks(input)?;
        let renderer = MarkupRenderer::new(&self.config.theme, self.base_dir_for(input))?;
        Ok(blocks.iter().map(|b| renderer.render_block(b)).collect())
    }

    /// Write each rendered page as `<stem>.html` into the output directory
    pub fn write_html(&self, input: &Path) -> Result<Vec<PathBuf>> {
        let pages = self.render_pages(input)?;
        self.prepare_out_dir()?;

        let mut written = Vec::with_capacity(pages.len());
        for page in &pages {
            let path = self.config.out_dir.join(format!("{}.html", page.kind.file_stem()));
            std::fs::write(&path, &page.html).map_err(|source| Error::OutputError {
                path: path.clone(),
                source,
            })?;
            info!("Wrote {} ({})", path.display(), &page.fingerprint()[..12]);
            written.push(path);
        }
        Ok(written)
    }

    /// Convert `input` using a surface produced by `open`.
    ///
    /// The surface is opened only after the input has been read and
    /// rendered, and is closed again on every exit path.
    pub fn convert_with<S, F>(&self, input: &Path, cancel: &CancelToken, open: F) -> Result<Vec<PathBuf>>
    where
        S: Surface,
        F: FnOnce(&CaptureConfig) -> Result<S>,
    {
        let pages = self.render_pages(input)?;
        self.prepare_out_dir()?;
        if pages.is_empty() {
            info!("Nothing to capture");
            return Ok(Vec::new());
        }

        let mut guard = SurfaceGuard::new(open(&self.config.capture)?);
        let capturer = Capturer::new(self.config.capture.clone());
        let written = capturer.run(guard.get_mut()?, &pages, &self.config.out_dir, cancel)?;
        guard.close()?;
        Ok(written)
    }

    /// Convert `input` with headless Chrome
    #[cfg(feature = "cdp")]
    pub fn convert_file(&self, input: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>> {
        self.convert_with(input, cancel, crate::cdp::CdpSurface::launch)
    }

    fn prepare_out_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.out_dir).map_err(|source| Error::OutputError {
            path: self.config.out_dir.clone(),
            source,
        })
    }

    fn base_dir_for(&self, input: &Path) -> PathBuf {
        match &self.config.base_dir {
            Some(dir) => dir.clone(),
            None => match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_dir_defaults_to_input_parent() {
        let conv = Converter::new(RenderConfig::default()).unwrap();
        assert_eq!(conv.base_dir_for(Path::new("notes/today.md")), PathBuf::from("notes"));
        assert_eq!(conv.base_dir_for(Path::new("today.md")), PathBuf::from("."));

        let conv = Converter::new(RenderConfig {
            base_dir: Some(PathBuf::from("/assets")),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(conv.base_dir_for(Path::new("notes/today.md")), PathBuf::from("/assets"));
    }

    #[test]
    fn missing_input_is_an_input_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let conv = Converter::new(RenderConfig {
            out_dir: out.clone(),
            ..Default::default()
        })
        .unwrap();
        let err = conv.write_html(&dir.path().join("absent.md")).unwrap_err();
        assert!(matches!(err, Error::InputError { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn write_html_produces_one_file_per_block() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        std::fs::write(&input, "# Title\nIntro\n## A\nfoo\n## B\nbar").unwrap();
        let conv = Converter::new(RenderConfig {
            out_dir: dir.path().join("html"),
            ..Default::default()
        })
        .unwrap();
        let written = conv.write_html(&input).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cover.html", "note_01.html", "note_02.html"]);
        assert!(written.iter().all(|p| p.exists()));
    }
}

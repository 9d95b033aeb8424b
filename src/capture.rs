//! Capture orchestration: drives a rendering surface through
//! load, idle wait, measure, resize and screenshot for each page.
//!
//! Pages are processed strictly one at a time on a single surface. Surface
//! operations are retried with exponential backoff when the failure is
//! transient; anything else aborts the run on the spot, leaving the images
//! already written in place.

use crate::page::RenderedPage;
use crate::{Error, Result, Viewport};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A browser-like surface that can load a document and rasterize it
///
/// Implementations own the underlying browser session. The orchestrator
/// calls these methods in a fixed order for every page and calls `close`
/// exactly once, after the last page or on the first fatal error.
pub trait Surface {
    /// Replace the current document with `html`
    fn load_html(&mut self, html: &str) -> Result<()>;

    /// Wait until no further resource loads are pending.
    ///
    /// Returns `Ok(false)` when `timeout` elapsed first; the caller treats
    /// that as a degraded but usable render.
    fn wait_for_idle(&mut self, timeout: Duration) -> Result<bool>;

    /// Natural height of the rendered content in CSS pixels
    fn content_height(&mut self) -> Result<u32>;

    /// Resize the capture viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Screenshot the full rendered page as PNG bytes
    fn capture_png(&mut self) -> Result<Vec<u8>>;

    /// Tear down the session
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Retry schedule for surface operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Run `op`, retrying transient failures according to `policy`.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, attempts, e, delay
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Capture-side configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Base viewport; its height is also the maximum capture height
    pub viewport: Viewport,
    /// Smallest capture height
    pub min_height: u32,
    /// Added to the measured content height
    pub height_margin: u32,
    /// Bound on the network-idle wait
    pub idle_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            min_height: 800,
            height_margin: 100,
            idle_timeout: Duration::from_millis(30000),
            retry: RetryPolicy::default(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::ConfigError("retry.max_attempts must be at least 1".into()));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(Error::ConfigError(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }
        Ok(())
    }
}

/// Height to capture for content of `natural` height.
///
/// `natural + margin`, clamped to `[min_height, viewport.height]`. If the
/// viewport is shorter than `min_height` the viewport height wins.
pub fn adjusted_height(natural: u32, config: &CaptureConfig) -> u32 {
    let max = config.viewport.height;
    let min = config.min_height.min(max);
    natural.saturating_add(config.height_margin).clamp(min, max)
}

/// Cooperative cancellation flag, checked between pages
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Owns a surface for the duration of a run and closes it on every exit path.
pub struct SurfaceGuard<S: Surface> {
    surface: Option<S>,
}

impl<S: Surface> SurfaceGuard<S> {
    pub fn new(surface: S) -> Self {
        Self { surface: Some(surface) }
    }

    pub fn get_mut(&mut self) -> Result<&mut S> {
        self.surface
            .as_mut()
            .ok_or_else(|| Error::Other("rendering surface already closed".into()))
    }

    /// Close the surface now and report the outcome
    pub fn close(mut self) -> Result<()> {
        match self.surface.take() {
            Some(surface) => surface.close(),
            None => Ok(()),
        }
    }
}

impl<S: Surface> Drop for SurfaceGuard<S> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            if let Err(e) = surface.close() {
                warn!("Failed to close rendering surface: {}", e);
            }
        }
    }
}

/// Turns rendered pages into PNG files
pub struct Capturer {
    config: CaptureConfig,
}

impl Capturer {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Capture `pages` in order into `out_dir`, returning the written paths.
    ///
    /// Stops with `Error::Cancelled` before the next page once `cancel` is set.
    pub fn run<S>(
        &self,
        surface: &mut S,
        pages: &[RenderedPage],
        out_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>>
    where
        S: Surface + ?Sized,
    {
        let mut written = Vec::with_capacity(pages.len());
        for page in pages {
            if cancel.is_cancelled() {
                info!("Cancelled after {} of {} images", written.len(), pages.len());
                return Err(Error::Cancelled);
            }
            let path = out_dir.join(page.file_name());
            self.capture_page(surface, page, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    fn capture_page<S>(&self, surface: &mut S, page: &RenderedPage, path: &Path) -> Result<()>
    where
        S: Surface + ?Sized,
    {
        let retry = &self.config.retry;
        let base = self.config.viewport;
        let idle_timeout = self.config.idle_timeout;
        debug!("Capturing {} (page {})", path.display(), page.fingerprint());

        retry_with_backoff(retry, "load", || {
            surface.set_viewport(base)?;
            surface.load_html(&page.html)
        })?;

        let idle = retry_with_backoff(retry, "idle wait", || surface.wait_for_idle(idle_timeout))?;
        if !idle {
            warn!(
                "{}: resources still loading after {}ms, capturing current render",
                page.file_name(),
                idle_timeout.as_millis()
            );
        }

        let natural = retry_with_backoff(retry, "measure", || surface.content_height())?;
        let height = adjusted_height(natural, &self.config);
        debug!("{}: content height {} -> capture height {}", page.file_name(), natural, height);

        let viewport = Viewport { width: base.width, height };
        retry_with_backoff(retry, "resize", || surface.set_viewport(viewport))?;

        let png = retry_with_backoff(retry, "capture", || surface.capture_png())?;
        std::fs::write(path, &png).map_err(|source| Error::OutputError {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Wrote {} ({}x{}, {} bytes)", path.display(), viewport.width, viewport.height, png.len());
        Ok(())
    }
}

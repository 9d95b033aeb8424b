//! Chrome DevTools Protocol surface implementation

use crate::capture::{CaptureConfig, Surface};
use crate::{Error, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Readiness probe: document parsed, web fonts settled, and the number of
// resource timing entries so far. Idle means ready and the count stopped moving.
const IDLE_PROBE: &str = r#"
JSON.stringify({
    ready: document.readyState === 'complete'
        && (!document.fonts || document.fonts.status === 'loaded'),
    resources: performance.getEntriesByType('resource').length
})
"#;

const CONTENT_HEIGHT: &str = r#"
(function() {
    const body = document.body;
    const html = document.documentElement;
    return Math.max(
        body ? body.scrollHeight : 0, body ? body.offsetHeight : 0,
        html.clientHeight, html.scrollHeight, html.offsetHeight
    );
})()
"#;

const DOCUMENT_HEIGHT: &str = "Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0)";

#[derive(Debug, Deserialize)]
struct IdleProbe {
    ready: bool,
    resources: u64,
}

/// Headless Chrome session with a single reused tab
///
/// Launched once per run. Dropping or closing it terminates the Chrome
/// child process.
pub struct CdpSurface {
    browser: Browser,
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl CdpSurface {
    /// Launch headless Chrome sized to the base viewport
    pub fn launch(config: &CaptureConfig) -> Result<Self> {
        let viewport = config.viewport;
        // Chrome drops the connection after this long without events; keep it
        // well past the longest idle wait.
        let browser_idle = (config.idle_timeout * 2).max(Duration::from_secs(60));

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((viewport.width, viewport.height)))
            .idle_browser_timeout(browser_idle)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.idle_timeout + Duration::from_secs(10));

        debug!("Launched headless Chrome with {}x{} viewport", viewport.width, viewport.height);
        let surface = Self { browser, tab, viewport };
        surface
            .resize(viewport)
            .map_err(|e| Error::InitializationError(format!("Failed to size viewport: {}", e)))?;
        Ok(surface)
    }

    fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| Error::RenderError(format!("Evaluation failed: {}", e)))?;
        result
            .value
            .ok_or_else(|| Error::RenderError("No value returned from evaluation".into()))
    }

    fn evaluate_height(&self, expression: &str) -> Result<u32> {
        let value = self.evaluate(expression)?;
        let height = value
            .as_f64()
            .ok_or_else(|| Error::RenderError(format!("Height is not a number: {}", value)))?;
        Ok(height.max(0.0).ceil().min(u32::MAX as f64) as u32)
    }

    fn resize(&self, viewport: Viewport) -> Result<()> {
        self.tab
            .call_method(device_metrics(viewport)?)
            .map_err(|e| Error::RenderError(format!("Failed to resize viewport: {}", e)))?;
        Ok(())
    }
}

/// `Emulation.setDeviceMetricsOverride` for `viewport` at scale factor 1.
fn device_metrics(viewport: Viewport) -> Result<Emulation::SetDeviceMetricsOverride> {
    // Built from the wire form so the optional parameters stay unset.
    serde_json::from_value(serde_json::json!({
        "width": viewport.width,
        "height": viewport.height,
        "deviceScaleFactor": 1.0,
        "mobile": false,
    }))
    .map_err(|e| Error::RenderError(format!("Invalid device metrics: {}", e)))
}

impl Surface for CdpSurface {
    fn load_html(&mut self, html: &str) -> Result<()> {
        self.tab
            .navigate_to("about:blank")
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        let frame_id = self.tab.get_target_id().clone();
        self.tab
            .call_method(Page::SetDocumentContent {
                frame_id,
                html: html.to_string(),
            })
            .map_err(|e| Error::LoadError(format!("Failed to set document content: {}", e)))?;
        Ok(())
    }

    fn wait_for_idle(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut last_count: Option<u64> = None;

        loop {
            let raw = self.evaluate(IDLE_PROBE)?;
            let probe: IdleProbe = match raw.as_str() {
                Some(s) => serde_json::from_str(s)
                    .map_err(|e| Error::RenderError(format!("Unexpected idle probe result {:?}: {}", s, e)))?,
                None => return Err(Error::RenderError(format!("Unexpected idle probe result: {}", raw))),
            };

            if probe.ready && last_count == Some(probe.resources) {
                return Ok(true);
            }
            last_count = Some(probe.resources);

            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    fn content_height(&mut self) -> Result<u32> {
        self.evaluate_height(CONTENT_HEIGHT)
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        if viewport != self.viewport {
            self.resize(viewport)?;
            self.viewport = viewport;
        }
        Ok(())
    }

    fn capture_png(&mut self) -> Result<Vec<u8>> {
        // Full-page capture: grow the emulated viewport to the document for
        // the shot, then restore the requested one.
        let document_height = self.evaluate_height(DOCUMENT_HEIGHT)?.max(self.viewport.height);
        let grown = document_height > self.viewport.height;
        if grown {
            self.resize(Viewport {
                width: self.viewport.width,
                height: document_height,
            })?;
        }

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.viewport.width as f64,
            height: document_height as f64,
            scale: 1.0,
        };
        let shot = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::CaptureError(format!("Screenshot failed: {}", e)));

        if grown {
            self.resize(self.viewport)?;
        }
        shot
    }

    fn close(self) -> Result<()> {
        // Drop explicitly so the Chrome child process is terminated now.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_surface_launch() {
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let result = CdpSurface::launch(&CaptureConfig::default());
        match result {
            Ok(surface) => surface.close().unwrap(),
            Err(e) => eprintln!("Skipping CDP launch test because Chrome is not available: {}", e),
        }
    }

    #[test]
    fn device_metrics_match_viewport() {
        let metrics = device_metrics(Viewport {
            width: 1080,
            height: 2400,
        })
        .unwrap();
        assert_eq!(metrics.width, 1080);
        assert_eq!(metrics.height, 2400);
        assert_eq!(metrics.device_scale_factor, 1.0);
        assert!(!metrics.mobile);
        assert!(metrics.scale.is_none());
    }

    #[test]
    fn idle_probe_parses() {
        let probe: IdleProbe = serde_json::from_str(r#"{"ready":true,"resources":4}"#).unwrap();
        assert!(probe.ready);
        assert_eq!(probe.resources, 4);
    }
}

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use render_tunnel_instruments::{OperationRecord, Reporter};

use crate::error::handle_cdp_err;

/// The timeout applied to page operations until [InstrumentedPage::set_default_timeout] is
/// called. Notebook-backed pages can take far longer than this on first render, so scenarios
/// driving them should raise it before navigating.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// One browser tab, instrumented so that navigation, screenshot and close all show up in the
/// benchmark report tagged with the browser that produced them.
pub struct InstrumentedPage {
    inner: Page,
    reporter: Arc<Reporter>,
    browser_name: String,
    default_timeout: Duration,
}

impl fmt::Debug for InstrumentedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedPage")
            .field("browser_name", &self.browser_name)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl InstrumentedPage {
    pub(crate) fn new(inner: Page, reporter: Arc<Reporter>, browser_name: &str) -> Self {
        Self {
            inner,
            reporter,
            browser_name: browser_name.to_string(),
            default_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Set the timeout bounding every subsequent page operation. Must be called before
    /// navigation for the new bound to apply to it.
    pub fn set_default_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn browser_name(&self) -> &str {
        &self.browser_name
    }

    /// Navigate to the given URL and wait for the navigation to complete.
    pub async fn goto(&self, url: &str) -> anyhow::Result<()> {
        let record = OperationRecord::new("page_goto")
            .with_attr("browser", &self.browser_name)
            .with_attr("url", url);

        let response = with_deadline(self.default_timeout, "navigation", async {
            self.inner.goto(url).await.map_err(handle_cdp_err)?;
            self.inner
                .wait_for_navigation()
                .await
                .map_err(handle_cdp_err)?;
            Ok(())
        })
        .await;
        self.reporter.add_operation(record.finish(&response));

        response
    }

    /// Capture a full-page PNG screenshot of the rendered page.
    pub async fn screenshot_full_page(&self) -> anyhow::Result<Vec<u8>> {
        let record =
            OperationRecord::new("page_screenshot").with_attr("browser", &self.browser_name);

        let response = with_deadline(self.default_timeout, "screenshot", async {
            self.inner
                .screenshot(
                    ScreenshotParams::builder()
                        .format(CaptureScreenshotFormat::Png)
                        .full_page(true)
                        .build(),
                )
                .await
                .map_err(handle_cdp_err)
        })
        .await;
        self.reporter.add_operation(record.finish(&response));

        response
    }

    /// Close the page, giving in-page unload handlers a chance to run before the target goes
    /// away. Consumes the page, it cannot be used afterwards.
    pub async fn close(self) -> anyhow::Result<()> {
        let record = OperationRecord::new("page_close").with_attr("browser", &self.browser_name);

        let response = with_deadline(self.default_timeout, "page close", async {
            self.inner.close().await.map_err(handle_cdp_err)
        })
        .await;
        self.reporter.add_operation(record.finish(&response));

        response
    }
}

/// Bound an operation by the page's default timeout, mirroring how browser automation
/// frameworks apply their per-page default to every action.
async fn with_deadline<T>(
    timeout: Duration,
    what: &str,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{} did not complete within {}ms",
            what,
            timeout.as_millis()
        )),
    }
}

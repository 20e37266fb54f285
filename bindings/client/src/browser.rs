use std::fmt;
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use render_tunnel_instruments::{OperationRecord, Reporter};

use crate::error::handle_cdp_err;
use crate::page::InstrumentedPage;

/// A headless Chromium instance with every operation reported to the instruments layer.
///
/// Launching spawns the CDP event handler loop onto the current tokio runtime, so this must be
/// created from within async code, typically via the executor's `execute_in_place`.
pub struct InstrumentedBrowser {
    inner: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    reporter: Arc<Reporter>,
}

impl fmt::Debug for InstrumentedBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedBrowser").finish_non_exhaustive()
    }
}

impl InstrumentedBrowser {
    /// Launch a headless browser. The `CHROME` environment variable can point at a specific
    /// executable, which is how a CI matrix selects the engine build to drive.
    pub async fn launch(reporter: Arc<Reporter>) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder();
        if let Ok(executable) = std::env::var("CHROME") {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let record = OperationRecord::new("browser_launch");
        let response = Browser::launch(config).await.map_err(handle_cdp_err);
        let record = record.finish(&response);
        reporter.add_operation(record);
        let (inner, mut handler) = response?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("CDP handler stopped: {:?}", e);
                    break;
                }
            }
        });

        Ok(Self {
            inner,
            handler_task,
            reporter,
        })
    }

    /// Open a new blank page. Navigation happens later through [InstrumentedPage::goto] so that
    /// the navigation itself is what gets measured.
    pub async fn new_page(&self, browser_name: &str) -> anyhow::Result<InstrumentedPage> {
        let record = OperationRecord::new("browser_new_page").with_attr("browser", browser_name);
        let response = self
            .inner
            .new_page("about:blank")
            .await
            .map_err(handle_cdp_err);
        self.reporter.add_operation(record.finish(&response));

        Ok(InstrumentedPage::new(
            response?,
            self.reporter.clone(),
            browser_name,
        ))
    }

    /// Close the browser process and stop the handler loop.
    pub async fn close(mut self) -> anyhow::Result<()> {
        let record = OperationRecord::new("browser_close");
        let response = self.inner.close().await.map_err(handle_cdp_err);
        self.reporter.add_operation(record.finish(&response));

        self.handler_task.abort();

        response.map(|_| ())
    }
}

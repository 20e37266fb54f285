use browser_client_instrumented::prelude::{InstrumentedBrowser, InstrumentedPage};
use render_tunnel_runner::prelude::UserValuesConstraint;

/// Per-agent browser state. Populated by [crate::common::launch_browser] during agent setup
/// and drained by [crate::common::close_page] during agent teardown.
#[derive(Default, Debug)]
pub struct BrowserAgentContext {
    pub browser: Option<InstrumentedBrowser>,
    pub page: Option<InstrumentedPage>,
}

impl BrowserAgentContext {
    /// The agent's page. Errors when the browser has not been launched, which means the
    /// scenario forgot to call `launch_browser` in its agent setup.
    pub fn page(&self) -> anyhow::Result<&InstrumentedPage> {
        self.page
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No page open, call `launch_browser` in your agent setup"))
    }

    pub fn page_mut(&mut self) -> anyhow::Result<&mut InstrumentedPage> {
        self.page
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No page open, call `launch_browser` in your agent setup"))
    }
}

impl UserValuesConstraint for BrowserAgentContext {}

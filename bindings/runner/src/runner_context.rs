use render_tunnel_runner::prelude::UserValuesConstraint;
use url::Url;

/// Scenario-wide browser state. Populated by [crate::common::configure_base_url] during setup.
#[derive(Default, Debug)]
pub struct BrowserRunnerContext {
    pub base_url: Option<Url>,
}

impl BrowserRunnerContext {
    /// The base URL of the notebook server under test.
    pub fn base_url(&self) -> anyhow::Result<Url> {
        self.base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No base URL set, call `configure_base_url` in your setup"))
    }
}

impl UserValuesConstraint for BrowserRunnerContext {}

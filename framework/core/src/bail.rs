/// Return this error from an agent hook to indicate that the agent is bailing.
///
/// Bailing means the agent cannot usefully continue but the scenario as a whole might. The
/// typical case is losing the browser's devtools connection: that page is gone for good, while
/// other agents still hold working pages.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct AgentBailError {
    msg: String,
}

impl AgentBailError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for AgentBailError {
    fn default() -> Self {
        Self {
            msg: "Agent is bailing".to_string(),
        }
    }
}

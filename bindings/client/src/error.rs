use chromiumoxide::error::CdpError;
use render_tunnel_core::prelude::AgentBailError;

/// Handle a CDP error, returning an `anyhow::Error`.
///
/// A closed devtools websocket cannot be re-established mid-scenario, so the page owned by this
/// agent is gone for good. That is surfaced as a bail error: the agent stops, other agents with
/// working pages keep going.
pub fn handle_cdp_err(err: CdpError) -> anyhow::Error {
    match err {
        CdpError::Ws(e) => {
            AgentBailError::new(format!("Lost the devtools connection: {:?}", e)).into()
        }
        CdpError::ChannelSendError(e) => {
            AgentBailError::new(format!("Browser handler is gone: {:?}", e)).into()
        }
        _ => anyhow::anyhow!("CDP error: {:?}", err),
    }
}

mod common;
mod context;
mod runner_context;

pub mod prelude {
    /// Common operations for browser scenarios.
    ///
    /// This is a good place to start if you are getting started writing scenarios.
    pub use crate::common::*;

    pub use crate::context::BrowserAgentContext;
    pub use crate::runner_context::BrowserRunnerContext;

    /// Re-export of the `render_tunnel_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your
    /// scenarios.
    pub use render_tunnel_runner::prelude::*;

    /// Re-export of the instrumented client for convenience.
    pub use browser_client_instrumented::prelude::*;

    /// Re-export of the snapshot comparison types, used by visual-regression scenarios.
    pub use render_tunnel_visual::{SnapshotContext, SnapshotError};
}

use std::path::Path;
use std::time::Duration;

use browser_render_runner::prelude::*;

/// The notebook this scenario renders and benchmarks.
const NOTEBOOK_NAME: &str = "ui";

/// Notebook-backed pages can take a long time on first render while the kernel spins up, so the
/// page gets a much larger budget than the client default.
const PAGE_TIMEOUT: Duration = Duration::from_millis(120_000);

fn setup(ctx: &mut RunnerContext<BrowserRunnerContext>) -> HookResult {
    configure_base_url(ctx)?;
    Ok(())
}

fn agent_setup(ctx: &mut AgentContext<BrowserRunnerContext, BrowserAgentContext>) -> HookResult {
    launch_browser(ctx)?;

    // Must be set before navigation so the raised bound applies to the first render.
    ctx.get_mut().page_mut()?.set_default_timeout(PAGE_TIMEOUT);

    Ok(())
}

fn agent_behaviour(
    ctx: &mut AgentContext<BrowserRunnerContext, BrowserAgentContext>,
) -> HookResult {
    let base_url = ctx.runner_context().get().base_url()?;
    let url = render_url(&base_url, NOTEBOOK_NAME)?;

    record_render_benchmark(ctx, NOTEBOOK_NAME, &url)?;

    let screenshot = capture_screenshot(ctx)?;
    snapshot_context().assert_matches(NOTEBOOK_NAME, &screenshot)?;

    Ok(())
}

fn agent_teardown(
    ctx: &mut AgentContext<BrowserRunnerContext, BrowserAgentContext>,
) -> HookResult {
    close_page(ctx)?;
    Ok(())
}

fn snapshot_context() -> SnapshotContext {
    SnapshotContext::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("snapshots"))
}

fn main() -> RenderTunnelResult<()> {
    let builder = ScenarioDefinitionBuilder::<BrowserRunnerContext, BrowserAgentContext>::new(
        env!("CARGO_PKG_NAME"),
        init(),
    )
    .use_setup(setup)
    .use_agent_setup(agent_setup)
    .use_agent_behaviour(agent_behaviour)
    .use_agent_teardown(agent_teardown);

    run(builder)?;

    Ok(())
}

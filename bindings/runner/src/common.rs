use anyhow::Context;
use browser_client_instrumented::prelude::InstrumentedBrowser;
use render_tunnel_instruments::{OperationRecord, ReportMetric};
use render_tunnel_runner::prelude::{AgentContext, HookResult, RunnerContext};
use url::Url;

use crate::context::BrowserAgentContext;
use crate::runner_context::BrowserRunnerContext;

/// Operation id under which render benchmarks are reported.
pub const RENDER_OPERATION_ID: &str = "render_notebook";

/// Sets the `base_url` value in [BrowserRunnerContext] from the scenario's connection string.
///
/// Call this from your scenario `setup` so that agents can build render URLs:
/// ```rust
/// use browser_render_runner::prelude::*;
///
/// fn setup(ctx: &mut RunnerContext<BrowserRunnerContext>) -> HookResult {
///     configure_base_url(ctx)?;
///     Ok(())
/// }
/// ```
pub fn configure_base_url(ctx: &mut RunnerContext<BrowserRunnerContext>) -> HookResult {
    let base_url = parse_base_url(ctx.get_connection_string())?;
    ctx.get_mut().base_url = Some(base_url);
    Ok(())
}

fn parse_base_url(connection_string: &str) -> anyhow::Result<Url> {
    let url = Url::parse(connection_string)
        .with_context(|| format!("Invalid base URL [{}]", connection_string))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!(
            "Base URL [{}] must use http or https, got [{}]",
            connection_string,
            url.scheme()
        );
    }

    Ok(url)
}

/// The browser identity this run is driving, taken from the `BROWSER` environment variable.
///
/// This is the slot a CI test matrix fills in. It is carried as a tag on every measurement so
/// runs against different engines can be told apart.
pub fn browser_name() -> String {
    browser_name_from(std::env::var("BROWSER").ok())
}

fn browser_name_from(var: Option<String>) -> String {
    var.filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "chromium".to_string())
}

/// Launches the agent's browser and opens a blank page.
///
/// After calling this from your agent setup, the page is available through
/// [BrowserAgentContext::page]. Raise the page's default timeout before navigating if the page
/// under test renders slowly.
pub fn launch_browser(
    ctx: &mut AgentContext<BrowserRunnerContext, BrowserAgentContext>,
) -> HookResult {
    let reporter = ctx.runner_context().reporter();
    let browser = browser_name();

    let (browser, page) = ctx
        .runner_context()
        .executor()
        .execute_in_place(async move {
            log::info!("Launching browser [{}]", browser);
            let browser_client = InstrumentedBrowser::launch(reporter).await?;
            let page = browser_client.new_page(&browser).await?;
            Ok((browser_client, page))
        })
        .context("Failed to launch browser, is a Chromium build installed? Set `CHROME` to point at one")?;

    ctx.get_mut().browser = Some(browser);
    ctx.get_mut().page = Some(page);

    Ok(())
}

/// The URL a notebook is rendered at: `/voila/render/<notebook>.ipynb` on the base host.
pub fn render_url(base_url: &Url, notebook: &str) -> anyhow::Result<Url> {
    base_url
        .join(&format!("/voila/render/{}.ipynb", notebook))
        .with_context(|| format!("Cannot build render URL for notebook [{}]", notebook))
}

/// Navigate the agent's page to `url`, recording the elapsed wall-clock time as the render
/// benchmark for `notebook`.
///
/// The measurement is attached to the run report exactly once per call, tagged with the
/// notebook, the browser identity and the run id, and is recorded whether or not the
/// navigation succeeded. A custom metric with the duration in milliseconds is emitted
/// alongside for metrics backends.
pub fn record_render_benchmark(
    ctx: &AgentContext<BrowserRunnerContext, BrowserAgentContext>,
    notebook: &str,
    url: &Url,
) -> HookResult {
    let page = ctx.get().page()?;
    let reporter = ctx.runner_context().reporter();

    let record = OperationRecord::new(RENDER_OPERATION_ID)
        .with_attr("notebook", notebook)
        .with_attr("browser", page.browser_name())
        .with_attr("run_id", ctx.runner_context().get_run_id());

    let response = ctx
        .runner_context()
        .executor()
        .execute_in_place(page.goto(url.as_str()));

    let record = record.finish(&response);
    let duration_ms = record
        .duration()
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or_default();
    reporter.add_operation(record);

    reporter.add_custom(
        ReportMetric::new("notebook_render")
            .with_field("duration_ms", duration_ms)
            .with_tag("notebook", notebook.to_string())
            .with_tag("browser", page.browser_name().to_string()),
    );

    response
}

/// Capture a full-page screenshot of the agent's page.
pub fn capture_screenshot(
    ctx: &AgentContext<BrowserRunnerContext, BrowserAgentContext>,
) -> anyhow::Result<Vec<u8>> {
    let page = ctx.get().page()?;
    ctx.runner_context()
        .executor()
        .execute_in_place(page.screenshot_full_page())
}

/// Close the agent's page and browser. Call this from your agent teardown so the page is
/// released even when the behaviour failed.
pub fn close_page(ctx: &mut AgentContext<BrowserRunnerContext, BrowserAgentContext>) -> HookResult {
    let page = ctx.get_mut().page.take();
    let browser = ctx.get_mut().browser.take();

    // Teardown runs after the shutdown signal has fired in timed and soak runs, so the close
    // must not be raced against it or the browser process leaks.
    ctx.runner_context().executor().execute_in_place_unchecked(async move {
        let mut result = Ok(());

        if let Some(page) = page {
            if let Err(e) = page.close().await {
                log::warn!("Failed to close page: {:?}", e);
                result = Err(e);
            }
        }

        if let Some(browser) = browser {
            if let Err(e) = browser.close().await {
                log::warn!("Failed to close browser: {:?}", e);
                result = result.and(Err(e));
            }
        }

        result
    })
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use render_tunnel_core::prelude::{AgentBailError, ShutdownSignalError};
use render_tunnel_instruments::ReportConfig;

use crate::cli::ReporterOpt;
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
use crate::definition::ScenarioDefinitionBuilder;
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;

enum AgentOutcome {
    Completed,
    Bailed,
    Failed,
}

/// Run a scenario to completion.
///
/// Returns the number of agents whose behaviour completed successfully. In single-pass mode
/// (no duration configured) any behaviour failure fails the run as a whole.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<usize> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario [{}] with run id [{}], started at {}",
        definition.name,
        definition.run_id,
        chrono::Utc::now().to_rfc3339()
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);

    let reporter = match definition.reporter {
        ReporterOpt::InMemory => ReportConfig::default().enable_in_memory(),
        ReporterOpt::Influx => ReportConfig::default().enable_influx_client(),
        ReporterOpt::Noop => ReportConfig::default(),
    }
    .init(&runtime, shutdown_handle.new_listener())?;

    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let mut runner_context = RunnerContext::new(
        executor,
        reporter,
        shutdown_handle.clone(),
        definition.connection_string.clone(),
        definition.run_id.clone(),
    );

    if let Some(setup_fn) = &definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    // Time bounded scenarios get a progress bar and a timer that stops the run.
    if let Some(duration) = definition.duration_s {
        if !definition.no_progress {
            start_progress(
                Duration::from_secs(duration),
                shutdown_handle.new_listener(),
            );
        }

        let timer_shutdown_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(Duration::from_secs(duration)).await;
            timer_shutdown_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);
    let runner_context_for_teardown = runner_context.clone();

    // Agents are about to start, watch for resource pressure which could skew the measurements.
    start_monitor(shutdown_handle.new_listener());

    let single_pass = definition.is_single_pass();
    let assigned_behaviours = definition.assigned_behaviours_flat();

    let mut handles = Vec::new();
    for (agent_index, assigned_behaviour) in assigned_behaviours.iter().enumerate() {
        let runner_context = runner_context.clone();

        let setup_agent_fn = definition.setup_agent_fn;
        let agent_behaviour_fn = definition
            .agent_behaviour
            .get(assigned_behaviour)
            .copied()
            .with_context(|| format!("No behaviour registered as [{}]", assigned_behaviour))?;
        let teardown_agent_fn = definition.teardown_agent_fn;

        // For checking whether the agent should stop between behaviour cycles.
        let mut cycle_shutdown_receiver = shutdown_handle.new_listener();
        // For the hook implementations to listen for shutdown and respond appropriately.
        let delegated_shutdown_listener = shutdown_handle.new_listener();

        let agent_id = format!("agent-{}", agent_index);

        handles.push(
            std::thread::Builder::new()
                .name(agent_id.clone())
                .spawn(move || {
                    let mut context = AgentContext::new(
                        agent_id.clone(),
                        agent_index,
                        runner_context,
                        delegated_shutdown_listener,
                    );

                    if let Some(setup_agent_fn) = setup_agent_fn {
                        if let Err(e) = setup_agent_fn(&mut context) {
                            log::error!("Agent setup failed for [{}]: {:?}", agent_id, e);
                            run_agent_teardown(teardown_agent_fn, &mut context, &agent_id);
                            return AgentOutcome::Failed;
                        }
                    }

                    let outcome = if single_pass {
                        run_behaviour_once(agent_behaviour_fn, &mut context, &agent_id)
                    } else {
                        run_behaviour_loop(
                            agent_behaviour_fn,
                            &mut context,
                            &agent_id,
                            &mut cycle_shutdown_receiver,
                        )
                    };

                    // The teardown must run even when the behaviour failed so that the page and
                    // browser are released.
                    run_agent_teardown(teardown_agent_fn, &mut context, &agent_id);

                    outcome
                })
                .context("Failed to spawn thread for test agent")?,
        );
    }

    let mut completed = 0;
    let mut failed = 0;
    for handle in handles {
        let outcome = handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining thread for test agent: {:?}", e))?;
        match outcome {
            AgentOutcome::Completed => completed += 1,
            AgentOutcome::Bailed => {}
            AgentOutcome::Failed => failed += 1,
        }
    }

    if let Some(teardown_fn) = definition.teardown_fn {
        // Don't crash the runner if the teardown fails. We still want the reporting and runner
        // shutdown to happen cleanly. The hook is documented as 'best effort'.
        if let Err(e) = teardown_fn(runner_context_for_teardown.clone()) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    // Stop background tasks before the reporters flush.
    shutdown_handle.shutdown();
    runner_context_for_teardown.reporter().finalize();

    if single_pass && failed > 0 {
        anyhow::bail!(
            "{} of {} agents failed during scenario [{}]",
            failed,
            assigned_behaviours.len(),
            definition.name
        );
    }

    Ok(completed)
}

fn run_behaviour_once<RV: UserValuesConstraint, V: UserValuesConstraint>(
    behaviour: fn(&mut AgentContext<RV, V>) -> anyhow::Result<()>,
    context: &mut AgentContext<RV, V>,
    agent_id: &str,
) -> AgentOutcome {
    match behaviour(context) {
        Ok(()) => AgentOutcome::Completed,
        Err(e) if e.is::<AgentBailError>() => {
            log::warn!("Agent [{}] bailed: {:?}", agent_id, e);
            AgentOutcome::Bailed
        }
        Err(e) if e.is::<ShutdownSignalError>() => AgentOutcome::Bailed,
        Err(e) => {
            log::error!("Agent behaviour failed for [{}]: {:?}", agent_id, e);
            AgentOutcome::Failed
        }
    }
}

fn run_behaviour_loop<RV: UserValuesConstraint, V: UserValuesConstraint>(
    behaviour: fn(&mut AgentContext<RV, V>) -> anyhow::Result<()>,
    context: &mut AgentContext<RV, V>,
    agent_id: &str,
    cycle_shutdown_receiver: &mut render_tunnel_core::prelude::DelegatedShutdownListener,
) -> AgentOutcome {
    loop {
        if cycle_shutdown_receiver.should_shutdown() {
            log::debug!("Stopping agent [{}]", agent_id);
            return AgentOutcome::Completed;
        }

        match behaviour(context) {
            Ok(()) => {}
            Err(e) if e.is::<ShutdownSignalError>() => {
                // Expected when the agent is being shut down, the check at the top of the loop
                // will catch this and break out.
            }
            Err(e) if e.is::<AgentBailError>() => {
                log::warn!("Agent [{}] bailed: {:?}", agent_id, e);
                return AgentOutcome::Bailed;
            }
            Err(e) => {
                log::error!("Agent behaviour failed for [{}]: {:?}", agent_id, e);
            }
        }
    }
}

fn run_agent_teardown<RV: UserValuesConstraint, V: UserValuesConstraint>(
    teardown_agent_fn: Option<fn(&mut AgentContext<RV, V>) -> anyhow::Result<()>>,
    context: &mut AgentContext<RV, V>,
    agent_id: &str,
) {
    if let Some(teardown_agent_fn) = teardown_agent_fn {
        if let Err(e) = teardown_agent_fn(context) {
            log::error!("Agent teardown failed for [{}]: {:?}", agent_id, e);
        }
    }
}

//! The default execution mode for e2e scenarios: no duration configured, each agent runs its
//! behaviour exactly once, and resources are released even when the behaviour fails.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use render_tunnel_core::prelude::AgentBailError;
use render_tunnel_runner::prelude::{
    run, AgentContext, HookResult, ReporterOpt, ScenarioCli, ScenarioDefinitionBuilder,
    UserValuesConstraint,
};

#[derive(Default, Debug)]
struct RunnerContextValue {}

impl UserValuesConstraint for RunnerContextValue {}

#[derive(Default, Debug)]
struct AgentContextValue {}

impl UserValuesConstraint for AgentContextValue {}

fn sample_cli_cfg() -> ScenarioCli {
    ScenarioCli {
        connection_string: "http://localhost:8866".to_string(),
        agents: None,
        behaviour: vec![],
        duration: None,
        soak: false,
        no_progress: true,
        reporter: ReporterOpt::Noop,
        run_id: None,
    }
}

#[test]
fn behaviour_runs_exactly_once() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "behaviour_runs_exactly_once",
        sample_cli_cfg(),
    )
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert_eq!(1, result.unwrap());
    assert_eq!(1, CALLS.load(Ordering::SeqCst));
}

#[test]
fn behaviour_failure_fails_the_run() {
    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        Err(anyhow::anyhow!("screenshot did not match baseline"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "behaviour_failure_fails_the_run",
        sample_cli_cfg(),
    )
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert!(result.is_err());
}

#[test]
fn teardown_runs_after_failed_behaviour() {
    static TORN_DOWN: AtomicBool = AtomicBool::new(false);

    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        Err(anyhow::anyhow!("navigation timed out"))
    }

    fn agent_teardown(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        TORN_DOWN.store(true, Ordering::SeqCst);
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "teardown_runs_after_failed_behaviour",
        sample_cli_cfg(),
    )
    .use_agent_behaviour(agent_behaviour)
    .use_agent_teardown(agent_teardown);

    let result = run(scenario);

    assert!(result.is_err());
    assert!(TORN_DOWN.load(Ordering::SeqCst));
}

#[test]
fn agent_setup_failure_fails_the_run() {
    fn agent_setup(_ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>) -> HookResult {
        Err(anyhow::anyhow!("browser failed to launch"))
    }

    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "agent_setup_failure_fails_the_run",
        sample_cli_cfg(),
    )
    .use_agent_setup(agent_setup)
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert!(result.is_err());
}

#[test]
fn bail_skips_the_agent_without_failing_the_run() {
    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        Err(AgentBailError::default().into())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "bail_skips_the_agent_without_failing_the_run",
        sample_cli_cfg(),
    )
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert_eq!(0, result.unwrap());
}

#[test]
fn one_pass_per_agent_when_multiple_agents() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    let mut cfg = sample_cli_cfg();
    cfg.agents = Some(3);
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "one_pass_per_agent_when_multiple_agents",
        cfg,
    )
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert_eq!(3, result.unwrap());
    assert_eq!(3, CALLS.load(Ordering::SeqCst));
}

//! Soak runs have no duration but must keep looping the behaviour until the shutdown signal
//! stops them.

use std::sync::atomic::{AtomicUsize, Ordering};

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

fn soak_cli_cfg() -> ScenarioCli {
    ScenarioCli {
        connection_string: "http://localhost:8866".to_string(),
        agents: None,
        behaviour: vec![],
        duration: None,
        soak: true,
        no_progress: true,
        reporter: ReporterOpt::Noop,
        run_id: None,
    }
}

#[test]
fn soak_loops_until_stopped() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn agent_behaviour(
        ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        if CALLS.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
            ctx.runner_context().force_stop_scenario();
        }
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "soak_loops_until_stopped",
        soak_cli_cfg(),
    )
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert_eq!(1, result.unwrap());
    assert!(CALLS.load(Ordering::SeqCst) >= 3);
}

#[test]
fn soak_ignores_default_duration() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn agent_behaviour(
        ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        if CALLS.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
            ctx.runner_context().force_stop_scenario();
        }
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "soak_ignores_default_duration",
        soak_cli_cfg(),
    )
    .with_default_duration_s(3600)
    .use_agent_behaviour(agent_behaviour);

    let result = run(scenario);

    assert_eq!(1, result.unwrap());
    assert!(CALLS.load(Ordering::SeqCst) >= 3);
}

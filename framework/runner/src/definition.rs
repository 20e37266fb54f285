use std::collections::HashMap;
use std::sync::Arc;

use crate::cli::ScenarioCli;
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type AgentHookMut<RV, V> = fn(&mut AgentContext<RV, V>) -> HookResult;

pub(crate) const DEFAULT_BEHAVIOUR_NAME: &str = "default";

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario to define what you want to run.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: ScenarioCli,
    /// Duration used when the CLI does not specify one. Leave unset for single-pass e2e
    /// scenarios.
    default_duration_s: Option<u64>,
    /// Global setup hook, run once before any agents are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Setup hook for an agent, run once for each agent as it starts.
    setup_agent_fn: Option<AgentHookMut<RV, V>>,
    /// The agent behaviours for this scenario, keyed by name. Most scenarios define a single
    /// `default` behaviour via [ScenarioDefinitionBuilder::use_agent_behaviour].
    agent_behaviour: HashMap<String, AgentHookMut<RV, V>>,
    /// Teardown hook for an agent. Runs after the behaviour, including when the behaviour
    /// failed, so resources like browser pages are always released.
    teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    /// Global teardown hook, run once after all agents have finished. Best effort.
    teardown_fn: Option<GlobalHook<RV>>,
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub name: String,
    pub connection_string: String,
    pub run_id: String,
    pub agents: usize,
    pub assigned_behaviours: Vec<(String, usize)>,
    pub duration_s: Option<u64>,
    pub soak: bool,
    pub no_progress: bool,
    pub reporter: crate::cli::ReporterOpt,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub setup_agent_fn: Option<AgentHookMut<RV, V>>,
    pub agent_behaviour: HashMap<String, AgentHookMut<RV, V>>,
    pub teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    pub teardown_fn: Option<GlobalHook<RV>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Initialise a new scenario definition from the scenario name and parsed command line
    /// arguments. See [ScenarioDefinitionBuilder::name] for guidance on the name.
    pub fn new(name: &str, cli: ScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_duration_s: None,
            setup_fn: None,
            setup_agent_fn: None,
            agent_behaviour: HashMap::new(),
            teardown_agent_fn: None,
            teardown_fn: None,
        }
    }

    /// Set the duration to use when the CLI does not provide one. Scenarios that should run as
    /// a single pass must not call this.
    pub fn with_default_duration_s(mut self, duration_s: u64) -> Self {
        self.default_duration_s = Some(duration_s);
        self
    }

    /// Set the global setup hook for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the agent setup hook for this scenario.
    pub fn use_agent_setup(mut self, setup_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.setup_agent_fn = Some(setup_agent_fn);
        self
    }

    /// Set the default agent behaviour hook for this scenario.
    pub fn use_agent_behaviour(self, behaviour: AgentHookMut<RV, V>) -> Self {
        self.use_named_agent_behaviour(DEFAULT_BEHAVIOUR_NAME, behaviour)
    }

    /// Set a named agent behaviour hook for this scenario.
    pub fn use_named_agent_behaviour(
        mut self,
        name: &str,
        behaviour: AgentHookMut<RV, V>,
    ) -> Self {
        let previous = self.agent_behaviour.insert(name.to_string(), behaviour);

        if previous.is_some() {
            panic!("Behaviour [{}] is already defined", name);
        }

        self
    }

    /// Set the agent teardown hook for this scenario.
    pub fn use_agent_teardown(mut self, teardown_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.teardown_agent_fn = Some(teardown_agent_fn);
        self
    }

    /// Set the global teardown hook for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let assigned_total: usize = self.cli.behaviour.iter().map(|(_, count)| count).sum();
        let agents = self.cli.agents.unwrap_or(assigned_total.max(1));

        for (name, _) in &self.cli.behaviour {
            if !self.agent_behaviour.contains_key(name) {
                anyhow::bail!("Assigned behaviour [{}] is not defined for this scenario", name);
            }
        }

        if assigned_total > agents {
            anyhow::bail!(
                "{} agents were assigned behaviours but only {} agents are configured",
                assigned_total,
                agents
            );
        }

        if assigned_total < agents && !self.agent_behaviour.contains_key(DEFAULT_BEHAVIOUR_NAME) {
            anyhow::bail!(
                "{} agents have no assigned behaviour and no default behaviour is defined",
                agents - assigned_total
            );
        }

        // Soak runs until stopped, so it overrides any configured duration.
        let duration_s = if self.cli.soak {
            None
        } else {
            self.cli.duration.or(self.default_duration_s)
        };

        Ok(ScenarioDefinition {
            name: self.name,
            connection_string: self.cli.connection_string,
            run_id: self
                .cli
                .run_id
                .unwrap_or_else(|| nanoid::nanoid!()),
            agents,
            assigned_behaviours: self.cli.behaviour,
            duration_s,
            soak: self.cli.soak,
            no_progress: self.cli.no_progress,
            reporter: self.cli.reporter,
            setup_fn: self.setup_fn,
            setup_agent_fn: self.setup_agent_fn,
            agent_behaviour: self.agent_behaviour,
            teardown_agent_fn: self.teardown_agent_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinition<RV, V> {
    /// One behaviour name per agent, in agent index order. Named assignments first, remaining
    /// agents get the default behaviour.
    pub(crate) fn assigned_behaviours_flat(&self) -> Vec<String> {
        let mut flat = Vec::with_capacity(self.agents);
        for (name, count) in &self.assigned_behaviours {
            flat.extend(std::iter::repeat(name.clone()).take(*count));
        }
        while flat.len() < self.agents {
            flat.push(DEFAULT_BEHAVIOUR_NAME.to_string());
        }
        flat
    }

    /// Single-pass scenarios run each agent's behaviour exactly once and propagate behaviour
    /// failures. Timed scenarios loop the behaviour until the duration elapses, and soak
    /// scenarios loop until the shutdown signal stops them.
    pub(crate) fn is_single_pass(&self) -> bool {
        self.duration_s.is_none() && !self.soak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ReporterOpt, ScenarioCli};

    fn cli() -> ScenarioCli {
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

    fn behaviour(_ctx: &mut AgentContext<(), ()>) -> HookResult {
        Ok(())
    }

    #[test]
    fn defaults_to_one_agent_single_pass() {
        let definition = ScenarioDefinitionBuilder::<(), ()>::new("test", cli())
            .use_agent_behaviour(behaviour)
            .build()
            .unwrap();

        assert_eq!(definition.agents, 1);
        assert!(definition.is_single_pass());
        assert_eq!(definition.assigned_behaviours_flat(), vec!["default"]);
    }

    #[test]
    fn default_duration_makes_timed_run() {
        let definition = ScenarioDefinitionBuilder::<(), ()>::new("test", cli())
            .with_default_duration_s(60)
            .use_agent_behaviour(behaviour)
            .build()
            .unwrap();

        assert_eq!(definition.duration_s, Some(60));
        assert!(!definition.is_single_pass());
    }

    #[test]
    fn soak_overrides_duration() {
        let mut cli = cli();
        cli.duration = Some(30);
        cli.soak = true;

        let definition = ScenarioDefinitionBuilder::<(), ()>::new("test", cli)
            .use_agent_behaviour(behaviour)
            .build()
            .unwrap();

        assert_eq!(definition.duration_s, None);
        // No duration, but a soak run still loops rather than running a single pass.
        assert!(!definition.is_single_pass());
    }

    #[test]
    fn named_assignments_fill_before_default() {
        let mut cli = cli();
        cli.agents = Some(3);
        cli.behaviour = vec![("warm".to_string(), 2)];

        let definition = ScenarioDefinitionBuilder::<(), ()>::new("test", cli)
            .use_named_agent_behaviour("warm", behaviour)
            .use_agent_behaviour(behaviour)
            .build()
            .unwrap();

        assert_eq!(
            definition.assigned_behaviours_flat(),
            vec!["warm", "warm", "default"]
        );
    }

    #[test]
    fn unknown_assigned_behaviour_rejected() {
        let mut cli = cli();
        cli.behaviour = vec![("missing".to_string(), 1)];

        let result = ScenarioDefinitionBuilder::<(), ()>::new("test", cli)
            .use_agent_behaviour(behaviour)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn over_assignment_rejected() {
        let mut cli = cli();
        cli.agents = Some(1);
        cli.behaviour = vec![("warm".to_string(), 2)];

        let result = ScenarioDefinitionBuilder::<(), ()>::new("test", cli)
            .use_named_agent_behaviour("warm", behaviour)
            .build();

        assert!(result.is_err());
    }
}

use clap::{Parser, ValueEnum};

/// Command line arguments shared by every scenario binary.
#[derive(Debug, Parser)]
#[command(about, long_about = None)]
pub struct ScenarioCli {
    /// Base URL of the service under test, for example `http://localhost:8866`.
    #[clap(short, long)]
    pub connection_string: String,

    /// The number of agents to run.
    ///
    /// Each agent owns one browser page for the duration of the scenario. Defaults to one, or to
    /// the total of the `--behaviour` assignments when those are given.
    #[clap(long)]
    pub agents: Option<usize>,

    /// Assign a behaviour to a number of agents, in the format `behaviour:count`.
    ///
    /// The count is optional and defaults to 1. The flag can be repeated to assign multiple
    /// behaviours. Agents not covered by an assignment run the `default` behaviour.
    #[clap(long, short, value_parser = parse_agent_behaviour)]
    pub behaviour: Vec<(String, usize)>,

    /// The number of seconds to run the scenario for.
    ///
    /// When neither this nor `--soak` is given, each agent runs its behaviour exactly once and
    /// the run fails if any behaviour fails. That is the mode an e2e scenario wants.
    #[clap(long)]
    pub duration: Option<u64>,

    /// Run as a soak test, ignoring any configured duration and continuing until stopped.
    #[clap(long, default_value = "false")]
    pub soak: bool,

    /// Do not show a progress bar. Recommended for CI where nobody is watching it.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Where measurements are reported to.
    #[clap(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Identifier grouping all measurements from one scenario invocation. Generated when not
    /// provided.
    #[clap(long)]
    pub run_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Collect in memory and print a summary table at the end of the run.
    #[default]
    InMemory,
    /// Ship measurements to InfluxDB, configured via `INFLUX_*` environment variables.
    Influx,
    /// Discard all measurements.
    Noop,
}

fn parse_agent_behaviour(s: &str) -> anyhow::Result<(String, usize)> {
    let mut parts = s.split(':');
    let name = parts
        .next()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .ok_or(anyhow::anyhow!("No name specified for behaviour"))?;

    let count = parts.next().and_then(|s| s.parse::<usize>().ok()).unwrap_or(1);

    Ok((name, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaviour_with_count() {
        assert_eq!(
            parse_agent_behaviour("render:5").unwrap(),
            ("render".to_string(), 5)
        );
    }

    #[test]
    fn behaviour_count_defaults_to_one() {
        assert_eq!(
            parse_agent_behaviour("render").unwrap(),
            ("render".to_string(), 1)
        );
    }

    #[test]
    fn empty_behaviour_rejected() {
        assert!(parse_agent_behaviour("").is_err());
    }
}

use sysinfo::{Pid, ProcessRefreshKind, System};

use render_tunnel_core::prelude::DelegatedShutdownListener;

/// Monitor the resource usage of the runner process and report high usage.
///
/// This won't stop the scenario, it just warns the user that their measurements might be
/// affected. Rendering-heavy pages can easily saturate a small CI box and make the benchmark
/// numbers meaningless.
pub(crate) fn start_monitor(mut shutdown_listener: DelegatedShutdownListener) {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu();
            let cpu_count = sys.cpus().len();

            loop {
                if shutdown_listener.should_shutdown() {
                    break;
                }

                sys.refresh_process_specifics(
                    this_process_pid,
                    ProcessRefreshKind::new().with_cpu(),
                );

                let Some(process) = sys.process(this_process_pid) else {
                    log::debug!("Could not read process info, stopping resource monitor");
                    break;
                };

                let usage = (process.cpu_usage() / (cpu_count * 100) as f32) * 100.0;
                if usage > 10.0 {
                    log::warn!(
                        "High CPU usage detected. The runner is using {:.2}% of the CPU, with {} available cores",
                        usage,
                        cpu_count
                    );
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .expect("Failed to start monitor thread");
}

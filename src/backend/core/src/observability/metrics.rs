//! Prometheus metrics.

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and describe our metrics.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// A handle whose recorder is not installed globally. Renders nothing
/// recorded through the `metrics` macros; used where a process-wide
/// recorder must not be claimed, such as tests.
pub fn detached() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "tollbooth_access_decisions_total",
        "Access checks by outcome, denial reason and service"
    );
    describe_counter!("tollbooth_logins_total", "Login attempts by outcome");
    describe_counter!(
        "tollbooth_errors_total",
        "Errors returned to callers by code and category"
    );
}

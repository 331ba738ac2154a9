use std::sync::Once;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. `RUST_LOG` overrides
/// the default `roadmap=debug`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roadmap=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Brackets a scenario with timing output.
pub struct TestLogger {
    scenario: String,
    started: Instant,
}

impl TestLogger {
    #[must_use]
    pub fn new(scenario: &str) -> Self {
        init_test_tracing();
        println!("[SCENARIO] {scenario}");
        Self {
            scenario: scenario.to_string(),
            started: Instant::now(),
        }
    }

    pub fn step(&self, what: &str) {
        println!("[STEP +{:?}] {what}", self.started.elapsed());
    }

    pub fn observe<T: std::fmt::Debug>(&self, name: &str, value: &T) {
        println!("[OBSERVED] {name}: {value:?}");
    }

    pub fn pass(&self) {
        println!("[PASSED] {} in {:?}", self.scenario, self.started.elapsed());
    }
}

use failsafe::{backoff, failure_policy, Config};
use std::time::Duration;

pub type EnrichmentCircuitBreaker =
    failsafe::StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Circuit breaker guarding calls to the enrichment service.
///
/// Five consecutive transport failures open the circuit; it is probed again
/// after an exponential backoff between 10s and 60s. While open, calls fail
/// fast with `failsafe::Error::Rejected`.
pub fn create_enrichment_circuit_breaker() -> EnrichmentCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

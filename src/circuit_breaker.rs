use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Consecutive credential rejections that open the circuit.
pub const REJECTION_THRESHOLD: u32 = 5;

/// Circuit breaker type guarding model calls within one batch.
pub type UpstreamCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates a circuit breaker for the model calls of one batch.
///
/// Credentials arrive per request, so each batch gets its own breaker: a
/// revoked key opens the circuit for its own batch and nobody else's. Only
/// credential rejections (401/403) are recorded as failures; throttling,
/// server errors and timeouts count as successes and reset the streak.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive credential rejections triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, leads are sent to the model.
/// - **OPEN**: Key keeps being refused, remaining leads fail fast without a call.
/// - **HALF_OPEN**: Testing if the upstream recovered.
pub fn create_upstream_circuit_breaker() -> UpstreamCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy =
        failure_policy::consecutive_failures(REJECTION_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

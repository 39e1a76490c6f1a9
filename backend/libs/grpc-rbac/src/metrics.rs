/// Prometheus metrics for authorization decisions
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static AUTHZ_DECISIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "grpc_rbac_decisions_total",
        "Total number of authorization decisions by method and outcome",
        &["method", "outcome"]
    )
    .expect("Failed to register authorization decisions metric")
});

/// `method` must come from a bounded set (see `AuthGate::method_label`);
/// `outcome` is `allowed` or the rejection reason label
pub fn record_decision(method: &str, outcome: &str) {
    AUTHZ_DECISIONS.with_label_values(&[method, outcome]).inc();
}

/// Current counter value, for tests and debugging endpoints
pub fn decision_count(method: &str, outcome: &str) -> u64 {
    AUTHZ_DECISIONS.with_label_values(&[method, outcome]).get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decision() {
        let before = decision_count("/metrics.Test/Method", "no_token");
        record_decision("/metrics.Test/Method", "no_token");
        assert_eq!(decision_count("/metrics.Test/Method", "no_token"), before + 1);
    }
}

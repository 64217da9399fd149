use abuseguard_models::Severity;

/// Map a count against its limit to a severity tier.
///
/// `None` when `observed <= limit`; medium up to twice the limit, high up to
/// three times, critical beyond. A zero limit makes any event critical.
pub fn classify(observed: u64, limit: u64) -> Option<Severity> {
    if observed <= limit {
        None
    } else if observed <= limit.saturating_mul(2) {
        Some(Severity::Medium)
    } else if observed <= limit.saturating_mul(3) {
        Some(Severity::High)
    } else {
        Some(Severity::Critical)
    }
}

//! Logging shorthands shared by the AbuseGuard crates.

/// Evaluate an expression and log how long it took
#[macro_export]
macro_rules! log_timed {
    ($name:expr, $block:expr) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(target: "timing", operation = $name, duration_ms = duration_ms, "operation completed");
        result
    }};
}

/// Log a security-relevant denial or anomaly
#[macro_export]
macro_rules! log_security {
    ($event:expr) => {
        tracing::warn!(target: "security", event = $event, "security event");
    };
    ($event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::warn!(target: "security", event = $event, $($key = ?$value),*, "security event");
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        let value = log_timed!("sum", (1..=4).sum::<i32>());
        assert_eq!(value, 10);

        log_security!("admin_check_failed");
        log_security!("admin_check_failed", user_id = "u-1", path = "/api/admin/alerts");
    }
}

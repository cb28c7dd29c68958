//! Unit tests for environment-dependent logging defaults

use limitflag::logging::{default_directives, is_production};

#[test]
fn test_production_aliases() {
    assert!(is_production("production"));
    assert!(is_production("prod"));
    assert!(!is_production("sandbox"));
    assert!(!is_production(""));
}

#[test]
fn test_sandbox_logs_crate_at_debug() {
    assert_eq!(default_directives("prod"), "info");
    assert_eq!(default_directives("sandbox"), "info,limitflag=debug");
}

//! Unit tests for configuration defaults and environment overrides

use chrono::{NaiveTime, Weekday};
use limitflag::config::ScreenerConfig;
use std::env;

#[test]
fn test_defaults() {
    let config = ScreenerConfig::default();

    assert_eq!(config.concurrency, 8);
    assert_eq!(config.universe.long_ma_period, 233);
    assert_eq!(config.universe.cache_ttl_secs, 7 * 24 * 3600);
    assert_eq!(config.pool.short_vol_ma, 20);
    assert_eq!(config.pool.long_vol_ma, 60);
    assert_eq!(config.pool.min_daily_bars, 70);
    assert_eq!(config.pool.cross_cache_ttl_secs, 3600);
    assert_eq!(config.pattern.sharp_move_threshold, 0.098);
    assert_eq!(config.pattern.flag_contraction_ratio, 0.7);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.schedule.universe_scan_weekday, Weekday::Sun);
    assert_eq!(
        config.schedule.daily_run_after,
        NaiveTime::from_hms_opt(15, 5, 0).unwrap()
    );
}

// Every environment mutation lives in this one test so parallel tests never race on it
#[test]
fn test_env_overrides_and_fallbacks() {
    env::set_var("SCREENER_CONCURRENCY", "16");
    env::set_var("SCREENER_BREAKOUT_VOLUME_RATIO", "2.5");
    env::set_var("SCREENER_UNIVERSE_SCAN_WEEKDAY", "Sat");
    env::set_var("SCREENER_DAILY_RUN_AFTER", "16:30:00");
    env::set_var("SCREENER_MIN_STREAK", "lots");
    env::set_var("SCREENER_RETRY_ATTEMPTS", "0");

    let config = ScreenerConfig::from_env();

    assert_eq!(config.concurrency, 16);
    assert_eq!(config.pattern.breakout_volume_ratio, 2.5);
    assert_eq!(config.schedule.universe_scan_weekday, Weekday::Sat);
    assert_eq!(
        config.schedule.daily_run_after,
        NaiveTime::from_hms_opt(16, 30, 0).unwrap()
    );
    assert_eq!(config.pool.min_streak, 2, "unparsable value falls back");
    assert_eq!(config.retry.max_attempts, 1, "at least one attempt");

    env::set_var("SCREENER_CONCURRENCY", "0");
    assert_eq!(ScreenerConfig::from_env().concurrency, 1);

    for key in [
        "SCREENER_CONCURRENCY",
        "SCREENER_BREAKOUT_VOLUME_RATIO",
        "SCREENER_UNIVERSE_SCAN_WEEKDAY",
        "SCREENER_DAILY_RUN_AFTER",
        "SCREENER_MIN_STREAK",
        "SCREENER_RETRY_ATTEMPTS",
    ] {
        env::remove_var(key);
    }
}

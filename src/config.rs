//! Environment-driven configuration

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Deployment environment (`production`, `sandbox`, ...)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn get_database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| {
        "host=localhost port=5432 user=limitflag password=limitflag dbname=limitflag".to_string()
    })
}

pub fn get_redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string())
}

pub fn get_http_port() -> u16 {
    env_or("PORT", 8080)
}

/// Read `key` and parse it, falling back to `default` when unset or malformed.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = key, value = %raw, default = ?default, "Unparsable config value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Weekly trend + volume stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseScanConfig {
    pub long_ma_period: usize,
    pub vol_ma_period: usize,
    pub weekly_history_bars: usize,
    pub cache_ttl_secs: u64,
}

impl Default for UniverseScanConfig {
    fn default() -> Self {
        Self {
            long_ma_period: 233,
            vol_ma_period: 20,
            weekly_history_bars: 300,
            cache_ttl_secs: 604_800,
        }
    }
}

/// Daily volume cross + intraday momentum stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolFilterConfig {
    pub short_vol_ma: usize,
    pub long_vol_ma: usize,
    pub daily_history_bars: usize,
    pub min_daily_bars: usize,
    pub cross_window_points: usize,
    pub intraday_lookback_days: i64,
    pub min_intraday_bars: usize,
    pub min_streak: usize,
    pub cross_cache_ttl_secs: u64,
}

impl Default for PoolFilterConfig {
    fn default() -> Self {
        Self {
            short_vol_ma: 20,
            long_vol_ma: 60,
            daily_history_bars: 100,
            min_daily_bars: 70,
            cross_window_points: 10,
            intraday_lookback_days: 10,
            min_intraday_bars: 20,
            min_streak: 2,
            cross_cache_ttl_secs: 3_600,
        }
    }
}

/// Limit-up / flag / breakout stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub sharp_move_threshold: f64,
    pub sharp_move_lookback_days: i64,
    pub flag_window_bars: usize,
    pub flag_contraction_ratio: f64,
    pub breakout_volume_ratio: f64,
    pub breakout_change_min: f64,
    pub breakout_change_max: f64,
    pub upper_shadow_max: f64,
    pub stop_loss_ratio: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            sharp_move_threshold: 0.098,
            sharp_move_lookback_days: 30,
            flag_window_bars: 8,
            flag_contraction_ratio: 0.7,
            breakout_volume_ratio: 1.8,
            breakout_change_min: 0.05,
            breakout_change_max: 0.09,
            upper_shadow_max: 0.02,
            stop_loss_ratio: 0.90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub weekly_cron: String,
    pub daily_cron: String,
    /// Weekday on which the universe scan is allowed to run
    pub universe_scan_weekday: Weekday,
    /// Earliest local time for the daily run (after the close)
    pub daily_run_after: NaiveTime,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekly_cron: "0 0 20 * * Sun".to_string(),
            daily_cron: "0 5 15 * * Mon-Fri".to_string(),
            universe_scan_weekday: Weekday::Sun,
            daily_run_after: NaiveTime::from_hms_opt(15, 5, 0).unwrap_or_default(),
        }
    }
}

/// Every tunable of the screening pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Width of the per-instrument fan-out
    pub concurrency: usize,
    pub snapshot_ttl_secs: u64,
    pub universe: UniverseScanConfig,
    pub pool: PoolFilterConfig,
    pub pattern: PatternConfig,
    pub retry: RetryConfig,
    pub schedule: ScheduleConfig,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            snapshot_ttl_secs: 604_800,
            universe: UniverseScanConfig::default(),
            pool: PoolFilterConfig::default(),
            pattern: PatternConfig::default(),
            retry: RetryConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl ScreenerConfig {
    /// Defaults overridden by `SCREENER_*` environment variables
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            concurrency: env_or("SCREENER_CONCURRENCY", d.concurrency).max(1),
            snapshot_ttl_secs: env_or("SCREENER_SNAPSHOT_TTL_SECS", d.snapshot_ttl_secs),
            universe: UniverseScanConfig {
                long_ma_period: env_or("SCREENER_LONG_MA_PERIOD", d.universe.long_ma_period),
                vol_ma_period: env_or("SCREENER_WEEKLY_VOL_MA_PERIOD", d.universe.vol_ma_period),
                weekly_history_bars: env_or(
                    "SCREENER_WEEKLY_HISTORY_BARS",
                    d.universe.weekly_history_bars,
                ),
                cache_ttl_secs: env_or("SCREENER_UNIVERSE_CACHE_TTL_SECS", d.universe.cache_ttl_secs),
            },
            pool: PoolFilterConfig {
                short_vol_ma: env_or("SCREENER_SHORT_VOL_MA", d.pool.short_vol_ma),
                long_vol_ma: env_or("SCREENER_LONG_VOL_MA", d.pool.long_vol_ma),
                daily_history_bars: env_or("SCREENER_DAILY_HISTORY_BARS", d.pool.daily_history_bars),
                min_daily_bars: env_or("SCREENER_MIN_DAILY_BARS", d.pool.min_daily_bars),
                cross_window_points: env_or("SCREENER_CROSS_WINDOW_POINTS", d.pool.cross_window_points),
                intraday_lookback_days: env_or(
                    "SCREENER_INTRADAY_LOOKBACK_DAYS",
                    d.pool.intraday_lookback_days,
                ),
                min_intraday_bars: env_or("SCREENER_MIN_INTRADAY_BARS", d.pool.min_intraday_bars),
                min_streak: env_or("SCREENER_MIN_STREAK", d.pool.min_streak),
                cross_cache_ttl_secs: env_or("SCREENER_CROSS_CACHE_TTL_SECS", d.pool.cross_cache_ttl_secs),
            },
            pattern: PatternConfig {
                sharp_move_threshold: env_or("SCREENER_SHARP_MOVE_THRESHOLD", d.pattern.sharp_move_threshold),
                sharp_move_lookback_days: env_or(
                    "SCREENER_SHARP_MOVE_LOOKBACK_DAYS",
                    d.pattern.sharp_move_lookback_days,
                ),
                flag_window_bars: env_or("SCREENER_FLAG_WINDOW_BARS", d.pattern.flag_window_bars),
                flag_contraction_ratio: env_or(
                    "SCREENER_FLAG_CONTRACTION_RATIO",
                    d.pattern.flag_contraction_ratio,
                ),
                breakout_volume_ratio: env_or(
                    "SCREENER_BREAKOUT_VOLUME_RATIO",
                    d.pattern.breakout_volume_ratio,
                ),
                breakout_change_min: env_or("SCREENER_BREAKOUT_CHANGE_MIN", d.pattern.breakout_change_min),
                breakout_change_max: env_or("SCREENER_BREAKOUT_CHANGE_MAX", d.pattern.breakout_change_max),
                upper_shadow_max: env_or("SCREENER_UPPER_SHADOW_MAX", d.pattern.upper_shadow_max),
                stop_loss_ratio: env_or("SCREENER_STOP_LOSS_RATIO", d.pattern.stop_loss_ratio),
            },
            retry: RetryConfig {
                max_attempts: env_or("SCREENER_RETRY_ATTEMPTS", d.retry.max_attempts).max(1),
                base_delay_ms: env_or("SCREENER_RETRY_BASE_DELAY_MS", d.retry.base_delay_ms),
                fetch_timeout_secs: env_or("SCREENER_FETCH_TIMEOUT_SECS", d.retry.fetch_timeout_secs),
            },
            schedule: ScheduleConfig {
                weekly_cron: env::var("SCREENER_WEEKLY_CRON").unwrap_or(d.schedule.weekly_cron),
                daily_cron: env::var("SCREENER_DAILY_CRON").unwrap_or(d.schedule.daily_cron),
                universe_scan_weekday: env_or(
                    "SCREENER_UNIVERSE_SCAN_WEEKDAY",
                    d.schedule.universe_scan_weekday,
                ),
                daily_run_after: env_or("SCREENER_DAILY_RUN_AFTER", d.schedule.daily_run_after),
            },
        }
    }
}

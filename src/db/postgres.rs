//! PostgreSQL persistence for stage snapshots, trade signals and market bars

use super::ScreenerStore;
use crate::config;
use crate::error::{Result, ScreenerError};
use crate::models::{
    Bar, Granularity, Instrument, InstrumentSeries, Lookback, NewTradeSignal, PoolCandidate,
    ScanCandidate, SeriesRange, SignalStatus, SignalType, TradeSignal,
};
use crate::services::market_data::{SeriesProvider, UniverseProvider};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};

const SIGNAL_COLUMNS: &str = "id, code, name, signal_type, signal_date, signal_price, \
     limit_event_date, pullback_days, volume_ratio, price_change_pct, upper_shadow_pct, \
     stop_loss_price, stop_loss_reason, status, rationale, created_at";

/// Queries share a read lock, since `Client` pipelines them over one
/// connection. Only transactions need `&mut Client` and take the write lock.
pub struct PostgresStore {
    client: RwLock<Client>,
}

impl PostgresStore {
    pub async fn new() -> Result<Self> {
        Self::connect(&config::get_database_url()).await
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| ScreenerError::Persistence(format!("Failed to connect to Postgres: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Postgres connection error");
            }
        });

        let store = Self {
            client: RwLock::new(client),
        };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let client = self.client.read().await;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS instruments (
                    code TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    active BOOLEAN NOT NULL DEFAULT TRUE
                );

                CREATE TABLE IF NOT EXISTS bars (
                    code TEXT NOT NULL,
                    granularity TEXT NOT NULL,
                    ts TIMESTAMP NOT NULL,
                    open DOUBLE PRECISION NOT NULL,
                    high DOUBLE PRECISION NOT NULL,
                    low DOUBLE PRECISION NOT NULL,
                    close DOUBLE PRECISION NOT NULL,
                    volume DOUBLE PRECISION NOT NULL,
                    PRIMARY KEY (code, granularity, ts)
                );

                CREATE TABLE IF NOT EXISTS scan_candidates (
                    code TEXT NOT NULL,
                    name TEXT NOT NULL,
                    as_of_date DATE NOT NULL,
                    close_price DOUBLE PRECISION NOT NULL,
                    long_ma DOUBLE PRECISION NOT NULL,
                    volume DOUBLE PRECISION NOT NULL,
                    vol_ma DOUBLE PRECISION NOT NULL,
                    PRIMARY KEY (code, as_of_date)
                );

                CREATE TABLE IF NOT EXISTS pool_candidates (
                    code TEXT NOT NULL,
                    name TEXT NOT NULL,
                    as_of_date DATE NOT NULL,
                    short_vol_ma DOUBLE PRECISION,
                    long_vol_ma DOUBLE PRECISION,
                    golden_cross BOOLEAN NOT NULL,
                    momentum_status TEXT NOT NULL,
                    PRIMARY KEY (code, as_of_date)
                );

                CREATE TABLE IF NOT EXISTS trade_signals (
                    id BIGSERIAL PRIMARY KEY,
                    code TEXT NOT NULL,
                    name TEXT NOT NULL,
                    signal_type TEXT NOT NULL,
                    signal_date DATE NOT NULL,
                    signal_price DOUBLE PRECISION NOT NULL,
                    limit_event_date DATE NOT NULL,
                    pullback_days BIGINT NOT NULL,
                    volume_ratio DOUBLE PRECISION NOT NULL,
                    price_change_pct DOUBLE PRECISION NOT NULL,
                    upper_shadow_pct DOUBLE PRECISION NOT NULL,
                    stop_loss_price DOUBLE PRECISION NOT NULL,
                    stop_loss_reason TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'PENDING',
                    rationale TEXT NOT NULL,
                    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
                    UNIQUE (code, signal_date, signal_type)
                );

                CREATE INDEX IF NOT EXISTS idx_trade_signals_date ON trade_signals (signal_date);",
            )
            .await
            .map_err(|e| ScreenerError::Persistence(format!("Failed to create schema: {}", e)))?;

        Ok(())
    }
}

fn parse_signal(row: &Row) -> Result<TradeSignal> {
    let signal_type: String = row.try_get("signal_type")?;
    let status: String = row.try_get("status")?;

    Ok(TradeSignal {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        signal_type: signal_type.parse::<SignalType>().map_err(ScreenerError::Persistence)?,
        signal_date: row.try_get("signal_date")?,
        signal_price: row.try_get("signal_price")?,
        limit_event_date: row.try_get("limit_event_date")?,
        pullback_days: row.try_get("pullback_days")?,
        volume_ratio: row.try_get("volume_ratio")?,
        price_change_pct: row.try_get("price_change_pct")?,
        upper_shadow_pct: row.try_get("upper_shadow_pct")?,
        stop_loss_price: row.try_get("stop_loss_price")?,
        stop_loss_reason: row.try_get("stop_loss_reason")?,
        status: status.parse::<SignalStatus>().map_err(ScreenerError::Persistence)?,
        rationale: row.try_get("rationale")?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_bar(row: &Row) -> Result<Bar> {
    Ok(Bar::new(
        row.try_get("open")?,
        row.try_get("high")?,
        row.try_get("low")?,
        row.try_get("close")?,
        row.try_get("volume")?,
        row.try_get("ts")?,
    ))
}

/// Exclusive upper bound: midnight after `date`
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.checked_add_days(Days::new(1))
        .unwrap_or(date)
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
}

#[async_trait]
impl ScreenerStore for PostgresStore {
    async fn replace_scan_candidates(&self, date: NaiveDate, rows: &[ScanCandidate]) -> Result<()> {
        let mut client = self.client.write().await;
        let tx = client.transaction().await?;

        tx.execute("DELETE FROM scan_candidates WHERE as_of_date = $1", &[&date])
            .await?;
        for c in rows {
            tx.execute(
                "INSERT INTO scan_candidates (code, name, as_of_date, close_price, long_ma, volume, vol_ma)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[&c.code, &c.name, &date, &c.close_price, &c.long_ma, &c.volume, &c.vol_ma],
            )
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(date = %date, rows = rows.len(), "Replaced universe snapshot");
        Ok(())
    }

    async fn scan_candidates(&self, date: NaiveDate) -> Result<Vec<ScanCandidate>> {
        let client = self.client.read().await;
        let rows = client
            .query(
                "SELECT code, name, as_of_date, close_price, long_ma, volume, vol_ma
                 FROM scan_candidates WHERE as_of_date = $1 ORDER BY code",
                &[&date],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ScanCandidate {
                    code: row.try_get("code")?,
                    name: row.try_get("name")?,
                    as_of_date: row.try_get("as_of_date")?,
                    close_price: row.try_get("close_price")?,
                    long_ma: row.try_get("long_ma")?,
                    volume: row.try_get("volume")?,
                    vol_ma: row.try_get("vol_ma")?,
                })
            })
            .collect()
    }

    async fn latest_scan_date(&self, on_or_before: NaiveDate) -> Result<Option<NaiveDate>> {
        let client = self.client.read().await;
        let row = client
            .query_one(
                "SELECT MAX(as_of_date) FROM scan_candidates WHERE as_of_date <= $1",
                &[&on_or_before],
            )
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn scan_history(&self, limit: usize) -> Result<Vec<(NaiveDate, usize)>> {
        let client = self.client.read().await;
        let rows = client
            .query(
                "SELECT as_of_date, COUNT(*) AS n FROM scan_candidates
                 GROUP BY as_of_date ORDER BY as_of_date DESC LIMIT $1",
                &[&(limit as i64)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let n: i64 = row.try_get("n")?;
                Ok((row.try_get("as_of_date")?, n.max(0) as usize))
            })
            .collect()
    }

    async fn replace_pool_candidates(&self, date: NaiveDate, rows: &[PoolCandidate]) -> Result<()> {
        let mut client = self.client.write().await;
        let tx = client.transaction().await?;

        tx.execute("DELETE FROM pool_candidates WHERE as_of_date = $1", &[&date])
            .await?;
        for c in rows {
            tx.execute(
                "INSERT INTO pool_candidates (code, name, as_of_date, short_vol_ma, long_vol_ma, golden_cross, momentum_status)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &c.code,
                    &c.name,
                    &date,
                    &c.short_vol_ma,
                    &c.long_vol_ma,
                    &c.golden_cross,
                    &c.momentum_status,
                ],
            )
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(date = %date, rows = rows.len(), "Replaced pool snapshot");
        Ok(())
    }

    async fn pool_candidates(&self, date: NaiveDate) -> Result<Vec<PoolCandidate>> {
        let client = self.client.read().await;
        let rows = client
            .query(
                "SELECT code, name, as_of_date, short_vol_ma, long_vol_ma, golden_cross, momentum_status
                 FROM pool_candidates WHERE as_of_date = $1 ORDER BY code",
                &[&date],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(PoolCandidate {
                    code: row.try_get("code")?,
                    name: row.try_get("name")?,
                    as_of_date: row.try_get("as_of_date")?,
                    short_vol_ma: row.try_get("short_vol_ma")?,
                    long_vol_ma: row.try_get("long_vol_ma")?,
                    golden_cross: row.try_get("golden_cross")?,
                    momentum_status: row.try_get("momentum_status")?,
                })
            })
            .collect()
    }

    async fn signal_exists(
        &self,
        code: &str,
        date: NaiveDate,
        signal_type: SignalType,
    ) -> Result<bool> {
        let client = self.client.read().await;
        let row = client
            .query_opt(
                "SELECT 1 FROM trade_signals WHERE code = $1 AND signal_date = $2 AND signal_type = $3",
                &[&code, &date, &signal_type.as_str()],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn insert_signals(&self, signals: &[NewTradeSignal]) -> Result<Vec<TradeSignal>> {
        for signal in signals {
            signal.validate().map_err(ScreenerError::Persistence)?;
        }

        let mut client = self.client.write().await;
        let tx = client.transaction().await?;
        let mut inserted = Vec::new();

        for signal in signals {
            let row = tx
                .query_opt(
                    "INSERT INTO trade_signals (code, name, signal_type, signal_date, signal_price,
                        limit_event_date, pullback_days, volume_ratio, price_change_pct, upper_shadow_pct,
                        stop_loss_price, stop_loss_reason, status, rationale)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                     ON CONFLICT (code, signal_date, signal_type) DO NOTHING
                     RETURNING id, created_at",
                    &[
                        &signal.code,
                        &signal.name,
                        &signal.signal_type.as_str(),
                        &signal.signal_date,
                        &signal.signal_price,
                        &signal.limit_event_date,
                        &signal.pullback_days,
                        &signal.volume_ratio,
                        &signal.price_change_pct,
                        &signal.upper_shadow_pct,
                        &signal.stop_loss_price,
                        &signal.stop_loss_reason,
                        &SignalStatus::Pending.as_str(),
                        &signal.rationale,
                    ],
                )
                .await?;

            if let Some(row) = row {
                let id: i64 = row.try_get("id")?;
                let created_at: NaiveDateTime = row.try_get("created_at")?;
                inserted.push(TradeSignal::from_new(id, signal.clone(), created_at));
            }
        }

        // Dropping `tx` on an early return rolls the whole batch back.
        tx.commit().await?;
        tracing::debug!(requested = signals.len(), inserted = inserted.len(), "Inserted trade signals");
        Ok(inserted)
    }

    async fn update_signal_status(
        &self,
        id: i64,
        status: SignalStatus,
        note: Option<&str>,
    ) -> Result<bool> {
        let mut client = self.client.write().await;
        let tx = client.transaction().await?;

        let Some(row) = tx
            .query_opt(
                "SELECT rationale FROM trade_signals WHERE id = $1 FOR UPDATE",
                &[&id],
            )
            .await?
        else {
            return Ok(false);
        };

        let current: String = row.try_get("rationale")?;
        let rationale = match note.filter(|n| !n.is_empty()) {
            Some(note) => TradeSignal::append_note(&current, note),
            None => current,
        };

        tx.execute(
            "UPDATE trade_signals SET status = $1, rationale = $2 WHERE id = $3",
            &[&status.as_str(), &rationale, &id],
        )
        .await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn get_signal(&self, id: i64) -> Result<Option<TradeSignal>> {
        let client = self.client.read().await;
        let query = format!("SELECT {} FROM trade_signals WHERE id = $1", SIGNAL_COLUMNS);
        let row = client.query_opt(query.as_str(), &[&id]).await?;
        row.as_ref().map(parse_signal).transpose()
    }

    async fn signals(
        &self,
        date: NaiveDate,
        status: Option<SignalStatus>,
    ) -> Result<Vec<TradeSignal>> {
        let client = self.client.read().await;
        let rows = match status {
            Some(status) => {
                let query = format!(
                    "SELECT {} FROM trade_signals WHERE signal_date = $1 AND status = $2 ORDER BY id DESC",
                    SIGNAL_COLUMNS
                );
                client
                    .query(query.as_str(), &[&date, &status.as_str()])
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM trade_signals WHERE signal_date = $1 ORDER BY id DESC",
                    SIGNAL_COLUMNS
                );
                client.query(query.as_str(), &[&date]).await?
            }
        };
        rows.iter().map(parse_signal).collect()
    }

    async fn signal_history(&self, since: NaiveDate) -> Result<Vec<TradeSignal>> {
        let client = self.client.read().await;
        let query = format!(
            "SELECT {} FROM trade_signals WHERE signal_date >= $1 ORDER BY signal_date DESC, id DESC",
            SIGNAL_COLUMNS
        );
        let rows = client.query(query.as_str(), &[&since]).await?;
        rows.iter().map(parse_signal).collect()
    }

    async fn signals_for_code(&self, code: &str) -> Result<Vec<TradeSignal>> {
        let client = self.client.read().await;
        let query = format!(
            "SELECT {} FROM trade_signals WHERE code = $1 ORDER BY signal_date DESC, id DESC",
            SIGNAL_COLUMNS
        );
        let rows = client.query(query.as_str(), &[&code]).await?;
        rows.iter().map(parse_signal).collect()
    }
}

#[async_trait]
impl SeriesProvider for PostgresStore {
    async fn fetch_series(
        &self,
        code: &str,
        granularity: Granularity,
        range: SeriesRange,
    ) -> Result<InstrumentSeries> {
        let client = self.client.read().await;
        let end = end_of_day(range.end);

        let rows = match range.lookback {
            Lookback::Bars(n) => {
                let mut rows = client
                    .query(
                        "SELECT ts, open, high, low, close, volume FROM bars
                         WHERE code = $1 AND granularity = $2 AND ts < $3
                         ORDER BY ts DESC LIMIT $4",
                        &[&code, &granularity.as_str(), &end, &(n as i64)],
                    )
                    .await
                    .map_err(|e| ScreenerError::transient(code, e.to_string()))?;
                rows.reverse();
                rows
            }
            Lookback::Days(_) => {
                let start = range
                    .start_date()
                    .unwrap_or(range.end)
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default();
                client
                    .query(
                        "SELECT ts, open, high, low, close, volume FROM bars
                         WHERE code = $1 AND granularity = $2 AND ts >= $3 AND ts < $4
                         ORDER BY ts ASC",
                        &[&code, &granularity.as_str(), &start, &end],
                    )
                    .await
                    .map_err(|e| ScreenerError::transient(code, e.to_string()))?
            }
        };

        let bars = rows.iter().map(parse_bar).collect::<Result<Vec<_>>>()?;
        Ok(InstrumentSeries::new(code, granularity, bars))
    }
}

#[async_trait]
impl UniverseProvider for PostgresStore {
    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        let client = self.client.read().await;
        let rows = client
            .query(
                "SELECT code, name FROM instruments WHERE active ORDER BY code",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| Ok(Instrument::new(row.try_get::<_, String>("code")?, row.try_get::<_, String>("name")?)))
            .collect()
    }
}

//! Shared data models spanning the pipeline stages.

pub mod bar;
pub mod candidates;
pub mod indicators;
pub mod signal;
pub mod stage;

pub use bar::{Bar, Granularity, Instrument, InstrumentSeries, Lookback, SeriesRange};
pub use candidates::{LimitEvent, PoolCandidate, ScanCandidate};
pub use indicators::MacdSeries;
pub use signal::{NewTradeSignal, SignalStatus, SignalType, TradeSignal};
pub use stage::Stage;

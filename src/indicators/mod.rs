//! Pure, stateless indicator math over oldest-first sequences.

pub mod candle;
pub mod momentum;
pub mod trend;

pub use candle::*;
pub use momentum::*;
pub use trend::*;

//! Market data acquisition: price sources, the fetch client and row-set frames.

pub mod circuit_breaker;
pub mod csv_source;
pub mod fetch;
pub mod frame;
pub mod provider;
pub mod scripted;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_source::CsvSource;
pub use fetch::{FetchOutcome, Fetcher};
pub use frame::FrameError;
pub use provider::{DataError, PriceSource, RawBar};
pub use scripted::ScriptedSource;
pub use yahoo::YahooSource;

//! Core of the DX cluster spot watcher.
//!
//! Feed lines are parsed, classified by band and mode, located, scored and
//! stored on a shared [`interface::SpotBoard`], which also tracks band
//! openings and the hourly activity histogram. No network I/O happens here.

pub mod feed;
pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use interface::{Spot, SpotBoard};
pub use prelude::{Band, Clock, Mode, PipelineConfig, SpotError, SpotResult};
pub use processing::SpotPipeline;

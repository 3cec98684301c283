pub mod classifier;
pub mod histogram;
pub mod pipeline;
pub mod resolver;
pub mod rules;
pub mod scorer;
pub mod spot_buffer;
pub mod surge;

pub use classifier::{classify, Classification};
pub use histogram::ActivityHistogram;
pub use pipeline::SpotPipeline;
pub use resolver::{Location, PrefixTable};
pub use spot_buffer::{SpotBuffer, SpotFilter};
pub use surge::{SurgeDetector, SurgeEvent, SurgeKey};

pub mod provider;
pub mod store;

pub use provider::GlucoseDataProvider;
pub use store::{SampleStore, SortedSampleSet};

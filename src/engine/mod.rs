pub mod controller;
pub mod pipeline;

pub use controller::{GlucoseController, RefreshOutcome};
pub use pipeline::{run_pipeline, Backfill, EngineSnapshot, PipelineInput, RefreshTrigger};

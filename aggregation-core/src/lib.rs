// aggregation-core/src/lib.rs
// Typed builder for MongoDB aggregation pipeline stages

pub mod config;
pub mod context;
pub mod error;
pub mod fields;
pub mod pipeline;
pub mod stage;
pub mod unwind;

// Public exports
pub use config::AggregationOptions;
pub use context::{AggregationContext, ExposedFieldsContext, RootContext};
pub use error::{AggregationError, Result};
pub use fields::{ExposedField, ExposedFields, Field, FieldReference, IntoField};
pub use pipeline::{Aggregation, Pipeline, PipelineBuilder};
pub use stage::{
    LimitOperation, MatchOperation, ProjectOperation, SkipOperation, SortDirection,
    SortOperation, Stage, StageDocument,
};
pub use unwind::{UnwindOperation, UnwindSpec};

// aggregation-core/src/pipeline.rs
// Ordered stage list, stage factories and the aggregate command

use crate::config::AggregationOptions;
use crate::context::{AggregationContext, ExposedFieldsContext};
use crate::error::{AggregationError, Result};
use crate::fields::{ExposedFields, IntoField};
use crate::stage::{
    LimitOperation, MatchOperation, ProjectOperation, SkipOperation, SortDirection,
    SortOperation, Stage, StageDocument,
};
use crate::unwind::UnwindOperation;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

// ============================================================================
// STAGE FACTORIES
// ============================================================================

/// `{"$unwind": {"path": "$<field>", "preserveNullAndEmptyArrays": false}}`
pub fn unwind(field: impl IntoField) -> Result<Stage> {
    Ok(Stage::Unwind(UnwindOperation::new(field)?))
}

pub fn unwind_preserving(field: impl IntoField, preserve: bool) -> Result<Stage> {
    Ok(Stage::Unwind(UnwindOperation::with_preserve(field, preserve)?))
}

/// Unwind `field`, recording each element's array index in `index_field`
pub fn unwind_with_index(
    field: impl IntoField,
    index_field: impl IntoField,
    preserve: bool,
) -> Result<Stage> {
    Ok(Stage::Unwind(UnwindOperation::with_index(
        field,
        index_field,
        preserve,
    )?))
}

pub fn match_criteria(criteria: Value) -> Result<Stage> {
    Ok(Stage::Match(MatchOperation::new(criteria)?))
}

pub fn project<I, F>(fields: I) -> Result<Stage>
where
    I: IntoIterator<Item = F>,
    F: IntoField,
{
    Ok(Stage::Project(ProjectOperation::new(fields)?))
}

pub fn sort<I, F>(direction: SortDirection, fields: I) -> Result<Stage>
where
    I: IntoIterator<Item = F>,
    F: IntoField,
{
    Ok(Stage::Sort(SortOperation::by(direction, fields)?))
}

pub fn limit(n: u64) -> Result<Stage> {
    Ok(Stage::Limit(LimitOperation::new(n)?))
}

pub fn skip(n: u64) -> Result<Stage> {
    Ok(Stage::Skip(SkipOperation::new(n)))
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Aggregation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(AggregationError::invalid("Pipeline cannot be empty"));
        }
        debug!(stages = stages.len(), "built aggregation pipeline");
        Ok(Pipeline { stages })
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Render every stage in order
    ///
    /// The first stage resolves fields against `root`; each later stage
    /// sees the fields exposed by the stages before it.
    pub fn render(&self, root: &dyn AggregationContext) -> Vec<StageDocument> {
        let mut exposed: Option<ExposedFields> = None;
        let mut documents = Vec::with_capacity(self.stages.len());

        for (index, stage) in self.stages.iter().enumerate() {
            let document = match &exposed {
                Some(fields) => stage.render(&ExposedFieldsContext::new(fields, root)),
                None => stage.render(root),
            };
            trace!(index, operator = stage.operator(), "rendered stage");
            documents.push(document);

            if let Some(next) = stage.exposed_fields() {
                exposed = Some(match exposed.take() {
                    Some(earlier) if next.is_inheriting() => next.merged_over(&earlier),
                    _ => next,
                });
            }
        }

        documents
    }

    /// Render into a JSON array of stage documents
    pub fn to_json(&self, root: &dyn AggregationContext) -> Result<Value> {
        Ok(serde_json::to_value(self.render(root))?)
    }
}

/// Fluent pipeline assembly
///
/// ```
/// use aggregation_core::pipeline::{limit, unwind};
/// use aggregation_core::Pipeline;
///
/// let pipeline = Pipeline::builder()
///     .then(unwind("items").unwrap())
///     .then(limit(10).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(pipeline.stages().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn then(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        Pipeline::new(self.stages)
    }
}

// ============================================================================
// AGGREGATE COMMAND
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateCommand<'a> {
    aggregate: &'a str,
    pipeline: Vec<StageDocument>,
    #[serde(skip_serializing_if = "is_false")]
    allow_disk_use: bool,
    #[serde(skip_serializing_if = "is_false")]
    explain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<CursorOptions>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CursorOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A pipeline bound to a collection, rendered as the server's `aggregate` command
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    collection: String,
    pipeline: Pipeline,
    options: AggregationOptions,
}

impl Aggregation {
    pub fn new(collection: &str, pipeline: Pipeline) -> Result<Self> {
        if collection.trim().is_empty() {
            return Err(AggregationError::invalid("Collection name must not be blank"));
        }
        Ok(Aggregation {
            collection: collection.to_string(),
            pipeline,
            options: AggregationOptions::default(),
        })
    }

    pub fn with_options(mut self, options: AggregationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// `{"aggregate": <collection>, "pipeline": [...], ...options}`
    ///
    /// The server rejects `cursor` together with `explain`, so it is only
    /// written for regular runs.
    pub fn to_command(&self, root: &dyn AggregationContext) -> Result<Value> {
        let command = AggregateCommand {
            aggregate: &self.collection,
            pipeline: self.pipeline.render(root),
            allow_disk_use: self.options.allow_disk_use,
            explain: self.options.explain,
            cursor: (!self.options.explain).then(|| CursorOptions {
                batch_size: self.options.batch_size,
            }),
        };
        Ok(serde_json::to_value(command)?)
    }
}

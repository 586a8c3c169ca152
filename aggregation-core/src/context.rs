// aggregation-core/src/context.rs
// Resolution of field references into document paths at a given point of a pipeline

use crate::fields::{ExposedFields, Field, FieldReference};
use tracing::warn;

/// Turns field references into the paths valid at one point of a pipeline
///
/// Implementations must be deterministic: rendering a stage twice against
/// the same context has to produce the same document.
pub trait AggregationContext {
    /// Fully resolved path of `field`, displayed with the `$` sigil
    fn reference(&self, field: &Field) -> FieldReference;

    /// The field's own target name, without any resolution or sigil
    fn raw_target_name(&self, field: &Field) -> String {
        field.target().to_string()
    }
}

/// Context of the first stage: every field resolves to its own target
#[derive(Debug, Clone, Copy, Default)]
pub struct RootContext;

impl AggregationContext for RootContext {
    fn reference(&self, field: &Field) -> FieldReference {
        FieldReference::new(field.target())
    }
}

/// Context of a stage that follows stages exposing fields
///
/// Fields exposed earlier resolve to their exposed path; anything else is
/// handed to the parent context.
pub struct ExposedFieldsContext<'a> {
    exposed: &'a ExposedFields,
    parent: &'a dyn AggregationContext,
}

impl<'a> ExposedFieldsContext<'a> {
    pub fn new(exposed: &'a ExposedFields, parent: &'a dyn AggregationContext) -> Self {
        ExposedFieldsContext { exposed, parent }
    }

    pub fn exposed(&self) -> &ExposedFields {
        self.exposed
    }
}

impl AggregationContext for ExposedFieldsContext<'_> {
    fn reference(&self, field: &Field) -> FieldReference {
        if let Some(exposed) = self.exposed.get(field.name()) {
            return FieldReference::exposed(exposed);
        }

        if !self.exposed.is_inheriting() {
            warn!(
                field = %field,
                "field is not exposed by the previous stage, resolving against the parent context"
            );
        }
        self.parent.reference(field)
    }

    fn raw_target_name(&self, field: &Field) -> String {
        self.parent.raw_target_name(field)
    }
}

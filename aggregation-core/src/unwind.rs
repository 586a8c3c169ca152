// aggregation-core/src/unwind.rs
// $unwind stage - one output document per element of an array field

use crate::context::AggregationContext;
use crate::error::Result;
use crate::fields::{ExposedField, ExposedFields, Field, IntoField};
use crate::stage::StageDocument;
use serde::Serialize;
use tracing::debug;

/// Wire form of the `$unwind` stage body
///
/// Field order is the serialized key order: `path`, `includeArrayIndex`
/// (only when set), then `preserveNullAndEmptyArrays`, which is always written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnwindSpec {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_array_index: Option<String>,
    pub preserve_null_and_empty_arrays: bool,
}

/// The `$unwind` stage
///
/// Prefer the factory functions in [`crate::pipeline`] (`unwind`,
/// `unwind_preserving`, `unwind_with_index`) over calling the constructors.
///
/// # Examples
///
/// ```
/// use aggregation_core::{RootContext, UnwindOperation};
/// use serde_json::json;
///
/// let op = UnwindOperation::with_index("items", "idx", true).unwrap();
/// let doc = serde_json::to_value(op.render(&RootContext)).unwrap();
/// assert_eq!(
///     doc,
///     json!({"$unwind": {"path": "$items", "includeArrayIndex": "idx", "preserveNullAndEmptyArrays": true}})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindOperation {
    field: ExposedField,
    include_array_index: Option<ExposedField>,
    preserve_null_and_empty_arrays: bool,
}

impl UnwindOperation {
    /// Unwind `field`, dropping documents where it is missing, null or empty
    pub fn new(field: impl IntoField) -> Result<Self> {
        Self::build(field, None, false)
    }

    /// Unwind `field`; with `preserve` set, documents without elements pass through
    pub fn with_preserve(field: impl IntoField, preserve: bool) -> Result<Self> {
        Self::build(field, None, preserve)
    }

    /// Unwind `field` and write each element's array index into `index_field`
    pub fn with_index(
        field: impl IntoField,
        index_field: impl IntoField,
        preserve: bool,
    ) -> Result<Self> {
        let field = field.into_field()?;
        let index_field = index_field.into_field()?;
        Self::build(field, Some(index_field), preserve)
    }

    fn build(
        field: impl IntoField,
        index_field: Option<Field>,
        preserve: bool,
    ) -> Result<Self> {
        let field = field.into_field()?;
        debug!(
            field = %field,
            index = ?index_field.as_ref().map(|f| f.name()),
            preserve,
            "building $unwind stage"
        );

        Ok(UnwindOperation {
            field: ExposedField::new(field),
            include_array_index: index_field.map(ExposedField::new),
            preserve_null_and_empty_arrays: preserve,
        })
    }

    pub fn field(&self) -> &ExposedField {
        &self.field
    }

    pub fn include_array_index(&self) -> Option<&ExposedField> {
        self.include_array_index.as_ref()
    }

    pub fn preserve_null_and_empty_arrays(&self) -> bool {
        self.preserve_null_and_empty_arrays
    }

    /// Stage body for `ctx`
    ///
    /// `path` goes through the context; the index field is a new output
    /// field, so only its raw target name is written.
    pub fn spec(&self, ctx: &dyn AggregationContext) -> UnwindSpec {
        UnwindSpec {
            path: ctx.reference(self.field.field()).to_string(),
            include_array_index: self
                .include_array_index
                .as_ref()
                .map(|index| ctx.raw_target_name(index.field())),
            preserve_null_and_empty_arrays: self.preserve_null_and_empty_arrays,
        }
    }

    /// Render `{"$unwind": {...}}`
    pub fn render(&self, ctx: &dyn AggregationContext) -> StageDocument {
        StageDocument::Unwind(self.spec(ctx))
    }

    /// The unwound field and the index field stay visible, along with
    /// everything the previous stage exposed.
    pub fn exposed_fields(&self) -> ExposedFields {
        let mut exposed = ExposedFields::default().and(self.field.clone());
        if let Some(index) = &self.include_array_index {
            exposed = exposed.and(index.clone());
        }
        exposed.inheriting(true)
    }
}

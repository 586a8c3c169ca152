// aggregation-core/src/stage.rs
// Pipeline stage kinds and their wire documents

use crate::context::AggregationContext;
use crate::error::{AggregationError, Result};
use crate::fields::{ExposedFields, Field, IntoField};
use crate::unwind::{UnwindOperation, UnwindSpec};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(MatchOperation),
    Project(ProjectOperation),
    Unwind(UnwindOperation),
    Sort(SortOperation),
    Limit(LimitOperation),
    Skip(SkipOperation),
}

/// Rendered stage, ready to be placed in the pipeline array
///
/// Serializes as a single-key document such as `{"$limit": 10}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StageDocument {
    #[serde(rename = "$match")]
    Match(Value),
    #[serde(rename = "$project")]
    Project(Map<String, Value>),
    #[serde(rename = "$unwind")]
    Unwind(UnwindSpec),
    #[serde(rename = "$sort")]
    Sort(Map<String, Value>),
    #[serde(rename = "$limit")]
    Limit(u64),
    #[serde(rename = "$skip")]
    Skip(u64),
}

impl StageDocument {
    /// The stage operator, e.g. `"$unwind"`
    pub fn operator(&self) -> &'static str {
        match self {
            StageDocument::Match(_) => "$match",
            StageDocument::Project(_) => "$project",
            StageDocument::Unwind(_) => "$unwind",
            StageDocument::Sort(_) => "$sort",
            StageDocument::Limit(_) => "$limit",
            StageDocument::Skip(_) => "$skip",
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Stage {
    /// Render this stage against `ctx`
    pub fn render(&self, ctx: &dyn AggregationContext) -> StageDocument {
        match self {
            Stage::Match(stage) => stage.render(),
            Stage::Project(stage) => stage.render(ctx),
            Stage::Unwind(stage) => stage.render(ctx),
            Stage::Sort(stage) => stage.render(ctx),
            Stage::Limit(stage) => StageDocument::Limit(stage.limit()),
            Stage::Skip(stage) => StageDocument::Skip(stage.skip()),
        }
    }

    /// Fields visible to the next stage, `None` when this stage leaves them as they are
    pub fn exposed_fields(&self) -> Option<ExposedFields> {
        match self {
            Stage::Project(stage) => Some(stage.exposed_fields()),
            Stage::Unwind(stage) => Some(stage.exposed_fields()),
            Stage::Match(_) | Stage::Sort(_) | Stage::Limit(_) | Stage::Skip(_) => None,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Project(_) => "$project",
            Stage::Unwind(_) => "$unwind",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Skip(_) => "$skip",
        }
    }
}

impl From<UnwindOperation> for Stage {
    fn from(op: UnwindOperation) -> Self {
        Stage::Unwind(op)
    }
}

impl From<MatchOperation> for Stage {
    fn from(op: MatchOperation) -> Self {
        Stage::Match(op)
    }
}

impl From<ProjectOperation> for Stage {
    fn from(op: ProjectOperation) -> Self {
        Stage::Project(op)
    }
}

impl From<SortOperation> for Stage {
    fn from(op: SortOperation) -> Self {
        Stage::Sort(op)
    }
}

impl From<LimitOperation> for Stage {
    fn from(op: LimitOperation) -> Self {
        Stage::Limit(op)
    }
}

impl From<SkipOperation> for Stage {
    fn from(op: SkipOperation) -> Self {
        Stage::Skip(op)
    }
}

/// $limit stage - keep the first `limit` documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOperation {
    limit: u64,
}

impl LimitOperation {
    pub fn new(limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(AggregationError::invalid("$limit must be a positive number"));
        }
        Ok(LimitOperation { limit })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// $skip stage - drop the first `skip` documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOperation {
    skip: u64,
}

impl SkipOperation {
    pub fn new(skip: u64) -> Self {
        SkipOperation { skip }
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }
}

/// $match stage - filter with a caller-built criteria document
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOperation {
    criteria: Value,
}

impl MatchOperation {
    pub fn new(criteria: Value) -> Result<Self> {
        if !criteria.is_object() {
            return Err(AggregationError::invalid("$match criteria must be an object"));
        }
        Ok(MatchOperation { criteria })
    }

    pub fn criteria(&self) -> &Value {
        &self.criteria
    }

    fn render(&self) -> StageDocument {
        StageDocument::Match(self.criteria.clone())
    }
}

/// $project stage - keep and rename fields
///
/// A plain field renders as `name: 1`, an aliased one as
/// `name: "$<target>"`. Only the projected names stay visible afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOperation {
    fields: Vec<Field>,
}

impl ProjectOperation {
    pub fn new<I, F>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: IntoField,
    {
        let fields = fields
            .into_iter()
            .map(IntoField::into_field)
            .collect::<Result<Vec<_>>>()?;

        if fields.is_empty() {
            return Err(AggregationError::invalid("$project needs at least one field"));
        }
        debug!(count = fields.len(), "building $project stage");
        Ok(ProjectOperation { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn render(&self, ctx: &dyn AggregationContext) -> StageDocument {
        let mut projection = Map::new();
        for field in &self.fields {
            let value = if field.is_aliased() {
                Value::String(ctx.reference(&field.target_field()).to_string())
            } else {
                Value::from(1)
            };
            projection.insert(field.name().to_string(), value);
        }
        StageDocument::Project(projection)
    }

    fn exposed_fields(&self) -> ExposedFields {
        // After projection the documents carry the alias names as keys
        ExposedFields::from_fields(self.fields.iter().map(Field::without_alias))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// $sort stage - order documents by one or more fields
#[derive(Debug, Clone, PartialEq)]
pub struct SortOperation {
    fields: Vec<(Field, SortDirection)>,
}

impl SortOperation {
    /// Sort by `fields`, all in the same direction
    pub fn by<I, F>(direction: SortDirection, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: IntoField,
    {
        let fields = fields
            .into_iter()
            .map(|field| Ok((field.into_field()?, direction)))
            .collect::<Result<Vec<_>>>()?;

        if fields.is_empty() {
            return Err(AggregationError::invalid("$sort needs at least one field"));
        }
        Ok(SortOperation { fields })
    }

    /// Add a tie-breaker field
    pub fn and(mut self, direction: SortDirection, field: impl IntoField) -> Result<Self> {
        self.fields.push((field.into_field()?, direction));
        Ok(self)
    }

    pub fn fields(&self) -> &[(Field, SortDirection)] {
        &self.fields
    }

    fn render(&self, ctx: &dyn AggregationContext) -> StageDocument {
        let mut order = Map::new();
        for (field, direction) in &self.fields {
            order.insert(
                ctx.reference(field).raw().to_string(),
                Value::from(direction.as_i32()),
            );
        }
        StageDocument::Sort(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RootContext;
    use serde_json::json;

    #[test]
    fn test_limit_and_skip_documents() {
        let limit = Stage::from(LimitOperation::new(5).unwrap());
        assert_eq!(
            limit.render(&RootContext).to_json().unwrap(),
            json!({"$limit": 5})
        );
        assert_eq!(
            Stage::from(SkipOperation::new(10)).render(&RootContext).to_json().unwrap(),
            json!({"$skip": 10})
        );
        assert!(limit.exposed_fields().is_none());
    }

    #[test]
    fn test_limit_zero_rejected() {
        let err = LimitOperation::new(0).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidArgument(_)));
        assert_eq!(LimitOperation::new(1).unwrap().limit(), 1);
        assert_eq!(SkipOperation::new(0).skip(), 0);
    }

    #[test]
    fn test_match_requires_object() {
        assert!(MatchOperation::new(json!([1, 2])).is_err());

        let stage = Stage::from(MatchOperation::new(json!({"status": "A"})).unwrap());
        assert_eq!(
            stage.render(&RootContext).to_json().unwrap(),
            json!({"$match": {"status": "A"}})
        );
    }

    #[test]
    fn test_project_plain_and_aliased() {
        let op = ProjectOperation::new(vec![
            Field::new("name").unwrap(),
            Field::aliased("city", "address.city").unwrap(),
        ])
        .unwrap();
        let stage = Stage::from(op);

        assert_eq!(
            stage.render(&RootContext).to_json().unwrap(),
            json!({"$project": {"name": 1, "city": "$address.city"}})
        );

        let exposed = stage.exposed_fields().unwrap();
        assert!(!exposed.is_inheriting());
        assert_eq!(exposed.get("city").unwrap().target(), "city");
    }

    #[test]
    fn test_project_rejects_empty() {
        let empty: Vec<&str> = Vec::new();
        assert!(ProjectOperation::new(empty).is_err());
        assert!(ProjectOperation::new(vec!["a", ""]).is_err());
    }

    #[test]
    fn test_sort_keeps_insertion_order() {
        let op = SortOperation::by(SortDirection::Descending, ["count"])
            .unwrap()
            .and(SortDirection::Ascending, "name")
            .unwrap();

        let text = serde_json::to_string(&Stage::from(op).render(&RootContext)).unwrap();
        assert_eq!(text, r#"{"$sort":{"count":-1,"name":1}}"#);
    }

    #[test]
    fn test_operator_names() {
        let unwind = Stage::from(UnwindOperation::new("items").unwrap());
        assert_eq!(unwind.operator(), "$unwind");
        assert_eq!(unwind.render(&RootContext).operator(), "$unwind");
        assert_eq!(Stage::from(SkipOperation::new(1)).operator(), "$skip");
    }
}

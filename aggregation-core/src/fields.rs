// aggregation-core/src/fields.rs
// Field references and the set of fields a stage exposes to the next one

use crate::error::{AggregationError, Result};
use std::fmt;

/// Strip the `$` sigil and surrounding whitespace from a field name
///
/// `"$items"`, `" items "` and `"items"` all denote the same field.
fn clean_up(source: &str) -> &str {
    source.trim().trim_start_matches('$').trim()
}

fn validated(source: &str, what: &str) -> Result<String> {
    let cleaned = clean_up(source);
    if cleaned.is_empty() {
        return Err(AggregationError::invalid(format!(
            "{} must not be blank (got {:?})",
            what, source
        )));
    }
    Ok(cleaned.to_string())
}

/// A named field of the documents flowing through a pipeline
///
/// A field may be an alias: `name` is how later stages refer to it and
/// `target` is the document path it actually points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    name: String,
    target: Option<String>,
}

impl Field {
    /// Create a plain field, e.g. `Field::new("items")` or `Field::new("$items")`
    pub fn new(name: &str) -> Result<Self> {
        Ok(Field {
            name: validated(name, "Field name")?,
            target: None,
        })
    }

    /// Create a field called `name` that points at `target`
    pub fn aliased(name: &str, target: &str) -> Result<Self> {
        let name = validated(name, "Field name")?;
        let target = validated(target, "Field target")?;
        let target = if target == name { None } else { Some(target) };
        Ok(Field { name, target })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document path this field points at (the name unless aliased)
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }

    pub fn is_aliased(&self) -> bool {
        self.target.is_some()
    }

    /// The same name with the alias dropped
    pub fn without_alias(&self) -> Field {
        Field {
            name: self.name.clone(),
            target: None,
        }
    }

    /// The un-aliased field naming this field's target
    pub fn target_field(&self) -> Field {
        Field {
            name: self.target().to_string(),
            target: None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} -> {}", self.name, target),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Conversion used by every stage constructor
///
/// Lets callers pass `"items"`, `String` or an already built [`Field`].
/// Conversion from text validates the name, so a blank reference is
/// rejected where the stage is constructed.
pub trait IntoField {
    fn into_field(self) -> Result<Field>;
}

impl IntoField for Field {
    fn into_field(self) -> Result<Field> {
        Ok(self)
    }
}

impl IntoField for &Field {
    fn into_field(self) -> Result<Field> {
        Ok(self.clone())
    }
}

impl IntoField for &str {
    fn into_field(self) -> Result<Field> {
        Field::new(self)
    }
}

impl IntoField for String {
    fn into_field(self) -> Result<Field> {
        Field::new(&self)
    }
}

impl IntoField for &String {
    fn into_field(self) -> Result<Field> {
        Field::new(self)
    }
}

/// A field made visible by a stage (an unwound element, an array index,
/// a projected alias)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExposedField {
    field: Field,
}

impl ExposedField {
    pub fn new(field: Field) -> Self {
        ExposedField { field }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn target(&self) -> &str {
        self.field.target()
    }

    /// Whether a later stage may refer to this field as `name`
    pub fn can_be_referred_to_by(&self, name: &str) -> bool {
        self.name() == name || self.target() == name
    }
}

/// Ordered collection of fields exposed by a stage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExposedFields {
    fields: Vec<ExposedField>,
    inheriting: bool,
}

impl ExposedFields {
    /// Fields created by a stage, hiding everything exposed before it
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        ExposedFields {
            fields: fields.into_iter().map(ExposedField::new).collect(),
            inheriting: false,
        }
    }

    /// Keep the fields exposed by earlier stages visible as well
    pub fn inheriting(mut self, inheriting: bool) -> Self {
        self.inheriting = inheriting;
        self
    }

    pub fn is_inheriting(&self) -> bool {
        self.inheriting
    }

    /// Add a field; a field with the same name replaces the existing one
    pub fn and(mut self, field: ExposedField) -> Self {
        self.fields.retain(|existing| existing.name() != field.name());
        self.fields.push(field);
        self
    }

    /// Fields of `self` layered over `earlier`, used for inheriting stages
    pub fn merged_over(self, earlier: &ExposedFields) -> Self {
        let inheriting = self.inheriting;
        let mut merged = ExposedFields {
            fields: earlier.fields.clone(),
            inheriting: earlier.inheriting,
        };
        for field in self.fields {
            merged = merged.and(field);
        }
        merged.inheriting(inheriting && earlier.inheriting)
    }

    /// Look up the field a later stage refers to as `name`
    ///
    /// The most recently added match wins.
    pub fn get(&self, name: &str) -> Option<&ExposedField> {
        self.fields
            .iter()
            .rev()
            .find(|field| field.can_be_referred_to_by(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExposedField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The resolved document path of a field
///
/// Displays with the `$` sigil that marks a field path in a stage
/// (`$items`); [`FieldReference::raw`] gives the bare path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    raw: String,
}

impl FieldReference {
    pub fn new(raw: impl Into<String>) -> Self {
        FieldReference { raw: raw.into() }
    }

    /// Reference to a field exposed by an earlier stage: its target path
    pub fn exposed(field: &ExposedField) -> Self {
        FieldReference::new(field.target())
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.raw)
    }
}

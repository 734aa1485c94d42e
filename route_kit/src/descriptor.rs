//! Per-type field tables shared by the decoder, the validator and the schema
//! generator.
//!
//! A [`TypeDescriptor`] is produced once per type by `#[derive(ApiModel)]` and
//! handed out as a `&'static` reference, so every consumer reads the same table.

use std::any::TypeId;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tags::{self, FieldTags};
use crate::walker::Visited;

/// A type that carries a generated [`TypeDescriptor`].
pub trait ApiModel: 'static {
    fn descriptor() -> &'static TypeDescriptor;
}

/// The bookkeeping marker embedded in request types.
///
/// It carries no data on the wire; the route tags attached to the field are
/// lifted into [`TypeDescriptor::route`] by the derive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta;

/// Soft-delete timestamp. Serialized as a nullable date-time string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeletedAt(pub Option<chrono::DateTime<chrono::Utc>>);

/// The four declarative tags of a request type's `Meta` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteTags {
    pub path: &'static str,
    pub method: &'static str,
    pub summary: &'static str,
    pub tags: &'static str,
}

pub struct TypeDescriptor {
    pub name: &'static str,
    pub type_id: TypeId,
    pub kind: ModelKind,
    /// Present iff the type embeds a `Meta` marker field.
    pub route: Option<RouteTags>,
    /// JSON image of `Default::default()`; `None` for enums.
    pub zero: Option<fn() -> serde_json::Result<Value>>,
}

#[derive(Debug, Clone)]
pub enum ModelKind {
    Struct(Vec<FieldDescriptor>),
    /// Unit-only enum; holds the wire name of each variant.
    Enum(Vec<&'static str>),
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub ident: &'static str,
    pub tags: FieldTags,
    pub shape: Shape,
    pub role: FieldRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Plain,
    /// `#[serde(flatten)]`: fields are promoted into the parent namespace.
    Embedded,
    /// The bookkeeping marker; never part of the wire representation.
    Meta,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Scalar(ScalarKind),
    Time(TimeKind),
    SoftDelete,
    Any,
    Model(TypeRef),
    Optional(Box<Shape>),
    List(Box<Shape>),
    Map(ScalarKind, Box<Shape>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    DateTime,
    NaiveDateTime,
    Date,
}

/// Lazy link to a nested model's descriptor.
///
/// Holding a function pointer instead of the descriptor keeps self-referential
/// types constructible.
#[derive(Clone, Copy)]
pub struct TypeRef {
    descriptor: fn() -> &'static TypeDescriptor,
}

impl TypeRef {
    pub fn of<T: ApiModel>() -> Self {
        TypeRef {
            descriptor: T::descriptor,
        }
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        (self.descriptor)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.descriptor().name).finish()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("route", &self.route)
            .finish()
    }
}

impl TypeDescriptor {
    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            ModelKind::Struct(fields) => fields,
            ModelKind::Enum(_) => &[],
        }
    }

    pub fn variants(&self) -> Option<&[&'static str]> {
        match &self.kind {
            ModelKind::Enum(variants) => Some(variants),
            ModelKind::Struct(_) => None,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, ModelKind::Struct(_))
    }

    /// Zero value of a struct model as a JSON object.
    ///
    /// Starts from the serialized `Default` and writes the zero of every field
    /// serde left out (`skip_serializing_if`, `skip_serializing`), so each wire
    /// field has a value to deserialize from.
    pub fn zero_object(&self) -> serde_json::Result<Map<String, Value>> {
        self.zero_with(&mut Visited::rooted(self))
    }

    fn zero_with(&self, visited: &mut Visited) -> serde_json::Result<Map<String, Value>> {
        let mut map = match self.zero {
            Some(zero) => match zero()? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        fill_missing(self, &mut map, visited)?;
        Ok(map)
    }
}

fn fill_missing(
    desc: &TypeDescriptor,
    map: &mut Map<String, Value>,
    visited: &mut Visited,
) -> serde_json::Result<()> {
    for field in desc.fields() {
        match field.role {
            FieldRole::Meta => {}
            // flatten writes the inner fields into the parent object
            FieldRole::Embedded => {
                let Shape::Model(model) = &field.shape else {
                    continue;
                };
                let inner = model.descriptor();
                if inner.is_struct() && visited.enter(inner) {
                    let result = fill_missing(inner, map, visited);
                    visited.leave(inner);
                    result?;
                }
            }
            FieldRole::Plain => {
                let key = tags::json_name(field);
                if !map.contains_key(key) {
                    let zero = field.shape.zero(visited)?;
                    map.insert(key.to_string(), zero);
                }
            }
        }
    }
    Ok(())
}

impl Shape {
    /// Strips `Optional` layers.
    pub fn pointee(&self) -> &Shape {
        match self {
            Shape::Optional(inner) => inner.pointee(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Shape::Optional(_))
    }

    /// The nested model behind this shape, looking through `Optional`.
    pub fn model(&self) -> Option<&'static TypeDescriptor> {
        match self.pointee() {
            Shape::Model(model) => Some(model.descriptor()),
            _ => None,
        }
    }

    /// Like [`Shape::model`], restricted to struct models.
    pub fn struct_model(&self) -> Option<&'static TypeDescriptor> {
        self.model().filter(|desc| desc.is_struct())
    }

    /// JSON the type's `Default` would produce for this shape. A model already
    /// on the ancestor path yields `null`.
    fn zero(&self, visited: &mut Visited) -> serde_json::Result<Value> {
        Ok(match self {
            Shape::Optional(_) | Shape::SoftDelete | Shape::Any => Value::Null,
            Shape::Scalar(ScalarKind::Bool) => Value::Bool(false),
            Shape::Scalar(ScalarKind::String) => Value::String(String::new()),
            Shape::Scalar(ScalarKind::F32 | ScalarKind::F64) => Value::from(0.0),
            Shape::Scalar(_) => Value::from(0),
            Shape::Time(TimeKind::DateTime) => serde_json::to_value(DateTime::<Utc>::default())?,
            Shape::Time(TimeKind::NaiveDateTime) => serde_json::to_value(NaiveDateTime::default())?,
            Shape::Time(TimeKind::Date) => serde_json::to_value(NaiveDate::default())?,
            Shape::List(_) => Value::Array(Vec::new()),
            Shape::Map(..) => Value::Object(Map::new()),
            Shape::Model(model) => {
                let desc = model.descriptor();
                match desc.variants() {
                    Some(variants) => variants
                        .first()
                        .map_or(Value::Null, |v| Value::String(v.to_string())),
                    None if visited.enter(desc) => {
                        let object = desc.zero_with(visited);
                        visited.leave(desc);
                        Value::Object(object?)
                    }
                    None => Value::Null,
                }
            }
        })
    }
}

#[doc(hidden)]
pub fn zero_value<T: Default + Serialize>() -> serde_json::Result<Value> {
    serde_json::to_value(T::default())
}

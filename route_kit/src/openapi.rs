//! OpenAPI document generation from the definition registry.
//!
//! The document is rebuilt from scratch on every call. Models are named by the
//! chain of their owners (`<Controller>_<Type>`, then `<parent>_<field>`), so
//! same-named types reached through different owners get distinct entries.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::{debug, info};
use utoipa::openapi::path::{
    Operation, OperationBuilder, Parameter, ParameterBuilder, ParameterIn, ParameterStyle,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{
    AdditionalProperties, ArrayBuilder, KnownFormat, ObjectBuilder, OneOfBuilder, Ref, Schema,
    SchemaFormat, SchemaType, Type,
};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, Paths, RefOr,
    Required, ResponseBuilder, ResponsesBuilder,
};

use crate::config::FrameworkConfig;
use crate::descriptor::{ScalarKind, Shape, TimeKind, TypeDescriptor};
use crate::error::Result;
use crate::registry::{ApiDefinition, Registry};
use crate::walker::{self, Visited, WalkedField};

const JSON: &str = "application/json";

/// Builds the document for every definition in `registry`.
pub fn generate(registry: &Registry, config: &FrameworkConfig) -> OpenApi {
    let mut doc = OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(config.title.as_str())
                .version(config.version.as_str())
                .description(Some(config.description.as_str()))
                .build(),
        )
        .paths(Paths::new())
        .build();

    let mut models = Models::default();
    for def in registry.definitions() {
        let method = def.route.method.as_str();
        if !matches!(method, "GET" | "POST" | "PUT" | "DELETE") {
            debug!(handler = %def.handler_name, method, "no document operation for method");
            continue;
        }
        let operation = models.operation(def);
        let item = doc.paths.paths.entry(def.route.path.clone()).or_default();
        match method {
            "GET" => item.get = Some(operation),
            "POST" => item.post = Some(operation),
            "PUT" => item.put = Some(operation),
            _ => item.delete = Some(operation),
        }
    }

    doc.components = Some(
        ComponentsBuilder::new()
            .schemas_from_iter(models.schemas)
            .build(),
    );
    doc
}

/// Pretty-printed document.
pub fn to_json(doc: &OpenApi) -> Result<String> {
    Ok(doc.to_pretty_json()?)
}

pub fn save(doc: &OpenApi, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_json(doc)?)?;
    info!(path = %path.display(), "wrote OpenAPI document");
    Ok(())
}

/// Model properties are keyed by the name the decoder reads for request
/// bodies and by the serialization key for responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keys {
    Wire,
    Json,
}

#[derive(Default)]
struct Models {
    schemas: BTreeMap<String, RefOr<Schema>>,
}

impl Models {
    fn operation(&mut self, def: &ApiDefinition) -> Operation {
        let mut op = OperationBuilder::new()
            .operation_id(Some(def.handler_name.clone()))
            .summary(Some(def.route.summary.clone()))
            .description(Some(def.route.summary.clone()));
        for tag in def.route.tag_list() {
            op = op.tag(tag);
        }

        let segments = path_segments(&def.route.path);
        let mut declared = HashSet::new();
        if matches!(def.route.method.as_str(), "GET" | "DELETE") {
            let name = format!("{}_{}", def.controller, def.request.name);
            let mut params = Vec::new();
            self.query_parameters(
                &name,
                def.request,
                &mut Visited::rooted(def.request),
                &segments,
                &mut params,
            );
            for param in params {
                declared.insert(param.name.clone());
                op = op.parameter(param);
            }
        } else {
            let name = format!("{}_{}", def.controller, def.request.name);
            let body = self.model(&name, def.request, &mut Visited::new(), Keys::Wire);
            op = op.request_body(Some(
                RequestBodyBuilder::new()
                    .required(Some(Required::True))
                    .content(JSON, ContentBuilder::new().schema(body).build())
                    .build(),
            ));
        }
        for segment in segments.iter().filter(|s| !declared.contains(*s)) {
            op = op.parameter(
                ParameterBuilder::new()
                    .name(segment.as_str())
                    .parameter_in(ParameterIn::Path)
                    .required(Required::True)
                    .schema(Some(ObjectBuilder::new().schema_type(Type::String))),
            );
        }

        let name = format!("{}_{}", def.controller, def.response.name);
        let response = self.model(&name, def.response, &mut Visited::new(), Keys::Json);
        op.responses(
            ResponsesBuilder::new()
                .response(
                    "200",
                    ResponseBuilder::new()
                        .description("Successful response")
                        .content(JSON, ContentBuilder::new().schema(response).build())
                        .build(),
                )
                .build(),
        )
        .build()
    }

    /// Flattens `desc` into parameters the way the decoder reads a query.
    fn query_parameters(
        &mut self,
        model: &str,
        desc: &'static TypeDescriptor,
        visited: &mut Visited,
        segments: &[String],
        out: &mut Vec<Parameter>,
    ) {
        for walked in walker::walk(desc, visited) {
            let shape = &walked.field.shape;
            if let Some(nested) = shape.struct_model() {
                if visited.enter(nested) {
                    let name = format!("{model}_{}", walked.field.ident);
                    self.query_parameters(&name, nested, visited, segments, out);
                    visited.leave(nested);
                }
                continue;
            }
            let name = walked.wire_name();
            let schema_name = format!("{model}_{}", walked.field.ident);
            let Some(schema) = self.shape(&schema_name, shape, visited, Keys::Wire) else {
                continue;
            };
            let in_path = segments.iter().any(|s| s == name);
            let mut param = ParameterBuilder::new()
                .name(name)
                .parameter_in(if in_path {
                    ParameterIn::Path
                } else {
                    ParameterIn::Query
                })
                .required(if in_path || walked.resolved.required {
                    Required::True
                } else {
                    Required::False
                })
                .schema(Some(schema));
            if !walked.resolved.description.is_empty() {
                param = param.description(Some(walked.resolved.description.as_str()));
            }
            if matches!(shape.pointee(), Shape::Map(..)) {
                param = param
                    .style(Some(ParameterStyle::DeepObject))
                    .explode(Some(true));
            }
            out.push(param.build());
        }
    }

    /// Registers `desc` under `name` and returns a reference to it, or `None`
    /// when `desc` is already on the ancestor path.
    fn model(
        &mut self,
        name: &str,
        desc: &'static TypeDescriptor,
        visited: &mut Visited,
        keys: Keys,
    ) -> Option<RefOr<Schema>> {
        if !visited.enter(desc) {
            return None;
        }
        let fields: Vec<WalkedField> = match keys {
            Keys::Wire => walker::fields(desc).collect(),
            Keys::Json => walker::walk(desc, visited),
        };
        let mut object = ObjectBuilder::new().schema_type(Type::Object);
        for walked in fields {
            let key = match keys {
                Keys::Wire => walked.wire_name().to_string(),
                Keys::Json => walked.json_name().to_string(),
            };
            let child = format!("{name}_{}", walked.field.ident);
            let Some(schema) = self.shape(&child, &walked.field.shape, visited, keys) else {
                continue;
            };
            object = object.property(
                key.as_str(),
                described(schema, &walked.resolved.description),
            );
            if walked.resolved.required {
                object = object.required(key.as_str());
            }
        }
        visited.leave(desc);
        self.schemas
            .insert(name.to_string(), RefOr::T(Schema::Object(object.build())));
        Some(RefOr::Ref(Ref::from_schema_name(name)))
    }

    fn shape(
        &mut self,
        name: &str,
        shape: &Shape,
        visited: &mut Visited,
        keys: Keys,
    ) -> Option<RefOr<Schema>> {
        match shape {
            Shape::Optional(inner) => self.shape(name, inner, visited, keys).map(nullable),
            Shape::Scalar(kind) => Some(scalar(*kind)),
            Shape::Time(kind) => Some(time(*kind)),
            Shape::SoftDelete => Some(nullable(time(TimeKind::DateTime))),
            Shape::Any => Some(ObjectBuilder::new().schema_type(SchemaType::AnyValue).into()),
            Shape::List(item) => {
                let item = self.shape(&format!("{name}Item"), item, visited, keys)?;
                Some(ArrayBuilder::new().items(item).into())
            }
            Shape::Map(_, value) => {
                let value = self.shape(&format!("{name}Value"), value, visited, keys)?;
                Some(
                    ObjectBuilder::new()
                        .schema_type(Type::Object)
                        .additional_properties(Some(AdditionalProperties::RefOr(value)))
                        .into(),
                )
            }
            Shape::Model(model) => {
                let desc = model.descriptor();
                match desc.variants() {
                    Some(variants) => Some(
                        ObjectBuilder::new()
                            .schema_type(Type::String)
                            .enum_values(Some(variants.iter().copied()))
                            .into(),
                    ),
                    None => self.model(name, desc, visited, keys),
                }
            }
        }
    }
}

fn scalar(kind: ScalarKind) -> RefOr<Schema> {
    let (ty, format) = match kind {
        ScalarKind::Bool => (Type::Boolean, None),
        ScalarKind::I8 | ScalarKind::I16 | ScalarKind::U8 | ScalarKind::U16 => (Type::Integer, None),
        ScalarKind::I32 | ScalarKind::U32 => (Type::Integer, Some(KnownFormat::Int32)),
        ScalarKind::I64 | ScalarKind::U64 | ScalarKind::Isize | ScalarKind::Usize => {
            (Type::Integer, Some(KnownFormat::Int64))
        }
        ScalarKind::F32 => (Type::Number, Some(KnownFormat::Float)),
        ScalarKind::F64 => (Type::Number, Some(KnownFormat::Double)),
        ScalarKind::String => (Type::String, None),
    };
    ObjectBuilder::new()
        .schema_type(ty)
        .format(format.map(SchemaFormat::KnownFormat))
        .into()
}

fn time(kind: TimeKind) -> RefOr<Schema> {
    let format = match kind {
        TimeKind::Date => KnownFormat::Date,
        TimeKind::DateTime | TimeKind::NaiveDateTime => KnownFormat::DateTime,
    };
    ObjectBuilder::new()
        .schema_type(Type::String)
        .format(Some(SchemaFormat::KnownFormat(format)))
        .into()
}

/// Adds `null` to the accepted types, or wraps non-object schemas in `oneOf`.
fn nullable(schema: RefOr<Schema>) -> RefOr<Schema> {
    match schema {
        RefOr::T(Schema::Object(mut object)) => {
            object.schema_type = match object.schema_type {
                SchemaType::Type(ty) => SchemaType::from_iter([ty, Type::Null]),
                SchemaType::Array(mut types) => {
                    if !types.contains(&Type::Null) {
                        types.push(Type::Null);
                    }
                    SchemaType::Array(types)
                }
                SchemaType::AnyValue => SchemaType::AnyValue,
            };
            RefOr::T(Schema::Object(object))
        }
        other => OneOfBuilder::new()
            .item(other)
            .item(ObjectBuilder::new().schema_type(Type::Null))
            .into(),
    }
}

fn described(schema: RefOr<Schema>, description: &str) -> RefOr<Schema> {
    match schema {
        RefOr::T(Schema::Object(mut object)) if !description.is_empty() => {
            object.description = Some(description.to_string());
            RefOr::T(Schema::Object(object))
        }
        other => other,
    }
}

/// Names of the `{segment}` placeholders in a route path.
fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|part| part.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*').to_string())
        .collect()
}

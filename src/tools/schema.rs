//! Schema synthesis: parameter typing, signatures, doc-comment parsing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::descriptor::{ParamSchema, ToolDescriptor};
use super::spec::ToolSpec;
use crate::error::{Result, StockbotError};
use crate::provider::format::WIRE_SEPARATOR;

/// Placeholder for parameters without a `:param` doc line.
pub const NO_DESCRIPTION: &str = "No description";

/// JSON schema type tag of a tool parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    #[default]
    String,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Type tag for a Rust type.
    pub fn of<T: JsonType + ?Sized>() -> Self {
        T::PARAM_TYPE
    }

    /// Type tag for a textual annotation (`int`, `float`, `Vec<f64>`, ...).
    ///
    /// Unrecognised or empty annotations map to `string`.
    pub fn from_annotation(annotation: &str) -> Self {
        let trimmed = annotation.trim().trim_start_matches('&');
        let base = trimmed
            .split(['<', '['])
            .next()
            .unwrap_or_default()
            .trim()
            .rsplit("::")
            .next()
            .unwrap_or_default();

        match base {
            "int" | "integer" | "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32"
            | "u64" | "usize" => Self::Integer,
            "float" | "number" | "f32" | "f64" => Self::Number,
            "str" | "string" | "String" | "char" => Self::String,
            "bool" | "boolean" => Self::Boolean,
            "list" | "List" | "array" | "tuple" | "Tuple" | "Vec" | "VecDeque" => Self::Array,
            "dict" | "Dict" | "object" | "map" | "HashMap" | "BTreeMap" | "IndexMap" | "Map" => {
                Self::Object
            }
            "Option" | "Optional" => {
                let inner = trimmed
                    .split_once(['<', '['])
                    .map(|(_, rest)| rest.trim_end_matches(['>', ']']))
                    .unwrap_or_default();
                Self::from_annotation(inner)
            }
            _ => Self::String,
        }
    }
}

/// Rust types with a fixed JSON schema type tag.
pub trait JsonType {
    const PARAM_TYPE: ParamType;
}

macro_rules! json_type {
    ($tag:ident => $($ty:ty),+ $(,)?) => {
        $(impl JsonType for $ty {
            const PARAM_TYPE: ParamType = ParamType::$tag;
        })+
    };
}

json_type!(Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
json_type!(Number => f32, f64);
json_type!(String => String, str, char);
json_type!(Boolean => bool);
json_type!(Object => serde_json::Map<String, serde_json::Value>);

impl<T> JsonType for Vec<T> {
    const PARAM_TYPE: ParamType = ParamType::Array;
}

impl<T> JsonType for [T] {
    const PARAM_TYPE: ParamType = ParamType::Array;
}

impl<V, S> JsonType for HashMap<String, V, S> {
    const PARAM_TYPE: ParamType = ParamType::Object;
}

impl<V> JsonType for BTreeMap<String, V> {
    const PARAM_TYPE: ParamType = ParamType::Object;
}

impl<T: JsonType + ?Sized> JsonType for &T {
    const PARAM_TYPE: ParamType = T::PARAM_TYPE;
}

impl<T: JsonType> JsonType for Option<T> {
    const PARAM_TYPE: ParamType = T::PARAM_TYPE;
}

/// One declared parameter of a tool callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// `None` when the parameter carries no type annotation.
    pub ty: Option<ParamType>,
}

impl Param {
    /// Schema type; unannotated parameters are strings.
    pub fn json_type(&self) -> ParamType {
        self.ty.unwrap_or_default()
    }
}

/// Whether a callable is a free function or takes its owning type first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Method,
}

/// Parameter list of a tool callable, in declaration order.
///
/// A method signature never lists its owner parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    kind: CallableKind,
    params: Vec<Param>,
}

impl Signature {
    pub fn function() -> Self {
        Self {
            kind: CallableKind::Function,
            params: Vec::new(),
        }
    }

    pub fn method() -> Self {
        Self {
            kind: CallableKind::Method,
            params: Vec::new(),
        }
    }

    /// Add a parameter typed by its Rust type.
    pub fn param<T: JsonType + ?Sized>(self, name: impl Into<String>) -> Self {
        self.push(name, Some(ParamType::of::<T>()))
    }

    /// Add a parameter typed by a textual annotation.
    pub fn param_annotated(self, name: impl Into<String>, annotation: &str) -> Self {
        self.push(name, Some(ParamType::from_annotation(annotation)))
    }

    /// Add a parameter without a type annotation.
    pub fn param_untyped(self, name: impl Into<String>) -> Self {
        self.push(name, None)
    }

    fn push(mut self, name: impl Into<String>, ty: Option<ParamType>) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    /// Parse a textual parameter list such as `(cls, ticker: str, window: int = 14)`.
    ///
    /// A leading `self` or `cls` parameter marks the signature as a method and
    /// is dropped. Default values are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
        let mut signature = Self::function();

        for (index, raw) in split_top_level(inner).into_iter().map(str::trim).enumerate() {
            if raw.is_empty() {
                continue;
            }
            let declaration = raw.split('=').next().unwrap_or_default().trim();
            let (name, annotation) = match declaration.split_once(':') {
                Some((name, annotation)) => (name.trim(), Some(annotation.trim())),
                None => (declaration, None),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(StockbotError::InvalidArgument(format!(
                    "invalid parameter declaration '{raw}'"
                )));
            }
            if index == 0 && matches!(name, "self" | "cls") {
                signature.kind = CallableKind::Method;
                continue;
            }
            signature = match annotation {
                Some(annotation) => signature.param_annotated(name, annotation),
                None => signature.param_untyped(name),
            };
        }

        Ok(signature)
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn is_method(&self) -> bool {
        self.kind == CallableKind::Method
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }
}

/// Split a parameter list on commas that are not nested inside brackets.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '[' | '<' | '(' | '{' => depth += 1,
            ']' | '>' | ')' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

static PARAM_DOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:param\s+(\w+):\s*(.*)$").expect("param doc regex must compile")
});

/// Extract `:param <name>: <text>` descriptions from a doc comment.
///
/// Lines are trimmed before matching; non-matching lines are ignored.
pub fn parse_param_docs(doc: &str) -> HashMap<String, String> {
    doc.lines()
        .filter_map(|line| {
            let caps = PARAM_DOC_RE.captures(line.trim())?;
            Some((caps[1].to_string(), caps[2].trim().to_string()))
        })
        .collect()
}

/// Doc-comment text before the first `:param` line, joined into one line.
fn doc_summary(doc: &str) -> String {
    doc.lines()
        .map(str::trim)
        .take_while(|line| !line.starts_with(':'))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a [`ToolDescriptor`] from a declaration.
///
/// `owner` is the owning type name for tools attached to a class. A method
/// signature is qualified as `Owner.name`; a function signature keeps the
/// declared name. Fails with [`StockbotError::Schema`] when a required
/// parameter is not in the signature, when a parameter is declared twice,
/// or when the signature kind and the owner disagree.
pub fn synthesize(spec: &ToolSpec, owner: Option<&str>) -> Result<ToolDescriptor> {
    let signature = spec.callable_signature();

    let name = match (signature.kind(), owner) {
        (CallableKind::Method, Some(owner)) => format!("{owner}.{}", spec.name()),
        (CallableKind::Function, None) => spec.name().to_string(),
        (CallableKind::Method, None) => {
            return Err(StockbotError::schema(
                spec.name(),
                "method signature declared outside a class",
            ));
        }
        (CallableKind::Function, Some(owner)) => {
            return Err(StockbotError::schema(
                spec.name(),
                format!("declared on {owner} but does not take the owner parameter"),
            ));
        }
    };

    if spec.name().is_empty() {
        return Err(StockbotError::schema(name, "tool name is empty"));
    }
    // `__` is the wire separator between owner and method.
    let reserved = |n: &str| n.contains(WIRE_SEPARATOR);
    if reserved(spec.name()) || owner.is_some_and(reserved) {
        return Err(StockbotError::schema(
            name,
            format!("tool and owner names may not contain '{WIRE_SEPARATOR}'"),
        ));
    }

    let mut seen = HashSet::new();
    for param in signature.params() {
        if !seen.insert(param.name.as_str()) {
            return Err(StockbotError::schema(
                &name,
                format!("parameter '{}' declared twice", param.name),
            ));
        }
    }

    let missing: Vec<&str> = spec
        .required_params()
        .iter()
        .filter(|r| !signature.contains(r))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(StockbotError::schema(
            &name,
            format!("required parameters not in signature: {}", missing.join(", ")),
        ));
    }

    let docs = spec.doc_comment().map(parse_param_docs).unwrap_or_default();

    let parameters: IndexMap<String, ParamSchema> = signature
        .params()
        .iter()
        .filter(|p| spec.exposes_optional() || spec.required_params().contains(&p.name))
        .map(|p| {
            let description = docs
                .get(&p.name)
                .filter(|d| !d.is_empty())
                .cloned()
                .unwrap_or_else(|| NO_DESCRIPTION.to_string());
            (
                p.name.clone(),
                ParamSchema {
                    json_type: p.json_type(),
                    description,
                },
            )
        })
        .collect();

    let description = match spec.description() {
        "" => spec.doc_comment().map(doc_summary).unwrap_or_default(),
        text => text.to_string(),
    };

    Ok(ToolDescriptor {
        name,
        description,
        parameters,
        required: spec.required_params().to_vec(),
        owner: owner.map(str::to_string),
        artifact: spec.is_artifact(),
        accepted: signature.params().iter().map(|p| p.name.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SMA_DOC: &str = "
        Calculates the simple moving average.

        :param ticker: The stock ticker symbol for a company
        :param window: The number of days to average over
    ";

    fn sma_spec() -> ToolSpec {
        ToolSpec::new("calculate_SMA", "Calculate the simple moving average for a given stock ticker and a window.")
            .required(["ticker", "window"])
            .doc(SMA_DOC)
            .signature(Signature::method().param::<str>("ticker").param::<u32>("window"))
    }

    #[test]
    fn rust_types_map_to_json_tags() {
        assert_eq!(ParamType::of::<i64>(), ParamType::Integer);
        assert_eq!(ParamType::of::<f64>(), ParamType::Number);
        assert_eq!(ParamType::of::<&str>(), ParamType::String);
        assert_eq!(ParamType::of::<bool>(), ParamType::Boolean);
        assert_eq!(ParamType::of::<Vec<f64>>(), ParamType::Array);
        assert_eq!(ParamType::of::<HashMap<String, i32>>(), ParamType::Object);
        assert_eq!(ParamType::of::<Option<u32>>(), ParamType::Integer);
    }

    #[test]
    fn annotations_map_to_json_tags_with_string_fallback() {
        assert_eq!(ParamType::from_annotation("int"), ParamType::Integer);
        assert_eq!(ParamType::from_annotation("float"), ParamType::Number);
        assert_eq!(ParamType::from_annotation("str"), ParamType::String);
        assert_eq!(ParamType::from_annotation("bool"), ParamType::Boolean);
        assert_eq!(ParamType::from_annotation("list"), ParamType::Array);
        assert_eq!(ParamType::from_annotation("dict"), ParamType::Object);
        assert_eq!(ParamType::from_annotation("Vec<f64>"), ParamType::Array);
        assert_eq!(ParamType::from_annotation("std::collections::HashMap<String, i32>"), ParamType::Object);
        assert_eq!(ParamType::from_annotation("Option<u32>"), ParamType::Integer);
        assert_eq!(ParamType::from_annotation("DataFrame"), ParamType::String);
        assert_eq!(ParamType::from_annotation(""), ParamType::String);
    }

    #[test]
    fn parses_param_doc_lines() {
        let docs = parse_param_docs(SMA_DOC);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs["ticker"], "The stock ticker symbol for a company");
        assert_eq!(docs["window"], "The number of days to average over");
    }

    #[test]
    fn ignores_malformed_param_lines() {
        let docs = parse_param_docs(":param: nameless\n:parameter ticker: nope\n  :param stock:   Symbol  ");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs["stock"], "Symbol");
    }

    #[test]
    fn parses_textual_signatures() {
        let sig = Signature::parse("(cls, ticker: str, window: int = 14, extra)").unwrap();
        assert!(sig.is_method());
        let names: Vec<_> = sig.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ticker", "window", "extra"]);
        assert_eq!(sig.params()[1].json_type(), ParamType::Integer);
        assert_eq!(sig.params()[2].ty, None);
        assert_eq!(sig.params()[2].json_type(), ParamType::String);

        let nested = Signature::parse("(cls, data: Dict[str, int], ticker: str)").unwrap();
        let names: Vec<_> = nested.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["data", "ticker"]);
        assert_eq!(nested.params()[0].json_type(), ParamType::Object);

        let generic = Signature::parse("(prices: HashMap<String, f64>, window: usize)").unwrap();
        assert_eq!(generic.params().len(), 2);
        assert_eq!(generic.params()[0].json_type(), ParamType::Object);

        let free = Signature::parse("stock: str").unwrap();
        assert!(!free.is_method());
        assert!(Signature::parse("(ticker-name)").is_err());
    }

    #[test]
    fn method_schema_is_qualified_by_owner() {
        let descriptor = synthesize(&sma_spec(), Some("StockAnalyzer")).unwrap();

        assert_eq!(descriptor.name, "StockAnalyzer.calculate_SMA");
        assert_eq!(descriptor.owner.as_deref(), Some("StockAnalyzer"));
        assert_eq!(descriptor.required, vec!["ticker", "window"]);
        assert_eq!(
            descriptor.to_schema().parameters,
            json!({
                "type": "object",
                "properties": {
                    "ticker": {"type": "string", "description": "The stock ticker symbol for a company"},
                    "window": {"type": "integer", "description": "The number of days to average over"},
                },
                "required": ["ticker", "window"],
            })
        );
    }

    #[test]
    fn free_function_keeps_declared_name() {
        let spec = ToolSpec::new("get_news", "Get recent news")
            .required(["stock"])
            .signature(Signature::function().param::<String>("stock"));
        let descriptor = synthesize(&spec, None).unwrap();
        assert_eq!(descriptor.name, "get_news");
        assert_eq!(descriptor.parameters["stock"].description, NO_DESCRIPTION);
        assert!(descriptor.owner.is_none());
    }

    #[test]
    fn required_param_absent_from_signature_is_schema_error() {
        let spec = ToolSpec::new("calculate_SMA", "SMA")
            .required(["ticker", "period"])
            .signature(Signature::method().param::<str>("ticker").param::<u32>("window"));

        let err = synthesize(&spec, Some("StockAnalyzer")).unwrap_err();
        match err {
            StockbotError::Schema { tool, message } => {
                assert_eq!(tool, "StockAnalyzer.calculate_SMA");
                assert!(message.contains("period"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn optional_params_are_exposed_but_not_required() {
        let spec = ToolSpec::new("calculate_RSI", "RSI")
            .required(["ticker"])
            .signature(Signature::method().param::<str>("ticker").param::<Option<u32>>("window"));
        let descriptor = synthesize(&spec, Some("StockAnalyzer")).unwrap();

        assert_eq!(descriptor.parameters.keys().collect::<Vec<_>>(), vec!["ticker", "window"]);
        assert_eq!(descriptor.required, vec!["ticker"]);
    }

    #[test]
    fn required_only_hides_optional_params_but_still_accepts_them() {
        let spec = ToolSpec::new("calculate_RSI", "RSI")
            .required(["ticker"])
            .required_only()
            .signature(Signature::method().param::<str>("ticker").param::<Option<u32>>("window"));
        let descriptor = synthesize(&spec, Some("StockAnalyzer")).unwrap();

        assert_eq!(descriptor.parameters.keys().collect::<Vec<_>>(), vec!["ticker"]);
        assert_eq!(descriptor.accepted, vec!["ticker", "window"]);
    }

    #[test]
    fn kind_and_owner_must_agree() {
        let method = sma_spec();
        assert!(matches!(synthesize(&method, None), Err(StockbotError::Schema { .. })));

        let function = ToolSpec::new("get_news", "News").signature(Signature::function().param::<str>("stock"));
        assert!(matches!(
            synthesize(&function, Some("StockAnalyzer")),
            Err(StockbotError::Schema { .. })
        ));
    }

    #[test]
    fn duplicate_params_are_rejected() {
        let spec = ToolSpec::new("dup", "dup")
            .signature(Signature::function().param::<str>("ticker").param::<str>("ticker"));
        assert!(matches!(synthesize(&spec, None), Err(StockbotError::Schema { .. })));
    }

    #[test]
    fn wire_separator_in_names_is_rejected() {
        let function = ToolSpec::new("get__news", "News").signature(Signature::function().param::<str>("stock"));
        assert!(matches!(synthesize(&function, None), Err(StockbotError::Schema { .. })));

        assert!(matches!(
            synthesize(&sma_spec(), Some("Stock__Analyzer")),
            Err(StockbotError::Schema { .. })
        ));
        assert!(synthesize(&sma_spec(), Some("Stock_Analyzer")).is_ok());
    }

    #[test]
    fn empty_description_falls_back_to_doc_summary() {
        let spec = ToolSpec::new("calculate_SMA", "")
            .doc(SMA_DOC)
            .signature(Signature::method().param::<str>("ticker"));
        let descriptor = synthesize(&spec, Some("StockAnalyzer")).unwrap();
        assert_eq!(descriptor.description, "Calculates the simple moving average.");
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = synthesize(&sma_spec(), Some("StockAnalyzer")).unwrap();
        let b = synthesize(&sma_spec(), Some("StockAnalyzer")).unwrap();
        assert_eq!(a, b);
    }
}

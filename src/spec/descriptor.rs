//! Typed derivation descriptors
//!
//! A column's raw `derivation` mapping is typed once, at resolution time,
//! into exactly one [`DerivationDescriptor`] variant. Precedence when several
//! keys are present:
//!
//! ```text
//! condition > constant > function > cut > source + aggregation > source
//! ```
//!
//! A mapping that matches none of these, or whose own sub-fields are
//! malformed, becomes [`DerivationDescriptor::Invalid`]. That is not a
//! resolution failure: the dispatcher reports it as a configuration error
//! for that column only.

use serde_json::{Map, Value};

use crate::aggregate::AggregateFunction;
use crate::filter::{parse_cut, parse_filter, CutCondition, FilterExpr, ParsedFilter};
use crate::table::value::display_text;
use crate::table::ColumnRef;

/// One categorization rule
#[derive(Debug, Clone, PartialEq)]
pub struct CutRule {
    pub text: String,
    pub condition: CutCondition,
    pub label: Value,
}

/// One conditional branch
#[derive(Debug, Clone, PartialEq)]
pub struct WhenThen {
    pub text: String,
    pub condition: FilterExpr,
    pub then: Value,
}

/// Source value recoding
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMapping {
    pub entries: Vec<(String, Value)>,
    /// True when the `""` bucket maps to null: unmapped values become null
    pub unmapped_to_null: bool,
}

impl ValueMapping {
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let entries = raw
            .iter()
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let unmapped_to_null = matches!(raw.get(""), Some(Value::Null));
        Self {
            entries,
            unmapped_to_null,
        }
    }

    /// Recodes one value. Nulls stay null.
    pub fn apply(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let text = display_text(value);
        match self.entries.iter().find(|(k, _)| *k == text) {
            Some((_, mapped)) => mapped.clone(),
            None if self.unmapped_to_null => Value::Null,
            None => value.clone(),
        }
    }
}

/// Argument passed to a custom function
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    /// `TABLE.COLUMN` text: a source column aligned to the frame
    Column(ColumnRef),
    /// Other text: a frame column if one exists by that name, else literal
    Name(String),
    /// Any non-text value
    Literal(Value),
}

impl FunctionArg {
    pub fn from_raw(raw: &Value) -> Self {
        match raw {
            Value::String(s) => {
                let reference = ColumnRef::parse(s);
                if reference.is_qualified() {
                    FunctionArg::Column(reference)
                } else {
                    FunctionArg::Name(s.clone())
                }
            }
            other => FunctionArg::Literal(other.clone()),
        }
    }
}

/// How a column is derived
#[derive(Debug, Clone, PartialEq)]
pub enum DerivationDescriptor {
    Constant(Value),
    SourceRef {
        source: ColumnRef,
        filter: Option<ParsedFilter>,
        mapping: Option<ValueMapping>,
    },
    Aggregation {
        source: ColumnRef,
        function: AggregateFunction,
        target: Option<ColumnRef>,
        date: Option<String>,
        filter: Option<ParsedFilter>,
    },
    Categorization {
        source: ColumnRef,
        cuts: Vec<CutRule>,
    },
    Conditional {
        branches: Vec<WhenThen>,
        otherwise: Option<Value>,
    },
    CustomFunction {
        name: String,
        args: Vec<(String, FunctionArg)>,
    },
    Invalid {
        reason: String,
    },
}

impl DerivationDescriptor {
    /// Strategy label
    pub fn kind(&self) -> &'static str {
        match self {
            DerivationDescriptor::Constant(_) => "constant",
            DerivationDescriptor::SourceRef { .. } => "source",
            DerivationDescriptor::Aggregation { .. } => "aggregation",
            DerivationDescriptor::Categorization { .. } => "categorization",
            DerivationDescriptor::Conditional { .. } => "conditional",
            DerivationDescriptor::CustomFunction { .. } => "function",
            DerivationDescriptor::Invalid { .. } => "invalid",
        }
    }

    /// Unqualified column names this derivation reads
    pub fn bare_references(&self) -> Vec<&str> {
        let mut refs: Vec<&ColumnRef> = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        match self {
            DerivationDescriptor::SourceRef { source, filter, .. } => {
                refs.push(source);
                refs.extend(filter_refs(filter));
            }
            DerivationDescriptor::Aggregation {
                source,
                target,
                filter,
                ..
            } => {
                refs.push(source);
                refs.extend(target.iter());
                refs.extend(filter_refs(filter));
            }
            DerivationDescriptor::Categorization { source, .. } => refs.push(source),
            DerivationDescriptor::Conditional { branches, .. } => {
                for branch in branches {
                    refs.extend(branch.condition.references());
                }
            }
            DerivationDescriptor::CustomFunction { args, .. } => {
                for (_, arg) in args {
                    if let FunctionArg::Name(name) = arg {
                        names.push(name);
                    }
                }
            }
            DerivationDescriptor::Constant(_) | DerivationDescriptor::Invalid { .. } => {}
        }
        names.extend(
            refs.into_iter()
                .filter(|r| !r.is_qualified())
                .map(|r| r.column.as_str()),
        );
        names
    }

    fn invalid(reason: impl Into<String>) -> Self {
        DerivationDescriptor::Invalid {
            reason: reason.into(),
        }
    }

    /// Types a raw `derivation` mapping
    pub fn from_raw(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::invalid("derivation must be a mapping");
        };

        if let Some(condition) = obj.get("condition") {
            return Self::conditional(condition, obj.get("else"));
        }
        if let Some(constant) = obj.get("constant") {
            return DerivationDescriptor::Constant(constant.clone());
        }
        if let Some(function) = obj.get("function") {
            return Self::custom_function(function, obj);
        }
        if let Some(cut) = obj.get("cut") {
            return Self::categorization(obj.get("source"), cut);
        }

        let Some(source) = obj.get("source") else {
            return Self::invalid("no recognised derivation keys");
        };
        let Some(source) = source.as_str().filter(|s| !s.trim().is_empty()) else {
            return Self::invalid("source must be a non-empty string");
        };
        let source = ColumnRef::parse(source);
        let filter = match obj.get("filter") {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(ParsedFilter::parse(text.clone())),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(_) => return Self::invalid("filter must be a string"),
        };

        if let Some(aggregation) = obj.get("aggregation") {
            return Self::aggregation(source, aggregation, filter);
        }

        let mapping = match obj.get("mapping") {
            Some(Value::Object(map)) => Some(ValueMapping::from_raw(map)),
            Some(Value::Null) | None => None,
            Some(_) => return Self::invalid("mapping must be a mapping"),
        };
        DerivationDescriptor::SourceRef {
            source,
            filter,
            mapping,
        }
    }

    fn aggregation(source: ColumnRef, raw: &Value, filter: Option<ParsedFilter>) -> Self {
        let (function, target, date) = match raw {
            Value::String(name) => (Some(name.as_str()), None, None),
            Value::Object(obj) => (
                obj.get("function").and_then(Value::as_str),
                obj.get("target").and_then(Value::as_str),
                obj.get("date").and_then(Value::as_str),
            ),
            _ => return Self::invalid("aggregation must be a mapping"),
        };
        let function = match function {
            None => AggregateFunction::First,
            Some(name) => match AggregateFunction::parse(name) {
                Some(f) => f,
                None => return Self::invalid(format!("unknown aggregation function '{}'", name)),
            },
        };
        DerivationDescriptor::Aggregation {
            source,
            function,
            target: target.map(ColumnRef::parse),
            date: date.map(str::to_string),
            filter,
        }
    }

    fn categorization(source: Option<&Value>, cut: &Value) -> Self {
        let Some(source) = source.and_then(Value::as_str).filter(|s| !s.trim().is_empty()) else {
            return Self::invalid("cut requires a source column");
        };
        let Some(rules) = cut.as_object().filter(|m| !m.is_empty()) else {
            return Self::invalid("cut must be a non-empty mapping");
        };
        let mut cuts = Vec::with_capacity(rules.len());
        for (text, label) in rules {
            match parse_cut(text) {
                Ok(condition) => cuts.push(CutRule {
                    text: text.clone(),
                    condition,
                    label: label.clone(),
                }),
                Err(e) => return Self::invalid(format!("cut rule '{}': {}", text, e)),
            }
        }
        DerivationDescriptor::Categorization {
            source: ColumnRef::parse(source),
            cuts,
        }
    }

    fn conditional(raw: &Value, trailing_else: Option<&Value>) -> Self {
        let Some(entries) = raw.as_array().filter(|a| !a.is_empty()) else {
            return Self::invalid("condition must be a non-empty list");
        };
        let mut branches = Vec::new();
        let mut otherwise = trailing_else.map(branch_value);

        for (idx, entry) in entries.iter().enumerate() {
            let Some(obj) = entry.as_object() else {
                return Self::invalid(format!("condition[{}] must be a mapping", idx));
            };
            match (obj.get("when"), obj.get("else")) {
                (Some(when), _) => {
                    let Some(text) = when.as_str() else {
                        return Self::invalid(format!("condition[{}].when must be a string", idx));
                    };
                    let condition = match parse_filter(text) {
                        Ok(expr) => expr,
                        Err(e) => return Self::invalid(format!("condition[{}].when: {}", idx, e)),
                    };
                    branches.push(WhenThen {
                        text: text.to_string(),
                        condition,
                        then: obj.get("then").map(branch_value).unwrap_or(Value::Null),
                    });
                }
                (None, Some(value)) => otherwise = Some(branch_value(value)),
                (None, None) => {
                    return Self::invalid(format!("condition[{}] needs 'when' or 'else'", idx))
                }
            }
        }

        DerivationDescriptor::Conditional {
            branches,
            otherwise,
        }
    }

    fn custom_function(name: &Value, obj: &Map<String, Value>) -> Self {
        let Some(name) = name.as_str().filter(|s| !s.trim().is_empty()) else {
            return Self::invalid("function must be a non-empty string");
        };
        let args = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "function")
            .map(|(k, v)| (k.clone(), FunctionArg::from_raw(v)))
            .collect();
        DerivationDescriptor::CustomFunction {
            name: name.to_string(),
            args,
        }
    }
}

fn filter_refs(filter: &Option<ParsedFilter>) -> Vec<&ColumnRef> {
    match filter {
        Some(ParsedFilter { expr: Ok(expr), .. }) => expr.references(),
        _ => Vec::new(),
    }
}

/// `then` / `else` values are literals or `{constant: v}`
fn branch_value(raw: &Value) -> Value {
    match raw {
        Value::Object(obj) if obj.contains_key("constant") => {
            obj.get("constant").cloned().unwrap_or(Value::Null)
        }
        other => other.clone(),
    }
}

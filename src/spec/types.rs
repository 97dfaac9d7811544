//! Resolved spec types

use std::fmt;
use std::path::PathBuf;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::descriptor::DerivationDescriptor;

/// Declared column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    #[serde(rename = "str")]
    Text,
    #[serde(rename = "int")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "bool")]
    Boolean,
}

impl DataType {
    /// Parses the `type` field; unknown names yield `None`
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "str" | "string" | "char" | "text" => Some(DataType::Text),
            "int" | "integer" => Some(DataType::Integer),
            "float" | "num" | "numeric" | "double" => Some(DataType::Float),
            "date" => Some(DataType::Date),
            "datetime" => Some(DataType::DateTime),
            "bool" | "boolean" => Some(DataType::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "str",
            DataType::Integer => "int",
            DataType::Float => "float",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Boolean => "bool",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted values of the `core` field
pub const CORE_VALUES: [&str; 4] = [
    "cdisc-required",
    "company-required",
    "optional",
    "conditional",
];

/// Post-build checks declared in a column's `validation` block
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub maximum_missing_percentage: Option<f64>,
    pub unique: bool,
    pub allowed_values: Option<Vec<Value>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
}

impl ValidationRules {
    /// Reads a raw `validation` mapping, returning every malformed rule
    pub fn from_raw(raw: &Value) -> Result<Self, Vec<(String, String)>> {
        let Some(obj) = raw.as_object() else {
            return Err(vec![(String::new(), "must be a mapping".to_string())]);
        };
        let mut rules = ValidationRules::default();
        let mut problems = Vec::new();

        let number = |key: &str, problems: &mut Vec<(String, String)>| -> Option<f64> {
            let value = obj.get(key)?;
            let parsed = value.as_f64();
            if parsed.is_none() && !value.is_null() {
                problems.push((key.to_string(), "must be a number".to_string()));
            }
            parsed
        };
        let length = |key: &str, problems: &mut Vec<(String, String)>| -> Option<usize> {
            let value = obj.get(key)?;
            let parsed = value.as_u64().and_then(|n| usize::try_from(n).ok());
            if parsed.is_none() && !value.is_null() {
                problems.push((key.to_string(), "must be a non-negative integer".to_string()));
            }
            parsed
        };

        rules.maximum_missing_percentage = number("maximum_missing_percentage", &mut problems);
        rules.min = number("min", &mut problems);
        rules.max = number("max", &mut problems);
        rules.min_length = length("min_length", &mut problems);
        rules.max_length = length("max_length", &mut problems);

        match obj.get("unique") {
            None | Some(Value::Null) => {}
            Some(Value::Bool(b)) => rules.unique = *b,
            Some(_) => problems.push(("unique".into(), "must be a boolean".into())),
        }
        match obj.get("allowed_values") {
            None | Some(Value::Null) => {}
            Some(Value::Array(values)) => rules.allowed_values = Some(values.clone()),
            Some(_) => problems.push(("allowed_values".into(), "must be a list".into())),
        }
        match obj.get("pattern") {
            None | Some(Value::Null) => {}
            Some(Value::String(p)) => match Regex::new(p) {
                Ok(re) => rules.pattern = Some(re),
                Err(e) => problems.push(("pattern".into(), format!("invalid pattern: {}", e))),
            },
            Some(_) => problems.push(("pattern".into(), "must be a string".into())),
        }

        if let (Some(min), Some(max)) = (rules.min, rules.max) {
            if min > max {
                problems.push(("min".into(), format!("min {} exceeds max {}", min, max)));
            }
        }
        if let Some(pct) = rules.maximum_missing_percentage {
            if !(0.0..=100.0).contains(&pct) {
                problems.push((
                    "maximum_missing_percentage".into(),
                    "must be between 0 and 100".into(),
                ));
            }
        }

        if problems.is_empty() {
            Ok(rules)
        } else {
            Err(problems)
        }
    }
}

/// One output column after resolution
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<String>,
    #[serde(skip)]
    pub derivation: DerivationDescriptor,
    #[serde(skip)]
    pub validation: Option<ValidationRules>,
    /// Derivation block as written, kept for dependency scanning and display
    #[serde(rename = "derivation")]
    pub raw_derivation: Value,
    #[serde(rename = "validation", skip_serializing_if = "Value::is_null")]
    pub raw_validation: Value,
}

impl ColumnSpec {
    /// Strategy label used in logs and the build report
    pub fn strategy(&self) -> &'static str {
        self.derivation.kind()
    }
}

/// The merged, typed spec of one output dataset
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSpec {
    pub domain: String,
    pub key: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub columns: Vec<ColumnSpec>,
}

impl ResolvedSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.key.iter().any(|k| k == name)
    }
}

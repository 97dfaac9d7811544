//! Custom function registry
//!
//! The registry is closed: a derivation can only call functions registered
//! here. Built-ins are registered by [`FunctionRegistry::new`]; embedders add
//! their own through [`FunctionRegistry::register`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::table::value::{as_number, number_value};

/// A resolved function argument
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// One value per frame row
    Column(Vec<Value>),
    Scalar(Value),
}

/// Arguments passed to a custom function
#[derive(Debug, Clone, Default)]
pub struct FunctionArgs {
    height: usize,
    values: Vec<(String, ArgValue)>,
}

impl FunctionArgs {
    pub fn new(height: usize) -> Self {
        Self {
            height,
            values: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.values.push((name.into(), value));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.push((name.into(), value));
    }

    /// Number of rows the result must have
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// First argument present under any of `names`
    pub fn get_any(&self, names: &[&str]) -> Option<&ArgValue> {
        names.iter().find_map(|n| self.get(n))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }
}

impl ArgValue {
    /// Value at `row`; scalars broadcast
    pub fn cell(&self, row: usize) -> &Value {
        match self {
            ArgValue::Column(values) => values.get(row).unwrap_or(&Value::Null),
            ArgValue::Scalar(value) => value,
        }
    }
}

/// A function callable from a `function` derivation.
///
/// Returns one value per row or a failure message.
pub trait CustomFunction: Send + Sync {
    fn call(&self, args: &FunctionArgs) -> Result<Vec<Value>, String>;
}

impl<F> CustomFunction for F
where
    F: Fn(&FunctionArgs) -> Result<Vec<Value>, String> + Send + Sync,
{
    fn call(&self, args: &FunctionArgs) -> Result<Vec<Value>, String> {
        self(args)
    }
}

/// Named custom functions, looked up case-insensitively
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn CustomFunction>>,
}

impl FunctionRegistry {
    /// Registry holding the built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("bmi", bmi);
        registry.register("get_bmi", bmi);
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers or replaces a function
    pub fn register(&mut self, name: &str, function: impl CustomFunction + 'static) {
        self.functions
            .insert(name.to_ascii_lowercase(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomFunction>> {
        self.functions.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Body mass index: `round(weight / (height / 100)^2, 1)`.
///
/// Height in centimetres, weight in kilograms. Rows with a missing,
/// non-numeric or non-positive height give null.
pub fn bmi(args: &FunctionArgs) -> Result<Vec<Value>, String> {
    let height = args
        .get_any(&["height", "height_cm"])
        .ok_or("missing argument 'height'")?;
    let weight = args
        .get_any(&["weight", "weight_kg"])
        .ok_or("missing argument 'weight'")?;

    Ok((0..args.height())
        .map(|row| {
            match (as_number(height.cell(row)), as_number(weight.cell(row))) {
                (Some(h), Some(w)) if h > 0.0 => {
                    let metres = h / 100.0;
                    number_value((w / (metres * metres) * 10.0).round() / 10.0)
                }
                _ => Value::Null,
            }
        })
        .collect())
}

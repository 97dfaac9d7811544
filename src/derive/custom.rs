//! Custom-function derivation
//!
//! Arguments are resolved before the call: `TABLE.COLUMN` text becomes that
//! column aligned to the frame, other text naming a frame column becomes
//! that column, anything else is passed as a literal. A function that
//! returns an error, panics or returns the wrong number of rows fails the
//! column only.

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use super::context::{DerivationContext, Derived};
use super::errors::{DeriveError, DeriveResult};
use super::functions::{ArgValue, FunctionArgs};
use crate::spec::FunctionArg;

pub fn derive_custom(
    ctx: &DerivationContext<'_>,
    column: &str,
    name: &str,
    args: &[(String, FunctionArg)],
) -> DeriveResult<Derived> {
    let function = ctx.functions().get(name).ok_or_else(|| {
        DeriveError::configuration(column, format!("unknown function '{}'", name))
    })?;

    let mut warnings = Vec::new();
    let mut resolved: Vec<(String, ArgValue)> = Vec::with_capacity(args.len());
    for (param, arg) in args {
        let value = match arg {
            FunctionArg::Column(reference) => {
                ArgValue::Column(ctx.resolve_values(column, reference, None, &mut warnings)?)
            }
            FunctionArg::Name(text) => match ctx.frame().values(text) {
                Ok(values) => ArgValue::Column(values.to_vec()),
                Err(_) => ArgValue::Scalar(Value::String(text.clone())),
            },
            FunctionArg::Literal(value) => ArgValue::Scalar(value.clone()),
        };
        resolved.push((param.clone(), value));
    }

    let height = match ctx.height() {
        Some(height) => height,
        None => resolved
            .iter()
            .filter_map(|(_, v)| match v {
                ArgValue::Column(values) => Some(values.len()),
                ArgValue::Scalar(_) => None,
            })
            .max()
            .map_or_else(|| ctx.target_height(column), Ok)?,
    };

    let mut call_args = FunctionArgs::new(height);
    for (param, value) in resolved {
        call_args.push(param, value);
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| function.call(&call_args)));
    let values = match outcome {
        Ok(Ok(values)) => values,
        Ok(Err(message)) => return Err(DeriveError::failed(column, format!("{}: {}", name, message))),
        Err(payload) => {
            return Err(DeriveError::failed(
                column,
                format!("{} panicked: {}", name, panic_message(payload.as_ref())),
            ))
        }
    };

    if values.len() != height {
        return Err(DeriveError::failed(
            column,
            format!("{} returned {} values for {} rows", name, values.len(), height),
        ));
    }
    Ok(Derived::with_warnings(values, warnings))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

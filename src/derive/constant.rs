//! Constant derivation

use serde_json::Value;

use super::context::{DerivationContext, Derived};
use super::errors::DeriveResult;

/// Replicates `value` to the frame height, or the primary table's height
pub fn derive_constant(ctx: &DerivationContext<'_>, column: &str, value: &Value) -> DeriveResult<Derived> {
    let height = ctx.target_height(column)?;
    Ok(Derived::new(vec![value.clone(); height]))
}

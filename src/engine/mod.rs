//! Dataset build engine
//!
//! [`DerivationEngine`] turns a [`ResolvedSpec`](crate::spec::ResolvedSpec)
//! into a [`BuildOutput`]: the derived table plus a [`BuildReport`].
//!
//! Invariants held by every build:
//! - one row per distinct identity-key tuple, first occurrence kept
//! - every attached column has exactly the frame height
//! - columns are derived strictly in declaration order
//! - the output carries every resolved column, null-filled where
//!   derivation failed
//!
//! Only spec, dependency and key-frame problems fail a build.

mod errors;
mod frame;
mod keyframe;
mod orchestrator;
mod report;

pub use errors::{EngineError, EngineResult};
pub use frame::TargetFrame;
pub use keyframe::{KeyFrame, KeyFrameBuilder};
pub use orchestrator::DerivationEngine;
pub use report::{BuildOutput, BuildReport, ColumnOutcome, ColumnStatus};

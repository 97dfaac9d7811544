//! Observable events
//!
//! Every log line the engine emits carries an `event` field taken from this
//! enum, so logs can be filtered by lifecycle step regardless of message
//! wording. Events are explicit and typed.

use std::fmt;

/// Observable events during spec resolution and dataset builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Engine configuration loaded
    ConfigLoaded,

    // Spec resolution
    /// One spec document read from disk
    SpecLoaded,
    /// Document chain merged and typed
    SpecResolved,
    /// Non-fatal spec observation (e.g. forward reference)
    SpecWarning,
    /// Dependency scan complete
    DependenciesResolved,

    // Sources
    /// Source table loaded into the cache
    SourceLoaded,
    /// Source table failed to load
    SourceLoadFailed,
    /// Source cache emptied
    CacheCleared,

    // Build
    /// Build started
    BuildStart,
    /// Key frame constructed
    KeyFrameBuilt,
    /// Column derived and attached
    ColumnDerived,
    /// Column derivation failed and was null-filled
    ColumnFailed,
    /// Column derived with a data-quality warning
    ColumnWarning,
    /// Filter could not be applied; input passed through
    FilterDegraded,
    /// Post-build validation finding
    ValidationFinding,
    /// Build finished
    BuildComplete,
    /// Output table written
    OutputWritten,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::SpecLoaded => "SPEC_LOADED",
            Event::SpecResolved => "SPEC_RESOLVED",
            Event::SpecWarning => "SPEC_WARNING",
            Event::DependenciesResolved => "DEPENDENCIES_RESOLVED",

            Event::SourceLoaded => "SOURCE_LOADED",
            Event::SourceLoadFailed => "SOURCE_LOAD_FAILED",
            Event::CacheCleared => "CACHE_CLEARED",

            Event::BuildStart => "BUILD_BEGIN",
            Event::KeyFrameBuilt => "KEY_FRAME_BUILT",
            Event::ColumnDerived => "COLUMN_DERIVED",
            Event::ColumnFailed => "COLUMN_FAILED",
            Event::ColumnWarning => "COLUMN_WARNING",
            Event::FilterDegraded => "FILTER_DEGRADED",
            Event::ValidationFinding => "VALIDATION_FINDING",
            Event::BuildComplete => "BUILD_COMPLETE",
            Event::OutputWritten => "OUTPUT_WRITTEN",
        }
    }

    /// Returns true if this event records a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::SourceLoadFailed | Event::ColumnFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

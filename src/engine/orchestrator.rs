//! Build orchestration
//!
//! A build runs in fixed steps:
//!
//! 1. scan the spec for required source tables
//! 2. load missing tables into the engine cache (any failure is fatal)
//! 3. build the key frame
//! 4. derive every non-key column in declaration order
//! 5. validate the finished table
//!
//! Step 4 never fails the build. A column that cannot be derived is
//! null-filled and its error recorded in the report.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::errors::{EngineError, EngineResult};
use super::frame::TargetFrame;
use super::keyframe::KeyFrameBuilder;
use super::report::{BuildOutput, BuildReport, ColumnOutcome, ColumnStatus};
use crate::derive::{DerivationContext, DerivationDispatcher, FunctionRegistry};
use crate::observability::Event;
use crate::spec::{ColumnSpec, DependencyAnalyzer, ResolvedSpec};
use crate::table::{align_positional, SourceSet, TableCache, TableSource};
use crate::validation::DataValidator;

/// Long-lived derivation engine.
///
/// Owns the table source, the source cache and the function registry. The
/// cache persists across builds until [`DerivationEngine::clear_cache`].
pub struct DerivationEngine {
    source: Box<dyn TableSource>,
    cache: TableCache,
    functions: FunctionRegistry,
}

impl DerivationEngine {
    pub fn new(source: Box<dyn TableSource>) -> Self {
        Self {
            source,
            cache: TableCache::new(),
            functions: FunctionRegistry::new(),
        }
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Registry for adding custom functions
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        let tables = self.cache.len();
        self.cache.clear();
        info!(event = Event::CacheCleared.as_str(), tables, "source cache cleared");
    }

    /// Builds the dataset described by `spec`
    pub fn build(&mut self, spec: &ResolvedSpec) -> EngineResult<BuildOutput> {
        info!(
            event = Event::BuildStart.as_str(),
            domain = %spec.domain,
            columns = spec.columns.len(),
            "build started"
        );

        let dependencies = DependencyAnalyzer::analyze(spec);
        let missing = self
            .cache
            .load_missing(self.source.as_ref(), &dependencies.tables);
        if !missing.is_empty() {
            error!(
                event = Event::SourceLoadFailed.as_str(),
                domain = %spec.domain,
                tables = ?missing,
                "required source tables unavailable"
            );
            return Err(EngineError::Dependency { tables: missing });
        }

        let sources = self.cache.view(&dependencies.tables);
        let mut report = BuildReport::new(spec.domain.clone());
        report.source_tables = sources.iter().map(|t| t.name().to_string()).collect();

        let mut frame = match KeyFrameBuilder::new(spec, &sources).build()? {
            Some(keys) => {
                report.key_source = Some(keys.source);
                report.duplicate_keys = keys.duplicates;
                TargetFrame::from_keys(keys.table)
            }
            None => TargetFrame::empty(&spec.domain),
        };

        for key in &spec.key {
            let column = spec.column(key);
            report.columns.push(ColumnOutcome {
                name: key.clone(),
                strategy: column.map_or("key", ColumnSpec::strategy).to_string(),
                status: ColumnStatus::Key {
                    non_null: frame
                        .table()
                        .column(key)
                        .map_or(0, |c| c.non_null_count()),
                },
                warnings: Vec::new(),
            });
        }

        for column in spec.columns.iter().filter(|c| !spec.is_key(&c.name)) {
            let outcome = self.derive_column(spec, column, &sources, &mut frame);
            report.columns.push(outcome);
        }

        let mut order: Vec<String> = spec.key.clone();
        order.extend(
            spec.columns
                .iter()
                .filter(|c| !spec.is_key(&c.name))
                .map(|c| c.name.clone()),
        );
        let table = frame.finish(&order)?;

        report.rows = table.height();
        report.findings = DataValidator::new(spec).validate(&table);

        info!(
            event = Event::BuildComplete.as_str(),
            domain = %spec.domain,
            rows = report.rows,
            derived = report.derived_count(),
            failed = report.failed_count(),
            findings = report.findings.len(),
            "build complete"
        );
        Ok(BuildOutput { table, report })
    }

    fn derive_column(
        &self,
        spec: &ResolvedSpec,
        column: &ColumnSpec,
        sources: &SourceSet<'_>,
        frame: &mut TargetFrame,
    ) -> ColumnOutcome {
        let strategy = column.strategy().to_string();
        let result = {
            let ctx = DerivationContext::new(
                frame.table(),
                frame.height(),
                sources,
                &spec.key,
                &spec.domain,
                &self.functions,
            )
            .with_primary(spec.primary.as_deref());
            DerivationDispatcher::derive(&ctx, column)
        };

        let failure = match result {
            Ok(derived) => {
                let mut warnings = derived.warnings;
                let values = fit_to_height(derived.values, frame.height(), &mut warnings);
                match frame.attach(&column.name, values) {
                    Ok(()) => {
                        let non_null = frame
                            .table()
                            .column(&column.name)
                            .map_or(0, |c| c.non_null_count());
                        for warning in &warnings {
                            warn!(
                                event = Event::ColumnWarning.as_str(),
                                column = %column.name,
                                "{}",
                                warning
                            );
                        }
                        debug!(
                            event = Event::ColumnDerived.as_str(),
                            column = %column.name,
                            strategy = %strategy,
                            non_null,
                            "column derived"
                        );
                        return ColumnOutcome {
                            name: column.name.clone(),
                            strategy,
                            status: ColumnStatus::Derived { non_null },
                            warnings,
                        };
                    }
                    Err(e) => (e.code(), e.to_string()),
                }
            }
            Err(e) => (e.code(), e.to_string()),
        };

        let (code, message) = failure;
        error!(
            event = Event::ColumnFailed.as_str(),
            column = %column.name,
            strategy = %strategy,
            code,
            error = %message,
            "column derivation failed, filled with nulls"
        );
        if let Err(e) = frame.attach_nulls(&column.name) {
            warn!(
                event = Event::ColumnFailed.as_str(),
                column = %column.name,
                error = %e,
                "null placeholder could not be attached"
            );
        }
        ColumnOutcome {
            name: column.name.clone(),
            strategy,
            status: ColumnStatus::Failed {
                code: code.to_string(),
                message,
            },
            warnings: Vec::new(),
        }
    }
}

/// Truncates or pads to the frame height, noting the mismatch
fn fit_to_height(values: Vec<Value>, height: Option<usize>, warnings: &mut Vec<String>) -> Vec<Value> {
    match height {
        Some(height) if values.len() != height => {
            warnings.push(format!(
                "derived {} values for {} rows; aligned by position",
                values.len(),
                height
            ));
            align_positional(&values, height)
        }
        _ => values,
    }
}

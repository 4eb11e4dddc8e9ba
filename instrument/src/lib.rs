//! Instrumentation for collecting patrol simulation events into column tables.
//!
//! Uses the `tracing` crate with a custom subscriber that builds one table
//! per event target. Columns come from event fields, so the schema emerges
//! from whatever the simulation records.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: instrument::targets::DEATH, step, patrol_id, comfort);
//!
//! // In test:
//! let mut rec = instrument::ScopedRecorder::new();
//! // ... run simulation ...
//! let steps = rec.get().get(instrument::targets::STEP);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// Event targets emitted by the simulation, one table each.
pub mod targets {
    pub const INIT: &str = "init";
    pub const STEP: &str = "step";
    pub const DEATH: &str = "death";
    pub const BIRTH: &str = "birth";
    pub const MUTATION: &str = "mutation";
    pub const EPIDEMIC: &str = "epidemic";
    pub const TERMINATION: &str = "termination";
    pub const OBSERVATION: &str = "observation";
}

/// A column of typed values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// Rows recorded for one event target.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    pub columns: HashMap<String, TypedColumn>,
    pub row_count: usize,
}

impl EventTable {
    /// Bring every column up to the current row count. Fields an event did
    /// not carry read as zero / false / empty.
    fn pad_columns(&mut self) {
        let rows = self.row_count;
        for col in self.columns.values_mut() {
            col.pad_to(rows);
        }
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            TypedColumn::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            TypedColumn::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn bools(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name)? {
            TypedColumn::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            TypedColumn::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Collection of tables, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: HashMap<String, EventTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&EventTable> {
        self.tables.get(target)
    }

    /// Number of events recorded under `target`
    pub fn count(&self, target: &str) -> usize {
        self.tables.get(target).map(|t| t.row_count).unwrap_or(0)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

/// Visitor that appends one event's fields to the table.
struct ColumnVisitor<'a> {
    table: &'a mut EventTable,
    /// Rows before this event, used to pre-pad new columns
    row_count: usize,
}

impl ColumnVisitor<'_> {
    fn column(&mut self, field: &Field, empty: impl FnOnce(usize) -> TypedColumn) -> &mut TypedColumn {
        let rows = self.row_count;
        self.table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| empty(rows))
    }
}

impl Visit for ColumnVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let TypedColumn::U64(v) = self.column(field, |n| TypedColumn::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let TypedColumn::I64(v) = self.column(field, |n| TypedColumn::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let TypedColumn::F64(v) = self.column(field, |n| TypedColumn::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let TypedColumn::Bool(v) = self.column(field, |n| TypedColumn::Bool(vec![false; n])) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let TypedColumn::Str(v) =
            self.column(field, |n| TypedColumn::Str(vec![String::new(); n]))
        {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Tracing subscriber that collects INFO events into per-target tables.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        // Only info-level events; spans and debug/trace are ignored
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();

        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();

            let row_count = table.row_count;
            event.record(&mut ColumnVisitor {
                table: &mut *table,
                row_count,
            });
            table.row_count += 1;

            // Columns this event did not mention still need a value
            table.pad_columns();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the TableSubscriber as the global default.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Drain all recorded data from the thread-local recorder.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

/// Clear all recorded data without returning it.
pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

/// Record everything `f` emits on this thread and return it.
///
/// Installs the subscriber only for the duration of `f`, so tests running in
/// parallel do not see each other's events.
pub fn record<T>(f: impl FnOnce() -> T) -> (T, Recorder) {
    clear();
    let out = tracing::subscriber::with_default(TableSubscriber, f);
    (out, drain())
}

// === Polars Integration ===

use polars::prelude::*;

impl EventTable {
    /// Convert this table to a polars DataFrame.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                TypedColumn::U64(v) => Column::new(name.into(), v),
                TypedColumn::I64(v) => Column::new(name.into(), v),
                TypedColumn::F64(v) => Column::new(name.into(), v),
                TypedColumn::Bool(v) => Column::new(name.into(), v),
                TypedColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();

        DataFrame::new(columns)
    }
}

impl Recorder {
    /// Convert all tables to polars DataFrames.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

/// Drain all recorded data and convert to polars DataFrames.
pub fn drain_to_dataframes() -> HashMap<String, DataFrame> {
    drain().to_dataframes()
}

/// Guard that clears instrumentation data on creation and installs the
/// global subscriber. Call `.get()` after the run to access the DataFrames.
///
/// ```ignore
/// let mut rec = instrument::ScopedRecorder::new();
/// world.run();
/// let steps = &rec.get()[instrument::targets::STEP];
/// ```
pub struct ScopedRecorder {
    dfs: Option<HashMap<String, DataFrame>>,
}

impl ScopedRecorder {
    pub fn new() -> Self {
        clear();
        install_subscriber();
        Self { dfs: None }
    }

    /// First call drains the thread-local recorder; later calls return the
    /// cached frames.
    pub fn get(&mut self) -> &HashMap<String, DataFrame> {
        self.dfs.get_or_insert_with(drain_to_dataframes)
    }
}

impl Default for ScopedRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedRecorder {
    fn drop(&mut self) {
        clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn test_column_padding() {
        let mut table = EventTable::default();
        table
            .columns
            .insert("step".to_string(), TypedColumn::U64(vec![1]));
        table
            .columns
            .insert("comfort".to_string(), TypedColumn::F64(vec![0.25]));
        table.row_count = 1;

        // Row 2 carries step and a new "births" column but no comfort
        if let Some(TypedColumn::U64(v)) = table.columns.get_mut("step") {
            v.push(2);
        }
        table
            .columns
            .insert("births".to_string(), TypedColumn::U64(vec![0, 3]));
        table.row_count = 2;
        table.pad_columns();

        assert_eq!(table.columns["step"].len(), 2);
        assert_eq!(table.columns["births"].len(), 2);
        assert_eq!(table.f64s("comfort"), Some(&[0.25, 0.0][..]));
        assert_eq!(table.u64s("births"), Some(&[0, 3][..]));
    }

    #[test]
    fn test_records_events_by_target() {
        let ((), recorder) = record(|| {
            tracing::info!(target: targets::STEP, step = 1u64, population = 10u64, epidemic = false);
            tracing::info!(target: targets::STEP, step = 2u64, population = 12u64, epidemic = true);
            tracing::info!(target: targets::DEATH, step = 2u64, patrol_id = 7u64, comfort = 0.125f64);
            tracing::debug!(target: targets::DEATH, "debug events are ignored");
        });

        assert_eq!(recorder.count(targets::STEP), 2);
        assert_eq!(recorder.count(targets::DEATH), 1);
        assert_eq!(recorder.count(targets::BIRTH), 0);

        let steps = recorder.table(targets::STEP).unwrap();
        assert_eq!(steps.u64s("population"), Some(&[10, 12][..]));
        assert_eq!(steps.bools("epidemic"), Some(&[false, true][..]));

        let deaths = recorder.table(targets::DEATH).unwrap();
        assert_eq!(deaths.f64s("comfort"), Some(&[0.125][..]));
    }

    #[test]
    fn test_debug_values_become_strings() {
        clear();
        with_default(TableSubscriber, || {
            tracing::info!(target: targets::TERMINATION, step = 4u64, reason = ?Some("Extinction"));
            tracing::info!(target: targets::TERMINATION, step = 9u64);
        });
        let recorder = drain();
        let table = recorder.table(targets::TERMINATION).unwrap();

        let reasons = table.strs("reason").unwrap();
        assert_eq!(reasons.len(), 2);
        assert_eq!(reasons[0], "Some(\"Extinction\")");
        assert_eq!(reasons[1], "");
    }

    #[test]
    fn test_to_dataframe() {
        let ((), recorder) = record(|| {
            for step in 1..=5u64 {
                tracing::info!(target: targets::STEP, step = step, best_comfort = step as f64 / 10.0);
            }
        });
        let df = recorder.table(targets::STEP).unwrap().to_dataframe().unwrap();
        assert_eq!(df.height(), 5);
        assert_eq!(df.width(), 2);
    }
}

//! Event recording for simulation runs.
//!
//! A `tracing` subscriber turns every INFO event into a row of a table named
//! after the event's target (`sale`, `profit`, `trial`, ...). Columns appear as
//! fields are first seen; rows missing a field get a zero/empty default.
//! Tables convert to polars DataFrames for analysis and parquet export.
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "sale", trial, timestep, producer_id, price);
//!
//! // In a test:
//! let mut rec = instrument::RunRecorder::new("data", "roulette_all");
//! // ... run trials ...
//! let sales = &rec.frames()["sale"];
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// === CELLS & COLUMNS ===

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

/// One typed column. Integer fields (`u64`/`i64`) share the `Int` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Flag(Vec<bool>),
    Text(Vec<String>),
}

impl Column {
    fn for_cell(cell: &Cell, rows: usize) -> Self {
        match cell {
            Cell::Int(_) => Column::Int(vec![0; rows]),
            Cell::Float(_) => Column::Float(vec![0.0; rows]),
            Cell::Flag(_) => Column::Flag(vec![false; rows]),
            Cell::Text(_) => Column::Text(vec![String::new(); rows]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Flag(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Column::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            Column::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Append `cell`; integers widen into float columns, any other type
    /// mismatch appends the column default.
    fn push(&mut self, cell: Cell) {
        match (self, cell) {
            (Column::Int(v), Cell::Int(x)) => v.push(x),
            (Column::Float(v), Cell::Float(x)) => v.push(x),
            (Column::Float(v), Cell::Int(x)) => v.push(x as f64),
            (Column::Flag(v), Cell::Flag(x)) => v.push(x),
            (Column::Text(v), Cell::Text(x)) => v.push(x),
            (col, _) => col.pad_to(col.len() + 1),
        }
    }

    fn pad_to(&mut self, rows: usize) {
        match self {
            Column::Int(v) => v.resize(rows, 0),
            Column::Float(v) => v.resize(rows, 0.0),
            Column::Flag(v) => v.resize(rows, false),
            Column::Text(v) => v.resize(rows, String::new()),
        }
    }
}

// === TABLES ===

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: BTreeMap<String, Column>,
    rows: usize,
}

impl Table {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn append(&mut self, row: Vec<(String, Cell)>) {
        for (name, cell) in row {
            let rows = self.rows;
            let col = self
                .columns
                .entry(name)
                .or_insert_with(|| Column::for_cell(&cell, rows));
            // A field repeated within one event keeps its first value
            if col.len() == rows {
                col.push(cell);
            }
        }
        self.rows += 1;
        for col in self.columns.values_mut() {
            col.pad_to(self.rows);
        }
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<polars::prelude::Column> = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                Column::Int(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::Float(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::Flag(v) => polars::prelude::Column::new(name.as_str().into(), v),
                Column::Text(v) => polars::prelude::Column::new(name.as_str().into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// All tables recorded on the current thread, keyed by event target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub tables: BTreeMap<String, Table>,
}

impl Recording {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }

    /// Tables that convert cleanly, as DataFrames.
    pub fn frames(&self) -> BTreeMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_frame().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static RECORDING: RefCell<Recording> = RefCell::default();
}

// === SUBSCRIBER ===

#[derive(Default)]
struct RowVisitor {
    cells: Vec<(String, Cell)>,
}

impl RowVisitor {
    fn put(&mut self, field: &Field, cell: Cell) {
        self.cells.push((field.name().to_string(), cell));
    }
}

impl Visit for RowVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Cell::Int(value as i64));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Cell::Int(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Cell::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Cell::Flag(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Cell::Text(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Cell::Text(format!("{:?}", value)));
    }
}

/// Collects INFO-and-above events into per-target tables. Spans are ignored.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = RowVisitor::default();
        event.record(&mut visitor);
        let target = event.metadata().target();

        RECORDING.with(|r| {
            r.borrow_mut()
                .tables
                .entry(target.to_string())
                .or_default()
                .append(visitor.cells);
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install [`TableSubscriber`] as the global default. Returns true while it is
/// the global subscriber (repeat calls included), false when some other global
/// subscriber got there first.
pub fn install() -> bool {
    *INSTALLED.get_or_init(|| tracing::subscriber::set_global_default(TableSubscriber).is_ok())
}

/// Take everything recorded on this thread.
pub fn drain() -> Recording {
    RECORDING.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDING.with(|r| *r.borrow_mut() = Recording::default());
}

// === PARQUET ===

/// Write each frame to `{dir}/{name}.parquet`.
pub fn write_parquet(frames: &mut BTreeMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir)?;
    for (name, df) in frames.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet")))?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

fn dir_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(60)
        .collect();
    if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    }
}

/// Scoped recording of one run.
///
/// Clears this thread's recording and installs the subscriber on creation.
/// On drop, any recorded tables are written as parquet to
/// `{parent}/{label}_{unix_seconds}/` followed by a `_ready` marker file.
pub struct RunRecorder {
    dir: PathBuf,
    frames: Option<BTreeMap<String, DataFrame>>,
}

impl RunRecorder {
    pub fn new(parent: impl Into<PathBuf>, label: &str) -> Self {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        clear();
        if !install() {
            eprintln!(
                "RunRecorder({label}): another global tracing subscriber is installed; nothing will be recorded"
            );
        }
        Self {
            dir: parent.into().join(format!("{}_{}", dir_label(label), stamp)),
            frames: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drain on first call; later calls return the same frames.
    pub fn frames(&mut self) -> &BTreeMap<String, DataFrame> {
        self.frames.get_or_insert_with(|| drain().frames())
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        let mut frames = self.frames.take().unwrap_or_else(|| drain().frames());
        if frames.is_empty() {
            return;
        }
        if let Err(e) = write_parquet(&mut frames, &self.dir) {
            eprintln!("RunRecorder({}): parquet write failed: {}", self.dir.display(), e);
            return;
        }
        if let Err(e) = std::fs::File::create(self.dir.join("_ready")) {
            eprintln!("RunRecorder({}): _ready marker failed: {}", self.dir.display(), e);
        }
    }
}

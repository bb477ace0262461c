// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The spreadsheet gateway: a narrow capability surface over the host
//! document, plus the in-memory workbook backend that implements it.
//!
//! Every [`SheetHost`] method is one host call group: reads and staged
//! writes settle at a single synchronization point before the call returns,
//! and no method retries on failure.

pub mod chart;
pub mod formula;

pub use chart::{ChartRenderOptions, ChartSpec, ChartStyle};

use anyhow::anyhow;
use std::cmp::Ordering;
use thiserror::Error;
use time::OffsetDateTime;

pub const SCRATCH_SHEET_PREFIX: &str = "celda-scratch";

pub const DEMO_SHEET: &str = "Sheet1";
pub const DEMO_TABLE: &str = "SalesTable";

const DEMO_PRODUCTS: [(&str, f64, f64); 8] = [
    ("Anvils", 112_000.0, 74_000.0),
    ("Bearings", 86_500.0, 41_200.0),
    ("Crates", 39_800.0, 22_500.0),
    ("Dynamos", 147_250.0, 98_400.0),
    ("Engines", 203_000.0, 151_700.0),
    ("Fasteners", 58_300.0, 19_850.0),
    ("Gaskets", 86_500.0, 33_100.0),
    ("Hinges", 24_600.0, 12_900.0),
];

/// The sample document the CLI opens by default.
pub fn demo_workbook() -> Workbook {
    let mut table = Table::new(DEMO_TABLE, &["Product", "Sales", "Costs"]);
    for (product, sales, costs) in DEMO_PRODUCTS {
        table.push_row(vec![
            CellValue::text(product),
            CellValue::Number(sales),
            CellValue::Number(costs),
        ]);
    }
    let mut workbook = Workbook::new(DEMO_SHEET);
    workbook.add_table(DEMO_SHEET, table);
    workbook
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("no table found on the active sheet")]
    NoTableFound,

    #[error("column {0:?} not found in the table")]
    ColumnNotFound(String),

    #[error("columns not found: {}", .0.join(", "))]
    ColumnsNotFound(Vec<String>),

    #[error("host operation failed: {0}")]
    Host(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SheetError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub sheet: String,
    pub table: String,
}

/// Handle to a temporary sheet holding one cloned table. Exclusively owned
/// by the preview that created it and deleted before that preview returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchRef {
    pub sheet: String,
    pub table: TableRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartRef(u64);

impl ChartRef {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Cell region a committed chart is pinned to, in A1 notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAnchor {
    pub top_left: String,
    pub bottom_right: String,
}

impl ChartAnchor {
    pub fn new(top_left: impl Into<String>, bottom_right: impl Into<String>) -> Self {
        Self {
            top_left: top_left.into(),
            bottom_right: bottom_right.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberFormat {
    #[default]
    General,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Formula {
        source: String,
        value: f64,
    },
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Number(value) | Self::Formula { value, .. } => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Display string; null cells render as the empty string.
    pub fn render(&self, format: NumberFormat) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Number(value) | Self::Formula { value, .. } => render_number(*value, format),
        }
    }

    fn sort_value(&self) -> SortValue<'_> {
        match self {
            Self::Empty => SortValue::Empty,
            Self::Number(value) | Self::Formula { value, .. } => SortValue::Number(*value),
            Self::Text(text) => match text.trim().parse() {
                Ok(value) => SortValue::Number(value),
                Err(_) => SortValue::Text(text),
            },
        }
    }
}

fn render_number(value: f64, format: NumberFormat) -> String {
    match format {
        NumberFormat::Integer => format!("{}", value.round() as i64),
        NumberFormat::General => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{}", value as i64)
            } else {
                value.to_string()
            }
        }
    }
}

enum SortValue<'a> {
    Empty,
    Number(f64),
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub format: NumberFormat,
    pub autofit: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: NumberFormat::General,
            autofit: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: headers.iter().map(|header| Column::new(*header)).collect(),
            rows: Vec::new(),
        }
    }

    /// Append one body row, padded or truncated to the table's width.
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(cells);
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Case-sensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn values_as_strings(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(self.column_names());
        for row in &self.rows {
            grid.push(
                row.iter()
                    .zip(&self.columns)
                    .map(|(cell, column)| cell.render(column.format))
                    .collect(),
            );
        }
        grid
    }

    /// Stable descending sort: numbers above text, empties always last,
    /// ties keep their original relative order.
    pub fn sort_descending(&mut self, column: usize) {
        self.rows
            .sort_by(|left, right| descending(&left[column], &right[column]));
    }
}

fn descending(a: &CellValue, b: &CellValue) -> Ordering {
    match (a.sort_value(), b.sort_value()) {
        (SortValue::Empty, SortValue::Empty) => Ordering::Equal,
        (SortValue::Empty, _) => Ordering::Greater,
        (_, SortValue::Empty) => Ordering::Less,
        (SortValue::Number(x), SortValue::Number(y)) => y.total_cmp(&x),
        (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
        (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        (SortValue::Text(x), SortValue::Text(y)) => y.cmp(x),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartObject {
    pub id: ChartRef,
    pub spec: ChartSpec,
    pub anchor: Option<ChartAnchor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub tables: Vec<Table>,
    pub charts: Vec<ChartObject>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            charts: Vec::new(),
        }
    }
}

/// The in-memory host document: a list of sheets, one of them active.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    active: usize,
}

impl Workbook {
    pub fn new(active_sheet: impl Into<String>) -> Self {
        Self {
            sheets: vec![Sheet::new(active_sheet)],
            active: 0,
        }
    }

    pub fn active_sheet(&self) -> &Sheet {
        &self.sheets[self.active]
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn add_table(&mut self, sheet: &str, table: Table) {
        if let Some(sheet) = self.sheet_mut(sheet) {
            sheet.tables.push(table);
        }
    }

    pub fn remove_sheet(&mut self, name: &str) -> bool {
        let Some(index) = self.sheets.iter().position(|sheet| sheet.name == name) else {
            return false;
        };
        if index == self.active {
            return false;
        }
        self.sheets.remove(index);
        if index < self.active {
            self.active -= 1;
        }
        true
    }

    pub fn table(&self, table: &TableRef) -> Option<&Table> {
        self.sheet(&table.sheet)?
            .tables
            .iter()
            .find(|candidate| candidate.name == table.table)
    }

    fn table_mut(&mut self, table: &TableRef) -> Option<&mut Table> {
        self.sheet_mut(&table.sheet)?
            .tables
            .iter_mut()
            .find(|candidate| candidate.name == table.table)
    }

    pub fn chart(&self, id: ChartRef) -> Option<&ChartObject> {
        self.sheets
            .iter()
            .flat_map(|sheet| sheet.charts.iter())
            .find(|chart| chart.id == id)
    }

    /// Total number of chart objects across every sheet.
    pub fn chart_count(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.charts.len()).sum()
    }

    /// Sheets whose names mark them as preview scratch space.
    pub fn scratch_sheet_names(&self) -> Vec<String> {
        self.sheets
            .iter()
            .filter(|sheet| sheet.name.starts_with(SCRATCH_SHEET_PREFIX))
            .map(|sheet| sheet.name.clone())
            .collect()
    }
}

/// Narrow capability surface consumed by the operation executors.
pub trait SheetHost {
    fn first_table(&mut self) -> Result<TableRef>;
    fn column_names(&mut self, table: &TableRef) -> Result<Vec<String>>;
    fn find_column(&mut self, table: &TableRef, name: &str) -> Result<Option<usize>>;
    fn sort_by_column_descending(&mut self, table: &TableRef, column: &str) -> Result<()>;
    fn clone_table_to_scratch(&mut self, table: &TableRef) -> Result<ScratchRef>;
    fn read_table_values(&mut self, table: &TableRef) -> Result<Vec<Vec<String>>>;
    fn delete_scratch_sheet(&mut self, scratch: ScratchRef) -> Result<()>;
    fn add_computed_column(&mut self, table: &TableRef, header: &str, formula: &str) -> Result<()>;
    fn format_column_as_integer(&mut self, table: &TableRef, column: &str) -> Result<()>;
    fn autofit_columns(&mut self, table: &TableRef) -> Result<()>;
    fn build_scatter_chart(
        &mut self,
        table: &TableRef,
        x_column: &str,
        y_column: &str,
        style: &ChartStyle,
    ) -> Result<ChartRef>;
    fn render_chart_to_image(&mut self, chart: &ChartRef) -> Result<String>;
    fn delete_chart(&mut self, chart: ChartRef) -> Result<()>;
    fn place_chart(&mut self, chart: &ChartRef, anchor: &ChartAnchor) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
enum Mutation {
    SortDescending {
        table: TableRef,
        column: usize,
    },
    CreateScratch {
        source: TableRef,
        scratch: ScratchRef,
    },
    DeleteSheet {
        name: String,
    },
    AddComputedColumn {
        table: TableRef,
        header: String,
        formula: String,
    },
    FormatColumnInteger {
        table: TableRef,
        column: usize,
    },
    AutofitColumns {
        table: TableRef,
    },
    CreateChart {
        sheet: String,
        id: ChartRef,
        spec: ChartSpec,
    },
    DeleteChart {
        id: ChartRef,
    },
    PlaceChart {
        id: ChartRef,
        anchor: ChartAnchor,
    },
}

/// In-memory [`SheetHost`] backend.
///
/// Mutations are staged per call group and become visible only at the
/// group's flush; the flush counter increments exactly once per trait
/// method, mirroring the host's explicit-synchronization batching.
#[derive(Debug)]
pub struct MemoryHost {
    workbook: Workbook,
    staged: Vec<Mutation>,
    flushes: u64,
    next_chart_id: u64,
    chart_options: ChartRenderOptions,
}

impl MemoryHost {
    pub fn new(workbook: Workbook) -> Self {
        Self::with_chart_options(workbook, ChartRenderOptions::default())
    }

    pub fn with_chart_options(workbook: Workbook, chart_options: ChartRenderOptions) -> Self {
        Self {
            workbook,
            staged: Vec::new(),
            flushes: 0,
            next_chart_id: 0,
            chart_options,
        }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    fn stage(&mut self, mutation: Mutation) {
        self.staged.push(mutation);
    }

    /// One synchronization point: applies every staged mutation in order.
    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        let staged = std::mem::take(&mut self.staged);
        for mutation in staged {
            self.apply(mutation)?;
        }
        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::SortDescending { table, column } => {
                self.table_mut_or_host(&table)?.sort_descending(column);
            }
            Mutation::CreateScratch { source, scratch } => {
                let cloned = self.table_or_host(&source)?.clone();
                let mut sheet = Sheet::new(scratch.sheet);
                sheet.tables.push(cloned);
                self.workbook.add_sheet(sheet);
            }
            Mutation::DeleteSheet { name } => {
                if !name.starts_with(SCRATCH_SHEET_PREFIX) {
                    return Err(SheetError::Host(anyhow!(
                        "refusing to delete non-scratch sheet {name:?}"
                    )));
                }
                if !self.workbook.remove_sheet(&name) {
                    return Err(SheetError::Host(anyhow!("scratch sheet {name:?} not found")));
                }
            }
            Mutation::AddComputedColumn {
                table,
                header,
                formula,
            } => {
                let expr = formula::parse(&formula).map_err(SheetError::Host)?;
                let target = self.table_mut_or_host(&table)?;

                // Evaluate every row before touching the grid so a failing
                // row leaves the table unchanged.
                let mut computed = Vec::with_capacity(target.rows.len());
                for (index, row) in target.rows.iter().enumerate() {
                    let resolve = |name: &str| {
                        target
                            .column_index(name)
                            .and_then(|column| row.get(column))
                            .and_then(CellValue::as_number)
                    };
                    let value = formula::evaluate(&expr, &resolve).map_err(|error| {
                        SheetError::Host(anyhow!("row {}: {error}", index + 1))
                    })?;
                    computed.push(value);
                }

                target.columns.push(Column::new(header));
                for (row, value) in target.rows.iter_mut().zip(computed) {
                    row.push(CellValue::Formula {
                        source: formula.clone(),
                        value,
                    });
                }
            }
            Mutation::FormatColumnInteger { table, column } => {
                self.table_mut_or_host(&table)?.columns[column].format = NumberFormat::Integer;
            }
            Mutation::AutofitColumns { table } => {
                for column in &mut self.table_mut_or_host(&table)?.columns {
                    column.autofit = true;
                }
            }
            Mutation::CreateChart { sheet, id, spec } => {
                let Some(sheet) = self.workbook.sheet_mut(&sheet) else {
                    return Err(SheetError::Host(anyhow!("sheet {sheet:?} not found")));
                };
                sheet.charts.push(ChartObject {
                    id,
                    spec,
                    anchor: None,
                });
            }
            Mutation::DeleteChart { id } => {
                let mut removed = false;
                for sheet in &mut self.workbook.sheets {
                    if let Some(index) = sheet.charts.iter().position(|chart| chart.id == id) {
                        sheet.charts.remove(index);
                        removed = true;
                        break;
                    }
                }
                if !removed {
                    return Err(SheetError::Host(anyhow!("chart {} not found", id.get())));
                }
            }
            Mutation::PlaceChart { id, anchor } => {
                let mut placed = false;
                for sheet in &mut self.workbook.sheets {
                    if let Some(chart) = sheet.charts.iter_mut().find(|chart| chart.id == id) {
                        chart.anchor = Some(anchor);
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    return Err(SheetError::Host(anyhow!("chart {} not found", id.get())));
                }
            }
        }
        Ok(())
    }

    fn table_or_host(&self, table: &TableRef) -> Result<&Table> {
        self.workbook.table(table).ok_or_else(|| {
            SheetError::Host(anyhow!(
                "table {:?} not found on sheet {:?}",
                table.table,
                table.sheet
            ))
        })
    }

    fn table_mut_or_host(&mut self, table: &TableRef) -> Result<&mut Table> {
        self.workbook.table_mut(table).ok_or_else(|| {
            SheetError::Host(anyhow!(
                "table {:?} not found on sheet {:?}",
                table.table,
                table.sheet
            ))
        })
    }

    fn scratch_sheet_name(&mut self, source: &TableRef) -> String {
        let stamp = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let base = format!("{SCRATCH_SHEET_PREFIX}-{}-{stamp}", source.table);
        let mut name = base.clone();
        let mut bump = 1u64;
        while self.workbook.sheet(&name).is_some() {
            name = format!("{base}-{bump}");
            bump += 1;
        }
        name
    }
}

impl SheetHost for MemoryHost {
    fn first_table(&mut self) -> Result<TableRef> {
        self.flush()?;
        let sheet = self.workbook.active_sheet();
        let table = sheet.tables.first().ok_or(SheetError::NoTableFound)?;
        Ok(TableRef {
            sheet: sheet.name.clone(),
            table: table.name.clone(),
        })
    }

    fn column_names(&mut self, table: &TableRef) -> Result<Vec<String>> {
        self.flush()?;
        Ok(self.table_or_host(table)?.column_names())
    }

    fn find_column(&mut self, table: &TableRef, name: &str) -> Result<Option<usize>> {
        self.flush()?;
        Ok(self.table_or_host(table)?.column_index(name))
    }

    fn sort_by_column_descending(&mut self, table: &TableRef, column: &str) -> Result<()> {
        let index = self
            .table_or_host(table)?
            .column_index(column)
            .ok_or_else(|| SheetError::ColumnNotFound(column.to_owned()))?;
        self.stage(Mutation::SortDescending {
            table: table.clone(),
            column: index,
        });
        self.flush()
    }

    fn clone_table_to_scratch(&mut self, table: &TableRef) -> Result<ScratchRef> {
        self.table_or_host(table)?;
        let sheet = self.scratch_sheet_name(table);
        let scratch = ScratchRef {
            sheet: sheet.clone(),
            table: TableRef {
                sheet,
                table: table.table.clone(),
            },
        };
        self.stage(Mutation::CreateScratch {
            source: table.clone(),
            scratch: scratch.clone(),
        });
        self.flush()?;
        Ok(scratch)
    }

    fn read_table_values(&mut self, table: &TableRef) -> Result<Vec<Vec<String>>> {
        self.flush()?;
        Ok(self.table_or_host(table)?.values_as_strings())
    }

    fn delete_scratch_sheet(&mut self, scratch: ScratchRef) -> Result<()> {
        self.stage(Mutation::DeleteSheet {
            name: scratch.sheet,
        });
        self.flush()
    }

    fn add_computed_column(&mut self, table: &TableRef, header: &str, formula: &str) -> Result<()> {
        let target = self.table_or_host(table)?;
        if target.column_index(header).is_some() {
            return Err(SheetError::Host(anyhow!(
                "table already has a column named {header:?}"
            )));
        }
        self.stage(Mutation::AddComputedColumn {
            table: table.clone(),
            header: header.to_owned(),
            formula: formula.to_owned(),
        });
        self.flush()
    }

    fn format_column_as_integer(&mut self, table: &TableRef, column: &str) -> Result<()> {
        let index = self
            .table_or_host(table)?
            .column_index(column)
            .ok_or_else(|| SheetError::ColumnNotFound(column.to_owned()))?;
        self.stage(Mutation::FormatColumnInteger {
            table: table.clone(),
            column: index,
        });
        self.flush()
    }

    fn autofit_columns(&mut self, table: &TableRef) -> Result<()> {
        self.table_or_host(table)?;
        self.stage(Mutation::AutofitColumns {
            table: table.clone(),
        });
        self.flush()
    }

    fn build_scatter_chart(
        &mut self,
        table: &TableRef,
        x_column: &str,
        y_column: &str,
        style: &ChartStyle,
    ) -> Result<ChartRef> {
        if style.value_scale <= 0.0 {
            return Err(SheetError::Host(anyhow!(
                "chart value scale must be positive, got {}",
                style.value_scale
            )));
        }

        let target = self.table_or_host(table)?;
        let x = target
            .column_index(x_column)
            .ok_or_else(|| SheetError::ColumnNotFound(x_column.to_owned()))?;
        let y = target
            .column_index(y_column)
            .ok_or_else(|| SheetError::ColumnNotFound(y_column.to_owned()))?;

        let points: Vec<(f64, f64)> = target
            .rows
            .iter()
            .filter_map(|row| {
                let x = row.get(x)?.as_number()?;
                let y = row.get(y)?.as_number()?;
                Some((x / style.value_scale, y / style.value_scale))
            })
            .collect();

        self.next_chart_id += 1;
        let id = ChartRef::new(self.next_chart_id);
        self.stage(Mutation::CreateChart {
            sheet: table.sheet.clone(),
            id,
            spec: ChartSpec {
                style: style.clone(),
                points,
            },
        });
        self.flush()?;
        Ok(id)
    }

    fn render_chart_to_image(&mut self, chart: &ChartRef) -> Result<String> {
        self.flush()?;
        let object = self
            .workbook
            .chart(*chart)
            .ok_or_else(|| SheetError::Host(anyhow!("chart {} not found", chart.get())))?;
        chart::render_scatter_png(&object.spec, &self.chart_options).map_err(SheetError::Host)
    }

    fn delete_chart(&mut self, chart: ChartRef) -> Result<()> {
        self.stage(Mutation::DeleteChart { id: chart });
        self.flush()
    }

    fn place_chart(&mut self, chart: &ChartRef, anchor: &ChartAnchor) -> Result<()> {
        self.stage(Mutation::PlaceChart {
            id: *chart,
            anchor: anchor.clone(),
        });
        self.flush()
    }
}

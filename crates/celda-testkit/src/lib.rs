// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Seeded demo workbooks and a fault-injecting host wrapper for tests.

use anyhow::anyhow;
use celda_sheet::{
    CellValue, ChartAnchor, ChartRef, ChartStyle, Result, ScratchRef, SheetError, SheetHost,
    Table, TableRef, Workbook,
};
use std::collections::BTreeSet;

pub use celda_sheet::{DEMO_SHEET, DEMO_TABLE, demo_workbook};

/// The two-row table used by the end-to-end sort scenario.
pub fn scenario_workbook() -> Workbook {
    let mut table = Table::new(DEMO_TABLE, &["Product", "Sales", "Costs"]);
    table.push_row(vec![
        CellValue::text("A"),
        CellValue::Number(100.0),
        CellValue::Number(60.0),
    ]);
    table.push_row(vec![
        CellValue::text("B"),
        CellValue::Number(300.0),
        CellValue::Number(90.0),
    ]);
    workbook_with(table)
}

/// An active sheet with zero tables.
pub fn empty_workbook() -> Workbook {
    Workbook::new(DEMO_SHEET)
}

/// A table without any sales column, for column-lookup failures.
pub fn workbook_without_sales() -> Workbook {
    let mut table = Table::new(DEMO_TABLE, &["Product", "Revenue", "Costs"]);
    table.push_row(vec![
        CellValue::text("A"),
        CellValue::Number(100.0),
        CellValue::Number(60.0),
    ]);
    workbook_with(table)
}

fn workbook_with(table: Table) -> Workbook {
    let mut workbook = Workbook::new(DEMO_SHEET);
    workbook.add_table(DEMO_SHEET, table);
    workbook
}

/// Host wrapper that fails selected operations with a host error while
/// delegating everything else, for exercising guaranteed-cleanup paths.
#[derive(Debug)]
pub struct FlakyHost<H> {
    inner: H,
    failing: BTreeSet<String>,
}

impl<H> FlakyHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            failing: BTreeSet::new(),
        }
    }

    /// Make every future call to the named operation fail.
    pub fn fail_on(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_owned());
        self
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.failing.contains(operation) {
            return Err(SheetError::Host(anyhow!("injected failure: {operation}")));
        }
        Ok(())
    }
}

impl<H: SheetHost> SheetHost for FlakyHost<H> {
    fn first_table(&mut self) -> Result<TableRef> {
        self.check("first_table")?;
        self.inner.first_table()
    }

    fn column_names(&mut self, table: &TableRef) -> Result<Vec<String>> {
        self.check("column_names")?;
        self.inner.column_names(table)
    }

    fn find_column(&mut self, table: &TableRef, name: &str) -> Result<Option<usize>> {
        self.check("find_column")?;
        self.inner.find_column(table, name)
    }

    fn sort_by_column_descending(&mut self, table: &TableRef, column: &str) -> Result<()> {
        self.check("sort_by_column_descending")?;
        self.inner.sort_by_column_descending(table, column)
    }

    fn clone_table_to_scratch(&mut self, table: &TableRef) -> Result<ScratchRef> {
        self.check("clone_table_to_scratch")?;
        self.inner.clone_table_to_scratch(table)
    }

    fn read_table_values(&mut self, table: &TableRef) -> Result<Vec<Vec<String>>> {
        self.check("read_table_values")?;
        self.inner.read_table_values(table)
    }

    fn delete_scratch_sheet(&mut self, scratch: ScratchRef) -> Result<()> {
        self.check("delete_scratch_sheet")?;
        self.inner.delete_scratch_sheet(scratch)
    }

    fn add_computed_column(&mut self, table: &TableRef, header: &str, formula: &str) -> Result<()> {
        self.check("add_computed_column")?;
        self.inner.add_computed_column(table, header, formula)
    }

    fn format_column_as_integer(&mut self, table: &TableRef, column: &str) -> Result<()> {
        self.check("format_column_as_integer")?;
        self.inner.format_column_as_integer(table, column)
    }

    fn autofit_columns(&mut self, table: &TableRef) -> Result<()> {
        self.check("autofit_columns")?;
        self.inner.autofit_columns(table)
    }

    fn build_scatter_chart(
        &mut self,
        table: &TableRef,
        x_column: &str,
        y_column: &str,
        style: &ChartStyle,
    ) -> Result<ChartRef> {
        self.check("build_scatter_chart")?;
        self.inner.build_scatter_chart(table, x_column, y_column, style)
    }

    fn render_chart_to_image(&mut self, chart: &ChartRef) -> Result<String> {
        self.check("render_chart_to_image")?;
        self.inner.render_chart_to_image(chart)
    }

    fn delete_chart(&mut self, chart: ChartRef) -> Result<()> {
        self.check("delete_chart")?;
        self.inner.delete_chart(chart)
    }

    fn place_chart(&mut self, chart: &ChartRef, anchor: &ChartAnchor) -> Result<()> {
        self.check("place_chart")?;
        self.inner.place_chart(chart, anchor)
    }
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Sort the table by sales, descending.

use celda_app::TablePreview;
use celda_sheet::{Result, ScratchRef, SheetError, SheetHost, TableRef};

/// The sort key; matched against headers case-insensitively.
pub const SORT_COLUMN: &str = "sales";

/// Sort a scratch copy and return the sorted grid. The live table is never
/// touched; the scratch sheet is deleted on success and failure alike.
pub fn preview<H: SheetHost>(host: &mut H) -> Result<TablePreview> {
    let table = host.first_table()?;
    let column = locate_sort_column(host, &table)?;

    let scratch = host.clone_table_to_scratch(&table)?;
    let sorted = sort_and_read(host, &scratch, &column);
    let cleanup = host.delete_scratch_sheet(scratch);
    let rows = sorted?;
    cleanup?;
    Ok(TablePreview::new(rows))
}

/// Sort the live table in place by the same rule.
pub fn commit<H: SheetHost>(host: &mut H) -> Result<()> {
    let table = host.first_table()?;
    let column = locate_sort_column(host, &table)?;
    host.sort_by_column_descending(&table, &column)
}

fn sort_and_read<H: SheetHost>(
    host: &mut H,
    scratch: &ScratchRef,
    column: &str,
) -> Result<Vec<Vec<String>>> {
    host.sort_by_column_descending(&scratch.table, column)?;
    host.read_table_values(&scratch.table)
}

fn locate_sort_column<H: SheetHost>(host: &mut H, table: &TableRef) -> Result<String> {
    host.column_names(table)?
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(SORT_COLUMN))
        .ok_or_else(|| SheetError::ColumnNotFound(SORT_COLUMN.to_owned()))
}

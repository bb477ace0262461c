// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Profit column: explained in preview, appended on commit.

use celda_sheet::{Result, SheetError, SheetHost};

pub const PROFIT_HEADER: &str = "Profits";
pub const PROFIT_FORMULA: &str = "=[@Sales]-[@Costs]";

/// The formula's operands, looked up by exact name before committing.
const REFERENCED_COLUMNS: [&str; 2] = ["Sales", "Costs"];

/// Preview only explains the computation; the document is not touched
/// beyond confirming a table exists to apply it to.
pub fn preview<H: SheetHost>(host: &mut H) -> Result<String> {
    host.first_table()?;
    Ok(format!(
        "Profit is computed per row as Sales minus Costs. Applying this adds a \
         {PROFIT_HEADER:?} column where each row holds the formula \
         {PROFIT_FORMULA}, formatted as whole numbers."
    ))
}

/// Append the formula column to the live table, format it as integers, and
/// autofit the column widths.
pub fn commit<H: SheetHost>(host: &mut H) -> Result<()> {
    let table = host.first_table()?;
    for column in REFERENCED_COLUMNS {
        if host.find_column(&table, column)?.is_none() {
            return Err(SheetError::ColumnNotFound(column.to_owned()));
        }
    }

    host.add_computed_column(&table, PROFIT_HEADER, PROFIT_FORMULA)?;
    host.format_column_as_integer(&table, PROFIT_HEADER)?;
    host.autofit_columns(&table)
}

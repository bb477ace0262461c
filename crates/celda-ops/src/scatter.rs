// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Scatter chart of sales against costs.

use celda_app::ChartPreview;
use celda_sheet::{ChartAnchor, ChartStyle, Result, SheetError, SheetHost, TableRef};

pub const X_COLUMN: &str = "Sales";
pub const Y_COLUMN: &str = "Costs";
pub const CHART_TITLE: &str = "Costs by Sales";

/// Axis values are divided down to thousands so large currency figures stay
/// readable.
const VALUE_SCALE: f64 = 1_000.0;

/// Cell region a committed chart is pinned to.
const ANCHOR_TOP_LEFT: &str = "E2";
const ANCHOR_BOTTOM_RIGHT: &str = "L20";

/// Build the chart, render it to PNG bytes, and delete the transient chart
/// object again; the sheet is left exactly as it was.
pub fn preview<H: SheetHost>(host: &mut H) -> Result<ChartPreview> {
    let table = host.first_table()?;
    let (x, y) = locate_axis_columns(host, &table)?;

    let chart = host.build_scatter_chart(&table, &x, &y, &style(&x, &y))?;
    let rendered = host.render_chart_to_image(&chart);
    let removed = host.delete_chart(chart);
    let image_base64 = rendered?;
    removed?;
    Ok(ChartPreview::new(image_base64))
}

/// Build the same chart and leave it placed at the fixed anchor region.
pub fn commit<H: SheetHost>(host: &mut H) -> Result<()> {
    let table = host.first_table()?;
    let (x, y) = locate_axis_columns(host, &table)?;

    let chart = host.build_scatter_chart(&table, &x, &y, &style(&x, &y))?;
    host.place_chart(
        &chart,
        &ChartAnchor::new(ANCHOR_TOP_LEFT, ANCHOR_BOTTOM_RIGHT),
    )
}

fn style(x: &str, y: &str) -> ChartStyle {
    ChartStyle {
        title: CHART_TITLE.to_owned(),
        x_label: format!("{x} (thousands)"),
        y_label: format!("{y} (thousands)"),
        legend_visible: false,
        value_scale: VALUE_SCALE,
    }
}

/// Resolve both axis columns, preferring the exact capitalized headers and
/// accepting a case variant. Reports every missing column at once.
fn locate_axis_columns<H: SheetHost>(host: &mut H, table: &TableRef) -> Result<(String, String)> {
    let names = host.column_names(table)?;
    let x = find_case_variant(&names, X_COLUMN);
    let y = find_case_variant(&names, Y_COLUMN);
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        (x, y) => {
            let mut missing = Vec::new();
            if x.is_none() {
                missing.push(X_COLUMN.to_owned());
            }
            if y.is_none() {
                missing.push(Y_COLUMN.to_owned());
            }
            Err(SheetError::ColumnsNotFound(missing))
        }
    }
}

fn find_case_variant(names: &[String], wanted: &str) -> Option<String> {
    names
        .iter()
        .find(|name| name.as_str() == wanted)
        .or_else(|| names.iter().find(|name| name.eq_ignore_ascii_case(wanted)))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::find_case_variant;

    #[test]
    fn exact_header_wins_over_case_variant() {
        let names = vec!["sales".to_owned(), "Sales".to_owned()];
        assert_eq!(find_case_variant(&names, "Sales"), Some("Sales".to_owned()));
    }

    #[test]
    fn case_variant_is_accepted_when_exact_is_absent() {
        let names = vec!["SALES".to_owned(), "Costs".to_owned()];
        assert_eq!(find_case_variant(&names, "Sales"), Some("SALES".to_owned()));
        assert_eq!(find_case_variant(&names, "Margin"), None);
    }
}

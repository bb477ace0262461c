// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use celda_app::{Intent, MessageBody, UNRECOGNIZED_REPLY};
use celda_ops::{commit_intent, preview_reply, profit, scatter, sort};
use celda_sheet::{CellValue, MemoryHost, SheetError, SheetHost, Table, Workbook};
use celda_testkit::{
    DEMO_SHEET, DEMO_TABLE, FlakyHost, demo_workbook, empty_workbook, scenario_workbook,
    workbook_without_sales,
};

fn live_values(host: &mut MemoryHost) -> Result<Vec<Vec<String>>> {
    let table = host.first_table()?;
    Ok(host.read_table_values(&table)?)
}

#[test]
fn sort_preview_returns_the_documented_scenario_grid() -> Result<()> {
    let mut host = MemoryHost::new(scenario_workbook());
    let preview = sort::preview(&mut host)?;
    assert_eq!(
        preview.rows,
        vec![
            vec!["Product".to_owned(), "Sales".to_owned(), "Costs".to_owned()],
            vec!["B".to_owned(), "300".to_owned(), "90".to_owned()],
            vec!["A".to_owned(), "100".to_owned(), "60".to_owned()],
        ]
    );
    Ok(())
}

#[test]
fn sort_preview_never_mutates_the_live_table() -> Result<()> {
    let mut host = MemoryHost::new(demo_workbook());
    let before = live_values(&mut host)?;

    sort::preview(&mut host)?;
    assert_eq!(live_values(&mut host)?, before);
    assert!(host.workbook().scratch_sheet_names().is_empty());
    Ok(())
}

#[test]
fn sort_preview_cleans_up_the_scratch_sheet_on_failure() -> Result<()> {
    let mut host = FlakyHost::new(MemoryHost::new(demo_workbook())).fail_on("read_table_values");
    let error = sort::preview(&mut host).expect_err("injected read failure");
    assert!(matches!(error, SheetError::Host(_)));

    // The scratch sheet is gone and the live table is untouched.
    assert!(host.inner().workbook().scratch_sheet_names().is_empty());
    let table = &host.inner().workbook().active_sheet().tables[0];
    assert_eq!(table.rows[0][0], CellValue::text("Anvils"));
    Ok(())
}

#[test]
fn sort_preview_output_is_non_increasing_and_stable() -> Result<()> {
    let mut table = Table::new(DEMO_TABLE, &["Product", "Sales", "Costs"]);
    for (product, sales) in [("A", 100.0), ("B", 250.0), ("C", 100.0), ("D", 250.0)] {
        table.push_row(vec![
            CellValue::text(product),
            CellValue::Number(sales),
            CellValue::Number(10.0),
        ]);
    }
    let mut workbook = Workbook::new(DEMO_SHEET);
    workbook.add_table(DEMO_SHEET, table);

    let mut host = MemoryHost::new(workbook);
    let preview = sort::preview(&mut host)?;

    let sales: Vec<f64> = preview.rows[1..]
        .iter()
        .map(|row| row[1].parse().expect("numeric sales"))
        .collect();
    assert!(sales.windows(2).all(|pair| pair[0] >= pair[1]));

    // Ties keep their original relative order.
    let products: Vec<&str> = preview.rows[1..].iter().map(|row| row[0].as_str()).collect();
    assert_eq!(products, vec!["B", "D", "A", "C"]);
    Ok(())
}

#[test]
fn sort_preview_fails_without_a_sales_column() {
    let mut host = MemoryHost::new(workbook_without_sales());
    let error = sort::preview(&mut host).expect_err("no sales column");
    assert!(matches!(error, SheetError::ColumnNotFound(name) if name == "sales"));
    assert!(host.workbook().scratch_sheet_names().is_empty());
}

#[test]
fn sort_commit_reorders_the_live_table() -> Result<()> {
    let mut host = MemoryHost::new(scenario_workbook());
    sort::commit(&mut host)?;

    let values = live_values(&mut host)?;
    assert_eq!(values[1][0], "B");
    assert_eq!(values[2][0], "A");
    Ok(())
}

#[test]
fn scatter_preview_renders_png_and_leaves_no_chart_behind() -> Result<()> {
    let mut host = MemoryHost::new(demo_workbook());
    let preview = scatter::preview(&mut host)?;

    let bytes = STANDARD.decode(&preview.image_base64)?;
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    assert_eq!(host.workbook().chart_count(), 0);
    Ok(())
}

#[test]
fn scatter_preview_deletes_the_chart_when_rendering_fails() -> Result<()> {
    let mut host =
        FlakyHost::new(MemoryHost::new(demo_workbook())).fail_on("render_chart_to_image");
    let error = scatter::preview(&mut host).expect_err("injected render failure");
    assert!(matches!(error, SheetError::Host(_)));
    assert_eq!(host.inner().workbook().chart_count(), 0);
    Ok(())
}

#[test]
fn scatter_preview_reports_every_missing_column() {
    let mut table = Table::new(DEMO_TABLE, &["Product", "Price"]);
    table.push_row(vec![CellValue::text("A"), CellValue::Number(1.0)]);
    let mut workbook = Workbook::new(DEMO_SHEET);
    workbook.add_table(DEMO_SHEET, table);

    let mut host = MemoryHost::new(workbook);
    let error = scatter::preview(&mut host).expect_err("both columns missing");
    match error {
        SheetError::ColumnsNotFound(missing) => {
            assert_eq!(missing, vec!["Sales".to_owned(), "Costs".to_owned()]);
        }
        other => panic!("expected ColumnsNotFound, got {other}"),
    }
    assert_eq!(host.workbook().chart_count(), 0);
}

#[test]
fn scatter_commit_places_one_anchored_chart() -> Result<()> {
    let mut host = MemoryHost::new(demo_workbook());
    scatter::commit(&mut host)?;

    assert_eq!(host.workbook().chart_count(), 1);
    let sheet = host.workbook().sheet(DEMO_SHEET).expect("sheet");
    let chart = &sheet.charts[0];
    assert_eq!(chart.spec.style.title, scatter::CHART_TITLE);
    assert!(!chart.spec.style.legend_visible);
    let anchor = chart.anchor.as_ref().expect("anchored");
    assert_eq!(anchor.top_left, "E2");
    Ok(())
}

#[test]
fn profit_preview_only_explains_and_touches_nothing() -> Result<()> {
    let mut host = MemoryHost::new(scenario_workbook());
    let before = host.workbook().clone();

    let text = profit::preview(&mut host)?;
    assert!(text.contains("Sales minus Costs"));
    assert!(text.contains(profit::PROFIT_FORMULA));
    assert_eq!(host.workbook(), &before);
    Ok(())
}

#[test]
fn profit_commit_appends_one_formula_column_per_row() -> Result<()> {
    let mut host = MemoryHost::new(scenario_workbook());
    profit::commit(&mut host)?;

    let table = &host.workbook().active_sheet().tables[0];
    assert_eq!(table.column_names(), vec!["Product", "Sales", "Costs", "Profits"]);
    assert_eq!(table.rows.len(), 2);
    for row in &table.rows {
        match &row[3] {
            CellValue::Formula { source, .. } => assert_eq!(source, profit::PROFIT_FORMULA),
            other => panic!("expected formula cell, got {other:?}"),
        }
    }
    assert!(table.columns.iter().all(|column| column.autofit));

    let values = live_values(&mut host)?;
    assert_eq!(values[1][3], "40");
    assert_eq!(values[2][3], "210");
    Ok(())
}

#[test]
fn profit_commit_requires_its_operand_columns() {
    let mut host = MemoryHost::new(workbook_without_sales());
    let error = profit::commit(&mut host).expect_err("missing Sales column");
    assert!(matches!(error, SheetError::ColumnNotFound(name) if name == "Sales"));

    let table = &host.workbook().active_sheet().tables[0];
    assert_eq!(table.column_names(), vec!["Product", "Revenue", "Costs"]);
}

#[test]
fn every_recognized_command_reports_a_missing_table() {
    for intent in [
        Intent::SortBySales,
        Intent::ScatterSalesCosts,
        Intent::InsertProfitColumn,
    ] {
        let mut host = MemoryHost::new(empty_workbook());
        let error = preview_reply(&mut host, intent).expect_err("empty sheet must fail");
        assert!(matches!(error, SheetError::NoTableFound));
        assert!(error.to_string().contains("no table found"));
    }
}

#[test]
fn dispatcher_marks_every_recognized_preview_committable() -> Result<()> {
    for intent in [
        Intent::SortBySales,
        Intent::ScatterSalesCosts,
        Intent::InsertProfitColumn,
    ] {
        let mut host = MemoryHost::new(demo_workbook());
        let reply = preview_reply(&mut host, intent)?;
        assert_eq!(reply.commit, Some(intent));
    }
    Ok(())
}

#[test]
fn dispatcher_answers_unrecognized_with_the_fixed_text() -> Result<()> {
    let mut host = MemoryHost::new(empty_workbook());
    let reply = preview_reply(&mut host, Intent::Unrecognized)?;
    assert_eq!(reply.body, MessageBody::Text(UNRECOGNIZED_REPLY.to_owned()));
    assert_eq!(reply.commit, None);
    Ok(())
}

#[test]
fn dispatcher_refuses_to_commit_an_unrecognized_intent() {
    let mut host = MemoryHost::new(demo_workbook());
    let error = commit_intent(&mut host, Intent::Unrecognized).expect_err("nothing to apply");
    assert!(error.to_string().contains("cannot be applied"));
}

#[test]
fn commit_confirmations_name_what_changed() -> Result<()> {
    let mut host = MemoryHost::new(demo_workbook());
    let sorted = commit_intent(&mut host, Intent::SortBySales)?;
    assert!(sorted.contains("descending"));

    let charted = commit_intent(&mut host, Intent::ScatterSalesCosts)?;
    assert!(charted.contains(scatter::CHART_TITLE));

    let profits = commit_intent(&mut host, Intent::InsertProfitColumn)?;
    assert!(profits.contains(profit::PROFIT_HEADER));
    Ok(())
}

#[test]
fn preview_reply_wraps_executor_payloads_in_message_bodies() -> Result<()> {
    let mut host = MemoryHost::new(scenario_workbook());

    let sorted = preview_reply(&mut host, Intent::SortBySales)?;
    assert_eq!(sorted.body.kind(), "table");

    let charted = preview_reply(&mut host, Intent::ScatterSalesCosts)?;
    assert_eq!(charted.body.kind(), "image");

    let profits = preview_reply(&mut host, Intent::InsertProfitColumn)?;
    assert_eq!(profits.body.kind(), "text");
    Ok(())
}

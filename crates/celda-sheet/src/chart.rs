// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Scatter-chart objects and bitmap export.
//!
//! A chart lives on a sheet as a [`ChartSpec`]: styling plus the prepared
//! point series. Export draws the axes and points with plotters into an RGB
//! buffer, encodes it as PNG, and returns the base64 bytes that travel in an
//! image message.

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_visible: bool,
    /// Divisor applied to raw cell values when the point series is prepared,
    /// so axes stay readable for large currency figures.
    pub value_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub style: ChartStyle,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRenderOptions {
    pub width: u32,
    pub height: u32,
    pub point_radius: u32,
}

impl Default for ChartRenderOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 420,
            point_radius: 4,
        }
    }
}

/// Draw the scatter series and return the PNG as base64.
pub fn render_scatter_png(spec: &ChartSpec, options: &ChartRenderOptions) -> Result<String> {
    if spec.points.is_empty() {
        bail!("chart has no numeric data points");
    }
    if options.width == 0 || options.height == 0 {
        bail!(
            "chart bitmap must have positive dimensions, got {}x{}",
            options.width,
            options.height
        );
    }

    let width = options.width;
    let height = options.height;
    let mut frame = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut frame, (width, height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|error| anyhow!("fill chart background: {error}"))?;

        let (x_min, x_max) = padded_range(spec.points.iter().map(|point| point.0));
        let (y_min, y_max) = padded_range(spec.points.iter().map(|point| point.1));

        let mut chart = ChartBuilder::on(&root)
            .margin(12)
            .x_label_area_size(24)
            .y_label_area_size(32)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|error| anyhow!("build chart axes: {error}"))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(0)
            .y_labels(0)
            .axis_style(BLACK.stroke_width(1))
            .draw()
            .map_err(|error| anyhow!("draw chart axes: {error}"))?;

        chart
            .draw_series(spec.points.iter().map(|&(x, y)| {
                Circle::new((x, y), options.point_radius as i32, BLUE.filled())
            }))
            .map_err(|error| anyhow!("draw chart series: {error}"))?;

        root.present()
            .map_err(|error| anyhow!("finalize chart bitmap: {error}"))?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&frame, width, height, image::ExtendedColorType::Rgb8)
        .context("encode chart png")?;
    Ok(STANDARD.encode(png))
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
        (min.min(value), max.max(value))
    });
    let span = max - min;
    if span == 0.0 {
        (min - 1.0, max + 1.0)
    } else {
        (min - span * 0.05, max + span * 0.05)
    }
}

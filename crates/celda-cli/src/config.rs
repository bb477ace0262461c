// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use celda_sheet::ChartRenderOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "celda";

const CONFIG_VERSION: i64 = 1;
const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 300;
const DEFAULT_PREVIEW_DELAY_MS: u64 = 400;
const DEFAULT_CHART_WIDTH: u32 = 640;
const DEFAULT_CHART_HEIGHT: u32 = 420;
const DEFAULT_CHART_POINT_RADIUS: u32 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub chart: Chart,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ui: Ui::default(),
            chart: Chart::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub progress_interval_ms: Option<u64>,
    pub preview_delay_ms: Option<u64>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            progress_interval_ms: Some(DEFAULT_PROGRESS_INTERVAL_MS),
            preview_delay_ms: Some(DEFAULT_PREVIEW_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub point_radius: Option<u32>,
}

impl Default for Chart {
    fn default() -> Self {
        Self {
            width: Some(DEFAULT_CHART_WIDTH),
            height: Some(DEFAULT_CHART_HEIGHT),
            point_radius: Some(DEFAULT_CHART_POINT_RADIUS),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CELDA_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CELDA_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [ui] and [chart]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(interval) = self.ui.progress_interval_ms
            && interval == 0
        {
            bail!(
                "ui.progress_interval_ms in {} must be positive",
                path.display()
            );
        }

        if let Some(width) = self.chart.width
            && width == 0
        {
            bail!("chart.width in {} must be positive", path.display());
        }

        if let Some(height) = self.chart.height
            && height == 0
        {
            bail!("chart.height in {} must be positive", path.display());
        }

        if let Some(radius) = self.chart.point_radius
            && radius == 0
        {
            bail!("chart.point_radius in {} must be positive", path.display());
        }

        Ok(())
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# celda config ({})\n\
             version = {CONFIG_VERSION}\n\
             \n\
             [ui]\n\
             # Milliseconds between progress-dot frames.\n\
             progress_interval_ms = {DEFAULT_PROGRESS_INTERVAL_MS}\n\
             # Artificial delay before each preview; 0 disables it.\n\
             preview_delay_ms = {DEFAULT_PREVIEW_DELAY_MS}\n\
             \n\
             [chart]\n\
             width = {DEFAULT_CHART_WIDTH}\n\
             height = {DEFAULT_CHART_HEIGHT}\n\
             point_radius = {DEFAULT_CHART_POINT_RADIUS}\n",
            path.display()
        )
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(
            self.ui
                .progress_interval_ms
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL_MS),
        )
    }

    pub fn preview_delay(&self) -> Duration {
        Duration::from_millis(self.ui.preview_delay_ms.unwrap_or(DEFAULT_PREVIEW_DELAY_MS))
    }

    pub fn chart_options(&self) -> ChartRenderOptions {
        ChartRenderOptions {
            width: self.chart.width.unwrap_or(DEFAULT_CHART_WIDTH),
            height: self.chart.height.unwrap_or(DEFAULT_CHART_HEIGHT),
            point_radius: self.chart.point_radius.unwrap_or(DEFAULT_CHART_POINT_RADIUS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use std::fs;
    use std::time::Duration;

    fn write_config(contents: &str) -> Result<(tempfile::TempDir, std::path::PathBuf)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, contents)?;
        Ok((dir, path))
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load(&dir.path().join("absent.toml"))?;
        assert_eq!(config.progress_interval(), Duration::from_millis(300));
        assert_eq!(config.preview_delay(), Duration::from_millis(400));
        assert_eq!(config.chart_options().width, 640);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_guidance() -> Result<()> {
        let (_dir, path) = write_config("[ui]\nprogress_interval_ms = 100\n")?;
        let error = Config::load(&path).expect_err("unversioned config must fail");
        assert!(error.to_string().contains("not versioned"));
        assert!(error.to_string().contains("version = 1"));
        Ok(())
    }

    #[test]
    fn wrong_version_is_rejected() -> Result<()> {
        let (_dir, path) = write_config("version = 9\n")?;
        let error = Config::load(&path).expect_err("wrong version must fail");
        assert!(error.to_string().contains("unsupported config version 9"));
        Ok(())
    }

    #[test]
    fn zero_chart_width_is_rejected() -> Result<()> {
        let (_dir, path) = write_config("version = 1\n[chart]\nwidth = 0\n")?;
        let error = Config::load(&path).expect_err("zero width must fail");
        assert!(error.to_string().contains("chart.width"));
        Ok(())
    }

    #[test]
    fn zero_progress_interval_is_rejected() -> Result<()> {
        let (_dir, path) = write_config("version = 1\n[ui]\nprogress_interval_ms = 0\n")?;
        let error = Config::load(&path).expect_err("zero interval must fail");
        assert!(error.to_string().contains("progress_interval_ms"));
        Ok(())
    }

    #[test]
    fn values_override_the_defaults() -> Result<()> {
        let (_dir, path) = write_config(
            "version = 1\n\
             [ui]\n\
             progress_interval_ms = 150\n\
             preview_delay_ms = 0\n\
             [chart]\n\
             width = 800\n\
             height = 500\n\
             point_radius = 6\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.progress_interval(), Duration::from_millis(150));
        assert_eq!(config.preview_delay(), Duration::ZERO);
        let chart = config.chart_options();
        assert_eq!((chart.width, chart.height, chart.point_radius), (800, 500, 6));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_the_loader() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.version, 1);
        Ok(())
    }
}

use crate::plot::MIN_THRESHOLD;
use crate::render::{Assets, DisplayOptions, LegendMode};
use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

const DEFAULT_TITLE: &str = "Latency Plot";
const DEFAULT_THRESHOLD: usize = 4000;
const DEFAULT_STROKE_WIDTH: f64 = 1.3;

#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub threshold: usize,
    pub log_scale: bool,
    pub legend: LegendMode,
    pub stroke_width: f64,
    pub dygraphs_js: Option<PathBuf>,
    pub html2canvas_js: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            threshold: DEFAULT_THRESHOLD,
            log_scale: true,
            legend: LegendMode::Always,
            stroke_width: DEFAULT_STROKE_WIDTH,
            dygraphs_js: None,
            html2canvas_js: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let title = get("LATENCY_PLOT_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let threshold = match get("LATENCY_PLOT_THRESHOLD") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("invalid LATENCY_PLOT_THRESHOLD {raw:?}"))?,
            None => DEFAULT_THRESHOLD,
        };
        let log_scale = get("LATENCY_PLOT_LOG_SCALE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);
        let legend = get("LATENCY_PLOT_LEGEND")
            .and_then(|v| match v.parse::<LegendMode>() {
                Ok(mode) => Some(mode),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring LATENCY_PLOT_LEGEND");
                    None
                }
            })
            .unwrap_or_default();
        let stroke_width = get("LATENCY_PLOT_STROKE_WIDTH")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_STROKE_WIDTH);
        let dygraphs_js = get("LATENCY_PLOT_DYGRAPHS_JS").map(PathBuf::from);
        let html2canvas_js = get("LATENCY_PLOT_HTML2CANVAS_JS").map(PathBuf::from);

        Ok(Self {
            title,
            threshold,
            log_scale,
            legend,
            stroke_width,
            dygraphs_js,
            html2canvas_js,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold < MIN_THRESHOLD {
            bail!(
                "downsample threshold must be at least {MIN_THRESHOLD}, got {}",
                self.threshold
            );
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            bail!("stroke width must be a positive number, got {}", self.stroke_width);
        }
        Ok(())
    }

    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            legend: self.legend,
            log_scale: self.log_scale,
            stroke_width: self.stroke_width,
            ..DisplayOptions::default()
        }
    }

    pub fn assets(&self) -> Result<Assets> {
        Assets::load(self.dygraphs_js.as_deref(), self.html2canvas_js.as_deref())
            .context("failed to read chart script assets")
    }
}

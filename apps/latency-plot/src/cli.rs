use clap::Parser;
use latency_plot::config::Config;
use latency_plot::render::LegendMode;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "latency-plot",
    version,
    about = "Plot load-test latencies over time as a standalone HTML page"
)]
pub struct Args {
    /// Result files (JSON lines or CSV). `-` or no files reads stdin.
    pub files: Vec<PathBuf>,
    #[arg(long)]
    pub title: Option<String>,
    /// Maximum points kept per series.
    #[arg(long)]
    pub threshold: Option<usize>,
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Use a linear latency axis instead of a logarithmic one.
    #[arg(long, default_value_t = false)]
    pub linear: bool,
    #[arg(long, value_enum)]
    pub legend: Option<LegendMode>,
    #[arg(long)]
    pub stroke_width: Option<f64>,
    #[arg(long)]
    pub dygraphs_js: Option<PathBuf>,
    #[arg(long)]
    pub html2canvas_js: Option<PathBuf>,
}

impl Args {
    pub fn apply(&self, config: &mut Config) {
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if self.linear {
            config.log_scale = false;
        }
        if let Some(legend) = self.legend {
            config.legend = legend;
        }
        if let Some(width) = self.stroke_width {
            config.stroke_width = width;
        }
        if let Some(path) = &self.dygraphs_js {
            config.dygraphs_js = Some(path.clone());
        }
        if let Some(path) = &self.html2canvas_js {
            config.html2canvas_js = Some(path.clone());
        }
    }

    /// Inputs to read, with stdin spelled as `-`.
    pub fn inputs(&self) -> Vec<PathBuf> {
        if self.files.is_empty() {
            vec![PathBuf::from("-")]
        } else {
            self.files.clone()
        }
    }
}

//! Standalone HTML document for a latency plot.

use crate::plot::{PlotData, PlotError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;

const DYGRAPHS_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs/dygraph/2.2.1/dygraph.min.js";
const HTML2CANVAS_CDN: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/html2canvas/1.4.1/html2canvas.min.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LegendMode {
    Always,
    Follow,
    Onmouseover,
    Never,
}

impl Default for LegendMode {
    fn default() -> Self {
        Self::Always
    }
}

impl LegendMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Follow => "follow",
            Self::Onmouseover => "onmouseover",
            Self::Never => "never",
        }
    }
}

impl std::str::FromStr for LegendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "follow" => Ok(Self::Follow),
            "onmouseover" => Ok(Self::Onmouseover),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown legend mode {other:?}")),
        }
    }
}

impl std::fmt::Display for LegendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart settings passed straight through to the page.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub y_label: String,
    pub x_label: String,
    pub legend: LegendMode,
    pub log_scale: bool,
    pub stroke_width: f64,
    pub show_roller: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            y_label: "Latency (ms)".to_string(),
            x_label: "Seconds elapsed".to_string(),
            legend: LegendMode::Always,
            log_scale: true,
            stroke_width: 1.3,
            show_roller: true,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartOptions<'a> {
    title: &'a str,
    labels: &'a [String],
    ylabel: &'a str,
    xlabel: &'a str,
    legend: LegendMode,
    show_roller: bool,
    log_scale: bool,
    stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Inline(String),
    Url(String),
}

impl Script {
    fn tag(&self) -> String {
        match self {
            Self::Inline(source) => format!("<script>{}</script>", source.replace("</script", "<\\/script")),
            Self::Url(url) => format!(r#"<script src="{}"></script>"#, escape_html(url)),
        }
    }
}

/// The charting and screenshot libraries embedded in every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assets {
    pub dygraphs: Script,
    pub html2canvas: Script,
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            dygraphs: Script::Url(DYGRAPHS_CDN.to_string()),
            html2canvas: Script::Url(HTML2CANVAS_CDN.to_string()),
        }
    }
}

impl Assets {
    /// Inline the given script files; missing paths fall back to the CDN.
    pub fn load(dygraphs: Option<&Path>, html2canvas: Option<&Path>) -> io::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            dygraphs: match dygraphs {
                Some(path) => Script::Inline(std::fs::read_to_string(path)?),
                None => defaults.dygraphs,
            },
            html2canvas: match html2canvas {
                Some(path) => Script::Inline(std::fs::read_to_string(path)?),
                None => defaults.html2canvas,
            },
        })
    }
}

/// Counts the bytes the inner writer accepted, including on failure.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub fn write_document<W: Write>(
    sink: W,
    title: &str,
    data: &PlotData,
    options: &DisplayOptions,
    assets: &Assets,
) -> Result<u64, PlotError> {
    let chart_options = ChartOptions {
        title,
        labels: &data.labels,
        ylabel: &options.y_label,
        xlabel: &options.x_label,
        legend: options.legend,
        show_roller: options.show_roller,
        log_scale: options.log_scale,
        stroke_width: options.stroke_width,
    };
    // "</" cannot appear inside an inline script; "\/" is a valid JSON escape.
    let options_json = serde_json::to_string_pretty(&chart_options)?.replace("</", "<\\/");
    let matrix = data.matrix.encode();

    let mut out = CountingWriter::new(sink);
    let result = render(&mut out, title, &options_json, &matrix, assets).and_then(|_| out.flush());
    let written = out.count();
    match result {
        Ok(()) => Ok(written),
        Err(source) => Err(PlotError::Sink { written, source }),
    }
}

fn render<W: Write>(
    out: &mut W,
    title: &str,
    options_json: &str,
    matrix: &str,
    assets: &Assets,
) -> io::Result<()> {
    write!(
        out,
        r##"<!doctype html>
<html>
<head>
  <title>{title}</title>
  <meta charset="utf-8">
</head>
<body>
  <div id="latencies" style="font-family: Courier; width: 100%; height: 600px"></div>
  <button id="download">Download as PNG</button>
  {html2canvas}
  {dygraphs}
  <script>
  document.getElementById("download").addEventListener("click", function(e) {{
    html2canvas(document.body, {{background: "#fff"}}).then(function(canvas) {{
      var url = canvas.toDataURL("image/png").replace(/^data:image\/[^;]/, "data:application/octet-stream");
      var a = document.createElement("a");
      a.setAttribute("download", "latency-plot.png");
      a.setAttribute("href", url);
      a.click();
    }});
  }});

  var container = document.getElementById("latencies");
  var opts = {options_json};
  var data = {matrix};
  var plot = new Dygraph(container, data, opts);
  </script>
</body>
</html>
"##,
        title = escape_html(title),
        html2canvas = assets.html2canvas.tag(),
        dygraphs = assets.dygraphs.tag(),
    )
}

fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{AlignedMatrix, Point};

    fn sample_data() -> PlotData {
        PlotData {
            matrix: AlignedMatrix::align(&[vec![Point { x: 0.0, y: 50.0 }, Point { x: 1.0, y: 75.0 }]]),
            labels: vec!["Seconds".to_string(), "A: OK".to_string()],
        }
    }

    struct FailAfter {
        remaining: usize,
    }

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn document_embeds_data_options_and_escaped_title() {
        let mut out = Vec::new();
        let written = write_document(
            &mut out,
            "p50 < p99 & friends",
            &sample_data(),
            &DisplayOptions::default(),
            &Assets::default(),
        )
        .unwrap();

        let html = String::from_utf8(out).unwrap();
        assert_eq!(written, html.len() as u64);
        assert!(html.contains("<title>p50 &lt; p99 &amp; friends</title>"));
        assert!(html.contains("var data = [\n  [0,50],\n  [1,75]\n];"));
        assert!(html.contains(r#""labels": ["#));
        assert!(html.contains(r#""legend": "always""#));
        assert!(html.contains(r#""logScale": true"#));
        assert!(html.contains(r#""strokeWidth": 1.3"#));
        assert!(html.contains(r#""ylabel": "Latency (ms)""#));
        assert!(html.contains(DYGRAPHS_CDN));
    }

    #[test]
    fn options_cannot_close_the_script_block() {
        let mut data = sample_data();
        data.labels[1] = "</script><b>: OK".to_string();
        let mut out = Vec::new();
        write_document(&mut out, "t", &data, &DisplayOptions::default(), &Assets::default()).unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains(r#"<\/script><b>: OK"#));
    }

    #[test]
    fn inline_assets_are_embedded() {
        let assets = Assets {
            dygraphs: Script::Inline("window.Dygraph = function() {};".to_string()),
            html2canvas: Script::Inline("var s = '</script>';".to_string()),
        };
        let mut out = Vec::new();
        write_document(&mut out, "t", &sample_data(), &DisplayOptions::default(), &assets).unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.contains("<script>window.Dygraph = function() {};</script>"));
        assert!(html.contains(r#"<script>var s = '<\/script>';</script>"#));
    }

    #[test]
    fn sink_failure_reports_bytes_written() {
        let err = write_document(
            FailAfter { remaining: 100 },
            "t",
            &sample_data(),
            &DisplayOptions::default(),
            &Assets::default(),
        )
        .unwrap_err();
        match err {
            PlotError::Sink { written, source } => {
                assert_eq!(written, 100);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn legend_mode_parses_case_insensitively() {
        assert_eq!("Follow".parse::<LegendMode>().unwrap(), LegendMode::Follow);
        assert!("sometimes".parse::<LegendMode>().is_err());
        assert_eq!(LegendMode::default().to_string(), "always");
    }
}

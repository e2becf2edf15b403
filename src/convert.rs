//! Notebook to HTML conversion.

use anyhow::{anyhow, Result};
use log::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::PublishError;

/// Renders one notebook into an HTML body fragment.
pub trait Converter {
    fn render(&self, notebook: &Path) -> Result<String>;
}

fn conversion_failure(path: &Path, reason: impl ToString) -> anyhow::Error {
    PublishError::ConversionFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
    .into()
}

/// Multi-line notebook fields are either a string or a list of lines.
#[derive(Debug, Deserialize, Default)]
#[serde(untagged)]
enum MultiLine {
    Text(String),
    Lines(Vec<String>),
    #[default]
    Missing,
}

impl MultiLine {
    fn text(&self) -> String {
        match self {
            MultiLine::Text(s) => s.clone(),
            MultiLine::Lines(lines) => lines.concat(),
            MultiLine::Missing => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum Cell {
    Markdown {
        #[serde(default)]
        source: MultiLine,
    },
    Code {
        #[serde(default)]
        source: MultiLine,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        #[serde(default)]
        source: MultiLine,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum Output {
    Stream {
        #[serde(default)]
        text: MultiLine,
    },
    DisplayData {
        #[serde(default)]
        data: OutputData,
    },
    ExecuteResult {
        #[serde(default)]
        data: OutputData,
    },
    Error {
        #[serde(default)]
        traceback: Vec<String>,
    },
}

#[derive(Debug, Deserialize, Default)]
struct OutputData {
    #[serde(rename = "text/html", default)]
    html: Option<MultiLine>,
    #[serde(rename = "image/png", default)]
    png: Option<MultiLine>,
    #[serde(rename = "text/plain", default)]
    plain: Option<MultiLine>,
}

/// Renders notebooks in-process, using the same cell markup as nbconvert's
/// lab template so that downstream cleanup works on either converter.
#[derive(Default)]
pub struct NativeConverter;

impl NativeConverter {
    pub fn render_str(&self, json: &str) -> Result<String> {
        let notebook: Notebook = serde_json::from_str(json)?;
        let mut html = String::with_capacity(json.len());
        for cell in &notebook.cells {
            match cell {
                Cell::Markdown { source } => {
                    html.push_str(r#"<div class="jp-Cell jp-MarkdownCell"><div class="jp-RenderedMarkdown">"#);
                    html.push_str(&render_markdown(&source.text()));
                    html.push_str("</div></div>\n");
                }
                Cell::Code { source, outputs } => {
                    html.push_str(r#"<div class="jp-Cell jp-CodeCell"><div class="jp-InputArea"><pre>"#);
                    html.push_str(&html_escape::encode_text(&source.text()));
                    html.push_str("</pre></div>");
                    if !outputs.is_empty() {
                        html.push_str(r#"<div class="jp-OutputArea">"#);
                        for output in outputs {
                            html.push_str(&render_output(output));
                        }
                        html.push_str("</div>");
                    }
                    html.push_str("</div>\n");
                }
                Cell::Raw { source } => {
                    html.push_str(&source.text());
                    html.push('\n');
                }
            }
        }
        Ok(html)
    }
}

impl Converter for NativeConverter {
    fn render(&self, notebook: &Path) -> Result<String> {
        let json = std::fs::read_to_string(notebook).map_err(|e| conversion_failure(notebook, e))?;
        self.render_str(&json)
            .map_err(|e| conversion_failure(notebook, format!("{:#}", e)))
    }
}

fn render_markdown(markdown: &str) -> String {
    let mut opts = pulldown_cmark::Options::empty();
    opts.insert(pulldown_cmark::Options::ENABLE_TABLES);
    opts.insert(pulldown_cmark::Options::ENABLE_FOOTNOTES);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    let p = pulldown_cmark::Parser::new_ext(markdown, opts);
    pulldown_cmark::html::push_html(&mut html, p);
    html
}

fn render_output(output: &Output) -> String {
    let pre = |text: &str| {
        format!(
            r#"<div class="jp-OutputArea-output"><pre>{}</pre></div>"#,
            html_escape::encode_text(text)
        )
    };
    match output {
        Output::Stream { text } => pre(&text.text()),
        Output::Error { traceback } => pre(&traceback.join("\n")),
        Output::DisplayData { data } | Output::ExecuteResult { data } => {
            if let Some(html) = &data.html {
                format!(r#"<div class="jp-OutputArea-output jp-RenderedHTML">{}</div>"#, html.text())
            } else if let Some(png) = &data.png {
                let png: String = png.text().split_whitespace().collect();
                format!(
                    r#"<div class="jp-OutputArea-output"><img src="data:image/png;base64,{}"></div>"#,
                    png
                )
            } else if let Some(plain) = &data.plain {
                pre(&plain.text())
            } else {
                String::new()
            }
        }
    }
}

/// Delegates to an external tool, e.g. `jupyter nbconvert --to html --stdout`.
/// The notebook path is appended to `argv`.
pub struct CommandConverter {
    argv: Vec<String>,
}

impl CommandConverter {
    pub fn new(argv: Vec<String>) -> Result<CommandConverter> {
        if argv.is_empty() {
            return Err(anyhow!("converter command is empty"));
        }
        Ok(CommandConverter { argv })
    }
}

impl Converter for CommandConverter {
    fn render(&self, notebook: &Path) -> Result<String> {
        debug!("{} {}", self.argv.join(" "), notebook.display());
        let output = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .arg(notebook)
            .output()
            .map_err(|e| conversion_failure(notebook, format!("{}: {}", self.argv[0], e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(conversion_failure(
                notebook,
                format!("{} exited with {}: {}", self.argv[0], output.status, stderr.trim()),
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| conversion_failure(notebook, e))
    }
}

/// Source notebooks directly inside `dir`, sorted by filename.
/// A missing directory has no notebooks.
pub fn collect_notebooks(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!("{} is not a directory, nothing to publish", dir.display());
        return Ok(Vec::new());
    }
    // The directory itself may contain glob metacharacters such as `[`.
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.display().to_string()),
        crate::filename::SOURCE_EXTENSION
    );
    let mut notebooks = glob::glob(&pattern)?
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect::<Vec<_>>();
    notebooks.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(notebooks)
}

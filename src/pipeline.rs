use anyhow::{anyhow, Result};
use log::*;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{Config, ConverterKind, SitePaths};
use crate::convert::{self, CommandConverter, Converter, NativeConverter};
use crate::error::{self, PublishError};
use crate::filename::{self, FilenameMetadata};
use crate::html;
use crate::index::{IndexStore, Upsert};
use crate::page::{Page, PageRenderer};
use crate::record::IndexRecord;

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Outcome {
    Inserted,
    Updated,
    Skipped(String),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Inserted => write!(f, "published (new)"),
            Outcome::Updated => write!(f, "published (updated)"),
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            Outcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DocumentReport {
    pub source_name: String,
    pub outcome: Outcome,
    /// Hidden inputs stripped from the page.
    pub hidden: usize,
}

#[derive(PartialEq, Eq, Debug, Default)]
pub struct Report {
    pub documents: Vec<DocumentReport>,
}

impl Report {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.documents.iter().filter(|d| pred(&d.outcome)).count()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| *o == Outcome::Inserted)
    }

    pub fn updated(&self) -> usize {
        self.count(|o| *o == Outcome::Updated)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for doc in &self.documents {
            write!(f, "{:40} {}", doc.source_name, doc.outcome)?;
            if doc.hidden > 0 {
                write!(f, "\t#hide: {}", doc.hidden)?;
            }
            writeln!(f)?;
        }
        let (inserted, updated) = (self.inserted(), self.updated());
        write!(
            f,
            "{} published ({} new, {} updated), {} skipped, {} failed",
            inserted + updated,
            inserted,
            updated,
            self.skipped(),
            self.failed()
        )
    }
}

/// A notebook converted and written out as a page.
struct Exported {
    source_name: String,
    metadata: Option<FilenameMetadata>,
    keywords: String,
    hidden: usize,
}

/// Converts notebooks into pages and keeps the catalog in step with them.
///
/// Only one pipeline may write to a given index at a time.
pub struct PublishPipeline {
    config: Config,
    paths: SitePaths,
    converter: Box<dyn Converter>,
    renderer: PageRenderer,
}

impl PublishPipeline {
    pub fn new(root: &Path, config: Config, converter: Box<dyn Converter>) -> Result<PublishPipeline> {
        let paths = SitePaths::new(root, &config);
        let renderer = PageRenderer::new(paths.template_dir.as_deref())?;
        Ok(PublishPipeline {
            config,
            paths,
            converter,
            renderer,
        })
    }

    /// Picks the converter named in `config`.
    pub fn from_config(root: &Path, config: Config) -> Result<PublishPipeline> {
        let converter: Box<dyn Converter> = match config.converter {
            ConverterKind::Native => Box::new(NativeConverter),
            ConverterKind::Command => Box::new(CommandConverter::new(config.command.clone())?),
        };
        PublishPipeline::new(root, config, converter)
    }

    pub fn store(&self) -> IndexStore {
        IndexStore::new(self.paths.index_file.clone(), self.config.sort)
    }

    /// Publishes one notebook and upserts its row, keeping every other row.
    pub fn publish_one(&self, notebook: &Path) -> Result<Report> {
        let exported = self.export(notebook)?;
        let record = match record_for(&exported) {
            Some(record) => record,
            None => {
                warn!("{:32} => no metadata in filename, not indexed", exported.source_name);
                return Ok(Report {
                    documents: vec![skipped(&exported)],
                });
            }
        };

        let mut store = self.store();
        store.load()?;
        let outcome = match store.upsert(record) {
            Upsert::Inserted => Outcome::Inserted,
            Upsert::Updated => Outcome::Updated,
        };
        store.sort();
        store.persist()?;
        info!("{} now lists {} tutorials", store.path().display(), store.len());
        Ok(Report {
            documents: vec![DocumentReport {
                source_name: exported.source_name,
                outcome,
                hidden: exported.hidden,
            }],
        })
    }

    /// Publishes every notebook of the notebooks directory and regenerates
    /// the catalog from scratch. A failing notebook is reported and left out;
    /// it does not stop the others.
    pub fn publish_all(&self) -> Result<Report> {
        let notebooks = convert::collect_notebooks(&self.paths.notebooks_dir)?;
        info!(
            "Found {} notebooks in {}",
            notebooks.len(),
            self.paths.notebooks_dir.display()
        );
        let mut store = self.store();
        let previous: BTreeSet<String> = store.existing_keys();

        let mut report = Report::default();
        let mut records = Vec::new();
        for notebook in &notebooks {
            let exported = match self.export(notebook) {
                Ok(exported) => exported,
                Err(e) if error::is_fatal(&e) => return Err(e),
                Err(e) => {
                    error!("{:32} => {:#}", notebook.display(), e);
                    report.documents.push(DocumentReport {
                        source_name: display_name(notebook),
                        outcome: Outcome::Failed(format!("{:#}", e)),
                        hidden: 0,
                    });
                    continue;
                }
            };
            match record_for(&exported) {
                Some(record) => {
                    let outcome = if previous.contains(&record.source_name) {
                        Outcome::Updated
                    } else {
                        Outcome::Inserted
                    };
                    report.documents.push(DocumentReport {
                        source_name: exported.source_name.clone(),
                        outcome,
                        hidden: exported.hidden,
                    });
                    records.push(record);
                }
                None => {
                    warn!("{:32} => no metadata in filename, not indexed", exported.source_name);
                    report.documents.push(skipped(&exported));
                }
            }
        }

        store.rebuild_from(records)?;
        info!("{} now lists {} tutorials", store.path().display(), store.len());
        Ok(report)
    }

    fn export(&self, notebook: &Path) -> Result<Exported> {
        let source_name = notebook
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("{} has no usable file name", notebook.display()))?
            .to_string();

        let body = self.converter.render(notebook)?;
        let (body, hidden) = html::strip_hidden_cells(&body);
        let keywords = html::extract_keywords(&body);
        let body = html::build_header_links(&body);
        let headings = html::collect_headings(&body, self.config.toc_level);
        let metadata = filename::parse(&source_name);

        let stem = Path::new(&source_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&source_name);
        let title = metadata.as_ref().map(|m| m.topic.as_str()).unwrap_or(stem);
        let html = self.renderer.render(&Page {
            title,
            site_name: &self.config.site_name,
            repo_url: self.config.repo_url.as_deref(),
            keywords: &keywords,
            headings: &headings,
            body: &body,
        })?;

        let out_file = self.output_path(&source_name);
        debug!("{:32} => {}", source_name, out_file.display());
        std::fs::create_dir_all(&self.paths.html_dir)?;
        std::fs::write(&out_file, &html)
            .map_err(|e| anyhow!("writing {}: {}", out_file.display(), e))?;

        Ok(Exported {
            source_name,
            metadata,
            keywords,
            hidden,
        })
    }

    fn output_path(&self, source_name: &str) -> PathBuf {
        self.paths.html_dir.join(filename::output_name(source_name))
    }
}

fn record_for(exported: &Exported) -> Option<IndexRecord> {
    let metadata = exported.metadata.clone()?;
    Some(IndexRecord::new(
        &exported.source_name,
        metadata,
        exported.keywords.clone(),
    ))
}

fn skipped(exported: &Exported) -> DocumentReport {
    DocumentReport {
        source_name: exported.source_name.clone(),
        outcome: Outcome::Skipped(
            PublishError::UnparseableFilename(exported.source_name.clone()).to_string(),
        ),
        hidden: exported.hidden,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

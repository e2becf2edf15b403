use clap::{Parser, Subcommand};
use log::*;
use std::path::{Path, PathBuf};

use nbsite::index::Migration;
use nbsite::widget::{self, NavLinks};
use nbsite::{Config, PublishPipeline, Result};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert notebooks to pages and update the tutorial index
    Publish {
        #[arg(long = "root", default_value = ".")]
        root: PathBuf,
        #[arg(long = "config")]
        config: Option<PathBuf>,
        /// Publish a single notebook, keeping the rest of the index
        #[arg(short = 'i', long = "input", required_unless_present = "all")]
        input: Option<PathBuf>,
        /// Publish every notebook and rebuild the index from scratch
        #[arg(long = "all", conflicts_with = "input")]
        all: bool,
    },
    /// Rewrite a legacy index in the current column layout
    Migrate {
        #[arg(long = "root", default_value = ".")]
        root: PathBuf,
        #[arg(long = "config")]
        config: Option<PathBuf>,
    },
    /// Print widget markup for use inside a notebook
    #[command(subcommand)]
    Widget(Widget),
}

#[derive(Subcommand, Debug)]
enum Widget {
    /// Title card with a last-modified calendar
    Header {
        title: String,
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },
    /// Command palette table of contents
    Toc {
        sections: Vec<String>,
        #[arg(long = "title", default_value = "Quick Navigation")]
        title: String,
    },
    /// Callout box
    #[command(name = "box")]
    Callout {
        content: String,
        #[arg(long = "kind", default_value = "note")]
        kind: String,
        #[arg(long = "title")]
        title: Option<String>,
    },
    /// Previous/next navigation box
    Nav {
        #[arg(long = "prev")]
        prev: Option<String>,
        #[arg(long = "next")]
        next: Option<String>,
        #[arg(long = "prev-text", default_value = "Previous Section")]
        prev_text: String,
        #[arg(long = "next-text", default_value = "Next Section")]
        next_text: String,
        #[arg(long = "title", default_value = "Navigation")]
        title: String,
    },
    Hero {
        topic: String,
        #[arg(long = "git-link", default_value = "https://github.com/meluron-codecafe")]
        git_link: String,
        #[arg(long = "git-name", default_value = "meluron-codecafe")]
        git_name: String,
    },
    H1 {
        topic: String,
    },
    H2 {
        topic: String,
    },
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    builder.init();
}

fn pipeline(root: &Path, config: Option<&Path>) -> Result<PublishPipeline> {
    let config = Config::load(root, config)?;
    PublishPipeline::from_config(root, config)
}

fn main() -> Result<()> {
    let opt = Cli::parse();
    init_logger();
    match opt.cmd {
        Command::Publish {
            root,
            config,
            input,
            all,
        } => {
            let pipeline = pipeline(&root, config.as_deref())?;
            let report = match input {
                Some(input) if !all => pipeline.publish_one(&input)?,
                _ => pipeline.publish_all()?,
            };
            println!("{}", report);
            Ok(())
        }
        Command::Migrate { root, config } => {
            let mut store = pipeline(&root, config.as_deref())?.store();
            match store.migrate()? {
                Migration::AlreadyCanonical => {
                    info!("{} already uses the current layout", store.path().display())
                }
                Migration::Migrated { rows } => {
                    info!("Migrated {} rows in {}", rows, store.path().display())
                }
                Migration::Created => info!("Created empty {}", store.path().display()),
            }
            Ok(())
        }
        Command::Widget(which) => {
            println!("{}", render_widget(which)?);
            Ok(())
        }
    }
}

fn render_widget(which: Widget) -> Result<String> {
    Ok(match which {
        Widget::Header { title, keywords } => {
            let keywords = keywords.iter().map(String::as_str).collect::<Vec<_>>();
            widget::header_calendar(&title, &keywords, chrono::Local::now().naive_local())
        }
        Widget::Toc { sections, title } => {
            let sections = sections.iter().map(String::as_str).collect::<Vec<_>>();
            widget::toc_palette(&sections, &title)
        }
        Widget::Callout {
            content,
            kind,
            title,
        } => widget::tutbox_named(&content, &kind, title.as_deref())?,
        Widget::Nav {
            prev,
            next,
            prev_text,
            next_text,
            title,
        } => widget::nav(&NavLinks {
            prev_link: prev.as_deref(),
            next_link: next.as_deref(),
            prev_content: &prev_text,
            next_content: &next_text,
            title: &title,
        }),
        Widget::Hero {
            topic,
            git_link,
            git_name,
        } => widget::hero(&topic, &git_link, &git_name),
        Widget::H1 { topic } => widget::h1(&topic),
        Widget::H2 { topic } => widget::h2(&topic),
    })
}

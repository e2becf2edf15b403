//! Publishes notebook tutorials as static pages and keeps a CSV catalog of
//! them, keyed by metadata encoded in each notebook's filename.

pub mod config;
pub mod convert;
pub mod error;
pub mod filename;
pub mod html;
pub mod index;
pub mod page;
pub mod pipeline;
pub mod record;
pub mod widget;

pub use anyhow::Result;
pub use config::Config;
pub use error::PublishError;
pub use index::{IndexStore, SortKey};
pub use pipeline::{Outcome, PublishPipeline, Report};
pub use record::IndexRecord;

//! Decodes tutorial metadata from notebook filenames.
//!
//! Two shapes are recognised, strict first:
//!
//! - `CATEGORY-TOPIC-SUBTOPICS-NUMBER.ipynb`, where `SUBTOPICS` is a possibly
//!   empty `;`-separated list and `NUMBER` is digits only.
//! - `CATEGORY-TOPIC.ipynb`.
//!
//! Categories are always uppercased. Underscores in topics and subtopics
//! become single spaces.

use lazy_static::*;
use regex::Regex;

pub const SOURCE_EXTENSION: &str = "ipynb";
pub const OUTPUT_EXTENSION: &str = "html";

#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct FilenameMetadata {
    pub category: String,
    pub topic: String,
    pub subtopics: Vec<String>,
    pub number: Option<u32>,
}

/// Returns `None` when `filename` follows neither convention. That is an
/// expected outcome for files outside the catalog, not an error.
pub fn parse(filename: &str) -> Option<FilenameMetadata> {
    lazy_static! {
        static ref STRICT: Regex =
            Regex::new(r"^(?P<category>[^-]+)-(?P<topic>[^-]+)-(?P<subtopics>[^-]*)-(?P<number>\d+)\.ipynb$")
                .unwrap();
        static ref SIMPLE: Regex =
            Regex::new(r"^(?P<category>[^-]+)-(?P<topic>[^-]+)\.ipynb$").unwrap();
    }

    if let Some(caps) = STRICT.captures(filename) {
        let number = caps["number"].parse::<u32>().ok()?;
        return build(
            &caps["category"],
            &caps["topic"],
            split_subtopics(&caps["subtopics"]),
            Some(number),
        );
    }
    let caps = SIMPLE.captures(filename)?;
    build(&caps["category"], &caps["topic"], Vec::new(), None)
}

fn build(
    category: &str,
    topic: &str,
    subtopics: Vec<String>,
    number: Option<u32>,
) -> Option<FilenameMetadata> {
    let category = category.trim().to_uppercase();
    let topic = humanize(topic);
    if category.is_empty() || topic.is_empty() {
        return None;
    }
    Some(FilenameMetadata {
        category,
        topic,
        subtopics,
        number,
    })
}

/// `"linked__list_"` -> `"linked list"`
fn humanize(s: &str) -> String {
    s.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"poles;;zero_padding"` -> `["poles", "zero padding"]`. Used for both file
/// names and the `subtopics` column of the index.
pub fn split_subtopics(s: &str) -> Vec<String> {
    s.split(';')
        .map(humanize)
        .filter(|sub| !sub.is_empty())
        .collect()
}

/// Two digits at least, so that `"07"` sorts before `"10"` as text.
pub fn format_number(number: u32) -> String {
    format!("{:02}", number)
}

/// `dsp-z_transform--01.ipynb` -> `dsp-z_transform--01.html`
pub fn output_name(source_name: &str) -> String {
    let stem = source_name
        .strip_suffix(&format!(".{}", SOURCE_EXTENSION))
        .unwrap_or(source_name);
    format!("{}.{}", stem, OUTPUT_EXTENSION)
}

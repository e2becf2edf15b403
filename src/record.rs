use crate::filename::{self, FilenameMetadata};
use anyhow::{anyhow, Result};
use csv::StringRecord;

/// Columns of the canonical index, in file order.
pub const COLUMNS: [&str; 7] = [
    "category",
    "topic",
    "subtopics",
    "number",
    "keywords",
    "source_name",
    "output_name",
];

pub const SCHEMA_VERSION: u32 = 2;

/// One row of the published-tutorial catalog.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct IndexRecord {
    pub category: String,
    pub topic: String,
    pub subtopics: Vec<String>,
    pub keywords: String,
    pub number: Option<u32>,
    /// Unique key of the catalog.
    pub source_name: String,
    pub output_name: String,
}

impl IndexRecord {
    pub fn new(source_name: &str, metadata: FilenameMetadata, keywords: String) -> IndexRecord {
        IndexRecord {
            category: metadata.category,
            topic: metadata.topic,
            subtopics: metadata.subtopics,
            keywords,
            number: metadata.number,
            source_name: source_name.to_string(),
            output_name: filename::output_name(source_name),
        }
    }

    pub fn header() -> StringRecord {
        StringRecord::from(COLUMNS.to_vec())
    }

    pub fn to_row(&self) -> StringRecord {
        StringRecord::from(vec![
            self.category.clone(),
            self.topic.clone(),
            self.subtopics.join(";"),
            self.number.map(filename::format_number).unwrap_or_default(),
            self.keywords.clone(),
            self.source_name.clone(),
            self.output_name.clone(),
        ])
    }

    /// Reads a row laid out in [`COLUMNS`] order.
    pub fn from_row(row: &StringRecord) -> Result<IndexRecord> {
        if row.len() != COLUMNS.len() {
            return Err(anyhow!(
                "expected {} fields, found {}: {:?}",
                COLUMNS.len(),
                row.len(),
                row
            ));
        }
        let record = IndexRecord {
            category: row[0].to_string(),
            topic: row[1].to_string(),
            subtopics: filename::split_subtopics(&row[2]),
            number: parse_number(&row[3])?,
            keywords: row[4].to_string(),
            source_name: row[5].to_string(),
            output_name: row[6].to_string(),
        };
        if record.category.is_empty() || record.topic.is_empty() {
            return Err(anyhow!("row without category or topic: {:?}", row));
        }
        if record.source_name.is_empty() {
            return Err(anyhow!("row without source_name: {:?}", row));
        }
        Ok(record)
    }
}

pub(crate) fn parse_number(s: &str) -> Result<Option<u32>> {
    let s = s.trim();
    if s.is_empty() {
        Ok(None)
    } else {
        s.parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid number '{}': {}", s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dsp() -> IndexRecord {
        IndexRecord {
            category: "DSP".to_string(),
            topic: "z transform".to_string(),
            subtopics: vec!["poles".to_string(), "zeros".to_string()],
            keywords: "transforms, filters".to_string(),
            number: Some(1),
            source_name: "dsp-z_transform-poles;zeros-01.ipynb".to_string(),
            output_name: "dsp-z_transform-poles;zeros-01.html".to_string(),
        }
    }

    #[test]
    fn new_from_metadata_test() {
        let meta = filename::parse("dsp-z_transform-poles;zeros-01.ipynb").unwrap();
        let record = IndexRecord::new(
            "dsp-z_transform-poles;zeros-01.ipynb",
            meta,
            "transforms, filters".to_string(),
        );
        assert_eq!(record, dsp());
    }

    #[test]
    fn to_row_test() {
        let row = dsp().to_row();
        assert_eq!(&row[2], "poles;zeros");
        assert_eq!(&row[3], "01");
        assert_eq!(IndexRecord::from_row(&row).unwrap(), dsp());
    }

    #[test]
    fn from_row_rejects_bad_rows_test() {
        let short = StringRecord::from(vec!["DSP", "topic"]);
        assert!(IndexRecord::from_row(&short).is_err());

        let bad_number = StringRecord::from(vec!["DSP", "t", "", "x1", "", "a.ipynb", "a.html"]);
        assert!(IndexRecord::from_row(&bad_number).is_err());

        let no_key = StringRecord::from(vec!["DSP", "t", "", "", "", "", "a.html"]);
        assert!(IndexRecord::from_row(&no_key).is_err());

        let no_category = StringRecord::from(vec!["", "t", "", "", "", "a.ipynb", "a.html"]);
        assert!(IndexRecord::from_row(&no_category).is_err());

        let no_topic = StringRecord::from(vec!["DSP", "", "", "", "", "a.ipynb", "a.html"]);
        assert!(IndexRecord::from_row(&no_topic).is_err());
    }

    #[test]
    fn empty_number_and_subtopics_test() {
        let row = StringRecord::from(vec!["DSA", "linked list", "", "", "", "dsa-linked_list.ipynb", "dsa-linked_list.html"]);
        let record = IndexRecord::from_row(&row).unwrap();
        assert_eq!(record.number, None);
        assert!(record.subtopics.is_empty());
    }
}

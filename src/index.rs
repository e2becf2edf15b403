//! The persisted tutorial catalog.
//!
//! A single-writer store: nothing locks the index file, so two concurrent
//! `nbsite publish` runs against the same base directory can lose updates.
//! Writes themselves are atomic (temporary file + rename), so readers never
//! observe a half-written index.

use anyhow::{anyhow, Result};
use csv::StringRecord;
use log::*;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PublishError;
use crate::filename;
use crate::record::{self, IndexRecord, COLUMNS};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Category, then sequence number.
    #[default]
    Numbered,
    /// Topic, case-insensitive.
    Topic,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Upsert {
    Inserted,
    Updated,
}

#[derive(PartialEq, Eq, Debug)]
pub enum Migration {
    AlreadyCanonical,
    Migrated { rows: usize },
    Created,
}

pub struct IndexStore {
    path: PathBuf,
    sort_key: SortKey,
    records: Vec<IndexRecord>,
}

impl IndexStore {
    pub fn new(path: PathBuf, sort_key: SortKey) -> IndexStore {
        IndexStore {
            path,
            sort_key,
            records: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replaces the in-memory collection with the persisted one. A missing
    /// file yields an empty collection.
    pub fn load(&mut self) -> Result<()> {
        self.records.clear();
        if !self.path.exists() {
            debug!("{} does not exist yet", self.path.display());
            return Ok(());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;
        let header = reader.headers()?.clone();
        if !is_canonical(&header) {
            return Err(PublishError::SchemaMismatch {
                path: self.path.clone(),
                expected: COLUMNS.join(","),
                found: header.iter().collect::<Vec<_>>().join(","),
            }
            .into());
        }
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let record = IndexRecord::from_row(&row)
                .map_err(|e| anyhow!("{}: row {}: {}", self.path.display(), i + 1, e))?;
            self.records.push(record);
        }
        debug!("Loaded {} records from {}", self.records.len(), self.path.display());
        Ok(())
    }

    /// Inserts `record`, or replaces every field of the record that has the
    /// same `source_name`.
    pub fn upsert(&mut self, record: IndexRecord) -> Upsert {
        match self
            .records
            .iter_mut()
            .find(|r| r.source_name == record.source_name)
        {
            Some(existing) => {
                *existing = record;
                Upsert::Updated
            }
            None => {
                self.records.push(record);
                Upsert::Inserted
            }
        }
    }

    pub fn sort(&mut self) {
        let key = self.sort_key;
        self.records.sort_by(|a, b| compare(key, a, b));
    }

    pub fn persist(&self) -> Result<()> {
        write_atomically(&self.path, &self.records).map_err(|e| {
            anyhow::Error::new(PublishError::PersistenceFailure {
                path: self.path.clone(),
                reason: format!("{:#}", e),
            })
        })
    }

    /// Discards whatever is persisted and writes exactly `records`, sorted.
    /// The old file is never read.
    pub fn rebuild_from(&mut self, records: Vec<IndexRecord>) -> Result<()> {
        self.records = dedup_by_source(records);
        self.sort();
        self.persist()
    }

    /// Keys of the persisted index, or an empty set when it cannot be read.
    pub fn existing_keys(&self) -> BTreeSet<String> {
        let mut previous = IndexStore::new(self.path.clone(), self.sort_key);
        match previous.load() {
            Ok(()) => previous.records.into_iter().map(|r| r.source_name).collect(),
            Err(e) => {
                debug!("Ignoring previous index: {:#}", e);
                BTreeSet::new()
            }
        }
    }

    /// Rewrites a legacy index in the canonical schema.
    pub fn migrate(&mut self) -> Result<Migration> {
        if !self.path.exists() {
            self.records.clear();
            self.persist()?;
            return Ok(Migration::Created);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;
        let header = reader.headers()?.clone();
        if is_canonical(&header) {
            return Ok(Migration::AlreadyCanonical);
        }
        let layout = LegacyLayout::detect(&header)?;
        info!(
            "Migrating {} from `{}` to schema v{}",
            self.path.display(),
            header.iter().collect::<Vec<_>>().join(","),
            record::SCHEMA_VERSION
        );
        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let record = layout
                .read(&row)
                .map_err(|e| anyhow!("{}: row {}: {}", self.path.display(), i + 1, e))?;
            records.push(record);
        }
        self.rebuild_from(records)?;
        Ok(Migration::Migrated {
            rows: self.records.len(),
        })
    }
}

fn is_canonical(header: &StringRecord) -> bool {
    header.len() == COLUMNS.len() && header.iter().zip(COLUMNS.iter()).all(|(a, b)| a.trim() == *b)
}

fn compare(key: SortKey, a: &IndexRecord, b: &IndexRecord) -> Ordering {
    let primary = match key {
        SortKey::Numbered => a.category.cmp(&b.category).then_with(|| {
            // Unnumbered records go last within their category.
            let a = a.number.unwrap_or(u32::MAX);
            let b = b.number.unwrap_or(u32::MAX);
            a.cmp(&b)
        }),
        SortKey::Topic => a.topic.to_lowercase().cmp(&b.topic.to_lowercase()),
    };
    primary.then_with(|| a.source_name.cmp(&b.source_name))
}

/// Keeps the last record for each `source_name`.
fn dedup_by_source(records: Vec<IndexRecord>) -> Vec<IndexRecord> {
    let mut out: Vec<IndexRecord> = Vec::with_capacity(records.len());
    for record in records {
        match out.iter_mut().find(|r| r.source_name == record.source_name) {
            Some(existing) => {
                warn!("{} listed twice, keeping the last one", record.source_name);
                *existing = record;
            }
            None => out.push(record),
        }
    }
    out
}

fn write_atomically(path: &Path, records: &[IndexRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer.write_record(&IndexRecord::header())?;
        for record in records {
            writer.write_record(&record.to_row())?;
        }
        writer.flush()?;
    }
    tmp.as_file_mut().flush()?;
    if let Some(permissions) = index_permissions(path)? {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Temporary files are private to the owner; the index is served to readers,
/// so it keeps the mode of the file it replaces, or 0644 when it is new.
fn index_permissions(path: &Path) -> Result<Option<std::fs::Permissions>> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.permissions())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<std::fs::Permissions> {
    None
}

/// Column positions of an older index layout.
#[derive(Debug)]
struct LegacyLayout {
    category: usize,
    topic: usize,
    subtopics: Option<usize>,
    number: Option<usize>,
    keywords: Option<usize>,
    source_name: Option<usize>,
    output_name: Option<usize>,
}

impl LegacyLayout {
    fn detect(header: &StringRecord) -> Result<LegacyLayout> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        let missing = |column: &str| anyhow!("legacy index has no `{}` column", column);
        let layout = LegacyLayout {
            category: find(&["category"]).ok_or_else(|| missing("category"))?,
            topic: find(&["topic"]).ok_or_else(|| missing("topic"))?,
            subtopics: find(&["subtopics"]),
            number: find(&["number"]),
            keywords: find(&["keywords", "tags"]),
            source_name: find(&["source_name", "notebook", "ipynb"]),
            output_name: find(&["output_name", "html"]),
        };
        if layout.source_name.is_none() && layout.output_name.is_none() {
            return Err(missing("source_name"));
        }
        Ok(layout)
    }

    fn read(&self, row: &StringRecord) -> Result<IndexRecord> {
        let get = |i: Option<usize>| i.and_then(|i| row.get(i)).unwrap_or("").trim();
        let category = get(Some(self.category)).to_uppercase();
        let topic = get(Some(self.topic)).to_string();
        if category.is_empty() || topic.is_empty() {
            return Err(anyhow!("row without category or topic: {:?}", row));
        }
        let (source_name, output_name) = match (get(self.source_name), get(self.output_name)) {
            ("", "") => return Err(anyhow!("row without a file name: {:?}", row)),
            (source, "") => (source.to_string(), filename::output_name(source)),
            ("", output) => {
                let stem = Path::new(output)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(output);
                (
                    format!("{}.{}", stem, filename::SOURCE_EXTENSION),
                    output.to_string(),
                )
            }
            (source, output) => (source.to_string(), output.to_string()),
        };
        Ok(IndexRecord {
            category,
            topic,
            subtopics: filename::split_subtopics(get(self.subtopics)),
            number: record::parse_number(get(self.number))?,
            keywords: get(self.keywords).to_string(),
            source_name,
            output_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, topic: &str, number: Option<u32>, source: &str) -> IndexRecord {
        IndexRecord {
            category: category.to_string(),
            topic: topic.to_string(),
            number,
            source_name: source.to_string(),
            output_name: filename::output_name(source),
            ..Default::default()
        }
    }

    fn sources(store: &IndexStore) -> Vec<&str> {
        store.records().iter().map(|r| r.source_name.as_str()).collect()
    }

    #[test]
    fn load_missing_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IndexStore::new(dir.path().join("tutorials.csv"), SortKey::Numbered);
        store.load().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn persist_then_load_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        store.upsert(IndexRecord {
            subtopics: vec!["a, b".to_string(), "c".to_string()],
            keywords: "quoted \"text\", commas".to_string(),
            ..record("DSP", "z transform", Some(1), "dsp-z_transform-a, b;c-01.ipynb")
        });
        store.persist().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("category,topic,subtopics,number,keywords,source_name,output_name\n"));

        let mut reloaded = IndexStore::new(path, SortKey::Numbered);
        reloaded.load().unwrap();
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn persist_empty_writes_header_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tutorials.csv");
        let store = IndexStore::new(path.clone(), SortKey::Numbered);
        store.persist().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "category,topic,subtopics,number,keywords,source_name,output_name\n"
        );
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn persist_keeps_mode_test() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        store.persist().unwrap();
        assert_eq!(mode(&path), 0o644);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o664)).unwrap();
        store.upsert(record("DSA", "arrays", Some(1), "dsa-arrays--01.ipynb"));
        store.persist().unwrap();
        assert_eq!(mode(&path), 0o664);
    }

    #[test]
    fn persist_failure_test() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the index file should be.
        let path = dir.path().join("tutorials.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), "previous").unwrap();

        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        store.upsert(record("DSA", "arrays", Some(1), "dsa-arrays--01.ipynb"));
        let err = store.persist().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::PersistenceFailure { .. })
        ));
        assert!(crate::error::is_fatal(&err));
        assert_eq!(std::fs::read_to_string(path.join("keep.txt")).unwrap(), "previous");
        // Only the index path itself; the temporary file is gone.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // A regular file where the index directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "previous").unwrap();
        let store = IndexStore::new(blocker.join("tutorials.csv"), SortKey::Numbered);
        let err = store.persist().unwrap_err();
        assert!(crate::error::is_fatal(&err));
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "previous");
    }

    #[test]
    fn load_schema_mismatch_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        std::fs::write(&path, "category,topic,keywords,html\nDSP,Z Transform,,dsp.html\n").unwrap();
        let mut store = IndexStore::new(path, SortKey::Numbered);
        let err = store.load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn upsert_test() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IndexStore::new(dir.path().join("tutorials.csv"), SortKey::Numbered);
        let first = record("DSP", "z transform", Some(1), "dsp-z_transform--01.ipynb");
        assert_eq!(store.upsert(first.clone()), Upsert::Inserted);
        assert_eq!(store.upsert(first.clone()), Upsert::Updated);
        assert_eq!(store.len(), 1);

        let changed = IndexRecord {
            keywords: "poles, zeros".to_string(),
            ..first
        };
        assert_eq!(store.upsert(changed.clone()), Upsert::Updated);
        assert_eq!(store.records(), &[changed]);
    }

    #[test]
    fn sort_numbered_test() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IndexStore::new(dir.path().join("tutorials.csv"), SortKey::Numbered);
        store.upsert(record("DSP", "z transform", Some(1), "dsp-z_transform--01.ipynb"));
        store.upsert(record("DSA", "trees", None, "dsa-trees.ipynb"));
        store.upsert(record("DSA", "linked list", Some(10), "dsa-linked_list--10.ipynb"));
        store.upsert(record("DSA", "arrays", Some(2), "dsa-arrays--2.ipynb"));
        store.upsert(record("DSA", "stacks", Some(2), "dsa-aaa--02.ipynb"));
        store.sort();
        assert_eq!(
            sources(&store),
            vec![
                "dsa-aaa--02.ipynb",
                "dsa-arrays--2.ipynb",
                "dsa-linked_list--10.ipynb",
                "dsa-trees.ipynb",
                "dsp-z_transform--01.ipynb",
            ]
        );

        let before = store.records().to_vec();
        store.sort();
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn sort_topic_test() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IndexStore::new(dir.path().join("tutorials.csv"), SortKey::Topic);
        store.upsert(record("DSP", "z transform", Some(1), "dsp-z.ipynb"));
        store.upsert(record("ML", "Attention", None, "ml-attention.ipynb"));
        store.upsert(record("DSA", "arrays", Some(9), "dsa-arrays.ipynb"));
        store.upsert(record("AI", "attention", None, "ai-attention.ipynb"));
        store.sort();
        assert_eq!(
            sources(&store),
            vec!["ai-attention.ipynb", "ml-attention.ipynb", "dsa-arrays.ipynb", "dsp-z.ipynb"]
        );
    }

    #[test]
    fn rebuild_from_drops_stale_rows_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        store.upsert(record("DSP", "z transform", Some(1), "dsp-z_transform--01.ipynb"));
        store.upsert(record("DSA", "linked list", Some(1), "dsa-linked_list--01.ipynb"));
        store.persist().unwrap();

        store
            .rebuild_from(vec![record("DSA", "linked list", Some(1), "dsa-linked_list--01.ipynb")])
            .unwrap();

        let mut reloaded = IndexStore::new(path, SortKey::Numbered);
        reloaded.load().unwrap();
        assert_eq!(sources(&reloaded), vec!["dsa-linked_list--01.ipynb"]);
    }

    #[test]
    fn rebuild_ignores_incompatible_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        std::fs::write(&path, "something,else\n1,2\n").unwrap();
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        assert!(store.existing_keys().is_empty());
        store
            .rebuild_from(vec![record("DSA", "arrays", Some(1), "dsa-arrays--01.ipynb")])
            .unwrap();
        store.load().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn migrate_legacy_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        std::fs::write(
            &path,
            "category,topic,tags,html\n\
             dsp,Z Transform,\"poles, zeros\",dsp-z_transform--01.html\n\
             DSA,Linked List,,dsa-linked_list.html\n",
        )
        .unwrap();
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        assert_eq!(store.migrate().unwrap(), Migration::Migrated { rows: 2 });

        let mut reloaded = IndexStore::new(path, SortKey::Numbered);
        reloaded.load().unwrap();
        let records = reloaded.records();
        assert_eq!(records[0].category, "DSA");
        assert_eq!(records[0].source_name, "dsa-linked_list.ipynb");
        assert_eq!(records[1].category, "DSP");
        assert_eq!(records[1].keywords, "poles, zeros");
        assert_eq!(records[1].output_name, "dsp-z_transform--01.html");

        assert_eq!(reloaded.migrate().unwrap(), Migration::AlreadyCanonical);
    }

    #[test]
    fn migrate_with_number_column_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        std::fs::write(
            &path,
            "category,topic,number,keywords,notebook\nML,Nets,3,,ml-nets--3.ipynb\n",
        )
        .unwrap();
        let mut store = IndexStore::new(path, SortKey::Numbered);
        store.migrate().unwrap();
        assert_eq!(store.records()[0].number, Some(3));
        assert_eq!(store.records()[0].output_name, "ml-nets--3.html");
    }

    #[test]
    fn migrate_unknown_layout_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        std::fs::write(&path, "category,topic\nDSP,Z\n").unwrap();
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        assert!(store.migrate().is_err());
        // Left as it was.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "category,topic\nDSP,Z\n");
    }

    #[test]
    fn migrate_missing_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutorials.csv");
        let mut store = IndexStore::new(path.clone(), SortKey::Numbered);
        assert_eq!(store.migrate().unwrap(), Migration::Created);
        assert!(path.exists());
    }
}

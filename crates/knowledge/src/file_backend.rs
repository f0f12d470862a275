//! File-based knowledge base — one folder of markdown documents per collection.
//!
//! Layout: `<base>/<collection>/**/*.md`. The file stem is the document title
//! and the file contents are its body. Documents are read on every search so
//! that files added while the process runs are picked up.
//!
//! Storage location: `~/.conclave/knowledge/`

use async_trait::async_trait;
use conclave_core::error::KnowledgeError;
use conclave_core::knowledge::{KnowledgeLookup, KnowledgeQuery, KnowledgeSnippet};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::scoring::{self, Document};

/// Markdown knowledge base rooted at a directory.
pub struct FileKnowledgeBase {
    base_path: PathBuf,
    collections: BTreeSet<String>,
    shared_collection: String,
}

impl FileKnowledgeBase {
    /// Create a knowledge base serving the given collections plus the shared one.
    ///
    /// Collection folders are created if missing.
    pub fn new<I, S>(
        base_path: impl Into<PathBuf>,
        collections: I,
        shared_collection: impl Into<String>,
    ) -> Result<Self, KnowledgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base_path = base_path.into();
        let shared_collection = shared_collection.into();
        let mut collections: BTreeSet<String> = collections.into_iter().map(Into::into).collect();
        collections.insert(shared_collection.clone());

        for collection in &collections {
            let dir = base_path.join(collection);
            std::fs::create_dir_all(&dir).map_err(|e| {
                KnowledgeError::Storage(format!(
                    "Failed to create knowledge directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        debug!(
            path = %base_path.display(),
            collections = collections.len(),
            "File knowledge base ready"
        );

        Ok(Self {
            base_path,
            collections,
            shared_collection,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Known collection names, sorted.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(String::as_str)
    }

    /// Write a document into a collection, returning the created file's path.
    pub fn add_document(
        &self,
        collection: &str,
        title: &str,
        body: &str,
    ) -> Result<PathBuf, KnowledgeError> {
        if !self.collections.contains(collection) {
            return Err(KnowledgeError::UnknownCollection(collection.to_string()));
        }

        let stem = scoring::sanitize_title(title);
        if stem.is_empty() {
            return Err(KnowledgeError::Storage(format!(
                "Title '{title}' has no usable characters"
            )));
        }

        let path = self.base_path.join(collection).join(format!("{stem}.md"));
        std::fs::write(&path, body).map_err(|e| {
            KnowledgeError::Storage(format!("Failed to write {}: {e}", path.display()))
        })?;

        debug!(collection, path = %path.display(), "Knowledge document added");
        Ok(path)
    }

    /// All documents in one collection.
    pub fn documents(&self, collection: &str) -> Result<Vec<Document>, KnowledgeError> {
        let dir = self.base_path.join(collection);
        let mut docs = Vec::new();
        if dir.is_dir() {
            collect_markdown(&dir, &mut docs)?;
        }
        Ok(docs)
    }
}

/// Recursively load every `*.md` file below `dir`.
fn collect_markdown(dir: &Path, docs: &mut Vec<Document>) -> Result<(), KnowledgeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        KnowledgeError::QueryFailed(format!("Failed to read {}: {e}", dir.display()))
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        // file_type does not follow symlinks, so linked directories are skipped
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_markdown(&path, docs)?;
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Some(title) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match std::fs::read_to_string(&path) {
            Ok(body) => docs.push(Document::new(title, body)),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable knowledge document"),
        }
    }
    Ok(())
}

#[async_trait]
impl KnowledgeLookup for FileKnowledgeBase {
    fn name(&self) -> &str {
        "file"
    }

    async fn search(&self, query: KnowledgeQuery) -> Result<Vec<KnowledgeSnippet>, KnowledgeError> {
        if !self.collections.contains(&query.collection) {
            debug!(collection = %query.collection, "Search on unknown collection");
            return Ok(Vec::new());
        }

        let mut docs = self.documents(&query.collection)?;
        if query.collection != self.shared_collection {
            docs.extend(self.documents(&self.shared_collection)?);
        }

        Ok(scoring::rank(&docs, &query.text, query.limit)
            .into_iter()
            .map(|(doc, score)| KnowledgeSnippet {
                capability: query.capability.clone(),
                title: doc.title.clone(),
                body: doc.body.clone(),
                score: score as f32,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::capability::CapabilityId;
    use tempfile::TempDir;

    fn kb(dir: &TempDir) -> FileKnowledgeBase {
        FileKnowledgeBase::new(dir.path(), ["database", "epicor"], "shared").unwrap()
    }

    fn query(collection: &str, text: &str) -> KnowledgeQuery {
        KnowledgeQuery::new(CapabilityId::new(collection), collection, text)
    }

    #[test]
    fn creates_collection_folders() {
        let dir = TempDir::new().unwrap();
        let kb = kb(&dir);
        assert!(dir.path().join("database").is_dir());
        assert!(dir.path().join("shared").is_dir());
        assert_eq!(kb.collections().collect::<Vec<_>>(), vec!["database", "epicor", "shared"]);
    }

    #[test]
    fn add_document_sanitizes_title() {
        let dir = TempDir::new().unwrap();
        let kb = kb(&dir);
        let path = kb.add_document("database", "Warehouse: Schema!", "# tables").unwrap();
        assert_eq!(path, dir.path().join("database").join("Warehouse_Schema.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# tables");
    }

    #[test]
    fn add_document_rejects_unknown_collection() {
        let dir = TempDir::new().unwrap();
        let err = kb(&dir).add_document("cobol", "x", "y").unwrap_err();
        assert!(matches!(err, KnowledgeError::UnknownCollection(c) if c == "cobol"));
    }

    #[tokio::test]
    async fn search_ranks_and_merges_shared() {
        let dir = TempDir::new().unwrap();
        let kb = kb(&dir);
        kb.add_document("database", "warehouse tables", "warehouse capacity lives in INV_LOC")
            .unwrap();
        kb.add_document("database", "orders", "order headers and lines").unwrap();
        kb.add_document("shared", "glossary", "RDU is a warehouse code").unwrap();
        kb.add_document("epicor", "warehouse setup", "warehouse warehouse warehouse").unwrap();

        let results = kb.search(query("database", "warehouse capacity")).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["warehouse tables", "glossary"]);
        assert_eq!(results[0].score, 7.0);
        assert_eq!(results[0].capability, "database");
    }

    #[tokio::test]
    async fn search_reads_nested_markdown_only() {
        let dir = TempDir::new().unwrap();
        let kb = kb(&dir);
        let nested = dir.path().join("epicor").join("p21");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("pricing.md"), "price pages").unwrap();
        std::fs::write(nested.join("notes.txt"), "price").unwrap();

        let results = kb.search(query("epicor", "price")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "pricing");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directory_loop_is_not_followed() {
        let dir = TempDir::new().unwrap();
        let kb = kb(&dir);
        let collection = dir.path().join("database");
        std::os::unix::fs::symlink(&collection, collection.join("loop")).unwrap();
        kb.add_document("database", "indexes", "index tuning").unwrap();

        let results = kb.search(query("database", "index")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "indexes");
    }

    #[tokio::test]
    async fn unknown_collection_searches_empty() {
        let dir = TempDir::new().unwrap();
        let results = kb(&dir).search(query("cobol", "anything")).await.unwrap();
        assert!(results.is_empty());
    }
}

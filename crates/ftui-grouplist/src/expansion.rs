#![forbid(unsafe_code)]

//! Persisted set of expanded groups.
//!
//! [`ExpansionState`] owns the in-memory set and writes it through an injected
//! [`ExpansionBackend`] on every toggle. Persistence failures never reach the
//! caller: a failed load starts with every group collapsed and a failed save
//! keeps the in-memory set, both logged at `warn`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::model::GroupAddress;

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Expansion persistence failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be read or written.
    Unavailable(String),
    /// The stored document could not be understood.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "expansion store unavailable: {msg}"),
            Self::Corrupt(msg) => write!(f, "expansion store corrupt: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Key/value store for expanded sets, partitioned by namespace.
pub trait ExpansionBackend {
    /// Load the set for `namespace`. A namespace never saved loads as empty.
    fn load(&self, namespace: &str) -> Result<HashSet<String>, StoreError>;

    /// Replace the set for `namespace`.
    fn save(&mut self, namespace: &str, expanded: &HashSet<String>) -> Result<(), StoreError>;
}

/// In-process backend.
///
/// Clones share storage, so a handle kept by the host observes what the
/// engine saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    sets: Rc<RefCell<FxHashMap<String, HashSet<String>>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a namespace (builder style).
    #[must_use]
    pub fn with_set<I, S>(self, namespace: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sets
            .borrow_mut()
            .insert(namespace.to_string(), keys.into_iter().map(Into::into).collect());
        self
    }

    /// Snapshot of the stored set for `namespace`.
    #[must_use]
    pub fn snapshot(&self, namespace: &str) -> HashSet<String> {
        self.sets
            .borrow()
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }
}

impl ExpansionBackend for MemoryBackend {
    fn load(&self, namespace: &str) -> Result<HashSet<String>, StoreError> {
        Ok(self.snapshot(namespace))
    }

    fn save(&mut self, namespace: &str, expanded: &HashSet<String>) -> Result<(), StoreError> {
        self.sets
            .borrow_mut()
            .insert(namespace.to_string(), expanded.clone());
        Ok(())
    }
}

/// On-disk document, one per namespace.
#[derive(Debug, Serialize, Deserialize)]
struct ExpansionDocument {
    version: u32,
    expanded: Vec<String>,
}

/// Backend storing one JSON document per namespace under a directory.
///
/// Documents look like `{"version": 1, "expanded": ["a@x", "b@y"]}` with keys
/// sorted so the file diffs cleanly.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Store documents under `dir`, created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `namespace`. Characters outside `[A-Za-z0-9._-]` map
    /// to `_`.
    #[must_use]
    pub fn path_for(&self, namespace: &str) -> PathBuf {
        let file: String = namespace
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl ExpansionBackend for FileBackend {
    fn load(&self, namespace: &str) -> Result<HashSet<String>, StoreError> {
        let path = self.path_for(namespace);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(err) => return Err(err.into()),
        };
        let doc: ExpansionDocument = serde_json::from_str(&text)
            .map_err(|err| StoreError::Corrupt(format!("{}: {err}", path.display())))?;
        if doc.version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "{}: unsupported version {}",
                path.display(),
                doc.version
            )));
        }
        Ok(doc.expanded.into_iter().collect())
    }

    fn save(&mut self, namespace: &str, expanded: &HashSet<String>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let mut keys: Vec<String> = expanded.iter().cloned().collect();
        keys.sort_unstable();
        let doc = ExpansionDocument {
            version: FORMAT_VERSION,
            expanded: keys,
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        // Write-then-rename so a crash never leaves a truncated document.
        let path = self.path_for(namespace);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// The expanded set for one namespace, loaded once and written through on
/// every change.
pub struct ExpansionState {
    namespace: String,
    expanded: HashSet<String>,
    backend: Box<dyn ExpansionBackend>,
}

impl fmt::Debug for ExpansionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpansionState")
            .field("namespace", &self.namespace)
            .field("expanded", &self.expanded.len())
            .finish_non_exhaustive()
    }
}

impl ExpansionState {
    /// Load the set for `namespace` from `backend`.
    pub fn load(backend: Box<dyn ExpansionBackend>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let expanded = match backend.load(&namespace) {
            Ok(set) => {
                tracing::debug!(
                    namespace = %namespace,
                    groups = set.len(),
                    "loaded expansion state"
                );
                set
            }
            Err(err) => {
                tracing::warn!(
                    namespace = %namespace,
                    error = %err,
                    "expansion load failed, starting collapsed"
                );
                HashSet::new()
            }
        };
        Self {
            namespace,
            expanded,
            backend,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn is_expanded(&self, group: &GroupAddress) -> bool {
        self.expanded.contains(&group.key())
    }

    /// Flip a group's state and persist. Returns the new state.
    pub fn toggle(&mut self, group: &GroupAddress) -> bool {
        let key = group.key();
        let expanded = if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        };
        self.persist();
        expanded
    }

    /// Force a group's state. Returns whether anything changed.
    pub fn set_expanded(&mut self, group: &GroupAddress, expanded: bool) -> bool {
        let key = group.key();
        let changed = if expanded {
            self.expanded.insert(key)
        } else {
            self.expanded.remove(&key)
        };
        if changed {
            self.persist();
        }
        changed
    }

    /// Encoded addresses of every expanded group.
    #[must_use]
    pub fn expanded_set(&self) -> &HashSet<String> {
        &self.expanded
    }

    fn persist(&mut self) {
        if let Err(err) = self.backend.save(&self.namespace, &self.expanded) {
            tracing::warn!(
                namespace = %self.namespace,
                error = %err,
                "expansion save failed, keeping in-memory state"
            );
        }
    }
}

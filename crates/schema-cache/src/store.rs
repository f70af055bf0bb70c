use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::PersistenceError;
use crate::types::SchemaCatalog;

const LOG_TARGET: &str = "schema_cache::store";

pub const DEFAULT_OUTPUT_FILE: &str = "ComponentSchemas.json";

/// JSON file holding a [`SchemaCatalog`].
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the artifact with `catalog`.
    ///
    /// The catalog is written next to the destination first and then renamed over it, so a
    /// reader sees either the previous artifact or the new one in full.
    pub fn persist(&self, catalog: &SchemaCatalog) -> Result<(), PersistenceError> {
        let buf = to_json(catalog).map_err(PersistenceError::Serialize)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |source| PersistenceError::Io { path: dir.to_path_buf(), source };

        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(&buf).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(&self.path)
            .map_err(|e| PersistenceError::Persist { path: self.path.clone(), source: e.error })?;

        info!(
            target: LOG_TARGET,
            path = %self.path.display(),
            components = catalog.len(),
            "Persisted schema catalog."
        );
        Ok(())
    }

    pub fn load(&self) -> Result<SchemaCatalog, PersistenceError> {
        let buf = fs::read(&self.path)
            .map_err(|source| PersistenceError::Io { path: self.path.clone(), source })?;
        serde_json::from_slice(&buf)
            .map_err(|source| PersistenceError::Deserialize { path: self.path.clone(), source })
    }
}

fn to_json(catalog: &SchemaCatalog) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    catalog.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::test_utils::schema;
    use crate::types::ComponentId;

    fn catalog() -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new();
        // Insertion order deliberately differs from numeric order.
        catalog.insert(
            ComponentId::parse("0x2").unwrap(),
            schema(&["id", "owner"], &["uint256", "address"]),
        );
        catalog.insert(ComponentId::parse("0x1").unwrap(), schema(&["id"], &["uint256"]));
        catalog
    }

    #[test]
    fn persisted_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join(DEFAULT_OUTPUT_FILE));
        store.persist(&catalog()).unwrap();

        let written = fs::read_to_string(store.path()).unwrap();
        let expected = r#"{
    "0x2": {
        "keys": [
            "id",
            "owner"
        ],
        "values": [
            "uint256",
            "address"
        ]
    },
    "0x1": {
        "keys": [
            "id"
        ],
        "values": [
            "uint256"
        ]
    }
}
"#;
        assert_eq!(written, expected);
    }

    #[test]
    fn round_trip_preserves_ids_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join(DEFAULT_OUTPUT_FILE));

        let catalog = catalog();
        store.persist(&catalog).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, catalog);
        assert_eq!(
            loaded.keys().map(ComponentId::as_str).collect::<Vec<_>>(),
            vec!["0x2", "0x1"]
        );
    }

    #[test]
    fn overwrites_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        fs::write(&path, "stale contents that are not json").unwrap();

        let store = ResultStore::new(&path);
        store.persist(&SchemaCatalog::new()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
        // Nothing but the artifact is left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("missing").join(DEFAULT_OUTPUT_FILE));

        assert_matches!(store.persist(&catalog()), Err(PersistenceError::Io { .. }));
        assert!(!store.path().exists());
    }

    #[test]
    fn loading_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        fs::write(&path, r#"{ "not-an-id": { "keys": [], "values": [] } }"#).unwrap();

        assert_matches!(ResultStore::new(path).load(), Err(PersistenceError::Deserialize { .. }));
    }
}

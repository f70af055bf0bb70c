use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::InputError;
use crate::types::ComponentId;

pub const DEFAULT_COMPONENT_LIST_FILE: &str = "ComponentListFromState.json";

#[derive(Debug, Deserialize)]
struct ComponentList {
    components: Vec<String>,
}

/// Loads the component ids of a `{ "components": [...] }` file, in file order.
pub fn load_component_ids(path: impl AsRef<Path>) -> Result<Vec<ComponentId>, InputError> {
    let path = path.as_ref();
    let buf =
        fs::read(path).map_err(|source| InputError::Io { path: path.to_path_buf(), source })?;
    let list: ComponentList = serde_json::from_slice(&buf)
        .map_err(|source| InputError::Json { path: path.to_path_buf(), source })?;

    list.components.iter().map(|raw| ComponentId::parse(raw)).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ids_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_COMPONENT_LIST_FILE);
        fs::write(&path, r#"{ "components": ["0x0", "0xb2", "0x1a"], "systems": [] }"#).unwrap();

        let ids = load_component_ids(&path).unwrap();
        let raw: Vec<_> = ids.iter().map(ComponentId::as_str).collect();
        assert_eq!(raw, ["0x0", "0xb2", "0x1a"]);
        assert!(ids[0].is_zero());
    }

    #[test]
    fn invalid_id_fails_the_whole_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_COMPONENT_LIST_FILE);
        fs::write(&path, r#"{ "components": ["0x0", "0x1", "component.health"] }"#).unwrap();

        assert_matches!(
            load_component_ids(&path),
            Err(InputError::InvalidComponentId { id, .. }) if id == "component.health"
        );
    }

    #[test]
    fn missing_components_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_COMPONENT_LIST_FILE);
        fs::write(&path, r#"["0x0", "0x1"]"#).unwrap();

        assert_matches!(load_component_ids(&path), Err(InputError::Json { .. }));
    }
}

//! Data file loading
//!
//! JSON (`.json`) or YAML (`.yaml`, `.yml`) with a mapping at the top level.
//! String values are taken as-is; any other value becomes its JSON text so
//! arrays and objects can feed `{{#each}}`.

use std::path::Path;

use serde_json::Value;

use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::FileSystem;
use crate::models::DataMap;
use crate::template::value_text;

/// Load `path` into a [`DataMap`]; an empty path yields an empty map
pub fn load_data(fs: &dyn FileSystem, path: &Path) -> TemplaterResult<DataMap> {
    if path.as_os_str().is_empty() {
        return Ok(DataMap::new());
    }

    let bytes = fs.read(path).map_err(|e| TemplaterError::io(path, e))?;
    let data_error = |message: String| TemplaterError::Data {
        path: path.to_path_buf(),
        message,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let value: Value = match ext.as_deref() {
        Some("json") => serde_json::from_slice(&bytes).map_err(|e| data_error(e.to_string()))?,
        Some("yaml") | Some("yml") => {
            let text = std::str::from_utf8(&bytes).map_err(|e| data_error(e.to_string()))?;
            serde_yaml_ng::from_str(text).map_err(|e| data_error(e.to_string()))?
        }
        _ => {
            return Err(data_error(
                "unsupported data file extension (expected .json, .yaml or .yml)".to_string(),
            ))
        }
    };

    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, value_text(v))).collect()),
        Value::Null => Ok(DataMap::new()),
        _ => Err(data_error("top level must be a mapping".to_string())),
    }
}

/// Parse `key=value` pairs, as given on the command line
pub fn parse_assignments<'a>(pairs: impl IntoIterator<Item = &'a str>) -> TemplaterResult<DataMap> {
    pairs
        .into_iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| TemplaterError::Data {
                    path: Default::default(),
                    message: format!("expected key=value, got '{}'", pair),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    #[test]
    fn test_load_json_converts_non_strings() {
        let fs = MemoryFs::new();
        fs.insert(
            "/d/data.json",
            r#"{"name": "Ada", "age": 36, "vip": true, "items": [{"n": 1}], "none": null}"#,
        );

        let data = load_data(&fs, Path::new("/d/data.json")).unwrap();

        assert_eq!(data["name"], "Ada");
        assert_eq!(data["age"], "36");
        assert_eq!(data["vip"], "true");
        assert_eq!(data["items"], r#"[{"n":1}]"#);
        assert_eq!(data["none"], "null");
    }

    #[test]
    fn test_load_yaml() {
        let fs = MemoryFs::new();
        fs.insert("/d/data.yml", "name: Ada\ntags:\n  - a\n  - b\n");

        let data = load_data(&fs, Path::new("/d/data.yml")).unwrap();

        assert_eq!(data["name"], "Ada");
        assert_eq!(data["tags"], r#"["a","b"]"#);
    }

    #[test]
    fn test_empty_path_is_empty_map() {
        assert!(load_data(&MemoryFs::new(), Path::new("")).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_mapping_and_unknown_extension() {
        let fs = MemoryFs::new();
        fs.insert("/d/list.json", "[1, 2]");
        fs.insert("/d/data.txt", "a=b");

        let err = load_data(&fs, Path::new("/d/list.json")).unwrap_err();
        assert!(err.to_string().contains("top level must be a mapping"));
        assert!(load_data(&fs, Path::new("/d/data.txt")).is_err());
    }

    #[test]
    fn test_parse_assignments() {
        let data = parse_assignments(["a=1", "b = x=y"]).unwrap();
        assert_eq!(data["a"], "1");
        assert_eq!(data["b"], " x=y");
        assert!(parse_assignments(["novalue"]).is_err());
        assert!(parse_assignments(["=v"]).is_err());
    }
}

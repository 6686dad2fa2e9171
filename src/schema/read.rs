// src/schema/read.rs
//
// Schema file intake: parse, validate the version, reject malformed
// files. Rejections are logged by the caller and never stop the run.

use std::fs;
use std::path::Path;

use crate::errors::SchemaError;
use crate::schema::model::{SchemaFile, SCHEMA_VERSION};

/// Read and validate one schema file.
pub fn read_schema_file(path: &Path) -> Result<SchemaFile, SchemaError> {
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_schema(&text, &path.display().to_string())
}

/// Parse schema text, validating version and shape.
pub fn parse_schema(text: &str, path: &str) -> Result<SchemaFile, SchemaError> {
    let file: SchemaFile =
        serde_json::from_str(text).map_err(|err| SchemaError::Malformed {
            path: path.to_string(),
            message: err.to_string(),
        })?;
    if file.version != SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            found: file.version,
            path: path.to_string(),
        });
    }
    Ok(file)
}

/// Load every `<identifier>.json` under a schema directory, keyed by
/// module identifier. Invalid files are logged and skipped.
pub fn read_schema_dir(dir: &Path) -> Vec<(String, SchemaFile)> {
    let mut out = Vec::new();
    read_schema_dir_inner(dir, dir, &mut out);
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn read_schema_dir_inner(root: &Path, dir: &Path, out: &mut Vec<(String, SchemaFile)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "unreadable schema directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            read_schema_dir_inner(root, &path, out);
            continue;
        }
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        match read_schema_file(&path) {
            Ok(file) => {
                let identifier = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .with_extension("")
                    .to_string_lossy()
                    .replace('\\', "/");
                out.push((identifier, file));
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "rejected schema file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_version() {
        let text = r#"{ "version": "2.0", "languages": { "lua": {} } }"#;
        let err = parse_schema(text, "x.json").unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedVersion { .. }));
    }

    #[test]
    fn rejects_malformed_shape() {
        let err = parse_schema("{ not json", "x.json").unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
    }

    #[test]
    fn accepts_minimal_valid_file() {
        let text = r#"{ "version": "1.1", "languages": { "lua": {} } }"#;
        let file = parse_schema(text, "x.json").unwrap();
        assert!(file.languages.lua.classes.is_empty());
    }

    #[test]
    fn reads_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("client/ui");
        fs::create_dir_all(&sub).unwrap();
        fs::write(
            sub.join("Widget.json"),
            r#"{ "version": "1.1", "languages": { "lua": {} } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("bad.json"), "{").unwrap();

        let loaded = read_schema_dir(dir.path());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "client/ui/Widget");
    }
}

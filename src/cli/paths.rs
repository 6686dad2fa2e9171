// src/cli/paths.rs
//! Turns the CLI's path arguments into a concrete list of Lua files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("bad glob pattern '{pattern}': {message}")]
    BadPattern { pattern: String, message: String },

    #[error("could not walk '{path}'")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Expand a command's path arguments into `.lua` files.
///
/// An argument can name a file, a directory (searched recursively), or a
/// glob. Files named outright keep their argument order; everything a
/// directory or glob contributes is sorted case-insensitively before
/// being appended, so runs are stable across filesystems. Repeats
/// collapse to their first occurrence. Arguments naming non-Lua files
/// are ignored rather than rejected.
pub fn lua_files(patterns: &[String]) -> Result<Vec<PathBuf>, PathError> {
    let mut named = Vec::new();
    let mut discovered = Vec::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            if is_lua(path) {
                named.push(path.to_path_buf());
            }
        } else if path.is_dir() {
            search(&format!("{pattern}/**/*.lua"), &mut discovered)?;
        } else {
            search(pattern, &mut discovered)?;
        }
    }

    discovered.sort_by_key(|p| p.to_string_lossy().to_lowercase());

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();
    for path in named.into_iter().chain(discovered) {
        // Canonical form catches the same file reached two ways
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            out.push(path);
        }
    }
    Ok(out)
}

fn search(pattern: &str, discovered: &mut Vec<PathBuf>) -> Result<(), PathError> {
    let matches = glob::glob(pattern).map_err(|err| PathError::BadPattern {
        pattern: pattern.to_string(),
        message: err.msg.to_string(),
    })?;
    for entry in matches {
        match entry {
            Ok(path) => {
                if path.is_file() && is_lua(&path) {
                    discovered.push(path);
                }
            }
            Err(err) => {
                let path = err.path().to_path_buf();
                return Err(PathError::Walk {
                    path,
                    source: err.into_error(),
                });
            }
        }
    }
    Ok(())
}

fn is_lua(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "lua")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "-- lua").unwrap();
        path
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn named_file_passes_through() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "init.lua");
        let files = lua_files(&args(&[&file.to_string_lossy()])).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn directory_searches_recursively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "top.lua");
        touch(dir.path(), "sub/deep/leaf.lua");
        touch(dir.path(), "sub/notes.txt");

        let files = lua_files(&args(&[&dir.path().to_string_lossy()])).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn discovered_files_come_out_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "zulu.lua");
        touch(dir.path(), "Alpha.lua");
        touch(dir.path(), "mike.lua");

        let files = lua_files(&args(&[&dir.path().to_string_lossy()])).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_lowercase())
            .collect();
        assert_eq!(names, vec!["alpha.lua", "mike.lua", "zulu.lua"]);
    }

    #[test]
    fn named_files_keep_argument_order_ahead_of_discovered() {
        let dir = TempDir::new().unwrap();
        let second = touch(dir.path(), "second.lua");
        let first = touch(dir.path(), "sub/first.lua");
        touch(dir.path(), "sub/aaa.lua");

        let files = lua_files(&args(&[
            &second.to_string_lossy(),
            &first.to_string_lossy(),
            &dir.path().join("sub").to_string_lossy(),
        ]))
        .unwrap();
        // The two named files lead in argument order; the directory only
        // contributes what they did not already cover
        assert_eq!(files[0], second);
        assert_eq!(files[1], first);
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn repeats_collapse() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "once.lua");
        let arg = file.to_string_lossy().to_string();
        let files = lua_files(&[arg.clone(), arg]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn bad_glob_is_reported() {
        let err = lua_files(&args(&["[oops"])).unwrap_err();
        assert!(matches!(err, PathError::BadPattern { .. }));
    }

    #[test]
    fn non_lua_argument_is_ignored() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "readme.md");
        let files = lua_files(&args(&[&file.to_string_lossy()])).unwrap();
        assert!(files.is_empty());
    }
}

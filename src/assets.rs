//! Post asset mirroring.
//!
//! Every immediate subdirectory of the posts directory (`posts/img/`,
//! `posts/diagrams/`, ...) is copied wholesale into the public assets
//! location. An existing copy is removed first, so files deleted from a
//! source directory disappear from its mirror. Mirrors whose source
//! directory was deleted entirely are left alone.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Failure while mirroring, carrying the path that caused it.
#[derive(Error, Debug)]
#[error("{}: {source}", .path.display())]
pub struct AssetError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl AssetError {
    fn at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Mirror each subdirectory of `posts_dir` into `dest_dir`.
///
/// Returns the mirrored directory names in lexical order.
pub fn copy_post_assets(posts_dir: &Path, dest_dir: &Path) -> Result<Vec<String>, AssetError> {
    fs::create_dir_all(dest_dir).map_err(AssetError::at(dest_dir))?;

    let mut dirs: Vec<PathBuf> = fs::read_dir(posts_dir)
        .map_err(AssetError::at(posts_dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let mut copied = Vec::new();
    for src in dirs {
        let Some(name) = src.file_name() else {
            continue;
        };
        let dest = dest_dir.join(name);
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(AssetError::at(&dest))?;
        }
        copy_dir_recursive(&src, &dest)?;
        copied.push(name.to_string_lossy().into_owned());
    }
    Ok(copied)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), AssetError> {
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            AssetError {
                path,
                source: e.into(),
            }
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields paths under its root");
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(AssetError::at(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(AssetError::at(entry.path()))?;
        }
    }
    Ok(())
}

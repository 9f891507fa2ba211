use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{BatchError, Result};
use crate::utils::{has_extension, webp_file_name};

/// Suffix appended to the input root's name to form the output root.
pub const OUTPUT_SUFFIX: &str = "_webp";

/// An input image discovered during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    /// Path relative to the input root
    pub relative: PathBuf,
    pub size: u64,
}

/// One input directory and its counterpart in the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMapping {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// A file and the directory its result goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub file: ImageFile,
    pub output_dir: PathBuf,
    /// Earlier file in the same directory that already maps to this unit's
    /// `.webp` name (`a.jpg` claims `a.webp` before `a.png`)
    pub claimed_by: Option<PathBuf>,
}

/// Everything the dispatcher needs, produced before any conversion starts.
#[derive(Debug, Clone)]
pub struct WalkPlan {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub directories: Vec<DirectoryMapping>,
    pub units: Vec<WorkUnit>,
}

impl WalkPlan {
    pub fn file_count(&self) -> usize {
        self.units.len()
    }
}

/// Output root for `input_root`: a sibling directory named `<name>_webp`.
pub fn output_root_for(input_root: &Path) -> Result<PathBuf> {
    let named = if input_root.file_name().is_some() {
        input_root.to_path_buf()
    } else {
        // ".", "..", "foo/.." have no final component; resolve them first
        std::fs::canonicalize(input_root)
            .map_err(|_| BatchError::DirectoryNotFound(input_root.to_path_buf()))?
    };

    let name = named
        .file_name()
        .ok_or_else(|| BatchError::InvalidInputRoot(input_root.to_path_buf()))?;
    let mut output_name = OsString::from(name);
    output_name.push(OUTPUT_SUFFIX);

    Ok(named.with_file_name(output_name))
}

/// Recursive image discovery plus eager creation of the mirrored tree.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    extensions: Vec<String>,
}

impl DirectoryWalker {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Enumerate `input_root` and create every output directory.
    ///
    /// Empty subdirectories are mirrored too. All directories exist when this
    /// returns, so workers never create directories themselves.
    pub fn walk(&self, input_root: &Path) -> Result<WalkPlan> {
        let plan = self.scan(input_root)?;
        create_output_dirs(&plan.directories)?;
        log::info!(
            "Mirrored {} directories into {}",
            plan.directories.len(),
            plan.output_root.display()
        );
        Ok(plan)
    }

    /// Enumerate without touching the filesystem.
    pub fn scan(&self, input_root: &Path) -> Result<WalkPlan> {
        if !input_root.exists() {
            return Err(BatchError::DirectoryNotFound(input_root.to_path_buf()));
        }
        if !input_root.is_dir() {
            return Err(BatchError::NotADirectory(input_root.to_path_buf()));
        }

        let output_root = output_root_for(input_root)?;
        let mut directories = Vec::new();
        let mut units = Vec::new();
        let mut claims: HashMap<PathBuf, PathBuf> = HashMap::new();

        for entry in WalkDir::new(input_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(input_root) else {
                continue;
            };

            if entry.file_type().is_dir() {
                directories.push(DirectoryMapping {
                    source: path.to_path_buf(),
                    target: output_root.join(relative),
                });
                continue;
            }

            // Symlinks are neither followed nor selected
            if !entry.file_type().is_file() || !has_extension(path, &self.extensions) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    log::warn!("Cannot stat {}: {e}", path.display());
                    0
                }
            };
            let output_dir = match relative.parent() {
                Some(parent) => output_root.join(parent),
                None => output_root.clone(),
            };
            let claimed_by = webp_file_name(path).and_then(|name| {
                let target = output_dir.join(name);
                match claims.get(&target) {
                    Some(owner) => Some(owner.clone()),
                    None => {
                        claims.insert(target, path.to_path_buf());
                        None
                    }
                }
            });
            if let Some(owner) = &claimed_by {
                log::warn!(
                    "{} and {} share a WebP name; the latter is kept as-is",
                    owner.display(),
                    path.display()
                );
            }

            units.push(WorkUnit {
                file: ImageFile {
                    path: path.to_path_buf(),
                    relative: relative.to_path_buf(),
                    size,
                },
                output_dir,
                claimed_by,
            });
        }

        Ok(WalkPlan {
            input_root: input_root.to_path_buf(),
            output_root,
            directories,
            units,
        })
    }
}

fn create_output_dirs(directories: &[DirectoryMapping]) -> Result<()> {
    for mapping in directories {
        std::fs::create_dir_all(&mapping.target).map_err(|source| {
            BatchError::PermissionDenied {
                path: mapping.target.clone(),
                source,
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn default_walker() -> DirectoryWalker {
        DirectoryWalker::new(vec!["jpg".into(), ".JPEG".into(), "png".into()])
    }

    #[test]
    fn output_root_is_a_sibling() {
        let out = output_root_for(Path::new("/data/photos")).unwrap();
        assert_eq!(out, PathBuf::from("/data/photos_webp"));

        let out = output_root_for(Path::new("photos")).unwrap();
        assert_eq!(out, PathBuf::from("photos_webp"));
    }

    #[test]
    fn dot_root_is_resolved_before_naming() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("album");
        fs::create_dir(&root).unwrap();

        let out = output_root_for(&root.join("sub").join("..")).unwrap_err();
        assert!(matches!(out, BatchError::DirectoryNotFound(_)));

        fs::create_dir(root.join("sub")).unwrap();
        let out = output_root_for(&root.join("sub").join("..")).unwrap();
        assert_eq!(out.file_name().unwrap(), "album_webp");
    }

    #[test]
    fn selects_images_case_insensitively() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("a.JPG"), b"x").unwrap();
        fs::write(root.join("b.jpeg"), b"xy").unwrap();
        fs::write(root.join("nested/c.Png"), b"xyz").unwrap();
        fs::write(root.join("notes.txt"), b"ignored").unwrap();
        fs::write(root.join("d.gif"), b"ignored").unwrap();

        let plan = default_walker().scan(&root).unwrap();
        let relative: Vec<_> = plan.units.iter().map(|u| u.file.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.JPG"),
                PathBuf::from("b.jpeg"),
                PathBuf::from("nested/c.Png"),
            ]
        );
        assert_eq!(plan.units[2].file.size, 3);
        assert_eq!(plan.units[2].output_dir, dir.path().join("photos_webp/nested"));
        assert_eq!(plan.units[0].output_dir, dir.path().join("photos_webp"));
    }

    #[test]
    fn second_file_with_same_stem_is_claimed() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.jpg"), b"x").unwrap();
        fs::write(root.join("a.png"), b"x").unwrap();
        fs::write(root.join("sub/a.png"), b"x").unwrap();

        let plan = default_walker().scan(&root).unwrap();
        let claims: Vec<_> = plan.units.iter().map(|u| u.claimed_by.clone()).collect();
        assert_eq!(claims, vec![None, Some(root.join("a.jpg")), None]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_not_selected() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("store");
        let root = dir.path().join("photos");
        fs::create_dir_all(&store).unwrap();
        fs::create_dir_all(&root).unwrap();
        fs::write(store.join("real.png"), vec![7u8; 465]).unwrap();
        fs::write(root.join("own.png"), vec![7u8; 12]).unwrap();
        std::os::unix::fs::symlink(store.join("real.png"), root.join("link.png")).unwrap();

        let plan = default_walker().scan(&root).unwrap();
        assert_eq!(plan.file_count(), 1);
        assert_eq!(plan.units[0].file.relative, PathBuf::from("own.png"));
        assert_eq!(plan.units[0].file.size, 12);
    }

    #[test]
    fn scan_does_not_create_anything() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("x")).unwrap();

        let plan = default_walker().scan(&root).unwrap();
        assert_eq!(plan.directories.len(), 2);
        assert!(!plan.output_root.exists());
    }

    #[test]
    fn walk_mirrors_empty_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("empty/deeper")).unwrap();
        fs::create_dir_all(root.join("full")).unwrap();
        fs::write(root.join("full/a.png"), b"x").unwrap();

        let plan = default_walker().walk(&root).unwrap();
        let out = dir.path().join("photos_webp");
        assert_eq!(plan.output_root, out);
        assert!(out.is_dir());
        assert!(out.join("empty").is_dir());
        assert!(out.join("empty/deeper").is_dir());
        assert!(out.join("full").is_dir());
        assert_eq!(plan.file_count(), 1);
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let err = default_walker().walk(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, BatchError::DirectoryNotFound(_)));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();
        let err = default_walker().walk(&file).unwrap_err();
        assert!(matches!(err, BatchError::NotADirectory(_)));
    }

    #[test]
    fn uncreatable_output_tree_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir(&root).unwrap();
        // A regular file squatting on the output root's name
        fs::write(dir.path().join("photos_webp"), b"in the way").unwrap();

        let err = default_walker().walk(&root).unwrap_err();
        match err {
            BatchError::PermissionDenied { path, .. } => {
                assert_eq!(path, dir.path().join("photos_webp"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

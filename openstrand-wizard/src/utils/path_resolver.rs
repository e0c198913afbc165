use anyhow::Result;
use std::path::{Path, PathBuf};

pub const LOG_FOLDER_NAME: &str = "Wizard_Log";

/// Resolve deployment folder (absolute path)
pub fn resolve_deployment_folder() -> PathBuf {
    // Prefer the folder where the binary is running from
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }

    // Fallback: current working directory
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve log folder (absolute path)
///
/// An explicit override always wins. Otherwise walk up from the CWD looking for an
/// existing `Wizard_Log/` or a workspace root (a `Cargo.toml` declaring `[workspace]`),
/// and fall back to the deployment folder.
pub fn resolve_log_folder(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
        return Ok(dir.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(found) = find_log_folder_from(&cwd)? {
            return Ok(found);
        }
    }

    let log_dir = resolve_deployment_folder().join(LOG_FOLDER_NAME);
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
    Ok(log_dir)
}

fn find_log_folder_from(start: &Path) -> Result<Option<PathBuf>> {
    let mut dir = start.to_path_buf();
    for _ in 0..12 {
        let candidate = dir.join(LOG_FOLDER_NAME);
        if candidate.is_dir() {
            return Ok(Some(candidate));
        }

        if is_workspace_root(&dir) {
            std::fs::create_dir_all(&candidate)
                .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
            return Ok(Some(candidate));
        }

        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
    Ok(None)
}

fn is_workspace_root(dir: &Path) -> bool {
    std::fs::read_to_string(dir.join("Cargo.toml"))
        .map(|s| s.contains("[workspace]"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("logs").join("nested");
        let resolved = resolve_log_folder(Some(&target)).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn existing_log_folder_is_found_from_nested_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = tmp.path().join(LOG_FOLDER_NAME);
        std::fs::create_dir_all(&logs).unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_log_folder_from(&nested).unwrap();
        assert_eq!(found, Some(logs));
    }

    #[test]
    fn workspace_root_gets_a_log_folder() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("Cargo.toml"),
            "[workspace]\nmembers = []\n",
        )
        .unwrap();
        let nested = tmp.path().join("crate").join("src");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_log_folder_from(&nested).unwrap();
        assert_eq!(found, Some(tmp.path().join(LOG_FOLDER_NAME)));
        assert!(tmp.path().join(LOG_FOLDER_NAME).is_dir());
    }
}

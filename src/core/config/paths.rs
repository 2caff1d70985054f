use super::ConfigError;
use std::path::{Path, PathBuf};

/// Rc files read at startup, in load order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    files: Vec<PathBuf>,
    required: bool,
}

impl ConfigPaths {
    /// `<config dir>/conch/conchrc` then `~/.conchrc`; both optional.
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        let mut files = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            files.push(config_dir.join("conch").join("conchrc"));
        }
        files.push(home.join(".conchrc"));

        Ok(ConfigPaths {
            files,
            required: false,
        })
    }

    /// A single explicit file, which must exist.
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        ConfigPaths {
            files: vec![path.into()],
            required: true,
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path() {
        let paths = ConfigPaths::explicit("/tmp/custom.rc");
        assert!(paths.is_required());
        assert_eq!(
            paths.files().collect::<Vec<_>>(),
            vec![Path::new("/tmp/custom.rc")]
        );
    }

    #[test]
    fn test_default_paths_end_with_home_rc() {
        if let Ok(paths) = ConfigPaths::new() {
            assert!(!paths.is_required());
            let last = paths.files().last().unwrap();
            assert!(last.ends_with(".conchrc"));
        }
    }
}

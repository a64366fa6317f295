use std::{fs, io, path::PathBuf};

use directories::BaseDirs;
use tracing::info;

/// Resolves the directory the database lives in and creates it if needed.
///
/// Without `data_dir` the system data directory is used (`<data dir>/<app_name>`). With
/// `ephemeral` a fresh child directory is created inside that location, or inside the OS
/// temporary directory when no `data_dir` was given.
pub fn setup_data_dir(
    app_name: &str,
    data_dir: Option<PathBuf>,
    ephemeral: bool,
) -> io::Result<PathBuf> {
    let dir = match (data_dir, ephemeral) {
        (Some(data_dir), false) => data_dir,
        (Some(data_dir), true) => {
            fs::create_dir_all(&data_dir)?;
            tempfile::Builder::new()
                .prefix(app_name)
                .tempdir_in(data_dir)?
                .keep()
        }
        (None, true) => tempfile::Builder::new().prefix(app_name).tempdir()?.keep(),
        (None, false) => BaseDirs::new()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Base directories not found"))?
            .data_dir()
            .join(app_name),
    };

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    info!(path = %dir.display(), ephemeral, "Using data directory");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_is_created() {
        let root = tempfile::tempdir().expect("temp dir");
        let target = root.path().join("nested").join("bpmon");

        let dir = setup_data_dir("bpmon", Some(target.clone()), false).expect("data dir");
        assert_eq!(dir, target);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_ephemeral_dirs_are_unique() {
        let root = tempfile::tempdir().expect("temp dir");
        let first = setup_data_dir("bpmon", Some(root.path().to_path_buf()), true).expect("dir");
        let second = setup_data_dir("bpmon", Some(root.path().to_path_buf()), true).expect("dir");

        assert_ne!(first, second);
        assert!(first.starts_with(root.path()));
        assert!(second.is_dir());
    }
}

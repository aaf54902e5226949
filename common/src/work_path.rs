use std::path::Path;

/// Re-root a path value under a working directory unless it is already
/// absolute. Without a working directory the value passes through
/// unchanged, relative as it is.
pub fn absolutize(work_dir: Option<&Path>, value: &str) -> String {
    let path = Path::new(value);
    if path.is_absolute() {
        return value.to_owned();
    }
    match work_dir {
        Some(dir) => dir.join(path).to_string_lossy().into_owned(),
        None => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn relative_is_rerooted() {
        let dir = PathBuf::from("/work");
        assert_eq!(
            absolutize(Some(&dir), "rel/file.csv"),
            PathBuf::from("/work").join("rel/file.csv").to_string_lossy()
        );
    }

    #[test]
    fn absolute_is_unchanged() {
        let dir = PathBuf::from("/work");
        assert_eq!(absolutize(Some(&dir), "/data/file.csv"), "/data/file.csv");
    }

    #[test]
    fn missing_work_dir_is_unchanged() {
        assert_eq!(absolutize(None, "rel/file.csv"), "rel/file.csv");
    }
}

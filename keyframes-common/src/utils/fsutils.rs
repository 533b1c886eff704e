use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Clears the directory at path, or creates it, including its parents
pub fn clear_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => {
            // TODO: permissions and owner are not preserved when doing it like this. List
            // all entries and remove them one by one instead.
            fs::remove_dir_all(dir)?;
            fs::create_dir(dir)
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "dir is not a dir",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Try to read the file, return None if it doesn't exist
pub fn read_optional_file(path: impl AsRef<Path>) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
        Ok(s) => Ok(Some(s)),
    }
}

/// Escape a filename Emacs style
pub fn path_as_filename(p: impl AsRef<Path>) -> String {
    p.as_ref().to_string_lossy().replace('/', "!")
}

/// All directories directly inside `dir`, sorted by path.
pub fn sub_dirs(dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// All files directly inside `dir` with the extension `ext` (case-insensitive), sorted by
/// path.
pub fn files_with_extension(dir: impl AsRef<Path>, ext: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext));
        if matches && entry.file_type()?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clear_dir_empties_and_creates() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("a").join("b");

        clear_dir(&dir)?;
        assert!(dir.is_dir());

        fs::write(dir.join("file.jpg"), b"x")?;
        fs::create_dir(dir.join("sub"))?;
        clear_dir(&dir)?;
        assert!(dir.is_dir());
        assert_eq!(0, fs::read_dir(&dir)?.count());
        Ok(())
    }

    #[test]
    fn clear_dir_refuses_files() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let file = tmp.path().join("file");
        fs::write(&file, b"x")?;
        assert!(clear_dir(&file).is_err());
        assert!(file.is_file());
        Ok(())
    }

    #[test]
    fn optional_file() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let file = tmp.path().join("rc");
        assert_eq!(None, read_optional_file(&file)?);
        fs::write(&file, "--frames 3")?;
        assert_eq!(Some("--frames 3".to_owned()), read_optional_file(&file)?);
        Ok(())
    }

    #[test]
    fn escaped_filenames() {
        assert_eq!("a!b!c", path_as_filename("a/b/c"));
        assert_eq!("WTf5EgVY5uU_98_104", path_as_filename("WTf5EgVY5uU_98_104"));
    }

    #[test]
    fn listing() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path();
        fs::create_dir(root.join("b"))?;
        fs::create_dir(root.join("a"))?;
        fs::write(root.join("2.jpg"), b"x")?;
        fs::write(root.join("1.JPG"), b"x")?;
        fs::write(root.join("notes.txt"), b"x")?;

        assert_eq!(vec![root.join("a"), root.join("b")], sub_dirs(root)?);
        assert_eq!(
            vec![root.join("1.JPG"), root.join("2.jpg")],
            files_with_extension(root, "jpg")?
        );
        Ok(())
    }
}

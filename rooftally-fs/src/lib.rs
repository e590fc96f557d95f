//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! The area store works through a capability handle on its root directory, so
//! every data file it touches is confined to that directory.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open `path` as a directory capability, creating it (and any missing
/// parents) first.
pub fn open_or_create_dir(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    if !path.as_os_str().is_empty() && path != Utf8Path::new("/") {
        let (base_dir, relative) = base_dir_and_relative(path)?;
        if !relative.as_os_str().is_empty() {
            base_dir.create_dir_all(&relative)?;
        }
    }
    fs_utf8::Dir::open_ambient_dir(path, ambient_authority())
}

/// Return whether `name` exists inside `dir` and is a regular file.
///
/// A missing entry is reported as `Ok(false)`; any other failure is returned.
pub fn is_regular_file(dir: &fs_utf8::Dir, name: &Utf8Path) -> io::Result<bool> {
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Remove `name` from `dir`, treating an already-missing file as success.
///
/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(dir: &fs_utf8::Dir, name: &Utf8Path) -> io::Result<bool> {
    match dir.remove_file(name) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Return whether `path` is a single, normal path component.
///
/// Data files live directly under the store root; anything with a directory
/// part, a parent reference or a root is rejected.
pub fn is_plain_file_name(path: &Utf8Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(camino::Utf8Component::Normal(_)), None)
    )
}

/// Split an absolute or relative path into an ambient base directory and a
/// relative suffix.
pub fn base_dir_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        // Unix-style absolute path.
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        // Relative path: resolve from the current directory.
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8_temp(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8")
    }

    #[rstest]
    fn open_or_create_dir_creates_nested_directories() {
        let temp = TempDir::new().expect("create temp dir");
        let nested = utf8_temp(&temp).join("a").join("b");

        let dir = open_or_create_dir(&nested).expect("open nested dir");
        dir.write("marker.txt", b"ok").expect("write marker");

        assert!(nested.join("marker.txt").as_std_path().is_file());
    }

    #[rstest]
    fn is_regular_file_reports_missing_as_false() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = open_or_create_dir(&utf8_temp(&temp)).expect("open dir");

        assert!(!is_regular_file(&dir, Utf8Path::new("absent.bin")).expect("stat"));
        dir.write("present.bin", b"1").expect("write file");
        assert!(is_regular_file(&dir, Utf8Path::new("present.bin")).expect("stat"));
    }

    #[rstest]
    fn is_regular_file_rejects_directories() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = open_or_create_dir(&utf8_temp(&temp)).expect("open dir");
        dir.create_dir("nested").expect("create nested dir");

        assert!(!is_regular_file(&dir, Utf8Path::new("nested")).expect("stat"));
    }

    #[rstest]
    fn remove_file_if_exists_is_idempotent() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = open_or_create_dir(&utf8_temp(&temp)).expect("open dir");
        dir.write("doomed.bin", b"1").expect("write file");

        assert!(remove_file_if_exists(&dir, Utf8Path::new("doomed.bin")).expect("remove"));
        assert!(!remove_file_if_exists(&dir, Utf8Path::new("doomed.bin")).expect("remove again"));
    }

    #[rstest]
    #[case("abcd1234.rtfa", true)]
    #[case("nested/abcd1234.rtfa", false)]
    #[case("../abcd1234.rtfa", false)]
    #[case("/tmp/abcd1234.rtfa", false)]
    #[case("", false)]
    fn plain_file_names(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_plain_file_name(Utf8Path::new(path)), expected);
    }
}

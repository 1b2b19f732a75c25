use std::{
    fs::{self, ReadDir},
    path::Path,
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Cannot mark as executable ({0}): {1}")]
        Permission(PathBuf, #[source] io::Error),
    }

    impl Error {
        pub fn io_error(&self) -> &io::Error {
            match self {
                Error::SingleIO(_, _, e) | Error::Permission(_, e) => e,
            }
        }

        pub fn path(&self) -> &std::path::Path {
            match self {
                Error::SingleIO(_, path, _) | Error::Permission(path, _) => path,
            }
        }
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

/// Create exactly one new directory. Fails if `path` already exists.
#[must_use]
pub fn mkdir_new(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir(dir).map_err(|e| Error::SingleIO("Cannot create new dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

#[must_use]
pub fn remove_dir_all(dir: impl AsRef<Path>) -> Result<()> {
    fs::remove_dir_all(&dir)
        .map_err(|e| Error::SingleIO("Cannot remove dir", dir.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

/// Add `u+x,g+x,o+x` to the file mode.
#[must_use]
#[cfg(unix)]
pub fn set_executable(filepath: impl AsRef<Path>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let filepath = filepath.as_ref();
    let mut perm = fs::metadata(filepath)
        .map_err(|e| Error::Permission(filepath.to_owned(), e))?
        .permissions();
    perm.set_mode(perm.mode() | 0o111);
    fs::set_permissions(filepath, perm).map_err(|e| Error::Permission(filepath.to_owned(), e))
}

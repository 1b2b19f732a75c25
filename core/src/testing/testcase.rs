use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;

use crate::config::TestConfig;

#[async_trait]
pub trait Testcase: Send + Sync {
    fn name(&self) -> &str;
    async fn input(&self) -> anyhow::Result<Vec<u8>>;
    async fn expected_output(&self) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestcase {
    name: String,
    input_data_path: PathBuf,
    expected_data_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMemoryTestcase<B: AsRef<[u8]>> {
    pub name: String,
    pub input: B,
    pub expected_output: B,
}

/// A directory of `<name>.<input_extension>` / `<name>.<output_extension>` pairs.
///
/// Read-only: any number of judging attempts may enumerate the same catalog at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCatalog {
    dir: PathBuf,
    input_extension: String,
    output_extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogEntries {
    /// Sorted by name.
    pub testcases: Vec<FsTestcase>,
    /// Names of inputs without an expected output, sorted.
    pub skipped: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Tests directory not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    ReadDir(#[from] fsutil::Error),

    #[error("No test cases found in {0}")]
    Empty(PathBuf),
}

#[async_trait]
impl Testcase for FsTestcase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn input(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.input_data_path)
            .await
            .with_context(|| format!("Failed to read input of testcase {}", self.name))
    }

    async fn expected_output(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.expected_data_path)
            .await
            .with_context(|| format!("Failed to read expected output of testcase {}", self.name))
    }
}

#[async_trait]
impl<B> Testcase for OnMemoryTestcase<B>
where
    B: AsRef<[u8]> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn input(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.input.as_ref().to_vec())
    }

    async fn expected_output(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.expected_output.as_ref().to_vec())
    }
}

impl FsTestcase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_data_path: input.into(),
            expected_data_path: output.into(),
        }
    }

    pub fn input_data_path(&self) -> &Path {
        &self.input_data_path
    }

    pub fn expected_data_path(&self) -> &Path {
        &self.expected_data_path
    }
}

impl<B> OnMemoryTestcase<B>
where
    B: AsRef<[u8]>,
{
    pub fn new(
        name: impl Into<String>,
        input: impl Into<B>,
        expected_output: impl Into<B>,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

impl From<&TestConfig> for TestCatalog {
    fn from(cfg: &TestConfig) -> Self {
        Self::new(&cfg.dir, &cfg.input_extension, &cfg.output_extension)
    }
}

impl TestCatalog {
    pub fn new(
        dir: impl Into<PathBuf>,
        input_extension: impl Into<String>,
        output_extension: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            input_extension: input_extension.into(),
            output_extension: output_extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `Some(Ok(_))` for a complete pair, `Some(Err(name))` for an input with no
    /// expected output, `None` if `path` is not an input file.
    pub fn find_by_input_file_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Option<Result<FsTestcase, String>> {
        let path = path.as_ref();
        if path.extension()? != self.input_extension.as_str() {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy().into_owned();
        let expected = path.with_extension(&self.output_extension);
        if expected.is_file() {
            Some(Ok(FsTestcase::new(name, path, expected)))
        } else {
            Some(Err(name))
        }
    }

    pub fn enumerate(&self) -> Result<CatalogEntries, CatalogError> {
        if !self.dir.is_dir() {
            return Err(CatalogError::NotFound(self.dir.clone()));
        }

        let paths = fsutil::read_dir(&self.dir)?.map(|entry| entry.map(|e| e.path()));
        self.collect_pairs(paths)
    }

    /// A failing entry fails the whole enumeration rather than dropping a testcase.
    fn collect_pairs<I>(&self, paths: I) -> Result<CatalogEntries, CatalogError>
    where
        I: IntoIterator<Item = io::Result<PathBuf>>,
    {
        let mut res = CatalogEntries::default();
        for path in paths {
            let path = path.map_err(|e| {
                fsutil::Error::SingleIO("Cannot read dir entry", self.dir.clone(), e)
            })?;
            if path.is_dir() {
                continue;
            }
            match self.find_by_input_file_path(&path) {
                Some(Ok(t)) => res.testcases.push(t),
                Some(Err(name)) => {
                    log::warn!(
                        "Skipping testcase {}: missing '{}.{}'",
                        name,
                        name,
                        self.output_extension
                    );
                    res.skipped.push(name);
                }
                None => (),
            }
        }

        if res.testcases.is_empty() {
            return Err(CatalogError::Empty(self.dir.clone()));
        }
        res.testcases.sort_by(|a, b| a.name.cmp(&b.name));
        res.skipped.sort();
        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn catalog_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TestCatalog) {
        let tmp = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            fsutil::write_with_mkdir(tmp.path().join(name), contents).unwrap();
        }
        let catalog = TestCatalog::new(tmp.path(), "in", "out");
        (tmp, catalog)
    }

    #[test]
    fn enumerate_sorts_pairs_by_name() {
        let (tmp, catalog) = catalog_with(&[
            ("b.in", "3 3"),
            ("b.out", "6"),
            ("a.in", "2 2"),
            ("a.out", "4"),
            ("10.in", "5 5"),
            ("10.out", "10"),
            ("README.md", "not a testcase"),
            ("nested/c.in", "ignored"),
        ]);

        let entries = catalog.enumerate().unwrap();
        let names: Vec<_> = entries.testcases.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["10", "a", "b"]);
        assert!(entries.skipped.is_empty());
        assert_eq!(entries.testcases[1].input_data_path(), tmp.path().join("a.in"));
        assert_eq!(entries.testcases[1].expected_data_path(), tmp.path().join("a.out"));
    }

    #[test]
    fn orphan_inputs_are_skipped() {
        let (_tmp, catalog) = catalog_with(&[
            ("a.in", "1"),
            ("a.out", "1"),
            ("z.in", "2"),
            ("m.in", "3"),
            ("x.out", "4"),
        ]);

        let entries = catalog.enumerate().unwrap();
        assert_eq!(entries.testcases.len(), 1);
        assert_eq!(entries.skipped, ["m", "z"]);
    }

    #[test]
    fn missing_dir_is_catalog_error() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = TestCatalog::new(tmp.path().join("nope"), "in", "out");
        assert!(matches!(catalog.enumerate(), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn no_valid_pair_is_catalog_error() {
        let (_tmp, catalog) = catalog_with(&[]);
        assert!(matches!(catalog.enumerate(), Err(CatalogError::Empty(_))));

        let (_tmp, catalog) = catalog_with(&[("a.in", "1")]);
        assert!(matches!(catalog.enumerate(), Err(CatalogError::Empty(_))));
    }

    #[test]
    fn unreadable_dir_entry_is_catalog_error() {
        let (tmp, catalog) = catalog_with(&[("a.in", "1"), ("a.out", "1")]);
        let paths = vec![
            Ok(tmp.path().join("a.in")),
            Err(io::Error::new(io::ErrorKind::Other, "stale NFS handle")),
        ];
        let err = catalog.collect_pairs(paths).unwrap_err();
        let CatalogError::ReadDir(e) = err else {
            panic!("should be ReadDir: {:?}", err);
        };
        assert_eq!(e.path(), tmp.path());
    }

    #[test]
    #[cfg(unix)]
    fn dangling_input_symlink_is_still_a_testcase() {
        let (tmp, catalog) = catalog_with(&[("a.in", "1"), ("a.out", "1"), ("b.out", "2")]);
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("b.in")).unwrap();

        let entries = catalog.enumerate().unwrap();
        let names: Vec<_> = entries.testcases.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[tokio::test]
    async fn fs_testcase_reads_both_streams() {
        let (_tmp, catalog) = catalog_with(&[("a.in", "2 2\n"), ("a.out", "4\n")]);
        let entries = catalog.enumerate().unwrap();
        let t = &entries.testcases[0];
        assert_eq!(t.name(), "a");
        assert_eq!(t.input().await.unwrap(), b"2 2\n");
        assert_eq!(t.expected_output().await.unwrap(), b"4\n");
    }
}

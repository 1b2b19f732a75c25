use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::compiler;
use crate::testing::Limits;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub workspace: WorkspaceConfig,
    pub compile: CompileConfig,
    pub test: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub home: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub program: String,
    pub args: Vec<String>,
    pub source_filename: String,
    pub artifact_filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub dir: PathBuf,
    pub input_extension: String,
    pub output_extension: String,
    pub time_limit_ms: u64,
    pub stdout_capture_max_bytes: usize,
    pub stderr_capture_max_bytes: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("./runs"),
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            program: "g++".to_owned(),
            args: ["-std=c++17", "-O2", "-static", "#{source}", "-o", "#{artifact}"]
                .map(String::from)
                .to_vec(),
            source_filename: "solution.cpp".to_owned(),
            artifact_filename: "solution".to_owned(),
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            dir: PathBuf::from("./tests"),
            input_extension: "in".to_owned(),
            output_extension: "out".to_owned(),
            time_limit_ms: limits.time.as_millis() as u64,
            stdout_capture_max_bytes: limits.stdout_capture_max_bytes,
            stderr_capture_max_bytes: limits.stderr_capture_max_bytes,
        }
    }
}

impl TestConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            time: self.time_limit(),
            stdout_capture_max_bytes: self.stdout_capture_max_bytes,
            stderr_capture_max_bytes: self.stderr_capture_max_bytes,
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

fn strip_prefix_dot(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}

impl Config {
    pub const FILENAME: &str = "judge.toml";

    pub fn example_toml() -> anyhow::Result<String> {
        let file = Asset::get(Self::FILENAME)
            .with_context(|| format!("Missing embedded asset '{}'", Self::FILENAME))?;
        let toml = std::str::from_utf8(file.data.as_ref())
            .context("Embedded example config is not UTF-8")?;
        Ok(toml.to_owned())
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.validate()
            .with_context(|| format!("Invalid config: {:?}", filepath))?;
        if let Some(dir) = filepath.parent() {
            cfg.resolve_relative_paths(dir);
        }
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let cur_dir = cur_dir.as_ref();
        cur_dir
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
            .with_context(|| format!("Cannot find '{}'", Self::FILENAME))
    }

    /// Load the nearest config file, or fall back to the defaults rooted at `cur_dir`.
    pub fn load(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let cur_dir = cur_dir.as_ref();
        match Self::find_file_in_ancestors(cur_dir) {
            Ok(filepath) => {
                log::debug!("Using config {:?}", filepath);
                Self::from_toml_file(filepath)
            }
            Err(_) => {
                log::debug!("No {} found, using defaults", Self::FILENAME);
                let mut cfg = Self::default();
                cfg.resolve_relative_paths(cur_dir);
                Ok(cfg)
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.compile.program.is_empty(), "compile.program is empty");
        compiler::check_placeholders(&self.compile.args)?;
        ensure!(
            !self.compile.source_filename.is_empty() && !self.compile.artifact_filename.is_empty(),
            "compile.source_filename and compile.artifact_filename must not be empty"
        );
        ensure!(
            self.compile.source_filename != self.compile.artifact_filename,
            "compile.source_filename and compile.artifact_filename must differ"
        );
        ensure!(self.test.time_limit_ms > 0, "test.time_limit_ms must be positive");
        ensure!(
            self.test.input_extension != self.test.output_extension,
            "test.input_extension and test.output_extension must differ"
        );
        Ok(())
    }

    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        let with_base = |path: &Path| {
            if path.is_absolute() {
                path.to_owned()
            } else {
                base_dir.join(strip_prefix_dot(path))
            }
        };
        self.workspace.home = with_base(&self.workspace.home);
        self.test.dir = with_base(&self.test.dir);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn example_toml_should_be_parsable() {
        let toml = Config::example_toml().unwrap();
        let cfg = dbg!(Config::from_toml(&toml)).unwrap();
        cfg.validate().unwrap();

        let Config {
            source_config_file,
            workspace,
            compile,
            test,
        } = cfg;

        assert_eq!(source_config_file, None);
        assert_eq!(workspace.home, Path::new("./runs"));
        assert_eq!(compile, CompileConfig::default());
        assert_eq!(test, TestConfig::default());
        assert_eq!(test.time_limit(), Duration::from_secs(2));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = Config::from_toml("[test]\ntime_limit_ms = 500\n").unwrap();
        assert_eq!(cfg.compile, CompileConfig::default());
        assert_eq!(cfg.test.time_limit(), Duration::from_millis(500));
        assert_eq!(cfg.test.input_extension, "in");
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let cfg = Config::from_toml("[compile]\nargs = [\"#{src}\"]\n").unwrap();
        assert!(cfg.validate().is_err());

        let cfg = Config::from_toml("[test]\ntime_limit_ms = 0\n").unwrap();
        assert!(cfg.validate().is_err());

        let cfg = Config::from_toml("[test]\noutput_extension = \"in\"\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("problems/aplusb");
        fsutil::mkdir_all(&nested).unwrap();
        fsutil::write(
            tmp.path().join(Config::FILENAME),
            "[workspace]\nhome = \"./scratch\"\n[test]\ndir = \"/abs/tests\"\n",
        )
        .unwrap();

        let cfg = Config::load(&nested).unwrap();
        assert_eq!(
            cfg.source_config_file.as_deref(),
            Some(tmp.path().join(Config::FILENAME).as_path())
        );
        assert_eq!(cfg.workspace.home, tmp.path().join("scratch"));
        assert_eq!(cfg.test.dir, Path::new("/abs/tests"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config::load(tmp.path()).unwrap();
        assert_eq!(cfg.source_config_file, None);
        assert_eq!(cfg.workspace.home, tmp.path().join("runs"));
        assert_eq!(cfg.test.dir, tmp.path().join("tests"));
    }
}

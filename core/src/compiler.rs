use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::config::CompileConfig;
use crate::testing::runner::passthrough_env;
use crate::workspace::Workspace;

const SOURCE_VAR: &str = "source";
const ARTIFACT_VAR: &str = "artifact";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("Unknown placeholder '#{{{0}}}' in argument '{1}'")]
    Unknown(String, String),

    #[error("Unclosed placeholder in argument '{0}'")]
    Unclosed(String),
}

/// Compiler output shown to the submitter, with workspace paths already hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic(String);

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Compilation Error:\n{0}")]
    Rejected(Diagnostic),

    #[error("Failed to spawn compiler '{program}': {source}")]
    Toolchain {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Compiler succeeded but produced no '{0}'")]
    MissingArtifact(String),

    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error(transparent)]
    Io(#[from] fsutil::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Compiler {
    program: String,
    args: Vec<String>,
    source_filename: String,
    artifact_filename: String,
}

impl Diagnostic {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<&CompileConfig> for Compiler {
    fn from(cfg: &CompileConfig) -> Self {
        Self {
            program: cfg.program.clone(),
            args: cfg.args.clone(),
            source_filename: cfg.source_filename.clone(),
            artifact_filename: cfg.artifact_filename.clone(),
        }
    }
}

impl Compiler {
    /// Write `source` into the workspace and run the toolchain once.
    ///
    /// The toolchain runs inside the workspace with a cleared environment.
    /// On failure its stderr (or stdout, if stderr is empty) comes back as a
    /// [`Diagnostic`] with the workspace path replaced.
    pub async fn compile(&self, source: &str, ws: &Workspace) -> Result<Artifact, CompileError> {
        let source_path = ws.path(&self.source_filename);
        let artifact_path = ws.path(&self.artifact_filename);
        fsutil::write(&source_path, source)?;

        let vars = [
            (SOURCE_VAR, source_path.as_path()),
            (ARTIFACT_VAR, artifact_path.as_path()),
        ];
        let args = self
            .args
            .iter()
            .map(|arg| expand(arg, &vars))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Compiling: {} {}", self.program, ws.sanitize(&args.join(" ")));

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(ws.dir())
            .env_clear()
            .envs(passthrough_env())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CompileError::Toolchain {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            log::info!("Compiler exited with {}", output.status);
            let text = if output.stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout)
            } else {
                String::from_utf8_lossy(&output.stderr)
            };
            let text = if text.trim().is_empty() {
                format!("Compiler exited with {}", output.status).into()
            } else {
                text
            };
            return Err(CompileError::Rejected(Diagnostic(ws.sanitize(&text))));
        }

        if !artifact_path.is_file() {
            return Err(CompileError::MissingArtifact(
                self.artifact_filename.clone(),
            ));
        }
        fsutil::set_executable(&artifact_path)?;

        Ok(Artifact::new(artifact_path))
    }
}

/// Check that every `#{...}` in `args` names a known variable.
pub fn check_placeholders(args: &[String]) -> Result<(), PlaceholderError> {
    let dummy = Path::new("");
    let vars = [(SOURCE_VAR, dummy), (ARTIFACT_VAR, dummy)];
    args.iter().try_for_each(|arg| expand(arg, &vars).map(drop))
}

/// Expand `#{name}` with the matching path. `##` is a literal `#`; any other `#` is kept as is.
fn expand(arg: &str, vars: &[(&str, &Path)]) -> Result<String, PlaceholderError> {
    let mut res = String::with_capacity(arg.len() * 2);
    let mut rest = arg;

    while let Some(pos) = rest.find('#') {
        res.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(after) = after.strip_prefix('#') {
            res.push('#');
            rest = after;
        } else if let Some(inner) = after.strip_prefix('{') {
            let Some(end) = inner.find('}') else {
                return Err(PlaceholderError::Unclosed(arg.to_owned()));
            };
            let name = &inner[..end];
            let Some((_, value)) = vars.iter().find(|(k, _)| *k == name) else {
                return Err(PlaceholderError::Unknown(name.to_owned(), arg.to_owned()));
            };
            res.push_str(&value.to_string_lossy());
            rest = &inner[end + 1..];
        } else {
            res.push('#');
            rest = after;
        }
    }
    res.push_str(rest);
    Ok(res)
}

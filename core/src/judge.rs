use std::path::Path;

use uuid::Uuid;

use crate::compiler::{CompileError, Compiler};
use crate::config::Config;
use crate::report::JudgeReport;
use crate::testing::{
    CatalogError, Executor, Limits, ProcessExecutor, TestCatalog, TestRunner, TestVerdict,
};
use crate::workspace::{Workspace, WorkspaceHome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum SourceKind {
    #[strum(serialize = "C++")]
    Cpp,
}

impl SourceKind {
    pub fn from_filename(filename: impl AsRef<Path>) -> Option<Self> {
        let ext = filename.as_ref().extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "cpp" | "cc" | "cxx" | "c++" => Some(Self::Cpp),
            _ => None,
        }
    }
}

/// One program to be judged. Each instance gets a fresh id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    id: Uuid,
    filename: String,
    kind: SourceKind,
    source: String,
}

impl Submission {
    pub fn new(filename: impl Into<String>, kind: SourceKind, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            kind,
            source: source.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Ends a judging attempt without a report.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("Failed to prepare workspace")]
    Workspace(#[source] fsutil::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// The judging pipeline: compile once, then run every testcase in catalog order.
pub struct Judge<E: Executor = ProcessExecutor> {
    workspace_home: WorkspaceHome,
    compiler: Compiler,
    limits: Limits,
    executor: E,
}

impl Judge {
    pub fn new(workspace_home: WorkspaceHome, compiler: Compiler, limits: Limits) -> Self {
        Self {
            workspace_home,
            compiler,
            limits,
            executor: ProcessExecutor,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            WorkspaceHome::new(&cfg.workspace.home),
            Compiler::from(&cfg.compile),
            cfg.test.limits(),
        )
    }
}

impl<E: Executor> Judge<E> {
    pub fn executor<F: Executor>(self, executor: F) -> Judge<F> {
        Judge {
            workspace_home: self.workspace_home,
            compiler: self.compiler,
            limits: self.limits,
            executor,
        }
    }

    pub fn get_limits(&self) -> &Limits {
        &self.limits
    }

    pub fn get_workspace_home(&self) -> &WorkspaceHome {
        &self.workspace_home
    }

    pub async fn judge(
        &self,
        submission: &Submission,
        catalog: &TestCatalog,
    ) -> Result<JudgeReport, JudgeError> {
        self.judge_with_progress(submission, catalog, |_| ()).await
    }

    /// Like [`Judge::judge`], calling `on_verdict` as soon as each testcase is judged.
    pub async fn judge_with_progress<F>(
        &self,
        submission: &Submission,
        catalog: &TestCatalog,
        on_verdict: F,
    ) -> Result<JudgeReport, JudgeError>
    where
        F: FnMut(&TestVerdict),
    {
        let ws = self
            .workspace_home
            .acquire()
            .map_err(JudgeError::Workspace)?;
        log::info!(
            "Judging {} ({}) as submission {}",
            submission.filename(),
            submission.kind(),
            submission.id()
        );

        let res = self.judge_in(&ws, submission, catalog, on_verdict).await;
        ws.release();
        res
    }

    async fn judge_in<F>(
        &self,
        ws: &Workspace,
        submission: &Submission,
        catalog: &TestCatalog,
        mut on_verdict: F,
    ) -> Result<JudgeReport, JudgeError>
    where
        F: FnMut(&TestVerdict),
    {
        let artifact = self.compiler.compile(submission.source(), ws).await?;

        let entries = catalog.enumerate()?;
        log::info!(
            "Found {} testcases in {}",
            entries.testcases.len(),
            catalog.dir().to_string_lossy()
        );

        let runner = TestRunner::new(&self.executor, self.limits);
        let mut verdicts = Vec::with_capacity(entries.testcases.len());
        for t in &entries.testcases {
            let v = runner.run(&artifact, t).await;
            log::info!("Testcase {} ... {} {}", v.name, v.verdict, v.message);
            on_verdict(&v);
            verdicts.push(v);
        }

        Ok(JudgeReport::new(submission.id(), verdicts, entries.skipped))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn source_kind_from_filename() {
        for name in ["a.cpp", "dir/main.cc", "x.CXX", "y.c++"] {
            assert_eq!(SourceKind::from_filename(name), Some(SourceKind::Cpp), "{}", name);
        }
        for name in ["a.py", "Makefile", "a.c", ".cpp"] {
            assert_eq!(SourceKind::from_filename(name), None, "{}", name);
        }
        assert_eq!(SourceKind::Cpp.to_string(), "C++");
    }

    #[test]
    fn submissions_get_distinct_ids() {
        let a = Submission::new("a.cpp", SourceKind::Cpp, "int main(){}");
        let b = Submission::new("a.cpp", SourceKind::Cpp, "int main(){}");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.source(), b.source());
    }

    #[test]
    fn from_config_uses_test_limits() {
        let mut cfg = Config::default();
        cfg.test.time_limit_ms = 500;
        let judge = Judge::from_config(&cfg);
        assert_eq!(judge.get_limits().time, std::time::Duration::from_millis(500));
        assert_eq!(judge.get_workspace_home().dir(), cfg.workspace.home);
    }
}

use std::time::Duration;

use serde::{Serialize, Serializer};

use super::{
    compare::Comparison,
    runner::{ExecutionOutcome, Termination},
};

const STDERR_EXCERPT_MAX_CHARS: usize = 80;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Verdict {
    #[strum(serialize = "AC")]
    Accepted,
    #[strum(serialize = "WA")]
    WrongAnswer,
    #[strum(serialize = "TLE")]
    TimeLimitExceeded,
    #[strum(serialize = "RE")]
    RuntimeError,
    /// Judge-side fault, not a defect of the submission.
    #[strum(serialize = "SE")]
    SystemError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestVerdict {
    pub name: String,
    pub verdict: Verdict,
    pub message: String,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub status: Option<i32>,
    #[serde(skip)]
    pub stdout: String,
    #[serde(skip)]
    pub stderr: String,
    #[serde(skip)]
    pub expected: String,
}

fn serialize_millis<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(d.as_millis() as u64)
}

/// Decide the verdict for one testcase.
///
/// `comparison` is only consulted for a completed run; a completed run without
/// one means the expected output was unavailable, which is a judge-side fault.
pub fn classify(termination: &Termination, comparison: Option<&Comparison>) -> Verdict {
    use Verdict::*;
    match (termination, comparison) {
        (Termination::TimedOut, _) => TimeLimitExceeded,
        (Termination::Crashed, _) => RuntimeError,
        (Termination::SystemError(_), _) => SystemError,
        (Termination::Completed, Some(Comparison::Match)) => Accepted,
        (Termination::Completed, Some(Comparison::Mismatch(_))) => WrongAnswer,
        (Termination::Completed, None) => SystemError,
    }
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }

    pub fn long_name(self) -> &'static str {
        use Verdict::*;
        match self {
            Accepted => "Accepted",
            WrongAnswer => "Wrong Answer",
            TimeLimitExceeded => "Time Limit Exceeded",
            RuntimeError => "Runtime Error",
            SystemError => "System Error",
        }
    }
}

impl TestVerdict {
    pub fn new(
        name: impl Into<String>,
        outcome: ExecutionOutcome,
        comparison: Option<Comparison>,
        expected: Vec<u8>,
    ) -> Self {
        let verdict = classify(&outcome.termination, comparison.as_ref());
        let stderr = String::from_utf8_lossy(&outcome.stderr).into_owned();

        let message = match (verdict, &outcome.termination, &comparison) {
            (Verdict::Accepted, _, _) => format!("({:.3}s)", outcome.elapsed.as_secs_f64()),
            (Verdict::WrongAnswer, _, Some(Comparison::Mismatch(m))) => {
                format!("{}: {}", verdict.long_name(), m)
            }
            (Verdict::RuntimeError, _, _) => match stderr_excerpt(&stderr) {
                Some(line) => format!("{}: {}", verdict.long_name(), line),
                None => verdict.long_name().to_owned(),
            },
            (Verdict::SystemError, Termination::SystemError(cause), _) => {
                format!("Error: {}", cause)
            }
            (Verdict::SystemError, _, _) => "Error: expected output is unavailable".to_owned(),
            _ => verdict.long_name().to_owned(),
        };

        Self {
            name: name.into(),
            verdict,
            message,
            elapsed: outcome.elapsed,
            status: outcome.status,
            stdout: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            stderr,
            expected: String::from_utf8_lossy(&expected).into_owned(),
        }
    }
}

fn stderr_excerpt(stderr: &str) -> Option<String> {
    let line = stderr.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= STDERR_EXCERPT_MAX_CHARS {
        return Some(line.to_owned());
    }
    let mut res: String = line.chars().take(STDERR_EXCERPT_MAX_CHARS).collect();
    res.push_str("...");
    Some(res)
}

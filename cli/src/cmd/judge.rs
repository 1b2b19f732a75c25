use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use localjudge_core::testing::TestCatalog;
use localjudge_core::{style, Judge, SourceKind, Submission};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg()] // positional argument
    pub source_file: PathBuf,

    /// Directory of `<name>.in` / `<name>.out` pairs
    #[arg(short = 'd', long)]
    pub tests: Option<PathBuf>,

    /// Per-testcase time limit in milliseconds
    #[arg(short = 't', long)]
    pub time_limit: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let mut cfg = global_args.load_config()?;
    if let Some(dir) = &args.tests {
        cfg.test.dir = dir.clone();
    }
    if let Some(ms) = args.time_limit {
        anyhow::ensure!(ms > 0, "--time-limit must be positive");
        cfg.test.time_limit_ms = ms;
    }

    let filename = args
        .source_file
        .file_name()
        .context("Source file has no file name")?
        .to_string_lossy()
        .into_owned();
    let kind = SourceKind::from_filename(&filename)
        .with_context(|| format!("Unsupported source file: {}", filename))?;
    let source = fsutil::read_to_string(&args.source_file).context("Failed to read source")?;
    let submission = Submission::new(filename, kind, source);

    let catalog = TestCatalog::from(&cfg.test);
    let judge = Judge::from_config(&cfg);

    let res = if args.json {
        judge.judge(&submission, &catalog).await
    } else {
        judge
            .judge_with_progress(&submission, &catalog, style::print_verdict_line)
            .await
    };

    let report = match res {
        Ok(report) => report,
        Err(e) => {
            style::print_judge_error(&e);
            return Ok(ExitCode::from(2));
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        style::print_report(&report);
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

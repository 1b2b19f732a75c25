use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::compiler::CompileError;
use crate::judge::JudgeError;
use crate::report::JudgeReport;
use crate::testing::{TestVerdict, Verdict};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Accepted => Color::Green,
                WrongAnswer => Color::Yellow,
                TimeLimitExceeded => Color::Red,
                RuntimeError => Color::Magenta,
                SystemError => Color::Blue,
            };
        }

        let (r, g, b) = match self {
            Accepted => (30, 180, 40),
            WrongAnswer => (210, 138, 4),
            TimeLimitExceeded => (220, 42, 42),
            RuntimeError => (171, 40, 200),
            SystemError => (70, 110, 220),
        };
        Color::TrueColor { r, g, b }
    }
}

pub fn judge_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

fn terminal_cols() -> usize {
    terminal::size().map_or(40, |(cols, _)| cols as usize)
}

/// `Testcase a ... AC  [12ms]`
pub fn print_verdict_line(v: &TestVerdict) {
    println!(
        "Testcase {} ... {}{} [{}ms]",
        v.name,
        self::judge_icon(v.verdict),
        " ".repeat(3usize.saturating_sub(v.verdict.to_string().len())),
        v.elapsed.as_millis(),
    );
}

pub fn print_verdict_detail(v: &TestVerdict) {
    let cols = terminal_cols();
    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    println!(
        "\n{}: {} [{}ms]\n{}",
        v.name.color(Color::BrightYellow).bold(),
        self::judge_icon(v.verdict),
        v.elapsed.as_millis(),
        bold_bar,
    );
    println!("{}", v.message.bold());

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE
                .repeat(cols.saturating_sub(s.len() + 1))
                .bright_black(),
        )
    }

    fn print_lines(text: &str) {
        let lines: Vec<_> = text.lines().collect();
        if lines.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
            return;
        }
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_end();
            print!("{}", trimmed);

            let num_trailing_whitespace = line.len() - trimmed.len();
            if num_trailing_whitespace > 0 {
                print!(
                    "{}{}",
                    " ".repeat(num_trailing_whitespace).on_red(),
                    "(Trailing whitespace)".bright_red().bold()
                );
            }

            let is_last_line = i + 1 == lines.len();
            if is_last_line && !text.ends_with('\n') {
                print!("{}", " Missing new line ".on_yellow().black().bold());
            }
            println!();
        }
    }

    // Output is only compared for runs that completed.
    if matches!(v.verdict, Verdict::WrongAnswer | Verdict::Accepted) {
        print_sub_title("[expected]", cols);
        print_lines(&v.expected);

        print_sub_title("[stdout]", cols);
        print_lines(&v.stdout);
    }

    if !v.stderr.is_empty() {
        print_sub_title("[stderr]", cols);
        print!("{}", v.stderr);
        if !v.stderr.ends_with('\n') {
            println!();
        }
    }

    println!("{}", bold_bar);
}

pub fn print_report_summary(report: &JudgeReport) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let total = report.total();
    let passed = report.passed();

    if report.all_passed() {
        let msg = format!("All {} tests passed ✨", total);
        print!("{}", msg.green());
    } else {
        let summary_msg = if passed > 0 {
            format!("{}/{} tests failed 💣", total - passed, total)
        } else {
            format!("All {} tests failed 💀", total)
        };

        let detail_msg = report
            .count_by_verdict()
            .into_iter()
            .filter(|(verdict, _)| !verdict.is_accepted())
            .map(|(verdict, cnt)| {
                format!(
                    "{}{}{}",
                    self::judge_icon(verdict),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(
        " {} score {} ({:.1}%)",
        bar,
        report.score().bold(),
        report.percentage()
    );

    if !report.skipped().is_empty() {
        println!(
            "{} {}",
            "Skipped (no expected output):".color(log::Level::Warn.color()),
            report.skipped().join(", ")
        );
    }
}

/// Detail blocks for every failed testcase, then the summary.
pub fn print_report(report: &JudgeReport) {
    for v in report.verdicts().iter().filter(|v| !v.verdict.is_accepted()) {
        print_verdict_detail(v);
    }
    println!();
    print_report_summary(report);
}

pub fn print_judge_error(e: &JudgeError) {
    let level = log::Level::Error;
    match e {
        JudgeError::Compile(CompileError::Rejected(diagnostic)) => {
            eprintln!("{}", "Compilation Error".color(level.color()).bold());
            eprint!("{}", diagnostic);
            if !diagnostic.as_str().ends_with('\n') {
                eprintln!();
            }
        }
        JudgeError::Workspace(inner) => {
            eprintln!("{}: {}: {}", "Error".color(level.color()).bold(), e, inner);
        }
        _ => eprintln!("{}: {}", "Error".color(level.color()).bold(), e),
    }
}

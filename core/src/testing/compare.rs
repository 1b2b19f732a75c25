//! Line-oriented, whitespace-tolerant output comparison.
//!
//! Both streams are split on `\n`. Each line loses its trailing `\r`, spaces and
//! tabs, and empty lines at the end of a stream are dropped. Interior empty lines
//! are significant.

use std::fmt;

const EXCERPT_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch(Mismatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// First differing line, 1-based.
    Line {
        line: usize,
        expected: String,
        actual: String,
    },
    /// All compared lines equal, but one stream has more of them.
    LineCount { expected: usize, actual: usize },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mismatch::Line {
                line,
                expected,
                actual,
            } => write!(
                f,
                "line {}: expected `{}`, found `{}`",
                line, expected, actual
            ),
            Mismatch::LineCount { expected, actual } => {
                write!(f, "expected {} lines, found {}", expected, actual)
            }
        }
    }
}

pub fn compare(actual: &[u8], expected: &[u8]) -> Comparison {
    let actual = normalized_lines(actual);
    let expected = normalized_lines(expected);

    let first_diff = actual
        .iter()
        .zip(&expected)
        .position(|(a, e)| a != e);

    match first_diff {
        Some(i) => Comparison::Mismatch(Mismatch::Line {
            line: i + 1,
            expected: excerpt(expected[i]),
            actual: excerpt(actual[i]),
        }),
        None if actual.len() != expected.len() => Comparison::Mismatch(Mismatch::LineCount {
            expected: expected.len(),
            actual: actual.len(),
        }),
        None => Comparison::Match,
    }
}

fn normalized_lines(bytes: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = bytes.split(|&b| b == b'\n').map(trim_line_end).collect();
    while lines.last().map_or(false, |line| line.is_empty()) {
        lines.pop();
    }
    lines
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let len = line
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t' | b'\r'))
        .map_or(0, |i| i + 1);
    &line[..len]
}

fn excerpt(line: &[u8]) -> String {
    let s = String::from_utf8_lossy(line);
    if s.chars().count() <= EXCERPT_MAX_CHARS {
        return s.into_owned();
    }
    let mut res: String = s.chars().take(EXCERPT_MAX_CHARS).collect();
    res.push_str("...");
    res
}

#[cfg(test)]
mod test {
    use super::*;

    fn line_mismatch(line: usize, expected: &str, actual: &str) -> Comparison {
        Comparison::Mismatch(Mismatch::Line {
            line,
            expected: expected.to_owned(),
            actual: actual.to_owned(),
        })
    }

    #[test]
    fn identical_streams_match() {
        for x in ["", "\n", "3", "1 2 3\n4 5 6\n", "a\n\n\nb", "  x  \r\n", "\u{1F600}\n"] {
            assert_eq!(compare(x.as_bytes(), x.as_bytes()), Comparison::Match, "{:?}", x);
        }
        let binary = [0u8, 159, 146, 150, b'\n', 255];
        assert_eq!(compare(&binary, &binary), Comparison::Match);
    }

    #[test]
    fn trailing_whitespace_is_ignored() {
        assert!(compare(b"3\n", b"3").is_match());
        assert!(compare(b"3", b"3\n\n\n").is_match());
        assert!(compare(b"1 2 \t\r\n3\r\n", b"1 2\n3\n").is_match());
        assert!(compare(b"3\n   \n\t\n", b"3").is_match());
        assert!(compare(b"", b"\n\n").is_match());
    }

    #[test]
    fn leading_and_interior_whitespace_matters() {
        assert_eq!(compare(b" 3\n", b"3\n"), line_mismatch(1, "3", " 3"));
        assert_eq!(compare(b"1  2\n", b"1 2\n"), line_mismatch(1, "1 2", "1  2"));
        assert_eq!(compare(b"a\nb\n", b"a\n\nb\n"), line_mismatch(2, "", "b"));
    }

    #[test]
    fn swapped_lines_mismatch_at_first_line() {
        assert_eq!(compare(b"3\n4\n", b"4\n3\n"), line_mismatch(1, "4", "3"));
        assert_eq!(compare(b"1\n2\n5\n", b"1\n2\n3\n"), line_mismatch(3, "3", "5"));
    }

    #[test]
    fn line_count_discrepancy() {
        assert_eq!(
            compare(b"1\n2\n", b"1\n2\n3\n"),
            Comparison::Mismatch(Mismatch::LineCount {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            compare(b"4\n", b""),
            Comparison::Mismatch(Mismatch::LineCount {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn long_lines_are_truncated_in_detail() {
        let expected = "x".repeat(100);
        let actual = "y".repeat(100);
        let Comparison::Mismatch(Mismatch::Line {
            expected: e,
            actual: a,
            ..
        }) = compare(actual.as_bytes(), expected.as_bytes())
        else {
            panic!("should mismatch");
        };
        assert_eq!(e, format!("{}...", "x".repeat(EXCERPT_MAX_CHARS)));
        assert_eq!(a, format!("{}...", "y".repeat(EXCERPT_MAX_CHARS)));
    }

    #[test]
    fn mismatch_display() {
        let m = Mismatch::Line {
            line: 2,
            expected: "4".to_owned(),
            actual: "5".to_owned(),
        };
        assert_eq!(m.to_string(), "line 2: expected `4`, found `5`");
        assert_eq!(
            Mismatch::LineCount {
                expected: 2,
                actual: 1
            }
            .to_string(),
            "expected 2 lines, found 1"
        );
    }
}

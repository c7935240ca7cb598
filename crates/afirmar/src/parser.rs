//! Assertion Parser
//!
//! Stateless line scanner turning document text into a lazy sequence of
//! structural events (headings and arithmetic assertions). The scanner has
//! no knowledge of tree shape or execution; it is a single linear pass
//! over the lines with no backtracking.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A span of text within a document, in line/column coordinates (0-based).
///
/// Columns are byte offsets into the line's UTF-8 text, matching what
/// the scanner's regexes report. Hosts that address columns in
/// characters must convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    /// Line number (0-based)
    pub line: u32,
    /// Start byte offset within the line (inclusive)
    pub start_col: u32,
    /// End byte offset within the line (exclusive)
    pub end_col: u32,
}

impl TextRange {
    /// Create a range covering `[start_col, end_col)` on one line
    #[must_use]
    pub const fn new(line: u32, start_col: u32, end_col: u32) -> Self {
        Self {
            line,
            start_col,
            end_col,
        }
    }
}

/// Binary arithmetic operator of an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication (`*`)
    Mul,
    /// Division (`/`)
    Div,
}

impl Operator {
    /// Parse an operator from its single-character symbol
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            _ => None,
        }
    }

    /// The operator's source symbol
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One arithmetic equality check, `left op right = expected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssertionCheck {
    /// Left operand
    pub left: i64,
    /// Operator
    pub op: Operator,
    /// Right operand
    pub right: i64,
    /// Expected result
    pub expected: i64,
}

impl AssertionCheck {
    /// Evaluate the check, returning a diagnostic message on failure.
    ///
    /// Addition, subtraction and multiplication use checked 64-bit
    /// arithmetic; overflow is a failure. Division compares exactly as
    /// rationals: `a / b = c` holds iff `b != 0` and `a == b * c`, so an
    /// inexact quotient (`7 / 2 = 3`) fails rather than truncating.
    pub fn evaluate(&self) -> Result<(), String> {
        let Self {
            left,
            op,
            right,
            expected,
        } = *self;

        let actual = match op {
            Operator::Add => left.checked_add(right),
            Operator::Sub => left.checked_sub(right),
            Operator::Mul => left.checked_mul(right),
            Operator::Div => {
                if right == 0 {
                    return Err(format!("{left} / 0 is undefined (division by zero)"));
                }
                return match right.checked_mul(expected) {
                    Some(product) if product == left => Ok(()),
                    _ => Err(format!(
                        "Expected {left} {op} {right} = {expected} exactly, but it does not hold"
                    )),
                };
            }
        };

        match actual {
            Some(value) if value == expected => Ok(()),
            Some(value) => Err(format!(
                "Expected {left} {op} {right} = {expected} but got {value}"
            )),
            None => Err(format!("{left} {op} {right} overflows 64-bit arithmetic")),
        }
    }
}

impl std::fmt::Display for AssertionCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} = {}",
            self.left, self.op, self.right, self.expected
        )
    }
}

/// A structural event produced by the scanner, in line order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// A heading line (`#`-prefixed); the range spans the whole line
    Heading {
        /// Range of the heading line
        range: TextRange,
        /// Heading title, `#` markers stripped
        name: String,
        /// Nesting depth (number of `#` characters, >= 1)
        depth: u32,
    },
    /// An assertion line; the range spans exactly the matched prefix
    Assertion {
        /// Range of the matched assertion text
        range: TextRange,
        /// The parsed check
        check: AssertionCheck,
    },
}

impl ParseEvent {
    /// The event's source range
    #[must_use]
    pub const fn range(&self) -> TextRange {
        match self {
            Self::Heading { range, .. } | Self::Assertion { range, .. } => *range,
        }
    }
}

/// Line scanner holding the compiled assertion and heading patterns.
///
/// A line matching both patterns is classified as an assertion: the
/// assertion pattern is attempted first and the heading pattern only
/// applies when it did not match.
#[derive(Debug, Clone)]
pub struct AssertionScanner {
    assertion_re: Regex,
    heading_re: Regex,
}

impl Default for AssertionScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertionScanner {
    /// Create a scanner with the fixed assertion/heading patterns
    #[must_use]
    pub fn new() -> Self {
        Self {
            assertion_re: Regex::new(r"^([0-9]+)\s*([+*/-])\s*([0-9]+)\s*=\s*([0-9]+)")
                .expect("assertion pattern is valid"),
            heading_re: Regex::new(r"^(#+)\s*(.+)$").expect("heading pattern is valid"),
        }
    }

    /// Scan document text, yielding events lazily in line order.
    ///
    /// Lines matching neither pattern yield nothing.
    pub fn scan<'a>(&'a self, text: &'a str) -> impl Iterator<Item = ParseEvent> + 'a {
        text.lines()
            .enumerate()
            .filter_map(move |(line_no, line)| self.scan_line(line_no as u32, line))
    }

    /// Classify a single line
    fn scan_line(&self, line_no: u32, line: &str) -> Option<ParseEvent> {
        if let Some(captures) = self.assertion_re.captures(line) {
            let matched = captures.get(0)?;
            // Operands are bounded digit runs; out-of-range literals are
            // treated as non-matching lines.
            let left = captures[1].parse().ok()?;
            let op = Operator::from_symbol(&captures[2])?;
            let right = captures[3].parse().ok()?;
            let expected = captures[4].parse().ok()?;

            return Some(ParseEvent::Assertion {
                range: TextRange::new(line_no, 0, matched.end() as u32),
                check: AssertionCheck {
                    left,
                    op,
                    right,
                    expected,
                },
            });
        }

        if let Some(captures) = self.heading_re.captures(line) {
            return Some(ParseEvent::Heading {
                range: TextRange::new(line_no, 0, line.len() as u32),
                name: captures[2].to_string(),
                depth: captures[1].len() as u32,
            });
        }

        None
    }
}

//! Language-agnostic code element counting for the complexity metric.
//!
//! Source is first reduced to code only: comments are removed and string
//! literals are blanked out (their count is kept, they are constants). The
//! remaining text is scanned with a handful of cross-language patterns.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::models::ElementCounts;

/// Per-category weights applied when computing density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementWeights {
    pub constants: f64,
    pub calls: f64,
    pub branches: f64,
    pub loops: f64,
    pub assignments: f64,
}

impl Default for ElementWeights {
    fn default() -> Self {
        Self {
            constants: 1.0,
            calls: 2.0,
            branches: 3.0,
            loops: 3.0,
            assignments: 1.0,
        }
    }
}

static CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid call regex"));
static ITERATOR_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(?:map|filter|forEach|reduce|flatMap|for_each|fold|filter_map|flat_map|some|every)\s*\(")
        .expect("valid iterator regex")
});
static BRANCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:if|elif|case|catch|except|switch|guard|unless)\b|\bmatch\s")
        .expect("valid branch regex")
});
static TERNARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\?\s").expect("valid ternary regex"));
static LOOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:for|while|loop|do|until|foreach)\b").expect("valid loop regex")
});
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("valid number regex"));
static LITERAL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:true|false|null|nil|None|True|False|undefined)\b")
        .expect("valid literal regex")
});

/// Words followed by `(` that are not calls
const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "switch", "catch", "except", "return", "function",
    "fn", "def", "match", "with", "sizeof", "typeof", "loop", "until", "foreach", "and", "or",
    "not", "in", "await", "yield", "throw", "case",
];

/// Comment syntax family, chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `# ...`
    Hash,
    /// `// ...` and `/* ... */`
    CStyle,
}

impl CommentStyle {
    pub fn for_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "py" | "rb" | "sh" | "bash" | "zsh" | "yaml" | "yml" | "toml" | "r" | "pl" => {
                Self::Hash
            }
            _ => Self::CStyle,
        }
    }
}

/// Code with comments removed and string contents blanked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedSource {
    pub code: String,
    pub string_literals: u32,
}

/// Remove comments and string literals, keeping line structure.
pub fn strip_comments_and_strings(source: &str, extension: &str) -> StrippedSource {
    let style = CommentStyle::for_extension(extension);
    let rust_chars = extension.eq_ignore_ascii_case("rs");
    let chars: Vec<char> = source.chars().collect();
    let mut code = String::with_capacity(source.len());
    let mut string_literals = 0u32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match (style, c, next) {
            (CommentStyle::Hash, '#', _) | (CommentStyle::CStyle, '/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            (CommentStyle::CStyle, '/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        code.push('\n');
                    }
                    i += 1;
                }
                i += 2;
                continue;
            }
            _ => {}
        }

        if c == '"'
            || c == '`'
            || (c == '\'' && !rust_chars)
            || (c == '\'' && is_char_literal(&chars, i))
        {
            if let Some(end) = string_end(&chars, i) {
                string_literals += 1;
                code.push(' ');
                code.extend(chars[i..end].iter().filter(|ch| **ch == '\n'));
                i = end;
                continue;
            }
        }

        code.push(c);
        i += 1;
    }

    StrippedSource {
        code,
        string_literals,
    }
}

/// Rust char literals: `'x'` or `'\n'`; anything else is a lifetime.
fn is_char_literal(chars: &[char], start: usize) -> bool {
    match (chars.get(start + 1), chars.get(start + 2), chars.get(start + 3)) {
        (Some('\\'), Some(_), _) => true,
        (Some(_), Some('\''), _) => true,
        _ => false,
    }
}

/// Index just past the literal opening at `start`, if it closes.
///
/// Triple quotes and backticks may span lines; other literals must close on
/// the line they open.
fn string_end(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    if triple {
        let mut i = start + 3;
        while i + 2 < chars.len() {
            if chars[i] == quote && chars[i + 1] == quote && chars[i + 2] == quote {
                return Some(i + 3);
            }
            i += 1;
        }
        return None;
    }

    let multiline = quote == '`';
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\n' if !multiline => return None,
            ch if ch == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Count `=` assignment operators, skipping comparisons and arrows.
///
/// Compound assignments (`+=`, `<<=`, `>>=`, `:=`) count once.
fn count_assignments(code: &str) -> u32 {
    let chars: Vec<char> = code.chars().collect();
    let mut count = 0;
    for (i, &c) in chars.iter().enumerate() {
        if c != '=' {
            continue;
        }
        let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
        let prev2 = i.checked_sub(2).and_then(|p| chars.get(p)).copied();
        let next = chars.get(i + 1).copied();

        if matches!(next, Some('=' | '>')) {
            continue;
        }
        match prev {
            Some('=' | '!') => continue,
            Some(op @ ('<' | '>')) if prev2 != Some(op) => continue,
            _ => count += 1,
        }
    }
    count
}

/// Count code elements in one file's source.
pub fn count_elements(source: &str, extension: &str) -> ElementCounts {
    let stripped = strip_comments_and_strings(source, extension);
    let code = stripped.code.as_str();

    let iterator_calls = ITERATOR_METHOD.find_iter(code).count() as u32;
    let all_calls = CALL
        .captures_iter(code)
        .filter(|caps| !NON_CALL_KEYWORDS.contains(&&caps[1]))
        .count() as u32;

    ElementCounts {
        constants: stripped.string_literals
            + NUMBER.find_iter(code).count() as u32
            + LITERAL_KEYWORD.find_iter(code).count() as u32,
        calls: all_calls.saturating_sub(iterator_calls),
        branches: (BRANCH.find_iter(code).count() + TERNARY.find_iter(code).count()) as u32,
        loops: LOOP.find_iter(code).count() as u32 + iterator_calls,
        assignments: count_assignments(code),
        lines: code.lines().filter(|l| !l.trim().is_empty()).count() as u32,
    }
}

/// Weighted element count per line; 0 for a file with no code lines.
pub fn density(counts: &ElementCounts, weights: &ElementWeights) -> f64 {
    if counts.lines == 0 {
        return 0.0;
    }
    let weighted = f64::from(counts.constants) * weights.constants
        + f64::from(counts.calls) * weights.calls
        + f64::from(counts.branches) * weights.branches
        + f64::from(counts.loops) * weights.loops
        + f64::from(counts.assignments) * weights.assignments;
    weighted / f64::from(counts.lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_c_style_comments_and_strings() {
        let source = "let a = \"if (x)\"; // call(y)\n/* for\n while */ b();";
        let stripped = strip_comments_and_strings(source, "js");
        assert_eq!(stripped.string_literals, 1);
        assert!(!stripped.code.contains("call"));
        assert!(!stripped.code.contains("while"));
        assert!(stripped.code.contains("b()"));
        assert_eq!(stripped.code.lines().count(), 3);
    }

    #[test]
    fn test_strip_hash_comments() {
        let stripped = strip_comments_and_strings("x = 1  # if y: z()\n'''doc\nstring'''\n", "py");
        assert_eq!(stripped.string_literals, 1);
        assert!(!stripped.code.contains("z()"));
    }

    #[test]
    fn test_rust_lifetimes_are_not_strings() {
        let stripped = strip_comments_and_strings("fn f<'a>(x: &'a str) -> char { 'c' }", "rs");
        assert_eq!(stripped.string_literals, 1);
        assert!(stripped.code.contains("&'a str"));
    }

    #[test]
    fn test_assignment_operators() {
        assert_eq!(count_assignments("a = 1"), 1);
        assert_eq!(count_assignments("a += 1; b -= 2"), 2);
        assert_eq!(count_assignments("a == b; c === d; e != f"), 0);
        assert_eq!(count_assignments("a <= b; c >= d; e => f"), 0);
        assert_eq!(count_assignments("a <<= 1; b >>= 2"), 2);
        assert_eq!(count_assignments("x := 5"), 1);
    }

    #[test]
    fn test_ternary_but_not_nullish() {
        let counts =
            count_elements("const a = b ? c : d;\nconst e = f ?? g;\nconst h = i?.j;", "ts");
        assert_eq!(counts.branches, 1);
    }

    #[test]
    fn test_count_elements_javascript() {
        let source = r#"
function total(items) {
  let sum = 0;
  for (const item of items) {
    if (item.price > 10) {
      sum += compute(item, "usd");
    }
  }
  return items.map(x => x.price).length ? sum : null;
}
"#;
        let counts = count_elements(source, "js");

        assert_eq!(counts.lines, 9);
        // 0, 10, "usd", null
        assert_eq!(counts.constants, 4);
        // total( is a declaration but still matches the call shape; compute(
        assert_eq!(counts.calls, 2);
        // if, ternary
        assert_eq!(counts.branches, 2);
        // for, .map(
        assert_eq!(counts.loops, 2);
        // sum = 0, sum +=
        assert_eq!(counts.assignments, 2);
    }

    #[test]
    fn test_density() {
        let weights = ElementWeights::default();
        let counts = ElementCounts {
            constants: 2,
            calls: 1,
            branches: 1,
            loops: 0,
            assignments: 1,
            lines: 4,
        };
        // (2 + 2 + 3 + 1) / 4
        assert!((density(&counts, &weights) - 2.0).abs() < f64::EPSILON);
        assert!(density(&ElementCounts::default(), &weights).abs() < f64::EPSILON);
    }
}

// ABOUTME: Wildcard pattern matching for website URL patterns and page path/filename patterns.
// ABOUTME: Compiles `*` wildcards into a small tagged pattern type instead of building regexes.

//! Wildcard matching.
//!
//! Configuration authors write patterns such as `*://example.com/*` or
//! `*test.html`. Only `*` is special: it matches any run of characters
//! (including none). Every other character, `.` and `?` included, is literal.
//! All matching is case-insensitive.
//!
//! Key behaviors:
//! - URL patterns starting with `file://` match any `file://` URL.
//! - URL patterns containing `://` must match the whole URL; others may match
//!   anywhere inside it.
//! - Page patterns containing `*` and not starting with `/` are compared
//!   against the last path segment only.

/// A compiled, lowercase wildcard pattern.
///
/// Shapes are picked at compile time so the common cases match with a single
/// string operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardPattern {
    /// `*` (or `**`...): matches everything.
    Any,
    /// No wildcard at all.
    Exact(String),
    /// `abc*`
    Prefix(String),
    /// `*abc`
    Suffix(String),
    /// `*abc*`
    Contains(String),
    /// Everything else: an anchored head, ordered middle literals, an anchored tail.
    /// `head` or `tail` is empty when the pattern starts or ends with `*`.
    Sequence {
        head: String,
        middle: Vec<String>,
        tail: String,
    },
}

impl WildcardPattern {
    /// Compiles a pattern that must match the whole input.
    pub fn compile(pattern: &str) -> Self {
        let lowered = pattern.to_lowercase();
        let parts: Vec<&str> = lowered.split('*').collect();
        if parts.len() == 1 {
            return WildcardPattern::Exact(lowered);
        }

        let head = parts[0];
        let tail = parts[parts.len() - 1];
        let middle: Vec<String> = parts[1..parts.len() - 1]
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();

        match (head.is_empty(), middle.len(), tail.is_empty()) {
            (true, 0, true) => WildcardPattern::Any,
            (true, 0, false) => WildcardPattern::Suffix(tail.to_string()),
            (false, 0, true) => WildcardPattern::Prefix(head.to_string()),
            (true, 1, true) => WildcardPattern::Contains(middle[0].clone()),
            _ => WildcardPattern::Sequence {
                head: head.to_string(),
                middle,
                tail: tail.to_string(),
            },
        }
    }

    /// Compiles a pattern that may match anywhere inside the input.
    pub fn compile_unanchored(pattern: &str) -> Self {
        Self::compile(&format!("*{}*", pattern))
    }

    /// Tests `input` against the pattern, ignoring case.
    pub fn matches(&self, input: &str) -> bool {
        let input = input.to_lowercase();
        match self {
            WildcardPattern::Any => true,
            WildcardPattern::Exact(s) => input == *s,
            WildcardPattern::Prefix(s) => input.starts_with(s.as_str()),
            WildcardPattern::Suffix(s) => input.ends_with(s.as_str()),
            WildcardPattern::Contains(s) => input.contains(s.as_str()),
            WildcardPattern::Sequence { head, middle, tail } => {
                if input.len() < head.len() + tail.len()
                    || !input.starts_with(head.as_str())
                    || !input.ends_with(tail.as_str())
                {
                    return false;
                }
                let mut rest = &input[head.len()..input.len() - tail.len()];
                for literal in middle {
                    match rest.find(literal.as_str()) {
                        Some(idx) => rest = &rest[idx + literal.len()..],
                        None => return false,
                    }
                }
                true
            }
        }
    }
}

/// Returns true when the pattern targets local files.
pub fn is_file_pattern(pattern: &str) -> bool {
    pattern.starts_with("file://")
}

/// Matches a URL against a website-level pattern.
pub fn match_url_pattern(url: &str, pattern: &str) -> bool {
    if is_file_pattern(pattern) {
        return url.starts_with("file://");
    }
    let compiled = if pattern.contains("://") {
        WildcardPattern::compile(pattern)
    } else {
        WildcardPattern::compile_unanchored(pattern)
    };
    compiled.matches(url)
}

/// Matches a whole path against a pattern, anchored at both ends.
pub fn match_path_pattern(path: &str, pattern: &str) -> bool {
    WildcardPattern::compile(pattern).matches(path)
}

/// Matches a page rule's pattern, switching to filename matching for
/// patterns like `*test.html`.
pub fn match_page_pattern(path: &str, pattern: &str) -> bool {
    if pattern.contains('*') && !pattern.starts_with('/') {
        match_path_pattern(file_name(path), pattern)
    } else {
        match_path_pattern(path, pattern)
    }
}

/// The last segment of a `/` or `\` separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

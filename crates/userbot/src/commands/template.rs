//! Command templates with bracketed argument placeholders.
//!
//! A template such as `/order [order_id]` is literal text interleaved with
//! balanced bracket groups. Literal text must appear verbatim in the command
//! line; each group accepts one argument token. Groups may nest
//! (`[user:[id]]` is a single placeholder named `user:[id]`).
//!
//! An argument token is a non-empty run of characters with balanced brackets
//! that contains no whitespace outside of brackets, so `foo[bar]` and
//! `[two words]` are single tokens. A token that is one whole bracket group
//! is returned with its outer brackets stripped.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// The matcher captured a different number of arguments than the template
/// declares. Indicates a defect in the matcher, not bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("template {template:?} declares {expected} placeholders but {captured} were captured")]
pub struct MatchArityError {
    pub template: String,
    pub expected: usize,
    pub captured: usize,
}

/// Ordered arguments extracted from a command line, keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    entries: Vec<(String, String)>,
}

impl Arguments {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Value of the first placeholder called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Values in template order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, value)| value.as_str())
    }

    /// (placeholder, value) pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map view; for repeated placeholder names the first value wins.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for (key, value) in &self.entries {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Placeholder name, outer brackets removed.
    Placeholder(String),
}

/// Compiled command template.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    raw: String,
    segments: Vec<Segment>,
    /// Leading literal token used for quick rejection.
    prefix: Option<String>,
}

impl CommandTemplate {
    /// Compile a template. Unbalanced brackets are treated as literal text.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let groups = bracket_groups(&raw);

        let mut segments = Vec::new();
        let mut cursor = 0;
        for &(start, end) in &groups {
            if start > cursor {
                segments.push(Segment::Literal(raw[cursor..start].to_string()));
            }
            segments.push(Segment::Placeholder(raw[start + 1..end - 1].to_string()));
            cursor = end;
        }
        if cursor < raw.len() {
            segments.push(Segment::Literal(raw[cursor..].to_string()));
        }

        // The quick check is only sound when the leading token is pure literal.
        let leading = leading_token(&raw);
        let prefix = match groups.first() {
            Some(&(start, _)) if start < leading.len() => None,
            _ => Some(leading.to_string()),
        };

        Self {
            raw,
            segments,
            prefix,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in template order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a command line and extract its arguments.
    ///
    /// Returns `Ok(None)` when the line does not fit the template.
    pub fn try_match(&self, line: &str) -> Result<Option<Arguments>, MatchArityError> {
        if let Some(prefix) = &self.prefix {
            if leading_token(line) != prefix {
                return Ok(None);
            }
        }

        let mut matcher = Matcher::new(&self.segments, line);
        if !matcher.run(0, 0) {
            return Ok(None);
        }

        let captures = matcher.captures.iter().map(|r| &line[r.clone()]).collect();
        self.bind(captures).map(Some)
    }

    fn bind(&self, captures: Vec<&str>) -> Result<Arguments, MatchArityError> {
        let names: Vec<&str> = self.placeholders().collect();
        if names.len() != captures.len() {
            return Err(MatchArityError {
                template: self.raw.clone(),
                expected: names.len(),
                captured: captures.len(),
            });
        }

        let entries = names
            .into_iter()
            .zip(captures)
            .map(|(name, token)| (name.to_string(), strip_brackets(token).to_string()))
            .collect();
        Ok(Arguments::new(entries))
    }
}

impl From<&str> for CommandTemplate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Text up to the first space.
fn leading_token(text: &str) -> &str {
    text.split(' ').next().unwrap_or("")
}

/// Byte index of the `]` closing the `[` at `open`, if balanced.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Top-level balanced groups as `[start, end)` byte ranges, brackets included.
/// An unclosed `[` is literal and scanning resumes right after it.
fn bracket_groups(text: &str) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut i = 0;
    while let Some(offset) = text[i..].find('[') {
        let open = i + offset;
        match matching_close(text, open) {
            Some(close) => {
                groups.push((open, close + 1));
                i = close + 1;
            }
            None => i = open + 1,
        }
    }
    groups
}

/// Byte offsets at which an argument token starting at `text[0]` may end.
fn token_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => break,
            ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => break,
            _ => {}
        }
        if depth == 0 {
            ends.push(i + c.len_utf8());
        }
    }
    ends
}

/// Backtracking matcher over `(segment, byte offset)` states.
///
/// A state's outcome does not depend on how it was reached, so failed states
/// are remembered and never explored twice.
struct Matcher<'a> {
    segments: &'a [Segment],
    line: &'a str,
    /// Failed states, indexed by `segment * (line.len() + 1) + offset`.
    failed: Vec<bool>,
    captures: Vec<Range<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(segments: &'a [Segment], line: &'a str) -> Self {
        Self {
            segments,
            line,
            failed: vec![false; (segments.len() + 1) * (line.len() + 1)],
            captures: Vec::new(),
        }
    }

    fn run(&mut self, segment: usize, at: usize) -> bool {
        let state = segment * (self.line.len() + 1) + at;
        if self.failed[state] {
            return false;
        }
        let matched = self.step(segment, at);
        if !matched {
            self.failed[state] = true;
        }
        matched
    }

    fn step(&mut self, segment: usize, at: usize) -> bool {
        let (segments, line) = (self.segments, self.line);
        let rest = &line[at..];
        let Some(current) = segments.get(segment) else {
            return rest.is_empty();
        };

        match current {
            Segment::Literal(literal) => {
                rest.starts_with(literal.as_str()) && self.run(segment + 1, at + literal.len())
            }
            Segment::Placeholder(_) => {
                // Longest token first.
                for end in token_ends(rest).into_iter().rev() {
                    self.captures.push(at..at + end);
                    if self.run(segment + 1, at + end) {
                        return true;
                    }
                    self.captures.pop();
                }
                false
            }
        }
    }
}

/// Remove the outer brackets of a token that is exactly one group.
fn strip_brackets(token: &str) -> &str {
    if token.starts_with('[') && matching_close(token, 0) == Some(token.len() - 1) {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

//! Compiled pattern contract
//!
//! The gateway consumes URL patterns through the [`Pattern`] trait: a match
//! operation that either extracts the declared path parameters from a
//! concrete path or reports no-match. Compiling annotated templates into
//! patterns is the template compiler's job; [`TemplatePattern`] is a small
//! segment matcher covering the common `{name}` capture form for tests and
//! demos.

/// Ordered path-parameter values extracted by a pattern match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Wrap extracted (name, value) pairs, in pattern declaration order
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The extracted pairs, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of extracted parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the pattern declared no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A compiled URL pattern supporting match-and-extract
pub trait Pattern: Send + Sync + 'static {
    /// Match a concrete URL path, extracting the declared parameters
    ///
    /// Returns `None` when the path does not match.
    fn match_path(&self, path: &str) -> Option<PathParams>;

    /// The template this pattern was compiled from, for registration logs
    fn template(&self) -> &str;
}

enum Segment {
    Literal(String),
    Capture(String),
}

/// Segment-wise template matcher
///
/// Supports literal segments and single-segment `{name}` captures, e.g.
/// `/v1/shelves/{shelf.id}/books/{id}`.
pub struct TemplatePattern {
    template: String,
    segments: Vec<Segment>,
}

impl TemplatePattern {
    /// Compile a template
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Segment::Capture(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { template, segments }
    }
}

impl Pattern for TemplatePattern {
    fn match_path(&self, path: &str) -> Option<PathParams> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() != self.segments.len() {
            return None;
        }
        let mut pairs = Vec::new();
        for (expected, actual) in self.segments.iter().zip(segments) {
            match expected {
                Segment::Literal(lit) if lit == actual => {}
                Segment::Literal(_) => return None,
                Segment::Capture(name) => pairs.push((name.clone(), actual.to_string())),
            }
        }
        Some(PathParams::new(pairs))
    }

    fn template(&self) -> &str {
        &self.template
    }
}

use regex::Regex;
use tracing::warn;

use crate::types::{DetectionSettings, MediaItem};

/// Number of leading identifier characters used for the loose embed
/// pattern that catches renamed exports.
const SHORT_ID_LEN: usize = 8;

/// How a media item could be textually referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `![[name]]` embed of a known filename.
    ExactEmbed,
    /// `![[photo-YYYY-MM-DD-HH-mm-ss.ext]]` auto-generated filename.
    TemplatedEmbed,
    /// `![..](domain/../name)` markdown link to the external provider.
    ExternalLink,
}

/// One way an item could appear in a document: a tagged kind plus its
/// compiled matcher. Generated fresh per item per detection call and
/// never persisted.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub kind: PatternKind,
    matcher: Regex,
}

impl PatternSpec {
    fn compile(kind: PatternKind, expression: &str) -> Option<Self> {
        match Regex::new(expression) {
            Ok(matcher) => Some(Self { kind, matcher }),
            Err(e) => {
                warn!(kind = ?kind, expression, error = %e, "dropping uncompilable pattern");
                None
            }
        }
    }

    pub fn matches(&self, content: &str) -> bool {
        self.matcher.is_match(content)
    }

    #[cfg(test)]
    pub fn expression(&self) -> &str {
        self.matcher.as_str()
    }
}

/// Builds every independent match strategy for one catalog item. The
/// strategies are OR'd together by the detector: a single match from
/// any of them marks the item referenced.
pub fn generate_patterns(item: &MediaItem, settings: &DetectionSettings) -> Vec<PatternSpec> {
    let mut patterns = Vec::new();
    let extension = item.kind.default_extension();

    if let Some(filename) = item.filename.as_deref() {
        let base = base_filename(filename);
        patterns.extend(PatternSpec::compile(
            PatternKind::ExactEmbed,
            &format!(r"!\[\[{}\]\]", regex::escape(base)),
        ));
        patterns.extend(PatternSpec::compile(
            PatternKind::ExactEmbed,
            &format!(r"!\[\[{}\]\]", regex::escape(filename)),
        ));
    }

    // Auto-generated export names follow a fixed timestamp template.
    patterns.extend(PatternSpec::compile(
        PatternKind::TemplatedEmbed,
        &format!(r"!\[\[photo-\d{{4}}-\d{{2}}-\d{{2}}-\d{{2}}-\d{{2}}-\d{{2}}\.{extension}\]\]"),
    ));

    // Renamed exports often keep a fragment of the identifier; match the
    // first characters of its leading segment, wrapped with wildcards.
    let short_id: String = item
        .id
        .split('/')
        .next()
        .unwrap_or_default()
        .chars()
        .take(SHORT_ID_LEN)
        .collect();
    if !short_id.is_empty() {
        patterns.extend(PatternSpec::compile(
            PatternKind::TemplatedEmbed,
            &format!(r"!\[\[.*{}.*\.{extension}\]\]", regex::escape(&short_id)),
        ));
    }

    if let Some(domain) = settings.trimmed_domain() {
        let escaped_domain = regex::escape(domain);
        if let Some(filename) = item.filename.as_deref() {
            patterns.extend(PatternSpec::compile(
                PatternKind::ExternalLink,
                &format!(r"!\[.*?\]\({escaped_domain}/.*?/{}\)", regex::escape(filename)),
            ));
        }
        patterns.extend(PatternSpec::compile(
            PatternKind::ExternalLink,
            &format!(
                r"!\[.*?\]\({escaped_domain}/.*?/{}\.{extension}\)",
                regex::escape(&item.id)
            ),
        ));
    }

    patterns
}

/// Filename with its final extension stripped. A leading-dot name like
/// `.hidden` is kept whole.
fn base_filename(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(index) if index > 0 => &filename[..index],
        _ => filename,
    }
}

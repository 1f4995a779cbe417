//! Placeholder substitution for configured queries and metric names.
//!
//! Any terminated `${...}` is a placeholder and its content is handed to the
//! lookup as is. Queries additionally accept the bare `{name}` form when `name`
//! starts with a letter or `_` and continues with letters, digits, `_`, `-` and
//! `.`; other brace content is copied verbatim. `$${` yields a literal `${`.
//! Substituted values are never scanned again.

use tracing::debug;

use crate::{
    duration,
    models::Series,
    window::ExtendedTimeWindow,
    DwhExportError, Result,
};

/// Which brace forms count as placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// Only `${name}`.
    Dollar,
    /// `${name}` and the bare `{name}` form.
    DollarOrBare,
}

/// Replaces every placeholder in `template` with the value returned by `lookup`.
pub fn render<F>(template: &str, syntax: Syntax, mut lookup: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['$', '{']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(escaped) = tail.strip_prefix("$${") {
            out.push_str("${");
            rest = escaped;
            continue;
        }

        let found = match tail.strip_prefix('$') {
            Some(braced) => dollar_placeholder(braced).map(|(name, consumed)| (name, consumed + 1)),
            None if syntax == Syntax::DollarOrBare => bare_placeholder(tail),
            None => None,
        };
        match found {
            Some((name, consumed)) => {
                out.push_str(&lookup(name)?);
                rest = &tail[consumed..];
            }
            None => {
                // not a placeholder; emit the current char and move on
                let ch_len = tail.chars().next().map_or(1, char::len_utf8);
                out.push_str(&tail[..ch_len]);
                rest = &tail[ch_len..];
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Parses `{...}` at the start of `s`, returning the content and the bytes consumed.
fn dollar_placeholder(s: &str) -> Option<(&str, usize)> {
    let body = s.strip_prefix('{')?;
    let close = body.find('}')?;
    Some((&body[..close], close + 2))
}

/// Like [`dollar_placeholder`], but only accepts identifier-like names.
fn bare_placeholder(s: &str) -> Option<(&str, usize)> {
    let (name, consumed) = dollar_placeholder(s)?;

    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return None;
    }
    Some((name, consumed))
}

/// Renders a stored query for the given (extended) window. Unknown placeholders
/// are rejected so that a typo never runs an unbounded query.
pub fn render_query(query: &str, window: &ExtendedTimeWindow) -> Result<String> {
    let rendered = render(query, Syntax::DollarOrBare, |variable| {
        if variable.eq_ignore_ascii_case("interval") {
            Ok(duration::format_millis(window.interval_millis))
        } else if variable.eq_ignore_ascii_case("timeFilter") {
            Ok(time_filter(window))
        } else {
            Err(DwhExportError::UnknownQueryVariable(variable.to_string()))
        }
    })?;

    debug!(query = %rendered, "Rendered query");
    Ok(rendered)
}

/// Renders a metric name from the series' tags. Only `${tag}` is substituted;
/// missing tags become empty strings.
pub fn render_metric_path(name: &str, series: &Series) -> String {
    render(name, Syntax::Dollar, |tag| Ok(series.tag(tag).unwrap_or_default().to_string()))
        .unwrap_or_else(|_| name.to_string())
}

fn time_filter(window: &ExtendedTimeWindow) -> String {
    format!(
        "(time >= {} AND time < {})",
        window.start_nanos(),
        window.end_nanos()
    )
}

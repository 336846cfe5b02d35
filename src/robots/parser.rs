//! Two-stage robots.txt parser
//!
//! Stage one turns the raw body into clean directive lines, with a fallback
//! for bodies whose newlines arrived as literal `\n` escape sequences. Stage
//! two turns each line into a `key: value` pair and assembles the
//! [`RuleSet`].

use crate::robots::RuleSet;
use thiserror::Error;

/// Escape sequence some servers emit instead of real newlines
const LITERAL_NEWLINE: &str = "\\n";

/// Errors produced while parsing robots.txt content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("body collapsed into a single {length}-character line holding several directives")]
    CollapsedLines { length: usize },

    #[error("line is not a 'key: value' pair: '{line}'")]
    MissingColon { line: String },

    #[error("directive appears before any user-agent line: '{line}'")]
    DirectiveBeforeUserAgent { line: String },
}

/// Collapses every run of whitespace to a single space and trims the ends
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a robots.txt body into clean, non-blank directive lines
///
/// Whitespace is normalized, stray surrounding quotes are dropped and `#`
/// comments are removed. If the body collapses into one line carrying
/// several `key: ` tokens, it is re-split on the literal `\n` sequence; if
/// that still yields a single crowded line the body is rejected.
pub fn split_lines(body: &str) -> Result<Vec<String>, ParseError> {
    let body = body.trim_start_matches('\u{feff}');

    let mut lines = clean_lines(body.split('\n'));
    if is_collapsed(&lines) {
        lines = clean_lines(body.split(LITERAL_NEWLINE));
        if is_collapsed(&lines) {
            return Err(ParseError::CollapsedLines {
                length: lines[0].len(),
            });
        }
    }

    Ok(lines
        .iter()
        .map(|line| strip_comment(line))
        .filter(|line| !line.is_empty())
        .collect())
}

fn clean_lines<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    raw.map(|line| normalize_space(line).trim_matches('"').trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// One line carrying several `key: ` tokens once its comment is removed
fn is_collapsed(lines: &[String]) -> bool {
    lines.len() == 1 && strip_comment(&lines[0]).matches(": ").count() > 1
}

fn strip_comment(line: &str) -> String {
    match line.split_once('#') {
        Some((content, _)) => content.trim().to_string(),
        None => line.to_string(),
    }
}

/// Parses a single directive line into a lowercase key and its value
///
/// Surrounding quote characters are tolerated on both halves.
pub fn parse_line(line: &str) -> Result<(String, String), ParseError> {
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MissingColon {
            line: line.to_string(),
        })?;

    let key = key.trim().trim_matches('"').trim().to_lowercase();
    let value = value.trim().trim_matches('"').trim().to_string();

    if key.is_empty() {
        return Err(ParseError::MissingColon {
            line: line.to_string(),
        });
    }

    Ok((key, value))
}

/// Parses a robots.txt body into a [`RuleSet`]
///
/// A `user-agent` line opens a section; following directives attach to the
/// most recently declared agent. `sitemap` lines are global and may appear
/// anywhere.
pub fn parse(body: &str) -> Result<RuleSet, ParseError> {
    let mut rules = RuleSet::new();
    let mut current_agent: Option<String> = None;

    for line in split_lines(body)? {
        let (key, value) = parse_line(&line)?;

        match key.as_str() {
            "user-agent" => {
                let agent = value.to_lowercase();
                rules.declare_agent(&agent);
                current_agent = Some(agent);
            }
            "sitemap" => rules.push_sitemap(value),
            _ => {
                let agent = current_agent
                    .as_deref()
                    .ok_or(ParseError::DirectiveBeforeUserAgent { line: line.clone() })?;
                rules.push_directive(agent, key, value);
            }
        }
    }

    Ok(rules)
}

//! Command templates for external collaborators.
//!
//! A template is a shell-word string such as `crawl {dir} --tag={tag}`. It is
//! split once, at load time; placeholders are then filled per argument, so a
//! substituted value always stays a single argv entry no matter what it
//! contains. `{args}` is the exception: it must stand alone and splices a
//! whole list.

use crate::error::TemplateError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Placeholder that expands to a list of arguments.
pub const LIST_PLACEHOLDER: &str = "args";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// A value bound to a placeholder during expansion.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    /// Quoted in the rendered line only when it needs to be.
    Text(&'a str),
    /// Always single-quoted in the rendered line.
    Quoted(&'a str),
    List(&'a [String]),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandTemplate {
    source: String,
    tokens: Vec<Vec<Segment>>,
}

/// An expanded command: the argv to execute and its shell rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub argv: Vec<String>,
    pub display: String,
}

impl CommandLine {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl CommandTemplate {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance, duplicates included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().flatten().filter_map(|seg| match seg {
            Segment::Slot(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Reject placeholders this template's tool does not provide.
    pub fn check_placeholders(&self, allowed: &[&str]) -> Result<(), TemplateError> {
        match self.placeholders().find(|name| !allowed.contains(name)) {
            Some(name) => Err(TemplateError::UnknownPlaceholder(name.to_string())),
            None => Ok(()),
        }
    }

    pub fn expand(&self, bindings: &[(&str, Value<'_>)]) -> Result<CommandLine, TemplateError> {
        let lookup = |name: &str| {
            bindings
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| TemplateError::MissingValue(name.to_string()))
        };

        let mut argv = Vec::new();
        let mut shown = Vec::new();
        for token in &self.tokens {
            if let [Segment::Slot(name)] = token.as_slice() {
                if let Value::List(items) = lookup(name)? {
                    argv.extend(items.iter().cloned());
                    shown.extend(items.iter().map(|item| quote(item).into_owned()));
                    continue;
                }
            }

            let mut arg = String::new();
            let mut display = String::new();
            for seg in token {
                match seg {
                    Segment::Literal(text) => {
                        arg.push_str(text);
                        display.push_str(&quote_fragment(text));
                    }
                    Segment::Slot(name) => match lookup(name)? {
                        Value::Text(v) => {
                            arg.push_str(v);
                            display.push_str(&quote_fragment(v));
                        }
                        Value::Quoted(v) => {
                            arg.push_str(v);
                            display.push_str(&single_quote(v));
                        }
                        Value::List(_) => return Err(TemplateError::EmbeddedList(render(token))),
                    },
                }
            }
            if display.is_empty() {
                display.push_str("''");
            }
            argv.push(arg);
            shown.push(display);
        }

        if argv.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(CommandLine {
            argv,
            display: shown.join(" "),
        })
    }
}

impl FromStr for CommandTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words = shell_words::split(s).map_err(|e| TemplateError::Split(e.to_string()))?;
        if words.is_empty() {
            return Err(TemplateError::Empty);
        }
        let tokens = words
            .iter()
            .map(|w| parse_token(w))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source: s.to_string(),
            tokens,
        })
    }
}

impl TryFrom<String> for CommandTemplate {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommandTemplate> for String {
    fn from(value: CommandTemplate) -> Self {
        value.source
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_token(word: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = word.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            if c == '}' && chars.peek() == Some(&'}') {
                chars.next();
            }
            literal.push(c);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            literal.push('{');
            continue;
        }
        let mut name = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' => name.push(ch),
                _ => return Err(TemplateError::Unclosed(word.to_string())),
            }
        }
        if name.is_empty() {
            return Err(TemplateError::Unclosed(word.to_string()));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Slot(name));
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    let has_list = segments
        .iter()
        .any(|s| matches!(s, Segment::Slot(n) if n == LIST_PLACEHOLDER));
    if has_list && segments.len() > 1 {
        return Err(TemplateError::EmbeddedList(word.to_string()));
    }
    Ok(segments)
}

fn render(token: &[Segment]) -> String {
    token
        .iter()
        .map(|seg| match seg {
            Segment::Literal(text) => text.replace('{', "{{").replace('}', "}}"),
            Segment::Slot(name) => format!("{{{name}}}"),
        })
        .collect()
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ',')
}

/// Quote `value` for a POSIX shell only if it needs it.
pub fn quote(value: &str) -> Cow<'_, str> {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(single_quote(value))
    }
}

// Like `quote`, but an empty fragment renders as nothing so that pieces of
// one argument can be concatenated.
fn quote_fragment(value: &str) -> Cow<'_, str> {
    if value.is_empty() {
        Cow::Borrowed("")
    } else {
        quote(value)
    }
}

/// Wrap `value` in single quotes, escaping embedded single quotes.
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

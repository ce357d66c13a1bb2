//! Distinguished Name handling.
//!
//! A reset request resolves to exactly one directory entry, identified by
//! its distinguished name; the password replace targets that DN. Parsing is
//! strict so malformed DNs surface before any write is attempted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use pwreset_core::error::Error as CoreError;

/// Errors raised while parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component was not a valid `attribute=value` pair.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::InvalidDn(err.to_string())
    }
}

/// Strongly-typed distinguished name.
///
/// Keeps a canonical string form alongside the parsed `attribute=value`
/// components. Values are stored unescaped; the canonical form re-escapes
/// per RFC 4514 on output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName {
    raw: String,
    components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] if the input is empty or a component is not an
    /// `attribute=value` pair.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, DnError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DnError::Empty);
        }

        let mut components = Vec::new();
        for part in split_unescaped(raw, ',')? {
            if part.is_empty() {
                return Err(DnError::InvalidComponent(raw.to_string()));
            }
            components.push(split_attribute_value(&part)?);
        }

        Ok(Self {
            raw: components_to_string(&components),
            components,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Looks up the value of the first component matching `attribute`
    /// (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(attribute))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the parsed components in order.
    #[must_use]
    pub fn components(&self) -> &[(String, String)] {
        &self.components
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, DnError> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = DnError;

    fn try_from(value: String) -> Result<Self, DnError> {
        Self::parse(value)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

fn split_unescaped(input: &str, delimiter: char) -> Result<Vec<String>, DnError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    if escape {
        return Err(DnError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    Ok(parts)
}

fn split_attribute_value(component: &str) -> Result<(String, String), DnError> {
    let idx = component
        .find('=')
        .ok_or_else(|| DnError::InvalidComponent(component.to_string()))?;

    let attribute = component[..idx].trim();
    let value = component[idx + 1..].trim_start();

    if attribute.is_empty() || value.is_empty() {
        return Err(DnError::InvalidComponent(component.to_string()));
    }

    Ok((attribute.to_string(), value.to_string()))
}

/// Escapes a component value per RFC 4514.
fn escape_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn components_to_string(components: &[(String, String)]) -> String {
    components
        .iter()
        .map(|(attribute, value)| format!("{attribute}={}", escape_value(value)))
        .collect::<Vec<_>>()
        .join(",")
}

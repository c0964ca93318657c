// Dweve Neogm - Object-Graph Mapping for Property Graphs
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identifier and string escaping for generated Cypher.
//!
//! Every label, relationship type and property key that reaches a clause
//! passes through this module. Identifiers are NFC-normalised, stripped of
//! invisible or bidirectional control characters, and backtick-quoted when
//! they are not plain ASCII identifiers or collide with a reserved word.

use crate::config::CompilerConfig;
use crate::error::{MappingError, Result};
use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;

/// Validate string length against the compiler's configured limit.
///
/// # Examples
///
/// ```
/// # use neogm::cypher::validate_string_length;
/// # use neogm::CompilerConfig;
/// let config = CompilerConfig::default().with_max_string_length(8);
/// assert!(validate_string_length("short", "title", &config).is_ok());
/// assert!(validate_string_length("far too long", "title", &config).is_err());
/// ```
pub fn validate_string_length(s: &str, property: &str, config: &CompilerConfig) -> Result<()> {
    if let Some(max_length) = config.max_string_length {
        let length = s.len();
        if length > max_length {
            return Err(MappingError::StringLengthExceeded {
                length,
                max_length,
                property: property.to_string(),
            });
        }
    }
    Ok(())
}

#[inline]
fn needs_escaping(s: &str) -> bool {
    s.chars()
        .any(|ch| matches!(ch, '\\' | '\'' | '"' | '\n' | '\r' | '\t' | '\x00'))
}

/// Escape a string value for use in Cypher queries.
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
///
/// ```
/// # use neogm::cypher::escape_string;
/// assert!(matches!(escape_string("plain"), std::borrow::Cow::Borrowed(_)));
/// assert_eq!(escape_string("it's"), "it\\'s");
/// ```
pub fn escape_string(s: &str) -> Cow<'_, str> {
    if !needs_escaping(s) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 10);
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x00' => escaped.push_str("\\u0000"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Quote a string value for Cypher with single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

/// Check if a string is a valid Cypher identifier.
///
/// Valid identifiers start with a letter or underscore, and contain only
/// letters, digits, and underscores.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate and return a Cypher identifier, or error if invalid.
pub fn validate_identifier(s: &str) -> Result<&str> {
    if is_valid_identifier(s) {
        Ok(s)
    } else {
        Err(MappingError::InvalidIdentifier(s.to_string()))
    }
}

/// Normalize a string to NFC (Canonical Composition) form.
///
/// ```
/// # use neogm::cypher::normalize_unicode;
/// assert_eq!(normalize_unicode("cafe\u{0301}"), "caf\u{00E9}");
/// ```
pub fn normalize_unicode(s: &str) -> String {
    s.nfc().collect()
}

/// Control, zero-width, bidirectional and other invisible format characters.
fn is_dangerous_unicode(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{200B}'
                | '\u{200C}'
                | '\u{200D}'
                | '\u{FEFF}'
                | '\u{202A}'
                | '\u{202B}'
                | '\u{202C}'
                | '\u{202D}'
                | '\u{202E}'
                | '\u{2066}'
                | '\u{2067}'
                | '\u{2068}'
                | '\u{2069}'
                | '\u{00AD}'
                | '\u{061C}'
                | '\u{180E}'
        )
}

/// Normalise and filter, then backtick-quote when the result is not a bare
/// identifier.
fn sanitize(s: &str) -> String {
    let sanitized: String = normalize_unicode(s)
        .chars()
        .filter(|c| !is_dangerous_unicode(*c))
        .collect();

    if is_valid_identifier(&sanitized) && !is_cypher_keyword(&sanitized) {
        sanitized
    } else {
        format!("`{}`", sanitized.replace('`', "``"))
    }
}

/// Escape an identifier (property key or variable) for Cypher.
///
/// ```
/// # use neogm::cypher::escape_identifier;
/// assert_eq!(escape_identifier("name"), "name");
/// assert_eq!(escape_identifier("123name"), "`123name`");
/// assert_eq!(escape_identifier("MATCH"), "`MATCH`");
/// ```
pub fn escape_identifier(s: &str) -> String {
    sanitize(s)
}

/// Escape a label name for Cypher, including the leading `:`.
///
/// ```
/// # use neogm::cypher::escape_label;
/// assert_eq!(escape_label("User"), ":User");
/// assert_eq!(escape_label("My-Label"), ":`My-Label`");
/// ```
pub fn escape_label(s: &str) -> String {
    format!(":{}", sanitize(s))
}

/// Escape a whole label set, e.g. `["Person", "Teacher"]` to `:Person:Teacher`.
pub fn escape_labels<S: AsRef<str>>(labels: &[S]) -> String {
    labels.iter().map(|l| escape_label(l.as_ref())).collect()
}

/// Escape a relationship type for Cypher, including the leading `:`.
///
/// ```
/// # use neogm::cypher::escape_relationship_type;
/// assert_eq!(escape_relationship_type("KNOWS"), ":KNOWS");
/// assert_eq!(escape_relationship_type("knows-about"), ":`knows-about`");
/// ```
pub fn escape_relationship_type(s: &str) -> String {
    format!(":{}", sanitize(s))
}

/// Derive a relationship type from a field name.
///
/// `actedIn` becomes `ACTED_IN`, `next` becomes `NEXT`.
pub fn to_relationship_type(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 5);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            result.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c.to_ascii_uppercase());
            prev_lower = c.is_ascii_lowercase();
        } else {
            result.push('_');
            prev_lower = false;
        }
    }

    let mut collapsed = String::with_capacity(result.len());
    let mut prev_underscore = false;
    for c in result.chars() {
        if c == '_' {
            if !prev_underscore {
                collapsed.push(c);
            }
            prev_underscore = true;
        } else {
            collapsed.push(c);
            prev_underscore = false;
        }
    }

    collapsed.trim_matches('_').to_string()
}

/// Check if a string is a Cypher reserved keyword.
pub fn is_cypher_keyword(s: &str) -> bool {
    matches!(
        s.to_uppercase().as_str(),
        "ALL"
            | "AND"
            | "ANY"
            | "AS"
            | "ASC"
            | "ASCENDING"
            | "BY"
            | "CALL"
            | "CASE"
            | "CONTAINS"
            | "COUNT"
            | "CREATE"
            | "DELETE"
            | "DESC"
            | "DESCENDING"
            | "DETACH"
            | "DISTINCT"
            | "DO"
            | "DROP"
            | "ELSE"
            | "END"
            | "ENDS"
            | "EXISTS"
            | "FALSE"
            | "FILTER"
            | "FOREACH"
            | "IN"
            | "IS"
            | "LIMIT"
            | "MANDATORY"
            | "MATCH"
            | "MERGE"
            | "NODE"
            | "NONE"
            | "NOT"
            | "NULL"
            | "OF"
            | "ON"
            | "OPTIONAL"
            | "OR"
            | "ORDER"
            | "REDUCE"
            | "RELATIONSHIP"
            | "REMOVE"
            | "RETURN"
            | "SET"
            | "SINGLE"
            | "SKIP"
            | "SOME"
            | "STARTS"
            | "THEN"
            | "TRUE"
            | "UNION"
            | "UNIQUE"
            | "UNWIND"
            | "USING"
            | "WHEN"
            | "WHERE"
            | "WITH"
            | "XOR"
            | "YIELD"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("hello"), "hello");
        assert_eq!(escape_string("it's"), "it\\'s");
        assert_eq!(escape_string("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_string("back\\slash"), "back\\\\slash");
        assert_eq!(escape_string("nul\x00"), "nul\\u0000");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("Y"), "'Y'");
        assert_eq!(quote_string("O'Brien"), "'O\\'Brien'");
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("n0"));
        assert!(is_valid_identifier("_private"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("0n"));
        assert!(!is_valid_identifier("has space"));
    }

    #[test]
    fn test_validate_identifier() {
        assert_eq!(validate_identifier("title").unwrap(), "title");
        assert!(matches!(
            validate_identifier("a-b"),
            Err(MappingError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_escape_identifier_keywords_and_backticks() {
        assert_eq!(escape_identifier("where"), "`where`");
        assert_eq!(escape_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_escape_identifier_strips_invisible_characters() {
        assert_eq!(escape_identifier("na\u{200B}me"), "name");
        assert_eq!(escape_identifier("ti\u{202E}tle"), "title");
        assert_eq!(escape_identifier("a\nb"), "ab");
    }

    #[test]
    fn test_escape_labels() {
        assert_eq!(escape_labels(&["Person", "Teacher"]), ":Person:Teacher");
        assert_eq!(escape_labels::<&str>(&[]), "");
    }

    #[test]
    fn test_to_relationship_type() {
        assert_eq!(to_relationship_type("next"), "NEXT");
        assert_eq!(to_relationship_type("actedIn"), "ACTED_IN");
        assert_eq!(to_relationship_type("has-many  things"), "HAS_MANY_THINGS");
    }

    #[test]
    fn test_validate_string_length() {
        let config = CompilerConfig::default().with_max_string_length(3);
        assert!(validate_string_length("abc", "p", &config).is_ok());
        let err = validate_string_length("abcd", "p", &config).unwrap_err();
        assert!(matches!(
            err,
            MappingError::StringLengthExceeded { length: 4, max_length: 3, .. }
        ));

        let unlimited = CompilerConfig::default().without_string_length_limit();
        assert!(validate_string_length(&"x".repeat(10_000), "p", &unlimited).is_ok());
    }
}

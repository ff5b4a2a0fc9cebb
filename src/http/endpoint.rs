//! Endpoint URL templating.
//!
//! Patterns use named placeholders (`/submission/:submissionId`). Every
//! placeholder must be substituted with a non-empty value; values are
//! percent-encoded as a single path segment with the `encodeURIComponent`
//! character set, so `!'()*` stay literal. The base URL is prepended
//! verbatim, without slash normalization.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors raised while expanding a URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Expected \"{0}\" to be defined")]
    MissingSubstitution(String),

    #[error("Expected \"{0}\" to not be empty")]
    EmptySubstitution(String),

    #[error("Missing parameter name at position {0}")]
    MissingParameterName(usize),
}

/// Ordered name → value substitutions.
pub type Substitutions = BTreeMap<String, String>;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Percent-encode one path segment.
///
/// ASCII alphanumerics and `-_.~!'()*` pass through; everything else is
/// encoded as UTF-8 bytes.
pub fn encode_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut buf = [0u8; 4];
    for c in value.chars() {
        if matches!(c, '!' | '\'' | '(' | ')' | '*') {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

/// Expand `pattern` with `substitutions`, without a base URL.
pub fn expand_path(pattern: &str, substitutions: &Substitutions) -> Result<String, TemplateError> {
    let mut path = String::with_capacity(pattern.len());
    let mut chars = pattern.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != ':' {
            path.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if !is_name_char(next) {
                break;
            }
            name.push(next);
            chars.next();
        }
        if name.is_empty() {
            return Err(TemplateError::MissingParameterName(pos));
        }

        let value = match substitutions.get(&name) {
            Some(value) if value.is_empty() => return Err(TemplateError::EmptySubstitution(name)),
            Some(value) => value,
            None => return Err(TemplateError::MissingSubstitution(name)),
        };
        path.push_str(&encode_segment(value));
    }

    Ok(path)
}

/// Build an absolute endpoint URL: `base_url` followed by the expanded path.
pub fn build_endpoint_url(
    base_url: &str,
    pattern: &str,
    substitutions: &Substitutions,
) -> Result<String, TemplateError> {
    let path = expand_path(pattern, substitutions)?;
    Ok(format!("{base_url}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(pairs: &[(&str, &str)]) -> Substitutions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_pattern() {
        let url = build_endpoint_url("https://endpoint", "/submission", &Substitutions::new()).unwrap();
        assert_eq!(url, "https://endpoint/submission");
    }

    #[test]
    fn test_substitution() {
        let url = build_endpoint_url(
            "https://endpoint",
            "/submission/:submissionId",
            &subs(&[("submissionId", "testSubmissionId")]),
        )
        .unwrap();
        assert_eq!(url, "https://endpoint/submission/testSubmissionId");
    }

    #[test]
    fn test_multiple_placeholders_and_suffix() {
        let path = expand_path(
            "/service/:slug/user/:userId.json",
            &subs(&[("slug", "forms"), ("userId", "u1")]),
        )
        .unwrap();
        assert_eq!(path, "/service/forms/user/u1.json");
    }

    #[test]
    fn test_values_are_encoded() {
        let path = expand_path("/user/:id", &subs(&[("id", "a b/c")])).unwrap();
        assert_eq!(path, "/user/a%20b%2Fc");
    }

    #[test]
    fn test_sub_delims_stay_literal() {
        let path = expand_path("/q/:term", &subs(&[("term", "it's (a)*!~")])).unwrap();
        assert_eq!(path, "/q/it's%20(a)*!~");
        assert_eq!(encode_segment("é?&=#%"), "%C3%A9%3F%26%3D%23%25");
        assert_eq!(encode_segment("a-b_c.d"), "a-b_c.d");
    }

    #[test]
    fn test_empty_substitution() {
        let err = expand_path("/user/:userId", &subs(&[("userId", "")])).unwrap_err();
        assert_eq!(err, TemplateError::EmptySubstitution("userId".into()));
        assert_eq!(err.to_string(), "Expected \"userId\" to not be empty");
    }

    #[test]
    fn test_missing_substitution() {
        let err = expand_path("/user/:userId", &Substitutions::new()).unwrap_err();
        assert_eq!(err, TemplateError::MissingSubstitution("userId".into()));
    }

    #[test]
    fn test_bare_colon() {
        let err = expand_path("/user/:/x", &Substitutions::new()).unwrap_err();
        assert_eq!(err, TemplateError::MissingParameterName(6));
    }

    #[test]
    fn test_no_slash_normalization() {
        let url = build_endpoint_url("https://endpoint/", "/x", &Substitutions::new()).unwrap();
        assert_eq!(url, "https://endpoint//x");
    }
}

//! Confirmation token issue and validation.
//!
//! A token is meaningful only in combination with the pending request it
//! was bound to at issue time; validation is an exact equality check, never
//! a prefix or partial match.

use crate::random::random_string;
use subtle::ConstantTimeEq;

/// Default confirmation token length.
pub const DEFAULT_TOKEN_LENGTH: usize = 15;

/// Issues a fresh confirmation token.
#[must_use]
pub fn issue(length: usize) -> String {
    random_string(length)
}

/// Validates a presented token against the token bound to the pending
/// request.
///
/// Returns true only if both are non-empty and byte-equal. The comparison
/// runs in constant time so response timing does not reveal how much of a
/// guessed token matched.
#[must_use]
pub fn validate(bound: &str, presented: &str) -> bool {
    if bound.is_empty() || presented.is_empty() {
        return false;
    }
    bound.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::AMBIGUOUS_CHARACTERS;

    #[test]
    fn issued_tokens_have_requested_length() {
        assert_eq!(issue(DEFAULT_TOKEN_LENGTH).len(), 15);
        assert_eq!(issue(32).len(), 32);
    }

    #[test]
    fn issued_tokens_avoid_ambiguous_characters() {
        let token = issue(512);
        for ch in AMBIGUOUS_CHARACTERS {
            assert!(!token.contains(*ch), "token contains ambiguous {ch}");
        }
    }

    #[test]
    fn issued_tokens_are_unique() {
        assert_ne!(issue(DEFAULT_TOKEN_LENGTH), issue(DEFAULT_TOKEN_LENGTH));
    }

    #[test]
    fn freshly_issued_token_validates_against_itself() {
        let token = issue(DEFAULT_TOKEN_LENGTH);
        assert!(validate(&token, &token.clone()));
    }

    #[test]
    fn validation_truth_table() {
        assert!(validate("xk4vbn2d", "xk4vbn2d"));

        assert!(!validate("xk4vbn2d", "xk4vbn2e"));
        assert!(!validate("xk4vbn2d", "xk4vbn2"));
        assert!(!validate("xk4vbn2d", ""));
        assert!(!validate("", "xk4vbn2d"));
        assert!(!validate("", ""));
    }

    #[test]
    fn prefix_is_not_a_match() {
        let token = issue(DEFAULT_TOKEN_LENGTH);
        assert!(!validate(&token, &token[..token.len() - 1]));
    }
}

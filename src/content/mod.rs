pub mod comments;
pub mod friends;
pub mod matches;
pub mod posts;
pub mod venues;

use thiserror::Error;

use crate::domain::MatchStatus;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Forbidden")]
    Forbidden,

    #[error("Team has no places left")]
    CapacityExceeded,

    #[error("Already playing in this match")]
    AlreadyJoined,

    #[error("Match cannot go from {from} to {to}")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },

    #[error("{0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Trim `text` and check it is non-empty and at most `max` characters.
pub(crate) fn clean_text(text: &str, field: &str, max: usize) -> Result<String, ContentError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ContentError::Validation(format!("{} cannot be empty", field)));
    }
    if text.chars().count() > max {
        return Err(ContentError::Validation(format!(
            "{} must be {} characters or less",
            field, max
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_trims() {
        assert_eq!(clean_text("  hola  ", "Comment", 10).unwrap(), "hola");
    }

    #[test]
    fn clean_text_rejects_whitespace_only() {
        assert!(matches!(
            clean_text(" \n\t ", "Comment", 10),
            Err(ContentError::Validation(_))
        ));
    }

    #[test]
    fn clean_text_counts_characters_not_bytes() {
        assert!(clean_text("ñññ", "Comment", 3).is_ok());
        assert!(clean_text("ññññ", "Comment", 3).is_err());
    }
}

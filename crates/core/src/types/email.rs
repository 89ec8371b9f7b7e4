//! Email value accepted by a person's email cell.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Reasons a draft is rejected as an email.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("enter an email address")]
    Empty,

    #[error("an email address has at most {max} characters")]
    TooLong { max: usize },

    #[error("an email address needs an @")]
    MissingAtSymbol,

    #[error("an email address has only one @")]
    MultipleAtSymbols,

    #[error("nothing before the @")]
    EmptyLocalPart,

    #[error("nothing after the @")]
    EmptyDomain,

    /// Spaces inside the address. Leading and trailing ones are trimmed.
    #[error("an email address cannot contain spaces")]
    Whitespace,
}

/// A person's email address, as committed from an email cell.
///
/// The draft is trimmed, then checked for one `@` with text on both sides,
/// no inner spaces, and the RFC 5321 length limit. Nothing beyond that
/// shape is checked; the CRM has the final say.
///
/// ```
/// use orbit_core::Email;
///
/// assert_eq!(Email::parse(" ada@example.com ").unwrap().as_str(), "ada@example.com");
/// assert!(Email::parse("ada").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    /// Validate a cell draft.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmailError`] the trimmed draft runs into.
    pub fn parse(draft: &str) -> Result<Self, EmailError> {
        let value = draft.trim();
        if value.is_empty() {
            return Err(EmailError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if value.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = value.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(value.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

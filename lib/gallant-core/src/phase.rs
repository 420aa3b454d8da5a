//! Middleware phase names.

use std::borrow::Cow;

use derive_more::Display;

/// A named stage of an HTTP transaction against which plugins register handlers.
///
/// The built-in phases are associated constants; any other name is a custom
/// phase that plugins can trigger explicitly through
/// [`Middleware::run`](crate::Middleware::run).
///
/// ```
/// use gallant_core::Phase;
///
/// assert_eq!(Phase::from("before dial"), Phase::BEFORE_DIAL);
/// assert_eq!(Phase::from("audit").as_str(), "audit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct Phase(Cow<'static, str>);

impl Phase {
    /// Request preparation, before anything touches the network.
    pub const REQUEST: Self = Self::from_static("request");
    /// Runs right before the transport is dialed.
    pub const BEFORE_DIAL: Self = Self::from_static("before dial");
    /// Runs right after the transport returned.
    pub const AFTER_DIAL: Self = Self::from_static("after dial");
    /// Response post-processing.
    pub const RESPONSE: Self = Self::from_static("response");
    /// Error recovery.
    pub const ERROR: Self = Self::from_static("error");
    /// Cleanup once a plugin stopped the transaction.
    pub const STOP: Self = Self::from_static("stop");
    /// Runs when a plugin produced the response before dialing.
    pub const INTERCEPT: Self = Self::from_static("intercept");

    /// Create a phase from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Phase name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the dedicated error phase.
    #[must_use]
    pub fn is_error(&self) -> bool {
        *self == Self::ERROR
    }

    /// Returns `true` for the dedicated stop phase.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }
}

impl From<&'static str> for Phase {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for Phase {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&Phase> for Phase {
    fn from(phase: &Phase) -> Self {
        phase.clone()
    }
}

impl AsRef<str> for Phase {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names() {
        assert_eq!(Phase::REQUEST.as_str(), "request");
        assert_eq!(Phase::BEFORE_DIAL.as_str(), "before dial");
        assert_eq!(Phase::AFTER_DIAL.as_str(), "after dial");
        assert_eq!(Phase::RESPONSE.to_string(), "response");
        assert_eq!(Phase::INTERCEPT.to_string(), "intercept");
    }

    #[test]
    fn owned_and_borrowed_names_are_equal() {
        assert_eq!(Phase::from("error".to_string()), Phase::ERROR);
        assert!(Phase::from("error".to_string()).is_error());
        assert!(Phase::from("stop").is_stop());
        assert!(!Phase::REQUEST.is_stop());
    }
}

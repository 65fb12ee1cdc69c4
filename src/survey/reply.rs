//! Transport-agnostic replies from the survey engine.
//!
//! Each turn yields exactly one [`Reply`]: text plus a markup hint the
//! channel renders however it can — Telegram as a reply keyboard, the
//! console as a bracketed option list.

/// Suggested-reply rendering hint attached to a [`Reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Offer these exact strings as one-tap reply options.
    Options(Vec<String>),
    /// Remove any previously offered options.
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub markup: Markup,
}

impl Reply {
    /// A plain text reply that also clears any prior option keyboard.
    pub fn clear(text: impl Into<String>) -> Self {
        Self { text: text.into(), markup: Markup::Clear }
    }

    /// A reply carrying one-tap options.
    pub fn with_options(text: impl Into<String>, options: Vec<String>) -> Self {
        Self { text: text.into(), markup: Markup::Options(options) }
    }

    /// The option list, if any.
    pub fn options(&self) -> Option<&[String]> {
        match &self.markup {
            Markup::Options(opts) => Some(opts),
            Markup::Clear => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_reply_has_no_options() {
        let r = Reply::clear("hello");
        assert_eq!(r.text, "hello");
        assert_eq!(r.markup, Markup::Clear);
        assert!(r.options().is_none());
    }

    #[test]
    fn options_are_exposed() {
        let r = Reply::with_options("pick", vec!["a".into(), "b".into()]);
        assert_eq!(r.options().unwrap(), ["a".to_string(), "b".to_string()]);
    }
}

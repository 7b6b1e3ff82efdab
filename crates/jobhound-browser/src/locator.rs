//! Lazily resolved element queries.
//!
//! A [`Locator`] is a description of how to find elements, not a handle to
//! them. Drivers resolve it against the live page on every call, so a locator
//! stays valid across re-renders and can be built before the elements exist.

use serde::Serialize;
use std::fmt;

/// One resolution step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Descendants matching a CSS selector
    Css(String),
    /// The element at this index of the current match list
    Nth(usize),
    /// Innermost descendants whose trimmed text equals the string exactly
    Text(String),
}

/// A chain of resolution steps, starting at the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    /// Elements matching a CSS selector anywhere in the document.
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Css(selector.into())],
        }
    }

    /// Elements whose text is exactly `text` anywhere in the document.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Text(text.into())],
        }
    }

    /// Descendants of this locator's matches that match `selector`.
    #[must_use]
    pub fn locate(&self, selector: impl Into<String>) -> Self {
        self.with(Step::Css(selector.into()))
    }

    /// Descendants of this locator's matches whose text is exactly `text`.
    #[must_use]
    pub fn locate_text(&self, text: impl Into<String>) -> Self {
        self.with(Step::Text(text.into()))
    }

    /// The `index`-th match of this locator.
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        self.with(Step::Nth(index))
    }

    /// The first match of this locator.
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Resolution steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn with(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            match step {
                Step::Css(selector) => f.write_str(selector)?,
                Step::Nth(index) => write!(f, "nth={index}")?,
                Step::Text(text) => write!(f, "text=\"{text}\"")?,
            }
        }
        Ok(())
    }
}

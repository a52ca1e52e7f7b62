//! Snapshot body construction.
//!
//! The [`BroadcastLoop`] asks a [`SnapshotSource`] for the body of each
//! new version. A source may fail; the loop then skips the tick and
//! retries the same version on the next interval, so a half-built value
//! is never published.
//!
//! [`BroadcastLoop`]: crate::broadcaster::BroadcastLoop

/// Placeholder replaced with the decimal version in templates.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// A failure to build the body for one tick.
#[derive(Debug, thiserror::Error)]
#[error("snapshot source error: {message}")]
pub struct SourceError {
    /// Description of the failure.
    pub message: String,
}

impl SourceError {
    /// Create a source error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Produces the body for each new version.
///
/// The broadcast loop is the only caller, so implementations may keep
/// mutable state between ticks.
pub trait SnapshotSource: Send {
    /// Build the body for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the body cannot be built this tick.
    fn next_body(&mut self, version: u64) -> Result<String, SourceError>;
}

/// Renders a fixed template, substituting [`VERSION_PLACEHOLDER`].
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
}

impl TemplateSource {
    /// Create a source from a template such as `"body updated {version}"`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The raw template.
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl SnapshotSource for TemplateSource {
    fn next_body(&mut self, version: u64) -> Result<String, SourceError> {
        Ok(self
            .template
            .replace(VERSION_PLACEHOLDER, &version.to_string()))
    }
}

impl<F> SnapshotSource for F
where
    F: FnMut(u64) -> Result<String, SourceError> + Send,
{
    fn next_body(&mut self, version: u64) -> Result<String, SourceError> {
        self(version)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn template_substitutes_version() {
        let mut source = TemplateSource::new("body updated {version}");
        assert_eq!(source.next_body(7).unwrap(), "body updated 7");
    }

    #[test]
    fn template_without_placeholder_is_constant() {
        let mut source = TemplateSource::new("static");
        assert_eq!(source.next_body(1).unwrap(), "static");
        assert_eq!(source.next_body(2).unwrap(), "static");
    }

    #[test]
    fn template_substitutes_every_occurrence() {
        let mut source = TemplateSource::new("{version}/{version}");
        assert_eq!(source.next_body(12).unwrap(), "12/12");
    }

    #[test]
    fn closures_are_sources() {
        let mut source = |version: u64| {
            if version % 2 == 0 {
                Err(SourceError::new("even"))
            } else {
                Ok(format!("odd {version}"))
            }
        };
        assert!(source.next_body(2).is_err());
        assert_eq!(source.next_body(3).unwrap(), "odd 3");
    }
}

use crate::Severity;
use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

/// The result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Passed,
    Failed {
        severity: Severity,
        /// Stable failure label, e.g. `VIOTBadNodeLength`.
        code: Cow<'static, str>,
        message: String,
    },
    Warning {
        message: String,
    },
    Info {
        message: String,
    },
}

impl ValidationOutcome {
    /// A failure with the default [`Severity::Medium`] grade.
    ///
    /// Field validators produce these; callers re-grade them with [`Self::graded`].
    #[must_use]
    pub fn failure(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::Failed {
            severity: Severity::default(),
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        match self {
            Self::Failed { severity, .. } => Some(*severity),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Failed { code, .. } => Some(code),
            _ => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed { message, .. } | Self::Warning { message } | Self::Info { message } => {
                Some(message)
            }
        }
    }

    /// Replace severity and failure label. Non-failures are returned unchanged.
    #[must_use]
    pub fn graded(self, severity: Severity, code: impl Into<Cow<'static, str>>) -> Self {
        match self {
            Self::Failed { message, .. } => Self::Failed {
                severity,
                code: code.into(),
                message,
            },
            other => other,
        }
    }

    /// Prefix the message with the name of the field it describes.
    #[must_use]
    pub fn named(self, field: &str) -> Self {
        match self {
            Self::Passed => Self::Passed,
            Self::Failed {
                severity,
                code,
                message,
            } => Self::Failed {
                severity,
                code,
                message: format!("{field}: {message}"),
            },
            Self::Warning { message } => Self::Warning {
                message: format!("{field}: {message}"),
            },
            Self::Info { message } => Self::Info {
                message: format!("{field}: {message}"),
            },
        }
    }

    /// Downgrade a failure to a warning, keeping its message.
    #[must_use]
    pub fn or_warn(self) -> Self {
        match self {
            Self::Failed { message, .. } => Self::Warning { message },
            other => other,
        }
    }
}

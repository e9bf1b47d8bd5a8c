//! Error types for tree construction, parsing, and completion.
//!
//! Every failure in the crate is an [`Error`]. Variants fall into four
//! kinds (see [`ErrorKind`]): configuration errors raised while building a
//! command tree, resolution errors for unknown commands and flags, argument
//! errors for missing or malformed values, and the [`Error::Exit`] sentinel
//! used by hook flags to end processing normally.
//!
//! Parser errors are wrapped with the flag's invocation form (`-x` or
//! `--name`) and population errors with the command name, so the rendered
//! message points at the offending token:
//!
//! ```
//! use argot_core::{Error, ErrorKind};
//!
//! let err = Error::flag("--count", Error::MissingArgument);
//! assert_eq!(err.to_string(), "--count: missing argument");
//! assert_eq!(err.kind(), ErrorKind::Argument);
//! ```

use std::fmt::Display;

use thiserror::Error;

use crate::value::Type;

/// Broad classification of an [`Error`].
///
/// Callers match on the kind to choose an exit status or to decide whether
/// showing help makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid tree or flag declaration; raised before any parsing.
    Configuration,
    /// Unknown command or flag.
    Resolution,
    /// Missing or malformed value, or rejected positional arguments.
    Argument,
    /// A command handler failed.
    Execution,
    /// Normal early exit requested by a hook flag.
    Exit,
}

/// Errors raised by the command tree, the parser, and the completion engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A flag was declared with an empty or dash-prefixed name.
    #[error("invalid flag name")]
    InvalidFlagName,

    /// A short name or short alias is not exactly one character.
    #[error("invalid short name {0:?}: must be exactly one character")]
    InvalidShortName(String),

    /// A no-argument flag has no value to substitute when present.
    #[error("flag {0}: no-argument flag requires a no-argument default")]
    MissingNoArgDefault(String),

    /// A hook flag has no action.
    #[error("flag {0}: hook flag requires an action")]
    MissingHookAction(String),

    /// Two binders on one flag, or two fields in one record, bind the same name.
    #[error("duplicate bound field: {0}")]
    DuplicateBinding(String),

    /// Two flags in the same set share a long or short name.
    #[error("duplicate flag in scope: {0}")]
    DuplicateFlag(String),

    /// Two sibling commands share a name.
    #[error("duplicate command in scope: {0}")]
    DuplicateCommand(String),

    /// A sub command was declared without a name.
    #[error("command name not set")]
    CommandNameNotSet,

    /// A time layout is malformed or set on a flag without time values.
    #[error("flag {flag}: invalid layout: {reason}")]
    InvalidLayout { flag: String, reason: String },

    /// An unknown type name, or a type that is not valid in its position.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// A declarative tag used an option this crate does not recognize.
    #[error("unknown tag option: {0:?}")]
    UnknownTagOption(String),

    /// A default value could not be expanded.
    #[error("cannot expand {raw:?}: {reason}")]
    Expand {
        /// The unexpanded default text.
        raw: String,
        /// Why expansion failed.
        reason: String,
    },

    /// Parsing was started from a command that has a parent.
    #[error("can only be used with root command")]
    CanOnlyBeUsedWithRootCommand,

    /// A token did not resolve to a sub command and nothing was close.
    #[error("unknown command {arg:?} for {command:?}")]
    UnknownCommand {
        /// The token as typed.
        arg: String,
        /// Name of the command the token was resolved against.
        command: String,
    },

    /// A token did not resolve to a sub command, but one is within the
    /// suggestion distance.
    #[error("unknown command {arg:?} for {command:?}, did you mean {suggestion:?}?")]
    Suggestion {
        /// The token as typed.
        arg: String,
        /// Name of the command the token was resolved against.
        command: String,
        /// Name of the closest sub command.
        suggestion: String,
    },

    /// No flag with this name is reachable from the active command.
    #[error("unknown flag for {command:?}")]
    UnknownFlag {
        /// Name of the command the flag was resolved against.
        command: String,
    },

    /// An argument-taking flag was the last token.
    #[error("missing argument")]
    MissingArgument,

    /// A raw value could not be coerced to the flag's type.
    #[error("invalid {ty} value {raw:?}: {reason}")]
    InvalidValue {
        /// Target type.
        ty: Type,
        /// The raw text as given.
        raw: String,
        /// Why coercion failed.
        reason: String,
    },

    /// Positional argument count is outside the accepted range.
    #[error("invalid arg count: {0}")]
    InvalidArgCount(String),

    /// A positional argument is not one of the allowed values.
    #[error("invalid arg value: arg {index} ({arg:?}) is not an allowed value")]
    InvalidArgValue {
        /// Zero-based position of the argument.
        index: usize,
        /// The rejected argument.
        arg: String,
    },

    /// A command handler reported a failure.
    #[error("{0}")]
    Exec(String),

    /// Normal early exit (help, version). Not a failure.
    #[error("exit")]
    Exit,

    /// An error attributed to a flag, as invoked on the command line.
    #[error("{flag}: {source}")]
    Flag {
        /// Invocation form, `-x` or `--name`.
        flag: String,
        /// The underlying error.
        source: Box<Error>,
    },

    /// An error attributed to a command.
    #[error("command {name}: {source}")]
    Command {
        /// Command name.
        name: String,
        /// The underlying error.
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `source` with a flag's invocation form.
    pub fn flag(flag: impl Into<String>, source: Error) -> Self {
        Self::Flag {
            flag: flag.into(),
            source: Box::new(source),
        }
    }

    /// Wraps `source` with a command name.
    pub fn command(name: impl Into<String>, source: Error) -> Self {
        Self::Command {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Builds an [`Error::InvalidValue`].
    pub fn invalid_value(ty: Type, raw: &str, reason: impl Display) -> Self {
        Self::InvalidValue {
            ty,
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the innermost error, looking through flag and command
    /// wrappers.
    pub fn root_cause(&self) -> &Error {
        let mut err = self;
        while let Self::Flag { source, .. } | Self::Command { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFlagName
            | Self::InvalidShortName(_)
            | Self::MissingNoArgDefault(_)
            | Self::MissingHookAction(_)
            | Self::DuplicateBinding(_)
            | Self::DuplicateFlag(_)
            | Self::DuplicateCommand(_)
            | Self::CommandNameNotSet
            | Self::InvalidType(_)
            | Self::InvalidLayout { .. }
            | Self::UnknownTagOption(_)
            | Self::Expand { .. }
            | Self::CanOnlyBeUsedWithRootCommand => ErrorKind::Configuration,
            Self::UnknownCommand { .. } | Self::Suggestion { .. } | Self::UnknownFlag { .. } => {
                ErrorKind::Resolution
            }
            Self::MissingArgument
            | Self::InvalidValue { .. }
            | Self::InvalidArgCount(_)
            | Self::InvalidArgValue { .. } => ErrorKind::Argument,
            Self::Exec(_) => ErrorKind::Execution,
            Self::Exit => ErrorKind::Exit,
            Self::Flag { source, .. } | Self::Command { source, .. } => source.kind(),
        }
    }

    /// Returns `true` for the normal early-exit sentinel, wrapped or not.
    pub fn is_exit(&self) -> bool {
        matches!(self.root_cause(), Self::Exit)
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wrapper_display() {
        let err = Error::flag("-x", Error::UnknownFlag { command: "git".into() });
        assert_eq!(err.to_string(), "-x: unknown flag for \"git\"");
    }

    #[test]
    fn test_command_wrapper_display() {
        let err = Error::command(
            "git",
            Error::flag("--depth", Error::invalid_value(Type::Int, "ten", "not a number")),
        );
        assert_eq!(
            err.to_string(),
            "command git: --depth: invalid int value \"ten\": not a number"
        );
    }

    #[test]
    fn test_kind_looks_through_wrappers() {
        let err = Error::command("app", Error::flag("--help", Error::Exit));
        assert!(err.is_exit());
        assert_eq!(err.kind(), ErrorKind::Exit);

        let err = Error::flag("--name", Error::MissingArgument);
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(matches!(err.root_cause(), Error::MissingArgument));
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::InvalidFlagName.kind(), ErrorKind::Configuration);
        assert_eq!(Error::UnknownFlag { command: "app".into() }.kind(), ErrorKind::Resolution);
        assert_eq!(
            Error::Suggestion {
                arg: "pish".into(),
                command: "git".into(),
                suggestion: "push".into(),
            }
            .kind(),
            ErrorKind::Resolution
        );
        assert_eq!(Error::Exec("boom".into()).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_suggestion_display() {
        let err = Error::Suggestion {
            arg: "pish".into(),
            command: "git".into(),
            suggestion: "push".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown command \"pish\" for \"git\", did you mean \"push\"?"
        );
    }
}

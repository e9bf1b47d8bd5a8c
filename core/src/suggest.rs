//! Edit-distance suggestions for mistyped sub commands.

use crate::command::CommandRef;
use crate::error::Error;

/// Default maximum edit distance for suggestions and completions.
pub const DEFAULT_MIN_DIST: usize = 2;

/// Levenshtein distance between `a` and `b`, ignoring case.
///
/// Insertions, deletions, and substitutions each cost one; transpositions
/// are not special.
///
/// # Examples
///
/// ```
/// use argot_core::ldist;
///
/// assert_eq!(ldist("pish", "push"), 1);
/// assert_eq!(ldist("PUSH", "push"), 0);
/// assert_eq!(ldist("ab", "ba"), 2);
/// ```
pub fn ldist(a: &str, b: &str) -> usize {
    strsim::levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

impl<'t> CommandRef<'t> {
    /// Builds the error for an unresolved sub command token.
    ///
    /// Returns [`Error::Suggestion`] naming the first child whose name, alias,
    /// or suggested name is within this command's distance threshold, and
    /// [`Error::UnknownCommand`] otherwise.
    pub fn suggest(&self, arg: &str) -> Error {
        let max = self.min_dist();
        let found = self.children().find(|child| {
            let cmd = child.command();
            std::iter::once(&cmd.name)
                .chain(&cmd.aliases)
                .chain(&cmd.suggested)
                .any(|name| ldist(arg, name) <= max)
        });
        match found {
            Some(child) => Error::Suggestion {
                arg: arg.to_string(),
                command: self.name().to_string(),
                suggestion: child.name().to_string(),
            },
            None => Error::UnknownCommand {
                arg: arg.to_string(),
                command: self.name().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandTree};

    fn git() -> CommandTree {
        let mut tree = CommandTree::new(Command::new("git", "")).unwrap();
        let root = tree.root_id();
        tree.sub(root, Command::new("push", "")).unwrap();
        tree.sub(root, Command::new("commit", "").with_alias("ci")).unwrap();
        tree.sub(root, Command::new("status", "").with_suggested("info")).unwrap();
        tree.sub(root, Command::new("internal", "").hidden()).unwrap();
        tree
    }

    #[test]
    fn test_ldist() {
        assert_eq!(ldist("", ""), 0);
        assert_eq!(ldist("", "abc"), 3);
        assert_eq!(ldist("kitten", "sitting"), 3);
        assert_eq!(ldist("Straße", "STRASSE"), 2);
    }

    #[test]
    fn test_suggests_close_command() {
        let tree = git();
        let err = tree.root().suggest("pish");
        assert!(matches!(
            err,
            Error::Suggestion { ref arg, ref command, ref suggestion }
                if arg == "pish" && command == "git" && suggestion == "push"
        ));
    }

    #[test]
    fn test_unknown_when_nothing_is_close() {
        let tree = git();
        let err = tree.root().suggest("zzzzz");
        assert_eq!(err.to_string(), "unknown command \"zzzzz\" for \"git\"");
    }

    #[test]
    fn test_suggests_through_aliases_and_suggested_names() {
        let tree = git();
        assert!(matches!(
            tree.root().suggest("cx"),
            Error::Suggestion { ref suggestion, .. } if suggestion == "commit"
        ));
        assert!(matches!(
            tree.root().suggest("infx"),
            Error::Suggestion { ref suggestion, .. } if suggestion == "status"
        ));
        // Hidden commands still produce suggestions.
        assert!(matches!(
            tree.root().suggest("internl"),
            Error::Suggestion { ref suggestion, .. } if suggestion == "internal"
        ));
    }

    #[test]
    fn test_threshold_is_per_command() {
        let mut tree = CommandTree::new(Command::new("app", "").with_min_dist(1)).unwrap();
        let root = tree.root_id();
        tree.sub(root, Command::new("deploy", "")).unwrap();
        assert!(matches!(tree.root().suggest("deplyo"), Error::UnknownCommand { .. }));
        assert!(matches!(tree.root().suggest("deplo"), Error::Suggestion { .. }));
    }
}

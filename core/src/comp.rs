//! Shell completion candidates.
//!
//! [`CommandRef::comps`] takes the words typed so far (the last one being
//! the word under the cursor) and returns ranked candidates plus a
//! [`CompDirective`] for the shell.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::command::CommandRef;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::parse::parse_from;
use crate::suggest::ldist;
use crate::vars::Vars;

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub name: String,
    pub usage: String,
}

impl Completion {
    pub fn new(name: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: usage.into(),
        }
    }
}

/// Hint telling the shell how to treat the candidates.
///
/// The numeric codes match the common shell completion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum CompDirective {
    /// Fall back to the shell's default (usually file names).
    Default = 0,
    /// Completion failed.
    Error = 1,
    /// Do not add a space after the candidate.
    NoSpace = 2,
    /// Do not fall back to file names.
    NoFileComp = 4,
}

impl CompDirective {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CompDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.code())
    }
}

impl<'t> CommandRef<'t> {
    /// Returns completions for `args`, whose last element is the word being
    /// completed.
    ///
    /// The preceding words are parsed leniently from this (root) command, so
    /// unknown flags, missing flag values, and hook exits do not stop
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgCount`] for empty `args`, or any other
    /// parse error.
    ///
    /// # Examples
    ///
    /// ```
    /// use argot_core::{Command, CommandTree, CompDirective};
    ///
    /// let mut tree = CommandTree::new(Command::new("git", "")).unwrap();
    /// tree.sub(tree.root_id(), Command::new("push", "update remote refs")).unwrap();
    /// tree.sub(tree.root_id(), Command::new("pull", "fetch and merge")).unwrap();
    ///
    /// let (comps, dir) = tree.root().comps(&["pu"]).unwrap();
    /// let names: Vec<_> = comps.iter().map(|c| c.name.as_str()).collect();
    /// assert_eq!(names, vec!["push", "pull"]);
    /// assert_eq!(dir, CompDirective::NoFileComp);
    /// ```
    pub fn comps<S: AsRef<str>>(&self, args: &[S]) -> Result<(Vec<Completion>, CompDirective)> {
        let Some((last, head)) = args.split_last() else {
            return Err(Error::InvalidArgCount(
                "completion requires at least one argument".to_string(),
            ));
        };
        let ctx = Context::discard().with_continue(|cmd, err| {
            let swallow = matches!(
                err.root_cause(),
                Error::UnknownFlag { .. } | Error::MissingArgument | Error::Exit
            );
            debug!(command = %cmd.name(), error = %err, swallow, "completion parse error");
            swallow
        });
        let mut vars = Vars::new();
        let (cmd, _) = parse_from(&ctx, *self, head, &mut vars)?;
        let last = last.as_ref();
        debug!(command = %cmd.name(), word = last, "complete");
        let prev = head.last().map(AsRef::as_ref);
        let result = if let Some(name) = last.strip_prefix("--") {
            cmd.comp_flags(name, false)
        } else if let Some(name) = last.strip_prefix('-') {
            cmd.comp_flags(name, true)
        } else if prev.is_some_and(|prev| cmd.expects_value(prev)) {
            (Vec::new(), CompDirective::Default)
        } else {
            cmd.comp_commands(last)
        };
        Ok(result)
    }

    /// Returns `true` if `word` is a flag that consumes the following token.
    fn expects_value(&self, word: &str) -> bool {
        if let Some(body) = word.strip_prefix("--") {
            if body.is_empty() || body.contains('=') {
                return false;
            }
            return self.flag(body, true, false).is_some_and(|g| !g.no_arg);
        }
        let Some(body) = word.strip_prefix('-') else {
            return false;
        };
        let mut chars = body.char_indices().peekable();
        while let Some((at, c)) = chars.next() {
            let Some(flag) = self.flag(&body[at..at + c.len_utf8()], true, true) else {
                return false;
            };
            let next = chars.peek().map(|&(_, n)| n);
            if flag.no_arg {
                if next == Some('=') {
                    return false;
                }
                continue;
            }
            return next.is_none();
        }
        false
    }

    /// Completes sub command names in four ranked passes: exact name or
    /// alias, case-insensitive name or alias, case-insensitive prefix, then
    /// edit distance. Hidden commands are skipped.
    pub fn comp_commands(&self, name: &str) -> (Vec<Completion>, CompDirective) {
        let lower = name.to_lowercase();
        let max = self.min_dist();
        let passes: [&dyn Fn(&str) -> bool; 4] = [
            &|candidate| candidate == name,
            &|candidate| candidate.to_lowercase() == lower,
            &|candidate| candidate.to_lowercase().starts_with(&lower),
            &|candidate| ldist(candidate, name) <= max,
        ];
        let mut seen = HashSet::new();
        let mut comps = Vec::new();
        for (pass, matches) in passes.iter().enumerate() {
            for child in self.children() {
                let cmd = child.command();
                if cmd.hidden || seen.contains(&cmd.name) {
                    continue;
                }
                let mut names = std::iter::once(&cmd.name).chain(&cmd.aliases);
                let hit = if pass == 3 {
                    names.chain(&cmd.suggested).any(|n| matches(n))
                } else {
                    names.any(|n| matches(n))
                };
                if hit {
                    seen.insert(cmd.name.clone());
                    comps.push(Completion::new(&cmd.name, &cmd.usage));
                }
            }
        }
        (comps, CompDirective::NoFileComp)
    }

    /// Completes flags visible from this command, nearest declaration first.
    /// With `short`, completes `-x` forms; otherwise `--name` forms by
    /// prefix. Hidden flags are skipped.
    pub fn comp_flags(&self, name: &str, short: bool) -> (Vec<Completion>, CompDirective) {
        let mut seen = HashSet::new();
        let mut comps = Vec::new();
        for cmd in self.ancestors() {
            for flag in &cmd.command().flags {
                if !seen.insert(flag.name.as_str()) || flag.hidden {
                    continue;
                }
                if short {
                    for s in flag.shorts().filter(|s| name.is_empty() || *s == name) {
                        comps.push(Completion::new(format!("-{s}"), &flag.usage));
                    }
                } else {
                    for long in flag.longs().filter(|long| long.starts_with(name)) {
                        comps.push(Completion::new(format!("--{long}"), &flag.usage));
                    }
                }
            }
        }
        (comps, CompDirective::NoFileComp)
    }
}

//! Token-scanning parser.
//!
//! [`parse`] walks the argument tokens left to right, descending into sub
//! commands, assigning flags into [`Vars`], and collecting positional
//! arguments. There is no backtracking: once a positional argument has been
//! collected, later bare tokens are positionals too.
//!
//! Accepted flag forms:
//!
//! | Form             | Meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `--name`         | no-arg default, or the next token as the value       |
//! | `--name=value`   | `value` (possibly empty)                             |
//! | `-abc`           | `-a -b -c` while each takes no argument              |
//! | `-fvalue`        | `value` for argument-taking `-f`                     |
//! | `-f=value`       | `value`                                              |
//! | `-f value`       | the next token                                       |
//! | `--`             | every remaining token is positional                  |

use tracing::{debug, trace, warn};

use crate::command::{CommandRef, CommandTree};
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::vars::Vars;

/// Parses `args` from the tree's root.
///
/// Returns the resolved command and its positional arguments.
///
/// # Examples
///
/// ```
/// use argot_core::{parse, Command, CommandTree, Context, Flag, FlagSet, Type, Vars};
///
/// let mut tree = CommandTree::new(Command::new("git", "")).unwrap();
/// tree.sub(
///     tree.root_id(),
///     Command::new("clone", "").with_flags(
///         FlagSet::new().var(Flag::new("depth", "", Type::Int).with_short("d")),
///     ),
/// )
/// .unwrap();
///
/// let mut vars = Vars::new();
/// let (cmd, args) = parse(&Context::discard(), &tree, &["clone", "-d1", "repo"], &mut vars).unwrap();
/// assert_eq!(cmd.name(), "clone");
/// assert_eq!(args, vec!["repo"]);
/// assert_eq!(vars.int("depth"), Some(1));
/// ```
pub fn parse<'t, S: AsRef<str>>(
    ctx: &Context,
    tree: &'t CommandTree,
    args: &[S],
    vars: &mut Vars,
) -> Result<(CommandRef<'t>, Vec<String>)> {
    parse_from(ctx, tree.root(), args, vars)
}

/// Parses `args` starting at `root`, which must be a root command.
pub fn parse_from<'t, S: AsRef<str>>(
    ctx: &Context,
    root: CommandRef<'t>,
    args: &[S],
    vars: &mut Vars,
) -> Result<(CommandRef<'t>, Vec<String>)> {
    if !root.is_root() {
        return Err(Error::CanOnlyBeUsedWithRootCommand);
    }
    if let Err(err) = root.populate(ctx, false, false, vars) {
        let err = Error::command(root.name(), err);
        if ctx.should_continue(root, &err) {
            debug!(error = %err, "lenient parse stopped");
            return Ok((root, Vec::new()));
        }
        return Err(err);
    }
    if args.is_empty() {
        return Ok((root, Vec::new()));
    }
    Scanner {
        ctx,
        cmd: root,
        positionals: Vec::new(),
    }
    .scan(args, vars)
}

enum Token<'a> {
    /// Sub command name or positional argument.
    Bare,
    Terminator,
    Long(&'a str),
    Short(&'a str),
}

fn classify(s: &str) -> Token<'_> {
    if s.len() <= 1 || !s.starts_with('-') {
        Token::Bare
    } else if s == "--" {
        Token::Terminator
    } else if let Some(body) = s.strip_prefix("--") {
        Token::Long(body)
    } else {
        Token::Short(&s[1..])
    }
}

struct Scanner<'c, 't> {
    ctx: &'c Context,
    cmd: CommandRef<'t>,
    positionals: Vec<String>,
}

impl<'t> Scanner<'_, 't> {
    fn scan<S: AsRef<str>>(mut self, args: &[S], vars: &mut Vars) -> Result<(CommandRef<'t>, Vec<String>)> {
        let mut i = 0;
        while i < args.len() {
            let s = args[i].as_ref();
            i += 1;
            let step = match classify(s) {
                Token::Bare => self.bare(s, vars),
                Token::Terminator => {
                    debug!(remaining = args.len() - i, "terminator");
                    self.positionals
                        .extend(args[i..].iter().map(|a| a.as_ref().to_string()));
                    return Ok((self.cmd, self.positionals));
                }
                Token::Long(body) => self.long(body, &args[i..], vars).map(|used| i += used),
                Token::Short(body) => self.short(body, &args[i..], vars).map(|used| i += used),
            };
            if let Err(err) = step {
                if self.ctx.should_continue(self.cmd, &err) {
                    debug!(command = %self.cmd.name(), error = %err, "lenient parse stopped");
                    return Ok((self.cmd, self.positionals));
                }
                return Err(err);
            }
        }
        Ok((self.cmd, self.positionals))
    }

    fn bare(&mut self, s: &str, vars: &mut Vars) -> Result<()> {
        let child = if self.positionals.is_empty() {
            self.cmd.child(s)
        } else {
            None
        };
        match child {
            Some(child) => {
                child
                    .populate(self.ctx, false, false, vars)
                    .map_err(|e| Error::command(child.name(), e))?;
                debug!(command = %child.name(), "descend");
                if child.command().deprecated {
                    warn!(command = %child.name(), "command is deprecated");
                }
                self.cmd = child;
            }
            None => {
                trace!(arg = s, "positional");
                self.positionals.push(s.to_string());
            }
        }
        Ok(())
    }

    /// Handles `--name` and `--name=value`. Returns the number of following
    /// tokens consumed.
    fn long<S: AsRef<str>>(&self, body: &str, rest: &[S], vars: &mut Vars) -> Result<usize> {
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let invocation = format!("--{name}");
        let flag = self
            .cmd
            .flag(name, true, false)
            .ok_or_else(|| Error::flag(&invocation, self.unknown_flag()))?;
        let (raw, used) = match inline {
            Some(value) => (value, 0),
            None if flag.no_arg => (no_arg_value(flag), 0),
            None => match rest.first() {
                Some(next) => (next.as_ref(), 1),
                None => return Err(Error::flag(invocation, Error::MissingArgument)),
            },
        };
        trace!(flag = %invocation, raw, "long flag");
        self.assign(&invocation, flag, raw, vars)?;
        Ok(used)
    }

    /// Handles a short cluster such as `-abc`, `-fvalue`, or `-f=value`.
    /// Returns the number of following tokens consumed.
    fn short<S: AsRef<str>>(&self, body: &str, rest: &[S], vars: &mut Vars) -> Result<usize> {
        for (at, c) in body.char_indices() {
            let invocation = format!("-{c}");
            let flag = self
                .cmd
                .flag(&body[at..at + c.len_utf8()], true, true)
                .ok_or_else(|| Error::flag(&invocation, self.unknown_flag()))?;
            let tail = &body[at + c.len_utf8()..];
            trace!(flag = %invocation, tail, "short flag");
            if flag.no_arg {
                if let Some(value) = tail.strip_prefix('=') {
                    self.assign(&invocation, flag, value, vars)?;
                    return Ok(0);
                }
                self.assign(&invocation, flag, no_arg_value(flag), vars)?;
                continue;
            }
            if !tail.is_empty() {
                let value = tail.strip_prefix('=').unwrap_or(tail);
                self.assign(&invocation, flag, value, vars)?;
                return Ok(0);
            }
            return match rest.first() {
                Some(next) => {
                    self.assign(&invocation, flag, next.as_ref(), vars)?;
                    Ok(1)
                }
                None => Err(Error::flag(invocation, Error::MissingArgument)),
            };
        }
        Ok(0)
    }

    fn unknown_flag(&self) -> Error {
        Error::UnknownFlag {
            command: self.cmd.name().to_string(),
        }
    }

    fn assign(&self, invocation: &str, flag: &Flag, raw: &str, vars: &mut Vars) -> Result<()> {
        if flag.deprecated {
            warn!(flag = invocation, "flag is deprecated");
        }
        vars.set(self.ctx, self.cmd, flag, raw, true)
            .map_err(|e| Error::flag(invocation, e))
    }
}

fn no_arg_value(flag: &Flag) -> &str {
    flag.no_arg_default.as_deref().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::error::ErrorKind;
    use crate::flag::FlagSet;
    use crate::value::{Type, Value};

    fn tree() -> CommandTree {
        let mut tree = CommandTree::new(
            Command::new("app", "").with_flags(
                FlagSet::new()
                    .var(Flag::new("all", "", Type::Bool).with_short("a"))
                    .var(Flag::new("brief", "", Type::Bool).with_short("b"))
                    .var(Flag::new("color", "", Type::Bool).with_short("c"))
                    .var(Flag::new("verbose", "", Type::Count).with_short("v"))
                    .var(Flag::new("file", "", Type::String).with_short("f"))
                    .var(Flag::new("name", "", Type::String).with_default("anon"))
                    .var(Flag::new("tag", "", Type::Slice).with_short("t"))
                    .var(Flag::new("stop", "", Type::Hook).with_hook(|_, _| Err(Error::Exit))),
            ),
        )
        .unwrap();
        let root = tree.root_id();
        let remote = tree
            .sub(
                root,
                Command::new("remote", "").with_flags(
                    FlagSet::new().var(Flag::new("depth", "", Type::Int).with_default("1")),
                ),
            )
            .unwrap();
        tree.sub(remote, Command::new("add", "")).unwrap();
        tree.sub(root, Command::new("x", "")).unwrap();
        tree
    }

    fn run(args: &[&str]) -> Result<(String, Vec<String>, Vars)> {
        let tree = tree();
        let mut vars = Vars::new();
        let (cmd, rest) = parse(&Context::discard(), &tree, args, &mut vars)?;
        Ok((cmd.tree().join(" "), rest, vars))
    }

    #[test]
    fn test_empty_args_resolve_to_root() {
        let (cmd, rest, vars) = run(&[]).unwrap();
        assert_eq!(cmd, "app");
        assert!(rest.is_empty());
        assert_eq!(vars.string("name").as_deref(), Some("anon"));
    }

    #[test]
    fn test_descends_and_populates_defaults() {
        let (cmd, rest, vars) = run(&["remote", "add", "origin", "url"]).unwrap();
        assert_eq!(cmd, "app remote add");
        assert_eq!(rest, vec!["origin", "url"]);
        assert_eq!(vars.int("depth"), Some(1));
        assert!(!vars.is_set("depth"));
    }

    #[test]
    fn test_positional_stops_descent() {
        let (cmd, rest, _) = run(&["file.txt", "remote"]).unwrap();
        assert_eq!(cmd, "app");
        assert_eq!(rest, vec!["file.txt", "remote"]);
    }

    #[test]
    fn test_single_char_token_is_bare() {
        let (cmd, rest, _) = run(&["x", "-", "y"]).unwrap();
        assert_eq!(cmd, "app x");
        assert_eq!(rest, vec!["-", "y"]);
    }

    #[test]
    fn test_short_cluster() {
        let (_, rest, vars) = run(&["-abc"]).unwrap();
        assert!(rest.is_empty());
        for name in ["all", "brief", "color"] {
            assert_eq!(vars.bool(name), Some(true), "{name}");
            assert!(vars.is_set(name));
        }

        let (_, _, vars) = run(&["-vvv"]).unwrap();
        assert_eq!(vars.int("verbose"), Some(3));
    }

    #[test]
    fn test_short_value_forms() {
        let (_, rest, vars) = run(&["-fvalue", "next"]).unwrap();
        assert_eq!(vars.string("file").as_deref(), Some("value"));
        assert_eq!(rest, vec!["next"]);

        let (_, _, vars) = run(&["-f=value"]).unwrap();
        assert_eq!(vars.string("file").as_deref(), Some("value"));

        let (_, rest, vars) = run(&["-af", "value", "pos"]).unwrap();
        assert_eq!(vars.bool("all"), Some(true));
        assert_eq!(vars.string("file").as_deref(), Some("value"));
        assert_eq!(rest, vec!["pos"]);

        let (_, _, vars) = run(&["-a=false"]).unwrap();
        assert_eq!(vars.bool("all"), Some(false));

        let (_, _, vars) = run(&["-f="]).unwrap();
        assert_eq!(vars.string("file").as_deref(), Some(""));
    }

    #[test]
    fn test_long_value_forms() {
        let (_, _, vars) = run(&["--name=bob"]).unwrap();
        assert_eq!(vars.string("name").as_deref(), Some("bob"));

        let (_, _, vars) = run(&["--name", "carol"]).unwrap();
        assert_eq!(vars.string("name").as_deref(), Some("carol"));

        // `--name=` assigns the empty string; an absent flag keeps the default.
        let (_, _, vars) = run(&["--name="]).unwrap();
        assert_eq!(vars.string("name").as_deref(), Some(""));
        assert!(vars.is_set("name"));
        let (_, _, vars) = run(&["pos"]).unwrap();
        assert_eq!(vars.string("name").as_deref(), Some("anon"));
        assert!(!vars.is_set("name"));

        let (_, _, vars) = run(&["--all"]).unwrap();
        assert_eq!(vars.bool("all"), Some(true));
        let (_, _, vars) = run(&["--tag", "a,b", "--tag=c"]).unwrap();
        assert_eq!(vars.strings("tag"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_inherited_flags_after_descent() {
        let (cmd, _, vars) = run(&["remote", "add", "-v", "--depth", "5"]).unwrap();
        assert_eq!(cmd, "app remote add");
        assert_eq!(vars.int("verbose"), Some(1));
        assert_eq!(vars.int("depth"), Some(5));
        assert!(vars.is_set("depth"));
    }

    #[test]
    fn test_terminator() {
        let (cmd, rest, vars) = run(&["remote", "--", "add", "-a", "--name=x"]).unwrap();
        assert_eq!(cmd, "app remote");
        assert_eq!(rest, vec!["add", "-a", "--name=x"]);
        assert_eq!(vars.string("name").as_deref(), Some("anon"));
        assert!(vars.bool("all").is_none());
    }

    #[test]
    fn test_missing_argument() {
        let err = run(&["--name"]).unwrap_err();
        assert_eq!(err.to_string(), "--name: missing argument");
        assert!(matches!(err.root_cause(), Error::MissingArgument));

        let err = run(&["-af"]).unwrap_err();
        assert_eq!(err.to_string(), "-f: missing argument");
    }

    #[test]
    fn test_unknown_flags() {
        assert_eq!(run(&["--nope"]).unwrap_err().to_string(), "--nope: unknown flag for \"app\"");
        assert_eq!(run(&["-az"]).unwrap_err().to_string(), "-z: unknown flag for \"app\"");
        assert_eq!(run(&["--name=x", "--b"]).unwrap_err().to_string(), "--b: unknown flag for \"app\"");

        let err = run(&["remote", "--nope"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(matches!(err.root_cause(), Error::UnknownFlag { command } if command == "remote"));
    }

    #[test]
    fn test_invalid_values_are_wrapped() {
        let err = run(&["remote", "--depth", "deep"]).unwrap_err();
        assert!(err.to_string().starts_with("--depth: invalid int value \"deep\""));
    }

    #[test]
    fn test_hook_exit_propagates() {
        let err = run(&["--stop", "ignored"]).unwrap_err();
        assert!(err.is_exit());
    }

    #[test]
    fn test_lenient_mode_returns_cursor() {
        let tree = tree();
        let ctx = Context::discard().with_continue(|_, err| matches!(err.root_cause(), Error::UnknownFlag { .. }));
        let mut vars = Vars::new();
        let (cmd, rest) = parse(&ctx, &tree, &["remote", "pos", "--bogus", "add"], &mut vars).unwrap();
        assert_eq!(cmd.name(), "remote");
        assert_eq!(rest, vec!["pos"]);

        let err = parse(&ctx, &tree, &["--name"], &mut Vars::new()).unwrap_err();
        assert!(matches!(err.root_cause(), Error::MissingArgument));
    }

    #[test]
    fn test_parse_from_requires_root() {
        let tree = tree();
        let remote = tree.root().child("remote").unwrap();
        let err = parse_from(&Context::discard(), remote, &["add"], &mut Vars::new()).unwrap_err();
        assert!(matches!(err, Error::CanOnlyBeUsedWithRootCommand));
    }

    #[test]
    fn test_default_population_error_names_command() {
        let tree = CommandTree::new(
            Command::new("app", "").with_flag(Flag::new("depth", "", Type::Int).with_default("deep")),
        )
        .unwrap();
        let err = parse::<&str>(&Context::discard(), &tree, &[], &mut Vars::new()).unwrap_err();
        assert!(err.to_string().starts_with("command app: --depth: invalid int value"));
    }

    #[test]
    fn test_explicit_value_survives_descent_defaults() {
        let mut tree = CommandTree::new(Command::new("app", "").with_flag(Flag::new("mode", "", Type::String)))
            .unwrap();
        let root = tree.root_id();
        tree.sub(
            root,
            Command::new("run", "").with_flag(Flag::new("mode", "", Type::String).with_default("fast")),
        )
        .unwrap();
        let mut vars = Vars::new();
        parse(&Context::discard(), &tree, &["--mode=slow", "run"], &mut vars).unwrap();
        assert_eq!(vars.get("mode"), Some(&Value::String("slow".into())));
    }
}

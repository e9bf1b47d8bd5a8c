//! Command declarations and the arena-backed command tree.
//!
//! A [`CommandTree`] owns every [`Command`] in a flat arena. Children are
//! referenced by [`CommandId`] and each node keeps a non-owning link to its
//! parent, so lookups can walk both ways without reference cycles. Read
//! access goes through [`CommandRef`], a copyable `(tree, id)` handle.
//!
//! # Examples
//!
//! ```
//! use argot_core::{Command, CommandTree, FlagSet};
//!
//! let mut tree = CommandTree::new(Command::new("git", "the stupid content tracker")).unwrap();
//! let remote = tree.sub(tree.root_id(), Command::new("remote", "manage remotes")).unwrap();
//! tree.sub(remote, Command::new("add", "add a remote").with_flags(FlagSet::new().bool("fetch", "fetch after adding")))
//!     .unwrap();
//!
//! let add = tree.root().lookup(&["remote", "add", "origin"]);
//! assert_eq!(add.tree(), vec!["git", "remote", "add"]);
//! assert_eq!(add.path(), vec!["remote", "add"]);
//! assert!(add.flag("fetch", true, false).is_some());
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::flag::{Flag, FlagSet};
use crate::suggest::DEFAULT_MIN_DIST;
use crate::value::Type;
use crate::vars::Vars;

/// Handler invoked for the resolved command.
pub type ExecFn = Arc<dyn Fn(&Context, &Vars, &[String]) -> Result<()> + Send + Sync>;

/// Positional argument validator.
pub type ArgsFn = Arc<dyn Fn(&[String]) -> Result<()> + Send + Sync>;

/// What to do when parsing, validation, or the handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnErr {
    /// Log the error and report success.
    Continue,
    /// Panic with the error message.
    Panic,
    /// Return the error to the caller.
    #[default]
    Error,
}

/// A command declaration.
#[derive(Clone, Default)]
pub struct Command {
    /// Name, unique among siblings.
    pub name: String,
    pub usage: String,
    pub aliases: Vec<String>,
    /// Extra names considered only for suggestions and completion.
    pub suggested: Vec<String>,
    pub flags: FlagSet,
    pub exec: Option<ExecFn>,
    pub args: Vec<ArgsFn>,
    /// Error policy; inherited from the parent when unset.
    pub on_err: Option<OnErr>,
    pub hidden: bool,
    pub deprecated: bool,
    pub section: Option<usize>,
    pub special: Option<String>,
    /// Maximum edit distance for suggestions; `0` means [`DEFAULT_MIN_DIST`].
    pub min_dist: usize,
}

impl Command {
    pub fn new(name: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: usage.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_suggested(mut self, name: impl Into<String>) -> Self {
        self.suggested.push(name.into());
        self
    }

    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_exec<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, &Vars, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.exec = Some(Arc::new(f));
        self
    }

    pub fn with_args<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.args.push(Arc::new(f));
        self
    }

    pub fn with_on_err(mut self, on_err: OnErr) -> Self {
        self.on_err = Some(on_err);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn with_section(mut self, section: usize) -> Self {
        self.section = Some(section);
        self
    }

    pub fn with_special(mut self, special: impl Into<String>) -> Self {
        self.special = Some(special.into());
        self
    }

    pub fn with_min_dist(mut self, min_dist: usize) -> Self {
        self.min_dist = min_dist;
        self
    }

    /// Returns `true` if `name` is this command's name or one of its aliases.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("aliases", &self.aliases)
            .field("suggested", &self.suggested)
            .field("flags", &self.flags)
            .field("exec", &self.exec.is_some())
            .field("args", &self.args.len())
            .field("on_err", &self.on_err)
            .field("hidden", &self.hidden)
            .field("special", &self.special)
            .finish_non_exhaustive()
    }
}

/// Builds a positional validator for an argument count range and an
/// optional list of allowed values.
///
/// `None` leaves that bound open; `Some(0), Some(0)` accepts no arguments.
///
/// # Examples
///
/// ```
/// use argot_core::args_range;
///
/// let check = args_range(Some(1), Some(2), &["fast", "slow"]);
/// assert!(check(&["fast".to_string()]).is_ok());
/// assert!(check(&[]).is_err());
/// assert!(check(&["medium".to_string()]).is_err());
/// ```
pub fn args_range(min: Option<usize>, max: Option<usize>, values: &[&str]) -> ArgsFn {
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    Arc::new(move |args: &[String]| {
        let n = args.len();
        match (min, max) {
            (Some(0), Some(0)) if n != 0 => {
                return Err(Error::InvalidArgCount("takes no args".to_string()));
            }
            (None | Some(0), Some(max)) if n > max => {
                return Err(Error::InvalidArgCount(format!("takes max {max} arg(s)")));
            }
            (Some(min), None) if n < min => {
                return Err(Error::InvalidArgCount(format!("takes min {min} arg(s)")));
            }
            (Some(min), Some(max)) if n < min || n > max => {
                return Err(Error::InvalidArgCount(format!("takes {min}-{max} args")));
            }
            _ => {}
        }
        if !values.is_empty() {
            if let Some((index, arg)) = args.iter().enumerate().find(|(_, a)| !values.contains(a)) {
                return Err(Error::InvalidArgValue {
                    index,
                    arg: arg.clone(),
                });
            }
        }
        Ok(())
    })
}

/// Index of a command within its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

#[derive(Debug)]
struct Node {
    cmd: Command,
    parent: Option<CommandId>,
    children: Vec<CommandId>,
}

/// An immutable-once-built tree of commands.
///
/// The tree is `Send + Sync`; concurrent parses may share it.
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<Node>,
}

impl CommandTree {
    /// Creates a tree from its root command.
    ///
    /// An empty root name is replaced with the executable's file name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the root's flags are invalid.
    pub fn new(mut root: Command) -> Result<Self> {
        if root.name.is_empty() {
            root.name = std::env::args()
                .next()
                .as_deref()
                .and_then(|arg0| Path::new(arg0).file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        root.flags
            .validate()
            .map_err(|e| Error::command(&root.name, e))?;
        root.on_err.get_or_insert_with(OnErr::default);
        Ok(Self {
            nodes: vec![Node {
                cmd: root,
                parent: None,
                children: Vec::new(),
            }],
        })
    }

    /// Appends `cmd` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandNameNotSet`] for an unnamed command,
    /// [`Error::DuplicateCommand`] when a sibling already has the name, or a
    /// flag configuration error.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not issued by this tree.
    pub fn sub(&mut self, parent: CommandId, mut cmd: Command) -> Result<CommandId> {
        if cmd.name.is_empty() {
            return Err(Error::CommandNameNotSet);
        }
        cmd.flags.validate().map_err(|e| Error::command(&cmd.name, e))?;
        if self.get(parent).child(&cmd.name).is_some() {
            return Err(Error::DuplicateCommand(cmd.name));
        }
        if cmd.on_err.is_none() {
            cmd.on_err = self.nodes[parent.0].cmd.on_err;
        }
        let id = CommandId(self.nodes.len());
        trace!(command = %cmd.name, parent = %self.nodes[parent.0].cmd.name, "add sub command");
        self.nodes.push(Node {
            cmd,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn root_id(&self) -> CommandId {
        CommandId(0)
    }

    pub fn root(&self) -> CommandRef<'_> {
        self.get(self.root_id())
    }

    /// Returns a handle to the command with `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn get(&self, id: CommandId) -> CommandRef<'_> {
        assert!(id.0 < self.nodes.len(), "command id out of range");
        CommandRef { tree: self, id }
    }

    /// Number of commands, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All commands in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = CommandRef<'_>> {
        (0..self.nodes.len()).map(|i| CommandRef {
            tree: self,
            id: CommandId(i),
        })
    }
}

/// Borrowed handle to one command in a [`CommandTree`].
#[derive(Clone, Copy)]
pub struct CommandRef<'t> {
    tree: &'t CommandTree,
    id: CommandId,
}

impl PartialEq for CommandRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for CommandRef<'_> {}

impl fmt::Debug for CommandRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandRef").field(&self.tree().join(" ")).finish()
    }
}

impl<'t> CommandRef<'t> {
    fn node(&self) -> &'t Node {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// The owning tree.
    pub fn owner(&self) -> &'t CommandTree {
        self.tree
    }

    pub fn command(&self) -> &'t Command {
        &self.node().cmd
    }

    pub fn name(&self) -> &'t str {
        &self.node().cmd.name
    }

    pub fn parent(&self) -> Option<CommandRef<'t>> {
        self.node().parent.map(|id| self.tree.get(id))
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.node().children.is_empty()
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = CommandRef<'t>> + use<'t> {
        let tree = self.tree;
        self.node().children.iter().map(move |&id| tree.get(id))
    }

    /// This command followed by its ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = CommandRef<'t>> + use<'t> {
        std::iter::successors(Some(*self), CommandRef::parent)
    }

    /// Returns the first child whose name or alias is `name`.
    pub fn child(&self, name: &str) -> Option<CommandRef<'t>> {
        self.children().find(|c| c.command().is_named(name))
    }

    /// Walks `names` greedily from this command, stopping at the first name
    /// that is not a child. Never fails; an empty path returns `self`.
    pub fn lookup<S: AsRef<str>>(&self, names: &[S]) -> CommandRef<'t> {
        let mut cmd = *self;
        for name in names {
            match cmd.child(name.as_ref()) {
                Some(child) => cmd = child,
                None => break,
            }
        }
        cmd
    }

    /// Finds a flag by long name (or short name when `short`), searching
    /// ancestors when `parents` is set. The nearest declaration wins.
    pub fn flag(&self, name: &str, parents: bool, short: bool) -> Option<&'t Flag> {
        let found = self.command().flags.iter().find(|g| {
            if short {
                g.matches_short(name)
            } else {
                g.matches_long(name)
            }
        });
        match (found, self.parent()) {
            (Some(flag), _) => Some(flag),
            (None, Some(parent)) if parents => parent.flag(name, parents, short),
            _ => None,
        }
    }

    /// Returns the first child carrying the `special` marker.
    pub fn command_special(&self, special: &str) -> Option<CommandRef<'t>> {
        self.children()
            .find(|c| c.command().special.as_deref() == Some(special))
    }

    /// Returns this command's flag carrying the `special` marker.
    pub fn flag_special(&self, special: &str) -> Option<&'t Flag> {
        self.command()
            .flags
            .iter()
            .find(|g| g.special.as_deref() == Some(special))
    }

    /// Names from the root down to this command.
    pub fn tree(&self) -> Vec<&'t str> {
        let mut names: Vec<&'t str> = self.ancestors().map(|c| c.name()).collect();
        names.reverse();
        names
    }

    /// Names from below the root down to this command.
    pub fn path(&self) -> Vec<&'t str> {
        let mut names = self.tree();
        names.remove(0);
        names
    }

    pub fn root_name(&self) -> &'t str {
        self.tree.root().name()
    }

    /// Effective suggestion distance.
    pub fn min_dist(&self) -> usize {
        match self.command().min_dist {
            0 => DEFAULT_MIN_DIST,
            n => n,
        }
    }

    /// Populates `vars` with this command's flag defaults.
    ///
    /// With `overwrite`, existing entries for these flags are dropped first.
    /// Flags without a default are skipped unless `all` is set, in which case
    /// they get their zero value. Hook flags are never populated. Explicit
    /// values are left alone, so populating twice changes nothing.
    pub fn populate(&self, ctx: &Context, all: bool, overwrite: bool, vars: &mut Vars) -> Result<()> {
        for flag in &self.command().flags {
            if overwrite {
                vars.remove(&flag.name);
            }
            if flag.ty == Type::Hook {
                continue;
            }
            let result = match &flag.default {
                Some(default) => ctx
                    .expand(default)
                    .and_then(|raw| vars.set(ctx, *self, flag, &raw, false)),
                None if all => vars.zero(flag),
                None => continue,
            };
            result.map_err(|e| Error::flag(format!("--{}", flag.name), e))?;
        }
        Ok(())
    }

    /// Runs the positional validators, wrapping failures with the command
    /// name.
    pub fn validate(&self, args: &[String]) -> Result<()> {
        for check in &self.command().args {
            check(args).map_err(|e| Error::command(self.name(), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn git() -> CommandTree {
        let mut tree = CommandTree::new(
            Command::new("git", "").with_flags(
                FlagSet::new()
                    .var(Flag::new("verbose", "", Type::Bool).with_short("v"))
                    .var(Flag::new("dir", "", Type::Path).with_short("C").with_default("/repo")),
            ),
        )
        .unwrap();
        let root = tree.root_id();
        let remote = tree
            .sub(root, Command::new("remote", "").with_alias("rem").with_special("group"))
            .unwrap();
        tree.sub(
            remote,
            Command::new("add", "").with_flags(
                FlagSet::new()
                    .var(Flag::new("verbose", "", Type::Count).with_short("V"))
                    .var(Flag::new("tags", "", Type::Bool).with_short("t").with_special("hook:tags")),
            ),
        )
        .unwrap();
        tree.sub(root, Command::new("push", "")).unwrap();
        tree
    }

    #[test]
    fn test_lookup_paths() {
        let tree = git();
        let root = tree.root();
        assert_eq!(root.lookup(&["remote", "add"]).name(), "add");
        assert_eq!(root.lookup(&["remote", "nope", "add"]).name(), "remote");
        assert_eq!(root.lookup::<&str>(&[]), root);
        assert_eq!(root.lookup(&["rem"]).name(), "remote");
        assert_eq!(root.lookup(&["remote", "add"]).path(), vec!["remote", "add"]);
        assert_eq!(root.lookup(&["push"]).root_name(), "git");
    }

    #[test]
    fn test_flag_lookup_long_and_short() {
        let tree = git();
        let add = tree.root().lookup(&["remote", "add"]);

        // Nearest declaration shadows the root's --verbose.
        assert_eq!(add.flag("verbose", true, false).unwrap().ty, Type::Count);
        assert_eq!(add.flag("V", true, true).unwrap().name, "verbose");
        assert_eq!(add.flag("v", true, true).unwrap().ty, Type::Bool);
        assert!(add.flag("v", false, true).is_none());
        assert_eq!(add.flag("dir", true, false).unwrap().short.as_deref(), Some("C"));
        assert!(add.flag("C", true, false).is_none());
        assert!(add.flag("missing", true, false).is_none());
    }

    #[test]
    fn test_specials() {
        let tree = git();
        let remote = tree.root().command_special("group").unwrap();
        assert_eq!(remote.name(), "remote");
        let add = remote.child("add").unwrap();
        assert_eq!(add.flag_special("hook:tags").unwrap().name, "tags");
        assert!(remote.flag_special("hook:tags").is_none());
    }

    #[test]
    fn test_sub_rejects_bad_children() {
        let mut tree = git();
        let root = tree.root_id();
        assert!(matches!(
            tree.sub(root, Command::new("push", "")),
            Err(Error::DuplicateCommand(n)) if n == "push"
        ));
        assert!(matches!(
            tree.sub(root, Command::new("", "")),
            Err(Error::CommandNameNotSet)
        ));
        let bad = Command::new("bad", "").with_flags(FlagSet::new().bool("x", "").bool("x", ""));
        let err = tree.sub(root, bad).unwrap_err();
        assert_eq!(err.to_string(), "command bad: duplicate flag in scope: --x");
    }

    #[test]
    fn test_on_err_is_inherited() {
        let mut tree = CommandTree::new(Command::new("app", "").with_on_err(OnErr::Continue)).unwrap();
        let root = tree.root_id();
        let a = tree.sub(root, Command::new("a", "")).unwrap();
        let b = tree.sub(root, Command::new("b", "").with_on_err(OnErr::Panic)).unwrap();
        assert_eq!(tree.get(a).command().on_err, Some(OnErr::Continue));
        assert_eq!(tree.get(b).command().on_err, Some(OnErr::Panic));
    }

    #[test]
    fn test_empty_root_name_uses_executable() {
        let tree = CommandTree::new(Command::new("", "")).unwrap();
        assert!(!tree.root().name().is_empty());
    }

    #[test]
    fn test_populate_is_idempotent() {
        let tree = git();
        let ctx = Context::discard();
        let root = tree.root();
        let mut vars = Vars::new();
        root.populate(&ctx, false, false, &mut vars).unwrap();
        let once = vars.clone();
        root.populate(&ctx, false, false, &mut vars).unwrap();
        assert_eq!(vars, once);
        assert_eq!(vars.get("dir"), Some(&Value::Path("/repo".into())));
        assert!(vars.get("verbose").is_none());

        root.populate(&ctx, true, false, &mut vars).unwrap();
        assert_eq!(vars.get("verbose"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_populate_keeps_explicit_values() {
        let tree = git();
        let ctx = Context::discard();
        let root = tree.root();
        let mut vars = Vars::new();
        let dir = root.flag("dir", false, false).unwrap();
        vars.set(&ctx, root, dir, "/elsewhere", true).unwrap();
        root.populate(&ctx, true, false, &mut vars).unwrap();
        assert_eq!(vars.string("dir").as_deref(), Some("/elsewhere"));

        root.populate(&ctx, false, true, &mut vars).unwrap();
        assert_eq!(vars.string("dir").as_deref(), Some("/repo"));
        assert!(!vars.is_set("dir"));
    }

    #[test]
    fn test_populate_wraps_flag_errors() {
        let tree = CommandTree::new(
            Command::new("app", "").with_flag(Flag::new("depth", "", Type::Int).with_default("deep")),
        )
        .unwrap();
        let mut vars = Vars::new();
        let err = tree
            .root()
            .populate(&Context::discard(), false, false, &mut vars)
            .unwrap_err();
        assert!(err.to_string().starts_with("--depth: invalid int value \"deep\""));
    }

    #[test]
    fn test_args_range() {
        let none = args_range(Some(0), Some(0), &[]);
        assert!(none(&[]).is_ok());
        assert!(matches!(none(&["x".into()]), Err(Error::InvalidArgCount(m)) if m == "takes no args"));

        let at_most = args_range(None, Some(1), &[]);
        assert!(at_most(&["a".into()]).is_ok());
        assert!(at_most(&["a".into(), "b".into()]).is_err());

        let at_least = args_range(Some(2), None, &[]);
        assert!(at_least(&["a".into()]).is_err());
        assert!(at_least(&["a".into(), "b".into(), "c".into()]).is_ok());

        let any = args_range(None, None, &["on", "off"]);
        assert!(any(&["on".into(), "off".into()]).is_ok());
        assert!(matches!(
            any(&["on".into(), "maybe".into()]),
            Err(Error::InvalidArgValue { index: 1, arg }) if arg == "maybe"
        ));
    }

    #[test]
    fn test_validate_wraps_with_command() {
        let mut tree = CommandTree::new(Command::new("app", "")).unwrap();
        let root = tree.root_id();
        let id = tree
            .sub(root, Command {
                args: vec![args_range(Some(1), Some(1), &[])],
                ..Command::new("run", "")
            })
            .unwrap();
        let err = tree.get(id).validate(&[]).unwrap_err();
        assert_eq!(err.to_string(), "command run: invalid arg count: takes 1-1 args");
    }

    #[test]
    fn test_tree_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandTree>();
    }
}

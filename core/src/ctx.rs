//! Per-invocation context: output sinks, default expansion, and the run loop.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::io::{self, Write};

use tracing::{debug, warn};

use crate::command::{CommandRef, CommandTree, OnErr};
use crate::error::{Error, Result};
use crate::parse::parse;
use crate::vars::Vars;

/// Expands flag default text before it is assigned.
pub trait Expander: Send + Sync {
    fn expand(&self, raw: &str) -> Result<String>;
}

/// Returns default text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralExpander;

impl Expander for LiteralExpander {
    fn expand(&self, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}

/// Expands `~`, `$VAR`, and `${VAR}` from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvExpander;

impl Expander for EnvExpander {
    fn expand(&self, raw: &str) -> Result<String> {
        shellexpand::full(raw)
            .map(|expanded| expanded.into_owned())
            .map_err(|e| Error::Expand {
                raw: raw.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Decides whether the parser may stop at an error and return what it has.
pub type ContinueFn = Box<dyn Fn(CommandRef<'_>, &Error) -> bool>;

/// Collaborators for one parse or run.
///
/// # Examples
///
/// ```
/// use argot_core::{Command, CommandTree, Context, Error, Vars};
///
/// let tree = CommandTree::new(Command::new("app", "").with_exec(|_ctx: &Context, _vars: &Vars, args: &[String]| {
///     if args.is_empty() {
///         Err(Error::Exec("nothing to do".into()))
///     } else {
///         Ok(())
///     }
/// }))
/// .unwrap();
///
/// let ctx = Context::discard();
/// assert!(ctx.run(&tree, &["work"]).is_ok());
/// assert_eq!(ctx.run::<&str>(&tree, &[]).unwrap_err().to_string(), "nothing to do");
/// ```
pub struct Context {
    stdout: RefCell<Box<dyn Write>>,
    stderr: RefCell<Box<dyn Write>>,
    expander: Box<dyn Expander>,
    continue_fn: Option<ContinueFn>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            stdout: RefCell::new(Box::new(io::stdout())),
            stderr: RefCell::new(Box::new(io::stderr())),
            expander: Box::new(EnvExpander),
            continue_fn: None,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("lenient", &self.continue_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Context writing to the process stdout and stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose output is thrown away.
    pub fn discard() -> Self {
        Self::new().with_stdout(io::sink()).with_stderr(io::sink())
    }

    pub fn with_stdout(mut self, w: impl Write + 'static) -> Self {
        self.stdout = RefCell::new(Box::new(w));
        self
    }

    pub fn with_stderr(mut self, w: impl Write + 'static) -> Self {
        self.stderr = RefCell::new(Box::new(w));
        self
    }

    pub fn with_expander(mut self, expander: impl Expander + 'static) -> Self {
        self.expander = Box::new(expander);
        self
    }

    /// Makes parsing lenient: errors accepted by `f` stop scanning without
    /// failing.
    pub fn with_continue<F>(mut self, f: F) -> Self
    where
        F: Fn(CommandRef<'_>, &Error) -> bool + 'static,
    {
        self.continue_fn = Some(Box::new(f));
        self
    }

    /// Borrows the output sink.
    ///
    /// # Panics
    ///
    /// Panics if the sink is already borrowed.
    pub fn stdout(&self) -> RefMut<'_, Box<dyn Write>> {
        self.stdout.borrow_mut()
    }

    /// Borrows the diagnostic sink.
    ///
    /// # Panics
    ///
    /// Panics if the sink is already borrowed.
    pub fn stderr(&self) -> RefMut<'_, Box<dyn Write>> {
        self.stderr.borrow_mut()
    }

    pub fn expand(&self, raw: &str) -> Result<String> {
        self.expander.expand(raw)
    }

    /// Returns `true` if the continuation predicate accepts `err`.
    pub fn should_continue(&self, cmd: CommandRef<'_>, err: &Error) -> bool {
        self.continue_fn.as_ref().is_some_and(|f| f(cmd, err))
    }

    /// Parses `args`, then validates and executes the resolved command.
    ///
    /// A command without a handler but with sub commands that receives
    /// positional arguments fails with a suggestion. Errors go through the
    /// resolved command's [`OnErr`] policy; [`Error::Exit`] counts as
    /// success.
    pub fn run<S: AsRef<str>>(&self, tree: &CommandTree, args: &[S]) -> Result<()> {
        let mut vars = Vars::new();
        let (cmd, rest) = match parse(self, tree, args, &mut vars) {
            Ok(resolved) => resolved,
            Err(err) => return self.handle(tree.root(), err),
        };
        debug!(command = %cmd.tree().join(" "), args = rest.len(), "resolved command");
        let result = self.exec(cmd, &vars, &rest);
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.handle(cmd, err),
        }
    }

    fn exec(&self, cmd: CommandRef<'_>, vars: &Vars, args: &[String]) -> Result<()> {
        let command = cmd.command();
        if command.exec.is_none() && cmd.has_children() {
            if let Some(first) = args.first() {
                return Err(cmd.suggest(first));
            }
        }
        cmd.validate(args)?;
        match &command.exec {
            Some(exec) => exec(self, vars, args),
            None => Ok(()),
        }
    }

    fn handle(&self, cmd: CommandRef<'_>, err: Error) -> Result<()> {
        if err.is_exit() {
            debug!(command = %cmd.name(), "exit requested");
            return Ok(());
        }
        match cmd.command().on_err.unwrap_or_default() {
            OnErr::Continue => {
                warn!(command = %cmd.name(), error = %err, "continuing after error");
                Ok(())
            }
            OnErr::Panic => panic!("{err}"),
            OnErr::Error => Err(err),
        }
    }
}

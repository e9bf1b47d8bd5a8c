//! Parsed flag variables for one invocation.

use std::collections::BTreeMap;

use tracing::trace;

use crate::command::CommandRef;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::value::{Type, Value};

/// A flag's live value and whether the user set it.
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub value: Value,
    /// `true` once assigned from the command line (or another explicit source).
    pub explicit: bool,
}

/// Variables keyed by flag long name.
///
/// Defaults are written non-explicitly; command-line assignments are
/// explicit and are never replaced by later defaults.
///
/// # Examples
///
/// ```
/// use argot_core::{Command, CommandTree, Context, Flag, Type, Vars};
///
/// let tree = CommandTree::new(
///     Command::new("app", "").with_flag(Flag::new("name", "", Type::String).with_default("anon")),
/// )
/// .unwrap();
/// let ctx = Context::discard();
/// let root = tree.root();
/// let flag = root.flag("name", false, false).unwrap();
///
/// let mut vars = Vars::new();
/// vars.set(&ctx, root, flag, "alice", true).unwrap();
/// vars.set(&ctx, root, flag, "anon", false).unwrap();
/// assert_eq!(vars.string("name").as_deref(), Some("alice"));
/// assert!(vars.is_set("name"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vars {
    vars: BTreeMap<String, Var>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `raw` to `flag`.
    ///
    /// Hook flags run their action instead and return its result. A
    /// non-explicit assignment never replaces an explicit one. The first
    /// explicit assignment replaces a default; later ones overwrite scalars,
    /// increment counts, and append to or merge containers. On error the
    /// existing entry is left unchanged.
    pub fn set(&mut self, ctx: &Context, cmd: CommandRef<'_>, flag: &Flag, raw: &str, explicit: bool) -> Result<()> {
        if flag.ty == Type::Hook {
            let hook = flag
                .hook
                .as_ref()
                .ok_or_else(|| Error::MissingHookAction(flag.name.clone()))?;
            trace!(flag = %flag.name, command = %cmd.name(), "run hook");
            return hook.call(ctx, cmd);
        }
        let value = match self.vars.get(&flag.name) {
            Some(var) if var.explicit && !explicit => {
                trace!(flag = %flag.name, "keep explicit value");
                return Ok(());
            }
            Some(var) if var.explicit => {
                let mut value = var.value.clone();
                value.set(raw)?;
                value
            }
            _ => {
                let mut value = flag.new_value()?;
                value.set(raw)?;
                value
            }
        };
        trace!(flag = %flag.name, raw, explicit, "assign");
        for binder in &flag.binds {
            binder.bind(&value, explicit);
        }
        self.vars.insert(flag.name.clone(), Var { value, explicit });
        Ok(())
    }

    /// Inserts the flag's zero value unless it is already explicitly set.
    pub fn zero(&mut self, flag: &Flag) -> Result<()> {
        if flag.ty == Type::Hook || self.is_set(&flag.name) {
            return Ok(());
        }
        let value = flag.new_value()?;
        self.vars.insert(flag.name.clone(), Var { value, explicit: false });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|var| &var.value)
    }

    pub fn var(&self, name: &str) -> Option<&Var> {
        self.vars.get(name)
    }

    /// Returns `true` if the variable was explicitly set.
    pub fn is_set(&self, name: &str) -> bool {
        self.vars.get(name).is_some_and(|var| var.explicit)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Returns the rendered text of any variable.
    pub fn string(&self, name: &str) -> Option<String> {
        self.get(name).map(Value::render)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Returns a slice's items rendered as text, or a scalar as one item.
    pub fn strings(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(Value::Slice(slice)) => slice.items.iter().map(Value::render).collect(),
            Some(value) => vec![value.render()],
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Var)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), var))
    }

    pub fn remove(&mut self, name: &str) -> Option<Var> {
        self.vars.remove(name)
    }
}

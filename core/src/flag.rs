//! Flag declarations and per-command flag sets.
//!
//! A [`Flag`] describes one command-line option: its long and short names,
//! its [`Type`], its default, and whether it takes an argument. Flags are
//! grouped into a [`FlagSet`] owned by a single command.
//!
//! # Examples
//!
//! ```
//! use argot_core::{Flag, FlagSet, Type};
//!
//! let flags = FlagSet::new()
//!     .bool("verbose", "enable verbose output")
//!     .var(Flag::new("depth", "history depth", Type::Int).with_short("d").with_default("1"));
//!
//! assert!(flags.validate().is_ok());
//! assert!(flags.get("verbose").unwrap().no_arg);
//! assert_eq!(flags.get("depth").unwrap().spec_string(), "depth int");
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::command::CommandRef;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::scalar;
use crate::value::{Hook, Type, Value};

/// Special marker for the generated help flag.
pub const SPECIAL_HELP: &str = "hook:help";
/// Special marker for the generated version flag.
pub const SPECIAL_VERSION: &str = "hook:version";

/// Receives every assignment made to a flag.
pub trait Binder: fmt::Debug + Send + Sync {
    /// Binding name, unique per flag.
    fn name(&self) -> &str;

    /// Called with the flag's new value after each assignment.
    fn bind(&self, value: &Value, explicit: bool);

    /// Returns the shared marker if this binder is a [`SetMarker`].
    fn as_marker(&self) -> Option<&Arc<AtomicBool>> {
        None
    }

    /// Returns the shared cell if this binder is a [`Slot`].
    fn as_slot(&self) -> Option<&Arc<Mutex<Option<Value>>>> {
        None
    }
}

/// Flips a shared boolean when its flag is set on the command line.
#[derive(Debug, Clone)]
pub struct SetMarker {
    name: String,
    set: Arc<AtomicBool>,
}

impl SetMarker {
    pub fn new(name: impl Into<String>, set: Arc<AtomicBool>) -> Self {
        Self {
            name: name.into(),
            set,
        }
    }
}

impl Binder for SetMarker {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, _value: &Value, explicit: bool) {
        if explicit {
            self.set.store(true, Ordering::SeqCst);
        }
    }

    fn as_marker(&self) -> Option<&Arc<AtomicBool>> {
        Some(&self.set)
    }
}

/// Mirrors the latest value assigned to its flag.
#[derive(Debug, Clone)]
pub struct Slot {
    name: String,
    cell: Arc<Mutex<Option<Value>>>,
}

impl Slot {
    pub fn new(name: impl Into<String>, cell: Arc<Mutex<Option<Value>>>) -> Self {
        Self {
            name: name.into(),
            cell,
        }
    }
}

impl Binder for Slot {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, value: &Value, _explicit: bool) {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        *cell = Some(value.clone());
    }

    fn as_slot(&self) -> Option<&Arc<Mutex<Option<Value>>>> {
        Some(&self.cell)
    }
}

/// A command-line flag declaration.
///
/// Build with [`Flag::new`] and the chained `with_*` setters. `bool`,
/// `count`, and `hook` flags take no argument by default.
#[derive(Debug, Clone)]
pub struct Flag {
    /// Long name, used as `--name` and as the key in [`Vars`](crate::Vars).
    pub name: String,
    pub usage: String,
    /// Single-character short name, used as `-x`.
    pub short: Option<String>,
    /// Extra names. One-character aliases are short aliases.
    pub aliases: Vec<String>,
    pub ty: Type,
    /// Element type for slices and maps.
    pub elem: Type,
    /// Key type for maps.
    pub map_key: Type,
    /// Default text, expanded by the context before assignment.
    pub default: Option<String>,
    /// Action for hook flags.
    pub hook: Option<Hook>,
    /// When set, the flag never consumes the next token.
    pub no_arg: bool,
    /// Value assigned when a no-argument flag appears without `=`.
    pub no_arg_default: Option<String>,
    pub binds: Vec<Arc<dyn Binder>>,
    /// Config-file lookup keys by format (`"yaml"`, `"json"`, or `""` for any).
    pub keys: BTreeMap<String, String>,
    pub section: Option<usize>,
    pub hidden: bool,
    pub deprecated: bool,
    pub special: Option<String>,
    /// Argument placeholder shown in help.
    pub spec: Option<String>,
    /// strftime layout for time types and time elements.
    pub layout: Option<String>,
}

impl Flag {
    /// Creates a flag with the options implied by `ty`.
    pub fn new(name: impl Into<String>, usage: impl Into<String>, ty: Type) -> Self {
        let no_arg_default = match ty {
            Type::Bool => Some("true".to_string()),
            Type::Count | Type::Hook => Some(String::new()),
            _ => None,
        };
        Self {
            name: name.into(),
            usage: usage.into(),
            short: None,
            aliases: Vec::new(),
            ty,
            elem: Type::String,
            map_key: Type::String,
            default: None,
            hook: None,
            no_arg: no_arg_default.is_some(),
            no_arg_default,
            binds: Vec::new(),
            keys: BTreeMap::new(),
            section: None,
            hidden: false,
            deprecated: false,
            special: None,
            spec: None,
            layout: None,
        }
    }

    /// Builds a `--help`/`-h` hook that prints the command's usage line.
    pub fn help() -> Self {
        Flag::new("help", "show help, then exit", Type::Hook)
            .with_short("h")
            .with_special(SPECIAL_HELP)
            .with_hook(|ctx: &Context, cmd: CommandRef<'_>| {
                let usage = &cmd.command().usage;
                let line = if usage.is_empty() {
                    format!("usage: {} [flags] [args]", cmd.tree().join(" "))
                } else {
                    format!("usage: {} [flags] [args]\n\n{usage}", cmd.tree().join(" "))
                };
                writeln!(ctx.stdout(), "{line}").map_err(|e| Error::Exec(e.to_string()))?;
                Err(Error::Exit)
            })
    }

    /// Builds a `--version`/`-v` hook that prints `root version`.
    pub fn version(version: impl Into<String>) -> Self {
        let version = version.into();
        Flag::new("version", "show version, then exit", Type::Hook)
            .with_short("v")
            .with_special(SPECIAL_VERSION)
            .with_hook(move |ctx: &Context, cmd: CommandRef<'_>| {
                writeln!(ctx.stdout(), "{} {version}", cmd.root_name())
                    .map_err(|e| Error::Exec(e.to_string()))?;
                Err(Error::Exit)
            })
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_elem(mut self, elem: Type) -> Self {
        self.elem = elem;
        self
    }

    pub fn with_map_key(mut self, key: Type) -> Self {
        self.map_key = key;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Marks the flag as taking no argument, assigning `default` when present.
    pub fn with_no_arg(mut self, default: impl Into<String>) -> Self {
        self.no_arg = true;
        self.no_arg_default = Some(default.into());
        self
    }

    pub fn with_hook<F>(mut self, f: F) -> Self
    where
        F: Fn(&Context, CommandRef<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Hook::new(f));
        self
    }

    pub fn with_bind(mut self, binder: impl Binder + 'static) -> Self {
        self.binds.push(Arc::new(binder));
        self
    }

    /// Sets the config lookup key for `format` (`""` matches any format).
    pub fn with_key(mut self, format: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(format.into(), key.into());
        self
    }

    pub fn with_section(mut self, section: usize) -> Self {
        self.section = Some(section);
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

    pub fn with_special(mut self, special: impl Into<String>) -> Self {
        self.special = Some(special.into());
        self
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    /// Sets the text layout used by `timestamp`, `datetime`, `date`, and
    /// `time` values, in chrono's strftime syntax.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Returns `true` if `name` is the long name or a long alias.
    pub fn matches_long(&self, name: &str) -> bool {
        self.name == name
            || self
                .aliases
                .iter()
                .any(|alias| alias == name && alias.chars().count() != 1)
    }

    /// Returns `true` if `name` is the short name or a short alias.
    pub fn matches_short(&self, name: &str) -> bool {
        self.short.as_deref() == Some(name)
            || self
                .aliases
                .iter()
                .any(|alias| alias == name && alias.chars().count() == 1)
    }

    /// Short name and short aliases.
    pub fn shorts(&self) -> impl Iterator<Item = &str> {
        self.short
            .as_deref()
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str).filter(|a| a.chars().count() == 1))
    }

    /// Long name and long aliases.
    pub fn longs(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str).filter(|a| a.chars().count() != 1))
    }

    /// Returns the config lookup key for `format`, falling back to the
    /// any-format key.
    pub fn key(&self, format: &str) -> Option<&str> {
        self.keys
            .get(format)
            .or_else(|| self.keys.get(""))
            .map(String::as_str)
    }

    /// Returns the shared marker of the [`SetMarker`] bound as `name`.
    pub fn marker(&self, name: &str) -> Option<Arc<AtomicBool>> {
        self.binds
            .iter()
            .find(|b| b.name() == name)
            .and_then(|b| b.as_marker().cloned())
    }

    /// Returns the shared cell of the [`Slot`] bound as `name`.
    pub fn slot(&self, name: &str) -> Option<Arc<Mutex<Option<Value>>>> {
        self.binds
            .iter()
            .find(|b| b.name() == name)
            .and_then(|b| b.as_slot().cloned())
    }

    /// Checks the declaration for configuration errors.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.starts_with('-') {
            return Err(Error::InvalidFlagName);
        }
        if let Some(short) = &self.short {
            if short.chars().count() != 1 || short == "-" {
                return Err(Error::InvalidShortName(short.clone()));
            }
        }
        if self.aliases.iter().any(|a| a.is_empty() || a.starts_with('-')) {
            return Err(Error::InvalidFlagName);
        }
        if self.no_arg && self.no_arg_default.is_none() {
            return Err(Error::MissingNoArgDefault(self.name.clone()));
        }
        if self.ty == Type::Hook && self.hook.is_none() {
            return Err(Error::MissingHookAction(self.name.clone()));
        }
        let mut bound = HashSet::new();
        for binder in &self.binds {
            if !bound.insert(binder.name()) {
                return Err(Error::DuplicateBinding(binder.name().to_string()));
            }
        }
        if self.ty.is_container() && !self.elem.is_element() {
            return Err(Error::InvalidType(format!(
                "flag {}: {} is not a valid element type",
                self.name, self.elem
            )));
        }
        if self.ty == Type::Map && !self.map_key.is_map_key() {
            return Err(Error::InvalidType(format!(
                "flag {}: {} is not a valid map key type",
                self.name, self.map_key
            )));
        }
        if let Some(layout) = &self.layout {
            let timed = self.ty.is_time() || (self.ty.is_container() && self.elem.is_time());
            if !timed {
                return Err(Error::InvalidLayout {
                    flag: self.name.clone(),
                    reason: format!("{} values take no layout", self.ty),
                });
            }
            scalar::check_layout(layout).map_err(|reason| Error::InvalidLayout {
                flag: self.name.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Builds a fresh value for this flag, honoring element and key types
    /// and the time layout.
    pub fn new_value(&self) -> Result<Value> {
        let value = match self.ty {
            Type::Slice => Value::slice(self.elem)?,
            Type::Map => Value::map(self.map_key, self.elem)?,
            Type::Hook => {
                return self
                    .hook
                    .clone()
                    .map(Value::Hook)
                    .ok_or_else(|| Error::MissingHookAction(self.name.clone()));
            }
            ty => ty.new_value()?,
        };
        Ok(value.with_layout(self.layout.as_deref()))
    }

    /// Returns the usage spec, e.g. `depth int` or `env string=string`.
    pub fn spec_string(&self) -> String {
        if self.no_arg || self.ty == Type::Hook {
            return self.name.clone();
        }
        match (&self.spec, self.ty) {
            (Some(spec), _) => format!("{} {spec}", self.name),
            (None, Type::Slice) => format!("{} {}", self.name, self.elem),
            (None, Type::Map) => format!("{} {}={}", self.name, self.map_key, self.elem),
            (None, ty) => format!("{} {ty}", self.name),
        }
    }
}

/// Ordered flags owned by one command.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flag.
    pub fn var(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn string(self, name: &str, usage: &str) -> Self {
        self.var(Flag::new(name, usage, Type::String))
    }

    pub fn bool(self, name: &str, usage: &str) -> Self {
        self.var(Flag::new(name, usage, Type::Bool))
    }

    pub fn int(self, name: &str, usage: &str) -> Self {
        self.var(Flag::new(name, usage, Type::Int))
    }

    pub fn count(self, name: &str, usage: &str) -> Self {
        self.var(Flag::new(name, usage, Type::Count))
    }

    pub fn slice(self, name: &str, usage: &str, elem: Type) -> Self {
        self.var(Flag::new(name, usage, Type::Slice).with_elem(elem))
    }

    pub fn map(self, name: &str, usage: &str, key: Type, elem: Type) -> Self {
        self.var(Flag::new(name, usage, Type::Map).with_map_key(key).with_elem(elem))
    }

    pub fn hook<F>(self, name: &str, usage: &str, f: F) -> Self
    where
        F: Fn(&Context, CommandRef<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.var(Flag::new(name, usage, Type::Hook).with_hook(f))
    }

    pub fn push(&mut self, flag: Flag) {
        self.flags.push(flag);
    }

    /// Returns the flag with long name `name`.
    pub fn get(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|g| g.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Validates every flag and checks long and short names are unique.
    pub fn validate(&self) -> Result<()> {
        let mut longs = HashSet::new();
        let mut shorts = HashSet::new();
        for flag in &self.flags {
            flag.validate()?;
            for long in flag.longs() {
                if !longs.insert(long) {
                    return Err(Error::DuplicateFlag(format!("--{long}")));
                }
            }
            for short in flag.shorts() {
                if !shorts.insert(short) {
                    return Err(Error::DuplicateFlag(format!("-{short}")));
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FlagSet {
    type Item = &'a Flag;
    type IntoIter = std::slice::Iter<'a, Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.iter()
    }
}

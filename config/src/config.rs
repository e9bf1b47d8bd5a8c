//! Flag values from YAML or JSON config files.
//!
//! A [`ConfigFile`] holds a parsed document. [`ConfigFile::apply`] looks up
//! each flag visible from a command under its config key (or its long name)
//! as a dotted path, and assigns what it finds without marking the flag as
//! explicitly set. Values from the command line therefore always win, and
//! config values always replace flag defaults.
//!
//! # Example YAML
//!
//! ```yaml
//! clone:
//!   depth: 1
//! origin: upstream
//! tags: [a, b]
//! env:
//!   HOME: /root
//! ```

use std::collections::HashSet;
use std::path::Path;

use argot_core::scalar::escape;
use argot_core::{CommandRef, Context, Error, Type, Vars};
use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::error::Result;
use crate::format::Format;

/// A parsed config document.
///
/// # Examples
///
/// ```
/// use argot_config::{ConfigFile, Format};
/// use argot_core::{parse, Command, CommandTree, Context, Flag, Type, Vars};
///
/// let tree = CommandTree::new(
///     Command::new("app", "")
///         .with_flag(Flag::new("workers", "", Type::Int).with_default("1").with_key("yaml", "pool.size")),
/// )
/// .unwrap();
/// let config = ConfigFile::from_text(Format::Yaml, "pool:\n  size: 8\n").unwrap();
///
/// let ctx = Context::discard();
/// let mut vars = Vars::new();
/// let (cmd, _) = parse::<&str>(&ctx, &tree, &[], &mut vars).unwrap();
/// assert_eq!(config.apply(&ctx, cmd, &mut vars).unwrap(), 1);
/// assert_eq!(vars.int("workers"), Some(8));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    format: Format,
    doc: Json,
}

impl ConfigFile {
    /// Loads a document, choosing YAML or JSON by file extension.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConfigError::IoError) if the file cannot be
    /// read, [`UnsupportedFormat`](crate::ConfigError::UnsupportedFormat)
    /// for other extensions, or a parse error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), %format, "load config file");
        Self::from_text(format, &text)
    }

    /// Parses `text` in `format`.
    pub fn from_text(format: Format, text: &str) -> Result<Self> {
        let doc = format.parse(text)?;
        Ok(Self { format, doc })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Looks up a dotted `key` path; `null` counts as absent.
    pub fn lookup(&self, key: &str) -> Option<&Json> {
        key.split('.')
            .try_fold(&self.doc, |node, part| node.get(part))
            .filter(|value| !value.is_null())
    }

    /// Assigns config values to every flag of `cmd` and its ancestors that
    /// is not already explicitly set, nearest declaration first. Hook flags
    /// are skipped. Returns the number of flags assigned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`](crate::ConfigError::CoreError) wrapping the flag
    /// when a value does not coerce to the flag's type.
    pub fn apply(&self, ctx: &Context, cmd: CommandRef<'_>, vars: &mut Vars) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut applied = 0;
        for owner in cmd.ancestors() {
            for flag in &owner.command().flags {
                if !seen.insert(flag.name.as_str()) || flag.ty == Type::Hook || vars.is_set(&flag.name) {
                    continue;
                }
                let key = flag.key(self.format.name()).unwrap_or(&flag.name);
                let Some(value) = self.lookup(key) else {
                    continue;
                };
                let raw = raw_value(value);
                trace!(flag = %flag.name, key, raw = %raw, "config value");
                vars.set(ctx, owner, flag, &raw, false)
                    .map_err(|e| Error::flag(format!("--{}", flag.name), e))?;
                applied += 1;
            }
        }
        debug!(command = %cmd.name(), applied, "applied config");
        Ok(applied)
    }
}

/// Renders a document value as flag text. Sequences become escaped
/// comma-separated items, mappings become `k=v` items.
fn raw_value(value: &Json) -> String {
    match value {
        Json::Array(items) => items
            .iter()
            .map(|item| escape(&scalar(item), ','))
            .collect::<Vec<_>>()
            .join(","),
        Json::Object(entries) => entries
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k, ','), escape(&scalar(v), ',')))
            .collect::<Vec<_>>()
            .join(","),
        other => scalar(other),
    }
}

fn scalar(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

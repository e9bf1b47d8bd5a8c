//! Command tree declaration files.
//!
//! A [`TreeFile`] describes a command, its flags, and its sub commands in
//! YAML or JSON, and builds into an [`argot_core::CommandTree`].
//!
//! # Example YAML
//!
//! ```yaml
//! name: git
//! usage: the stupid content tracker
//! version: 2.45.0
//! flags:
//!   - name: verbose
//!     short: v
//!     type: count
//!   - name: help
//!     type: hook
//!     special: hook:help
//! commands:
//!   - name: clone
//!     usage: clone a repository
//!     args: { min: 1, max: 2 }
//!     flags:
//!       - { name: depth, type: uint, default: "0" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use argot_core::{
    Command, CommandId, CommandTree, Error, Flag, OnErr, SPECIAL_HELP, SPECIAL_VERSION, Type,
    args_range,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::format::Format;

/// Positional argument constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgsSpec {
    pub min: Option<usize>,
    pub max: Option<usize>,
    /// Allowed values; empty allows anything.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// A declared flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSpec {
    pub name: String,
    #[serde(default)]
    pub usage: String,
    #[serde(rename = "type", default = "default_type")]
    pub ty: Type,
    /// Slice or map element type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elem: Option<Type>,
    /// Map key type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Marks the flag as taking no argument, assigning this text when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_arg: Option<String>,
    /// Config lookup keys by format (`yaml`, `json`, or `""` for any).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// strftime layout for time values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

fn default_type() -> Type {
    Type::String
}

impl FlagSpec {
    /// Builds the flag. Hook flags are only buildable for the help and
    /// version specials, since a file cannot carry an action.
    pub fn build(&self, version: Option<&str>) -> argot_core::Result<Flag> {
        let mut flag = match (self.ty, self.special.as_deref()) {
            (Type::Hook, Some(SPECIAL_HELP)) => Flag {
                name: self.name.clone(),
                ..Flag::help()
            },
            (Type::Hook, Some(SPECIAL_VERSION)) => Flag {
                name: self.name.clone(),
                ..Flag::version(version.unwrap_or_default())
            },
            (Type::Hook, _) => return Err(Error::MissingHookAction(self.name.clone())),
            (ty, _) => Flag::new(&self.name, &self.usage, ty),
        };
        if !self.usage.is_empty() {
            flag.usage = self.usage.clone();
        }
        if let Some(short) = &self.short {
            flag = flag.with_short(short);
        }
        if let Some(elem) = self.elem {
            flag = flag.with_elem(elem);
        }
        if let Some(key) = self.key {
            flag = flag.with_map_key(key);
        }
        if let Some(default) = &self.default {
            flag = flag.with_default(default);
        }
        if let Some(no_arg) = &self.no_arg {
            flag = flag.with_no_arg(no_arg);
        }
        if let Some(section) = self.section {
            flag = flag.with_section(section);
        }
        if let Some(special) = &self.special {
            flag = flag.with_special(special);
        }
        if let Some(spec) = &self.spec {
            flag = flag.with_spec(spec);
        }
        if let Some(layout) = &self.layout {
            flag = flag.with_layout(layout);
        }
        flag.aliases.extend(self.aliases.iter().cloned());
        flag.keys.extend(self.keys.clone());
        flag.hidden |= self.hidden;
        flag.deprecated |= self.deprecated;
        Ok(flag)
    }
}

/// A declared command and its descendants.
///
/// # Examples
///
/// ```
/// use argot_config::TreeFile;
///
/// let file = TreeFile::from_yaml_str(
///     "name: app\ncommands:\n  - name: run\n    aliases: [r]\n",
/// )
/// .unwrap();
/// let tree = file.build().unwrap();
/// assert_eq!(tree.root().lookup(&["r"]).name(), "run");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeFile {
    pub name: String,
    pub usage: String,
    /// Version printed by a `hook:version` flag; read from the root only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested: Vec<String>,
    pub hidden: bool,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<usize>,
    /// Suggestion distance; `0` keeps the default.
    pub min_dist: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_err: Option<OnErr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<ArgsSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<TreeFile>,
}

impl TreeFile {
    /// Loads a declaration, choosing YAML or JSON by file extension.
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
        debug!(path = %path.display(), %format, "load tree file");
        format.parse(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the command tree.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`](crate::ConfigError::CoreError) for any invalid
    /// command or flag declaration.
    pub fn build(&self) -> Result<CommandTree> {
        let version = self.version.as_deref();
        let mut tree = CommandTree::new(self.command(version)?)?;
        let root = tree.root_id();
        for child in &self.commands {
            child.add_to(&mut tree, root, version)?;
        }
        debug!(root = %tree.root().name(), commands = tree.len(), "built command tree");
        Ok(tree)
    }

    fn add_to(&self, tree: &mut CommandTree, parent: CommandId, version: Option<&str>) -> Result<()> {
        let id = tree.sub(parent, self.command(version)?)?;
        for child in &self.commands {
            child.add_to(tree, id, version)?;
        }
        Ok(())
    }

    fn command(&self, version: Option<&str>) -> argot_core::Result<Command> {
        let mut cmd = Command::new(&self.name, &self.usage);
        cmd.aliases = self.aliases.clone();
        cmd.suggested = self.suggested.clone();
        cmd.hidden = self.hidden;
        cmd.deprecated = self.deprecated;
        cmd.special = self.special.clone();
        cmd.section = self.section;
        cmd.min_dist = self.min_dist;
        cmd.on_err = self.on_err;
        if let Some(args) = &self.args {
            let values: Vec<&str> = args.values.iter().map(String::as_str).collect();
            cmd.args.push(args_range(args.min, args.max, &values));
        }
        for spec in &self.flags {
            let flag = spec
                .build(version)
                .map_err(|e| Error::command(&self.name, Error::flag(format!("--{}", spec.name), e)))?;
            cmd.flags.push(flag);
        }
        Ok(cmd)
    }
}

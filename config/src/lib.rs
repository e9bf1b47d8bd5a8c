//! File-backed declarations and defaults for argot command trees.
//!
//! - [`TreeFile`]: a YAML or JSON description of a command tree, built into
//!   an [`argot_core::CommandTree`].
//! - [`ConfigFile`]: a YAML or JSON document whose values fill flags that
//!   were not given on the command line.
//!
//! Precedence is flag default, then config file, then command line.
//!
//! # Quick start
//!
//! ```no_run
//! use argot_config::{ConfigFile, TreeFile};
//! use argot_core::{parse, Context, Vars};
//!
//! let tree = TreeFile::load("git.yaml").unwrap().build().unwrap();
//! let config = ConfigFile::load("gitconfig.yaml").unwrap();
//!
//! let ctx = Context::new();
//! let mut vars = Vars::new();
//! let (cmd, args) = parse(&ctx, &tree, &["clone", "repo"], &mut vars).unwrap();
//! config.apply(&ctx, cmd, &mut vars).unwrap();
//! println!("{} {:?}", cmd.name(), args);
//! ```

mod config;
mod error;
mod format;
mod tree;

pub use config::ConfigFile;
pub use error::{ConfigError, Result};
pub use format::Format;
pub use tree::{ArgsSpec, FlagSpec, TreeFile};

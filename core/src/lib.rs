//! Command tree resolution, typed flag values, and argv parsing.
//!
//! This crate turns a flat argument list into a resolved command, its
//! positional arguments, and a table of typed flag variables:
//!
//! - [`CommandTree`]: arena of [`Command`]s, walked through [`CommandRef`]
//!   handles.
//! - [`Flag`] / [`FlagSet`]: flag declarations with a [`Type`], defaults,
//!   short names, aliases, and binders.
//! - [`Value`]: one variant per supported type, with text coercion and
//!   format-stable rendering.
//! - [`Vars`]: live values for one invocation, tracking which were set
//!   explicitly.
//! - [`parse`]: the token scanner; [`Context::run`] adds validation,
//!   execution, and error policy on top.
//! - [`CommandRef::suggest`] and [`CommandRef::comps`]: edit-distance
//!   suggestions and shell completion candidates.
//! - [`flags_from`]: flags from annotated record types.
//!
//! # Example
//!
//! ```
//! use argot_core::*;
//!
//! let mut tree = CommandTree::new(
//!     Command::new("git", "content tracker").with_flags(
//!         FlagSet::new()
//!             .var(Flag::new("verbose", "be verbose", Type::Count).with_short("v"))
//!             .var(Flag::help()),
//!     ),
//! )
//! .unwrap();
//! tree.sub(
//!     tree.root_id(),
//!     Command::new("clone", "clone a repository")
//!         .with_flag(Flag::new("depth", "history depth", Type::Int).with_default("0")),
//! )
//! .unwrap();
//!
//! let mut vars = Vars::new();
//! let (cmd, args) = parse(&Context::discard(), &tree, &["-vv", "clone", "--depth=1", "repo"], &mut vars).unwrap();
//! assert_eq!(cmd.tree(), vec!["git", "clone"]);
//! assert_eq!(args, vec!["repo"]);
//! assert_eq!(vars.int("verbose"), Some(2));
//! assert_eq!(vars.int("depth"), Some(1));
//!
//! let err = parse(&Context::discard(), &tree, &["clone", "--dpeth", "1"], &mut Vars::new()).unwrap_err();
//! assert_eq!(err.to_string(), "--dpeth: unknown flag for \"clone\"");
//!
//! let err = tree.root().suggest("clnoe");
//! assert_eq!(err.to_string(), "unknown command \"clnoe\" for \"git\", did you mean \"clone\"?");
//! ```

mod command;
mod comp;
mod ctx;
mod error;
mod flag;
mod parse;
pub mod scalar;
mod suggest;
mod tag;
mod value;
mod vars;

pub use command::{ArgsFn, Command, CommandId, CommandRef, CommandTree, ExecFn, OnErr, args_range};
pub use comp::{CompDirective, Completion};
pub use ctx::{Context, ContinueFn, EnvExpander, Expander, LiteralExpander};
pub use error::{Error, ErrorKind, Result};
pub use flag::{Binder, Flag, FlagSet, SPECIAL_HELP, SPECIAL_VERSION, SetMarker, Slot};
pub use parse::{parse, parse_from};
pub use scalar::{Color, Prefix};
pub use suggest::{DEFAULT_MIN_DIST, ldist};
pub use tag::{Annotated, Annotation, NameMapper, flags_from, kebab_case};
pub use value::{DATE_LAYOUT, DATETIME_LAYOUT, Hook, HookFn, MapKey, MapValue, SliceValue, TIME_LAYOUT, Type, Value};
pub use vars::{Var, Vars};

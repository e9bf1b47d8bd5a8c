//! Declarative flag definitions from annotated records.
//!
//! A record type lists its fields with a [`Type`] and a tag string through
//! [`Annotated`]; [`flags_from`] turns every tagged field into a [`Flag`].
//! A tag is the flag's description followed by comma-separated options
//! (`\,` keeps a literal comma):
//!
//! | Option            | Effect                                        |
//! |-------------------|-----------------------------------------------|
//! | `type:T`          | flag type (overrides the field type)          |
//! | `mapkey:T`        | map key type                                  |
//! | `elem:T`          | slice or map element type                     |
//! | `name:N`          | long name (instead of the mapped field name)  |
//! | `short:c`         | short name                                    |
//! | `alias:A`         | one alias                                     |
//! | `aliases:A\|B`    | several aliases                               |
//! | `spec:S`          | usage spec text                               |
//! | `default:D`       | default text (expanded at populate time)      |
//! | `layout:L`        | strftime layout for time values               |
//! | `noarg:D`         | takes no argument, assigning `D` when given   |
//! | `key:[fmt\|]K`    | config lookup key, optionally per format      |
//! | `hook:H`          | special marker `hook:H`                       |
//! | `section:N`       | help section index                            |
//! | `hidden`          | hide from completion                          |
//! | `deprecated`      | mark deprecated                               |
//! | `set:Field`       | flip the bool `Field` on explicit assignment  |
//!
//! Fields with an empty tag or a tag of `-` produce no flag. Every flag
//! binds a [`Slot`] named after its field, so callers read assigned values
//! back with [`Flag::slot`]; `set:` markers are read with [`Flag::marker`].

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::error::{Error, Result};
use crate::flag::{Flag, SetMarker, Slot};
use crate::scalar::split_escaped;
use crate::value::Type;

/// One field of an annotated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation {
    /// Field name, conventionally `CamelCase`.
    pub field: &'static str,
    /// Type implied by the field.
    pub ty: Type,
    /// Tag text; empty for fields that are not flags.
    pub tag: &'static str,
}

impl Annotation {
    pub const fn new(field: &'static str, ty: Type, tag: &'static str) -> Self {
        Self { field, ty, tag }
    }
}

/// A record type whose fields can be turned into flags.
pub trait Annotated {
    /// Fields in declaration order.
    fn annotations() -> Vec<Annotation>;
}

/// Maps a field name to a long flag name.
pub type NameMapper = fn(&str) -> String;

/// Converts `CamelCase` and `snake_case` names to `kebab-case`.
///
/// Runs of capitals are kept together as one word.
///
/// # Examples
///
/// ```
/// use argot_core::kebab_case;
///
/// assert_eq!(kebab_case("MyURLSet"), "my-url-set");
/// assert_eq!(kebab_case("HTTPServer"), "http-server");
/// assert_eq!(kebab_case("snake_case"), "snake-case");
/// ```
pub fn kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            out.push('-');
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Builds flags for every tagged field of `T`, naming them with `mapper`.
///
/// # Errors
///
/// Returns [`Error::UnknownTagOption`] for unrecognized options,
/// [`Error::InvalidType`] for bad type names or a `set:` target that is not
/// a bool field, [`Error::DuplicateBinding`] when two flags share a `set:`
/// target, and any flag validation error. Errors are wrapped with the flag
/// they belong to.
///
/// # Examples
///
/// ```
/// use argot_core::{flags_from, kebab_case, Annotated, Annotation, Type};
///
/// struct Args;
///
/// impl Annotated for Args {
///     fn annotations() -> Vec<Annotation> {
///         vec![
///             Annotation::new("MyFlag", Type::String, "my flag,short:f,default:$USER"),
///             Annotation::new("MyVerbosity", Type::Int, "my verbosity,type:count,short:v"),
///             Annotation::new("Internal", Type::String, "-"),
///         ]
///     }
/// }
///
/// let flags = flags_from::<Args>(kebab_case).unwrap();
/// assert_eq!(flags.len(), 2);
/// assert_eq!(flags[0].name, "my-flag");
/// assert_eq!(flags[1].ty, Type::Count);
/// assert!(flags[1].no_arg);
/// ```
pub fn flags_from<T: Annotated>(mapper: NameMapper) -> Result<Vec<Flag>> {
    let fields = T::annotations();
    let mut markers = HashSet::new();
    let mut flags = Vec::new();
    for field in &fields {
        let parts = split_escaped(field.tag, ',');
        let Some((desc, opts)) = parts.split_first() else {
            continue;
        };
        if desc.is_empty() || desc == "-" {
            continue;
        }
        let mapped = mapper(field.field);
        let flag = build(field, &mapped, desc, opts, &fields)
            .map_err(|e| Error::flag(format!("--{mapped}"), e))?;
        for binder in &flag.binds {
            if binder.as_marker().is_some() && !markers.insert(binder.name().to_string()) {
                return Err(Error::flag(
                    format!("--{}", flag.name),
                    Error::DuplicateBinding(binder.name().to_string()),
                ));
            }
        }
        trace!(field = field.field, flag = %flag.name, ty = %flag.ty, "tagged flag");
        flags.push(flag);
    }
    Ok(flags)
}

fn build(field: &Annotation, name: &str, desc: &str, opts: &[String], fields: &[Annotation]) -> Result<Flag> {
    let mut ty = field.ty;
    for opt in opts {
        if let Some(t) = opt.strip_prefix("type:") {
            ty = t.parse()?;
        }
    }
    let mut flag = Flag::new(name, desc, ty);
    for opt in opts {
        let (key, val) = opt.split_once(':').unwrap_or((opt.as_str(), ""));
        flag = match key {
            "type" => flag,
            "mapkey" => flag.with_map_key(val.parse()?),
            "elem" => flag.with_elem(val.parse()?),
            "name" => Flag { name: val.to_string(), ..flag },
            "short" => flag.with_short(val),
            "alias" => flag.with_alias(val),
            "aliases" => val.split('|').fold(flag, Flag::with_alias),
            "spec" => flag.with_spec(val),
            "layout" => flag.with_layout(val),
            "default" => flag.with_default(val),
            "noarg" => flag.with_no_arg(val),
            "key" => match val.split_once('|') {
                Some((format, key)) => flag.with_key(format, key),
                None => flag.with_key("", val),
            },
            "hook" => flag.with_special(format!("hook:{val}")),
            "section" => {
                let section = val
                    .parse()
                    .map_err(|e| Error::invalid_value(Type::Int, val, e))?;
                flag.with_section(section)
            }
            "hidden" => flag.hidden(),
            "deprecated" => flag.deprecated(),
            "set" => {
                let target = fields
                    .iter()
                    .find(|f| f.field == val)
                    .ok_or_else(|| Error::InvalidType(format!("set: field {val:?} was not found")))?;
                if target.ty != Type::Bool {
                    return Err(Error::InvalidType(format!("set: field {val:?} is not bool")));
                }
                flag.with_bind(SetMarker::new(val, Arc::new(AtomicBool::new(false))))
            }
            _ => return Err(Error::UnknownTagOption(key.to_string())),
        };
    }
    flag = flag.with_bind(Slot::new(field.field, Arc::new(Mutex::new(None))));
    flag.validate()?;
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::command::{Command, CommandTree};
    use crate::ctx::Context;
    use crate::flag::FlagSet;
    use crate::parse::parse;
    use crate::value::Value;
    use crate::vars::Vars;

    struct Args;

    impl Annotated for Args {
        fn annotations() -> Vec<Annotation> {
            vec![
                Annotation::new("MyFlag", Type::String, "my flag,short:f,default:$USER"),
                Annotation::new("MyVerbosity", Type::Int, "my verbosity,type:count,short:v"),
                Annotation::new("MyURL", Type::Url, "my url,set:MyURLSet"),
                Annotation::new("MyURLSet", Type::Bool, ""),
                Annotation::new("MyOtherFlag", Type::String, r"a long\, long description,short:F"),
                Annotation::new("MyFloat", Type::Float64, "my float,hidden,name:MYF"),
                Annotation::new("Env", Type::Map, "environment,mapkey:string,elem:int,aliases:e|environ"),
                Annotation::new("Config", Type::Path, "config file,key:yaml|app.config,key:settings,section:2,spec:FILE"),
                Annotation::new("Trace", Type::Bool, "trace,noarg:false,deprecated,hook:trace"),
                Annotation::new("Since", Type::Date, "start date,layout:%d/%m/%Y"),
                Annotation::new("Skipped", Type::String, "-"),
            ]
        }
    }

    fn by_name<'a>(flags: &'a [Flag], name: &str) -> &'a Flag {
        flags.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("MyFlag"), "my-flag");
        assert_eq!(kebab_case("MyURLSet"), "my-url-set");
        assert_eq!(kebab_case("HTTPServer"), "http-server");
        assert_eq!(kebab_case("URL"), "url");
        assert_eq!(kebab_case("snake_case"), "snake-case");
        assert_eq!(kebab_case("Version2Name"), "version2-name");
        assert_eq!(kebab_case("lower"), "lower");
    }

    #[test]
    fn test_flags_from_options() {
        let flags = flags_from::<Args>(kebab_case).unwrap();
        let names: Vec<_> = flags.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["my-flag", "my-verbosity", "my-url", "my-other-flag", "MYF", "env", "config", "trace", "since"]
        );

        let f = by_name(&flags, "my-flag");
        assert_eq!(f.usage, "my flag");
        assert_eq!(f.short.as_deref(), Some("f"));
        assert_eq!(f.default.as_deref(), Some("$USER"));

        let v = by_name(&flags, "my-verbosity");
        assert_eq!(v.ty, Type::Count);
        assert!(v.no_arg);

        assert_eq!(by_name(&flags, "my-other-flag").usage, "a long, long description");
        assert!(by_name(&flags, "MYF").hidden);

        let env = by_name(&flags, "env");
        assert_eq!(env.elem, Type::Int);
        assert_eq!(env.aliases, vec!["e", "environ"]);
        assert!(env.matches_short("e"));

        let config = by_name(&flags, "config");
        assert_eq!(config.key("yaml"), Some("app.config"));
        assert_eq!(config.key("json"), Some("settings"));
        assert_eq!(config.section, Some(2));
        assert_eq!(config.spec_string(), "config FILE");

        let trace = by_name(&flags, "trace");
        assert_eq!(trace.no_arg_default.as_deref(), Some("false"));
        assert!(trace.deprecated);
        assert_eq!(trace.special.as_deref(), Some("hook:trace"));

        assert_eq!(by_name(&flags, "since").layout.as_deref(), Some("%d/%m/%Y"));
    }

    #[test]
    fn test_bindings_follow_assignments() {
        let flags = flags_from::<Args>(kebab_case).unwrap();
        let url = by_name(&flags, "my-url");
        let marker = url.marker("MyURLSet").unwrap();
        let slot = url.slot("MyURL").unwrap();

        let tree = CommandTree::new(
            Command::new("app", "").with_flags(flags.iter().cloned().fold(FlagSet::new(), FlagSet::var)),
        )
        .unwrap();
        let ctx = Context::discard().with_expander(crate::ctx::LiteralExpander);
        let mut vars = Vars::new();
        parse(&ctx, &tree, &["--my-url", "https://example.com/x"], &mut vars).unwrap();

        assert!(marker.load(Ordering::SeqCst));
        let held = slot.lock().unwrap().clone();
        assert_eq!(held.map(|v| v.render()).as_deref(), Some("https://example.com/x"));
        assert!(matches!(vars.get("my-url"), Some(Value::Url(Some(_)))));
    }

    #[test]
    fn test_unknown_option() {
        struct Bad;
        impl Annotated for Bad {
            fn annotations() -> Vec<Annotation> {
                vec![Annotation::new("Name", Type::String, "name,colour:red")]
            }
        }
        let err = flags_from::<Bad>(kebab_case).unwrap_err();
        assert!(matches!(err.root_cause(), Error::UnknownTagOption(o) if o == "colour"));
        assert_eq!(err.to_string(), "--name: unknown tag option: \"colour\"");
    }

    #[test]
    fn test_bad_types_and_sections() {
        struct BadType;
        impl Annotated for BadType {
            fn annotations() -> Vec<Annotation> {
                vec![Annotation::new("Name", Type::String, "name,type:float128")]
            }
        }
        assert!(matches!(
            flags_from::<BadType>(kebab_case).unwrap_err().root_cause(),
            Error::InvalidType(_)
        ));

        struct BadSection;
        impl Annotated for BadSection {
            fn annotations() -> Vec<Annotation> {
                vec![Annotation::new("Name", Type::String, "name,section:two")]
            }
        }
        assert!(matches!(
            flags_from::<BadSection>(kebab_case).unwrap_err().root_cause(),
            Error::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_set_targets() {
        struct Missing;
        impl Annotated for Missing {
            fn annotations() -> Vec<Annotation> {
                vec![Annotation::new("Name", Type::String, "name,set:NameSet")]
            }
        }
        assert!(matches!(
            flags_from::<Missing>(kebab_case).unwrap_err().root_cause(),
            Error::InvalidType(_)
        ));

        struct NotBool;
        impl Annotated for NotBool {
            fn annotations() -> Vec<Annotation> {
                vec![
                    Annotation::new("Name", Type::String, "name,set:Other"),
                    Annotation::new("Other", Type::String, ""),
                ]
            }
        }
        assert!(matches!(
            flags_from::<NotBool>(kebab_case).unwrap_err().root_cause(),
            Error::InvalidType(_)
        ));

        struct Shared;
        impl Annotated for Shared {
            fn annotations() -> Vec<Annotation> {
                vec![
                    Annotation::new("A", Type::String, "a,set:AnySet"),
                    Annotation::new("B", Type::String, "b,set:AnySet"),
                    Annotation::new("AnySet", Type::Bool, ""),
                ]
            }
        }
        let err = flags_from::<Shared>(kebab_case).unwrap_err();
        assert!(matches!(err.root_cause(), Error::DuplicateBinding(n) if n == "AnySet"));
    }

    #[test]
    fn test_custom_mapper() {
        fn upper(name: &str) -> String {
            name.to_uppercase()
        }
        let flags = flags_from::<Args>(upper).unwrap();
        assert_eq!(flags[0].name, "MYFLAG");
    }
}

/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Variable resolution.
//!
//! A reference is `name`, `collection[key]`, or either of those behind an
//! `isset|` / `isempty|` operation prefix.
//!
//! - `collection[key]` looks for the nearest enclosing `{%foreach}` whose item
//!   name is `collection` and indexes its current item by `key`.
//! - `name` checks the top-level data first, then the enclosing loops for an
//!   item named `name`.
//!
//! Lookups only ever walk outward through the loops currently being
//! evaluated, so sibling loops never see each other's items.

use crate::context::TemplateValue;
use crate::error::EvalErrorKind;
use crate::eval_context::EvalContext;
use std::borrow::Cow;

/// What kind of value the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Something printable or comparable.
    Scalar,
    /// A list or map to iterate.
    Container,
}

impl Expect {
    fn description(self) -> &'static str {
        match self {
            Expect::Scalar => "a scalar value",
            Expect::Container => "a list or map",
        }
    }

    fn accepts(self, value: &TemplateValue) -> bool {
        match self {
            Expect::Scalar => !value.is_container(),
            Expect::Container => value.is_container(),
        }
    }
}

/// Optional operation prefix of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    IsSet,
    IsEmpty,
}

/// A parsed variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'r> {
    pub operation: Operation,
    pub name: &'r str,
    pub key: Option<&'r str>,
}

impl<'r> Reference<'r> {
    pub fn parse(raw: &'r str) -> Result<Self, EvalErrorKind> {
        let (operation, target) = match raw.split_once('|') {
            Some(("isset", rest)) => (Operation::IsSet, rest),
            Some(("isempty", rest)) => (Operation::IsEmpty, rest),
            Some((other, _)) => return Err(EvalErrorKind::UnknownOperation(other.to_string())),
            None => (Operation::Fetch, raw),
        };

        let indexed = target
            .strip_suffix(']')
            .and_then(|inner| inner.split_once('['))
            .filter(|(collection, _)| !collection.is_empty());

        Ok(match indexed {
            Some((collection, key)) => Reference {
                operation,
                name: collection,
                key: Some(key),
            },
            None => Reference {
                operation,
                name: target,
                key: None,
            },
        })
    }
}

/// Outcome of looking a reference up, before the operation is applied.
enum Lookup<'a> {
    Found(&'a TemplateValue),
    /// `collection[key]` with no enclosing loop named `collection`.
    NoCollection,
    /// The loop item exists but cannot be indexed.
    NotIndexable(&'a TemplateValue),
    Missing,
}

fn lookup<'a>(reference: &Reference<'_>, ctx: &EvalContext<'a>) -> Lookup<'a> {
    match reference.key {
        Some(key) => match ctx.find_frame(reference.name) {
            None => Lookup::NoCollection,
            Some(frame) if !frame.item.is_container() => Lookup::NotIndexable(frame.item),
            Some(frame) => frame.item.get(key).map_or(Lookup::Missing, Lookup::Found),
        },
        None => ctx
            .data(reference.name)
            .or_else(|| ctx.find_frame(reference.name).map(|frame| frame.item))
            .map_or(Lookup::Missing, Lookup::Found),
    }
}

/// Resolve a reference to a value of the expected kind.
///
/// `isset|` and `isempty|` always succeed with a boolean; plain fetches fail
/// when nothing is found or the value has the wrong shape.
pub fn resolve<'a>(
    raw: &str,
    expect: Expect,
    ctx: &EvalContext<'a>,
) -> Result<Cow<'a, TemplateValue>, EvalErrorKind> {
    let reference = Reference::parse(raw)?;
    let found = lookup(&reference, ctx);

    match reference.operation {
        Operation::IsSet => {
            let set = matches!(found, Lookup::Found(value) if *value != TemplateValue::Null);
            Ok(Cow::Owned(TemplateValue::Bool(set)))
        }
        Operation::IsEmpty => {
            let empty = match found {
                Lookup::Found(value) => value.is_empty_value(),
                _ => true,
            };
            Ok(Cow::Owned(TemplateValue::Bool(empty)))
        }
        Operation::Fetch => match found {
            Lookup::Found(value) if expect.accepts(value) => Ok(Cow::Borrowed(value)),
            Lookup::Found(value) => Err(type_mismatch(raw, expect.description(), value)),
            Lookup::NotIndexable(item) => Err(type_mismatch(reference.name, "a list or map", item)),
            Lookup::NoCollection => Err(EvalErrorKind::CollectionNotFound(reference.name.to_string())),
            Lookup::Missing => Err(EvalErrorKind::VariableNotFound(raw.to_string())),
        },
    }
}

/// Resolve the collection of a `{%foreach}`.
///
/// Operation prefixes produce booleans, which cannot be iterated.
pub fn resolve_collection<'a>(
    raw: &str,
    ctx: &EvalContext<'a>,
) -> Result<&'a TemplateValue, EvalErrorKind> {
    match resolve(raw, Expect::Container, ctx)? {
        Cow::Borrowed(value) => Ok(value),
        Cow::Owned(value) => Err(type_mismatch(raw, Expect::Container.description(), &value)),
    }
}

fn type_mismatch(name: &str, expected: &'static str, found: &TemplateValue) -> EvalErrorKind {
    EvalErrorKind::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LocaleStrings, TemplateContext};
    use crate::eval_context::{Frame, RenderInput};
    use crate::parser::Template;

    struct Fixture {
        template: Template,
        strings: LocaleStrings,
        data: TemplateContext,
    }

    impl Fixture {
        fn new() -> Self {
            let mut data = TemplateContext::new();
            data.insert("title", "Hello");
            data.insert("empty", "");
            data.insert("nothing", TemplateValue::Null);
            data.insert("rows", TemplateValue::list([TemplateValue::map([("id", "1")])]));
            Self {
                template: Template::compile("").unwrap(),
                strings: LocaleStrings::new(),
                data,
            }
        }

        fn ctx(&self) -> EvalContext<'_> {
            EvalContext::new(&self.template, RenderInput::new(&self.strings, &self.data))
        }
    }

    #[test]
    fn test_parse_reference_forms() {
        assert_eq!(
            Reference::parse("name").unwrap(),
            Reference {
                operation: Operation::Fetch,
                name: "name",
                key: None
            }
        );
        assert_eq!(
            Reference::parse("item[title]").unwrap(),
            Reference {
                operation: Operation::Fetch,
                name: "item",
                key: Some("title")
            }
        );
        assert_eq!(
            Reference::parse("isset|item[title]").unwrap(),
            Reference {
                operation: Operation::IsSet,
                name: "item",
                key: Some("title")
            }
        );
        assert_eq!(Reference::parse("isempty|x").unwrap().operation, Operation::IsEmpty);
        assert_eq!(
            Reference::parse("count|x").unwrap_err(),
            EvalErrorKind::UnknownOperation("count".to_string())
        );
        // "[x]" has no collection name, so it is a plain name
        assert_eq!(Reference::parse("[x]").unwrap().key, None);
    }

    #[test]
    fn test_plain_name_from_data() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        assert_eq!(
            resolve("title", Expect::Scalar, &ctx).unwrap().into_owned(),
            TemplateValue::from("Hello")
        );
        assert_eq!(
            resolve("missing", Expect::Scalar, &ctx).unwrap_err(),
            EvalErrorKind::VariableNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_plain_name_from_loop_item() {
        let fixture = Fixture::new();
        let item = TemplateValue::from("apple");
        let mut ctx = fixture.ctx();
        ctx.push_frame(Frame {
            name: "fruit",
            item: &item,
        });
        assert_eq!(
            resolve("fruit", Expect::Scalar, &ctx).unwrap().into_owned(),
            TemplateValue::from("apple")
        );
    }

    #[test]
    fn test_plain_name_loop_item_must_be_scalar() {
        let fixture = Fixture::new();
        let row = TemplateValue::map([("name", "a")]);
        let mut ctx = fixture.ctx();
        ctx.push_frame(Frame {
            name: "row",
            item: &row,
        });
        assert_eq!(
            resolve("row", Expect::Scalar, &ctx).unwrap_err(),
            EvalErrorKind::TypeMismatch {
                name: "row".to_string(),
                expected: "a scalar value",
                found: "map"
            }
        );
    }

    #[test]
    fn test_data_wins_over_loop_item() {
        let fixture = Fixture::new();
        let item = TemplateValue::from("loop");
        let mut ctx = fixture.ctx();
        ctx.push_frame(Frame {
            name: "title",
            item: &item,
        });
        assert_eq!(
            resolve("title", Expect::Scalar, &ctx).unwrap().into_owned(),
            TemplateValue::from("Hello")
        );
    }

    #[test]
    fn test_indexed_reference() {
        let fixture = Fixture::new();
        let row = TemplateValue::map([("name", "a")]);
        let mut ctx = fixture.ctx();

        assert_eq!(
            resolve("row[name]", Expect::Scalar, &ctx).unwrap_err(),
            EvalErrorKind::CollectionNotFound("row".to_string())
        );

        ctx.push_frame(Frame {
            name: "row",
            item: &row,
        });
        assert_eq!(
            resolve("row[name]", Expect::Scalar, &ctx).unwrap().into_owned(),
            TemplateValue::from("a")
        );
        assert_eq!(
            resolve("row[other]", Expect::Scalar, &ctx).unwrap_err(),
            EvalErrorKind::VariableNotFound("row[other]".to_string())
        );
    }

    #[test]
    fn test_indexing_a_scalar_item_is_a_type_mismatch() {
        let fixture = Fixture::new();
        let item = TemplateValue::from("plain");
        let mut ctx = fixture.ctx();
        ctx.push_frame(Frame {
            name: "x",
            item: &item,
        });
        assert!(matches!(
            resolve("x[y]", Expect::Scalar, &ctx),
            Err(EvalErrorKind::TypeMismatch { found: "string", .. })
        ));
    }

    #[test]
    fn test_scalar_expected_container_found() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        assert_eq!(
            resolve("rows", Expect::Scalar, &ctx).unwrap_err(),
            EvalErrorKind::TypeMismatch {
                name: "rows".to_string(),
                expected: "a scalar value",
                found: "list"
            }
        );
    }

    #[test]
    fn test_container_expected_scalar_found() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        assert!(matches!(
            resolve_collection("title", &ctx),
            Err(EvalErrorKind::TypeMismatch { found: "string", .. })
        ));
        assert!(matches!(
            resolve_collection("isset|rows", &ctx),
            Err(EvalErrorKind::TypeMismatch { found: "boolean", .. })
        ));
        assert!(resolve_collection("rows", &ctx).unwrap().is_container());
    }

    #[test]
    fn test_isset() {
        let fixture = Fixture::new();
        let row = TemplateValue::map([("name", "a")]);
        let mut ctx = fixture.ctx();
        let isset = |raw: &str, ctx: &EvalContext<'_>| {
            resolve(raw, Expect::Scalar, ctx).unwrap().into_owned()
        };

        assert_eq!(isset("isset|title", &ctx), TemplateValue::Bool(true));
        assert_eq!(isset("isset|missing", &ctx), TemplateValue::Bool(false));
        assert_eq!(isset("isset|nothing", &ctx), TemplateValue::Bool(false));
        assert_eq!(isset("isset|row[name]", &ctx), TemplateValue::Bool(false));
        // containers are fine for isset
        assert_eq!(isset("isset|rows", &ctx), TemplateValue::Bool(true));

        ctx.push_frame(Frame {
            name: "row",
            item: &row,
        });
        assert_eq!(isset("isset|row[name]", &ctx), TemplateValue::Bool(true));
        assert_eq!(isset("isset|row[other]", &ctx), TemplateValue::Bool(false));
    }

    #[test]
    fn test_isempty() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let isempty = |raw: &str| resolve(raw, Expect::Scalar, &ctx).unwrap().into_owned();

        assert_eq!(isempty("isempty|title"), TemplateValue::Bool(false));
        assert_eq!(isempty("isempty|empty"), TemplateValue::Bool(true));
        assert_eq!(isempty("isempty|missing"), TemplateValue::Bool(true));
        assert_eq!(isempty("isempty|rows"), TemplateValue::Bool(false));
    }
}

/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! A single left-to-right scan alternates between raw text and tag bodies
//! delimited by `{%` and `}`. Each tag body is split on whitespace; the first
//! token names the construct. Dispatch order:
//!
//! 1. `/name` closes the innermost open block.
//! 2. Standalone constructs (`?`, `!`, `input`), in registration order.
//! 3. Block constructs (`if`, `foreach`) open a new nesting level.
//! 4. Subconstructs (`elseif`, `else`) of the innermost open `if`.
//! 5. Anything else is literal text, echoed back including the delimiters.

use crate::ast::{Node, NodeArena, NodeId, NodeKind};
use crate::error::{TemplateError, TemplateResult};
use crate::source::{Span, offset_to_location};
use tracing::{debug, trace};

const TAG_OPEN: &str = "{%";
const TAG_CLOSE: char = '}';

/// Standalone identifiers up to this length match as a prefix of the first
/// token (`{%?name}`); longer ones must be the whole token (`{%input ...}`).
const SHORT_FORM_MAX: usize = 2;

const DEFAULT_NAME: &str = "<template>";

/// A compiled template ready for evaluation.
///
/// Immutable after parsing; a single instance can be rendered any number of
/// times, from any number of threads.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) name: String,
    pub(crate) source: String,
    pub(crate) arena: NodeArena,
    pub(crate) roots: Vec<NodeId>,
}

impl Template {
    /// Compile a template from source text.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        Self::compile_named(source, DEFAULT_NAME)
    }

    /// Compile a template from source text with a name for error reporting.
    pub fn compile_named(source: &str, name: &str) -> TemplateResult<Self> {
        TreeBuilder::new(source, name).build()
    }

    /// Name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level nodes in document order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standalone {
    Variable,
    LocaleString,
    InputField,
}

const STANDALONE_CONSTRUCTS: &[(&str, Standalone)] = &[
    ("?", Standalone::Variable),
    ("!", Standalone::LocaleString),
    ("input", Standalone::InputField),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    If,
    ForEach,
}

impl Block {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Block::If),
            "foreach" => Some(Block::ForEach),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Block::If => "if",
            Block::ForEach => "foreach",
        }
    }

    fn subconstructs(self) -> &'static [Subconstruct] {
        match self {
            Block::If => &[Subconstruct::ElseIf, Subconstruct::Else],
            Block::ForEach => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subconstruct {
    ElseIf,
    Else,
}

impl Subconstruct {
    fn name(self) -> &'static str {
        match self {
            Subconstruct::ElseIf => "elseif",
            Subconstruct::Else => "else",
        }
    }
}

/// One open block while scanning.
#[derive(Debug)]
struct Level {
    block: Block,
    node: NodeId,
    /// Offset of the opening tag, reported when the block is mis-closed.
    start: usize,
    /// Children collected for the current segment.
    children: Vec<NodeId>,
    /// Subconstruct currently receiving children, once one has been seen.
    branch: Option<NodeId>,
    /// Finished subconstructs in document order.
    branches: Vec<NodeId>,
}

struct TreeBuilder<'s> {
    name: &'s str,
    source: &'s str,
    arena: NodeArena,
    roots: Vec<NodeId>,
    levels: Vec<Level>,
    text: String,
    text_start: usize,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str, name: &'s str) -> Self {
        Self {
            name,
            source,
            arena: NodeArena::new(),
            roots: Vec::new(),
            levels: Vec::new(),
            text: String::new(),
            text_start: 0,
        }
    }

    fn build(mut self) -> TemplateResult<Template> {
        let source = self.source;
        let mut pos = 0;

        while let Some(found) = source[pos..].find(TAG_OPEN) {
            let tag_start = pos + found;
            let body_start = tag_start + TAG_OPEN.len();
            // An unterminated tag is plain text.
            let Some(close) = source[body_start..].find(TAG_CLOSE) else {
                break;
            };
            let body_end = body_start + close;

            self.append_text(&source[pos..tag_start], pos);
            let span = Span::new(tag_start, body_end + TAG_CLOSE.len_utf8());
            self.handle_tag(&source[body_start..body_end], span)?;
            pos = span.end;
        }

        self.append_text(&source[pos..], pos);
        self.flush_text();

        if let Some(level) = self.levels.last() {
            return Err(self.syntax_error(
                level.start,
                format!("'{{%{}}}' block is never closed", level.block.name()),
            ));
        }

        debug!(
            template = self.name,
            nodes = self.arena.len(),
            "parsed template"
        );

        Ok(Template {
            name: self.name.to_string(),
            source: source.to_string(),
            arena: self.arena,
            roots: self.roots,
        })
    }

    fn handle_tag(&mut self, body: &str, span: Span) -> TemplateResult<()> {
        let source = self.source;
        let raw = &source[span.start..span.end];
        let mut tokens = body.split_whitespace();
        let Some(identifier) = tokens.next() else {
            return Err(self.syntax_error(span.start, "the type of tag could not be determined"));
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        if let Some(closing) = identifier.strip_prefix('/') {
            trace!(tag = identifier, offset = span.start, "closing tag");
            self.flush_text();
            return self.close_block(closing, span);
        }

        if let Some(kind) = match_standalone(identifier, &args, raw) {
            trace!(tag = identifier, offset = span.start, "standalone tag");
            self.flush_text();
            self.attach(kind, span);
            return Ok(());
        }

        if let Some(block) = Block::from_name(identifier) {
            trace!(tag = identifier, offset = span.start, "opening tag");
            self.flush_text();
            self.open_block(block, args, span);
            return Ok(());
        }

        if let Some(sub) = self.match_subconstruct(identifier) {
            trace!(tag = identifier, offset = span.start, "subconstruct tag");
            self.flush_text();
            self.start_subconstruct(sub, args, span);
            return Ok(());
        }

        trace!(tag = identifier, offset = span.start, "unrecognized tag kept as text");
        self.append_text(raw, span.start);
        Ok(())
    }

    fn open_block(&mut self, block: Block, args: Vec<String>, span: Span) {
        let kind = match block {
            Block::If => NodeKind::If {
                args,
                children: Vec::new(),
                has_subconstructs: false,
            },
            Block::ForEach => NodeKind::ForEach {
                args,
                children: Vec::new(),
            },
        };
        let node = self.attach(kind, span);
        self.levels.push(Level {
            block,
            node,
            start: span.start,
            children: Vec::new(),
            branch: None,
            branches: Vec::new(),
        });
    }

    fn match_subconstruct(&self, identifier: &str) -> Option<Subconstruct> {
        let level = self.levels.last()?;
        level
            .block
            .subconstructs()
            .iter()
            .find(|sub| sub.name() == identifier)
            .copied()
    }

    /// Close the current segment and start a new one for `sub`.
    fn start_subconstruct(&mut self, sub: Subconstruct, args: Vec<String>, span: Span) {
        let Some(level) = self.levels.last_mut() else {
            return;
        };

        let segment = std::mem::take(&mut level.children);
        let finished = match level.branch {
            Some(branch) => branch,
            None => {
                // Everything before the first subconstruct renders under the
                // block's own condition.
                let condition = match &self.arena.get(level.node).kind {
                    NodeKind::If { args, .. } => args.clone(),
                    _ => Vec::new(),
                };
                self.arena.alloc(
                    NodeKind::ElseIf {
                        args: condition,
                        children: Vec::new(),
                    },
                    Some(level.node),
                    Span::new(level.start, span.start),
                )
            }
        };
        self.arena.set_children(finished, segment);
        self.arena.get_mut(finished).span.end = span.start;
        level.branches.push(finished);

        let kind = match sub {
            Subconstruct::ElseIf => NodeKind::ElseIf {
                args,
                children: Vec::new(),
            },
            Subconstruct::Else => NodeKind::Else {
                children: Vec::new(),
            },
        };
        level.branch = Some(self.arena.alloc(kind, Some(level.node), span));
    }

    fn close_block(&mut self, name: &str, span: Span) -> TemplateResult<()> {
        if name.is_empty() {
            return Err(self.syntax_error(span.start, "the type of tag could not be determined"));
        }

        let Some(mut level) = self.levels.pop() else {
            return Err(self.syntax_error(
                span.start,
                format!("closing tag '{{%/{}}}' has no matching opening tag", name),
            ));
        };

        if level.block.name() != name {
            return Err(self.syntax_error(
                level.start,
                format!(
                    "'{{%{}}}' block opened here is closed by '{{%/{}}}'",
                    level.block.name(),
                    name
                ),
            ));
        }

        match level.branch {
            Some(branch) => {
                let segment = std::mem::take(&mut level.children);
                self.arena.set_children(branch, segment);
                self.arena.get_mut(branch).span.end = span.start;
                level.branches.push(branch);
                self.arena.set_children(level.node, level.branches);
                if let NodeKind::If {
                    has_subconstructs, ..
                } = &mut self.arena.get_mut(level.node).kind
                {
                    *has_subconstructs = true;
                }
            }
            None => self.arena.set_children(level.node, level.children),
        }
        self.arena.get_mut(level.node).span.end = span.end;
        Ok(())
    }

    /// Allocate a node under the innermost open segment.
    fn attach(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let parent = self
            .levels
            .last()
            .map(|level| level.branch.unwrap_or(level.node));
        let id = self.arena.alloc(kind, parent, span);
        match self.levels.last_mut() {
            Some(level) => level.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn append_text(&mut self, text: &str, at: usize) {
        if text.is_empty() {
            return;
        }
        if self.text.is_empty() {
            self.text_start = at;
        }
        self.text.push_str(text);
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let span = Span::new(self.text_start, self.text_start + text.len());
        self.attach(NodeKind::Text(text), span);
    }

    fn syntax_error(&self, offset: usize, message: impl Into<String>) -> TemplateError {
        let location = offset_to_location(self.source, offset);
        TemplateError::Syntax {
            template: self.name.to_string(),
            offset,
            line: location.map_or(1, |loc| loc.row + 1),
            column: location.map_or(1, |loc| loc.column + 1),
            message: message.into(),
        }
    }
}

/// Match a tag against the standalone constructs; first registered match wins.
fn match_standalone(identifier: &str, args: &[String], raw: &str) -> Option<NodeKind> {
    for (prefix, construct) in STANDALONE_CONSTRUCTS {
        let operand = if prefix.len() <= SHORT_FORM_MAX {
            match identifier.strip_prefix(prefix) {
                Some(rest) if !rest.is_empty() => rest,
                _ => continue,
            }
        } else if identifier == *prefix {
            ""
        } else {
            continue;
        };

        return Some(match construct {
            Standalone::Variable => NodeKind::Variable {
                reference: operand.to_string(),
            },
            Standalone::LocaleString => NodeKind::LocaleString {
                key: operand.to_string(),
                raw: raw.to_string(),
            },
            Standalone::InputField => NodeKind::InputField {
                args: args.to_vec(),
            },
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Template {
        Template::compile(source).expect("template should parse")
    }

    fn kinds(template: &Template, ids: &[NodeId]) -> Vec<&'static str> {
        ids.iter().map(|id| template.node(*id).kind.name()).collect()
    }

    fn syntax_offset(source: &str) -> usize {
        match Template::compile(source) {
            Err(TemplateError::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_text() {
        let template = compile("Hello, world!");
        assert_eq!(template.roots().len(), 1);
        assert_eq!(
            template.node(template.roots()[0]).kind,
            NodeKind::Text("Hello, world!".to_string())
        );
    }

    #[test]
    fn test_parse_empty_source() {
        let template = compile("");
        assert!(template.roots().is_empty());
    }

    #[test]
    fn test_parse_variable_short_form() {
        let template = compile("Hi {%?name}!");
        assert_eq!(kinds(&template, template.roots()), vec!["text", "?", "text"]);
        assert_eq!(
            template.node(template.roots()[1]).kind,
            NodeKind::Variable {
                reference: "name".to_string()
            }
        );
        assert_eq!(template.node(template.roots()[1]).span, Span::new(3, 11));
    }

    #[test]
    fn test_parse_locale_string_keeps_raw_tag() {
        let template = compile("{%!title}");
        assert_eq!(
            template.node(template.roots()[0]).kind,
            NodeKind::LocaleString {
                key: "title".to_string(),
                raw: "{%!title}".to_string()
            }
        );
    }

    #[test]
    fn test_parse_input_long_form() {
        let template = compile(r#"{%input name="email" type="email"}"#);
        assert_eq!(
            template.node(template.roots()[0]).kind,
            NodeKind::InputField {
                args: vec![r#"name="email""#.to_string(), r#"type="email""#.to_string()]
            }
        );
    }

    #[test]
    fn test_long_form_requires_whole_token() {
        // "inputs" is not "input"; unrecognized tags are literal text
        let template = compile("{%inputs x}");
        assert_eq!(
            template.node(template.roots()[0]).kind,
            NodeKind::Text("{%inputs x}".to_string())
        );
    }

    #[test]
    fn test_unrecognized_tag_merges_with_text() {
        let template = compile("a {%unknown thing} b");
        assert_eq!(template.roots().len(), 1);
        assert_eq!(
            template.node(template.roots()[0]).kind,
            NodeKind::Text("a {%unknown thing} b".to_string())
        );
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        let template = compile("price {% 10");
        assert_eq!(
            template.node(template.roots()[0]).kind,
            NodeKind::Text("price {% 10".to_string())
        );
    }

    #[test]
    fn test_parse_if_block() {
        let template = compile(r#"{%if a == "1"}X{%/if}"#);
        let root = template.node(template.roots()[0]);
        let NodeKind::If {
            args,
            children,
            has_subconstructs,
        } = &root.kind
        else {
            panic!("expected if node");
        };
        assert_eq!(args, &vec!["a".to_string(), "==".to_string(), r#""1""#.to_string()]);
        assert!(!has_subconstructs);
        assert_eq!(kinds(&template, children), vec!["text"]);
        assert_eq!(template.node(children[0]).parent, Some(template.roots()[0]));
        assert_eq!(root.span, Span::new(0, 21));
    }

    #[test]
    fn test_parse_if_with_subconstructs() {
        let template = compile(r#"{%if a == "1"}X{%elseif a == "2"}Y{%else}Z{%/if}"#);
        let if_id = template.roots()[0];
        let NodeKind::If {
            children,
            has_subconstructs,
            ..
        } = &template.node(if_id).kind
        else {
            panic!("expected if node");
        };
        assert!(has_subconstructs);
        assert_eq!(kinds(&template, children), vec!["elseif", "elseif", "else"]);

        // The implicit first branch carries the if's own condition
        let NodeKind::ElseIf { args, children: first } = &template.node(children[0]).kind else {
            panic!("expected implicit branch");
        };
        assert_eq!(args[0], "a");
        assert_eq!(args[2], r#""1""#);
        assert_eq!(template.node(first[0]).kind, NodeKind::Text("X".to_string()));
        assert_eq!(template.node(first[0]).parent, Some(children[0]));

        for branch in children {
            assert_eq!(template.node(*branch).parent, Some(if_id));
        }

        let NodeKind::Else { children: last } = &template.node(children[2]).kind else {
            panic!("expected else");
        };
        assert_eq!(template.node(last[0]).kind, NodeKind::Text("Z".to_string()));
    }

    #[test]
    fn test_parse_foreach() {
        let template = compile("{%foreach item in list}{%?item[name]}{%/foreach}");
        let NodeKind::ForEach { args, children } = &template.node(template.roots()[0]).kind else {
            panic!("expected foreach");
        };
        assert_eq!(args, &vec!["item".to_string(), "in".to_string(), "list".to_string()]);
        assert_eq!(kinds(&template, children), vec!["?"]);
    }

    #[test]
    fn test_else_outside_if_is_text() {
        let template = compile("{%foreach x in xs}{%else}{%/foreach}");
        let NodeKind::ForEach { children, .. } = &template.node(template.roots()[0]).kind else {
            panic!("expected foreach");
        };
        assert_eq!(
            template.node(children[0]).kind,
            NodeKind::Text("{%else}".to_string())
        );
    }

    #[test]
    fn test_nested_blocks() {
        let template =
            compile("{%foreach row in rows}{%if row[x] == 1}{%?row[x]}{%/if}{%/foreach}");
        let foreach = template.roots()[0];
        let children = template.node(foreach).kind.children().to_vec();
        assert_eq!(kinds(&template, &children), vec!["if"]);
        assert_eq!(template.node(children[0]).parent, Some(foreach));
    }

    #[test]
    fn test_mismatched_close_reports_opening_offset() {
        assert_eq!(syntax_offset("{%if a == 1}{%/foreach}"), 0);
        assert_eq!(syntax_offset("abc{%foreach x in y}{%/if}"), 3);
    }

    #[test]
    fn test_stray_close_reports_close_offset() {
        assert_eq!(syntax_offset("text{%/if}"), 4);
    }

    #[test]
    fn test_unclosed_block() {
        let err = Template::compile("one\n  {%if a == 1}never closed").unwrap_err();
        match err {
            TemplateError::Syntax {
                offset,
                line,
                column,
                message,
                ..
            } => {
                assert_eq!(offset, 6);
                assert_eq!(line, 2);
                assert_eq!(column, 3);
                assert!(message.contains("never closed"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_tag_is_syntax_error() {
        assert_eq!(syntax_offset("ab{%}"), 2);
        assert_eq!(syntax_offset("{%  }"), 0);
        assert_eq!(syntax_offset("x{%/}"), 1);
    }

    #[test]
    fn test_syntax_error_carries_template_name() {
        let err = Template::compile_named("{%/if}", "layout").unwrap_err();
        assert_eq!(err.template(), Some("layout"));
    }
}

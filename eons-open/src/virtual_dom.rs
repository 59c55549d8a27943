// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! In-memory [`Document`] implementation.
//!
//! The virtual document backs the test-suite, the benchmarks and the CLI. It
//! evaluates a subset of CSS and XPath wide enough for the contribution table,
//! the branch lookups and hand-written host selectors:
//!
//! * CSS: type, universal, `#id`, `.class` and attribute selectors (`[a]`,
//!   `[a=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`, `[a~=v]`), descendant and `>`
//!   combinators, and comma-separated selector lists;
//! * XPath: absolute location paths built from `/` and `//` steps with a name
//!   test or `*`, and predicates `[@a]`, `[@a='v']`, `[contains(@a,'v')]`
//!   and `[n]`.

use parking_lot::RwLock;

use crate::{
    dom::{Document, ElementSpec, Selector},
    error::Error,
};

/// Handle to an element of a [`VirtualDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,)]
pub struct NodeId(usize,);

/// Hidden node above the root element, used as the XPath context.
const DOCUMENT_NODE: NodeId = NodeId(0,);
const ROOT_ELEMENT: NodeId = NodeId(1,);

#[derive(Debug, Clone,)]
struct NodeData
{
    tag:        String,
    attributes: Vec<(String, String,),>,
    text:       String,
    parent:     Option<NodeId,>,
    children:   Vec<NodeId,>,
}

impl NodeData
{
    fn new(tag: &str, parent: Option<NodeId,>,) -> Self
    {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            text: String::new(),
            parent,
            children: Vec::new(),
        }
    }

    fn attribute(&self, name: &str,) -> Option<&str,>
    {
        self.attributes
            .iter()
            .find(|(candidate, _,)| candidate.eq_ignore_ascii_case(name,),)
            .map(|(_, value,)| value.as_str(),)
    }

    fn has_class(&self, class: &str,) -> bool
    {
        self.attribute("class",).is_some_and(|value| value.split_whitespace().any(|c| c == class,),)
    }
}

/// Page held entirely in memory.
///
/// A new document contains a single `<html>` root element. Detached nodes
/// stay allocated but are unreachable from queries.
#[derive(Debug,)]
pub struct VirtualDocument
{
    location: RwLock<String,>,
    nodes:    RwLock<Vec<NodeData,>,>,
}

impl VirtualDocument
{
    /// Creates an empty document located at `url`.
    pub fn new(url: impl Into<String,>,) -> Self
    {
        let document = NodeData::new("#document", None,);
        let root = NodeData::new("html", Some(DOCUMENT_NODE,),);
        let mut nodes = vec![document, root];
        nodes[DOCUMENT_NODE.0].children.push(ROOT_ELEMENT,);

        Self {
            location: RwLock::new(url.into(),),
            nodes:    RwLock::new(nodes,),
        }
    }

    /// The `<html>` root element.
    pub fn root(&self,) -> NodeId
    {
        ROOT_ELEMENT
    }

    /// Simulates a client-side navigation to `url`.
    pub fn set_location(&self, url: impl Into<String,>,)
    {
        *self.location.write() = url.into();
    }

    /// Appends `element` under `parent`, returning the new node.
    ///
    /// Convenience wrapper over [`Document::append_child`] for building
    /// fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `parent` does not exist.
    pub fn append(&self, parent: NodeId, element: &ElementSpec,) -> Result<NodeId, Error,>
    {
        self.append_child(&parent, element,)
    }

    /// Detaches `node` and its subtree from the page.
    pub fn remove(&self, node: NodeId,)
    {
        let mut nodes = self.nodes.write();
        let Some(parent,) = nodes.get(node.0,).and_then(|data| data.parent,) else {
            return;
        };
        nodes[parent.0].children.retain(|child| *child != node,);
        nodes[node.0].parent = None;
    }

    /// Number of attached elements carrying `id`.
    pub fn count_by_id(&self, id: &str,) -> usize
    {
        let nodes = self.nodes.read();
        attached(&nodes,)
            .into_iter()
            .filter(|node| nodes[node.0].attribute("id",) == Some(id,),)
            .count()
    }

    /// Tag name of `node`.
    pub fn tag(&self, node: NodeId,) -> Option<String,>
    {
        self.nodes.read().get(node.0,).map(|data| data.tag.clone(),)
    }

    /// Children of `node` in order.
    pub fn children(&self, node: NodeId,) -> Vec<NodeId,>
    {
        self.nodes.read().get(node.0,).map(|data| data.children.clone(),).unwrap_or_default()
    }

    fn create(nodes: &mut Vec<NodeData,>, parent: NodeId, element: &ElementSpec,) -> NodeId
    {
        let id = NodeId(nodes.len(),);
        let mut data = NodeData::new(&element.tag, Some(parent,),);
        if let Some(element_id,) = element.id.as_ref() {
            data.attributes.push(("id".to_owned(), element_id.clone(),),);
        }
        if !element.classes.is_empty() {
            data.attributes.push(("class".to_owned(), element.classes.join(" ",),),);
        }
        data.attributes.extend(element.attributes.iter().cloned(),);
        data.text = element.text.clone().unwrap_or_default();
        nodes.push(data,);

        for child in &element.children {
            let child_id = Self::create(nodes, id, child,);
            nodes[id.0].children.push(child_id,);
        }
        id
    }

    fn ensure_attached(nodes: &[NodeData], node: NodeId,) -> Result<(), Error,>
    {
        let mut cursor = Some(node,);
        while let Some(current,) = cursor {
            if current == DOCUMENT_NODE {
                return Ok((),);
            }
            cursor = nodes.get(current.0,).and_then(|data| data.parent,);
        }
        Err(Error::validation(format!("node {} is not attached to the document", node.0),),)
    }
}

impl Document for VirtualDocument
{
    type Node = NodeId;

    fn location(&self,) -> String
    {
        self.location.read().clone()
    }

    fn query(&self, selector: &Selector,) -> Result<Option<NodeId,>, Error,>
    {
        let nodes = self.nodes.read();
        match selector {
            Selector::Css(source,) => {
                let list = css::parse(source,)?;
                Ok(attached(&nodes,)
                    .into_iter()
                    .filter(|node| *node != DOCUMENT_NODE,)
                    .find(|node| list.iter().any(|complex| complex.matches(&nodes, *node,),),),)
            }
            Selector::XPath(source,) => {
                let path = xpath::parse(source,)?;
                Ok(path.evaluate(&nodes,).into_iter().next(),)
            }
        }
    }

    fn element_by_id(&self, id: &str,) -> Option<NodeId,>
    {
        let nodes = self.nodes.read();
        attached(&nodes,).into_iter().find(|node| nodes[node.0].attribute("id",) == Some(id,),)
    }

    fn parent(&self, node: &NodeId,) -> Option<NodeId,>
    {
        self.nodes
            .read()
            .get(node.0,)
            .and_then(|data| data.parent,)
            .filter(|parent| *parent != DOCUMENT_NODE,)
    }

    fn attribute(&self, node: &NodeId, name: &str,) -> Option<String,>
    {
        self.nodes.read().get(node.0,).and_then(|data| data.attribute(name,).map(str::to_owned,),)
    }

    fn text_content(&self, node: &NodeId,) -> String
    {
        fn collect(nodes: &[NodeData], node: NodeId, output: &mut String,)
        {
            output.push_str(&nodes[node.0].text,);
            for child in &nodes[node.0].children {
                collect(nodes, *child, output,);
            }
        }

        let nodes = self.nodes.read();
        let mut output = String::new();
        if node.0 < nodes.len() {
            collect(&nodes, *node, &mut output,);
        }
        output
    }

    fn append_child(&self, parent: &NodeId, element: &ElementSpec,) -> Result<NodeId, Error,>
    {
        let mut nodes = self.nodes.write();
        Self::ensure_attached(&nodes, *parent,)?;
        let id = Self::create(&mut nodes, *parent, element,);
        nodes[parent.0].children.push(id,);
        Ok(id,)
    }

    fn insert_before(
        &self,
        parent: &NodeId,
        element: &ElementSpec,
        sibling: &NodeId,
    ) -> Result<NodeId, Error,>
    {
        let mut nodes = self.nodes.write();
        Self::ensure_attached(&nodes, *parent,)?;
        let position =
            nodes[parent.0].children.iter().position(|child| child == sibling,).ok_or_else(|| {
                Error::validation(format!(
                    "node {} is not a child of node {}",
                    sibling.0, parent.0
                ),)
            },)?;
        let id = Self::create(&mut nodes, *parent, element,);
        nodes[parent.0].children.insert(position, id,);
        Ok(id,)
    }
}

/// Attached nodes in document (pre-)order, starting at the document node.
fn attached(nodes: &[NodeData],) -> Vec<NodeId,>
{
    let mut order = Vec::with_capacity(nodes.len(),);
    let mut stack = vec![DOCUMENT_NODE];
    while let Some(node,) = stack.pop() {
        order.push(node,);
        stack.extend(nodes[node.0].children.iter().rev().copied(),);
    }
    order
}

fn descendants(nodes: &[NodeData], node: NodeId,) -> Vec<NodeId,>
{
    let mut order = Vec::new();
    let mut stack: Vec<NodeId,> = nodes[node.0].children.iter().rev().copied().collect();
    while let Some(current,) = stack.pop() {
        order.push(current,);
        stack.extend(nodes[current.0].children.iter().rev().copied(),);
    }
    order
}

/// Character cursor shared by the selector parsers.
struct Cursor<'source,>
{
    source: &'source str,
    chars:  Vec<char,>,
    pos:    usize,
}

impl<'source,> Cursor<'source,>
{
    fn new(source: &'source str,) -> Self
    {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self,) -> Option<char,>
    {
        self.chars.get(self.pos,).copied()
    }

    fn starts_with(&self, prefix: &str,) -> bool
    {
        prefix.chars().enumerate().all(|(offset, ch,)| self.chars.get(self.pos + offset,) == Some(&ch,),)
    }

    fn bump(&mut self,) -> Option<char,>
    {
        let current = self.peek();
        if current.is_some() {
            self.pos += 1;
        }
        current
    }

    fn eat(&mut self, expected: char,) -> bool
    {
        if self.peek() == Some(expected,) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char,) -> Result<(), Error,>
    {
        if self.eat(expected,) { Ok((),) } else { Err(self.error(format!("expected '{expected}'"),),) }
    }

    fn skip_whitespace(&mut self,) -> bool
    {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace,) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn identifier(&mut self,) -> Option<String,>
    {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_',) {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect(),)
    }

    fn quoted(&mut self,) -> Result<String, Error,>
    {
        let quote = match self.bump() {
            Some(quote @ ('"' | '\''),) => quote,
            _ => return Err(self.error("expected quoted string",),),
        };
        let start = self.pos;
        while let Some(ch,) = self.bump() {
            if ch == quote {
                return Ok(self.chars[start..self.pos - 1].iter().collect(),);
            }
        }
        Err(self.error("unterminated string",),)
    }

    fn error(&self, message: impl Into<String,>,) -> Error
    {
        Error::selector(self.source, format!("{} at offset {}", message.into(), self.pos),)
    }
}

mod css
{
    use super::{Cursor, NodeData, NodeId};
    use crate::error::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq,)]
    enum Operator
    {
        Equals,
        Prefix,
        Suffix,
        Contains,
        Word,
    }

    #[derive(Debug, Clone,)]
    struct AttributeTest
    {
        name:     String,
        operator: Option<(Operator, String,),>,
    }

    impl AttributeTest
    {
        fn matches(&self, node: &NodeData,) -> bool
        {
            let Some(actual,) = node.attribute(&self.name,) else {
                return false;
            };
            match &self.operator {
                None => true,
                Some((Operator::Equals, value,),) => actual == value,
                Some((Operator::Prefix, value,),) => !value.is_empty() && actual.starts_with(value.as_str(),),
                Some((Operator::Suffix, value,),) => !value.is_empty() && actual.ends_with(value.as_str(),),
                Some((Operator::Contains, value,),) => !value.is_empty() && actual.contains(value.as_str(),),
                Some((Operator::Word, value,),) => actual.split_whitespace().any(|word| word == value,),
            }
        }
    }

    #[derive(Debug, Clone, Default,)]
    struct Compound
    {
        tag:        Option<String,>,
        id:         Option<String,>,
        classes:    Vec<String,>,
        attributes: Vec<AttributeTest,>,
    }

    impl Compound
    {
        fn matches(&self, node: &NodeData,) -> bool
        {
            self.tag.as_ref().is_none_or(|tag| node.tag.eq_ignore_ascii_case(tag,),)
                && self.id.as_ref().is_none_or(|id| node.attribute("id",) == Some(id.as_str(),),)
                && self.classes.iter().all(|class| node.has_class(class,),)
                && self.attributes.iter().all(|test| test.matches(node,),)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq,)]
    enum Combinator
    {
        Descendant,
        Child,
    }

    /// Compounds read right to left: `subject` then its qualifying ancestors.
    #[derive(Debug, Clone,)]
    pub(super) struct Complex
    {
        subject:   Compound,
        ancestors: Vec<(Combinator, Compound,),>,
    }

    impl Complex
    {
        pub(super) fn matches(&self, nodes: &[NodeData], node: NodeId,) -> bool
        {
            self.subject.matches(&nodes[node.0],) && Self::match_ancestors(nodes, node, &self.ancestors,)
        }

        fn match_ancestors(nodes: &[NodeData], node: NodeId, remaining: &[(Combinator, Compound,)],) -> bool
        {
            let Some(((combinator, compound,), rest,),) = remaining.split_first() else {
                return true;
            };
            let mut cursor = element_parent(nodes, node,);
            while let Some(candidate,) = cursor {
                if compound.matches(&nodes[candidate.0],) && Self::match_ancestors(nodes, candidate, rest,) {
                    return true;
                }
                if *combinator == Combinator::Child {
                    return false;
                }
                cursor = element_parent(nodes, candidate,);
            }
            false
        }
    }

    fn element_parent(nodes: &[NodeData], node: NodeId,) -> Option<NodeId,>
    {
        nodes[node.0].parent.filter(|parent| *parent != super::DOCUMENT_NODE,)
    }

    pub(super) fn parse(source: &str,) -> Result<Vec<Complex,>, Error,>
    {
        let mut cursor = Cursor::new(source,);
        let mut list = Vec::new();
        loop {
            cursor.skip_whitespace();
            list.push(parse_complex(&mut cursor,)?,);
            cursor.skip_whitespace();
            match cursor.bump() {
                None => return Ok(list,),
                Some(',',) => continue,
                Some(other,) => return Err(cursor.error(format!("unexpected '{other}'"),),),
            }
        }
    }

    fn parse_complex(cursor: &mut Cursor<'_,>,) -> Result<Complex, Error,>
    {
        let mut compounds = vec![parse_compound(cursor)?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = cursor.skip_whitespace();
            let combinator = match cursor.peek() {
                None | Some(',',) => break,
                Some('>',) => {
                    cursor.bump();
                    cursor.skip_whitespace();
                    Combinator::Child
                }
                Some(_,) if had_whitespace => Combinator::Descendant,
                Some(other,) => return Err(cursor.error(format!("unexpected '{other}'"),),),
            };
            combinators.push(combinator,);
            compounds.push(parse_compound(cursor,)?,);
        }

        let subject = compounds.pop().unwrap_or_default();
        let ancestors = combinators.into_iter().rev().zip(compounds.into_iter().rev(),).collect();
        Ok(Complex {
            subject,
            ancestors,
        },)
    }

    fn parse_compound(cursor: &mut Cursor<'_,>,) -> Result<Compound, Error,>
    {
        let start = cursor.pos;
        let mut compound = Compound::default();

        if cursor.eat('*',) {
            compound.tag = None;
        } else if let Some(tag,) = cursor.identifier() {
            compound.tag = Some(tag,);
        }

        loop {
            match cursor.peek() {
                Some('#',) => {
                    cursor.bump();
                    compound.id = Some(cursor.identifier().ok_or_else(|| cursor.error("expected id",),)?,);
                }
                Some('.',) => {
                    cursor.bump();
                    let class = cursor.identifier().ok_or_else(|| cursor.error("expected class name",),)?;
                    compound.classes.push(class,);
                }
                Some('[',) => {
                    cursor.bump();
                    compound.attributes.push(parse_attribute(cursor,)?,);
                }
                _ => break,
            }
        }

        if cursor.pos == start {
            return Err(cursor.error("expected selector",),);
        }
        Ok(compound,)
    }

    fn parse_attribute(cursor: &mut Cursor<'_,>,) -> Result<AttributeTest, Error,>
    {
        cursor.skip_whitespace();
        let name = cursor.identifier().ok_or_else(|| cursor.error("expected attribute name",),)?;
        cursor.skip_whitespace();
        if cursor.eat(']',) {
            return Ok(AttributeTest {
                name,
                operator: None,
            },);
        }

        let operator = match cursor.bump() {
            Some('=',) => Operator::Equals,
            Some(symbol @ ('^' | '$' | '*' | '~'),) => {
                cursor.expect('=',)?;
                match symbol {
                    '^' => Operator::Prefix,
                    '$' => Operator::Suffix,
                    '*' => Operator::Contains,
                    _ => Operator::Word,
                }
            }
            _ => return Err(cursor.error("expected attribute operator",),),
        };

        cursor.skip_whitespace();
        let value = match cursor.peek() {
            Some('"' | '\'',) => cursor.quoted()?,
            _ => cursor.identifier().ok_or_else(|| cursor.error("expected attribute value",),)?,
        };
        cursor.skip_whitespace();
        cursor.expect(']',)?;

        Ok(AttributeTest {
            name,
            operator: Some((operator, value,),),
        },)
    }
}

mod xpath
{
    use std::collections::HashSet;

    use super::{Cursor, DOCUMENT_NODE, NodeData, NodeId, attached, descendants};
    use crate::error::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq,)]
    enum Axis
    {
        Child,
        Descendant,
    }

    #[derive(Debug, Clone,)]
    enum Predicate
    {
        Attribute
        {
            name: String, value: Option<String,>,
        },
        Contains
        {
            name: String, value: String,
        },
        Position(usize,),
    }

    #[derive(Debug, Clone,)]
    struct Step
    {
        axis:       Axis,
        name:       Option<String,>,
        predicates: Vec<Predicate,>,
    }

    /// Absolute location path.
    #[derive(Debug, Clone,)]
    pub(super) struct Path
    {
        steps: Vec<Step,>,
    }

    impl Path
    {
        /// Matching elements in document order.
        pub(super) fn evaluate(&self, nodes: &[NodeData],) -> Vec<NodeId,>
        {
            let mut context = vec![DOCUMENT_NODE];
            for step in &self.steps {
                let mut seen = HashSet::new();
                let mut next = Vec::new();
                for node in &context {
                    let candidates = match step.axis {
                        Axis::Child => nodes[node.0].children.clone(),
                        Axis::Descendant => descendants(nodes, *node,),
                    };
                    let named: Vec<NodeId,> = candidates
                        .into_iter()
                        .filter(|candidate| {
                            step.name.as_ref().is_none_or(|name| nodes[candidate.0].tag.eq_ignore_ascii_case(name,),)
                        },)
                        .collect();
                    let selected = step.predicates.iter().fold(named, |selected, predicate| {
                        apply(nodes, selected, predicate,)
                    },);
                    next.extend(selected.into_iter().filter(|candidate| seen.insert(*candidate,),),);
                }
                context = next;
            }

            let order = attached(nodes,);
            let matched: HashSet<NodeId,> = context.into_iter().collect();
            order.into_iter().filter(|node| matched.contains(node,),).collect()
        }
    }

    fn apply(nodes: &[NodeData], selected: Vec<NodeId,>, predicate: &Predicate,) -> Vec<NodeId,>
    {
        match predicate {
            Predicate::Position(index,) => selected.get(index - 1,).copied().into_iter().collect(),
            Predicate::Attribute {
                name,
                value,
            } => selected
                .into_iter()
                .filter(|node| match (nodes[node.0].attribute(name,), value,) {
                    (Some(actual,), Some(expected,),) => actual == expected,
                    (Some(_,), None,) => true,
                    (None, _,) => false,
                },)
                .collect(),
            Predicate::Contains {
                name,
                value,
            } => selected
                .into_iter()
                .filter(|node| nodes[node.0].attribute(name,).is_some_and(|actual| actual.contains(value.as_str(),),),)
                .collect(),
        }
    }

    pub(super) fn parse(source: &str,) -> Result<Path, Error,>
    {
        let mut cursor = Cursor::new(source.trim(),);
        let mut steps = Vec::new();

        while cursor.peek().is_some() {
            let axis = if cursor.starts_with("//",) {
                cursor.pos += 2;
                Axis::Descendant
            } else if cursor.eat('/',) {
                Axis::Child
            } else {
                return Err(cursor.error("expected '/' or '//'",),);
            };

            let name = if cursor.eat('*',) {
                None
            } else {
                Some(cursor.identifier().ok_or_else(|| cursor.error("expected element name",),)?,)
            };

            let mut predicates = Vec::new();
            while cursor.eat('[',) {
                predicates.push(parse_predicate(&mut cursor,)?,);
            }

            steps.push(Step {
                axis,
                name,
                predicates,
            },);
        }

        if steps.is_empty() {
            return Err(cursor.error("empty path",),);
        }
        Ok(Path {
            steps,
        },)
    }

    fn parse_predicate(cursor: &mut Cursor<'_,>,) -> Result<Predicate, Error,>
    {
        cursor.skip_whitespace();

        let predicate = if cursor.peek().is_some_and(|ch| ch.is_ascii_digit(),) {
            let start = cursor.pos;
            while cursor.peek().is_some_and(|ch| ch.is_ascii_digit(),) {
                cursor.pos += 1;
            }
            let digits: String = cursor.chars[start..cursor.pos].iter().collect();
            match digits.parse::<usize>() {
                Ok(index,) if index > 0 => Predicate::Position(index,),
                _ => return Err(cursor.error("positions start at 1",),),
            }
        } else if cursor.eat('@',) {
            let name = cursor.identifier().ok_or_else(|| cursor.error("expected attribute name",),)?;
            cursor.skip_whitespace();
            let value = if cursor.eat('=',) {
                cursor.skip_whitespace();
                Some(cursor.quoted()?,)
            } else {
                None
            };
            Predicate::Attribute {
                name,
                value,
            }
        } else if cursor.starts_with("contains(",) {
            cursor.pos += "contains(".len();
            cursor.skip_whitespace();
            cursor.expect('@',)?;
            let name = cursor.identifier().ok_or_else(|| cursor.error("expected attribute name",),)?;
            cursor.skip_whitespace();
            cursor.expect(',',)?;
            cursor.skip_whitespace();
            let value = cursor.quoted()?;
            cursor.skip_whitespace();
            cursor.expect(')',)?;
            Predicate::Contains {
                name,
                value,
            }
        } else {
            return Err(cursor.error("unsupported predicate",),);
        };

        cursor.skip_whitespace();
        cursor.expect(']',)?;
        Ok(predicate,)
    }
}

#[cfg(test)]
mod tests
{
    use super::VirtualDocument;
    use crate::{
        dom::{Document, ElementSpec, Selector},
        error::Error,
    };

    fn fixture() -> VirtualDocument
    {
        let document = VirtualDocument::new("https://github.com/o/r",);
        let body = document.append(document.root(), &ElementSpec::new("body",),).expect("body",);
        let header = document
            .append(body, &ElementSpec::new("div",).with_id("repository-details-container",),)
            .expect("header",);
        let list = document
            .append(header, &ElementSpec::new("ul",).with_class("pagehead-actions",),)
            .expect("list",);
        document
            .append(list, &ElementSpec::new("li",).with_attribute("data-kind", "watch",).with_text("Watch",),)
            .expect("first item",);
        document
            .append(list, &ElementSpec::new("li",).with_attribute("data-kind", "star",).with_text("Star",),)
            .expect("second item",);
        document
    }

    fn tag_of(document: &VirtualDocument, selector: Selector,) -> Option<String,>
    {
        let node = document.query(&selector,).expect("expected selector to evaluate",)?;
        document.tag(node,)
    }

    #[test]
    fn css_matches_ids_classes_and_attributes()
    {
        let document = fixture();
        assert_eq!(tag_of(&document, Selector::css("#repository-details-container",),).as_deref(), Some("div"));
        assert_eq!(tag_of(&document, Selector::css("ul.pagehead-actions",),).as_deref(), Some("ul"));
        assert_eq!(tag_of(&document, Selector::css("[data-kind=\"star\"]",),).as_deref(), Some("li"));
        assert_eq!(tag_of(&document, Selector::css("li[data-kind^=wa]",),).as_deref(), Some("li"));
        assert_eq!(tag_of(&document, Selector::css("[data-kind$=ar]",),).as_deref(), Some("li"));
        assert_eq!(tag_of(&document, Selector::css("[class*=head]",),).as_deref(), Some("ul"));
        assert_eq!(tag_of(&document, Selector::css("[class~=pagehead-actions]",),).as_deref(), Some("ul"));
        assert!(tag_of(&document, Selector::css("[class~=pagehead]",),).is_none());
        assert!(tag_of(&document, Selector::css(".missing",),).is_none());
    }

    #[test]
    fn css_combinators_respect_structure()
    {
        let document = fixture();
        assert!(tag_of(&document, Selector::css("#repository-details-container > ul",),).is_some());
        assert!(tag_of(&document, Selector::css("body li",),).is_some());
        assert!(tag_of(&document, Selector::css("body > li",),).is_none());
        assert!(tag_of(&document, Selector::css(".missing, ul > li",),).is_some());
    }

    #[test]
    fn xpath_walks_absolute_and_descendant_steps()
    {
        let document = fixture();
        assert_eq!(
            tag_of(&document, Selector::xpath("//*[@id=\"repository-details-container\"]/ul",),).as_deref(),
            Some("ul")
        );
        assert_eq!(tag_of(&document, Selector::xpath("/html/body/div",),).as_deref(), Some("div"));
        assert!(tag_of(&document, Selector::xpath("/body",),).is_none());

        let second = document
            .query(&Selector::xpath("//ul/li[2]",),)
            .expect("expected xpath to evaluate",)
            .expect("expected second item",);
        assert_eq!(document.text_content(&second,), "Star");

        let contains = document
            .query(&Selector::xpath("//ul[contains(@class, 'head')]",),)
            .expect("expected xpath to evaluate",);
        assert!(contains.is_some());
    }

    #[test]
    fn malformed_selectors_are_reported()
    {
        let document = fixture();
        for selector in [
            Selector::css("div[",),
            Selector::css("",),
            Selector::css("div:hover",),
            Selector::xpath("div",),
            Selector::xpath("//li[0]",),
            Selector::xpath("//li[text()]",),
        ] {
            let error = document.query(&selector,).expect_err("expected selector error",);
            assert!(matches!(error, Error::Selector { .. }), "unexpected error for {selector}: {error:?}");
        }
    }

    #[test]
    fn insert_before_places_element_ahead_of_sibling()
    {
        let document = fixture();
        let list = document.query(&Selector::css("ul",),).expect("query",).expect("list",);
        let sibling = document.query(&Selector::css("li[data-kind=star]",),).expect("query",).expect("star",);

        let inserted = document
            .insert_before(&list, &ElementSpec::new("li",).with_id("inserted",), &sibling,)
            .expect("expected insertion",);

        let children = document.children(list,);
        assert_eq!(children.len(), 3);
        assert_eq!(children[1], inserted);
        assert_eq!(document.parent(&inserted,), Some(list));
    }

    #[test]
    fn insert_before_rejects_foreign_sibling()
    {
        let document = fixture();
        let body = document.query(&Selector::css("body",),).expect("query",).expect("body",);
        let item = document.query(&Selector::css("li",),).expect("query",).expect("item",);
        let result = document.insert_before(&body, &ElementSpec::new("span",), &item,);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn nested_children_and_text_are_materialised()
    {
        let document = fixture();
        let body = document.query(&Selector::css("body",),).expect("query",).expect("body",);
        let container = document
            .append(
                body,
                &ElementSpec::new("div",)
                    .with_class("wrap",)
                    .with_child(ElementSpec::new("a",).with_id("link",).with_text("Open",),),
            )
            .expect("expected append",);

        let link = document.element_by_id("link",).expect("expected link",);
        assert_eq!(document.parent(&link,), Some(container));
        assert_eq!(document.text_content(&container,), "Open");
        assert_eq!(document.attribute(&container, "class",).as_deref(), Some("wrap"));
    }

    #[test]
    fn removed_nodes_are_invisible_to_queries()
    {
        let document = fixture();
        let header = document.element_by_id("repository-details-container",).expect("header",);
        document.remove(header,);

        assert!(document.element_by_id("repository-details-container",).is_none());
        assert_eq!(document.count_by_id("repository-details-container",), 0);
        assert!(document.query(&Selector::css("li",),).expect("query",).is_none());
        assert!(document.append(header, &ElementSpec::new("span",),).is_err());
    }

    #[test]
    fn location_can_change_without_reload()
    {
        let document = fixture();
        document.set_location("https://github.com/o/r/tree/dev",);
        assert_eq!(document.location(), "https://github.com/o/r/tree/dev");
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Host page abstraction used by the injection engine.
//!
//! The engine never touches a concrete DOM. It reads and writes the page
//! through [`Document`], which a host collaborator implements on top of the
//! browser document; [`crate::VirtualDocument`] implements it in memory.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Prefix marking a selector string as an XPath expression.
pub const XPATH_PREFIX: &str = "xpath:";

/// DOM query used to locate anchors and siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash,)]
pub enum Selector
{
    /// CSS selector evaluated like `querySelector`.
    Css(String,),
    /// XPath expression whose first matching element is used.
    XPath(String,),
}

impl Selector
{
    /// Creates a CSS selector.
    pub fn css(source: impl Into<String,>,) -> Self
    {
        Self::Css(source.into(),)
    }

    /// Creates an XPath selector.
    pub fn xpath(source: impl Into<String,>,) -> Self
    {
        Self::XPath(source.into(),)
    }

    /// Parses the string form: `xpath:` marks XPath, anything else is CSS.
    ///
    /// # Examples
    ///
    /// ```
    /// use eons_open::Selector;
    ///
    /// assert_eq!(Selector::parse("xpath://ul"), Selector::xpath("//ul"));
    /// assert_eq!(Selector::parse(".ref-name"), Selector::css(".ref-name"));
    /// ```
    pub fn parse(source: &str,) -> Self
    {
        match source.strip_prefix(XPATH_PREFIX,) {
            Some(expression,) => Self::XPath(expression.trim().to_owned(),),
            None => Self::Css(source.trim().to_owned(),),
        }
    }
}

impl fmt::Display for Selector
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        match self {
            Self::Css(source,) => f.write_str(source,),
            Self::XPath(source,) => write!(f, "{XPATH_PREFIX}{source}"),
        }
    }
}

impl Serialize for Selector
{
    fn serialize<S,>(&self, serializer: S,) -> Result<S::Ok, S::Error,>
    where
        S: Serializer,
    {
        serializer.collect_str(self,)
    }
}

impl<'de,> Deserialize<'de,> for Selector
{
    fn deserialize<D,>(deserializer: D,) -> Result<Self, D::Error,>
    where
        D: Deserializer<'de,>,
    {
        let source = String::deserialize(deserializer,)?;
        Ok(Self::parse(&source,),)
    }
}

/// Description of an element to be created and inserted into the page.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ElementSpec
{
    /// Element tag name.
    pub tag:        String,
    /// Optional element id.
    pub id:         Option<String,>,
    /// Class names in application order.
    pub classes:    Vec<String,>,
    /// Additional attributes in declaration order.
    pub attributes: Vec<(String, String,),>,
    /// Text content of the element itself.
    pub text:       Option<String,>,
    /// Child elements appended in order.
    pub children:   Vec<ElementSpec,>,
}

impl ElementSpec
{
    /// Creates an empty element with the given tag.
    pub fn new(tag: impl Into<String,>,) -> Self
    {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Sets the element id.
    pub fn with_id(mut self, id: impl Into<String,>,) -> Self
    {
        self.id = Some(id.into(),);
        self
    }

    /// Adds a class name unless it is blank or already present.
    pub fn with_class(mut self, class: impl Into<String,>,) -> Self
    {
        let class = class.into();
        if !class.trim().is_empty() && !self.classes.contains(&class,) {
            self.classes.push(class,);
        }
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String,>, value: impl Into<String,>,) -> Self
    {
        self.attributes.push((name.into(), value.into(),),);
        self
    }

    /// Sets the text content.
    pub fn with_text(mut self, text: impl Into<String,>,) -> Self
    {
        self.text = Some(text.into(),);
        self
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: ElementSpec,) -> Self
    {
        self.children.push(child,);
        self
    }

    /// Looks up an attribute value, including `id` and `class`.
    pub fn attribute(&self, name: &str,) -> Option<String,>
    {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ",),),
            _ => self
                .attributes
                .iter()
                .find(|(candidate, _,)| candidate == name,)
                .map(|(_, value,)| value.clone(),),
        }
    }
}

/// Read/write access to the page the content script runs in.
///
/// Implementations use interior mutability: the engine holds a shared
/// reference across await points while polling the page.
pub trait Document: Send + Sync
{
    /// Handle to an element of the page.
    type Node: Clone + Send + Sync;

    /// Current page URL.
    fn location(&self,) -> String;

    /// First element matching `selector` in document order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Selector`] when the selector cannot be evaluated.
    fn query(&self, selector: &Selector,) -> Result<Option<Self::Node,>, Error,>;

    /// Element carrying the given id.
    fn element_by_id(&self, id: &str,) -> Option<Self::Node,>;

    /// Parent element of `node`.
    fn parent(&self, node: &Self::Node,) -> Option<Self::Node,>;

    /// Attribute value of `node`.
    fn attribute(&self, node: &Self::Node, name: &str,) -> Option<String,>;

    /// Concatenated text of `node` and its descendants.
    fn text_content(&self, node: &Self::Node,) -> String;

    /// Creates `element` and appends it as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host rejects the insertion.
    fn append_child(&self, parent: &Self::Node, element: &ElementSpec,)
    -> Result<Self::Node, Error,>;

    /// Creates `element` and inserts it into `parent` right before `sibling`.
    ///
    /// # Errors
    ///
    /// Returns an error when `sibling` is not a child of `parent` or the host
    /// rejects the insertion.
    fn insert_before(
        &self,
        parent: &Self::Node,
        element: &ElementSpec,
        sibling: &Self::Node,
    ) -> Result<Self::Node, Error,>;
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Declarative table describing where the button goes on each supported page.
//!
//! Contributions are evaluated in order and the first one whose URL criteria
//! match and whose anchor exists on the page receives the button. The table
//! is immutable once built.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

use crate::{dom::Selector, error::Error, provider::Application};

/// Predicate over the current page URL.
pub type UrlPredicate = fn(&str,) -> bool;

/// URL criteria deciding whether a contribution applies to a page.
#[derive(Debug, Clone,)]
pub enum MatchCriteria
{
    /// Regular expression searched in the URL.
    Pattern(Regex,),
    /// Arbitrary predicate over the URL.
    Predicate(UrlPredicate,),
}

impl MatchCriteria
{
    /// Evaluates the criteria against `url`.
    pub fn matches(&self, url: &str,) -> bool
    {
        match self {
            Self::Pattern(pattern,) => pattern.is_match(url,),
            Self::Predicate(predicate,) => predicate(url,),
        }
    }
}

/// Element wrapping the injected anchor.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct ContainerElement
{
    /// Tag of the wrapper element.
    pub tag:        String,
    /// Attributes set on the wrapper element.
    pub attributes: Vec<(String, String,),>,
}

impl ContainerElement
{
    /// Wrapper with the given tag and no attributes.
    pub fn new(tag: impl Into<String,>,) -> Self
    {
        Self {
            tag:        tag.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute to the wrapper.
    pub fn with_attribute(mut self, name: impl Into<String,>, value: impl Into<String,>,) -> Self
    {
        self.attributes.push((name.into(), value.into(),),);
        self
    }
}

/// Rule describing where and when to inject a button for one page variant.
#[derive(Debug, Clone,)]
pub struct ButtonContribution
{
    /// Unique identifier, also the suffix of the button id.
    pub id:                     String,
    /// Pages the rule is meant for.
    pub example_urls:           Vec<String,>,
    /// URL criteria.
    pub match_criteria:         MatchCriteria,
    /// Anchor element the container is placed in.
    pub selector:               Selector,
    /// Wrapper element description.
    pub container:              ContainerElement,
    /// Optional sibling the container is inserted before.
    pub insert_before:          Option<Selector,>,
    /// Hosting application the rule targets.
    pub application:            Application,
    /// Extra classes applied to the wrapper.
    pub additional_class_names: Vec<String,>,
}

impl ButtonContribution
{
    /// Returns `true` when the rule applies to `url`.
    pub fn matches(&self, url: &str,) -> bool
    {
        self.match_criteria.matches(url,)
    }

    /// Id of the button injected for this rule.
    pub fn button_id(&self, prefix: &str,) -> String
    {
        format!("{prefix}{}", self.id)
    }
}

/// Ordered, validated sequence of contributions.
#[derive(Debug, Clone,)]
pub struct ContributionRegistry
{
    contributions: Vec<ButtonContribution,>,
}

static BUILTIN: LazyLock<ContributionRegistry,> = LazyLock::new(|| ContributionRegistry {
    contributions: builtin_contributions(),
},);

impl ContributionRegistry
{
    /// Builds a registry from `contributions`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](Error::Validation) when an id is blank
    /// or duplicated, or a container tag is blank.
    pub fn new(contributions: Vec<ButtonContribution,>,) -> Result<Self, Error,>
    {
        let mut seen = HashSet::with_capacity(contributions.len(),);
        for contribution in &contributions {
            if contribution.id.trim().is_empty() {
                return Err(Error::validation("contribution id cannot be empty",),);
            }
            if contribution.id.chars().any(char::is_whitespace,) {
                return Err(Error::validation(format!(
                    "contribution id '{}' cannot contain whitespace",
                    contribution.id
                ),),);
            }
            if !seen.insert(contribution.id.as_str(),) {
                return Err(Error::validation(format!(
                    "duplicate contribution id '{}'",
                    contribution.id
                ),),);
            }
            if contribution.container.tag.trim().is_empty() {
                return Err(Error::validation(format!(
                    "contribution '{}' has an empty container tag",
                    contribution.id
                ),),);
            }
        }

        Ok(Self {
            contributions,
        },)
    }

    /// The table shipped with the content script.
    pub fn builtin() -> &'static ContributionRegistry
    {
        &BUILTIN
    }

    /// Contributions in evaluation order.
    pub fn iter(&self,) -> impl Iterator<Item = &ButtonContribution,>
    {
        self.contributions.iter()
    }

    /// Number of contributions.
    pub fn len(&self,) -> usize
    {
        self.contributions.len()
    }

    /// Returns `true` when the registry holds no contributions.
    pub fn is_empty(&self,) -> bool
    {
        self.contributions.is_empty()
    }

    /// Looks up a contribution by id.
    pub fn get(&self, id: &str,) -> Option<&ButtonContribution,>
    {
        self.contributions.iter().find(|contribution| contribution.id == id,)
    }

    /// Contributions whose URL criteria accept `url`, in order.
    pub fn matching<'a,>(&'a self, url: &'a str,) -> impl Iterator<Item = &'a ButtonContribution,>
    {
        self.contributions.iter().filter(move |contribution| contribution.matches(url,),)
    }

    /// Returns `true` when the host of `url` belongs to a provider that has
    /// at least one contribution.
    ///
    /// # Examples
    ///
    /// ```
    /// use eons_open::ContributionRegistry;
    ///
    /// let registry = ContributionRegistry::builtin();
    /// assert!(registry.is_site_suitable("https://github.com/rust-lang/rust"));
    /// assert!(!registry.is_site_suitable("https://example.com/rust-lang/rust"));
    /// ```
    pub fn is_site_suitable(&self, url: &str,) -> bool
    {
        Application::from_url(url,).is_some_and(|application| {
            self.contributions.iter().any(|contribution| contribution.application == application,)
        },)
    }
}

fn pattern(source: &str,) -> MatchCriteria
{
    MatchCriteria::Pattern(Regex::new(source,).expect("valid contribution pattern",),)
}

static MERGE_REQUEST_PATH: LazyLock<Regex,> =
    LazyLock::new(|| Regex::new(r"/-/merge_requests/\d+",).expect("valid merge request pattern",),);

/// Returns `true` for GitLab merge-request pages.
pub fn is_gitlab_merge_request(url: &str,) -> bool
{
    Application::from_url(url,) == Some(Application::GitLab,) && MERGE_REQUEST_PATH.is_match(url,)
}

fn builtin_contributions() -> Vec<ButtonContribution,>
{
    vec![
        ButtonContribution {
            id:                     "gh-repo".to_owned(),
            example_urls:           vec![
                "https://github.com/rust-lang/rust".to_owned(),
                "https://github.com/rust-lang/rust/tree/master/library".to_owned(),
                "https://github.com/rust-lang/rust/pull/1".to_owned(),
            ],
            match_criteria:         pattern(r"^https://(www\.)?github\.com/[^/]+/[^/?#]+",),
            selector:               Selector::xpath(r#"//*[@id="repository-details-container"]/ul"#,),
            container:              ContainerElement::new("li",),
            insert_before:          Some(Selector::xpath(
                r#"//*[@id="repository-details-container"]/ul/li[1]"#,
            ),),
            application:            Application::GitHub,
            additional_class_names: Vec::new(),
        },
        ButtonContribution {
            id:                     "gl-repo".to_owned(),
            example_urls:           vec![
                "https://gitlab.com/gitlab-org/gitlab".to_owned(),
                "https://gitlab.com/gitlab-org/gitlab/-/tree/master".to_owned(),
            ],
            match_criteria:         pattern(r"^https://(www\.)?gitlab\.com/[^/]+/[^/?#]+",),
            selector:               Selector::css(".project-repo-buttons",),
            container:              ContainerElement::new("div",)
                .with_attribute("data-testid", "eons-open-container",),
            insert_before:          None,
            application:            Application::GitLab,
            additional_class_names: vec!["gl-ml-3".to_owned()],
        },
        ButtonContribution {
            id:                     "gl-mr".to_owned(),
            example_urls:           vec![
                "https://gitlab.com/gitlab-org/gitlab/-/merge_requests/1".to_owned(),
            ],
            match_criteria:         MatchCriteria::Predicate(is_gitlab_merge_request,),
            selector:               Selector::css(".detail-page-header-actions",),
            container:              ContainerElement::new("div",),
            insert_before:          Some(Selector::css(".detail-page-header-actions > .dropdown",),),
            application:            Application::GitLab,
            additional_class_names: vec!["gl-mr-3".to_owned()],
        },
        ButtonContribution {
            id:                     "gl-repo-alt".to_owned(),
            example_urls:           vec![
                "https://gitlab.com/gitlab-org/gitlab/-/tree/master/app".to_owned(),
            ],
            match_criteria:         pattern(r"^https://(www\.)?gitlab\.com/[^/]+/[^/?#]+",),
            selector:               Selector::css(".tree-controls",),
            container:              ContainerElement::new("div",),
            insert_before:          None,
            application:            Application::GitLab,
            additional_class_names: vec!["gl-ml-3".to_owned()],
        },
    ]
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Workspace URL templates.
//!
//! Templates interpolate `{{variable}}` expressions with optional
//! pipe-delimited filters such as `{{branchName|slice:0,20}}`. Interpolation
//! is raw: values are inserted without implicit encoding, use the `encode`
//! filter to escape them.
//!
//! Filter arguments must not contain whitespace: `{{branchName|slice:0, 20}}`
//! is a template error.

use std::fmt;

use tracing::debug;

use crate::{encode::encode_uri_component, error::Error};

/// Template applied when no template is stored.
pub const DEFAULT_TEMPLATE: &str =
    "https://workspace.infrastructure.tech/#/cast/dev?kasm_url={{repoUrl}}";

/// Prefix of the URL produced when a template cannot be rendered.
pub const FALLBACK_URL_PREFIX: &str = "https://workspace.infrastructure.tech/#/cast/dev?kasm_url=";

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Values available to a template during rendering.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct TemplateContext
{
    /// Canonical repository URL of the current page.
    pub repo_url:    String,
    /// Branch name, present only when it could be resolved.
    pub branch_name: Option<String,>,
}

impl TemplateContext
{
    /// Creates a context for `repo_url` with an optional branch.
    pub fn new(repo_url: impl Into<String,>, branch_name: Option<String,>,) -> Self
    {
        Self {
            repo_url: repo_url.into(),
            branch_name,
        }
    }

    fn lookup(&self, variable: Variable,) -> Option<&str,>
    {
        match variable {
            Variable::RepoUrl => Some(self.repo_url.as_str(),),
            Variable::BranchName => self.branch_name.as_deref(),
        }
    }
}

/// Variables a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
enum Variable
{
    RepoUrl,
    BranchName,
}

impl Variable
{
    fn parse(name: &str,) -> Result<Self, Error,>
    {
        match name {
            "repoUrl" => Ok(Self::RepoUrl,),
            "branchName" => Ok(Self::BranchName,),
            "" => Err(Error::template("empty expression",),),
            other => Err(Error::template(format!(
                "unknown variable '{other}' (expected repoUrl or branchName)"
            ),),),
        }
    }
}

/// Filters applied left to right to an interpolated value.
#[derive(Debug, Clone, PartialEq, Eq,)]
enum Filter
{
    /// Keeps characters in `start..end`, clamped to the value length.
    Slice
    {
        start: usize, end: Option<usize,>,
    },
    Lower,
    Upper,
    /// Percent-encodes the value as a URI component.
    Encode,
    /// Substitutes the argument when the value is absent or empty.
    Default(String,),
}

impl Filter
{
    fn parse(source: &str,) -> Result<Self, Error,>
    {
        let (name, arguments,) = match source.split_once(':',) {
            Some((name, arguments,),) => (name, Some(arguments,),),
            None => (source, None,),
        };

        if let Some(arguments,) = arguments
            && arguments.chars().any(char::is_whitespace,)
        {
            return Err(Error::template(format!(
                "filter arguments must not contain whitespace: '{source}'"
            ),),);
        }

        let arguments: Vec<&str,> =
            arguments.map(|value| value.split(',',).collect(),).unwrap_or_default();

        match (name, arguments.as_slice(),) {
            ("slice", [start,],) => Ok(Self::Slice {
                start: parse_index(start, source,)?,
                end:   None,
            },),
            ("slice", [start, end,],) => Ok(Self::Slice {
                start: parse_index(start, source,)?,
                end:   Some(parse_index(end, source,)?,),
            },),
            ("slice", _,) => {
                Err(Error::template(format!("slice expects one or two arguments: '{source}'"),),)
            }
            ("lower", [],) => Ok(Self::Lower,),
            ("upper", [],) => Ok(Self::Upper,),
            ("encode", [],) => Ok(Self::Encode,),
            ("lower" | "upper" | "encode", _,) => {
                Err(Error::template(format!("filter '{name}' takes no arguments"),),)
            }
            ("default", [value,],) if !value.is_empty() => Ok(Self::Default((*value).to_owned(),),),
            ("default", _,) => {
                Err(Error::template(format!("default expects one argument: '{source}'"),),)
            }
            (other, _,) => Err(Error::template(format!("unknown filter '{other}'"),),),
        }
    }

    fn apply(&self, value: Option<String,>,) -> Option<String,>
    {
        match self {
            Self::Slice {
                start,
                end,
            } => value.map(|text| {
                let end = end.unwrap_or(usize::MAX,);
                text.chars().skip(*start,).take(end.saturating_sub(*start,),).collect()
            },),
            Self::Lower => value.map(|text| text.to_lowercase(),),
            Self::Upper => value.map(|text| text.to_uppercase(),),
            Self::Encode => value.map(|text| encode_uri_component(&text,),),
            Self::Default(fallback,) => match value {
                Some(text,) if !text.is_empty() => Some(text,),
                _ => Some(fallback.clone(),),
            },
        }
    }
}

fn parse_index(raw: &str, source: &str,) -> Result<usize, Error,>
{
    raw.parse::<usize>().map_err(|_| {
        Error::template(format!("expected a non-negative integer argument in '{source}'"),)
    },)
}

#[derive(Debug, Clone, PartialEq, Eq,)]
enum Segment
{
    Literal(String,),
    Expression
    {
        variable: Variable, filters: Vec<Filter,>,
    },
}

/// A parsed workspace URL template.
///
/// Parsing validates the whole template up front so rendering itself cannot
/// fail.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Template
{
    source:   String,
    segments: Vec<Segment,>,
}

impl Template
{
    /// Parses `source` into a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] for unterminated expressions, unknown
    /// variables or filters, malformed filter arguments, and filter arguments
    /// containing whitespace.
    pub fn parse(source: &str,) -> Result<Self, Error,>
    {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open,) = rest.find(OPEN,) {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_owned(),),);
            }
            let after_open = &rest[open + OPEN.len()..];
            let close = after_open.find(CLOSE,).ok_or_else(|| {
                Error::template(format!("unterminated expression starting at '{}'", &rest[open..]),)
            },)?;
            segments.push(parse_expression(&after_open[..close],)?,);
            rest = &after_open[close + CLOSE.len()..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned(),),);
        }

        Ok(Self {
            source: source.to_owned(),
            segments,
        },)
    }

    /// Original template text.
    pub fn source(&self,) -> &str
    {
        &self.source
    }

    /// Renders the template against `context`.
    ///
    /// Absent variables render as an empty string unless a `default` filter
    /// supplies a value.
    pub fn render(&self, context: &TemplateContext,) -> String
    {
        let mut output = String::with_capacity(self.source.len() + context.repo_url.len(),);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text,) => output.push_str(text,),
                Segment::Expression {
                    variable,
                    filters,
                } => {
                    let initial = context.lookup(*variable,).map(str::to_owned,);
                    let value =
                        filters.iter().fold(initial, |value, filter| filter.apply(value,),);
                    if let Some(value,) = value {
                        output.push_str(&value,);
                    }
                }
            }
        }
        output
    }
}

impl fmt::Display for Template
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(&self.source,)
    }
}

fn parse_expression(inner: &str,) -> Result<Segment, Error,>
{
    let mut parts = inner.split('|',);
    let name = parts.next().unwrap_or_default().trim();
    let variable = Variable::parse(name,)?;
    let filters =
        parts.map(|part| Filter::parse(part.trim(),),).collect::<Result<Vec<_,>, _,>>()?;

    Ok(Segment::Expression {
        variable,
        filters,
    },)
}

/// Renders `template` against `context`.
///
/// # Errors
///
/// Returns [`Error::Template`] when the template is malformed.
///
/// # Examples
///
/// ```
/// use eons_open::{TemplateContext, render_template};
///
/// let context = TemplateContext::new("https://github.com/a/b", None);
/// let url = render_template("https://x/?u={{repoUrl}}", &context)?;
/// assert_eq!(url, "https://x/?u=https://github.com/a/b");
/// # Ok::<(), eons_open::Error>(())
/// ```
pub fn render_template(template: &str, context: &TemplateContext,) -> Result<String, Error,>
{
    Ok(Template::parse(template,)?.render(context,),)
}

/// Builds the URL used when a template cannot be rendered.
pub fn fallback_url(repo_url: &str,) -> String
{
    format!("{FALLBACK_URL_PREFIX}{}", encode_uri_component(repo_url))
}

/// Renders `template`, falling back to [`fallback_url`] on any error.
pub fn render_or_fallback(template: &str, context: &TemplateContext,) -> String
{
    match render_template(template, context,) {
        Ok(url,) => url,
        Err(error,) => {
            debug!("workspace template rejected, using fallback: {}", error);
            fallback_url(&context.repo_url,)
        }
    }
}

/// Checks a template before it is saved.
///
/// The template must be non-blank, start with `http://` or `https://`, and
/// parse under the template grammar.
///
/// # Errors
///
/// Returns [`Error::Validation`] describing the first problem found.
pub fn validate_template(template: &str,) -> Result<(), Error,>
{
    let trimmed = template.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("workspace template cannot be empty",),);
    }
    if !(trimmed.starts_with("http://",) || trimmed.starts_with("https://",)) {
        return Err(Error::validation("workspace template must start with http:// or https://",),);
    }
    Template::parse(trimmed,)
        .map(|_| (),)
        .map_err(|error| Error::validation(error.to_display_string(),),)
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::{
        DEFAULT_TEMPLATE, Error, Template, TemplateContext, fallback_url, render_or_fallback,
        render_template, validate_template,
    };

    fn context(branch: Option<&str,>,) -> TemplateContext
    {
        TemplateContext::new("https://github.com/a/b", branch.map(str::to_owned,),)
    }

    #[test]
    fn interpolates_repo_url_without_encoding()
    {
        let url = render_template("https://x/?u={{repoUrl}}", &context(None,),)
            .expect("expected render success",);
        assert_eq!(url, "https://x/?u=https://github.com/a/b");
    }

    #[test]
    fn default_template_renders_raw_repo_url()
    {
        let url = render_or_fallback(DEFAULT_TEMPLATE, &context(None,),);
        assert_eq!(
            url,
            "https://workspace.infrastructure.tech/#/cast/dev?kasm_url=https://github.com/a/b"
        );
    }

    #[test]
    fn malformed_template_falls_back_to_encoded_url()
    {
        let url = render_or_fallback("https://x/?u={{repoUrl", &context(None,),);
        assert_eq!(
            url,
            "https://workspace.infrastructure.tech/#/cast/dev?kasm_url=https%3A%2F%2Fgithub.com%2Fa%2Fb"
        );
        assert_eq!(url, fallback_url("https://github.com/a/b",));
    }

    #[test]
    fn slice_filter_truncates_branch_name()
    {
        let url = render_template(
            "https://x/?b={{branchName|slice:0,7}}",
            &context(Some("feature-login-form",),),
        )
        .expect("expected render success",);
        assert_eq!(url, "https://x/?b=feature");
    }

    #[test]
    fn slice_filter_clamps_to_value_length()
    {
        let url = render_template("{{branchName|slice:2,50}}", &context(Some("main",),),)
            .expect("expected render success",);
        assert_eq!(url, "in");

        let url = render_template("{{branchName|slice:9}}", &context(Some("main",),),)
            .expect("expected render success",);
        assert_eq!(url, "");
    }

    #[test]
    fn whitespace_in_filter_arguments_is_rejected()
    {
        let error = render_template("{{branchName|slice:0, 20}}", &context(Some("main",),),)
            .expect_err("expected whitespace rejection",);
        match error {
            Error::Template {
                message,
            } => {
                assert_eq!(
                    message,
                    "filter arguments must not contain whitespace: 'slice:0, 20'"
                );
            }
            other => panic!("expected template error, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_around_names_is_tolerated()
    {
        let url = render_template("{{ branchName | upper }}", &context(Some("dev",),),)
            .expect("expected render success",);
        assert_eq!(url, "DEV");
    }

    #[test]
    fn absent_branch_renders_empty_or_default()
    {
        let url = render_template("https://x/?b={{branchName}}", &context(None,),)
            .expect("expected render success",);
        assert_eq!(url, "https://x/?b=");

        let url = render_template("https://x/?b={{branchName|default:main}}", &context(None,),)
            .expect("expected render success",);
        assert_eq!(url, "https://x/?b=main");
    }

    #[test]
    fn filters_chain_left_to_right()
    {
        let url = render_template(
            "{{branchName|upper|slice:0,3|encode}}",
            &context(Some("a b/c",),),
        )
        .expect("expected render success",);
        assert_eq!(url, "A%20B");
    }

    #[test]
    fn encode_filter_escapes_repo_url()
    {
        let url = render_template("https://x/?u={{repoUrl|encode}}", &context(None,),)
            .expect("expected render success",);
        assert_eq!(url, "https://x/?u=https%3A%2F%2Fgithub.com%2Fa%2Fb");
    }

    #[test]
    fn rejects_unknown_variables_and_filters()
    {
        assert!(Template::parse("{{owner}}",).is_err());
        assert!(Template::parse("{{repoUrl|reverse}}",).is_err());
        assert!(Template::parse("{{repoUrl|lower:1}}",).is_err());
        assert!(Template::parse("{{branchName|slice:a,b}}",).is_err());
        assert!(Template::parse("{{branchName|slice}}",).is_err());
        assert!(Template::parse("{{branchName|default:}}",).is_err());
        assert!(Template::parse("{{}}",).is_err());
    }

    #[test]
    fn stray_closing_braces_are_literal()
    {
        let url = render_template("https://x/}}?u={{repoUrl}}", &context(None,),)
            .expect("expected render success",);
        assert_eq!(url, "https://x/}}?u=https://github.com/a/b");
    }

    #[test]
    fn template_display_returns_source()
    {
        let template = Template::parse(DEFAULT_TEMPLATE,).expect("expected parse success",);
        assert_eq!(template.to_string(), DEFAULT_TEMPLATE);
        assert_eq!(template.source(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn validate_template_accepts_default()
    {
        validate_template(DEFAULT_TEMPLATE,).expect("expected default to validate",);
    }

    #[test]
    fn validate_template_reports_problems()
    {
        assert!(matches!(validate_template("   ",), Err(Error::Validation { .. })));
        assert!(matches!(
            validate_template("ftp://x/{{repoUrl}}",),
            Err(Error::Validation { .. })
        ));

        let error = validate_template("https://x/?b={{branchName|slice:0, 20}}",)
            .expect_err("expected whitespace rejection",);
        assert!(error.to_string().contains("must not contain whitespace"));
    }

    proptest! {
        #[test]
        fn fallback_never_fails(template in "\\PC{0,60}", repo in "\\PC{0,40}") {
            let context = TemplateContext::new(repo.clone(), None);
            let rendered = render_or_fallback(&template, &context);
            if Template::parse(&template).is_err() {
                prop_assert_eq!(rendered, fallback_url(&repo));
            }
        }

        #[test]
        fn templates_without_expressions_render_verbatim(text in "[^{}]{0,60}") {
            let rendered = render_template(&text, &TemplateContext::new("r", None))
                .expect("expected literal template to render");
            prop_assert_eq!(rendered, text);
        }
    }
}

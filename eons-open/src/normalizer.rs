// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Transformation logic that converts page URLs into canonical repository
//! URLs.
//!
//! View-specific path segments (pull requests, blobs, merge requests) are
//! stripped so the workspace receives a cloneable address. Branch context is
//! kept where the page carries it. Normalization is best effort: any failure
//! yields the raw page URL.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    dom::{Document, Selector},
    encode::decode_uri_component,
    error::Error,
    poll::{PollConfig, poll_until},
    provider::Application,
};

/// Canonical origin used for GitHub repositories.
const GITHUB_ORIGIN: &str = "https://github.com";
/// Hosts serving GitHub repository pages; other subdomains are left alone.
const GITHUB_WEB_HOSTS: [&str; 2] = ["github.com", "www.github.com",];
/// Path marker separating a GitLab project from a file view.
const GITLAB_BLOB_MARKER: &str = "/-/blob/";
/// Element holding the source branch name on merge-request pages.
const REF_NAME_SELECTOR: &str = ".ref-name";
/// Legacy merge-request header link to the source branch.
const REF_CONTAINER_SELECTOR: &str = ".ref-container a";
/// Element embedding merge-request metadata as JSON.
const METADATA_SELECTOR: &str = "[data-mr-metadata]";
const METADATA_ATTRIBUTE: &str = "data-mr-metadata";

static MERGE_REQUEST: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>https?://[^?#]+?)/-/merge_requests/\d+",)
        .expect("valid merge request pattern",)
},);

static TREE_SEGMENT: LazyLock<Regex,> = LazyLock::new(|| {
    Regex::new(r"/(?:-/)?tree/(?P<branch>[^/?#]+)",).expect("valid tree segment pattern",)
},);

/// Canonical repository URL and the branch carried by it.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct NormalizedUrl
{
    /// Repository address stripped of view-specific segments.
    pub canonical_url: String,
    /// Branch extracted from the canonical URL, if any.
    pub branch_name:   Option<String,>,
}

#[derive(Debug, Deserialize,)]
struct MergeRequestMetadata
{
    #[serde(default)]
    source_branch: Option<String,>,
}

/// Provider-aware URL normalizer.
#[derive(Debug, Clone, Default,)]
pub struct UrlNormalizer
{
    branch_poll: PollConfig,
}

impl UrlNormalizer
{
    /// Creates a normalizer polling merge-request pages with `branch_poll`.
    pub fn new(branch_poll: PollConfig,) -> Self
    {
        Self {
            branch_poll,
        }
    }

    /// Computes the canonical URL and branch for the page at `raw_url`.
    pub async fn normalize<D,>(&self, raw_url: &str, document: &D,) -> NormalizedUrl
    where
        D: Document,
    {
        let canonical_url = self.canonical_url(raw_url, document,).await;
        let branch_name = extract_branch_name(&canonical_url,);
        NormalizedUrl {
            canonical_url,
            branch_name,
        }
    }

    /// Computes the canonical repository URL for the page at `raw_url`.
    ///
    /// Returns `raw_url` unchanged for unsupported hosts and whenever
    /// normalization fails.
    pub async fn canonical_url<D,>(&self, raw_url: &str, document: &D,) -> String
    where
        D: Document,
    {
        match self.try_canonical_url(raw_url, document,).await {
            Ok(url,) => url,
            Err(error,) => {
                debug!("keeping raw URL {}: {}", raw_url, error);
                raw_url.to_owned()
            }
        }
    }

    async fn try_canonical_url<D,>(&self, raw_url: &str, document: &D,) -> Result<String, Error,>
    where
        D: Document,
    {
        let parsed = Url::parse(raw_url,)?;
        match parsed.host_str().and_then(Application::from_host,) {
            Some(Application::GitHub,) if is_github_web_host(&parsed,) => normalize_github(&parsed,),
            Some(Application::GitHub,) => Ok(raw_url.to_owned(),),
            Some(Application::GitLab,) => Ok(self.normalize_gitlab(raw_url, document,).await,),
            None => Ok(raw_url.to_owned(),),
        }
    }

    async fn normalize_gitlab<D,>(&self, raw_url: &str, document: &D,) -> String
    where
        D: Document,
    {
        if let Some(captures,) = MERGE_REQUEST.captures(raw_url,) {
            let base = &captures["base"];
            let branch =
                poll_until(&self.branch_poll, "merge request branch lookup", || {
                    probe_source_branch(document,)
                },)
                .await;
            return match branch {
                Some(branch,) => format!("{base}/-/tree/{branch}"),
                None => base.to_owned(),
            };
        }

        match raw_url.find(GITLAB_BLOB_MARKER,) {
            Some(index,) => raw_url[..index].to_owned(),
            None => raw_url.to_owned(),
        }
    }
}

fn is_github_web_host(parsed: &Url,) -> bool
{
    parsed
        .host_str()
        .map(|host| host.trim_end_matches('.',).to_ascii_lowercase(),)
        .is_some_and(|host| GITHUB_WEB_HOSTS.contains(&host.as_str(),),)
}

/// Strips a GitHub URL to `https://github.com/<owner>/<repo>`, keeping a
/// `/tree/<branch>` suffix.
///
/// # Errors
///
/// Returns [`Error::Validation`](Error::Validation) when the path does not
/// name a repository.
fn normalize_github(parsed: &Url,) -> Result<String, Error,>
{
    let segments: Vec<&str,> =
        parsed.path_segments().map(|segments| segments.filter(|s| !s.is_empty(),).collect(),).unwrap_or_default();

    let (owner, repository,) = match segments.as_slice() {
        [owner, repository, ..] => (*owner, *repository,),
        _ => {
            return Err(Error::validation(format!(
                "'{}' does not name a GitHub repository",
                parsed.path()
            ),),);
        }
    };

    let mut canonical = format!("{GITHUB_ORIGIN}/{owner}/{repository}");
    if let [_, _, "tree", branch @ ..] = segments.as_slice()
        && !branch.is_empty()
    {
        canonical.push_str("/tree/",);
        canonical.push_str(&branch.join("/",),);
    }
    Ok(canonical,)
}

/// Looks up the source branch on a merge-request page.
///
/// Sources are consulted in priority order: the ref-name element, the
/// legacy ref-container link, then the embedded metadata blob.
fn probe_source_branch<D,>(document: &D,) -> Option<String,>
where
    D: Document,
{
    let query = |source: &str| match document.query(&Selector::css(source,),) {
        Ok(node,) => node,
        Err(error,) => {
            debug!("branch probe selector failed: {}", error);
            None
        }
    };

    if let Some(node,) = query(REF_NAME_SELECTOR,)
        && let Some(branch,) = non_blank(document.text_content(&node,),)
    {
        return Some(branch,);
    }

    if let Some(node,) = query(REF_CONTAINER_SELECTOR,) {
        let title = document.attribute(&node, "title",).and_then(non_blank,);
        if let Some(branch,) = title.or_else(|| non_blank(document.text_content(&node,),),) {
            return Some(branch,);
        }
    }

    let raw = query(METADATA_SELECTOR,).and_then(|node| document.attribute(&node, METADATA_ATTRIBUTE,),)?;
    match serde_json::from_str::<MergeRequestMetadata,>(&raw,) {
        Ok(metadata,) => metadata.source_branch.and_then(non_blank,),
        Err(error,) => {
            debug!("merge request metadata is not valid JSON: {}", error);
            None
        }
    }
}

fn non_blank(value: String,) -> Option<String,>
{
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned(),) }
}

/// Extracts the branch from a `/tree/<branch>` or `/-/tree/<branch>` URL.
///
/// Only the first path segment after `tree/` is captured and it is
/// percent-decoded; branch names containing `/` are therefore truncated to
/// their first component unless the slash is encoded.
///
/// # Examples
///
/// ```
/// use eons_open::extract_branch_name;
///
/// assert_eq!(
///     extract_branch_name("https://gitlab.com/o/r/-/tree/release%2F1.0").as_deref(),
///     Some("release/1.0")
/// );
/// assert_eq!(extract_branch_name("https://github.com/o/r"), None);
/// ```
pub fn extract_branch_name(url: &str,) -> Option<String,>
{
    TREE_SEGMENT.captures(url,).map(|captures| decode_uri_component(&captures["branch"],),)
}

#[cfg(test)]
mod tests
{
    use std::{sync::Arc, time::Duration};

    use tokio::time::{Instant, sleep};

    use super::{NormalizedUrl, UrlNormalizer, extract_branch_name};
    use crate::{
        dom::{Document, ElementSpec},
        poll::PollConfig,
        virtual_dom::VirtualDocument,
    };

    fn normalizer() -> UrlNormalizer
    {
        UrlNormalizer::new(PollConfig {
            interval: Duration::from_millis(100,), timeout: Duration::from_millis(1000,),
        },)
    }

    async fn canonical(raw: &str,) -> String
    {
        let document = VirtualDocument::new(raw,);
        normalizer().canonical_url(raw, &document,).await
    }

    #[tokio::test]
    async fn github_pull_request_collapses_to_repository()
    {
        assert_eq!(canonical("https://github.com/o/r/pull/12",).await, "https://github.com/o/r");
    }

    #[tokio::test]
    async fn github_tree_keeps_branch_path()
    {
        assert_eq!(
            canonical("https://github.com/o/r/tree/feature/x",).await,
            "https://github.com/o/r/tree/feature/x"
        );
    }

    #[tokio::test]
    async fn github_drops_query_fragment_and_www()
    {
        assert_eq!(
            canonical("https://www.github.com/o/r/blob/main/README.md?plain=1#L4",).await,
            "https://github.com/o/r"
        );
        assert_eq!(canonical("https://github.com/o/r/tree/",).await, "https://github.com/o/r");
    }

    #[tokio::test]
    async fn github_non_repository_pages_are_unchanged()
    {
        assert_eq!(canonical("https://github.com/octocat",).await, "https://github.com/octocat");
        assert_eq!(canonical("https://github.com/",).await, "https://github.com/");
    }

    #[tokio::test]
    async fn github_service_subdomains_are_unchanged()
    {
        for raw in [
            "https://api.github.com/repos/o/r",
            "https://gist.github.com/octocat/abc123",
            "https://docs.github.com/en/actions",
        ] {
            assert_eq!(canonical(raw,).await, raw);
        }
        assert_eq!(canonical("https://WWW.GitHub.com/o/r/pull/3",).await, "https://github.com/o/r");
    }

    #[tokio::test]
    async fn gitlab_blob_truncates_before_marker()
    {
        assert_eq!(
            canonical("https://gitlab.com/o/r/-/blob/main/file.ts",).await,
            "https://gitlab.com/o/r"
        );
        assert_eq!(
            canonical("https://gitlab.com/group/sub/r/-/blob/main/a/b.rs",).await,
            "https://gitlab.com/group/sub/r"
        );
    }

    #[tokio::test]
    async fn gitlab_other_pages_are_unchanged()
    {
        assert_eq!(
            canonical("https://gitlab.com/o/r/-/tree/dev",).await,
            "https://gitlab.com/o/r/-/tree/dev"
        );
    }

    #[tokio::test]
    async fn unsupported_hosts_and_garbage_are_unchanged()
    {
        assert_eq!(
            canonical("https://bitbucket.org/o/r/src/main",).await,
            "https://bitbucket.org/o/r/src/main"
        );
        assert_eq!(canonical("not a url",).await, "not a url");
    }

    #[tokio::test]
    async fn merge_request_uses_ref_name_element()
    {
        let raw = "https://gitlab.com/o/r/-/merge_requests/5/diffs";
        let document = VirtualDocument::new(raw,);
        document
            .append(document.root(), &ElementSpec::new("span",).with_class("ref-name",).with_text(" feature ",),)
            .expect("append",);

        let normalized = normalizer().normalize(raw, &document,).await;
        assert_eq!(normalized, NormalizedUrl {
            canonical_url: "https://gitlab.com/o/r/-/tree/feature".to_owned(),
            branch_name:   Some("feature".to_owned(),),
        });
    }

    #[tokio::test]
    async fn merge_request_falls_back_to_legacy_link_title()
    {
        let raw = "https://gitlab.com/o/r/-/merge_requests/5";
        let document = VirtualDocument::new(raw,);
        let container = document
            .append(document.root(), &ElementSpec::new("div",).with_class("ref-container",),)
            .expect("append",);
        document
            .append(container, &ElementSpec::new("a",).with_attribute("title", "hotfix",).with_text("hot…",),)
            .expect("append",);

        assert_eq!(
            normalizer().canonical_url(raw, &document,).await,
            "https://gitlab.com/o/r/-/tree/hotfix"
        );
    }

    #[tokio::test]
    async fn merge_request_reads_metadata_blob()
    {
        let raw = "https://gitlab.com/o/r/-/merge_requests/5";
        let document = VirtualDocument::new(raw,);
        document
            .append(
                document.root(),
                &ElementSpec::new("div",)
                    .with_attribute("data-mr-metadata", r#"{"source_branch":"topic","iid":5}"#,),
            )
            .expect("append",);

        assert_eq!(
            normalizer().canonical_url(raw, &document,).await,
            "https://gitlab.com/o/r/-/tree/topic"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn merge_request_without_branch_times_out_to_base()
    {
        let raw = "https://gitlab.com/o/r/-/merge_requests/5";
        let document = VirtualDocument::new(raw,);
        document
            .append(document.root(), &ElementSpec::new("div",).with_attribute("data-mr-metadata", "{oops",),)
            .expect("append",);
        let started = Instant::now();

        let normalized = normalizer().normalize(raw, &document,).await;
        assert_eq!(normalized.canonical_url, "https://gitlab.com/o/r");
        assert_eq!(normalized.branch_name, None);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn merge_request_branch_rendered_late_is_picked_up()
    {
        let raw = "https://gitlab.com/o/r/-/merge_requests/5";
        let document = Arc::new(VirtualDocument::new(raw,),);
        let writer = Arc::clone(&document,);
        tokio::spawn(async move {
            sleep(Duration::from_millis(250,),).await;
            writer
                .append(writer.root(), &ElementSpec::new("span",).with_class("ref-name",).with_text("late",),)
                .expect("append",);
        },);

        let started = Instant::now();
        let canonical = normalizer().canonical_url(raw, document.as_ref(),).await;
        assert_eq!(canonical, "https://gitlab.com/o/r/-/tree/late");
        assert_eq!(started.elapsed(), Duration::from_millis(300));
        assert_eq!(document.location(), raw);
    }

    #[test]
    fn extracts_single_segment_branches()
    {
        assert_eq!(extract_branch_name("https://github.com/o/r/tree/main",).as_deref(), Some("main"));
        assert_eq!(extract_branch_name("https://gitlab.com/o/r/-/tree/dev?ref_type=heads",).as_deref(), Some("dev"));
        assert_eq!(extract_branch_name("https://github.com/o/r/tree/feature/x",).as_deref(), Some("feature"));
        assert_eq!(extract_branch_name("https://github.com/o/r/tree/feature%2Fx",).as_deref(), Some("feature/x"));
        assert_eq!(extract_branch_name("https://github.com/o/r/pull/1",), None);
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Code-hosting providers recognised by the injector.
//!
//! A provider is identified purely by the host of the current page. Hosts
//! match when they equal the provider domain or are a subdomain of it, so
//! `www.github.com` is treated like `github.com` while `notgithub.com` is not.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Hosting application that owns a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "lowercase")]
pub enum Application
{
    /// github.com repository pages.
    GitHub,
    /// gitlab.com repository and merge-request pages.
    GitLab,
}

impl Application
{
    /// All supported providers in lookup order.
    pub const ALL: [Application; 2] = [Application::GitHub, Application::GitLab,];

    /// Registrable domain associated with the provider.
    pub const fn domain(self,) -> &'static str
    {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
        }
    }

    /// Styling tag applied to the injected container element.
    pub const fn tag(self,) -> &'static str
    {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
        }
    }

    /// Returns `true` when `host` belongs to this provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use eons_open::Application;
    ///
    /// assert!(Application::GitHub.matches_host("github.com"));
    /// assert!(Application::GitHub.matches_host("WWW.GitHub.com"));
    /// assert!(!Application::GitHub.matches_host("notgithub.com"));
    /// ```
    pub fn matches_host(self, host: &str,) -> bool
    {
        let host = host.trim_end_matches('.',).to_ascii_lowercase();
        let domain = self.domain();
        host == domain
            || host.strip_suffix(domain,).is_some_and(|prefix| prefix.ends_with('.',),)
    }

    /// Resolves the provider that owns `host`, if any.
    pub fn from_host(host: &str,) -> Option<Self,>
    {
        Self::ALL.into_iter().find(|application| application.matches_host(host,),)
    }

    /// Resolves the provider that owns the page at `raw_url`.
    ///
    /// Returns `None` for unparsable URLs and for URLs without a host.
    pub fn from_url(raw_url: &str,) -> Option<Self,>
    {
        let parsed = Url::parse(raw_url,).ok()?;
        parsed.host_str().and_then(Self::from_host,)
    }
}

impl fmt::Display for Application
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.tag(),)
    }
}

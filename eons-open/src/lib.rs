//! Injection of an "Open" button into GitHub and GitLab repository pages.
//!
//! The library recognises supported hosting pages, normalizes the current
//! page URL to a cloneable repository address, renders the user's workspace
//! URL template and places a link button in the page header. The page itself
//! is reached through the [`Document`] trait; [`VirtualDocument`] provides an
//! in-memory implementation used by the CLI and the tests.
//!
//! ```
//! use std::sync::Arc;
//!
//! use eons_open::{
//!     ConfigStore, ElementSpec, EngineSettings, InjectionEngine, InjectionOutcome,
//!     VirtualDocument,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let document = Arc::new(VirtualDocument::new("https://gitlab.com/o/r/-/blob/main/a.rs",),);
//! document
//!     .append(document.root(), &ElementSpec::new("div",).with_class("project-repo-buttons",),)
//!     .expect("fixture",);
//!
//! let engine =
//!     InjectionEngine::new(document, ConfigStore::unavailable(), EngineSettings::default(),);
//! match engine.inject().await {
//!     InjectionOutcome::Injected { workspace_url, .. } => {
//!         assert!(workspace_url.ends_with("kasm_url=https://gitlab.com/o/r"));
//!     }
//!     other => panic!("unexpected outcome {other:?}"),
//! }
//! # }
//! ```

mod contribution;
mod dom;
mod encode;
mod engine;
mod error;
mod mutation;
mod normalizer;
mod poll;
mod provider;
mod settings;
mod store;
mod template;
mod virtual_dom;

pub use contribution::{
    ButtonContribution, ContainerElement, ContributionRegistry, MatchCriteria, UrlPredicate,
    is_gitlab_merge_request,
};
pub use dom::{Document, ElementSpec, Selector, XPATH_PREFIX};
pub use encode::{decode_uri_component, encode_uri_component};
pub use engine::{BUTTON_CLASS, CONTAINER_CLASS, InjectionEngine, InjectionOutcome, InjectionState};
pub use error::{Error, io_error};
pub use mutation::{MutationDebouncer, PageSignal};
pub use normalizer::{NormalizedUrl, UrlNormalizer, extract_branch_name};
pub use poll::{PollConfig, poll_until};
pub use provider::Application;
pub use settings::{
    DEFAULT_BUTTON_ID_PREFIX, DEFAULT_BUTTON_LABEL, EngineSettings, load_settings, parse_settings,
};
pub use store::{ConfigStore, FileBackend, MemoryBackend, StorageBackend, TEMPLATE_KEY};
pub use template::{
    DEFAULT_TEMPLATE, FALLBACK_URL_PREFIX, Template, TemplateContext, fallback_url,
    render_or_fallback, render_template, validate_template,
};
pub use virtual_dom::{NodeId, VirtualDocument};

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Injection engine placing the "Open" button on supported pages.
//!
//! Each attempt walks the same path: reentrancy and idempotency checks,
//! suitability, URL normalization, template rendering, contribution matching
//! and finally at most one DOM mutation. Every exit is reported as an
//! [`InjectionOutcome`]; nothing in the pipeline is fatal.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::{
    contribution::{ButtonContribution, ContributionRegistry},
    dom::{Document, ElementSpec},
    error::Error,
    mutation::{MutationDebouncer, PageSignal},
    normalizer::UrlNormalizer,
    settings::EngineSettings,
    store::ConfigStore,
    template::{TemplateContext, render_or_fallback},
};

/// Class of the element wrapping the button.
pub const CONTAINER_CLASS: &str = "eons-open-btn-container";
/// Class of the button anchor.
pub const BUTTON_CLASS: &str = "eons-open-btn";

/// Result of a single injection attempt.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum InjectionOutcome
{
    /// Another attempt was still running.
    Busy,
    /// The page was already handled and its button is still present.
    Unchanged,
    /// The page is not hosted by a supported application.
    Unsuitable,
    /// No contribution accepted the page, or every candidate was skipped.
    NoMatch,
    /// A button was placed.
    Injected
    {
        /// Contribution that received the button.
        contribution_id: String,
        /// Id of the injected anchor.
        button_id:       String,
        /// Link target of the injected anchor.
        workspace_url:   String,
    },
}

#[derive(Debug, Clone,)]
struct LastInjection
{
    url:       String,
    button_id: String,
}

/// Per-page state shared by all attempts of one engine.
#[derive(Debug, Default,)]
pub struct InjectionState
{
    in_progress:   AtomicBool,
    last_injected: Mutex<Option<LastInjection,>,>,
}

/// Clears the in-progress flag when dropped.
struct AttemptGuard<'state,>
{
    flag: &'state AtomicBool,
}

impl Drop for AttemptGuard<'_,>
{
    fn drop(&mut self,)
    {
        self.flag.store(false, Ordering::Release,);
    }
}

impl InjectionState
{
    /// Whether an attempt is currently running.
    pub fn is_in_progress(&self,) -> bool
    {
        self.in_progress.load(Ordering::Acquire,)
    }

    /// URL of the most recent successful injection.
    pub fn last_injected_url(&self,) -> Option<String,>
    {
        self.last_injected.lock().as_ref().map(|last| last.url.clone(),)
    }

    fn try_begin(&self,) -> Option<AttemptGuard<'_,>,>
    {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire,)
            .ok()
            .map(|_| AttemptGuard {
                flag: &self.in_progress,
            },)
    }

    fn is_unchanged(&self, url: &str, button_present: impl Fn(&str,) -> bool,) -> bool
    {
        self.last_injected
            .lock()
            .as_ref()
            .is_some_and(|last| last.url == url && button_present(&last.button_id,),)
    }

    fn record(&self, url: &str, button_id: &str,)
    {
        *self.last_injected.lock() = Some(LastInjection {
            url:       url.to_owned(),
            button_id: button_id.to_owned(),
        },);
    }
}

/// Engine bound to one page.
pub struct InjectionEngine<D,>
where
    D: Document,
{
    document:   Arc<D,>,
    store:      ConfigStore,
    registry:   Arc<ContributionRegistry,>,
    normalizer: UrlNormalizer,
    settings:   EngineSettings,
    state:      InjectionState,
}

impl<D,> std::fmt::Debug for InjectionEngine<D,>
where
    D: Document,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("InjectionEngine",)
            .field("store", &self.store,)
            .field("contributions", &self.registry.len(),)
            .field("settings", &self.settings,)
            .field("state", &self.state,)
            .finish_non_exhaustive()
    }
}

impl<D,> InjectionEngine<D,>
where
    D: Document,
{
    /// Creates an engine using the built-in contribution table.
    pub fn new(document: Arc<D,>, store: ConfigStore, settings: EngineSettings,) -> Self
    {
        Self {
            document,
            store,
            registry: Arc::new(ContributionRegistry::builtin().clone(),),
            normalizer: UrlNormalizer::new(settings.branch_poll(),),
            settings,
            state: InjectionState::default(),
        }
    }

    /// Replaces the contribution table.
    pub fn with_registry(mut self, registry: Arc<ContributionRegistry,>,) -> Self
    {
        self.registry = registry;
        self
    }

    /// The page this engine mutates.
    pub fn document(&self,) -> &Arc<D,>
    {
        &self.document
    }

    /// Settings the engine was created with.
    pub fn settings(&self,) -> &EngineSettings
    {
        &self.settings
    }

    /// Attempt bookkeeping.
    pub fn state(&self,) -> &InjectionState
    {
        &self.state
    }

    /// Runs one injection attempt against the current page.
    pub async fn inject(&self,) -> InjectionOutcome
    {
        let Some(_guard,) = self.state.try_begin() else {
            trace!("injection already in progress");
            return InjectionOutcome::Busy;
        };

        let url = self.document.location();
        if self.state.is_unchanged(&url, |id| self.document.element_by_id(id,).is_some(),) {
            trace!("button already present for {}", url);
            return InjectionOutcome::Unchanged;
        }

        if !self.registry.is_site_suitable(&url,) {
            debug!("{} is not hosted by a supported application", url);
            return InjectionOutcome::Unsuitable;
        }

        let normalized = self.normalizer.normalize(&url, self.document.as_ref(),).await;
        debug!(
            "normalized {} to {} (branch: {:?})",
            url, normalized.canonical_url, normalized.branch_name
        );

        let template = self.store.workspace_template().await;
        let context = TemplateContext::new(normalized.canonical_url, normalized.branch_name,);
        let workspace_url = render_or_fallback(&template, &context,);

        for contribution in self.registry.matching(&url,) {
            let button_id = contribution.button_id(&self.settings.button_id_prefix,);
            if self.document.element_by_id(&button_id,).is_some() {
                debug!("{} already present, skipping {}", button_id, contribution.id);
                continue;
            }

            let anchor = match self.document.query(&contribution.selector,) {
                Ok(Some(anchor,),) => anchor,
                Ok(None,) => {
                    debug!("anchor {} not found for {}", contribution.selector, contribution.id);
                    continue;
                }
                Err(error,) => {
                    warn!("skipping {}: {}", contribution.id, error);
                    continue;
                }
            };

            let element = self.button_element(contribution, &button_id, &workspace_url,);
            if let Err(error,) = self.place(contribution, &anchor, &element,) {
                warn!("failed to place {}: {}", button_id, error);
                continue;
            }

            self.state.record(&url, &button_id,);
            info!("injected {} for {}", button_id, url);
            return InjectionOutcome::Injected {
                contribution_id: contribution.id.clone(),
                button_id,
                workspace_url,
            };
        }

        debug!("no contribution accepted {}", url);
        InjectionOutcome::NoMatch
    }

    /// Drives attempts from page lifecycle signals until the channel
    /// closes, returning the number of attempts made.
    pub async fn run(&self, signals: mpsc::Receiver<PageSignal,>,) -> usize
    {
        let engine = self;
        MutationDebouncer::new(self.settings.debounce(),)
            .run(signals, move || async move {
                let outcome = engine.inject().await;
                trace!("attempt finished: {:?}", outcome);
            },)
            .await
    }

    fn button_element(&self, contribution: &ButtonContribution, button_id: &str, workspace_url: &str,) -> ElementSpec
    {
        let button = ElementSpec::new("a",)
            .with_id(button_id,)
            .with_class(BUTTON_CLASS,)
            .with_attribute("href", workspace_url,)
            .with_attribute("target", "_blank",)
            .with_attribute("rel", "noopener noreferrer",)
            .with_text(self.settings.button_label.as_str(),);

        let container = contribution
            .container
            .attributes
            .iter()
            .fold(ElementSpec::new(contribution.container.tag.as_str(),), |element, (name, value,)| {
                element.with_attribute(name.as_str(), value.as_str(),)
            },)
            .with_class(CONTAINER_CLASS,)
            .with_class(contribution.application.tag(),);

        contribution
            .additional_class_names
            .iter()
            .fold(container, |element, class| element.with_class(class.as_str(),),)
            .with_child(button,)
    }

    fn place(&self, contribution: &ButtonContribution, anchor: &D::Node, element: &ElementSpec,) -> Result<D::Node, Error,>
    {
        if let Some(selector,) = contribution.insert_before.as_ref() {
            match self.document.query(selector,) {
                Ok(Some(sibling,),) => {
                    if let Some(parent,) = self.document.parent(&sibling,) {
                        return self.document.insert_before(&parent, element, &sibling,);
                    }
                }
                Ok(None,) => debug!("sibling {} not found, appending", selector),
                Err(error,) => debug!("sibling lookup failed, appending: {}", error),
            }
        }
        self.document.append_child(anchor, element,)
    }
}

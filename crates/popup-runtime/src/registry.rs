#![forbid(unsafe_code)]

//! Popup registry: controllers and their bindings, built once per page.
//!
//! Rather than querying the document on every interaction, bootstrap scans
//! it once and records which elements open, close or submit into which
//! popup. Dispatch is then a map lookup while walking up from the event
//! target.

use std::collections::HashMap;

use popup_core::{Document, NodeId, PopupId, TriggerMode};
use tracing::{debug, trace};

use crate::controller::PopupController;
use crate::settings::RuntimeSettings;

/// A click source bound to a popup's open operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBinding {
    pub source: NodeId,
    pub popup: PopupId,
}

/// What a click resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Open popup `popup`, anchored to `trigger`.
    Open { popup: usize, trigger: NodeId },
    /// A close affordance of popup `popup`.
    Close { popup: usize },
    /// A click on the dialog element itself.
    Backdrop { popup: usize },
}

/// Why an element found during the scan was not bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedBinding {
    /// Reference to a popup that is not click-triggered.
    NotClickTriggered { source: NodeId, popup: PopupId },
    /// A trigger placed inside the popup it opens.
    SelfReference { source: NodeId, popup: PopupId },
    /// A close affordance outside every popup.
    OrphanCloser { source: NodeId },
    /// A second popup element with an identifier already in use.
    DuplicateId { node: NodeId, popup: PopupId },
}

/// Controllers plus every binding discovered at bootstrap.
#[derive(Debug, Default)]
pub struct PopupRegistry {
    controllers: Vec<PopupController>,
    by_id: HashMap<PopupId, usize>,
    by_node: HashMap<NodeId, usize>,
    triggers: HashMap<NodeId, usize>,
    closers: HashMap<NodeId, usize>,
    submit_forms: HashMap<NodeId, usize>,
    skipped: Vec<SkippedBinding>,
}

impl PopupRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller and its submit-dismiss forms. Returns its index.
    pub fn insert<D: Document + ?Sized>(&mut self, doc: &D, controller: PopupController) -> usize {
        let index = self.controllers.len();
        let id = controller.id().clone();
        let node = controller.node();

        if self.by_id.contains_key(&id) {
            debug!(popup = %id, node = %node, "duplicate popup id; first element keeps the bindings");
            self.skipped.push(SkippedBinding::DuplicateId {
                node,
                popup: id.clone(),
            });
        } else {
            self.by_id.insert(id, index);
        }

        if controller.config().dismiss_on_submit {
            for form in doc.forms_within(node) {
                trace!(popup = %controller.id(), form = %form, "submit dismiss bound");
                self.submit_forms.insert(form, index);
            }
        }

        self.by_node.insert(node, index);
        self.controllers.push(controller);
        index
    }

    /// Scan the document for trigger and close elements and bind them.
    pub fn bind_interactions<D: Document + ?Sized>(&mut self, doc: &D, settings: &RuntimeSettings) {
        for element in doc.interactive_elements() {
            let reference = doc
                .attribute(element, "href")
                .or_else(|| doc.attribute(element, "data-popup-target"));

            let is_closer = doc.has_class(element, &settings.close_class)
                || reference
                    .as_deref()
                    .is_some_and(|r| settings.is_close_reference(r));

            if is_closer {
                self.bind_closer(doc, element);
                continue;
            }

            let Some(reference) = reference else {
                continue;
            };
            let Some(fragment) = popup_core::config::fragment_of(&reference) else {
                continue;
            };
            let Some(&index) = self.by_id.get(&PopupId::new(fragment)) else {
                continue;
            };

            let controller = &self.controllers[index];
            if controller.config().trigger != TriggerMode::Click {
                self.skipped.push(SkippedBinding::NotClickTriggered {
                    source: element,
                    popup: controller.id().clone(),
                });
                continue;
            }
            if doc.contains(controller.node(), element) {
                self.skipped.push(SkippedBinding::SelfReference {
                    source: element,
                    popup: controller.id().clone(),
                });
                continue;
            }

            trace!(popup = %controller.id(), source = %element, "trigger bound");
            self.triggers.insert(element, index);
        }
    }

    fn bind_closer<D: Document + ?Sized>(&mut self, doc: &D, element: NodeId) {
        match self.enclosing_popup(doc, element) {
            Some(index) => {
                trace!(popup = %self.controllers[index].id(), source = %element, "closer bound");
                self.closers.insert(element, index);
            }
            None => self
                .skipped
                .push(SkippedBinding::OrphanCloser { source: element }),
        }
    }

    /// Nearest popup that contains `node` (excluding `node` itself being a popup).
    #[must_use]
    pub fn enclosing_popup<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> Option<usize> {
        let mut cursor = doc.parent(node);
        while let Some(current) = cursor {
            if let Some(&index) = self.by_node.get(&current) {
                return Some(index);
            }
            cursor = doc.parent(current);
        }
        None
    }

    /// Resolve a click on `target`.
    ///
    /// Walks from the target towards the root. The first trigger or close
    /// element wins; reaching a popup element stops the walk, so clicks on
    /// popup content do nothing unless they hit a bound element first. The
    /// dialog element itself as the target is a backdrop click.
    #[must_use]
    pub fn resolve_click<D: Document + ?Sized>(&self, doc: &D, target: NodeId) -> Option<ClickAction> {
        if let Some(&popup) = self.by_node.get(&target) {
            return Some(ClickAction::Backdrop { popup });
        }

        let mut cursor = Some(target);
        while let Some(current) = cursor {
            if let Some(&popup) = self.closers.get(&current) {
                return Some(ClickAction::Close { popup });
            }
            if let Some(&popup) = self.triggers.get(&current) {
                return Some(ClickAction::Open {
                    popup,
                    trigger: current,
                });
            }
            if self.by_node.contains_key(&current) {
                return None;
            }
            cursor = doc.parent(current);
        }
        None
    }

    /// Popup that dismisses when `form` is submitted.
    #[must_use]
    pub fn submit_target(&self, form: NodeId) -> Option<usize> {
        self.submit_forms.get(&form).copied()
    }

    #[must_use]
    pub fn index_of_node(&self, node: NodeId) -> Option<usize> {
        self.by_node.get(&node).copied()
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(&PopupId::new(id)).copied()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PopupController> {
        self.controllers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PopupController> {
        self.controllers.get_mut(index)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &PopupController> {
        self.controllers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Trigger bindings, ordered by source element.
    #[must_use]
    pub fn trigger_bindings(&self) -> Vec<TriggerBinding> {
        let mut bindings: Vec<_> = self
            .triggers
            .iter()
            .map(|(&source, &index)| TriggerBinding {
                source,
                popup: self.controllers[index].id().clone(),
            })
            .collect();
        bindings.sort_by_key(|binding| binding.source);
        bindings
    }

    #[must_use]
    pub fn closer_count(&self) -> usize {
        self.closers.len()
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedBinding] {
        &self.skipped
    }
}

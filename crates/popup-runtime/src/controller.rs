#![forbid(unsafe_code)]

//! Open/close lifecycle of one popup.
//!
//! # Invariants
//!
//! - `open` on an open popup and `close` on a closed popup do nothing.
//! - The page marker is released only from [`PopupController::on_closed`],
//!   which the runtime calls for every native close notification. Escape,
//!   backdrop clicks and programmatic closes therefore share one cleanup path.
//! - After construction the element's `closedby` attribute always reflects
//!   the authored dismissible setting.
//!
//! # Anchoring
//!
//! When the popup is anchored and opened from a trigger element, the trigger
//! gets a CSS `anchor-name`, the popup gets a matching `position-anchor`,
//! and the resolved position is written to `data-anchor-position-active`
//! for the stylesheet to pick up.

use popup_core::{
    AnchorPosition, Document, ElementSnapshot, NodeId, PopupConfig, PopupId, Rect,
};
use tracing::{debug, trace};

use crate::modal_lock::ModalLock;
use crate::settings::RuntimeSettings;

/// Mirror of the native dialog `open` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    Closed,
    Open,
}

/// Lifecycle owner for one popup element.
#[derive(Debug, Clone)]
pub struct PopupController {
    node: NodeId,
    id: PopupId,
    config: PopupConfig,
    /// Trigger element currently carrying this popup's `anchor-name`.
    anchored_to: Option<NodeId>,
}

impl PopupController {
    /// Read the popup's configuration and normalise its close permission.
    pub fn attach<D: Document + ?Sized>(
        doc: &mut D,
        node: NodeId,
        settings: &RuntimeSettings,
    ) -> Self {
        let snapshot = ElementSnapshot::capture(doc, node);
        let id = PopupId::resolve(snapshot.attribute("id"), &settings.default_popup_id);
        let config = PopupConfig::from_snapshot(&snapshot, settings.default_expiry_days);

        if !config.closed_by_native {
            trace!(popup = %id, closedby = config.closed_by.as_str(), "writing closedby");
            doc.set_attribute(node, "closedby", config.closed_by.as_str());
        }

        debug!(
            popup = %id,
            trigger = config.trigger.as_str(),
            expiry_days = config.expiry_days,
            closedby = config.closed_by.as_str(),
            dismiss_on_submit = config.dismiss_on_submit,
            anchored = config.anchor.is_some(),
            "popup attached"
        );

        Self {
            node,
            id,
            config,
            anchored_to: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &PopupId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PopupConfig {
        &self.config
    }

    #[must_use]
    pub fn state<D: Document + ?Sized>(&self, doc: &D) -> PopupState {
        if doc.is_dialog_open(self.node) {
            PopupState::Open
        } else {
            PopupState::Closed
        }
    }

    /// Open the popup. `via` is the trigger element, used for anchoring.
    ///
    /// Returns `false` if the popup was already open.
    pub fn open<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        lock: &mut ModalLock,
        via: Option<NodeId>,
        settings: &RuntimeSettings,
    ) -> bool {
        if doc.is_dialog_open(self.node) {
            trace!(popup = %self.id, "open ignored, already open");
            return false;
        }

        lock.lock(doc, self.node);

        match (self.config.anchor, via) {
            (Some(anchor), Some(trigger)) => {
                self.apply_anchor(doc, trigger, anchor.position, settings);
            }
            _ => self.clear_anchor(doc, settings),
        }

        doc.show_modal(self.node);
        debug!(popup = %self.id, via = ?via, "popup opened");
        true
    }

    /// Ask the dialog to close. Cleanup follows in [`Self::on_closed`].
    ///
    /// Returns `false` if the popup was already closed.
    pub fn close<D: Document + ?Sized>(&self, doc: &mut D) -> bool {
        if !doc.is_dialog_open(self.node) {
            return false;
        }
        doc.close_dialog(self.node);
        debug!(popup = %self.id, "popup close requested");
        true
    }

    /// React to the dialog's close notification.
    pub fn on_closed<D: Document + ?Sized>(&mut self, doc: &mut D, lock: &mut ModalLock) {
        if lock.unlock(doc, self.node) {
            debug!(popup = %self.id, "popup closed");
        }
    }

    /// Whether a click on `target` is a dismissing backdrop click.
    #[must_use]
    pub fn is_backdrop_dismiss(&self, target: NodeId) -> bool {
        target == self.node && self.config.closed_by.allows_backdrop()
    }

    /// Whether a close request (Escape) must be refused.
    #[must_use]
    pub fn refuses_close_request(&self) -> bool {
        !self.config.closed_by.allows_escape()
    }

    // --- Anchoring ---

    fn anchor_name(&self) -> String {
        let sanitized: String = self
            .id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("--popup-anchor-{sanitized}")
    }

    fn apply_anchor<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        trigger: NodeId,
        position: AnchorPosition,
        settings: &RuntimeSettings,
    ) {
        if let Some(previous) = self.anchored_to.filter(|previous| *previous != trigger) {
            doc.remove_style_property(previous, "anchor-name");
        }

        let name = self.anchor_name();
        let resolved =
            resolve_anchor_position(position, doc.bounding_rect(trigger), doc.viewport_height());

        doc.set_style_property(trigger, "anchor-name", &name);
        doc.set_style_property(self.node, "position-anchor", &name);
        doc.add_class(self.node, &settings.anchored_class);
        doc.set_attribute(
            self.node,
            &settings.anchor_position_attribute,
            resolved.as_str(),
        );
        self.anchored_to = Some(trigger);
        trace!(popup = %self.id, trigger = %trigger, position = resolved.as_str(), "anchored");
    }

    fn clear_anchor<D: Document + ?Sized>(&mut self, doc: &mut D, settings: &RuntimeSettings) {
        let Some(previous) = self.anchored_to.take() else {
            return;
        };
        doc.remove_style_property(previous, "anchor-name");
        doc.remove_style_property(self.node, "position-anchor");
        doc.remove_class(self.node, &settings.anchored_class);
        doc.remove_attribute(self.node, &settings.anchor_position_attribute);
    }
}

/// Resolve `auto` against the trigger's place in the viewport.
///
/// A trigger centred in the top half gets the popup below it, otherwise
/// above. Without geometry, `auto` becomes `bottom`.
#[must_use]
pub fn resolve_anchor_position(
    position: AnchorPosition,
    trigger: Option<Rect>,
    viewport_height: Option<f64>,
) -> AnchorPosition {
    if position != AnchorPosition::Auto {
        return position;
    }
    match (trigger, viewport_height) {
        (Some(rect), Some(height)) if height > 0.0 && rect.center_y() > height / 2.0 => {
            AnchorPosition::Top
        }
        _ => AnchorPosition::Bottom,
    }
}

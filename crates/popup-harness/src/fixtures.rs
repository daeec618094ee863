#![forbid(unsafe_code)]

//! Markup builders for popup fixtures.
//!
//! [`PopupSpec`] renders the markup the block's save step produces: a
//! `<dialog class="wp-block-hm-popup">` with its data attributes, a content
//! wrapper, and optionally a form and close affordances.

use popup_core::{NodeId, Rect};

use crate::dom::Dom;

/// Popup markup to render into a [`Dom`].
#[derive(Debug, Clone, Default)]
pub struct PopupSpec {
    id: Option<String>,
    trigger: Option<String>,
    expiry: Option<String>,
    closed_by: Option<String>,
    dismissible: Option<String>,
    dismiss_on_submit: bool,
    classes: Vec<String>,
    form: bool,
    close_link: bool,
    close_button: bool,
}

/// Nodes created for one popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupNodes {
    pub dialog: NodeId,
    pub content: NodeId,
    pub form: Option<NodeId>,
    pub close_link: Option<NodeId>,
    pub close_button: Option<NodeId>,
}

impl PopupSpec {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(id.to_owned()),
            ..Self::default()
        }
    }

    /// A popup without an `id` attribute.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn trigger(mut self, trigger: &str) -> Self {
        self.trigger = Some(trigger.to_owned());
        self
    }

    #[must_use]
    pub fn expiry(mut self, expiry: &str) -> Self {
        self.expiry = Some(expiry.to_owned());
        self
    }

    #[must_use]
    pub fn closed_by(mut self, closed_by: &str) -> Self {
        self.closed_by = Some(closed_by.to_owned());
        self
    }

    /// Older markup: `data-dismissible` instead of `closedby`.
    #[must_use]
    pub fn legacy_dismissible(mut self, dismissible: &str) -> Self {
        self.dismissible = Some(dismissible.to_owned());
        self
    }

    #[must_use]
    pub fn dismiss_on_submit(mut self) -> Self {
        self.dismiss_on_submit = true;
        self.form = true;
        self
    }

    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_owned());
        self
    }

    #[must_use]
    pub fn with_form(mut self) -> Self {
        self.form = true;
        self
    }

    /// An `<a href="#close">` inside the content.
    #[must_use]
    pub fn with_close_link(mut self) -> Self {
        self.close_link = true;
        self
    }

    /// A `<button class="hm-popup-close">` inside the content.
    #[must_use]
    pub fn with_close_button(mut self) -> Self {
        self.close_button = true;
        self
    }

    /// Render under `parent`.
    pub fn render(&self, dom: &mut Dom, parent: NodeId) -> PopupNodes {
        let mut dialog = dom.append(parent, "dialog").class("wp-block-hm-popup");
        for class in &self.classes {
            dialog = dialog.class(class);
        }
        let attributes = [
            ("id", &self.id),
            ("data-trigger", &self.trigger),
            ("data-expiry", &self.expiry),
            ("closedby", &self.closed_by),
            ("data-dismissible", &self.dismissible),
        ];
        for (name, value) in attributes {
            if let Some(value) = value {
                dialog = dialog.attr(name, value);
            }
        }
        if self.dismiss_on_submit {
            dialog = dialog.attr("data-dismiss-on-submit", "true");
        }
        let dialog = dialog.finish();

        let content = dom
            .append(dialog, "div")
            .class("wp-block-hm-popup__content")
            .finish();
        let form = self.form.then(|| {
            let form = dom.append(content, "form").finish();
            let _submit = dom.append(form, "button").attr("type", "submit").finish();
            form
        });
        let close_link = self
            .close_link
            .then(|| dom.append(content, "a").attr("href", "#close").finish());
        let close_button = self.close_button.then(|| {
            dom.append(content, "button")
                .class("hm-popup-close")
                .finish()
        });

        PopupNodes {
            dialog,
            content,
            form,
            close_link,
            close_button,
        }
    }
}

impl Dom {
    /// Render `spec` at the end of `<body>`.
    pub fn add_popup(&mut self, spec: &PopupSpec) -> PopupNodes {
        let body = self.body();
        spec.render(self, body)
    }

    /// `<a href="{href}">` at the end of `<body>`.
    pub fn add_link(&mut self, href: &str) -> NodeId {
        let body = self.body();
        self.append(body, "a").attr("href", href).finish()
    }

    /// `<a href="{href}">` with a layout box.
    pub fn add_link_at(&mut self, href: &str, rect: Rect) -> NodeId {
        let body = self.body();
        self.append(body, "a").attr("href", href).rect(rect).finish()
    }

    /// `<button data-popup-target="{target}">` at the end of `<body>`.
    pub fn add_target_button(&mut self, target: &str) -> NodeId {
        let body = self.body();
        self.append(body, "button")
            .attr("data-popup-target", target)
            .finish()
    }
}

#![forbid(unsafe_code)]

//! Popup configuration as rendered onto the popup element.
//!
//! The block's save step writes a handful of attributes onto a `<dialog>`;
//! this module is the only place that reads them.
//!
//! | Attribute | Values | Default |
//! |---|---|---|
//! | `data-trigger` | `click`, `exit`, `load` | `click` |
//! | `data-expiry` | days (integer) | caller supplied (7) |
//! | `closedby` | `any`, `closerequest`, `none` | from `data-dismissible`, else `any` |
//! | `data-dismissible` | `true`, `false` (older markup) | `true` |
//! | `data-dismiss-on-submit` | `true`, `false` | `false` |
//! | class `is-style-anchored` | anchoring at `bottom` | off |
//! | class `has-anchor-position-<pos>` | anchoring at `<pos>` | off |
//!
//! Parsing never fails: a missing or malformed attribute yields its default.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::event::NodeId;
use crate::host::Document;

/// Attributes read from a popup element.
pub const POPUP_ATTRIBUTES: &[&str] = &[
    "id",
    "data-trigger",
    "data-expiry",
    "closedby",
    "data-dismissible",
    "data-dismiss-on-submit",
];

/// Class enabling anchoring with the default position.
pub const ANCHORED_STYLE_CLASS: &str = "is-style-anchored";

/// Class prefix selecting an anchor position.
pub const ANCHOR_POSITION_PREFIX: &str = "has-anchor-position-";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable identifier of a popup on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(String);

impl PopupId {
    /// Wrap an identifier as-is.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Resolve from the element `id`, falling back to `fallback` when the
    /// attribute is missing or blank.
    #[must_use]
    pub fn resolve(raw: Option<&str>, fallback: &str) -> Self {
        match raw.map(str::trim) {
            Some(id) if !id.is_empty() => Self(id.to_owned()),
            _ => Self(fallback.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fragment after the last `#` of a link reference, if non-empty.
#[must_use]
pub fn fragment_of(reference: &str) -> Option<&str> {
    reference
        .trim()
        .rsplit_once('#')
        .map(|(_, fragment)| fragment)
        .filter(|fragment| !fragment.is_empty())
}

// ---------------------------------------------------------------------------
// Trigger mode
// ---------------------------------------------------------------------------

/// What causes a popup to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriggerMode {
    /// Opened by clicking a link or button that references the popup.
    #[default]
    Click,
    /// Opened when the pointer leaves through the top of the viewport.
    Exit,
    /// Opened as soon as the page is ready.
    Load,
}

impl TriggerMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Exit => "exit",
            Self::Load => "load",
        }
    }
}

impl FromStr for TriggerMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "click" => Ok(Self::Click),
            "exit" => Ok(Self::Exit),
            "load" => Ok(Self::Load),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Close permission
// ---------------------------------------------------------------------------

/// Native `closedby` permission of a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClosedBy {
    /// Backdrop click, Escape and programmatic close.
    Any,
    /// Escape and programmatic close.
    CloseRequest,
    /// Programmatic close only.
    None,
}

impl ClosedBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::CloseRequest => "closerequest",
            Self::None => "none",
        }
    }

    /// Map the authored "dismissible" flag.
    #[must_use]
    pub const fn from_dismissible(dismissible: bool) -> Self {
        if dismissible { Self::Any } else { Self::None }
    }

    #[must_use]
    pub const fn allows_backdrop(self) -> bool {
        matches!(self, Self::Any)
    }

    #[must_use]
    pub const fn allows_escape(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for ClosedBy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "closerequest" => Ok(Self::CloseRequest),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Anchoring
// ---------------------------------------------------------------------------

/// Where an anchored popup sits relative to its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnchorPosition {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
    /// Above or below, whichever side of the viewport has more room.
    Auto,
}

impl AnchorPosition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
            Self::Auto => "auto",
        }
    }
}

impl FromStr for AnchorPosition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "auto" => Ok(Self::Auto),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchorConfig {
    pub position: AnchorPosition,
}

// ---------------------------------------------------------------------------
// Snapshot + config
// ---------------------------------------------------------------------------

/// The attributes and class tokens of one element, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
}

impl ElementSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the popup attributes of `node` from a document.
    #[must_use]
    pub fn capture<D: Document + ?Sized>(doc: &D, node: NodeId) -> Self {
        let attributes = POPUP_ATTRIBUTES
            .iter()
            .filter_map(|name| {
                doc.attribute(node, name)
                    .map(|value| ((*name).to_owned(), value))
            })
            .collect();
        Self {
            attributes,
            classes: doc.class_tokens(node),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_owned());
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|token| token == class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

/// Authored configuration of one popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupConfig {
    pub trigger: TriggerMode,
    pub expiry_days: u32,
    pub closed_by: ClosedBy,
    /// Whether `closed_by` came from the element's own `closedby` attribute.
    /// When false, the host element needs the attribute written.
    pub closed_by_native: bool,
    pub dismiss_on_submit: bool,
    pub anchor: Option<AnchorConfig>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerMode::Click,
            expiry_days: 7,
            closed_by: ClosedBy::Any,
            closed_by_native: false,
            dismiss_on_submit: false,
            anchor: None,
        }
    }
}

impl PopupConfig {
    /// Read the configuration from an element snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &ElementSnapshot, default_expiry_days: u32) -> Self {
        let trigger = snapshot
            .attribute("data-trigger")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        let expiry_days = snapshot
            .attribute("data-expiry")
            .and_then(parse_days)
            .unwrap_or(default_expiry_days);

        let native = snapshot
            .attribute("closedby")
            .and_then(|raw| raw.parse::<ClosedBy>().ok());
        let closed_by = native.unwrap_or_else(|| {
            let dismissible = snapshot
                .attribute("data-dismissible")
                .is_none_or(|raw| !raw.trim().eq_ignore_ascii_case("false"));
            ClosedBy::from_dismissible(dismissible)
        });

        let dismiss_on_submit = snapshot
            .attribute("data-dismiss-on-submit")
            .is_some_and(|raw| raw.trim().eq_ignore_ascii_case("true"));

        Self {
            trigger,
            expiry_days,
            closed_by,
            closed_by_native: native.is_some(),
            dismiss_on_submit,
            anchor: anchor_from_classes(snapshot),
        }
    }

    /// Whether backdrop clicks and Escape may close the popup.
    #[must_use]
    pub const fn is_dismissible(&self) -> bool {
        self.closed_by.allows_backdrop()
    }
}

/// Leading decimal digits, `parseInt` style. `None` if there are none.
fn parse_days(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    trimmed[..digits].parse().ok()
}

fn anchor_from_classes(snapshot: &ElementSnapshot) -> Option<AnchorConfig> {
    let explicit = snapshot
        .classes()
        .filter_map(|class| class.strip_prefix(ANCHOR_POSITION_PREFIX))
        .find_map(|position| position.parse::<AnchorPosition>().ok());

    match explicit {
        Some(position) => Some(AnchorConfig { position }),
        None if snapshot.has_class(ANCHORED_STYLE_CLASS) => Some(AnchorConfig::default()),
        None => None,
    }
}

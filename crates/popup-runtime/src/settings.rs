#![forbid(unsafe_code)]

//! Runtime settings.
//!
//! Every selector, class name, storage key and timing constant the runtime
//! uses lives here, so a theme that renames the block class or wants a
//! shorter exit-intent settle delay can change it in one place.
//!
//! With the `settings-json` feature, overrides can be loaded from JSON:
//!
//! ```ignore
//! let settings = RuntimeSettings::from_json_str(r#"{ "exit_settle_delay_ms": 1500 }"#)?;
//! assert_eq!(settings.exit_settle_delay(), Duration::from_millis(1500));
//! ```
//!
//! Fields missing from the JSON keep their defaults.

use std::fmt;
use std::time::Duration;

use popup_core::PopupId;

/// Failure to load or validate [`RuntimeSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Input was not valid settings JSON.
    Parse(String),
    /// A field held a value the runtime cannot use.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "invalid settings: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid setting `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Tunables for selectors, classes, storage keys and timing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "settings-json", derive(serde::Deserialize))]
#[cfg_attr(feature = "settings-json", serde(default, deny_unknown_fields))]
pub struct RuntimeSettings {
    /// Class identifying popup elements.
    pub popup_class: String,
    /// Class placed on the document root while any popup is open.
    pub modal_open_class: String,
    /// Class marking an element as a close affordance.
    pub close_class: String,
    /// Link fragment marking an element as a close affordance.
    pub close_fragment: String,
    /// Identifier used for popups without an `id`.
    pub default_popup_id: String,
    /// Expiry window when `data-expiry` is missing.
    pub default_expiry_days: u32,
    /// Wait between bootstrap and arming the exit-intent listener.
    pub exit_settle_delay_ms: u64,
    /// A pointer leaving above this many pixels from the top counts as exit intent.
    pub exit_threshold_px: f64,
    /// Page-global storage key for the exit-intent record.
    pub exit_storage_key: String,
    /// Per-popup storage key prefix for the load record.
    pub load_storage_prefix: String,
    /// Class added to a popup opened with anchoring.
    pub anchored_class: String,
    /// Attribute recording the resolved anchor position.
    pub anchor_position_attribute: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            popup_class: "wp-block-hm-popup".into(),
            modal_open_class: "has-modal-open".into(),
            close_class: "hm-popup-close".into(),
            close_fragment: "close".into(),
            default_popup_id: "open-popup".into(),
            default_expiry_days: 7,
            exit_settle_delay_ms: 3_000,
            exit_threshold_px: 10.0,
            exit_storage_key: "exitIntentShown".into(),
            load_storage_prefix: "popupShown-".into(),
            anchored_class: "is-anchored".into(),
            anchor_position_attribute: "data-anchor-position-active".into(),
        }
    }
}

impl RuntimeSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overrides from JSON and validate the result.
    #[cfg(feature = "settings-json")]
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|err| SettingsError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make discovery or detection meaningless.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.popup_class.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "popup_class",
                reason: "must not be empty",
            });
        }
        if self.modal_open_class.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "modal_open_class",
                reason: "must not be empty",
            });
        }
        if self.default_popup_id.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "default_popup_id",
                reason: "must not be empty",
            });
        }
        if !self.exit_threshold_px.is_finite() || self.exit_threshold_px < 0.0 {
            return Err(SettingsError::Invalid {
                field: "exit_threshold_px",
                reason: "must be a finite, non-negative number",
            });
        }
        if self.exit_storage_key.is_empty() {
            return Err(SettingsError::Invalid {
                field: "exit_storage_key",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn exit_settle_delay(&self) -> Duration {
        Duration::from_millis(self.exit_settle_delay_ms)
    }

    /// Storage key of the load-trigger record for `popup`.
    #[must_use]
    pub fn load_storage_key(&self, popup: &PopupId) -> String {
        format!("{}{}", self.load_storage_prefix, popup)
    }

    /// Whether a link reference is a close affordance (`…#close`).
    #[must_use]
    pub fn is_close_reference(&self, reference: &str) -> bool {
        popup_core::config::fragment_of(reference) == Some(self.close_fragment.as_str())
    }

    // --- Builder ---

    #[must_use]
    pub fn popup_class(mut self, class: impl Into<String>) -> Self {
        self.popup_class = class.into();
        self
    }

    #[must_use]
    pub fn close_class(mut self, class: impl Into<String>) -> Self {
        self.close_class = class.into();
        self
    }

    #[must_use]
    pub fn default_expiry_days(mut self, days: u32) -> Self {
        self.default_expiry_days = days;
        self
    }

    #[must_use]
    pub fn exit_settle_delay_ms(mut self, delay_ms: u64) -> Self {
        self.exit_settle_delay_ms = delay_ms;
        self
    }

    #[must_use]
    pub fn exit_threshold_px(mut self, threshold: f64) -> Self {
        self.exit_threshold_px = threshold;
        self
    }

    #[must_use]
    pub fn exit_storage_key(mut self, key: impl Into<String>) -> Self {
        self.exit_storage_key = key.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.exit_settle_delay(), Duration::from_secs(3));
        assert_eq!(settings.default_expiry_days, 7);
    }

    #[test]
    fn load_key_is_per_popup() {
        let settings = RuntimeSettings::default();
        let key = settings.load_storage_key(&PopupId::resolve(Some("promo"), "open-popup"));
        assert_eq!(key, "popupShown-promo");
    }

    #[test]
    fn close_reference_matching() {
        let settings = RuntimeSettings::default();
        assert!(settings.is_close_reference("#close"));
        assert!(settings.is_close_reference("/about#close"));
        assert!(!settings.is_close_reference("#closed"));
        assert!(!settings.is_close_reference("close"));
    }

    #[test]
    fn builder_and_validation() {
        let settings = RuntimeSettings::new()
            .exit_settle_delay_ms(500)
            .exit_threshold_px(f64::NAN);
        assert_eq!(settings.exit_settle_delay(), Duration::from_millis(500));
        assert_eq!(
            settings.validate(),
            Err(SettingsError::Invalid {
                field: "exit_threshold_px",
                reason: "must be a finite, non-negative number",
            })
        );

        let blank = RuntimeSettings::new().popup_class("  ");
        assert!(blank.validate().is_err());
    }

    #[cfg(feature = "settings-json")]
    #[test]
    fn json_overrides_keep_defaults() {
        let settings =
            RuntimeSettings::from_json_str(r#"{ "exit_settle_delay_ms": 1500, "close_class": "x-close" }"#)
                .unwrap();
        assert_eq!(settings.exit_settle_delay_ms, 1500);
        assert_eq!(settings.close_class, "x-close");
        assert_eq!(settings.popup_class, "wp-block-hm-popup");

        assert!(matches!(
            RuntimeSettings::from_json_str(r#"{ "nope": 1 }"#),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            RuntimeSettings::from_json_str(r#"{ "popup_class": "" }"#),
            Err(SettingsError::Invalid { field: "popup_class", .. })
        ));
    }
}

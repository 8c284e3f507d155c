//! User settings and the merge that keeps them fully populated.
//!
//! Partial objects from the server or the local cache are overlaid one level
//! deep onto a complete base. A value is taken only if the result still
//! decodes as [`UserSettings`], so wrongly typed or unknown entries are
//! dropped rather than failing the whole merge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::SummarizeOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizationPreferences {
    pub length: String,
    pub style: String,
    pub include_key_points: bool,
    pub include_citations: bool,
}

impl Default for SummarizationPreferences {
    fn default() -> Self {
        Self {
            length: "medium".to_string(),
            style: "academic".to_string(),
            include_key_points: true,
            include_citations: true,
        }
    }
}

impl From<&SummarizationPreferences> for SummarizeOptions {
    fn from(prefs: &SummarizationPreferences) -> Self {
        SummarizeOptions {
            length: prefs.length.clone(),
            style: prefs.style.clone(),
            include_key_points: prefs.include_key_points,
            include_citations: prefs.include_citations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email: bool,
    pub browser: bool,
    pub completion_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            browser: true,
            completion_alerts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPreferences {
    pub show_sidebar: bool,
    pub compact_view: bool,
    pub show_metadata: bool,
    pub show_visualizations: bool,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            show_sidebar: true,
            compact_view: false,
            show_metadata: true,
            show_visualizations: true,
        }
    }
}

/// Keyboard shortcuts; `custom` maps an action name to a key binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcuts {
    pub enabled: bool,
    pub custom: BTreeMap<String, String>,
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            enabled: true,
            custom: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub theme: String,
    pub font_size: String,
    pub summarization_preferences: SummarizationPreferences,
    pub notification_preferences: NotificationSettings,
    pub display_preferences: DisplayPreferences,
    pub shortcuts: Shortcuts,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            font_size: "medium".to_string(),
            summarization_preferences: SummarizationPreferences::default(),
            notification_preferences: NotificationSettings::default(),
            display_preferences: DisplayPreferences::default(),
            shortcuts: Shortcuts::default(),
        }
    }
}

impl UserSettings {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Overlay `partial` onto the defaults.
pub fn merge_with_defaults(partial: &Value) -> UserSettings {
    merge_settings(&UserSettings::default(), partial)
}

/// Overlay `partial` onto `base`.
///
/// Top-level primitives replace the base value; top-level objects are merged
/// key by key. `shortcuts.custom` is merged per binding, later values winning.
pub fn merge_settings(base: &UserSettings, partial: &Value) -> UserSettings {
    let Some(partial) = partial.as_object() else {
        return base.clone();
    };
    let mut merged = base.to_value();

    for (key, value) in partial {
        let section_is_object = merged.get(key).map(Value::is_object);
        match (section_is_object, value) {
            (None, _) => debug!("settings: ignoring unknown key {}", key),
            (Some(true), Value::Object(entries)) => {
                for (sub_key, sub_value) in entries {
                    if key == "shortcuts" && sub_key == "custom" {
                        merge_custom(&mut merged, sub_value);
                    } else {
                        try_set(&mut merged, &[key.as_str(), sub_key.as_str()], sub_value);
                    }
                }
            }
            (Some(true), _) => debug!("settings: ignoring non-object value for {}", key),
            (Some(false), _) => {
                try_set(&mut merged, &[key.as_str()], value);
            }
        }
    }

    serde_json::from_value(merged).unwrap_or_else(|_| base.clone())
}

fn merge_custom(merged: &mut Value, custom: &Value) {
    let Some(bindings) = custom.as_object() else {
        return;
    };
    for (action, binding) in bindings {
        try_set(merged, &["shortcuts", "custom", action.as_str()], binding);
    }
}

/// Set `path` to `value` if the whole object still decodes afterwards.
fn try_set(merged: &mut Value, path: &[&str], value: &Value) -> bool {
    let mut candidate = merged.clone();
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut slot = &mut candidate;
    for part in parents {
        match slot.as_object_mut().and_then(|obj| obj.get_mut(*part)) {
            Some(next) => slot = next,
            None => return false,
        }
    }
    let Some(obj) = slot.as_object_mut() else {
        return false;
    };
    obj.insert(last.to_string(), value.clone());

    if serde_json::from_value::<UserSettings>(candidate.clone()).is_ok() {
        *merged = candidate;
        true
    } else {
        debug!("settings: ignoring ill-typed value at {}", path.join("."));
        false
    }
}

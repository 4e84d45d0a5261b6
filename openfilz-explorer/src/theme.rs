use crate::prefs::{PreferenceError, PreferenceStore, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub display_name: &'static str,
    pub class_name: &'static str,
}

pub const AVAILABLE_THEMES: [Theme; 4] = [
    Theme {
        name: "light",
        display_name: "Light (Default)",
        class_name: "theme-light",
    },
    Theme {
        name: "dark",
        display_name: "Dark",
        class_name: "theme-dark",
    },
    Theme {
        name: "ocean",
        display_name: "Ocean",
        class_name: "theme-ocean",
    },
    Theme {
        name: "forest",
        display_name: "Forest",
        class_name: "theme-forest",
    },
];

pub fn default_theme() -> &'static Theme {
    &AVAILABLE_THEMES[0]
}

pub fn find_theme(name: &str) -> Option<&'static Theme> {
    AVAILABLE_THEMES.iter().find(|theme| theme.name == name)
}

/// Saved theme, or the default when nothing valid is stored.
pub fn current_theme(store: &PreferenceStore) -> &'static Theme {
    store
        .get(THEME_KEY)
        .and_then(find_theme)
        .unwrap_or_else(default_theme)
}

/// Persists `name` if it is a known theme. Unknown names leave the stored value untouched.
pub fn set_theme(
    store: &mut PreferenceStore,
    name: &str,
) -> Result<Option<&'static Theme>, PreferenceError> {
    let Some(theme) = find_theme(name) else {
        return Ok(None);
    };
    store.set(THEME_KEY, theme.name)?;
    Ok(Some(theme))
}

use irodori_core::PREVIEW_PATH;

/// Delay before a submit button is given back after a native form submit.
pub const SUBMIT_RESTORE_MS: u32 = 3_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiConfig {
    pub preview_url: String,
    pub submit_restore_ms: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            preview_url: PREVIEW_PATH.to_string(),
            submit_restore_ms: SUBMIT_RESTORE_MS,
        }
    }
}

pub fn load_ui_config() -> UiConfig {
    let mut config = UiConfig::default();
    if let Some(url) = preview_url_override() {
        config.preview_url = url;
    }
    config
}

fn preview_url_override() -> Option<String> {
    let raw = option_env!("IRODORI_PREVIEW_URL")
        .or(option_env!("TRUNK_PUBLIC_IRODORI_PREVIEW_URL"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

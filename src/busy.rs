use wasm_bindgen::JsValue;
use web_sys::{Document, HtmlButtonElement};

pub const SPINNER_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20" viewBox="0 0 24 24" "#,
    r#"fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" "#,
    r#"stroke-linejoin="round" class="spinner">"#,
    r#"<line x1="12" y1="2" x2="12" y2="6"></line>"#,
    r#"<line x1="12" y1="18" x2="12" y2="22"></line>"#,
    r#"<line x1="4.93" y1="4.93" x2="7.76" y2="7.76"></line>"#,
    r#"<line x1="16.24" y1="16.24" x2="19.07" y2="19.07"></line>"#,
    r#"<line x1="2" y1="12" x2="6" y2="12"></line>"#,
    r#"<line x1="18" y1="12" x2="22" y2="12"></line>"#,
    r#"<line x1="4.93" y1="19.07" x2="7.76" y2="16.24"></line>"#,
    r#"<line x1="16.24" y1="7.76" x2="19.07" y2="4.93"></line>"#,
    "</svg>",
);

pub const ANALYZING_LABEL: &str = "分析中...";
pub const CONVERTING_LABEL: &str = "转换中...";

const SPINNER_STYLE_ID: &str = "irodori-spinner-style";
const SPINNER_STYLE: &str = r#"
    @keyframes spin {
        to { transform: rotate(360deg); }
    }
    .spinner {
        animation: spin 1s linear infinite;
    }
"#;

/// Holds a button in its busy state. Dropping the guard puts the original
/// label back and re-enables the button.
pub struct BusyGuard {
    button: HtmlButtonElement,
    original_html: String,
}

impl BusyGuard {
    pub fn engage(button: &HtmlButtonElement, label: &str) -> Self {
        let original_html = button.inner_html();
        button.set_inner_html(&format!("{SPINNER_SVG} {label}"));
        button.set_disabled(true);
        Self {
            button: button.clone(),
            original_html,
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.button.set_inner_html(&self.original_html);
        self.button.set_disabled(false);
    }
}

/// Appends the spinner keyframes to `<head>` unless they are already there.
pub fn install_spinner_style(document: &Document) -> Result<(), JsValue> {
    if document.get_element_by_id(SPINNER_STYLE_ID).is_some() {
        return Ok(());
    }
    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("document has no head"))?;
    let style = document.create_element("style")?;
    style.set_id(SPINNER_STYLE_ID);
    style.set_text_content(Some(SPINNER_STYLE));
    head.append_child(&style)?;
    Ok(())
}

use wasm_bindgen::JsValue;
use web_sys::{Document, Element, UrlSearchParams, Window};

pub const FLASH_CONTAINER_ID: &str = "flashMessages";
const ERROR_PARAM: &str = "error";

/// Shows an `?error=` message left by a failed conversion redirect and
/// strips it from the address bar.
pub fn show_query_error(document: &Document) -> Option<String> {
    let window = web_sys::window()?;
    let search = window.location().search().ok()?;
    let message = error_from_search(&search)?;
    if let Some(container) = document.get_element_by_id(FLASH_CONTAINER_ID) {
        if let Err(err) = render_flash(document, &container, &message) {
            gloo::console::warn!("failed to render flash message", err);
        }
    }
    clear_location_query(&window);
    Some(message)
}

pub fn error_from_search(search: &str) -> Option<String> {
    let search = search.trim();
    if search.is_empty() {
        return None;
    }
    let params = UrlSearchParams::new_with_str(search).ok()?;
    let message = params.get(ERROR_PARAM)?;
    let message = message.trim();
    if message.is_empty() {
        return None;
    }
    Some(message.to_string())
}

pub fn render_flash(document: &Document, container: &Element, message: &str) -> Result<(), JsValue> {
    let flash = document.create_element("div")?;
    flash.set_class_name("flash flash-error");
    flash.set_text_content(Some(message));
    container.append_child(&flash)?;
    Ok(())
}

fn clear_location_query(window: &Window) {
    let location = window.location();
    let path = location.pathname().unwrap_or_default();
    let hash = location.hash().unwrap_or_default();
    let new_url = format!("{path}{hash}");
    if let Ok(history) = window.history() {
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&new_url));
    }
}

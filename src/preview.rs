use futures_util::future::LocalBoxFuture;
use gloo::net::http::Request;
use irodori_core::{ColorSwatch, PreviewResponse, FIELD_FILE, FIELD_N_COLORS};
use wasm_bindgen::JsValue;
use web_sys::{Document, File, FormData, HtmlElement};

use crate::view::js_err;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("{0}")]
    Form(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Decode(String),
}

pub type PreviewFuture = LocalBoxFuture<'static, Result<PreviewResponse, PreviewError>>;

/// Sends a multipart preview payload and decodes the JSON reply.
pub trait PreviewClient {
    fn send(&self, form: FormData) -> PreviewFuture;
}

#[derive(Clone, Debug)]
pub struct FetchPreviewClient {
    url: String,
}

impl FetchPreviewClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PreviewClient for FetchPreviewClient {
    fn send(&self, form: FormData) -> PreviewFuture {
        let url = self.url.clone();
        Box::pin(async move {
            let request = Request::post(&url)
                .body(form)
                .map_err(|err| PreviewError::Form(err.to_string()))?;
            let response = request
                .send()
                .await
                .map_err(|err| PreviewError::Transport(err.to_string()))?;
            // Error replies carry a JSON body too, so the status is not checked.
            response
                .json::<PreviewResponse>()
                .await
                .map_err(|err| PreviewError::Decode(err.to_string()))
        })
    }
}

pub fn build_preview_form(file: &File, n_colors: &str) -> Result<FormData, PreviewError> {
    let to_form_err = |err: JsValue| PreviewError::Form(js_err(err));
    let form = FormData::new().map_err(to_form_err)?;
    form.append_with_blob(FIELD_FILE, file).map_err(to_form_err)?;
    form.append_with_str(FIELD_N_COLORS, n_colors).map_err(to_form_err)?;
    Ok(form)
}

/// Replaces the grid contents with one `.color-item` per swatch, in order.
pub fn render_colors(
    document: &Document,
    grid: &HtmlElement,
    colors: &[ColorSwatch],
) -> Result<(), JsValue> {
    grid.set_text_content(None);
    for (index, color) in colors.iter().enumerate() {
        let item = document.create_element("div")?;
        item.set_class_name("color-item");

        let swatch = document.create_element("div")?;
        swatch.set_class_name("color-box");
        swatch.set_attribute("style", &format!("background-color: {};", color.hex))?;

        let info = document.create_element("div")?;
        info.set_class_name("color-info");
        let title = document.create_element("strong")?;
        title.set_text_content(Some(&format!("颜色 {}", index + 1)));
        let hex = document.create_element("span")?;
        hex.set_text_content(Some(&color.hex));
        let rgb = document.create_element("span")?;
        rgb.set_text_content(Some(&color.rgb));
        info.append_child(&title)?;
        info.append_child(&hex)?;
        info.append_child(&rgb)?;

        item.append_child(&swatch)?;
        item.append_child(&info)?;
        grid.append_child(&item)?;
    }
    Ok(())
}

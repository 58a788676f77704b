use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, File, HtmlButtonElement, HtmlElement, HtmlFormElement, HtmlImageElement,
    HtmlInputElement,
};

pub const ID_FILE: &str = "file";
pub const ID_DROP_AREA: &str = "dropArea";
pub const ID_FILE_PREVIEW: &str = "filePreview";
pub const ID_PREVIEW_IMAGE: &str = "previewImage";
pub const ID_FILE_NAME: &str = "fileName";
pub const ID_N_COLORS: &str = "n_colors";
pub const ID_COLOR_VALUE: &str = "colorValue";
pub const ID_PREVIEW_BTN: &str = "previewBtn";
pub const ID_UPLOAD_FORM: &str = "uploadForm";
pub const ID_COLOR_PREVIEW: &str = "colorPreview";
pub const ID_COLOR_GRID: &str = "colorGrid";

pub const SUBMIT_BUTTON_SELECTOR: &str = ".btn-primary";
const SUBMIT_BUTTON_LABEL: &str = "uploadForm .btn-primary";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("required element #{id} is missing")]
    Missing { id: &'static str },
    #[error("element #{id} is not a {expected}")]
    WrongType {
        id: &'static str,
        expected: &'static str,
    },
}

/// Every element the upload page needs, resolved and type-checked once.
#[derive(Clone)]
pub struct UploadView {
    pub document: Document,
    pub file_input: HtmlInputElement,
    pub drop_area: HtmlElement,
    pub file_preview: HtmlElement,
    pub preview_image: HtmlImageElement,
    pub file_name: HtmlElement,
    pub color_slider: HtmlInputElement,
    pub color_value: HtmlElement,
    pub preview_button: HtmlButtonElement,
    pub upload_form: HtmlFormElement,
    pub submit_button: HtmlButtonElement,
    pub color_preview: HtmlElement,
    pub color_grid: HtmlElement,
}

impl UploadView {
    pub fn resolve(document: &Document) -> Result<Self, ViewError> {
        let upload_form: HtmlFormElement = lookup(document, ID_UPLOAD_FORM, "form")?;
        let submit_button = upload_form
            .query_selector(SUBMIT_BUTTON_SELECTOR)
            .ok()
            .flatten()
            .ok_or(ViewError::Missing {
                id: SUBMIT_BUTTON_LABEL,
            })?
            .dyn_into::<HtmlButtonElement>()
            .map_err(|_| ViewError::WrongType {
                id: SUBMIT_BUTTON_LABEL,
                expected: "button",
            })?;

        Ok(Self {
            document: document.clone(),
            file_input: lookup(document, ID_FILE, "input")?,
            drop_area: lookup(document, ID_DROP_AREA, "html element")?,
            file_preview: lookup(document, ID_FILE_PREVIEW, "html element")?,
            preview_image: lookup(document, ID_PREVIEW_IMAGE, "img")?,
            file_name: lookup(document, ID_FILE_NAME, "html element")?,
            color_slider: lookup(document, ID_N_COLORS, "input")?,
            color_value: lookup(document, ID_COLOR_VALUE, "html element")?,
            preview_button: lookup(document, ID_PREVIEW_BTN, "button")?,
            upload_form,
            submit_button,
            color_preview: lookup(document, ID_COLOR_PREVIEW, "html element")?,
            color_grid: lookup(document, ID_COLOR_GRID, "html element")?,
        })
    }

    pub fn selected_file(&self) -> Option<File> {
        self.file_input.files().and_then(|files| files.get(0))
    }
}

fn lookup<T: JsCast>(
    document: &Document,
    id: &'static str,
    expected: &'static str,
) -> Result<T, ViewError> {
    document
        .get_element_by_id(id)
        .ok_or(ViewError::Missing { id })?
        .dyn_into::<T>()
        .map_err(|_| ViewError::WrongType { id, expected })
}

pub(crate) fn set_display(element: &HtmlElement, value: &str) {
    let _ = element.style().set_property("display", value);
}

pub(crate) fn js_err(error: JsValue) -> String {
    if let Some(value) = error.as_string() {
        return value;
    }
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    if let Ok(json) = js_sys::JSON::stringify(&error) {
        if let Some(value) = json.as_string() {
            return value;
        }
    }
    "js error".to_string()
}

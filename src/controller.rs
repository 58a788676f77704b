use std::cell::Cell;
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use irodori_core::PreviewResponse;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Event, File, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
};

use crate::busy::{BusyGuard, ANALYZING_LABEL, CONVERTING_LABEL};
use crate::config::UiConfig;
use crate::intake::{dropped_files, read_data_url, DragPhase, DRAGOVER_CLASS, DRAG_EVENTS};
use crate::notify::Notifier;
use crate::preview::{build_preview_form, render_colors, PreviewClient, PreviewError};
use crate::submit::SubmitRestore;
use crate::view::{js_err, set_display, UploadView, ViewError};

pub const MSG_SELECT_FILE_FIRST: &str = "请先选择一个图片文件";
const ERROR_PREFIX: &str = "错误: ";
const PREVIEW_FAILED_PREFIX: &str = "预览失败: ";

struct Inner {
    view: UploadView,
    config: UiConfig,
    client: Rc<dyn PreviewClient>,
    notifier: Rc<dyn Notifier>,
    /// Bumped on every handled file; a data URL is only shown if its file is
    /// still the latest one.
    selection: Cell<u64>,
    /// Bumped on every preview request and every new file; only the latest
    /// request may render.
    request: Cell<u64>,
    submit: SubmitRestore,
}

fn bump(token: &Cell<u64>) -> u64 {
    let next = token.get().wrapping_add(1);
    token.set(next);
    next
}

/// Event wiring for the upload page. Dropping the controller unbinds every
/// listener it registered.
pub struct UploadController {
    inner: Rc<Inner>,
    _listeners: Vec<EventListener>,
}

impl UploadController {
    pub fn mount(
        document: &Document,
        config: UiConfig,
        client: Rc<dyn PreviewClient>,
        notifier: Rc<dyn Notifier>,
    ) -> Result<Self, ViewError> {
        let view = UploadView::resolve(document)?;
        let inner = Rc::new(Inner {
            view,
            config,
            client,
            notifier,
            selection: Cell::new(0),
            request: Cell::new(0),
            submit: SubmitRestore::default(),
        });

        let mut listeners = Vec::new();
        listeners.push(bind_color_slider(&inner));
        listeners.push(bind_file_input(&inner));
        listeners.extend(bind_drop_area(&inner));
        listeners.push(bind_preview_button(&inner));
        listeners.push(bind_form_submit(&inner));

        Ok(Self {
            inner,
            _listeners: listeners,
        })
    }

    pub fn view(&self) -> &UploadView {
        &self.inner.view
    }

    pub fn submit_restore_pending(&self) -> bool {
        self.inner.submit.is_pending()
    }
}

fn bind_color_slider(inner: &Rc<Inner>) -> EventListener {
    let slider = inner.view.color_slider.clone();
    let label = inner.view.color_value.clone();
    EventListener::new(&inner.view.color_slider, "input", move |_event| {
        label.set_text_content(Some(&slider.value()));
    })
}

fn bind_file_input(inner: &Rc<Inner>) -> EventListener {
    let handler = inner.clone();
    EventListener::new(&inner.view.file_input, "change", move |_event| {
        handle_file(&handler, handler.view.selected_file());
    })
}

fn bind_drop_area(inner: &Rc<Inner>) -> Vec<EventListener> {
    DRAG_EVENTS
        .iter()
        .map(|kind| {
            let handler = inner.clone();
            EventListener::new_with_options(
                &inner.view.drop_area,
                *kind,
                EventListenerOptions::enable_prevent_default(),
                move |event| handle_drag(&handler, event),
            )
        })
        .collect()
}

fn bind_preview_button(inner: &Rc<Inner>) -> EventListener {
    let handler = inner.clone();
    EventListener::new_with_options(
        &inner.view.preview_button,
        "click",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            event.prevent_default();
            start_preview(&handler);
        },
    )
}

fn bind_form_submit(inner: &Rc<Inner>) -> EventListener {
    let handler = inner.clone();
    EventListener::new(&inner.view.upload_form, "submit", move |_event| {
        handler.submit.arm(
            &handler.view.submit_button,
            CONVERTING_LABEL,
            handler.config.submit_restore_ms,
        );
    })
}

fn handle_drag(inner: &Rc<Inner>, event: &Event) {
    event.prevent_default();
    event.stop_propagation();
    let Some(phase) = DragPhase::from_event_type(&event.type_()) else {
        return;
    };
    let classes = inner.view.drop_area.class_list();
    let _ = if phase.highlights() {
        classes.add_1(DRAGOVER_CLASS)
    } else {
        classes.remove_1(DRAGOVER_CLASS)
    };
    if phase != DragPhase::Dropped {
        return;
    }
    let Some(files) = dropped_files(event) else {
        return;
    };
    // Keep the input in sync so a native submit carries the dropped file.
    inner.view.file_input.set_files(Some(&files));
    handle_file(inner, files.get(0));
}

fn handle_file(inner: &Rc<Inner>, file: Option<File>) {
    let Some(file) = file else {
        return;
    };
    inner.view.file_name.set_text_content(Some(&file.name()));
    set_display(&inner.view.color_preview, "none");
    let selection = bump(&inner.selection);
    bump(&inner.request);

    let task = inner.clone();
    spawn_local(async move {
        let result = read_data_url(&file).await;
        if task.selection.get() != selection {
            return;
        }
        if let Err(err) = &result {
            gloo::console::warn!("failed to read selected file", file.name(), err);
        }
        show_data_url(&task.view, result.as_deref());
    });
}

/// The preview image only ever shows the current file; when it cannot be
/// read the previous image is cleared rather than left next to the new name.
pub(crate) fn show_data_url(view: &UploadView, result: Result<&str, &String>) {
    match result {
        Ok(url) => {
            view.preview_image.set_src(url);
            set_display(&view.file_preview, "block");
        }
        Err(_) => {
            let _ = view.preview_image.remove_attribute("src");
            set_display(&view.file_preview, "none");
        }
    }
}

fn start_preview(inner: &Rc<Inner>) {
    let Some(file) = inner.view.selected_file() else {
        inner.notifier.alert(MSG_SELECT_FILE_FIRST);
        return;
    };

    let guard = BusyGuard::engage(&inner.view.preview_button, ANALYZING_LABEL);
    let token = bump(&inner.request);
    let form = match build_preview_form(&file, &inner.view.color_slider.value()) {
        Ok(form) => form,
        Err(err) => {
            inner.notifier.alert(&format!("{PREVIEW_FAILED_PREFIX}{err}"));
            return;
        }
    };
    let pending = inner.client.send(form);

    let task = inner.clone();
    spawn_local(async move {
        let _guard = guard;
        let result = pending.await;
        task.finish_preview(token, result);
    });
}

impl Inner {
    fn finish_preview(&self, token: u64, result: Result<PreviewResponse, PreviewError>) {
        let colors = match result {
            Ok(PreviewResponse::Failure { error }) => {
                self.notifier.alert(&format!("{ERROR_PREFIX}{error}"));
                return;
            }
            Ok(PreviewResponse::Palette { colors, .. }) => colors,
            Err(err) => {
                self.notifier.alert(&format!("{PREVIEW_FAILED_PREFIX}{err}"));
                return;
            }
        };
        if self.request.get() != token {
            gloo::console::log!("dropping stale preview response");
            return;
        }
        if let Err(err) = render_colors(&self.view.document, &self.view.color_grid, &colors) {
            let message = js_err(err);
            self.notifier.alert(&format!("{PREVIEW_FAILED_PREFIX}{message}"));
            return;
        }
        set_display(&self.view.color_preview, "block");
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(ScrollBehavior::Smooth);
        options.set_block(ScrollLogicalPosition::Nearest);
        self.view
            .color_preview
            .scroll_into_view_with_scroll_into_view_options(&options);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;
    use web_sys::HtmlElement;

    wasm_bindgen_test_configure!(run_in_browser);

    const FIXTURE: &str = r#"
<form id="uploadForm">
  <div id="dropArea"><input type="file" id="file"></div>
  <div id="filePreview" style="display: none;"><img id="previewImage"><span id="fileName"></span></div>
  <input type="range" id="n_colors" min="2" max="10" value="3"><span id="colorValue">3</span>
  <button type="button" id="previewBtn">预览颜色</button>
  <button type="submit" class="btn-primary">转换</button>
</form>
<div id="colorPreview" style="display: none;"><div id="colorGrid"></div></div>
"#;

    fn with_view(check: impl FnOnce(&UploadView)) {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .expect("document");
        let root = document
            .create_element("div")
            .expect("root")
            .dyn_into::<HtmlElement>()
            .expect("html root");
        root.set_inner_html(FIXTURE);
        document.body().expect("body").append_child(&root).expect("append");
        let view = UploadView::resolve(&document).expect("resolve view");
        check(&view);
        root.remove();
    }

    fn display(element: &HtmlElement) -> String {
        element.style().get_property_value("display").unwrap_or_default()
    }

    #[wasm_bindgen_test]
    fn unreadable_file_clears_previous_image() {
        with_view(|view| {
            show_data_url(view, Ok("data:image/png;base64,AAAA"));
            assert_eq!(display(&view.file_preview), "block");
            assert!(view.preview_image.src().starts_with("data:"));

            let failure = "NotReadableError".to_string();
            show_data_url(view, Err(&failure));
            assert_eq!(display(&view.file_preview), "none");
            assert!(view.preview_image.get_attribute("src").is_none());
        });
    }
}

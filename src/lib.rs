//! Browser front end for the irodori palette tool: file intake with a local
//! preview, the `/preview` palette request, and busy states around native
//! form submission.

mod busy;
mod config;
mod controller;
mod flash;
mod intake;
mod notify;
mod preview;
mod submit;
mod view;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo::events::EventListener;
use web_sys::Document;

pub use busy::{
    install_spinner_style, BusyGuard, ANALYZING_LABEL, CONVERTING_LABEL, SPINNER_SVG,
};
pub use config::{load_ui_config, UiConfig, SUBMIT_RESTORE_MS};
pub use controller::{UploadController, MSG_SELECT_FILE_FIRST};
pub use flash::{error_from_search, render_flash, show_query_error, FLASH_CONTAINER_ID};
pub use notify::{DialogNotifier, Notifier};
pub use preview::{
    build_preview_form, render_colors, FetchPreviewClient, PreviewClient, PreviewError,
    PreviewFuture,
};
pub use view::{UploadView, ViewError};

thread_local! {
    static STARTED: Cell<bool> = Cell::new(false);
    static CONTROLLER: RefCell<Option<UploadController>> = RefCell::new(None);
}

/// Installs the spinner style and, once the DOM is ready, the upload
/// controller. Returns `false` without touching the page on later calls.
pub fn start() -> bool {
    console_error_panic_hook::set_once();
    if STARTED.with(|started| started.replace(true)) {
        return false;
    }
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        gloo::console::error!("irodori: no document to attach to");
        return true;
    };
    if let Err(err) = install_spinner_style(&document) {
        gloo::console::warn!("failed to install spinner style", err);
    }

    if document.ready_state() == "loading" {
        let ready_document = document.clone();
        EventListener::once(&document, "DOMContentLoaded", move |_event| {
            boot(&ready_document);
        })
        .forget();
    } else {
        boot(&document);
    }
    true
}

/// Whether `start` has mounted an upload controller on this page.
pub fn controller_mounted() -> bool {
    CONTROLLER.with(|slot| slot.borrow().is_some())
}

fn boot(document: &Document) {
    show_query_error(document);
    let config = load_ui_config();
    let client = Rc::new(FetchPreviewClient::new(config.preview_url.clone()));
    match UploadController::mount(document, config, client, Rc::new(DialogNotifier)) {
        Ok(controller) => {
            CONTROLLER.with(|slot| *slot.borrow_mut() = Some(controller));
            gloo::console::log!("upload controller ready");
        }
        Err(err) => {
            gloo::console::error!("upload controller failed to start", err.to_string());
        }
    }
}

use wasm_bindgen::JsCast;
use web_sys::{DragEvent, Event, File, FileList};

pub(crate) const DRAG_EVENTS: [&str; 4] = ["dragenter", "dragover", "dragleave", "drop"];
pub(crate) const DRAGOVER_CLASS: &str = "dragover";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DragPhase {
    Over,
    Left,
    Dropped,
}

impl DragPhase {
    pub(crate) fn from_event_type(kind: &str) -> Option<Self> {
        match kind {
            "dragenter" | "dragover" => Some(Self::Over),
            "dragleave" => Some(Self::Left),
            "drop" => Some(Self::Dropped),
            _ => None,
        }
    }

    pub(crate) fn highlights(self) -> bool {
        matches!(self, Self::Over)
    }
}

/// Files carried by a drop event, if it carried any.
pub(crate) fn dropped_files(event: &Event) -> Option<FileList> {
    let files = event.dyn_ref::<DragEvent>()?.data_transfer()?.files()?;
    if files.length() == 0 {
        return None;
    }
    Some(files)
}

pub(crate) async fn read_data_url(file: &File) -> Result<String, String> {
    let blob = gloo::file::File::from(file.clone());
    gloo::file::futures::read_as_data_url(&blob)
        .await
        .map_err(|err| err.to_string())
}

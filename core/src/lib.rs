pub mod codec;
pub mod protocol;
pub mod upload;

pub use codec::{decode, decode_bytes, encode};
pub use protocol::{
    ColorSwatch, PreviewResponse, CONVERT_PATH, FIELD_FILE, FIELD_N_COLORS, PREVIEW_PATH,
};
pub use upload::{
    converted_filename, file_stem, is_allowed_file, secure_filename, ColorCount, ColorCountError,
    DEFAULT_COLOR_COUNT, DEFAULT_MAX_UPLOAD_BYTES, MAX_COLOR_COUNT, MIN_COLOR_COUNT,
};

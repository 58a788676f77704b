use std::fmt;

pub const DEFAULT_COLOR_COUNT: u8 = 3;
pub const MIN_COLOR_COUNT: u8 = 2;
pub const MAX_COLOR_COUNT: u8 = 10;

/// Largest accepted request body, 16 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

pub const MSG_NO_FILE: &str = "没有选择文件";
pub const MSG_UNSUPPORTED: &str = "不支持的文件格式";
pub const MSG_UNSUPPORTED_LONG: &str = "不支持的文件格式，请上传 PNG、JPG、JPEG、GIF 或 BMP 文件";
pub const MSG_TOO_LARGE: &str = "文件过大";
pub const MSG_PROCESS_FAILED: &str = "处理图片时出错";

/// Number of palette colors requested for one conversion.
///
/// Any integer outside `MIN_COLOR_COUNT..=MAX_COLOR_COUNT` falls back to
/// the default instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorCount(u8);

impl ColorCount {
    pub fn new(value: i64) -> Self {
        if (MIN_COLOR_COUNT as i64..=MAX_COLOR_COUNT as i64).contains(&value) {
            Self(value as u8)
        } else {
            Self::default()
        }
    }

    /// Parses the raw `n_colors` form field. A missing field means the
    /// default; text that is not an integer is an error.
    pub fn parse_field(raw: Option<&str>) -> Result<Self, ColorCountError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        let trimmed = raw.trim();
        trimmed
            .parse::<i64>()
            .map(Self::new)
            .map_err(|_| ColorCountError::NotAnInteger {
                raw: raw.to_string(),
            })
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ColorCount {
    fn default() -> Self {
        Self(DEFAULT_COLOR_COUNT)
    }
}

impl fmt::Display for ColorCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorCountError {
    #[error("invalid color count '{raw}'")]
    NotAnInteger { raw: String },
}

pub fn is_allowed_file(filename: &str) -> bool {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// Reduces an uploaded file name to a safe ASCII name: non-ASCII is
/// dropped, path separators and whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is removed, and leading/trailing `.`/`_` are
/// trimmed.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|ch| if ch == '/' || ch == '\\' { ' ' } else { ch })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|ch| ch == '.' || ch == '_').to_string()
}

/// The name without its final extension. Leading dots never start an
/// extension, so `.profile` has no extension.
pub fn file_stem(filename: &str) -> &str {
    let leading = filename.len() - filename.trim_start_matches('.').len();
    match filename[leading..].rfind('.') {
        Some(pos) => &filename[..leading + pos],
        None => filename,
    }
}

/// Attachment name for a converted upload, e.g. `photo_3colors.bmp`.
pub fn converted_filename(original: &str, count: ColorCount) -> String {
    let safe = secure_filename(original);
    let stem = file_stem(&safe);
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}_{count}colors.bmp")
}

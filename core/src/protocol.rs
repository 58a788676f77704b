use serde::{Deserialize, Deserializer, Serialize};

use crate::upload::ColorCount;

/// Multipart field carrying the uploaded image.
pub const FIELD_FILE: &str = "file";
/// Multipart field carrying the requested palette size as a decimal string.
pub const FIELD_N_COLORS: &str = "n_colors";

pub const PREVIEW_PATH: &str = "/preview";
pub const CONVERT_PATH: &str = "/convert";

/// One dominant color as reported by the palette endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSwatch {
    pub rgb: String,
    pub hex: String,
}

impl ColorSwatch {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: format!("RGB({r}, {g}, {b})"),
            hex: format!("#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

/// Body of a `/preview` response.
///
/// Serialized untagged: a failure is `{"error": ...}`, a palette is
/// `{"success": true, "colors": [...], "message": ...}`. When decoding, a
/// non-empty `error` field wins over everything else in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PreviewResponse {
    Failure {
        error: String,
    },
    Palette {
        success: bool,
        colors: Vec<ColorSwatch>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl PreviewResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Success reply; the message names the requested palette size.
    pub fn palette(colors: Vec<ColorSwatch>, requested: ColorCount) -> Self {
        let message = format!("成功提取 {requested} 种主要颜色");
        Self::Palette {
            success: true,
            colors,
            message: Some(message),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Palette { .. } => None,
        }
    }

    pub fn colors(&self) -> &[ColorSwatch] {
        match self {
            Self::Failure { .. } => &[],
            Self::Palette { colors, .. } => colors,
        }
    }
}

#[derive(Deserialize)]
struct RawPreviewResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    colors: Vec<ColorSwatch>,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawPreviewResponse> for PreviewResponse {
    fn from(raw: RawPreviewResponse) -> Self {
        match raw.error {
            Some(error) if !error.is_empty() => Self::Failure { error },
            _ => Self::Palette {
                success: raw.success,
                colors: raw.colors,
                message: raw.message,
            },
        }
    }
}

impl<'de> Deserialize<'de> for PreviewResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawPreviewResponse::deserialize(deserializer).map(Into::into)
    }
}

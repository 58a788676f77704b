use image_pipeline::{ImagePipeline, PaletteConfig, PaletteImage, PipelineError};
use irodori_core::upload::{
    MSG_NO_FILE, MSG_PROCESS_FAILED, MSG_TOO_LARGE, MSG_UNSUPPORTED, MSG_UNSUPPORTED_LONG,
};
use irodori_core::{
    converted_filename, is_allowed_file, ColorCount, PreviewResponse, CONVERT_PATH,
    DEFAULT_MAX_UPLOAD_BYTES, FIELD_FILE, FIELD_N_COLORS, PREVIEW_PATH,
};
use worker::*;

const INDEX_PATH: &str = "/";

#[event(start)]
fn start() {
    console_error_panic_hook::set_once();
}

#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    Router::new()
        .post_async(PREVIEW_PATH, |req, ctx| async move {
            let settings = Settings::from_env(&ctx.env);
            preview(req, &settings).await
        })
        .post_async(CONVERT_PATH, |req, ctx| async move {
            let settings = Settings::from_env(&ctx.env);
            convert(req, &settings).await
        })
        .run(req, env)
        .await
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    max_upload_bytes: u64,
    sample_max_dim: Option<u32>,
}

impl Settings {
    fn from_env(env: &Env) -> Self {
        Self::from_vars(
            read_var(env, "MAX_UPLOAD_BYTES").as_deref(),
            read_var(env, "PALETTE_SAMPLE_MAX_DIM").as_deref(),
        )
    }

    /// Unparsable or zero values fall back to the defaults.
    fn from_vars(max_upload_bytes: Option<&str>, sample_max_dim: Option<&str>) -> Self {
        let max_upload_bytes = max_upload_bytes
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let sample_max_dim = sample_max_dim
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|value| *value > 0);
        Self {
            max_upload_bytes,
            sample_max_dim,
        }
    }

    fn palette_config(&self, count: ColorCount) -> PaletteConfig {
        PaletteConfig {
            sample_max_dim: self.sample_max_dim,
            ..PaletteConfig::with_color_count(count)
        }
    }
}

fn read_var(env: &Env, name: &str) -> Option<String> {
    let raw = env.var(name).ok()?.to_string();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
    n_colors: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    TooLarge,
    NoFile,
    Unsupported,
}

impl Rejection {
    fn status(self) -> u16 {
        match self {
            Rejection::TooLarge => 413,
            Rejection::NoFile | Rejection::Unsupported => 400,
        }
    }

    fn preview_message(self) -> &'static str {
        match self {
            Rejection::TooLarge => MSG_TOO_LARGE,
            Rejection::NoFile => MSG_NO_FILE,
            Rejection::Unsupported => MSG_UNSUPPORTED,
        }
    }

    fn convert_message(self) -> &'static str {
        match self {
            Rejection::TooLarge => MSG_TOO_LARGE,
            Rejection::NoFile => MSG_NO_FILE,
            Rejection::Unsupported => MSG_UNSUPPORTED_LONG,
        }
    }
}

fn check_size(len: Option<u64>, max_upload_bytes: u64) -> std::result::Result<(), Rejection> {
    match len {
        Some(len) if len > max_upload_bytes => Err(Rejection::TooLarge),
        _ => Ok(()),
    }
}

fn check_filename(filename: &str) -> std::result::Result<(), Rejection> {
    if filename.is_empty() {
        return Err(Rejection::NoFile);
    }
    if !is_allowed_file(filename) {
        return Err(Rejection::Unsupported);
    }
    Ok(())
}

enum ProcessFailure {
    ColorCount(String),
    Pipeline(PipelineError),
}

impl ProcessFailure {
    fn message(&self) -> String {
        match self {
            ProcessFailure::ColorCount(message) => message.clone(),
            ProcessFailure::Pipeline(err) => err.to_string(),
        }
    }
}

async fn read_upload(
    mut req: Request,
    settings: &Settings,
) -> Result<std::result::Result<Upload, Rejection>> {
    let declared = req
        .headers()
        .get("Content-Length")?
        .and_then(|raw| raw.trim().parse::<u64>().ok());
    if let Err(rejection) = check_size(declared, settings.max_upload_bytes) {
        return Ok(Err(rejection));
    }

    let Ok(form) = req.form_data().await else {
        return Ok(Err(Rejection::NoFile));
    };
    let file = match form.get(FIELD_FILE) {
        Some(FormEntry::File(file)) => file,
        _ => return Ok(Err(Rejection::NoFile)),
    };
    let filename = file.name();
    if let Err(rejection) = check_filename(&filename) {
        return Ok(Err(rejection));
    }
    let n_colors = match form.get(FIELD_N_COLORS) {
        Some(FormEntry::Field(value)) => Some(value),
        _ => None,
    };
    let bytes = file.bytes().await?;
    if let Err(rejection) = check_size(Some(bytes.len() as u64), settings.max_upload_bytes) {
        return Ok(Err(rejection));
    }
    Ok(Ok(Upload {
        filename,
        bytes,
        n_colors,
    }))
}

fn process(
    upload: &Upload,
    settings: &Settings,
) -> std::result::Result<(ColorCount, PaletteImage), ProcessFailure> {
    let count = ColorCount::parse_field(upload.n_colors.as_deref())
        .map_err(|err| ProcessFailure::ColorCount(err.to_string()))?;
    let pipeline = ImagePipeline::new(settings.palette_config(count));
    let image = pipeline
        .process(&upload.bytes)
        .map_err(ProcessFailure::Pipeline)?;
    Ok((count, image))
}

async fn preview(req: Request, settings: &Settings) -> Result<Response> {
    let upload = match read_upload(req, settings).await? {
        Ok(upload) => upload,
        Err(rejection) => {
            let body = PreviewResponse::failure(rejection.preview_message());
            return json_response(&body, rejection.status());
        }
    };

    let result = process(&upload, settings);
    match &result {
        Ok((count, image)) => console_log!(
            "preview {} colors={} size={}x{}",
            upload.filename,
            count,
            image.width,
            image.height
        ),
        Err(failure) => console_log!(
            "preview failed for {}: {}",
            upload.filename,
            failure.message()
        ),
    }
    let (body, status) = preview_reply(result);
    json_response(&body, status)
}

fn preview_reply(
    result: std::result::Result<(ColorCount, PaletteImage), ProcessFailure>,
) -> (PreviewResponse, u16) {
    match result {
        Ok((count, image)) => (PreviewResponse::palette(image.swatches(), count), 200),
        Err(failure) => (PreviewResponse::failure(failure.message()), 500),
    }
}

async fn convert(req: Request, settings: &Settings) -> Result<Response> {
    let index = index_url(&req)?;
    let upload = match read_upload(req, settings).await? {
        Ok(upload) => upload,
        Err(rejection) => return flash_redirect(index, rejection.convert_message()),
    };

    let bmp = process(&upload, settings).and_then(|(count, image)| {
        let bytes = image.to_bmp().map_err(ProcessFailure::Pipeline)?;
        Ok((count, bytes))
    });
    let (count, bytes) = match bmp {
        Ok(result) => result,
        Err(failure) => {
            let message = failure.message();
            console_log!("convert failed for {}: {}", upload.filename, message);
            return flash_redirect(index, &process_failed_message(&message));
        }
    };

    let download_name = converted_filename(&upload.filename, count);
    console_log!("convert {} -> {}", upload.filename, download_name);
    let headers = Headers::new();
    headers.set("Content-Type", "image/bmp")?;
    headers.set("Content-Disposition", &content_disposition(&download_name))?;
    Ok(Response::from_bytes(bytes)?.with_headers(headers))
}

fn json_response(body: &PreviewResponse, status: u16) -> Result<Response> {
    Ok(Response::from_json(body)?.with_status(status))
}

fn index_url(req: &Request) -> Result<Url> {
    let mut url = req.url()?;
    url.set_path(INDEX_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn process_failed_message(detail: &str) -> String {
    format!("{MSG_PROCESS_FAILED}: {detail}")
}

fn content_disposition(download_name: &str) -> String {
    format!("attachment; filename=\"{download_name}\"")
}

fn flash_url(mut url: Url, message: &str) -> Url {
    url.query_pairs_mut().append_pair("error", message);
    url
}

fn flash_redirect(url: Url, message: &str) -> Result<Response> {
    Response::redirect_with_status(flash_url(url, message), 303)
}


#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn upload(filename: &str, bytes: Vec<u8>, n_colors: Option<&str>) -> Upload {
        Upload {
            filename: filename.to_string(),
            bytes,
            n_colors: n_colors.map(str::to_string),
        }
    }

    fn red_png() -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("png encode");
        out
    }

    fn settings() -> Settings {
        Settings::from_vars(None, None)
    }

    #[test]
    fn settings_fall_back_to_defaults() {
        let defaults = Settings::from_vars(None, None);
        assert_eq!(defaults.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(defaults.sample_max_dim, None);

        let junk = Settings::from_vars(Some("lots"), Some("0"));
        assert_eq!(junk.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(junk.sample_max_dim, None);

        let custom = Settings::from_vars(Some(" 1024 "), Some("256"));
        assert_eq!(custom.max_upload_bytes, 1024);
        assert_eq!(custom.sample_max_dim, Some(256));
        assert_eq!(custom.palette_config(ColorCount::new(4)).sample_max_dim, Some(256));
    }

    #[test]
    fn missing_and_unsupported_files_are_bad_requests() {
        assert_eq!(check_filename(""), Err(Rejection::NoFile));
        assert_eq!(check_filename("notes.txt"), Err(Rejection::Unsupported));
        assert_eq!(check_filename("noextension"), Err(Rejection::Unsupported));
        assert_eq!(check_filename("photo.JPG"), Ok(()));

        assert_eq!(Rejection::NoFile.status(), 400);
        assert_eq!(Rejection::NoFile.preview_message(), "没有选择文件");
        assert_eq!(Rejection::Unsupported.status(), 400);
        assert_eq!(Rejection::Unsupported.preview_message(), "不支持的文件格式");
        assert_eq!(Rejection::Unsupported.convert_message(), MSG_UNSUPPORTED_LONG);
    }

    #[test]
    fn oversized_uploads_are_rejected() {
        assert_eq!(check_size(Some(11), 10), Err(Rejection::TooLarge));
        assert_eq!(check_size(Some(10), 10), Ok(()));
        assert_eq!(check_size(None, 10), Ok(()));
        assert_eq!(Rejection::TooLarge.status(), 413);
        assert_eq!(Rejection::TooLarge.preview_message(), "文件过大");
        assert_eq!(Rejection::TooLarge.convert_message(), "文件过大");
    }

    #[test]
    fn non_integer_color_count_is_a_server_error() {
        let result = process(&upload("photo.png", red_png(), Some("many")), &settings());
        let (body, status) = preview_reply(result);
        assert_eq!(status, 500);
        assert!(body.error().is_some_and(|error| error.contains("many")));
    }

    #[test]
    fn undecodable_image_is_a_server_error() {
        let result = process(&upload("photo.png", b"garbage".to_vec(), None), &settings());
        let (body, status) = preview_reply(result);
        assert_eq!(status, 500);
        assert!(body.error().is_some());
    }

    #[test]
    fn preview_reports_requested_palette() {
        let result = process(&upload("photo.png", red_png(), Some("4")), &settings());
        let (body, status) = preview_reply(result);
        assert_eq!(status, 200);
        assert_eq!(body.colors().len(), 4);
        assert!(body.colors().iter().all(|color| color.hex == "#c80a0a"));
        match body {
            PreviewResponse::Palette { message, .. } => {
                assert_eq!(message.as_deref(), Some("成功提取 4 种主要颜色"));
            }
            PreviewResponse::Failure { error } => panic!("unexpected failure {error}"),
        }
    }

    #[test]
    fn convert_failures_redirect_with_message() {
        let mut index = Url::parse("https://irodori.example/convert?x=1").expect("url");
        index.set_path(INDEX_PATH);
        index.set_query(None);
        let target = flash_url(index, Rejection::NoFile.convert_message());
        assert_eq!(target.path(), "/");
        let error = target
            .query_pairs()
            .find(|(key, _)| key == "error")
            .map(|(_, value)| value.into_owned());
        assert_eq!(error.as_deref(), Some("没有选择文件"));

        assert_eq!(process_failed_message("boom"), "处理图片时出错: boom");
    }

    #[test]
    fn converted_download_is_named_after_upload() {
        let (count, image) =
            match process(&upload("my photo.png", red_png(), Some("5")), &settings()) {
                Ok(result) => result,
                Err(failure) => panic!("process failed: {}", failure.message()),
            };
        assert!(image.to_bmp().expect("bmp").starts_with(b"BM"));
        let name = converted_filename("my photo.png", count);
        assert_eq!(name, "my_photo_5colors.bmp");
        assert_eq!(
            content_disposition(&name),
            "attachment; filename=\"my_photo_5colors.bmp\""
        );
    }
}

mod sample;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use image_pipeline::{ImagePipeline, PaletteConfig, PaletteImage, PipelineError};
use irodori_core::{
    decode_bytes, ColorCount, PreviewResponse, DEFAULT_COLOR_COUNT, FIELD_FILE, FIELD_N_COLORS,
    PREVIEW_PATH,
};
use reqwest::multipart::{Form, Part};
use url::Url;

#[derive(Parser)]
#[command(name = "irodori-cli", version, about = "Reduce images to their dominant colors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an image to a BMP that only uses its dominant colors.
    Convert {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_COLOR_COUNT as i64)]
        colors: i64,
    },
    /// Print the dominant colors of an image.
    Palette {
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_COLOR_COUNT as i64)]
        colors: i64,
        #[arg(long)]
        json: bool,
    },
    /// Ask a running server for the dominant colors of an image.
    Preview {
        input: PathBuf,
        #[arg(long, env = "IRODORI_SERVER", default_value = "http://localhost:8787")]
        server: String,
        #[arg(long, default_value_t = DEFAULT_COLOR_COUNT as i64)]
        colors: i64,
    },
    /// Draw a JPEG with clusters of red, blue and green rectangles.
    SampleImage {
        #[arg(long, default_value = "test_image.jpg")]
        output: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli.command).await {
        eprintln!("错误: {err}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Convert {
            input,
            output,
            colors,
        } => {
            let count = ColorCount::new(colors);
            let output = output.unwrap_or_else(|| default_output_path(&input, count));
            println!("正在读取图片: {}", input.display());
            let bytes = std::fs::read(&input)?;
            println!("正在提取 {count} 种主要颜色...");
            let converted = convert_bytes(&bytes, count)?;
            println!("主要颜色 (RGB):");
            print_palette(&converted);
            println!("正在保存为 BMP 格式: {}", output.display());
            std::fs::write(&output, converted.to_bmp()?)?;
            println!("转换完成！输出文件: {}", output.display());
        }
        Commands::Palette {
            input,
            colors,
            json,
        } => {
            let count = ColorCount::new(colors);
            let bytes = std::fs::read(&input)?;
            let converted = convert_bytes(&bytes, count)?;
            if json {
                let response = PreviewResponse::palette(converted.swatches(), count);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_palette(&converted);
            }
        }
        Commands::Preview {
            input,
            server,
            colors,
        } => {
            let count = ColorCount::new(colors);
            let response = request_preview(&server, &input, count).await?;
            match response {
                PreviewResponse::Failure { error } => return Err(error.into()),
                PreviewResponse::Palette { colors, message, .. } => {
                    if let Some(message) = message {
                        println!("{message}");
                    }
                    for (index, color) in colors.iter().enumerate() {
                        println!("  颜色 {}: {} {}", index + 1, color.hex, color.rgb);
                    }
                }
            }
        }
        Commands::SampleImage { output, seed } => {
            let image = sample::draw(seed);
            sample::save_jpeg(&image, &output)?;
            println!("测试图片已创建: {}", output.display());
        }
    }
    Ok(())
}

fn convert_bytes(bytes: &[u8], count: ColorCount) -> Result<PaletteImage, PipelineError> {
    ImagePipeline::new(PaletteConfig::with_color_count(count)).process(bytes)
}

fn print_palette(image: &PaletteImage) {
    for (index, swatch) in image.swatches().iter().enumerate() {
        println!("  颜色 {}: {}", index + 1, swatch.rgb);
    }
}

/// `photos/cat.jpg` becomes `photos/cat_3colors.bmp`.
fn default_output_path(input: &Path, count: ColorCount) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}_{count}colors.bmp"))
}

fn build_preview_url(server: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(server)?;
    let base_path = url.path().trim_end_matches('/');
    let path = format!("{base_path}{PREVIEW_PATH}");
    url.set_path(&path);
    url.set_query(None);
    Ok(url)
}

async fn request_preview(
    server: &str,
    input: &Path,
    count: ColorCount,
) -> Result<PreviewResponse, Box<dyn std::error::Error>> {
    let url = build_preview_url(server)?;
    let bytes = std::fs::read(input)?;
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let form = Form::new()
        .part(FIELD_FILE, Part::bytes(bytes).file_name(file_name))
        .text(FIELD_N_COLORS, count.to_string());
    let response = reqwest::Client::new()
        .post(url)
        .multipart(form)
        .send()
        .await?;
    // Rejections come back as JSON with a 4xx/5xx status.
    let status = response.status();
    let body = response.bytes().await?;
    decode_bytes::<PreviewResponse>(&body)
        .ok_or_else(|| format!("unexpected reply from server ({status})").into())
}

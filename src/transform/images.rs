//! The images task: losslessly compress every matched image into the build
//! directory, preserving its relative path.
//!
//! | Format           | Treatment                                            |
//! |------------------|------------------------------------------------------|
//! | PNG              | re-encoded with best compression, smaller one kept   |
//! | SVG              | comments and whitespace between tags removed, except |
//! |                  | inside text, style and script elements               |
//! | JPEG, GIF, ICO   | copied unchanged                                     |
//!
//! There is no per-file guard here: a file that cannot be decoded fails the
//! whole task.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::debug;

use crate::build::{discover_sources, AssetClass, BuildContext, TaskError, TaskOutcome, TaskReport};
use crate::transform::write_output;

/// Re-encode a PNG with maximum compression.
///
/// Returns the original bytes if the re-encoding is not smaller.
pub fn recompress_png(bytes: &[u8], path: &Path) -> Result<Vec<u8>, TaskError> {
    let image_error =
        |source: image::ImageError| TaskError::Image { path: path.to_path_buf(), source };

    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(image_error)?;
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(image_error)?;

    if out.len() < bytes.len() {
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

fn svg_comment() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"))
}

/// One piece of markup: an element tag (groups 1 and 2 set), a CDATA section,
/// or a declaration or processing instruction.
fn svg_markup() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| {
        Regex::new(concat!(
            r#"(?s)<(/?)([A-Za-z][\w:.-]*)(?:[^>"']|"[^"]*"|'[^']*')*>"#,
            r"|<!\[CDATA\[.*?\]\]>",
            r"|<[!?][^>]*>",
        ))
        .expect("markup pattern is valid")
    })
}

/// Elements whose character data is content, so whitespace in them is kept.
const TEXT_ELEMENTS: &[&str] = &["text", "tspan", "textPath", "title", "desc"];

/// Elements whose content is copied verbatim up to the closing tag.
const RAW_ELEMENTS: &[&str] = &["style", "script"];

/// Strip comments and inter-tag whitespace from an SVG document.
///
/// Whitespace-only runs between tags are dropped, except inside text
/// elements, where a space between two `<tspan>`s is a rendered space.
/// Style and script bodies are left untouched.
pub fn minify_svg(svg: &str) -> String {
    let source = svg_comment().replace_all(svg, "");
    let mut out = String::with_capacity(source.len());
    let mut text_depth = 0usize;
    let mut rest: &str = &source;

    while let Some(caps) = svg_markup().captures(rest) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        let text = &rest[..whole.start()];
        if text_depth > 0 || !text.trim().is_empty() {
            out.push_str(text);
        }
        let markup = whole.as_str();
        out.push_str(markup);
        rest = &rest[whole.end()..];

        let Some(name) = caps.get(2).map(|m| m.as_str()) else {
            continue;
        };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = markup.ends_with("/>");

        if TEXT_ELEMENTS.contains(&name) {
            if closing {
                text_depth = text_depth.saturating_sub(1);
            } else if !self_closing {
                text_depth += 1;
            }
        } else if RAW_ELEMENTS.contains(&name) && !closing && !self_closing {
            let end = rest.find(&format!("</{}", name)).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Compress one image according to its extension.
pub fn compress(path: &Path) -> Result<Vec<u8>, TaskError> {
    let bytes = fs::read(path).map_err(|e| TaskError::io(path, e))?;
    let ext =
        path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();

    match ext.as_str() {
        "png" => recompress_png(&bytes, path),
        "svg" => match String::from_utf8(bytes) {
            Ok(svg) => Ok(minify_svg(&svg).into_bytes()),
            Err(e) => Ok(e.into_bytes()),
        },
        _ => Ok(bytes),
    }
}

/// Run the images task.
pub fn run(context: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let start = Instant::now();
    let paths = context.paths(AssetClass::Images);
    let sources = discover_sources(context.project_root(), &paths.src);
    let out_dir = context.out_dir(AssetClass::Images);

    let outputs = sources
        .par_iter()
        .map(|source| {
            let compressed = compress(&source.path)?;
            let out_path = out_dir.join(&source.relative);
            write_output(&out_path, &compressed)?;
            debug!("Compressed {} ({} bytes)", source.relative.display(), compressed.len());
            Ok(out_path)
        })
        .collect::<Result<Vec<PathBuf>, TaskError>>()?;

    let mut report = TaskReport::new(AssetClass::Images, sources.len());
    report.outputs = outputs;
    report.duration = start.elapsed();
    Ok(TaskOutcome::Success(report))
}

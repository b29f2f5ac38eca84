//! Per-slide filter graph building.
//!
//! Pure string assembly; the render engine hands the result to FFmpeg's
//! `-vf`. Every slide passes through the same chain shape: fit to canvas,
//! animate, overlay text, fade, normalize pixel format.

use slidereel_models::{Animation, OverlayPosition, Slide};

use crate::escape::escape_filter_value;

/// Longest fade ramp in seconds.
const MAX_FADE_SECS: f64 = 0.4;
/// Zoom animation peak factor.
const ZOOM_PEAK: f64 = 0.12;
/// Rotation amplitude in radians.
const ROTATE_AMPLITUDE: f64 = 0.05;
/// Font size clamp bounds.
const MIN_FONT_PX: u32 = 8;
const MAX_FONT_PX: u32 = 500;

/// Build the complete filter chain for one slide.
pub fn build_slide_filter(slide: &Slide, width: u32, height: u32, fps: u32) -> String {
    let mut stages: Vec<String> = Vec::new();

    stages.push(fit_stage(width, height));
    stages.push(animation_stage(slide, width, height, fps));

    if let Some(text) = slide.overlay_text.as_deref() {
        if !text.is_empty() {
            stages.push(drawtext_stage(slide, text));
        }
    }

    if slide.animation != Animation::None {
        if let Some(fade) = fade_stage(slide.duration_sec) {
            stages.push(fade);
        }
    }

    stages.push("format=yuv420p".to_string());

    stages.join(",")
}

/// Scale to fit the canvas, then center-pad onto a black background.
fn fit_stage(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
        w = width,
        h = height
    )
}

fn animation_stage(slide: &Slide, width: u32, height: u32, fps: u32) -> String {
    let frames = frame_count(slide.duration_sec, fps);

    match slide.animation {
        // Fade-in is handled by the fade stage; both only need rate conversion here
        Animation::None | Animation::FadeIn => format!("fps={fps}"),
        Animation::Zoom => format!(
            "zoompan=z='1+{ZOOM_PEAK}*on/{frames}'\
             :x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)'\
             :d=1:s={width}x{height}:fps={fps}"
        ),
        Animation::Slide => format!(
            "zoompan=z='{zoom}'\
             :x='(iw-iw/zoom)*on/{frames}':y='(ih-ih/zoom)/2'\
             :d=1:s={width}x{height}:fps={fps}",
            zoom = 1.0 + ZOOM_PEAK
        ),
        Animation::Rotate => format!(
            "fps={fps},rotate={ROTATE_AMPLITUDE}*sin(2*PI*t/{dur:.3}):c=black",
            dur = slide.duration_sec
        ),
    }
}

/// Text overlay with position expressions and escaped interpolations.
fn drawtext_stage(slide: &Slide, text: &str) -> String {
    let font_size = slide.font_size_px.clamp(MIN_FONT_PX, MAX_FONT_PX);
    let color = slide
        .overlay_color_hex
        .as_deref()
        .and_then(|hex| hex.strip_prefix('#'))
        .map(|hex| format!("0x{hex}"))
        .unwrap_or_else(|| "white".to_string());

    let (x_expr, y_expr) = position_exprs(slide);

    format!(
        "drawtext=fontfile={font}:text={text}:fontsize={size}:fontcolor={color}:\
         borderw=3:bordercolor=black:x={x}:y={y}",
        font = escape_filter_value(slide.font_style.font_file()),
        text = escape_filter_value(text),
        size = font_size,
        color = color,
        x = x_expr,
        y = y_expr,
    )
}

fn position_exprs(slide: &Slide) -> (String, String) {
    match slide.position {
        OverlayPosition::Top => ("(w-text_w)/2".to_string(), "h*0.08".to_string()),
        OverlayPosition::Center => ("(w-text_w)/2".to_string(), "(h-text_h)/2".to_string()),
        OverlayPosition::Bottom => ("(w-text_w)/2".to_string(), "h*0.88-text_h".to_string()),
        OverlayPosition::Custom => {
            // Validation guarantees both percentages are present and in range
            let x = slide.x_pct.unwrap_or(0.5);
            let y = slide.y_pct.unwrap_or(0.5);
            (
                format!("w*{x:.4}-text_w/2"),
                format!("h*{y:.4}-text_h/2"),
            )
        }
    }
}

/// Fade in at the start and out at the end of the slide.
///
/// Ramp length is `min(0.4, (duration - 0.2) / 2)` so the two fades never
/// overlap, with a 0.2 s fully-visible floor between them.
fn fade_stage(duration_sec: f64) -> Option<String> {
    let fade = MAX_FADE_SECS.min((duration_sec - 0.2) / 2.0);
    if fade <= 0.0 {
        return None;
    }
    Some(format!(
        "fade=t=in:st=0:d={fade:.3},fade=t=out:st={out_start:.3}:d={fade:.3}",
        out_start = duration_sec - fade
    ))
}

fn frame_count(duration_sec: f64, fps: u32) -> u32 {
    ((duration_sec * fps as f64).round() as u32).max(1)
}

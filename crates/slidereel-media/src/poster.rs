//! Poster frame extraction.

use std::path::Path;

use slidereel_models::encoding::{POSTER_SCALE_WIDTH, POSTER_TIMESTAMP};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Pull one poster frame out of a rendered video.
///
/// Seeks half a second in before the input is opened, so the decode starts
/// near the wanted frame instead of walking the whole file.
pub async fn generate_poster(video: &Path, poster: &Path) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(poster)
        .input_with_args(["-ss", POSTER_TIMESTAMP], video.to_string_lossy())
        .single_frame()
        .video_filter(poster_filter())
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

/// Scale to the poster width; `-2` keeps the height even for players that
/// insist on it.
fn poster_filter() -> String {
    format!("scale={POSTER_SCALE_WIDTH}:-2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poster_filter_shape() {
        assert_eq!(poster_filter(), "scale=480:-2");
    }

    #[test]
    fn test_poster_args_order() {
        let cmd = FfmpegCommand::new("/tmp/poster.jpg")
            .input_with_args(["-ss", POSTER_TIMESTAMP], "/tmp/render.mp4")
            .single_frame()
            .video_filter(poster_filter());
        let args = cmd.build_args();

        // -ss must precede -i for input seeking
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss_pos < i_pos);
        assert!(args.contains(&"-vframes".to_string()));
    }
}

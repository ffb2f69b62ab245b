// src/js_scripts.rs

pub const VIDEO_SELECTOR: &str = "video.html5-main-video";

pub const VIDEO_TITLE: &str = r##"
() => {
    const watchMeta = document.querySelector("ytd-watch-metadata");
    if (!watchMeta) return "";
    const titleEl = watchMeta.querySelector("#title h1 yt-formatted-string");
    return titleEl ? titleEl.textContent.trim() : "";
}
"##;

pub const PLAY_VIDEO: &str = r##"
() => {
    const player = document.querySelector("video.html5-main-video");
    if (!player) return false;
    player.play().catch(() => {});
    return true;
}
"##;

/// Moves the main player to `seconds`. Evaluates to `false` when the page has
/// no player.
pub fn seek_video(seconds: f64) -> String {
    format!(
        r##"
() => {{
    const player = document.querySelector("{VIDEO_SELECTOR}");
    if (!player) return false;
    player.currentTime = {seconds};
    return true;
}}
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_script_embeds_position() {
        let script = seek_video(650.5);
        assert!(script.contains("player.currentTime = 650.5;"));
        assert!(script.contains(r#"document.querySelector("video.html5-main-video")"#));
    }

    #[test]
    fn whole_seconds_render_as_plain_numbers() {
        assert!(seek_video(1400.0).contains("player.currentTime = 1400;"));
    }

    #[test]
    fn play_script_targets_same_player() {
        assert!(PLAY_VIDEO.contains(VIDEO_SELECTOR));
    }
}

//! Built-in stream path catalogue
//!
//! Paths used by common IP camera firmwares (Hikvision, Dahua, Axis, Reolink,
//! Samsung/Hanwha and a handful of generic ONVIF encoders). Tried on every open
//! endpoint when no path list is configured.

/// Default RTSP ports probed when none are given
pub const DEFAULT_PORTS: &str = "554,8554";

/// Stream paths tried by default, most common first
pub const DEFAULT_STREAM_PATHS: &[&str] = &[
    "/onvif/profile1/media.smp",
    "/",
    "/1",
    "/Streaming/Channels/1",
    "/profile5/media.smp",
    "/onvif/profile5/media.smp",
    "/onvif/profile2/media.smp",
    "/profile2/media.smp",
    "/cam/h264",
    "/live/ch00_0",
    "/live/h264/ch1",
    "/cam/realmonitor?channel=1&subtype=1",
    "/cam/realmonitor?channel=1&subtype=00",
    "/0/main",
    "/mpeg4unicast",
    "/MediaInput/h264",
    "/profile1/media.smp",
    "/mpeg4/1/media.amp",
    "/h264_pcm.sdp",
    "/onvif/profile4/media.smp",
    "/profile4/media.smp",
    "/onvif/profile6/media.smp",
    "/mjpeg/media.smp",
    "/MJPEG/media.smp",
    "/H264/media.smp",
    "/Streaming/Channels/101",
    "/live",
    "/live2",
    "/h264Preview_01_main",
    "/h264Preview_01_sub",
    "/cam/realmonitor",
];

/// Owned copy of the default path list
pub fn default_stream_paths() -> Vec<String> {
    DEFAULT_STREAM_PATHS.iter().map(|p| p.to_string()).collect()
}

/// Split a comma separated list, trimming whitespace and dropping empty items
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

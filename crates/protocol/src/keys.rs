//! Object key naming used by control-plane implementations.
//!
//! Keys look like `video-uploads/1718000000000-3f9a1c2b-clip.mp4`: a folder
//! chosen from the content type, the creation time in milliseconds, a short
//! random token, and the original file name.

/// Folder for `image/*` uploads.
pub const IMAGE_FOLDER: &str = "images/";
/// Folder for everything else.
pub const VIDEO_FOLDER: &str = "video-uploads/";

/// Picks the destination folder for a content type.
pub fn folder_for(content_type: &str) -> &'static str {
    if content_type.starts_with("image/") {
        IMAGE_FOLDER
    } else {
        VIDEO_FOLDER
    }
}

/// Builds the object key for `filename` created at `millis` with the random
/// `token` the control plane picked.
pub fn format_object_key(filename: &str, content_type: &str, millis: i64, token: &str) -> String {
    format!("{}{millis}-{token}-{filename}", folder_for(content_type))
}

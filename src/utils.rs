//! # Utility Functions Module
//!
//! Helpers for building external tool command lines.

use std::ffi::OsString;

/// Converts string-like or path-like items to a `Vec<OsString>`.
///
/// # Example
/// ```rust
/// use ffmpeg_wrapper::utils::to_os_string_vec;
///
/// let args = to_os_string_vec(["-v", "error", "-stats"]);
/// assert_eq!(args.len(), 3);
/// ```
pub fn to_os_string_vec<T, I>(items: I) -> Vec<OsString>
where
    T: Into<OsString>,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(Into::into).collect()
}

/// Build an argument vector from mixed strings and paths.
///
/// # Example
/// ```rust
/// use ffmpeg_wrapper::args;
/// use std::path::Path;
///
/// let input = Path::new("/media/in.mp4");
/// let args = args!["-i", input, String::from("-an")];
/// assert_eq!(args[1], "/media/in.mp4");
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_os_string_vec([$(::std::ffi::OsString::from($item)),*])
    };
}

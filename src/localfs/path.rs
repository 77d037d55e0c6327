//! Request path resolution
//!
//! The part of the URL after the controller segment is the filesystem path.
//! It is normalized lexically only: no symlink resolution and no check that it
//! stays under any root.

/// Turn a decoded URL tail into a normalized absolute path
///
/// - `tmp/a` and `/tmp/a` both become `/tmp/a`
/// - empty and `.` segments are dropped
/// - `..` removes the previous segment and stops at `/`
/// - a trailing slash is kept, so `/tmp/dir/` still addresses a directory
pub fn normalize_request_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut path = String::with_capacity(raw.len() + 1);
    path.push('/');
    path.push_str(&segments.join("/"));

    if raw.ends_with('/') && !segments.is_empty() {
        path.push('/');
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths() {
        assert_eq!(normalize_request_path("/tmp/a"), "/tmp/a");
        assert_eq!(normalize_request_path("tmp/a"), "/tmp/a");
        assert_eq!(normalize_request_path("new.txt"), "/new.txt");
    }

    #[test]
    fn test_collapses_dots_and_slashes() {
        assert_eq!(normalize_request_path("/tmp//a/./b"), "/tmp/a/b");
        assert_eq!(normalize_request_path("/tmp/a/../b"), "/tmp/b");
        assert_eq!(normalize_request_path("/../../etc/hosts"), "/etc/hosts");
    }

    #[test]
    fn test_trailing_slash() {
        assert_eq!(normalize_request_path("/tmp/dir/"), "/tmp/dir/");
        assert_eq!(normalize_request_path("/"), "/");
        assert_eq!(normalize_request_path(""), "/");
    }
}

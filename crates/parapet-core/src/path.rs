//! Path helpers shared by the URL builder.

/// Strip a single trailing slash.
pub fn remove_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Strip a single leading slash.
pub fn remove_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Strip every leading and trailing slash.
pub fn trim_slashes(path: &str) -> &str {
    path.trim_matches('/')
}

/// Join path segments with exactly one `/` at each join point.
///
/// The first segment keeps its leading slash and the last keeps its
/// trailing slash, so `join_paths(&["/docs/", "/guide/"])` is `/docs/guide/`.
pub fn join_paths(paths: &[&str]) -> String {
    let last = paths.len().saturating_sub(1);
    let mut joined = String::new();

    for (i, path) in paths.iter().enumerate() {
        let segment = if i == 0 {
            remove_trailing_slash(path)
        } else if i == last {
            remove_leading_slash(path)
        } else {
            trim_slashes(path)
        };

        if i > 0 {
            joined.push('/');
        }
        joined.push_str(segment);
    }

    joined
}

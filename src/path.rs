//! Namespace path arithmetic.
//!
//! A module's path is the sequence of child names from the root, each
//! followed by [`SEPARATOR`]: `"cart/items/"`. The root's path is the empty
//! string; devtools address it by the node id [`ROOT_ID`].

pub const SEPARATOR: char = '/';
pub const ROOT_ID: &str = "root";
pub const ROOT_LABEL: &str = "Root";

/// True for both spellings of the root: `""` and `"root"`.
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path == ROOT_ID
}

/// Node id used by the inspector for a path.
pub fn node_id(path: &str) -> &str {
    if path.is_empty() {
        ROOT_ID
    } else {
        path
    }
}

/// Human-readable label: `"Root"` for the root, otherwise the last
/// non-empty segment (`"cart/items/"` -> `"items"`).
pub fn display_label(path: &str) -> &str {
    if is_root(path) {
        return ROOT_LABEL;
    }
    path.strip_suffix(SEPARATOR)
        .unwrap_or(path)
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or(path)
}

/// Non-empty segments of a path. The root has none.
pub fn segments(path: &str) -> Vec<&str> {
    if is_root(path) {
        return Vec::new();
    }
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Path of the child `name` under `parent`.
pub fn child_path(parent: &str, name: &str) -> String {
    let parent = if parent == ROOT_ID { "" } else { parent };
    format!("{}{}{}", parent, name, SEPARATOR)
}

/// Label for a node in a flat list: the whole path without its trailing
/// separator (`"cart/items/"` -> `"cart/items"`), `"Root"` for the root.
pub fn flat_label(path: &str) -> &str {
    if is_root(path) {
        return ROOT_LABEL;
    }
    path.strip_suffix(SEPARATOR).unwrap_or(path)
}

/// Build a path from segments, e.g. `["cart", "items"]` -> `"cart/items/"`.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("{}{}", s.as_ref(), SEPARATOR))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_root() {
        assert_eq!(display_label(""), "Root");
        assert_eq!(display_label("root"), "Root");
    }

    #[test]
    fn test_display_label_nested() {
        assert_eq!(display_label("cart/"), "cart");
        assert_eq!(display_label("cart/items/"), "items");
        assert_eq!(display_label("auth/session/token/"), "token");
    }

    #[test]
    fn test_display_label_without_trailing_separator() {
        assert_eq!(display_label("cart/items"), "items");
    }

    #[test]
    fn test_segments() {
        assert!(segments("root").is_empty());
        assert!(segments("").is_empty());
        assert_eq!(segments("auth/session/"), vec!["auth", "session"]);
    }

    #[test]
    fn test_child_paths() {
        assert_eq!(child_path("", "cart"), "cart/");
        assert_eq!(child_path("root", "cart"), "cart/");
        assert_eq!(child_path("cart/", "items"), "cart/items/");
    }

    #[test]
    fn test_flat_label() {
        assert_eq!(flat_label(""), "Root");
        assert_eq!(flat_label("cart/"), "cart");
        assert_eq!(flat_label("cart/items/"), "cart/items");
    }

    #[test]
    fn test_node_id_and_join() {
        assert_eq!(node_id(""), "root");
        assert_eq!(node_id("cart/"), "cart/");
        assert_eq!(join(&["a", "b"]), "a/b/");
        assert_eq!(join::<&str>(&[]), "");
    }
}

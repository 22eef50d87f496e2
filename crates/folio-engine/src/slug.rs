//! Collection name → storage path.

/// Derive the storage path for a collection name: lowercase, with every
/// space replaced by an underscore. No other character is touched, so
/// `slugify(slugify(s)) == slugify(s)`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_underscores_spaces() {
        assert_eq!(slugify("Blog Posts"), "blog_posts");
        assert_eq!(slugify("Blog!"), "blog!");
        assert_eq!(slugify("  Two  Spaces "), "__two__spaces_");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn other_characters_pass_through() {
        assert_eq!(slugify("Café-Menü/2024"), "café-menü/2024");
        assert_eq!(slugify("tab\tseparated"), "tab\tseparated");
    }

    #[test]
    fn is_idempotent() {
        for input in ["Blog Posts", "ÀÉÎ õü", "already_a_path", "MiXeD CaSe 42", "ǅ title"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "input {input:?}");
        }
    }
}

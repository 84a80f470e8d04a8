//! Identifier normalization shared by clan and user ids.

/// Normalize free text into an id: lowercase ASCII letters and digits only.
///
/// `"Foo Bar!"` and `"foobar"` map to the same id.
pub fn to_id(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            c.is_ascii_alphanumeric().then_some(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_id_strips_case_and_punctuation() {
        assert_eq!(to_id("Foo"), "foo");
        assert_eq!(to_id("  The Foo  Clan! "), "thefooclan");
        assert_eq!(to_id("ÄÖ-42"), "42");
        assert_eq!(to_id("!!!"), "");
    }
}

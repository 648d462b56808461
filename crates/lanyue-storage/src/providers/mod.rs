//! Physical storage backends.

pub mod local;

/// Guess a media type from a file name.
pub fn mime_from_name(name: &str) -> Option<String> {
    mime_guess::from_path(name).first().map(|m| m.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_detection() {
        assert_eq!(mime_from_name("file.pdf"), Some("application/pdf".into()));
        assert_eq!(mime_from_name("img.PNG"), Some("image/png".into()));
        assert_eq!(mime_from_name("noext"), None);
    }
}

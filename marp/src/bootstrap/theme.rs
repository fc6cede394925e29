use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::bootstrap::BootstrapError;

/// The `@theme <name>` header every Marp theme stylesheet carries.
static THEME_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/?\*\s@theme\s(\S+)(?:\s\*/)?\n").unwrap());

/// Theme name declared by a stylesheet, if any.
pub fn theme_name(css: &str) -> Option<&str> {
    THEME_HEADER
        .captures(css)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Read a theme stylesheet and return the name it declares.
pub fn read_theme_name(path: &Path) -> Result<String, BootstrapError> {
    let css = fs::read_to_string(path).map_err(|source| BootstrapError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    theme_name(&css)
        .map(str::to_string)
        .ok_or_else(|| BootstrapError::ThemeNameMissing {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_header() {
        assert_eq!(
            theme_name("/* @theme corporate */\nsection { color: red; }\n"),
            Some("corporate")
        );
    }

    #[test]
    fn block_comment_header() {
        let css = "/*!\n * @theme lecture-notes\n * @auto-scaling true\n */\n@import 'default';\n";
        assert_eq!(theme_name(css), Some("lecture-notes"));
    }

    #[test]
    fn missing_header_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.css");
        fs::write(&path, "section { color: red; }\n").unwrap();
        assert!(matches!(
            read_theme_name(&path),
            Err(BootstrapError::ThemeNameMissing { .. })
        ));
    }
}

//! Generates a starter presentation from a handful of metadata fields.
//!
//! The generated file already follows the grammar the processor expects:
//! frontmatter with `marp: true` and a variables table, `${...}` placeholders
//! on the title slide, and one `section` tag per requested section.

pub mod theme;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::document::{LINE_FEED, NEXT_SECTION_SEP, SECTION_SEP};
use crate::tag::make_comment;

const DEFAULT_THEME: &str = "gaia";

const IMG_CENTER_STYLE: &str = "<style>\nimg[alt~=center] {\n    display: block;\n    margin: 0 auto;\n}\n</style>";

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("path provided corresponds to a non-existent directory [{}]", dir.display())]
    OutputDirMissing { dir: PathBuf },

    #[error("path provided is not a markdown file (extension [{extension}] rather than [.md])")]
    NotMarkdown { extension: String },

    #[error("no `@theme` declaration found in '{}'", path.display())]
    ThemeNameMissing { path: PathBuf },

    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Optional pieces of a generated presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapOption {
    Paginate,
    Header,
    Footer,
    TableOfContents,
    ImgCenter,
}

/// Metadata for a new presentation.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    pub title: String,
    pub subtitle: Option<String>,
    pub date: Option<String>,
    pub event: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub theme: String,
    pub theme_path: Option<PathBuf>,
    pub sections: Vec<String>,
    pub variables: BTreeMap<String, String>,
    pub options: Vec<BootstrapOption>,
}

#[derive(Serialize)]
struct FrontmatterOut<'a> {
    marp: bool,
    theme: &'a str,
    variables: BTreeMap<String, String>,
}

impl Bootstrapper {
    pub fn new(title: impl Into<String>) -> Self {
        Bootstrapper {
            title: title.into(),
            subtitle: None,
            date: None,
            event: None,
            header: None,
            footer: None,
            theme: DEFAULT_THEME.to_string(),
            theme_path: None,
            sections: Vec::new(),
            variables: BTreeMap::new(),
            options: Vec::new(),
        }
    }

    /// Use a custom theme stylesheet; the theme name is read from the file.
    pub fn with_theme_file(mut self, path: &Path) -> Result<Self, BootstrapError> {
        self.theme = theme::read_theme_name(path)?;
        self.theme_path = Some(path.to_path_buf());
        Ok(self)
    }

    fn has(&self, option: BootstrapOption) -> bool {
        self.options.contains(&option)
    }

    pub fn header(&self) -> String {
        non_empty(&self.header)
            .map(str::to_string)
            .unwrap_or_else(|| "[*${title}*](#1)".to_string())
    }

    /// `*${event}* ${date}`, each half only when the field is set.
    pub fn event_date(&self) -> String {
        let mut out = String::new();
        if non_empty(&self.event).is_some() {
            out.push_str("*${event}* ");
        }
        if non_empty(&self.date).is_some() {
            out.push_str("${date}");
        }
        out.trim_end().to_string()
    }

    pub fn footer(&self) -> String {
        non_empty(&self.footer)
            .map(str::to_string)
            .unwrap_or_else(|| self.event_date())
    }

    /// Extra variables plus every metadata field that is set.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut out = self.variables.clone();
        let theme_path = self
            .theme_path
            .as_ref()
            .map(|p| p.display().to_string());
        let fields = [
            ("title", Some(self.title.clone())),
            ("subtitle", self.subtitle.clone()),
            ("date", self.date.clone()),
            ("event", self.event.clone()),
            ("theme_path", theme_path),
        ];
        for (name, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                out.insert(name.to_string(), value);
            }
        }
        out
    }

    pub fn frontmatter(&self) -> Result<String, BootstrapError> {
        let yaml = serde_yaml::to_string(&FrontmatterOut {
            marp: true,
            theme: &self.theme,
            variables: self.variables(),
        })?;
        Ok(yaml.trim_end().to_string())
    }

    pub fn first_slide(&self) -> String {
        let mut lines = vec![make_comment("title", &[]), "# ${title}".to_string()];
        if non_empty(&self.subtitle).is_some() {
            lines.push("## ${subtitle}".to_string());
        }
        let event_date = self.event_date();
        if !event_date.is_empty() {
            lines.push(event_date);
        }
        lines.join("\n")
    }

    /// Deck-wide directives selected through the options.
    pub fn extra_directives(&self) -> String {
        let mut out = Vec::new();
        if self.has(BootstrapOption::Header) {
            out.push(format!("<!-- header: '{}' -->", self.header()));
        }
        if self.has(BootstrapOption::Footer) {
            out.push(format!("<!-- footer: '{}' -->", self.footer()));
        }
        if self.has(BootstrapOption::Paginate) {
            out.push("<!-- paginate: true -->".to_string());
        }
        if self.has(BootstrapOption::ImgCenter) {
            out.push(IMG_CENTER_STYLE.to_string());
        }
        out.join("\n")
    }

    pub fn toc(&self) -> String {
        format!("# Table of contents\n{}", make_comment("toc", &[]))
    }

    /// Divider tag and placeholder slide for every section.
    pub fn blank_sections(&self) -> Vec<(String, String)> {
        self.sections
            .iter()
            .map(|section| {
                let id = section.to_lowercase().replace(' ', "-");
                let divider = make_comment("section", &[("id", &id), ("title", section)]);
                let content = format!("## {}\n\nStart writing your content here!", section);
                (divider, content)
            })
            .collect()
    }

    /// The full text of the presentation.
    pub fn render(&self) -> Result<String, BootstrapError> {
        let mut out = String::new();

        out.push_str(SECTION_SEP);
        out.push_str(LINE_FEED);
        out.push_str(LINE_FEED);
        out.push_str(&self.frontmatter()?);
        out.push_str(NEXT_SECTION_SEP);
        out.push_str(&self.first_slide());
        out.push_str(NEXT_SECTION_SEP);

        let directives = self.extra_directives();
        if !directives.is_empty() {
            out.push_str(&directives);
            out.push_str(LINE_FEED);
            out.push_str(LINE_FEED);
        }

        if self.has(BootstrapOption::TableOfContents) {
            out.push_str(&self.toc());
            out.push_str(NEXT_SECTION_SEP);
        }

        for (divider, content) in self.blank_sections() {
            out.push_str(&divider);
            out.push_str(NEXT_SECTION_SEP);
            out.push_str(&content);
            out.push_str(NEXT_SECTION_SEP);
        }

        Ok(out)
    }

    /// Write the presentation to `path`, replacing any existing file.
    pub fn bootstrap(&self, path: &Path) -> Result<(), BootstrapError> {
        let text = self.render()?;
        fs::write(path, text).map_err(|source| BootstrapError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "bootstrapped presentation");
        Ok(())
    }
}

/// Check that `path` can receive a new presentation.
pub fn validate_output_path(path: &Path) -> Result<(), BootstrapError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(BootstrapError::OutputDirMissing {
            dir: dir.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    if extension != "md" {
        return Err(BootstrapError::NotMarkdown { extension });
    }
    Ok(())
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talk() -> Bootstrapper {
        let mut b = Bootstrapper::new("Ferris Talks");
        b.event = Some("RustConf".into());
        b.date = Some("September 2024".into());
        b
    }

    #[test]
    fn frontmatter_is_sorted_yaml() {
        let fm = talk().frontmatter().unwrap();
        assert_eq!(
            fm,
            "marp: true\ntheme: gaia\nvariables:\n  date: September 2024\n  event: RustConf\n  title: Ferris Talks"
        );
    }

    #[test]
    fn footer_defaults_to_event_and_date() {
        let mut b = talk();
        assert_eq!(b.footer(), "*${event}* ${date}");
        b.event = None;
        assert_eq!(b.footer(), "${date}");
        b.footer = Some("custom".into());
        assert_eq!(b.footer(), "custom");
    }

    #[test]
    fn first_slide_uses_placeholders() {
        let mut b = talk();
        b.subtitle = Some("Memory safety".into());
        assert_eq!(
            b.first_slide(),
            "<!-- title -->\n# ${title}\n## ${subtitle}\n*${event}* ${date}"
        );
    }

    #[test]
    fn sections_become_divider_tags() {
        let mut b = talk();
        b.sections = vec!["Getting Started".into()];
        let sections = b.blank_sections();
        assert_eq!(
            sections[0].0,
            r#"<!-- section: id="getting-started" title="Getting Started" -->"#
        );
    }

    #[test]
    fn render_with_options() {
        let mut b = talk();
        b.options = vec![BootstrapOption::Paginate, BootstrapOption::TableOfContents];
        b.sections = vec!["Intro".into()];
        let text = b.render().unwrap();
        assert!(text.starts_with("---\n\nmarp: true\n"));
        assert!(text.contains("\n\n---\n\n<!-- paginate: true -->\n\n# Table of contents\n<!-- toc -->"));
        assert!(text.ends_with("## Intro\n\nStart writing your content here!\n\n---\n\n"));
    }

    #[test]
    fn output_path_checks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(&dir.path().join("deck.md")).is_ok());
        assert!(matches!(
            validate_output_path(&dir.path().join("deck.txt")),
            Err(BootstrapError::NotMarkdown { .. })
        ));
        assert!(matches!(
            validate_output_path(&dir.path().join("missing/deck.md")),
            Err(BootstrapError::OutputDirMissing { .. })
        ));
    }
}

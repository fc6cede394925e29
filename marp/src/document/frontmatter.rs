use serde::Deserialize;
use serde_yaml::Value;

use crate::document::Section;
use crate::document::variables::Variables;
use crate::error::PipelineError;

/// Parsed metadata from the first section of a presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub theme: Option<String>,
    pub variables: Variables,
}

#[derive(Debug, Deserialize)]
struct RawFrontmatter {
    #[serde(default)]
    marp: Value,
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    variables: Option<serde_yaml::Mapping>,
}

/// Parse the first section as YAML and require a truthy `marp` flag.
pub fn parse_frontmatter(section: &Section<'_>) -> Result<Frontmatter, PipelineError> {
    let invalid = |reason: String| PipelineError::FrontmatterInvalid {
        reason,
        span: section.span(),
    };

    let value: Value = serde_yaml::from_str(section.text).map_err(|e| invalid(e.to_string()))?;
    let raw: RawFrontmatter = match value {
        Value::Mapping(_) => serde_yaml::from_value(value).map_err(|e| invalid(e.to_string()))?,
        Value::Null => return Err(invalid("'marp: true' not found in frontmatter!".into())),
        other => {
            return Err(invalid(format!(
                "expected a mapping, found {}",
                type_name(&other)
            )));
        }
    };

    if !is_truthy(&raw.marp) {
        return Err(invalid("'marp: true' not found in frontmatter!".into()));
    }

    let variables = raw
        .variables
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (display_value(k), display_value(v)))
        .collect();

    Ok(Frontmatter {
        theme: raw.theme,
        variables,
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// String form of a YAML value as it is substituted into slides.
///
/// Scalars print the way Python's `str()` prints them (`True`, `None`);
/// nested strings are quoted like Python's `repr()`.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => repr_value(other),
    }
}

fn repr_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(repr_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", repr_value(k), repr_value(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        Value::Tagged(tagged) => repr_value(&tagged.value),
    }
}

/// Single quotes unless the text contains one and no double quote.
fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(text: &str) -> Section<'_> {
        Section { text, offset: 0 }
    }

    #[test]
    fn reads_theme_and_variables_in_order() {
        let fm = parse_frontmatter(&section(
            "marp: true\ntheme: gaia\nvariables:\n  title: Talk\n  year: 2024\n  draft: false",
        ))
        .unwrap();
        assert_eq!(fm.theme.as_deref(), Some("gaia"));
        let vars: Vec<(&str, &str)> = fm.variables.iter().collect();
        assert_eq!(
            vars,
            vec![("title", "Talk"), ("year", "2024"), ("draft", "False")]
        );
    }

    #[test]
    fn missing_variables_is_an_empty_table() {
        let fm = parse_frontmatter(&section("marp: true")).unwrap();
        assert!(fm.variables.is_empty());
        assert_eq!(fm.theme, None);
    }

    #[test]
    fn rejects_missing_or_false_flag() {
        for text in ["theme: gaia", "marp: false", "marp: 0", ""] {
            let err = parse_frontmatter(&section(text)).unwrap_err();
            assert!(
                matches!(err, PipelineError::FrontmatterInvalid { .. }),
                "{text:?} gave {err}"
            );
        }
    }

    #[test]
    fn rejects_non_mapping_yaml() {
        let err = parse_frontmatter(&section("# Just a slide")).unwrap_err();
        assert!(err.to_string().contains("invalid frontmatter"));
    }

    #[test]
    fn nested_values_render_inline() {
        let fm = parse_frontmatter(&section(
            "marp: true\nvariables:\n  tags: [a, b]\n  who: {name: Ada}",
        ))
        .unwrap();
        assert_eq!(fm.variables.get("tags"), Some("['a', 'b']"));
        assert_eq!(fm.variables.get("who"), Some("{'name': 'Ada'}"));
    }

    #[test]
    fn scalars_render_like_python() {
        let fm = parse_frontmatter(&section(
            "marp: true\nvariables:\n  draft: true\n  none_v: null\n  quoted: [\"it's\", 1]",
        ))
        .unwrap();
        assert_eq!(fm.variables.get("draft"), Some("True"));
        assert_eq!(fm.variables.get("none_v"), Some("None"));
        assert_eq!(fm.variables.get("quoted"), Some(r#"["it's", 1]"#));
    }
}

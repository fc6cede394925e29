use crate::code::CodeBlock;
use crate::params::Params;
use crate::tag::{Tag, TagError};

/// `<!-- title -->`: styles the slide as the title slide.
pub struct TitleTag;

impl Tag for TitleTag {
    fn expand(&self, _params: &Params, _code_blocks: &[CodeBlock]) -> Result<String, TagError> {
        Ok("<!-- _class: title -->".to_string())
    }
}

/// `<!-- section: id="..." title="..." -->`: a divider slide opening a new part of the deck.
///
/// `id` becomes an anchor in the slide header so other slides can link to it.
pub struct SectionTag;

impl Tag for SectionTag {
    fn expand(&self, params: &Params, _code_blocks: &[CodeBlock]) -> Result<String, TagError> {
        let mut directives = Vec::new();
        if let Some(id) = params.get("id") {
            directives.push(format!("<!-- _header: <div id=\"{}\"></div> -->", id));
        }
        directives.push("<!-- _class: divider -->".to_string());
        if let Some(title) = params.get("title").filter(|t| !t.is_empty()) {
            directives.push(format!("# {}", title));
        }
        Ok(directives.join("\n"))
    }
}

/// `<!-- code: id="..." -->`: the captured output of the executed block with that id.
pub struct CodeTag;

impl Tag for CodeTag {
    fn expand(&self, params: &Params, code_blocks: &[CodeBlock]) -> Result<String, TagError> {
        let id = params.get("id").unwrap_or_default();
        let output = code_blocks
            .iter()
            .filter(|block| block.id() == Some(id))
            .find_map(|block| block.output.as_deref())
            .ok_or_else(|| TagError::NoMatchingCodeBlock { id: id.to_string() })?;
        Ok(format!("```\n{}\n```", output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, output: Option<&str>) -> CodeBlock {
        CodeBlock {
            text: String::new(),
            span: 0..0,
            params: [("id", id)].into_iter().collect(),
            run: output.is_some(),
            setup: Vec::new(),
            code: Vec::new(),
            output: output.map(str::to_string),
        }
    }

    #[test]
    fn title_ignores_params() {
        let params: Params = [("x", "y")].into_iter().collect();
        assert_eq!(
            TitleTag.expand(&params, &[]).unwrap(),
            "<!-- _class: title -->"
        );
    }

    #[test]
    fn section_with_title() {
        let params: Params = [("id", "intro"), ("title", "Introduction")]
            .into_iter()
            .collect();
        assert_eq!(
            SectionTag.expand(&params, &[]).unwrap(),
            "<!-- _header: <div id=\"intro\"></div> -->\n<!-- _class: divider -->\n# Introduction"
        );
    }

    #[test]
    fn section_with_empty_title_has_no_heading() {
        let params: Params = [("id", "intro"), ("title", "")].into_iter().collect();
        let out = SectionTag.expand(&params, &[]).unwrap();
        assert!(!out.contains("# "));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn code_expands_captured_output() {
        let blocks = [block("other", Some("0")), block("answer", Some("42"))];
        let params: Params = [("id", "answer")].into_iter().collect();
        assert_eq!(CodeTag.expand(&params, &blocks).unwrap(), "```\n42\n```");
    }

    #[test]
    fn code_names_the_missing_id() {
        let blocks = [block("answer", Some("42")), block("idle", None)];
        for id in ["nope", "idle"] {
            let params: Params = [("id", id)].into_iter().collect();
            assert_eq!(
                CodeTag.expand(&params, &blocks).unwrap_err(),
                TagError::NoMatchingCodeBlock { id: id.to_string() }
            );
        }
    }
}

use marp::{CodeBlock, CodeRunner, ExecutionError, PipelineError, Processor, Tag, TagError, TagRegistry};
use marp::params::Params;

/// Prints the argument of every `print(...)` line; `fail` anywhere is an error.
struct Echo;

impl CodeRunner for Echo {
    fn run(&self, setup: &[String], code: &[String]) -> Result<String, ExecutionError> {
        if let Some(line) = setup.iter().chain(code).find(|l| l.trim() == "fail") {
            return Err(ExecutionError::new(line.clone(), "NameError: name 'fail' is not defined"));
        }
        let printed: Vec<&str> = code
            .iter()
            .filter_map(|l| l.strip_prefix("print(")?.strip_suffix(')'))
            .collect();
        Ok(printed.join("\n"))
    }
}

const DECK: &str = r#"---

marp: true
variables:
  speaker: Ferris
  year: 2024

---

<!-- title -->
# Talk by ${speaker}
${year} edition, ${missing} stays

---

```python id="answer" run="true"
# <
# x = 1
# >
print(42)
```

<!-- code: id="answer" -->

---

<!-- toc -->
<!-- _class: lead -->
"#;

fn process(source: &str) -> Result<marp::ProcessedDocument, PipelineError> {
    Processor::new(Echo).process(source)
}

#[test]
fn section_count_round_trips() {
    let doc = process(DECK).unwrap();
    assert_eq!(doc.sections.len(), 4);
    assert!(doc.text.starts_with("---\n\n"));
    assert_eq!(doc.text.matches("\n\n---\n\n").count(), 3);
}

#[test]
fn variables_are_substituted() {
    let doc = process(DECK).unwrap();
    assert!(doc.text.contains("# Talk by Ferris\n2024 edition, ${missing} stays"));
    assert_eq!(doc.frontmatter.variables.get("year"), Some("2024"));
}

#[test]
fn registered_tags_expand_and_others_pass_through() {
    let doc = process(DECK).unwrap();
    assert!(doc.sections[1].starts_with("<!-- _class: title -->\n"));
    assert!(doc.sections[3].contains("<!-- toc -->\n<!-- _class: lead -->"));
}

#[test]
fn code_tag_inserts_captured_output() {
    let doc = process(DECK).unwrap();
    assert!(doc.text.contains("```\n42\n```"));
    assert_eq!(doc.code_blocks[0].output.as_deref(), Some("42"));
}

#[test]
fn setup_lines_never_reach_the_output() {
    let doc = process(DECK).unwrap();
    assert!(!doc.text.contains("x = 1"));
    assert!(doc.text.contains("```python id=\"answer\" run=\"true\"\nprint(42)\n```"));
    assert_eq!(doc.code_blocks[0].setup, vec!["x = 1"]);
}

#[test]
fn missing_code_block_names_the_id() {
    let source = DECK.replace(r#"<!-- code: id="answer" -->"#, r#"<!-- code: id="nope" -->"#);
    let err = process(&source).unwrap_err();
    assert_eq!(err.missing_block_id(), Some("nope"));
    assert!(err.to_string().contains("[nope]"));
}

#[test]
fn blocks_that_do_not_run_cannot_be_referenced() {
    let source = DECK.replace(r#"run="true""#, r#"run="false""#);
    let err = process(&source).unwrap_err();
    assert_eq!(err.missing_block_id(), Some("answer"));

    let without_tag = source.replace(r#"<!-- code: id="answer" -->"#, "");
    let doc = process(&without_tag).unwrap();
    assert!(doc.code_blocks[0].output.is_none());
    assert!(doc.text.contains("print(42)"));
}

#[test]
fn frontmatter_without_marp_flag_is_rejected() {
    let source = DECK.replace("marp: true", "marp: false");
    assert!(matches!(
        process(&source),
        Err(PipelineError::FrontmatterInvalid { .. })
    ));
    assert!(matches!(
        process("# just a slide\n"),
        Err(PipelineError::FrontmatterInvalid { .. })
    ));
}

#[test]
fn failing_block_aborts_the_run() {
    let source = DECK.replace("print(42)", "fail");
    let err = process(&source).unwrap_err();
    match &err {
        PipelineError::Execution { index, source, .. } => {
            assert_eq!(*index, 0);
            assert_eq!(source.line, "fail");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.span().is_some());
}

#[test]
fn processing_is_deterministic() {
    let processor = Processor::new(Echo);
    let first = processor.process(DECK).unwrap();
    let second = processor.process(DECK).unwrap();
    assert_eq!(first.text, second.text);
}

#[test]
fn empty_registry_leaves_comments_alone() {
    let source = DECK.replace(r#"<!-- code: id="answer" -->"#, "");
    let doc = Processor::with_tags(Echo, TagRegistry::empty())
        .process(&source)
        .unwrap();
    assert!(doc.text.contains("<!-- title -->"));
}

#[test]
fn process_file_writes_the_destination() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.md");
    let output = dir.path().join("deck.processed.md");
    std::fs::write(&input, DECK).unwrap();

    let doc = Processor::new(Echo).process_file(&input, &output).unwrap();
    assert_eq!(std::fs::read_to_string(&output).unwrap(), doc.text);
}

#[test]
fn failed_run_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.md");
    let output = dir.path().join("deck.processed.md");
    std::fs::write(&input, DECK.replace("marp: true", "")).unwrap();

    assert!(Processor::new(Echo).process_file(&input, &output).is_err());
    assert!(!output.exists());
}

/// Lists the ids of every executed block.
struct Executed;

impl Tag for Executed {
    fn expand(&self, _: &Params, blocks: &[CodeBlock]) -> Result<String, TagError> {
        let ids: Vec<&str> = blocks
            .iter()
            .filter(|b| b.output.is_some())
            .filter_map(CodeBlock::id)
            .collect();
        Ok(ids.join(","))
    }
}

#[test]
fn custom_tags_can_be_added_to_a_processor() {
    let mut processor = Processor::new(Echo);
    processor.tags_mut().register("toc", Executed);
    assert!(processor.tags_mut().contains("code"));
    let doc = processor.process(DECK).unwrap();
    assert!(doc.sections[3].starts_with("answer\n<!-- _class: lead -->"));
}

#[test]
fn fences_inside_html_blocks_are_executed() {
    let source = "---\n\nmarp: true\n\n---\n\n<div class=\"columns\">\n```python id=\"a\" run=\"true\"\nprint(42)\n```\n</div>\n\n<!-- code: id=\"a\" -->\n";
    let doc = process(source).unwrap();
    assert_eq!(doc.code_blocks.len(), 1);
    assert!(doc.text.contains("</div>\n\n```\n42\n```"));
}

#[test]
fn tilde_fences_lose_their_setup_too() {
    let source = DECK.replace("```python id=\"answer\" run=\"true\"\n# <\n# x = 1\n# >\nprint(42)\n```",
        "~~~python id=\"answer\" run=\"true\"\n# <\n# x = 1\n# >\nprint(42)\n~~~");
    assert!(source.contains("~~~python"));
    let doc = process(&source).unwrap();
    assert!(!doc.text.contains("x = 1"));
    assert!(doc.text.contains("~~~python id=\"answer\" run=\"true\"\nprint(42)\n~~~"));
    assert!(doc.text.contains("```\n42\n```"));
}

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};
use regex::Regex;
use tracing::{debug, warn};

use crate::code::{CodeBlock, CodeRunner, parse_run_flag};
use crate::error::PipelineError;
use crate::params::Params;

/// Fence language whose blocks are extracted and may be executed.
pub const EXECUTABLE_LANGUAGE: &str = "python";

/// `# <` ... `# >` marker pair; group 1 holds the commented setup lines.
static SETUP_REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)#\s<\n(#\s.+?\n*)#\s>\n").unwrap());

static SETUP_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\s(.+?)\n").unwrap());

/// A setup region still sitting inside an executable fence of the output text.
/// Backtick and tilde fences are both recognised.
static FENCED_SETUP_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s)(?:```|~~~){}(?:.+?)(#\s<\n(?:.+?)\n#\s>\n)(?:.+?)(?:```|~~~)",
        regex::escape(EXECUTABLE_LANGUAGE)
    ))
    .unwrap()
});

/// A fenced block written inside a raw HTML block, which CommonMark does not
/// parse as code. Group 1 is the info string, group 2 the body.
static HTML_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^[ \t]*(?:```|~~~)([^\n`~]*)\n(.*?)^[ \t]*(?:```|~~~)[ \t]*$").unwrap()
});

/// Find every executable fenced block of `source`, in document order.
///
/// Nothing is executed here; `output` stays `None` on every block.
pub fn scan_code_blocks(source: &str) -> Vec<CodeBlock> {
    let parser = CmarkParser::new_ext(source, Options::empty());
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut blocks = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let (ref ev, ref range) = events[i];
        i += 1;

        if let Event::Start(Tag::HtmlBlock) = ev {
            blocks.extend(scan_html_fences(&source[range.clone()], range.start));
            continue;
        }

        let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) = ev else {
            continue;
        };
        let span = range.clone();
        let text = collect_text_until(&events, &mut i, |e| matches!(e, TagEnd::CodeBlock));

        let Some(params) = executable_params(info) else {
            continue;
        };
        blocks.push(build_block(text, span, params));
    }

    debug!(count = blocks.len(), "scanned code blocks");
    blocks
}

/// Run every block whose `run` flag is set and store its captured output.
///
/// The first failing block aborts the whole pass.
pub fn execute_code_blocks<R: CodeRunner + ?Sized>(
    blocks: &mut [CodeBlock],
    runner: &R,
) -> Result<(), PipelineError> {
    for (index, block) in blocks.iter_mut().enumerate() {
        if !block.run {
            continue;
        }
        debug!(index, id = block.id().unwrap_or_default(), "executing code block");
        let output = runner
            .run(&block.setup, &block.code)
            .map_err(|source| PipelineError::Execution {
                index,
                span: block.span.clone(),
                source,
            })?;
        block.output = Some(output);
    }
    Ok(())
}

/// Separate the setup lines of a block body from its visible lines.
pub fn split_setup(text: &str) -> (Vec<String>, Vec<String>) {
    let Some((region_span, region)) = find_setup_region(text) else {
        return (Vec::new(), text.lines().map(str::to_string).collect());
    };

    let setup = SETUP_LINE
        .captures_iter(region)
        .map(|caps| caps[1].to_string())
        .collect();

    let mut remaining = String::with_capacity(text.len());
    remaining.push_str(&text[..region_span.start]);
    remaining.push_str(&text[region_span.end..]);
    let code = remaining.lines().map(str::to_string).collect();

    (setup, code)
}

/// Remove setup regions that survived inside executable fences of `text`.
///
/// Every occurrence of a matched region is removed, wherever it appears.
pub fn strip_setup_regions(text: &str) -> String {
    let regions: Vec<&str> = FENCED_SETUP_REGION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let mut out = text.to_string();
    for region in regions {
        out = out.replace(region, "");
    }
    out
}

fn find_setup_region(text: &str) -> Option<(Range<usize>, &str)> {
    let caps = SETUP_REGION.captures(text)?;
    Some((caps.get(0)?.range(), caps.get(1)?.as_str()))
}

/// Executable fences inside the HTML block `html`, which starts at byte `offset`.
fn scan_html_fences(html: &str, offset: usize) -> Vec<CodeBlock> {
    HTML_FENCE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let params = executable_params(caps.get(1)?.as_str())?;
            let span = offset + whole.start()..offset + whole.end();
            Some(build_block(caps[2].to_string(), span, params))
        })
        .collect()
}

/// Parameters of the fence if its language marks it as executable.
fn executable_params(info: &str) -> Option<Params> {
    let info = info.trim();
    let (language, rest) = info
        .split_once(char::is_whitespace)
        .unwrap_or((info, ""));
    (language == EXECUTABLE_LANGUAGE).then(|| Params::parse(rest))
}

fn build_block(text: String, span: Range<usize>, params: Params) -> CodeBlock {
    let run = match params.get("run") {
        None => false,
        Some(value) => parse_run_flag(value).unwrap_or_else(|| {
            warn!(value, "unrecognised `run` value, block will not be executed");
            false
        }),
    };
    let (setup, code) = split_setup(&text);

    CodeBlock {
        text,
        span,
        params,
        run,
        setup,
        code,
        output: None,
    }
}

/// Collect all text content until a matching End tag.
fn collect_text_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        *i += 1;
        match ev {
            Event::End(tag_end) if is_end(tag_end) => break,
            Event::Text(s) => text.push_str(s),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_only_executable_fences() {
        let doc = "# Slide\n\n```python id=\"a\" run=\"true\"\nprint(1)\n```\n\n```rust\nfn main() {}\n```\n\n```python\nx\n```\n";
        let blocks = scan_code_blocks(doc);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id(), Some("a"));
        assert!(blocks[0].run);
        assert_eq!(blocks[0].code, vec!["print(1)"]);
        assert!(blocks[0].output.is_none());
        assert!(!blocks[1].run);
        assert!(blocks[1].params.is_empty());
    }

    #[test]
    fn spans_cover_the_fence() {
        let doc = "intro\n\n```python id=\"a\"\n1\n```\n";
        let blocks = scan_code_blocks(doc);
        assert!(doc[blocks[0].span.clone()].starts_with("```python"));
        assert!(doc[blocks[0].span.clone()].trim_end().ends_with("```"));
    }

    #[test]
    fn splits_setup_region_out_of_body() {
        let (setup, code) = split_setup("# <\n# x = 1\n# y = 2\n# >\nprint(x + y)\n");
        assert_eq!(setup, vec!["x = 1", "y = 2"]);
        assert_eq!(code, vec!["print(x + y)"]);
    }

    #[test]
    fn body_without_setup_is_all_visible() {
        let (setup, code) = split_setup("# a comment\nprint(1)\n");
        assert!(setup.is_empty());
        assert_eq!(code, vec!["# a comment", "print(1)"]);
    }

    #[test]
    fn unknown_run_value_disables_execution() {
        let blocks = scan_code_blocks("```python run=\"maybe\"\n1\n```\n");
        assert!(!blocks[0].run);
    }

    #[test]
    fn strips_regions_left_in_fences() {
        let text = "```python run=\"1\"\n# <\n# x = 1\n# >\nprint(x)\n```";
        assert_eq!(strip_setup_regions(text), "```python run=\"1\"\nprint(x)\n```");
    }

    #[test]
    fn strips_regions_in_tilde_fences() {
        let text = "~~~python run=\"1\"\n# <\n# x = 1\n# >\nprint(x)\n~~~";
        assert_eq!(strip_setup_regions(text), "~~~python run=\"1\"\nprint(x)\n~~~");
    }

    #[test]
    fn finds_fences_inside_html_blocks() {
        let doc = "<div class=\"columns\">\n```python id=\"a\" run=\"true\"\nprint(42)\n```\n```rust\nfn f() {}\n```\n</div>\n\n```python id=\"b\"\nx\n```\n";
        let blocks = scan_code_blocks(doc);
        let ids: Vec<_> = blocks.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec![Some("a"), Some("b")]);
        assert!(blocks[0].run);
        assert_eq!(blocks[0].code, vec!["print(42)"]);
        assert!(doc[blocks[0].span.clone()].starts_with("```python id=\"a\""));
        assert!(doc[blocks[0].span.clone()].ends_with("```"));
    }

    #[test]
    fn strip_leaves_other_text_alone() {
        let text = "# Title\n\n```rust\nlet x = 1;\n```";
        assert_eq!(strip_setup_regions(text), text);
    }
}

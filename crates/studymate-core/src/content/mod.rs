mod diagram;
mod scanner;

pub use diagram::{Diagram, DiagramEdge, DiagramNode, DiagramSpec, NodeShape};

use serde::{Deserialize, Serialize};

use scanner::Scanner;

/// One piece of a message body after citation splitting: either plain prose
/// or a citation badge that stays at its original position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Segment {
    Text(String),
    Citation(String),
}

/// Result of running a raw assistant reply through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProcessedContent {
    pub cleaned_text: String,
    pub segments: Vec<Segment>,
    pub sources: Vec<String>,
    pub diagrams: Vec<Diagram>,
}

/// Transform raw reply text into renderable form: header source lines become
/// metadata, inline citations become badge segments, fenced diagram blocks
/// are extracted, and arrow-token prose falls back to flow synthesis.
///
/// Pure and infallible: malformed markers degrade to literal text.
pub fn process(raw: &str) -> ProcessedContent {
    let scanner = Scanner::new();

    let (cleaned_text, mut sources) = scanner.strip_header_sources(raw);

    let (segments, inline_names) = scanner.split_citations(&cleaned_text);
    for name in inline_names {
        if !sources.contains(&name) {
            sources.push(name);
        }
    }

    let explicit: Vec<Diagram> = scanner
        .fenced_blocks(&cleaned_text)
        .into_iter()
        .filter(|block| block.tag == "mermaid")
        .map(|block| Diagram::Explicit { source: block.content })
        .collect();

    let diagrams = if explicit.is_empty() {
        diagram::synthesize(&cleaned_text)
            .map(|spec| Diagram::Synthesized { spec })
            .into_iter()
            .collect()
    } else {
        explicit
    };

    ProcessedContent {
        cleaned_text,
        segments,
        sources,
        diagrams,
    }
}

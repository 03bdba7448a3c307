use regex::Regex;

use super::Segment;

/// A fenced code block captured from a message body, with its info-string tag.
#[derive(Debug, Clone)]
pub(crate) struct FencedBlock {
    pub tag: String,
    pub content: String,
}

/// Deterministic tokenizer for the three marker forms the post-processor
/// understands: header source lines, inline bracket citations, and fenced
/// code blocks. Malformed markers never error; they stay literal text.
pub(crate) struct Scanner {
    header_line: Regex,
    inline_citation: Regex,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            // A whole line of the form "SOURCE: name", optionally behind a
            // markdown heading prefix ("# SOURCE: a.pdf").
            header_line: Regex::new(r"(?i)^\s*#*\s*source:\s*(.+?)\s*$").unwrap(),
            inline_citation: Regex::new(r"(?i)\[\s*source:\s*([^\[\]\n]+?\.pdf)\s*\]").unwrap(),
        }
    }

    /// Remove header source lines, collecting their names in first-occurrence
    /// order. Input without any marker passes through byte-identical; once a
    /// line is removed the reassembled body is trimmed.
    pub fn strip_header_sources(&self, raw: &str) -> (String, Vec<String>) {
        let mut sources: Vec<String> = Vec::new();
        let mut kept: Vec<&str> = Vec::new();
        let mut removed = false;

        for line in raw.split('\n') {
            if let Some(caps) = self.header_line.captures(line) {
                removed = true;
                let name = caps[1].to_string();
                if !sources.contains(&name) {
                    sources.push(name);
                }
            } else {
                kept.push(line);
            }
        }

        if !removed {
            return (raw.to_string(), sources);
        }
        (kept.join("\n").trim().to_string(), sources)
    }

    /// Split a body into alternating text / citation segments, preserving all
    /// surrounding text. Returns the segments and the cited names in
    /// first-occurrence order.
    pub fn split_citations(&self, body: &str) -> (Vec<Segment>, Vec<String>) {
        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut cursor = 0;

        for caps in self.inline_citation.captures_iter(body) {
            let marker = caps.get(0).expect("match has a full capture");
            if marker.start() > cursor {
                segments.push(Segment::Text(body[cursor..marker.start()].to_string()));
            }
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name.clone());
            }
            segments.push(Segment::Citation(name));
            cursor = marker.end();
        }

        if cursor < body.len() {
            segments.push(Segment::Text(body[cursor..].to_string()));
        }

        (segments, names)
    }

    /// Collect closed fenced blocks in appearance order. An unclosed fence is
    /// not a block; its lines remain ordinary text.
    pub fn fenced_blocks(&self, body: &str) -> Vec<FencedBlock> {
        let mut blocks = Vec::new();
        let mut open_tag: Option<String> = None;
        let mut buf: Vec<&str> = Vec::new();

        for line in body.split('\n') {
            let trimmed = line.trim();
            match &open_tag {
                Some(tag) => {
                    if trimmed == "```" {
                        blocks.push(FencedBlock {
                            tag: tag.clone(),
                            content: buf.join("\n").trim().to_string(),
                        });
                        open_tag = None;
                        buf.clear();
                    } else {
                        buf.push(line);
                    }
                }
                None => {
                    if let Some(rest) = trimmed.strip_prefix("```") {
                        open_tag = Some(rest.trim().to_lowercase());
                    }
                }
            }
        }

        blocks
    }
}

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hard cap on synthesized flow length.
const MAX_NODES: usize = 20;
/// Labels longer than this are cut before hand-off to the renderer.
const MAX_LABEL_CHARS: usize = 60;
/// A label starting with one of these renders as a decision shape.
const DECISION_PREFIXES: [&str; 5] = ["yes", "no", "decision", "risk", "category"];

/// A renderable diagram attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Diagram {
    /// Verbatim source of a fenced diagram block.
    Explicit { source: String },
    /// Flow synthesized from arrow-delimited prose.
    Synthesized { spec: DiagramSpec },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramSpec {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,
    pub shape: NodeShape,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Rectangle,
    Decision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
}

impl Diagram {
    /// Source text to hand the rendering service, mermaid in both cases.
    pub fn render_source(&self) -> String {
        match self {
            Diagram::Explicit { source } => source.clone(),
            Diagram::Synthesized { spec } => spec.to_mermaid(),
        }
    }

    /// Cheap structural check before hand-off; the renderer skips anything
    /// that fails.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Diagram::Explicit { source } => {
                if source.trim().is_empty() {
                    return Err("empty diagram source".to_string());
                }
                Ok(())
            }
            Diagram::Synthesized { spec } => spec.validate(),
        }
    }
}

impl DiagramSpec {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.nodes.len() < 2 {
            return Err(format!("flow needs at least 2 nodes, got {}", self.nodes.len()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.is_empty() || node.label.is_empty() {
                return Err(format!("node {i} has an empty id or label"));
            }
            if self.nodes[..i].iter().any(|n| n.id == node.id) {
                return Err(format!("duplicate node id {}", node.id));
            }
        }
        for edge in &self.edges {
            let known = |id: &str| self.nodes.iter().any(|n| n.id == id);
            if !known(&edge.from) || !known(&edge.to) {
                return Err(format!("edge {} -> {} references an unknown node", edge.from, edge.to));
            }
        }
        Ok(())
    }

    /// Deterministic `graph TD` emission for the rendering service.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        for node in &self.nodes {
            let label = node.label.replace('"', "'");
            match node.shape {
                NodeShape::Decision => out.push_str(&format!("    {}{{\"{}\"}}\n", node.id, label)),
                NodeShape::Rectangle => out.push_str(&format!("    {}[\"{}\"]\n", node.id, label)),
            }
        }
        for edge in &self.edges {
            out.push_str(&format!("    {} --> {}\n", edge.from, edge.to));
        }
        out
    }
}

/// Heuristic flow synthesis for replies with no explicit diagram block.
/// Splits the body on arrow tokens into a strictly linear chain. Identical
/// input always yields identical ids, shapes, and edges.
pub(crate) fn synthesize(body: &str) -> Option<DiagramSpec> {
    let arrow = Regex::new(r"->|=>").unwrap();
    let flow_keyword = Regex::new(r"(?i)\b(start|end|decision)\b").unwrap();

    if !arrow.is_match(body) && !flow_keyword.is_match(body) {
        return None;
    }

    let mut nodes: Vec<DiagramNode> = Vec::new();
    for fragment in arrow.split(body) {
        if nodes.len() == MAX_NODES {
            break;
        }
        let label = clean_label(fragment);
        if label.is_empty() {
            continue;
        }
        nodes.push(DiagramNode {
            id: format!("n{}", nodes.len() + 1),
            shape: classify(&label),
            label,
        });
    }

    if nodes.len() < 2 {
        return None;
    }

    let edges = nodes
        .windows(2)
        .map(|pair| DiagramEdge {
            from: pair[0].id.clone(),
            to: pair[1].id.clone(),
        })
        .collect();

    Some(DiagramSpec { nodes, edges })
}

fn clean_label(fragment: &str) -> String {
    let stripped: String = fragment
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')' | '{' | '}' | '<' | '>'))
        .filter(|c| !matches!(c, '*' | '_' | '`' | '~'))
        .collect();
    stripped.trim().chars().take(MAX_LABEL_CHARS).collect()
}

fn classify(label: &str) -> NodeShape {
    let lowered = label.to_lowercase();
    if DECISION_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        NodeShape::Decision
    } else {
        NodeShape::Rectangle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_with_decision_shape() {
        let spec = synthesize("Start -> Plan -> Decision -> End").unwrap();
        assert_eq!(spec.nodes.len(), 4);
        assert_eq!(spec.edges.len(), 3);
        assert_eq!(spec.nodes[2].shape, NodeShape::Decision);
        assert_eq!(spec.nodes[0].id, "n1");
        assert_eq!(spec.edges[0].from, "n1");
        assert_eq!(spec.edges[0].to, "n2");
    }

    #[test]
    fn single_fragment_aborts() {
        assert!(synthesize("Start with nothing at all").is_none());
    }

    #[test]
    fn no_trigger_yields_nothing() {
        assert!(synthesize("plain prose without any markers").is_none());
    }

    #[test]
    fn caps_at_twenty_nodes() {
        let body = (0..40).map(|i| format!("step {i}")).collect::<Vec<_>>().join(" -> ");
        let spec = synthesize(&body).unwrap();
        assert_eq!(spec.nodes.len(), 20);
        assert_eq!(spec.edges.len(), 19);
    }

    #[test]
    fn labels_are_cleaned_and_truncated() {
        let long = "x".repeat(100);
        let spec = synthesize(&format!("[Start] *here* -> {long}")).unwrap();
        assert_eq!(spec.nodes[0].label, "Start here");
        assert_eq!(spec.nodes[1].label.chars().count(), 60);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let body = "Start -> Plan -> Decision -> End";
        assert_eq!(synthesize(body), synthesize(body));
    }

    #[test]
    fn mermaid_emission_uses_shapes() {
        let spec = synthesize("Start -> Decision time -> End").unwrap();
        let mermaid = spec.to_mermaid();
        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("n1[\"Start\"]"));
        assert!(mermaid.contains("n2{\"Decision time\"}"));
        assert!(mermaid.contains("n1 --> n2"));
    }

    #[test]
    fn validate_rejects_dangling_edges() {
        let spec = DiagramSpec {
            nodes: vec![
                DiagramNode { id: "n1".into(), shape: NodeShape::Rectangle, label: "a".into() },
                DiagramNode { id: "n2".into(), shape: NodeShape::Rectangle, label: "b".into() },
            ],
            edges: vec![DiagramEdge { from: "n1".into(), to: "n9".into() }],
        };
        assert!(spec.validate().is_err());
    }
}

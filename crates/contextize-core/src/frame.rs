#![forbid(unsafe_code)]

//! Committed output of a render pass.

use std::fmt;

use v_htmlescape::escape;

use crate::element::Callback;

/// A host node in a committed [`Frame`].
#[derive(Clone, Debug, PartialEq)]
pub struct HostNode {
    /// Host tag, e.g. `p` or `button`.
    pub name: &'static str,
    /// Child nodes in order.
    pub children: Vec<Node>,
    /// Click handler, if any.
    pub on_click: Option<Callback>,
}

/// One node of committed output.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A text leaf.
    Text(String),
    /// A host node.
    Host(HostNode),
}

impl Node {
    /// Concatenated text of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Host(host) => host.children.iter().for_each(|c| c.collect_text(out)),
        }
    }

    fn is_block(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Host(host) => !host.children.iter().any(|c| matches!(c, Self::Host(_))),
        }
    }

    fn collect_lines(&self, out: &mut Vec<String>) {
        match self {
            Self::Text(text) => out.push(text.clone()),
            Self::Host(_) if self.is_block() => out.push(self.text_content()),
            Self::Host(host) => host.children.iter().for_each(|c| c.collect_lines(out)),
        }
    }

    fn write_markup(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        match self {
            Self::Text(text) => writeln!(f, "{:indent$}{}", "", escape(text)),
            Self::Host(host) if self.is_block() => {
                let text = self.text_content();
                writeln!(f, "{:indent$}<{name}>{}</{name}>", "", escape(&text), name = host.name)
            }
            Self::Host(host) => {
                writeln!(f, "{:indent$}<{}>", "", host.name)?;
                for child in &host.children {
                    child.write_markup(f, depth + 1)?;
                }
                writeln!(f, "{:indent$}</{}>", "", host.name)
            }
        }
    }

    fn find_button(&self, label: &str) -> Option<&Callback> {
        match self {
            Self::Text(_) => None,
            Self::Host(host) => {
                if host.name == "button"
                    && self.text_content().contains(label)
                    && let Some(callback) = &host.on_click
                {
                    return Some(callback);
                }
                host.children.iter().find_map(|c| c.find_button(label))
            }
        }
    }
}

/// The host tree produced by the latest committed pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    nodes: Vec<Node>,
}

impl Frame {
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Top-level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Text of every leaf block, in document order.
    ///
    /// A host node without host children counts as one line; bare text
    /// leaves elsewhere are a line each.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_lines(&mut out);
        }
        out
    }

    /// Whether some line equals `line` exactly.
    #[must_use]
    pub fn has_line(&self, line: &str) -> bool {
        self.lines().iter().any(|l| l == line)
    }

    /// First button whose text contains `label`.
    #[must_use]
    pub fn find_button(&self, label: &str) -> Option<Callback> {
        self.nodes.iter().find_map(|n| n.find_button(label)).cloned()
    }

    /// Whether nothing was rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            node.write_markup(f, 0)?;
        }
        Ok(())
    }
}

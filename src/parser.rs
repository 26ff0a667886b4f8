//! Parsing of clink output into links and changes.
//!
//! Grammar of the lines we read:
//!
//! ```text
//! record := "(" id ":" source target ")"
//! side   := "()" | "((" record "))"
//! change := side side
//! ```

use crate::error::LinksError;
use crate::types::{Change, Link};

/// A parsed Links Notation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Atom(String),
    List(Vec<Node>),
}

impl Node {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Node::Atom(a) => Some(a),
            Node::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            Node::Atom(_) => None,
        }
    }
}

/// Parse a line into its top-level expressions.
pub fn parse_nodes(text: &str) -> Result<Vec<Node>, String> {
    let mut stack: Vec<Vec<Node>> = vec![Vec::new()];
    let mut atom = String::new();

    fn flush(atom: &mut String, stack: &mut [Vec<Node>]) {
        if !atom.is_empty()
            && let Some(top) = stack.last_mut()
        {
            top.push(Node::Atom(std::mem::take(atom)));
        }
    }

    for c in text.chars() {
        match c {
            '(' => {
                flush(&mut atom, &mut stack);
                stack.push(Vec::new());
            }
            ')' => {
                flush(&mut atom, &mut stack);
                if stack.len() < 2 {
                    return Err(format!("unbalanced ')' in {:?}", text));
                }
                let items = stack.pop().unwrap_or_default();
                if let Some(top) = stack.last_mut() {
                    top.push(Node::List(items));
                }
            }
            c if c.is_whitespace() => flush(&mut atom, &mut stack),
            c => atom.push(c),
        }
    }
    flush(&mut atom, &mut stack);

    if stack.len() != 1 {
        return Err(format!("unbalanced '(' in {:?}", text));
    }
    Ok(stack.pop().unwrap_or_default())
}

fn parse_number(atom: &str) -> Option<u64> {
    atom.parse().ok()
}

/// Interpret `(id: source target)`.
pub fn link_from_node(node: &Node) -> Option<Link> {
    let [id, source, target] = node.as_list()? else {
        return None;
    };
    let id = parse_number(id.as_atom()?.strip_suffix(':')?)?;
    let source = parse_number(source.as_atom()?)?;
    let target = parse_number(target.as_atom()?)?;
    Some(Link { id, source, target })
}

/// Parse a single record line such as `(1: 100 200)`.
pub fn parse_link(line: &str) -> Option<Link> {
    match parse_nodes(line.trim()).ok()?.as_slice() {
        [node] => link_from_node(node),
        _ => None,
    }
}

/// Lazily yield the link records of a state listing, skipping other lines.
pub fn links(output: &str) -> impl Iterator<Item = Link> + '_ {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let link = parse_link(line);
            if link.is_none() {
                log::debug!("Skipping non-record line: {}", line);
            }
            link
        })
}

/// Parse a state listing (`--after`) into links.
pub fn parse_links(output: &str) -> Vec<Link> {
    links(output).collect()
}

/// One side of a change line: `()` or `((record))`.
fn side_from_node(node: &Node) -> Option<Option<Link>> {
    match node.as_list()? {
        [] => Some(None),
        [inner] => link_from_node(inner).map(Some),
        _ => None,
    }
}

/// Parse a single change line.
pub fn parse_change(line: &str) -> Result<Change, LinksError> {
    let nodes = parse_nodes(line.trim()).map_err(LinksError::Parse)?;
    let [before, after] = nodes.as_slice() else {
        return Err(LinksError::Parse(format!("expected two sides in change {:?}", line)));
    };
    match (side_from_node(before), side_from_node(after)) {
        (Some(before), Some(after)) if before.is_some() || after.is_some() => Ok(Change { before, after }),
        _ => Err(LinksError::Parse(format!("malformed change {:?}", line))),
    }
}

/// Parse a `--changes` listing.
pub fn parse_changes(output: &str) -> Result<Vec<Change>, LinksError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_change)
        .collect()
}

//! Shared test infrastructure for links-client integration tests.
//!
//! Provides an in-memory stand-in for the clink binary and a TestEnv
//! helper for consistent test setup/teardown.

#![allow(dead_code)]

use eyre::{Result, bail};
use links_client::parser::{Node, parse_nodes};
use links_client::{
    AuthStorageService, Capability, Executor, Link, LinkDbService, Links, LinksError, MenuStorageService, QueryFlags,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

/// One position of a query pattern.
#[derive(Debug, Clone)]
enum Term {
    Value(u64),
    Var(String),
    Wildcard,
}

impl Term {
    fn parse(atom: &str) -> Result<Self> {
        let atom = atom.trim_end_matches(':');
        if atom == "*" {
            Ok(Term::Wildcard)
        } else if let Some(name) = atom.strip_prefix('$') {
            Ok(Term::Var(name.to_string()))
        } else {
            Ok(Term::Value(atom.parse()?))
        }
    }

    fn bind(&self, value: u64, vars: &mut HashMap<String, u64>) -> bool {
        match self {
            Term::Value(v) => *v == value,
            Term::Wildcard => true,
            Term::Var(name) => *vars.entry(name.clone()).or_insert(value) == value,
        }
    }

    fn resolve(&self, vars: &HashMap<String, u64>) -> Option<u64> {
        match self {
            Term::Value(v) => Some(*v),
            Term::Var(name) => vars.get(name).copied(),
            Term::Wildcard => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    id: Term,
    source: Term,
    target: Term,
}

impl Pattern {
    fn parse(node: &Node) -> Result<Self> {
        let atoms: Vec<&str> = match node.as_list() {
            Some(items) => items.iter().filter_map(Node::as_atom).collect(),
            None => bail!("pattern must be a list: {:?}", node),
        };
        match atoms.as_slice() {
            [id, source, target] if id.ends_with(':') => Ok(Pattern {
                id: Term::parse(id)?,
                source: Term::parse(source)?,
                target: Term::parse(target)?,
            }),
            [source, target] => Ok(Pattern {
                id: Term::Wildcard,
                source: Term::parse(source)?,
                target: Term::parse(target)?,
            }),
            _ => bail!("unsupported pattern: {:?}", node),
        }
    }

    fn bind(&self, link: &Link) -> Option<HashMap<String, u64>> {
        let mut vars = HashMap::new();
        (self.id.bind(link.id, &mut vars)
            && self.source.bind(link.source, &mut vars)
            && self.target.bind(link.target, &mut vars))
        .then_some(vars)
    }
}

/// `()` or `((pattern))`.
fn side(node: &Node) -> Result<Option<Pattern>> {
    match node.as_list() {
        Some([]) => Ok(None),
        Some([pattern]) => Ok(Some(Pattern::parse(pattern)?)),
        _ => bail!("unsupported query side: {:?}", node),
    }
}

fn format_side(link: Option<&Link>) -> String {
    link.map(|l| format!("({})", l)).unwrap_or_else(|| "()".to_string())
}

#[derive(Debug, Default)]
struct FakeState {
    links: Vec<Link>,
    next_id: u64,
    calls: Vec<(String, QueryFlags)>,
    unavailable: bool,
}

/// In-memory clink: understands the substitution queries the crate emits
/// and prints `--changes` / `--after` output in clink's format.
#[derive(Debug, Clone, Default)]
pub struct FakeClink {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Current store contents in id order.
    pub fn links(&self) -> Vec<Link> {
        self.state().links.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn last_query(&self) -> Option<String> {
        self.state().calls.last().map(|(q, _)| q.clone())
    }

    /// Make every call fail as if clink were not installed.
    pub fn set_unavailable(&self) {
        self.state().unavailable = true;
    }

    /// Insert a link directly, bypassing the query path.
    pub fn insert(&self, source: u64, target: u64) -> Link {
        let mut state = self.state();
        state.next_id += 1;
        let link = Link::new(state.next_id, source, target);
        state.links.push(link);
        link
    }

    fn apply(state: &mut FakeState, query: &str) -> Result<Vec<(Option<Link>, Option<Link>)>> {
        let nodes = parse_nodes(query).map_err(|e| eyre::eyre!(e))?;
        let (lhs, rhs) = match nodes.as_slice() {
            [lhs, rhs] => (lhs, rhs),
            [Node::List(inner)] if inner.len() == 2 => (&inner[0], &inner[1]),
            _ => bail!("unsupported query: {}", query),
        };

        let mut changes = Vec::new();
        match (side(lhs)?, side(rhs)?) {
            (None, Some(create)) => {
                let vars = HashMap::new();
                let (Some(source), Some(target)) = (create.source.resolve(&vars), create.target.resolve(&vars)) else {
                    bail!("create needs literal values: {}", query);
                };
                state.next_id += 1;
                let link = Link::new(state.next_id, source, target);
                state.links.push(link);
                changes.push((None, Some(link)));
            }
            (Some(matching), Some(replacement)) => {
                for link in state.links.iter_mut() {
                    let Some(vars) = matching.bind(link) else {
                        continue;
                    };
                    let updated = Link::new(
                        link.id,
                        replacement.source.resolve(&vars).unwrap_or(link.source),
                        replacement.target.resolve(&vars).unwrap_or(link.target),
                    );
                    if updated != *link {
                        changes.push((Some(*link), Some(updated)));
                        *link = updated;
                    }
                }
            }
            (Some(matching), None) => {
                let (deleted, kept): (Vec<Link>, Vec<Link>) =
                    state.links.iter().partition(|l| matching.bind(l).is_some());
                state.links = kept;
                changes.extend(deleted.into_iter().map(|l| (Some(l), None)));
            }
            (None, None) => {}
        }
        Ok(changes)
    }
}

impl Executor for FakeClink {
    fn execute(&self, query: &str, flags: QueryFlags) -> Result<String> {
        let mut state = self.state();
        state.calls.push((query.to_string(), flags));
        if state.unavailable {
            return Err(eyre::eyre!(LinksError::ToolNotFound {
                program: "clink".to_string(),
            }));
        }

        let changes = Self::apply(&mut state, query).map_err(|e| {
            eyre::eyre!(LinksError::ProcessFailed {
                code: Some(1),
                stderr: e.to_string(),
            })
        })?;

        let mut lines = Vec::new();
        if flags.changes {
            for (before, after) in &changes {
                lines.push(format!("{} {}", format_side(before.as_ref()), format_side(after.as_ref())));
            }
        }
        if flags.after {
            lines.extend(state.links.iter().map(|l| l.to_string()));
        }
        Ok(lines.join("\n"))
    }

    fn health_check(&self) -> Capability {
        if self.state().unavailable {
            Capability::unavailable("clink", "clink command not found")
        } else {
            Capability::available("clink", Some("fake".to_string()))
        }
    }
}

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub fake: FakeClink,
    pub auth_fake: FakeClink,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            fake: FakeClink::new(),
            auth_fake: FakeClink::new(),
        }
    }

    pub fn link_db(&self) -> LinkDbService {
        LinkDbService::with_executor(Box::new(self.fake.clone()))
    }

    pub fn links(&self) -> Links {
        Links::with_executor(Box::new(self.fake.clone()))
    }

    pub fn menu(&self) -> MenuStorageService {
        MenuStorageService::with_link_db(self.link_db(), self.temp_dir.path().join("menu-items"))
            .expect("Failed to open menu storage")
    }

    pub fn auth(&self) -> AuthStorageService {
        let link_db = LinkDbService::with_executor(Box::new(self.auth_fake.clone()));
        AuthStorageService::with_link_db(link_db, self.temp_dir.path().join("auth-data"))
            .expect("Failed to open auth storage")
    }

    /// Create a link through the service.
    pub fn create(&self, source: u64, target: u64) -> Link {
        self.link_db()
            .create_link(source, target)
            .expect("Failed to create link")
    }

    pub fn stored(&self) -> Vec<Link> {
        self.fake.links()
    }

    /// Files in a data subdirectory.
    pub fn file_count(&self, subdir: &str) -> usize {
        std::fs::read_dir(self.temp_dir.path().join(subdir))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// The typed error inside a report; panics when there is none.
pub fn links_error(report: &eyre::Report) -> &LinksError {
    LinksError::from_report(report).unwrap_or_else(|| panic!("untyped error: {:#}", report))
}

//! CRUD facade over the link store.

use crate::config::LinksConfig;
use crate::error::LinksError;
use crate::parser;
use crate::process::{Capability, Clink, Executor};
use crate::query::{self, QueryFlags};
use crate::types::{Link, Restriction, Substitution};
use eyre::{Context, Result};
use std::path::PathBuf;

/// Service for create/read/update/delete of links by id.
pub struct LinkDbService {
    executor: Box<dyn Executor>,
}

impl LinkDbService {
    /// Service backed by clink on the given database file.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let config = LinksConfig::default().with_db_path(db_path);
        Self::from_config(&config)
    }

    pub fn from_config(config: &LinksConfig) -> Self {
        Self::with_executor(Box::new(Clink::from_config(config)))
    }

    pub fn with_executor(executor: Box<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Run a raw query.
    pub fn execute_query(&self, query: &str, flags: QueryFlags) -> Result<String> {
        self.executor.execute(query, flags)
    }

    /// Probe the backing tool.
    pub fn health_check(&self) -> Capability {
        self.executor.health_check()
    }

    /// Create a new link.
    pub fn create_link(&self, source: u64, target: u64) -> Result<Link> {
        let output = self.execute_query(&query::create(source, target), QueryFlags::CHANGES)?;

        let changes = parser::parse_changes(&output).map_err(|e| eyre::eyre!(e))?;
        let link = changes
            .iter()
            .find_map(|c| c.after.filter(|_| c.before.is_none()))
            .ok_or_else(|| eyre::eyre!(LinksError::Parse(format!("no created link in {:?}", output))))?;

        log::debug!("Created link {}", link);
        Ok(link)
    }

    /// Read all links in store order.
    pub fn read_all_links(&self) -> Result<Vec<Link>> {
        self.read_links(&Restriction::any())
    }

    /// Read links matching a restriction.
    pub fn read_links(&self, restriction: &Restriction) -> Result<Vec<Link>> {
        let output = self.execute_query(&query::read(restriction), QueryFlags::AFTER)?;
        // --after lists the whole store; keep only the matches
        Ok(parser::links(&output).filter(|l| restriction.matches(l)).collect())
    }

    /// Read a link by id.
    pub fn read_link(&self, id: u64) -> Result<Option<Link>> {
        Ok(self.read_links(&Restriction::by_id(id))?.into_iter().next())
    }

    /// Point an existing link at a new source and target.
    pub fn update_link(&self, id: u64, source: u64, target: u64) -> Result<Link> {
        let restriction = Restriction::by_id(id);
        let substitution = Substitution { id, source, target };
        let q = query::update(&restriction, &substitution).map_err(|e| eyre::eyre!(LinksError::from(e)))?;
        let output = self.execute_query(&q, QueryFlags::CHANGES)?;

        let changes = parser::parse_changes(&output).map_err(|e| eyre::eyre!(e))?;
        if let Some(after) = changes.iter().filter_map(|c| c.after).find(|l| l.id == id) {
            return Ok(after);
        }

        // No change reported: either a no-op or a missing link
        match self.read_link(id).context("Failed to confirm update")? {
            Some(link) if link.source == source && link.target == target => Ok(link),
            _ => Err(eyre::eyre!(LinksError::NotFound(format!("link {} not found", id)))),
        }
    }

    /// Delete a link; deleting a missing id is a no-op.
    pub fn delete_link(&self, id: u64) -> Result<()> {
        let output = self.execute_query(&query::delete(&Restriction::by_id(id)), QueryFlags::CHANGES)?;
        let changes = parser::parse_changes(&output).map_err(|e| eyre::eyre!(e))?;
        if changes.is_empty() {
            log::debug!("delete_link: link {} did not exist", id);
        }
        Ok(())
    }

    /// Delete every link; returns how many were removed.
    pub fn clear_database(&self) -> Result<usize> {
        let output = self.execute_query(&query::delete_all(), QueryFlags::CHANGES)?;
        let changes = parser::parse_changes(&output)
            .map_err(|e| eyre::eyre!(e))
            .context("Failed to clear database")?;
        Ok(changes.iter().filter(|c| c.after.is_none()).count())
    }
}

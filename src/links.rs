//! Flat links API mirroring clink's primitive verbs.
//!
//! Operations take positional restriction and substitution slices
//! (`[id, source, target]`, `ANY` as wildcard) and report mutations to an
//! optional [`ChangeHandler`].

use crate::config::LinksConfig;
use crate::error::LinksError;
use crate::parser;
use crate::process::{Capability, Clink, Executor};
use crate::query::{self, QueryFlags};
use crate::types::{Change, ChangeHandler, Flow, Link, Restriction, Substitution, ValidationError};
use eyre::Result;
use std::path::PathBuf;

/// Message of the not-found error raised by update and delete.
const NO_MATCH: &str = "No links found matching restriction";

/// The flat links API.
pub struct Links {
    executor: Box<dyn Executor>,
}

fn validation(e: ValidationError) -> eyre::Report {
    eyre::eyre!(LinksError::Validation(e))
}

fn restriction_for(restriction: Option<&[u64]>) -> Result<Restriction> {
    match restriction {
        Some(values) => Restriction::from_slice(values).map_err(validation),
        None => Ok(Restriction::any()),
    }
}

fn required_restriction(restriction: Option<&[u64]>, op: &'static str) -> Result<Restriction> {
    let values = restriction.ok_or_else(|| validation(ValidationError::RestrictionRequired(op)))?;
    Restriction::from_slice(values).map_err(validation)
}

fn notify(handler: &mut Option<&mut dyn ChangeHandler>, change: &Change) {
    if let Some(handler) = handler.as_deref_mut() {
        handler.handle(change);
    }
}

impl Links {
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

    pub fn health_check(&self) -> Capability {
        self.executor.health_check()
    }

    /// Create a link from `[source, target]`; returns its id.
    pub fn create(&self, substitution: &[u64], mut handler: Option<&mut dyn ChangeHandler>) -> Result<u64> {
        let substitution = Substitution::from_slice(substitution).map_err(validation)?;
        let output = self.executor.execute(
            &query::create(substitution.source, substitution.target),
            QueryFlags::CHANGES,
        )?;

        let link = parser::parse_changes(&output)
            .map_err(|e| eyre::eyre!(e))?
            .into_iter()
            .find_map(|c| c.after.filter(|_| c.before.is_none()))
            .ok_or_else(|| eyre::eyre!(LinksError::Parse(format!("no created link in {:?}", output))))?;

        notify(&mut handler, &Change::created(link));
        Ok(link.id)
    }

    /// Number of links matching the restriction; all links when `None`.
    pub fn count(&self, restriction: Option<&[u64]>) -> Result<u64> {
        let mut count = 0;
        self.each(restriction, |_| {
            count += 1;
            Flow::Continue
        })?;
        Ok(count)
    }

    /// Visit matching links in store order until the callback breaks.
    pub fn each<F>(&self, restriction: Option<&[u64]>, mut callback: F) -> Result<Flow>
    where
        F: FnMut(&Link) -> Flow,
    {
        let restriction = restriction_for(restriction)?;
        let output = self.executor.execute(&query::read(&restriction), QueryFlags::AFTER)?;

        for link in parser::links(&output).filter(|l| restriction.matches(l)) {
            if callback(&link) == Flow::Break {
                return Ok(Flow::Break);
            }
        }
        Ok(Flow::Continue)
    }

    /// Rewrite links matching the restriction; returns the first updated id.
    pub fn update(
        &self,
        restriction: Option<&[u64]>,
        substitution: &[u64],
        mut handler: Option<&mut dyn ChangeHandler>,
    ) -> Result<u64> {
        let restriction = required_restriction(restriction, "update")?;
        let substitution = Substitution::from_slice(substitution).map_err(validation)?;
        let q = query::update(&restriction, &substitution).map_err(validation)?;

        let output = self.executor.execute(&q, QueryFlags::CHANGES)?;
        let changes = parser::parse_changes(&output).map_err(|e| eyre::eyre!(e))?;

        if changes.is_empty() {
            // Nothing changed: a no-op rewrite still counts if something matched
            let mut first = None;
            let pattern = [restriction.id, restriction.source, restriction.target];
            self.each(Some(&pattern[..]), |link| {
                first = Some(*link);
                Flow::Break
            })?;
            let link = first.ok_or_else(|| eyre::eyre!(LinksError::NotFound(NO_MATCH.to_string())))?;
            notify(&mut handler, &Change::updated(link, link));
            return Ok(link.id);
        }

        for change in &changes {
            notify(&mut handler, change);
        }
        changes
            .iter()
            .find_map(Change::id)
            .ok_or_else(|| eyre::eyre!(LinksError::Parse(format!("change without link in {:?}", output))))
    }

    /// Delete links matching the restriction; returns the first deleted id.
    pub fn delete(&self, restriction: Option<&[u64]>, mut handler: Option<&mut dyn ChangeHandler>) -> Result<u64> {
        let restriction = required_restriction(restriction, "delete")?;
        let output = self.executor.execute(&query::delete(&restriction), QueryFlags::CHANGES)?;

        let deleted: Vec<Link> = parser::parse_changes(&output)
            .map_err(|e| eyre::eyre!(e))?
            .into_iter()
            .filter(|c| c.after.is_none())
            .filter_map(|c| c.before)
            .collect();

        let first = deleted
            .first()
            .map(|l| l.id)
            .ok_or_else(|| eyre::eyre!(LinksError::NotFound(NO_MATCH.to_string())))?;

        for link in deleted {
            notify(&mut handler, &Change::deleted(link));
        }
        Ok(first)
    }
}

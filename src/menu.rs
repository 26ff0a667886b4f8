//! Menu trees stored as links plus JSON payload files.
//!
//! Encoding:
//! - every node is the link `(itemId parentId)`, `parentId = 0` for roots
//! - the node without its children is written to `<menu-items>/<itemId>.json`
//! - `itemId` hashes the node content with its parent and sibling position
//! - sibling order is the order clink lists links in (creation order)

use crate::config::LinksConfig;
use crate::id::menu_item_id;
use crate::link_db::LinkDbService;
use crate::storage::JsonDir;
use crate::types::Link;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Parent id of root-level items.
pub const ROOT: u64 = 0;

/// A node of a menu tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Route the item navigates to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItem>,

    /// Any other fields, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_items(mut self, items: Vec<MenuItem>) -> Self {
        self.items = items;
        self
    }

    /// The node without its children, as persisted in the payload file.
    fn payload(&self) -> MenuItem {
        MenuItem {
            items: Vec::new(),
            ..self.clone()
        }
    }
}

/// A stored item with its link coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub link_id: u64,
    pub item_id: u64,
    pub parent_id: u64,
    pub item: MenuItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuStatistics {
    pub total_links: usize,
    pub total_files: usize,
    pub root_items: usize,
}

/// Id a menu item gets at the given place in the tree.
pub fn generate_item_id(item: &MenuItem, parent_id: u64, position: usize) -> Result<u64> {
    let content = serde_json::to_string(&item.payload()).context("Failed to serialize menu item")?;
    Ok(menu_item_id(&content, parent_id, position))
}

/// Item ids below `parent_id` in a single pass over `links`, depth first.
fn subtree(links: &[Link], parent_id: u64, visited: &mut HashSet<u64>, out: &mut Vec<u64>) {
    for link in links.iter().filter(|l| l.target == parent_id) {
        if visited.insert(link.source) {
            out.push(link.source);
            subtree(links, link.source, visited, out);
        }
    }
}

/// Stores menu configurations using the link database.
pub struct MenuStorageService {
    link_db: LinkDbService,
    items: JsonDir,
}

impl MenuStorageService {
    pub fn new(config: &LinksConfig) -> Result<Self> {
        Self::with_link_db(LinkDbService::from_config(config), config.menu_dir())
    }

    pub fn with_link_db(link_db: LinkDbService, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let items = JsonDir::open(data_dir).context("Failed to open menu items directory")?;
        log::info!("Menu items data directory: {}", items.path().display());
        Ok(Self { link_db, items })
    }

    pub fn link_db(&self) -> &LinkDbService {
        &self.link_db
    }

    fn existing_pairs(&self) -> Result<HashSet<(u64, u64)>> {
        Ok(self
            .link_db
            .read_all_links()?
            .into_iter()
            .map(|l| (l.source, l.target))
            .collect())
    }

    fn store_item(
        &self,
        item: &MenuItem,
        parent_id: u64,
        position: usize,
        existing: &mut HashSet<(u64, u64)>,
    ) -> Result<u64> {
        let item_id = generate_item_id(item, parent_id, position)?;
        self.items
            .save(&item_id.to_string(), &item.payload())
            .wrap_err_with(|| format!("Failed to save menu item {}", item_id))?;

        if existing.insert((item_id, parent_id)) {
            let link = self.link_db.create_link(item_id, parent_id)?;
            log::info!(
                "Menu item stored in link database: itemId={}, parentId={}, link={}",
                item_id,
                parent_id,
                link.id
            );
        } else {
            log::debug!("Link already exists: itemId={}, parentId={}", item_id, parent_id);
        }
        Ok(item_id)
    }

    /// Store a single item (without its children) under `parent_id`.
    pub fn store_menu_item(&self, item: &MenuItem, parent_id: u64, position: usize) -> Result<u64> {
        let mut existing = self.existing_pairs()?;
        self.store_item(item, parent_id, position, &mut existing)
    }

    fn store_items(&self, items: &[MenuItem], parent_id: u64, existing: &mut HashSet<(u64, u64)>) -> Result<Vec<u64>> {
        let mut ids = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let item_id = self.store_item(item, parent_id, position, existing)?;
            ids.push(item_id);
            if !item.items.is_empty() {
                self.store_items(&item.items, item_id, existing)?;
            }
        }
        Ok(ids)
    }

    /// Store a menu tree recursively; returns the ids of the top-level items.
    pub fn store_menu_structure(&self, items: &[MenuItem], parent_id: u64) -> Result<Vec<u64>> {
        let mut existing = self.existing_pairs()?;
        self.store_items(items, parent_id, &mut existing)
    }

    fn build(&self, links: &[Link], parent_id: u64, visited: &mut HashSet<u64>) -> Result<Vec<MenuItem>> {
        let mut items = Vec::new();
        for link in links.iter().filter(|l| l.target == parent_id) {
            let item_id = link.source;
            if !visited.insert(item_id) {
                log::warn!("Menu cycle or shared node at itemId={}, skipping", item_id);
                continue;
            }
            match self.items.load::<MenuItem>(&item_id.to_string())? {
                Some(mut item) => {
                    item.items = self.build(links, item_id, visited)?;
                    items.push(item);
                }
                None => log::debug!("No menu data for link {}, skipping", link),
            }
        }
        Ok(items)
    }

    /// Rebuild the tree below `parent_id` in stored order.
    pub fn get_menu_structure(&self, parent_id: u64) -> Result<Vec<MenuItem>> {
        let links = self.link_db.read_all_links()?;
        let mut visited = HashSet::from([parent_id]);
        self.build(&links, parent_id, &mut visited)
    }

    /// Every stored item with its link coordinates, flat.
    pub fn get_all_menu_items(&self) -> Result<Vec<MenuEntry>> {
        let mut entries = Vec::new();
        for link in self.link_db.read_all_links()? {
            if let Some(item) = self.items.load::<MenuItem>(&link.source.to_string())? {
                entries.push(MenuEntry {
                    link_id: link.id,
                    item_id: link.source,
                    parent_id: link.target,
                    item,
                });
            }
        }
        Ok(entries)
    }

    /// Delete an item, its descendants, their links and their files.
    pub fn delete_menu_item(&self, item_id: u64) -> Result<()> {
        let links = self.link_db.read_all_links()?;

        let mut doomed = vec![item_id];
        let mut visited = HashSet::from([item_id]);
        subtree(&links, item_id, &mut visited, &mut doomed);
        let doomed: HashSet<u64> = doomed.into_iter().collect();

        for link in links.iter().filter(|l| doomed.contains(&l.source)) {
            self.link_db.delete_link(link.id)?;
        }
        for id in &doomed {
            if let Err(e) = self.items.remove(&id.to_string()) {
                log::warn!("Failed to delete item data file: itemId={}, error={:#}", id, e);
            }
        }
        Ok(())
    }

    /// Remove every menu link and payload file; other links are left alone.
    pub fn clear_all_menus(&self) -> Result<()> {
        let stored: HashSet<u64> = self.items.keys()?.iter().filter_map(|k| k.parse().ok()).collect();
        for link in self.link_db.read_all_links()? {
            if stored.contains(&link.source) {
                self.link_db.delete_link(link.id)?;
            }
        }
        self.items.clear().context("Failed to clear menu data files")?;
        Ok(())
    }

    pub fn get_statistics(&self) -> Result<MenuStatistics> {
        let links = self.link_db.read_all_links()?;
        Ok(MenuStatistics {
            total_links: links.len(),
            total_files: self.items.count()?,
            root_items: links.iter().filter(|l| l.target == ROOT).count(),
        })
    }
}

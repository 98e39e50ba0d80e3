//! Rotatable items and the ordered lists they arrive in

use std::collections::HashSet;

use crate::aircraft::Aircraft;
use crate::news::Headline;

/// Screen-specific metadata carried by an item
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemMeta {
    #[default]
    None,
    Headline(Headline),
    Picture { title: Option<String> },
    Aircraft(Aircraft),
}

/// One unit of rotatable content
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Stable key within one fetched list (filename, timestamp, mode-S id)
    pub id: String,
    /// How to materialize the media (http(s) or `data:` URL); may be empty
    pub source_url: String,
    /// Epoch seconds shown alongside the item
    pub display_timestamp: Option<i64>,
    /// Server-controlled visibility flag
    pub visible: bool,
    pub like_count: Option<u32>,
    pub meta: ItemMeta,
}

impl Item {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            display_timestamp: None,
            visible: true,
            like_count: None,
            meta: ItemMeta::None,
        }
    }

    pub fn with_timestamp(mut self, epoch_secs: i64) -> Self {
        self.display_timestamp = Some(epoch_secs);
        self
    }

    pub fn with_meta(mut self, meta: ItemMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// Ordered item sequence, in server order, with unique ids
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemList {
    items: Vec<Item>,
}

impl ItemList {
    /// Build a list, dropping any item whose id repeats an earlier one
    pub fn new(items: Vec<Item>) -> Self {
        let mut seen = HashSet::with_capacity(items.len());
        let total = items.len();
        let items: Vec<Item> = items
            .into_iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        if items.len() != total {
            tracing::warn!(
                "Dropped {} items with duplicate ids",
                total - items.len()
            );
        }

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Index of the item with this id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Apply a targeted field update to one item. Returns false if absent.
    pub fn patch(&mut self, id: &str, update: impl FnOnce(&mut Item)) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }
}

impl From<Vec<Item>> for ItemList {
    fn from(items: Vec<Item>) -> Self {
        ItemList::new(items)
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

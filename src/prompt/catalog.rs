use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A reusable prompt published in the shared catalog, addressable by its
/// six-character id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: String,
    pub text: String,
    pub secret: bool,
    pub private: bool,
    pub cost: u32,
    pub allow_list: Vec<String>,
    pub creator: String,
    pub thumbnail: Option<String>,
}

impl PromptEntry {
    /// Access rule: public entries are open to everyone, secret non-private
    /// entries are open at a credit cost, secret private entries only to
    /// users on the allow list.
    pub fn accessible_to(&self, user: &str) -> bool {
        if !self.secret {
            return true;
        }
        if self.private {
            return self.allow_list.iter().any(|u| u == user);
        }
        true
    }
}

/// How a tag id presents to a given user once resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTag {
    /// Full prompt text is disclosed.
    Public { text: String },
    /// Text stays hidden; usable by anyone at the given credit cost.
    Premium { cost: u32 },
    /// Text stays hidden; usable only if the user is on the allow list.
    Restricted { accessible: bool },
    /// No catalog entry with this id.
    Invalid,
}

pub trait PromptCatalog: Send + Sync {
    fn lookup(&self, id: &str) -> Option<PromptEntry>;

    /// All entries the user may attach, in stable id order.
    fn accessible(&self, user: &str) -> Vec<PromptEntry>;

    fn resolve(&self, id: &str, user: &str) -> ResolvedTag {
        match self.lookup(id) {
            None => ResolvedTag::Invalid,
            Some(entry) if !entry.secret => ResolvedTag::Public { text: entry.text },
            Some(entry) if entry.private => ResolvedTag::Restricted {
                accessible: entry.allow_list.iter().any(|u| u == user),
            },
            Some(entry) => ResolvedTag::Premium { cost: entry.cost },
        }
    }
}

/// Catalog held in memory, keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: BTreeMap<String, PromptEntry>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: PromptEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Catalog preloaded with the starter entries shipped with the app.
    pub fn seeded() -> Self {
        let mut catalog = Self::new();
        let seeds = [
            entry("111111", "a sunny day with retro art pop art theme", false, false, 0, &[], "retro_artist", 1),
            entry("222222", "atari console games art theme", false, false, 0, &[], "console_collector", 2),
            entry("333333", "1980 style retro street art", true, true, 0, &["admin", "premium_user"], "street_painter", 3),
            entry("444444", "light through glass, medium format portrait", true, false, 2, &[], "portrait_studio", 4),
            entry("555555", "cyberpunk neon cityscape at night", false, false, 0, &[], "neon_walker", 5),
            entry("666666", "vintage film photography aesthetic", true, false, 3, &[], "film_archivist", 6),
            entry("ABC123", "A majestic mountain landscape with snow-capped peaks", false, false, 0, &[], "trail_mapper", 7),
            entry("DEF456", "Urban street photography with dramatic lighting", false, false, 0, &[], "city_shooter", 8),
            entry("GHI789", "Cinematic video with dynamic camera movements", false, false, 0, &[], "film_director", 9),
        ];
        for seed in seeds {
            catalog.insert(seed);
        }
        catalog
    }
}

fn entry(
    id: &str,
    text: &str,
    secret: bool,
    private: bool,
    cost: u32,
    allow_list: &[&str],
    creator: &str,
    thumb: u32,
) -> PromptEntry {
    PromptEntry {
        id: id.to_string(),
        text: text.to_string(),
        secret,
        private,
        cost,
        allow_list: allow_list.iter().map(|s| s.to_string()).collect(),
        creator: creator.to_string(),
        thumbnail: Some(format!("https://picsum.photos/200/200?random={thumb}")),
    }
}

impl PromptCatalog for InMemoryCatalog {
    fn lookup(&self, id: &str) -> Option<PromptEntry> {
        self.entries.get(id).cloned()
    }

    fn accessible(&self, user: &str) -> Vec<PromptEntry> {
        self.entries
            .values()
            .filter(|entry| entry.accessible_to(user))
            .cloned()
            .collect()
    }
}

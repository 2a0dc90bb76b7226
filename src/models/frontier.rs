//! Traversal state of one crawl session

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::document_link::DocumentLink;

/// Links deduplicated by [`DocumentLink::key`], kept in discovery order.
///
/// The first sighting of an href wins; later sightings with other anchor
/// text are dropped. The set only grows.
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    index: HashMap<String, usize>,
    links: Vec<DocumentLink>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a link with the same key is already present
    pub fn insert(&mut self, link: DocumentLink) -> bool {
        if self.index.contains_key(link.key()) {
            return false;
        }
        self.index.insert(link.key().to_string(), self.links.len());
        self.links.push(link);
        true
    }

    pub fn get(&self, href: &str) -> Option<&DocumentLink> {
        self.index.get(href).map(|&i| &self.links[i])
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn into_vec(self) -> Vec<DocumentLink> {
        self.links
    }
}

impl Extend<DocumentLink> for LinkSet {
    fn extend<I: IntoIterator<Item = DocumentLink>>(&mut self, iter: I) {
        for link in iter {
            self.insert(link);
        }
    }
}

#[derive(Debug)]
pub struct CrawlFrontier {
    visited: HashSet<String>,
    queue: VecDeque<(String, usize)>,
    collected: LinkSet,
}

impl CrawlFrontier {
    /// Frontier seeded with `(seed_url, 0)`
    pub fn new(seed_url: &str) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back((seed_url.to_string(), 0));
        Self {
            visited: HashSet::new(),
            queue,
            collected: LinkSet::new(),
        }
    }

    pub fn pop(&mut self) -> Option<(String, usize)> {
        self.queue.pop_front()
    }

    pub fn enqueue(&mut self, url: String, depth: usize) {
        self.queue.push_back((url, depth));
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Returns false if the URL had already been visited
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn collect(&mut self, link: DocumentLink) -> bool {
        self.collected.insert(link)
    }

    /// End the session, handing over the collected links
    pub fn finish(self) -> (usize, LinkSet) {
        (self.visited.len(), self.collected)
    }
}

use dashmap::DashSet;

/// Tenant ids a session has asked data for.
///
/// Grows only; aggregate fetches are scoped to the whole set so a later fetch
/// always covers every id requested before it. [`InterestSet::clear`] is for
/// sign-out, which starts a new session.
#[derive(Debug, Default)]
pub struct InterestSet {
    ids: DashSet<String>,
}

impl InterestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id`, returning true when it was not known yet.
    pub fn insert(&self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Current members in sorted order.
    pub fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.ids.clear();
    }
}

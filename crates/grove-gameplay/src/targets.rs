//! Registry of tagged, positioned entities agents can target.
//!
//! Membership is explicit: entities are added when they spawn and removed
//! when they die. Nothing here polls or searches by name.

use std::cmp::Ordering;

use ahash::AHashMap;
use glam::Vec2;
use grove_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Category an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// Player characters
    Player,
    /// Friendly non-player characters
    Npc,
    /// Hostile creatures
    Enemy,
    /// Buildings and other static structures
    Structure,
}

impl Tag {
    const fn bit(self) -> u8 {
        match self {
            Self::Player => 1,
            Self::Npc => 1 << 1,
            Self::Enemy => 1 << 2,
            Self::Structure => 1 << 3,
        }
    }

    /// Get all tags.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Player, Self::Npc, Self::Enemy, Self::Structure]
    }
}

/// A small set of tags checked by intersection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct TagSet(u8);

impl TagSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Set holding a single tag.
    #[must_use]
    pub const fn single(tag: Tag) -> Self {
        Self(tag.bit())
    }

    /// Returns the set with `tag` added.
    #[must_use]
    pub const fn with(self, tag: Tag) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Checks membership.
    #[must_use]
    pub const fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Returns true if the sets share at least one tag.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns true if no tag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the tags in the set.
    pub fn iter(self) -> impl Iterator<Item = Tag> {
        Tag::all().into_iter().filter(move |&t| self.contains(t))
    }
}

impl From<Vec<Tag>> for TagSet {
    fn from(tags: Vec<Tag>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<TagSet> for Vec<Tag> {
    fn from(set: TagSet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// One registered entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetEntry {
    /// Current world position
    pub position: Vec2,
    /// Tags the entity carries
    pub tags: TagSet,
}

/// Queryable population of targetable entities.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    entries: AHashMap<EntityId, TargetEntry>,
}

impl TargetRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers (or re-registers) an entity.
    pub fn add(&mut self, id: EntityId, position: Vec2, tags: TagSet) {
        self.entries.insert(id, TargetEntry { position, tags });
    }

    /// Removes an entity. Returns its last entry if it was registered.
    pub fn remove(&mut self, id: EntityId) -> Option<TargetEntry> {
        self.entries.remove(&id)
    }

    /// Checks whether an entity is registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Gets an entity's entry.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&TargetEntry> {
        self.entries.get(&id)
    }

    /// Gets an entity's position.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.entries.get(&id).map(|e| e.position)
    }

    /// Refreshes a registered entity's position. Unknown ids are ignored.
    pub fn update_position(&mut self, id: EntityId, position: Vec2) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.position = position;
        }
    }

    /// Nearest entity carrying any tag in `tags` within `max_range` of
    /// `origin`, never returning `exclude` (the querying agent).
    ///
    /// Ties are broken by id so repeated queries agree.
    #[must_use]
    pub fn nearest_with_tag(
        &self,
        tags: TagSet,
        origin: Vec2,
        max_range: f32,
        exclude: EntityId,
    ) -> Option<EntityId> {
        let max_sq = max_range * max_range;
        let found = self
            .entries
            .iter()
            .filter(|(&id, entry)| id != exclude && entry.tags.intersects(tags))
            .map(|(&id, entry)| (id, entry.position.distance_squared(origin)))
            .filter(|&(_, d)| d <= max_sq)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id);
        trace!(?found, range = max_range, "nearest target query");
        found
    }

    /// Iterates over all registered entities.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &TargetEntry)> {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn test_tag_set_intersection() {
        let hostile = TagSet::single(Tag::Enemy);
        let friendly: TagSet = [Tag::Player, Tag::Npc].into_iter().collect();
        assert!(!hostile.intersects(friendly));
        assert!(friendly.intersects(TagSet::single(Tag::Npc)));
        assert!(friendly.contains(Tag::Player));
        assert!(!friendly.contains(Tag::Structure));
        assert!(TagSet::EMPTY.is_empty());
        assert_eq!(friendly.iter().count(), 2);
    }

    #[test]
    fn test_add_remove() {
        let mut reg = TargetRegistry::new();
        reg.add(id(1), Vec2::ZERO, TagSet::single(Tag::Npc));
        assert_eq!(reg.len(), 1);
        assert!(reg.contains(id(1)));
        assert!(reg.remove(id(1)).is_some());
        assert!(reg.remove(id(1)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_nearest_with_tag_filters_and_excludes() {
        let mut reg = TargetRegistry::new();
        reg.add(id(1), Vec2::new(0.0, 0.0), TagSet::single(Tag::Enemy));
        reg.add(id(2), Vec2::new(3.0, 0.0), TagSet::single(Tag::Npc));
        reg.add(id(3), Vec2::new(1.0, 0.0), TagSet::single(Tag::Enemy));
        reg.add(id(4), Vec2::new(6.0, 0.0), TagSet::single(Tag::Player));

        let npc_or_player = TagSet::single(Tag::Npc).with(Tag::Player);
        assert_eq!(
            reg.nearest_with_tag(npc_or_player, Vec2::ZERO, 10.0, id(1)),
            Some(id(2))
        );
        // The querying enemy never finds itself.
        assert_eq!(
            reg.nearest_with_tag(TagSet::single(Tag::Enemy), Vec2::ZERO, 10.0, id(1)),
            Some(id(3))
        );
    }

    #[test]
    fn test_nearest_with_tag_respects_range() {
        let mut reg = TargetRegistry::new();
        reg.add(id(7), Vec2::new(8.0, 0.0), TagSet::single(Tag::Player));
        assert_eq!(
            reg.nearest_with_tag(TagSet::single(Tag::Player), Vec2::ZERO, 5.0, id(1)),
            None
        );
        assert_eq!(
            reg.nearest_with_tag(TagSet::single(Tag::Player), Vec2::ZERO, 8.0, id(1)),
            Some(id(7))
        );
    }

    #[test]
    fn test_update_position() {
        let mut reg = TargetRegistry::new();
        reg.add(id(1), Vec2::ZERO, TagSet::single(Tag::Npc));
        reg.update_position(id(1), Vec2::new(2.0, 3.0));
        assert_eq!(reg.position(id(1)), Some(Vec2::new(2.0, 3.0)));
        reg.update_position(id(99), Vec2::ONE);
        assert!(!reg.contains(id(99)));
    }

    #[test]
    fn test_tag_set_serde_as_list() {
        #[derive(Deserialize)]
        struct Wrapper {
            tags: TagSet,
        }
        let parsed: Wrapper = toml::from_str("tags = [\"enemy\", \"structure\"]").expect("parse");
        assert!(parsed.tags.contains(Tag::Enemy));
        assert!(parsed.tags.contains(Tag::Structure));
        assert!(!parsed.tags.contains(Tag::Npc));
    }
}

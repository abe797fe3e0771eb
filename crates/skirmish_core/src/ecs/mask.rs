use crate::ecs::{ComponentId, MAX_COMPONENTS};

const WORDS: usize = MAX_COMPONENTS / 64;

/// Fixed-width bitset of component slots attached to an entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ComponentMask([u64; WORDS]);

impl ComponentMask {
    pub const EMPTY: Self = Self([0; WORDS]);

    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let mut mask = Self::EMPTY;
        for id in ids {
            mask.insert(id);
        }
        mask
    }

    #[inline]
    pub fn insert(&mut self, id: ComponentId) {
        let (word, bit) = Self::locate(id);
        self.0[word] |= 1 << bit;
    }

    #[inline]
    pub fn remove(&mut self, id: ComponentId) {
        let (word, bit) = Self::locate(id);
        self.0[word] &= !(1 << bit);
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, bit) = Self::locate(id);
        self.0[word] & (1 << bit) != 0
    }

    /// True when every bit of `other` is set in `self`.
    pub fn contains_all(&self, other: &ComponentMask) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(mine, theirs)| mine & theirs == *theirs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Set slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..MAX_COMPONENTS)
            .map(|slot| ComponentId::new(slot as u16))
            .filter(move |id| self.contains(*id))
    }

    #[inline]
    fn locate(id: ComponentId) -> (usize, u32) {
        let slot = id.index();
        (slot / 64, (slot % 64) as u32)
    }
}

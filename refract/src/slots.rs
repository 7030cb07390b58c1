use core::{array, fmt};

use tracing::debug;

use super::*;

/// Number of prisms a single user can have at once.
pub const MAX_PRISMS: usize = 8;

/// Opaque identifier of the user (connection) owning a prism.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(String);

impl OwnerId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a prism in its owner's [`PrismSlots`], always less than [`MAX_PRISMS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u8);

impl SlotId {
    pub const FIRST: Self = Self(0);

    /// Returns `None` if `index >= MAX_PRISMS`
    #[inline]
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        (index < MAX_PRISMS).then(|| Self(index as u8))
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..MAX_PRISMS as u8).map(Self)
    }
}

impl TryFrom<usize> for SlotId {
    type Error = ();

    #[inline]
    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A change to a single slot, as relayed between users.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotUpdate {
    /// Creates or moves the prism in `prism.slot`
    Set(Prism),
    /// Deletes whatever is in the slot
    Clear(SlotId),
}

impl SlotUpdate {
    #[inline]
    #[must_use]
    pub fn slot(&self) -> SlotId {
        match self {
            SlotUpdate::Set(prism) => prism.slot,
            SlotUpdate::Clear(slot) => *slot,
        }
    }
}

/// The fixed-size set of prisms owned by one user, with at most one of them selected.
#[derive(Clone, Debug, PartialEq)]
pub struct PrismSlots {
    owner: OwnerId,
    slots: [Option<Prism>; MAX_PRISMS],
    selected: Option<SlotId>,
}

impl PrismSlots {
    #[must_use]
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            slots: array::from_fn(|_| None),
            selected: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    #[inline]
    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&Prism> {
        self.slots[slot.index()].as_ref()
    }

    /// The occupied slots, in slot order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Prism> + '_ {
        self.slots.iter().flatten()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == MAX_PRISMS
    }

    /// Places a new prism in the first free slot, and selects it.
    ///
    /// Returns `None` if every slot is taken.
    pub fn place(
        &mut self,
        position: impl Into<Point>,
        anchor: Option<GeoAnchor>,
        user_name: impl Into<String>,
    ) -> Option<SlotId> {
        let slot = SlotId::all().find(|s| self.slots[s.index()].is_none())?;

        let mut prism = Prism::new(position, DEFAULT_ROTATION, self.owner.clone(), slot);
        prism.anchor = anchor;
        prism.user_name = user_name.into();

        debug!(owner = %self.owner, %slot, "placed prism");

        self.slots[slot.index()] = Some(prism);
        self.select(slot);
        Some(slot)
    }

    /// Stores `prism` in its slot, replacing whatever was there (last write wins).
    ///
    /// The prism is re-owned by this set's owner. The selection flag is kept
    /// consistent with the current selection.
    pub fn apply(&mut self, mut prism: Prism) -> Option<Prism> {
        let slot = prism.slot;
        prism.owner = self.owner.clone();
        prism.is_selected = self.selected == Some(slot);
        self.slots[slot.index()].replace(prism)
    }

    /// Applies a relayed change, returning what was in the slot before.
    pub fn apply_update(&mut self, update: SlotUpdate) -> Option<Prism> {
        match update {
            SlotUpdate::Set(prism) => self.apply(prism),
            SlotUpdate::Clear(slot) => self.remove(slot),
        }
    }

    /// Removes the prism in `slot`, deselecting it if needed.
    pub fn remove(&mut self, slot: SlotId) -> Option<Prism> {
        if self.selected == Some(slot) {
            self.selected = None;
        }

        let removed = self.slots[slot.index()].take();

        if removed.is_some() {
            debug!(owner = %self.owner, %slot, "removed prism");
        }

        removed
    }

    /// Selects the first prism containing `point`, and deselects the
    /// previously selected one. Selects nothing if no prism contains `point`.
    pub fn select_at(&mut self, point: &Point) -> Option<SlotId> {
        let hit = self
            .iter()
            .find(|prism| prism.contains_point(point))
            .map(|prism| prism.slot);

        match hit {
            Some(slot) => self.select(slot),
            None => self.deselect(),
        }

        hit
    }

    fn select(&mut self, slot: SlotId) {
        self.deselect();

        if let Some(prism) = self.slots[slot.index()].as_mut() {
            prism.is_selected = true;
            self.selected = Some(slot);
        }
    }

    pub fn deselect(&mut self) {
        if let Some(prism) = self.selected.take().and_then(|s| self.slots[s.index()].as_mut()) {
            prism.is_selected = false;
        }
    }

    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<&Prism> {
        self.selected.and_then(|s| self.get(s))
    }

    fn selected_mut(&mut self) -> Option<&mut Prism> {
        self.selected.and_then(|s| self.slots[s.index()].as_mut())
    }

    pub fn drag_selected(&mut self, to: impl Into<Point>) -> Option<&Prism> {
        let prism = self.selected_mut()?;
        prism.move_to(to);
        Some(prism)
    }

    pub fn rotate_selected(&mut self, degrees: Float) -> Option<&Prism> {
        let prism = self.selected_mut()?;
        prism.rotate_by(degrees);
        Some(prism)
    }

    pub fn delete_selected(&mut self) -> Option<Prism> {
        self.selected.and_then(|s| self.remove(s))
    }
}

impl<'a> IntoIterator for &'a PrismSlots {
    type Item = &'a Prism;
    type IntoIter = core::iter::Flatten<core::slice::Iter<'a, Option<Prism>>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter().flatten()
    }
}

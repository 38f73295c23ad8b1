//! Per-plane texture slots, indexed by plane number.

use super::api::{ApiError, GpuApi, TextureDesc, TextureRole};
use crate::image::MAX_PLANES;

/// A texture together with the description it was created for.
pub struct Slot<T> {
    pub desc: TextureDesc,
    pub texture: T,
}

/// Outcome of [`TextureSlots::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Reused,
    Created,
    Recreated,
}

/// Fixed arena of up to [`MAX_PLANES`] textures.
pub struct TextureSlots<A: GpuApi> {
    role: TextureRole,
    slots: [Option<Slot<A::Texture>>; MAX_PLANES],
}

impl<A: GpuApi> TextureSlots<A> {
    pub fn new(role: TextureRole) -> Self {
        Self {
            role,
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Slot<A::Texture>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Slot<A::Texture>> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Make slot `index` hold a texture matching `desc` and return it.
    ///
    /// A mismatched texture is destroyed before its replacement is created,
    /// so on failure the slot is left empty.
    pub fn ensure(
        &mut self,
        api: &mut A,
        device: &A::Device,
        index: usize,
        desc: TextureDesc,
    ) -> Result<(SlotStatus, &mut A::Texture), ApiError> {
        let slot = &mut self.slots[index];
        let status = match slot.take() {
            Some(existing) if existing.desc == desc => {
                let existing = slot.insert(existing);
                return Ok((SlotStatus::Reused, &mut existing.texture));
            }
            Some(stale) => {
                api.destroy_texture(device, stale.texture);
                SlotStatus::Recreated
            }
            None => SlotStatus::Created,
        };
        let texture = api.create_texture(device, &desc, self.role)?;
        let slot = slot.insert(Slot { desc, texture });
        Ok((status, &mut slot.texture))
    }

    /// Destroy every slot at or beyond `len`.
    pub fn truncate(&mut self, api: &mut A, device: &A::Device, len: usize) {
        for slot in self.slots.iter_mut().skip(len) {
            if let Some(slot) = slot.take() {
                api.destroy_texture(device, slot.texture);
            }
        }
    }

    pub fn clear(&mut self, api: &mut A, device: &A::Device) {
        self.truncate(api, device, 0);
    }
}

//! Write masks

use super::Sparse;
use crate::ops::Position;
use std::ops::Not;

/// A container reference that gates which output positions a write affects
///
/// Built with `.s()` (structure) or `.v()` (value) on a vector or matrix;
/// `!mask` flips the complement flag.
#[derive(Copy, Clone, Debug)]
pub struct Mask<'a> {
    name: &'a str,
    data: &'a Sparse,
    structure: bool,
    complement: bool,
}

impl<'a> Mask<'a> {
    pub(crate) fn new(name: &'a str, data: &'a Sparse, structure: bool) -> Self {
        Self {
            name,
            data,
            structure,
            complement: false,
        }
    }

    /// Name of the mask container
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Entries of the mask container
    pub fn data(&self) -> &'a Sparse {
        self.data
    }

    /// Whether only the pattern matters
    pub fn structure(&self) -> bool {
        self.structure
    }

    /// Whether the mask is complemented
    pub fn complement(&self) -> bool {
        self.complement
    }

    /// Whether a write at `pos` passes this mask
    pub fn allows(&self, pos: Position) -> bool {
        Self::allows_with(self.data, self.structure, self.complement, pos)
    }

    /// Mask test with explicit flags (as carried by a descriptor)
    pub fn allows_with(data: &Sparse, structure: bool, complement: bool, pos: Position) -> bool {
        let hit = match data.get(pos) {
            Some(v) => structure || v.truthy(),
            None => false,
        };
        hit != complement
    }
}

impl Not for Mask<'_> {
    type Output = Self;

    fn not(mut self) -> Self {
        self.complement = !self.complement;
        self
    }
}

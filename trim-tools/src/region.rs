use std::collections::BTreeMap;

/// A host-visible byte range obtained by locking a sub-resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MappedRegion {
    /// Address of the mapped region.
    pub base: u64,
    /// Size of the mapped region in bytes.
    pub size: u64,
    /// Address of the resource that mapped this region.
    pub resource: u64,
    /// Index of the sub-resource (mip level) that mapped this region.
    pub subresource: u64,
}

impl MappedRegion {
    pub fn contains(&self, addr: u64, len: u64) -> bool {
        addr >= self.base
            && addr.saturating_add(len) <= self.base.saturating_add(self.size)
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegionError {
    #[error("a region with base {0:#x} is already mapped")]
    Duplicate(u64),

    #[error("no region with base {0:#x} is mapped")]
    Missing(u64),
}

/// Index over the currently mapped regions, keyed by base address. Holds
/// descriptors only; at most one region per base can be live at a time.
#[derive(Debug, Default)]
pub struct RegionIndex {
    regions: BTreeMap<u64, MappedRegion>,
}

impl RegionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`RegionError::Duplicate`] if a region with the same base
    /// is already indexed; the existing entry is kept.
    pub fn insert(&mut self, region: MappedRegion) -> Result<(), RegionError> {
        if self.regions.contains_key(&region.base) {
            return Err(RegionError::Duplicate(region.base));
        }
        self.regions.insert(region.base, region);
        Ok(())
    }

    pub fn erase(&mut self, base: u64) -> Result<MappedRegion, RegionError> {
        self.regions.remove(&base).ok_or(RegionError::Missing(base))
    }

    /// Region containing `[addr, addr + len)`, if any. Candidates are the
    /// regions with base <= addr; of those only the one with the greatest
    /// base is tested, which is exact for disjoint regions (the only kind a
    /// well-formed trace produces).
    pub fn find_containing(&self, addr: u64, len: u64) -> Option<&MappedRegion> {
        let (_, region) = self.regions.range(..=addr).next_back()?;
        region.contains(addr, len).then_some(region)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: u64, size: u64) -> MappedRegion {
        MappedRegion {
            base,
            size,
            resource: 0x100,
            subresource: 0,
        }
    }

    #[test]
    fn duplicate_base_is_rejected() {
        let mut index = RegionIndex::new();
        index.insert(region(0x1000, 64)).unwrap();
        assert_eq!(
            index.insert(region(0x1000, 128)),
            Err(RegionError::Duplicate(0x1000))
        );
        assert_eq!(index.len(), 1);
        // Existing entry survives the rejected insert.
        assert_eq!(index.find_containing(0x1000, 64).unwrap().size, 64);
    }

    #[test]
    fn erase_reports_missing_bases() {
        let mut index = RegionIndex::new();
        index.insert(region(0x1000, 64)).unwrap();
        assert!(index.erase(0x1000).is_ok());
        assert_eq!(index.erase(0x1000), Err(RegionError::Missing(0x1000)));
        assert!(index.is_empty());
    }

    #[test]
    fn containment_lookup() {
        let mut index = RegionIndex::new();
        index.insert(region(0x1000, 64)).unwrap();

        assert_eq!(index.find_containing(0x1000, 64).unwrap().base, 0x1000);
        assert_eq!(index.find_containing(0x1020, 8).unwrap().base, 0x1000);
        // Straddles the end of the region.
        assert!(index.find_containing(0x103c, 8).is_none());
        // Before the base.
        assert!(index.find_containing(0xfff, 4).is_none());
        // Past the end.
        assert!(index.find_containing(0x1040, 1).is_none());
    }

    #[test]
    fn lookup_picks_the_greatest_base_at_or_below_the_address() {
        let mut index = RegionIndex::new();
        index.insert(region(0x1000, 64)).unwrap();
        index.insert(region(0x2000, 64)).unwrap();

        assert_eq!(index.find_containing(0x2010, 4).unwrap().base, 0x2000);
        assert_eq!(index.find_containing(0x1010, 4).unwrap().base, 0x1000);
        // Gap between the regions matches nothing.
        assert!(index.find_containing(0x1800, 4).is_none());
    }
}

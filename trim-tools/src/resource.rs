use std::rc::Rc;

use tracing::warn;

use trace::Call;

use crate::geometry;
use crate::region::RegionIndex;

/// Kind of GPU object a creation call produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Texture,
}

/// Update lineages for one sub-resource (mip level).
#[derive(Debug, Default)]
struct Subresource {
    index: u64,
    /// Open map/update lineage. Non-empty implies the first entry is the
    /// lock call that mapped the region.
    staging: Vec<Rc<Call>>,
    /// Last fully closed map -> memcpy* -> unmap lineage.
    committed: Vec<Rc<Call>>,
}

/// Tracks one live resource across the squash prefix: its creation call,
/// refcount, and per-sub-resource update lineages. The region index is
/// owned by the aggregator and threaded into the handlers.
#[derive(Debug)]
pub struct Resource {
    address: u64,
    kind: ResourceKind,
    creation: Rc<Call>,
    ref_count: i32,
    active_map_count: i32,
    subresources: Vec<Subresource>,
}

impl Resource {
    pub fn new(address: u64, creation: Call, kind: ResourceKind) -> Self {
        Self {
            address,
            kind,
            creation: Rc::new(creation),
            ref_count: 1,
            active_map_count: 0,
            subresources: Vec::new(),
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn ref_count(&self) -> i32 {
        self.ref_count
    }

    /// Number of currently mapped sub-resources. Diagnostic only.
    pub fn active_map_count(&self) -> i32 {
        self.active_map_count
    }

    /// Open lineage for a sub-resource, if one is staged.
    pub fn staging(&self, subresource: u64) -> Option<&[Rc<Call>]> {
        self.subresources
            .iter()
            .find(|sub| sub.index == subresource)
            .map(|sub| sub.staging.as_slice())
    }

    /// Last committed lineage for a sub-resource.
    pub fn committed(&self, subresource: u64) -> Option<&[Rc<Call>]> {
        self.subresources
            .iter()
            .find(|sub| sub.index == subresource)
            .map(|sub| sub.committed.as_slice())
    }

    fn sub_mut(&mut self, index: u64) -> &mut Subresource {
        match self.subresources.iter().position(|sub| sub.index == index) {
            Some(position) => &mut self.subresources[position],
            None => {
                self.subresources.push(Subresource {
                    index,
                    ..Default::default()
                });
                let last = self.subresources.len() - 1;
                &mut self.subresources[last]
            }
        }
    }

    /// Opens a new lineage on the locked sub-resource and indexes the
    /// mapped region. A still-open lineage on the same sub-resource is
    /// discarded.
    pub fn on_map(&mut self, call: Call, regions: &mut RegionIndex) {
        let region = match geometry::mapped_region_for_lock(&call, self.creation.as_ref()) {
            Ok(region) => region,
            Err(err) => {
                warn!(call = call.no, error = %err, "malformed lock geometry");
                return;
            }
        };

        self.active_map_count += 1;

        let sub = self.sub_mut(region.subresource);
        if !sub.staging.is_empty() {
            warn!(
                call = call.no,
                subresource = region.subresource,
                "throwing away texture operations"
            );
        }
        sub.staging = vec![Rc::new(call)];

        if let Err(err) = regions.insert(region) {
            warn!(error = %err, "texture was already locked");
        }
    }

    /// Appends a bulk copy to the open lineage of whichever sub-resource
    /// maps the destination.
    pub fn on_memcpy(&mut self, call: Call, regions: &RegionIndex) {
        let (Some(dest), Some(len)) = (call.arg(0).to_uint(), call.arg(1).to_uint()) else {
            warn!(call = call.no, "malformed memcpy arguments");
            return;
        };
        let Some(region) = regions.find_containing(dest, len) else {
            warn!(call = call.no, dest = %format_args!("{dest:#x}"), "no regions matched");
            return;
        };
        debug_assert_eq!(
            region.resource, self.address,
            "memcpy routed to the wrong resource"
        );

        match self
            .subresources
            .iter_mut()
            .find(|sub| sub.index == region.subresource)
        {
            Some(sub) if !sub.staging.is_empty() => sub.staging.push(Rc::new(call)),
            _ => warn!(call = call.no, "memcpy for unmapped region"),
        }
    }

    /// Closes the open lineage on the unlocked sub-resource: un-indexes
    /// the region, appends the unlock call, and replaces the committed
    /// lineage with the staged one.
    pub fn on_unmap(&mut self, call: Call, regions: &mut RegionIndex) {
        let Some(subresource) = call.arg(1).to_uint() else {
            warn!(call = call.no, "unlock call carries no sub-resource index");
            return;
        };

        let staged_lock = self
            .subresources
            .iter()
            .find(|sub| sub.index == subresource)
            .and_then(|sub| sub.staging.first());
        let Some(lock) = staged_lock else {
            warn!(
                call = call.no,
                subresource, "insufficient information to unmap"
            );
            return;
        };
        if !lock.sig.name.ends_with("LockRect") {
            warn!(
                call = call.no,
                subresource, "insufficient information to unmap"
            );
            return;
        }

        // The unlock call carries no geometry; recompute the region from
        // the staged lock call.
        let region = match geometry::mapped_region_for_lock(lock.as_ref(), self.creation.as_ref()) {
            Ok(region) => region,
            Err(err) => {
                warn!(call = call.no, error = %err, "malformed lock geometry");
                return;
            }
        };
        if let Err(err) = regions.erase(region.base) {
            warn!(call = call.no, error = %err, "no regions matched");
            return;
        }

        self.active_map_count -= 1;

        let sub = self.sub_mut(subresource);
        sub.staging.push(Rc::new(call));
        sub.committed = std::mem::take(&mut sub.staging);
    }

    /// Minimal call sequence reconstructing this resource's state: the
    /// creation call, every committed lineage, then every still-open
    /// lineage (a resource mid-map at the cutover keeps its opening lock
    /// so later calls against the mapped pointer stay well-defined).
    /// Sub-resources flatten in first-touch order.
    pub fn flatten(&self) -> Vec<Rc<Call>> {
        if self.ref_count <= 0 {
            warn!(
                resource = %format_args!("{:#x}", self.address),
                ref_count = self.ref_count,
                "invalid resource refcount encountered"
            );
            return Vec::new();
        }

        let mut calls = vec![Rc::clone(&self.creation)];
        for sub in &self.subresources {
            calls.extend(sub.committed.iter().cloned());
        }
        for sub in &self.subresources {
            calls.extend(sub.staging.iter().cloned());
        }
        calls
    }
}

use std::rc::Rc;

use hashbrown::HashMap;
use tracing::warn;

use trace::{Call, Value};

use crate::opcode::{CallClass, OpcodeTable};
use crate::region::RegionIndex;
use crate::resource::{Resource, ResourceKind};

/// Replays a trace prefix into per-resource state so the trimmer can emit
/// a minimal call sequence reconstructing it at the cutover frame.
///
/// Owns every tracked resource and the secondary index of currently
/// mapped regions. Region entries come and go only on map/unmap of a
/// resource that is already tracked.
pub struct StateAggregator {
    table: OpcodeTable,
    resources: HashMap<u64, Resource>,
    order: Vec<u64>,
    regions: RegionIndex,
}

impl StateAggregator {
    pub fn new(table: OpcodeTable) -> Self {
        Self {
            table,
            resources: HashMap::new(),
            order: Vec::new(),
            regions: RegionIndex::new(),
        }
    }

    /// Routes one prefix call by opcode class. Returns `true` when the
    /// aggregator has taken responsibility for representing the call in
    /// its squashed output; the trim driver suppresses such calls on the
    /// second pass unless they are chosen survivors.
    ///
    /// Memcpy calls are recorded but not claimed: they return `false` and
    /// the driver emits them through the ordinary selection path.
    pub fn add_call(&mut self, call: Call) -> bool {
        match self.table.classify(call.sig.id) {
            CallClass::Create => self.on_create(call),
            CallClass::Map => self.on_map(call),
            CallClass::Unmap => self.on_unmap(call),
            CallClass::Memcpy => {
                self.on_memcpy(call);
                false
            }
            CallClass::Refcount | CallClass::Ignored => false,
        }
    }

    fn on_create(&mut self, call: Call) -> bool {
        // arg 7 is the ppTexture out-parameter; the created resource's
        // address is the pointee.
        let address = call
            .arg(7)
            .as_array()
            .and_then(|values| values.first())
            .and_then(Value::to_uint);
        let Some(address) = address else {
            warn!(call = call.no, "could not get texture address");
            return false;
        };

        if self.resources.contains_key(&address) {
            warn!(
                call = call.no,
                texture = %format_args!("{address:#x}"),
                "texture already created"
            );
            return true;
        }

        self.resources
            .insert(address, Resource::new(address, call, ResourceKind::Texture));
        self.order.push(address);
        true
    }

    fn on_map(&mut self, call: Call) -> bool {
        let Some(address) = call.arg(0).to_uint() else {
            warn!(call = call.no, "lock call carries no texture address");
            return true;
        };
        match self.resources.get_mut(&address) {
            Some(resource) => match resource.kind() {
                ResourceKind::Texture => resource.on_map(call, &mut self.regions),
            },
            None => warn!(
                call = call.no,
                texture = %format_args!("{address:#x}"),
                "trying to lock nonexistent texture"
            ),
        }
        true
    }

    fn on_unmap(&mut self, call: Call) -> bool {
        let Some(address) = call.arg(0).to_uint() else {
            warn!(call = call.no, "unlock call carries no texture address");
            return true;
        };
        match self.resources.get_mut(&address) {
            Some(resource) => match resource.kind() {
                ResourceKind::Texture => resource.on_unmap(call, &mut self.regions),
            },
            None => warn!(
                call = call.no,
                texture = %format_args!("{address:#x}"),
                "trying to unlock nonexistent texture"
            ),
        }
        true
    }

    fn on_memcpy(&mut self, call: Call) {
        let (Some(dest), Some(len)) = (call.arg(0).to_uint(), call.arg(1).to_uint()) else {
            warn!(call = call.no, "malformed memcpy arguments");
            return;
        };
        let owner = self
            .regions
            .find_containing(dest, len)
            .map(|region| region.resource);
        let Some(owner) = owner else {
            warn!(
                call = call.no,
                dest = %format_args!("{dest:#x}"),
                "no regions matched"
            );
            return;
        };
        match self.resources.get_mut(&owner) {
            Some(resource) => resource.on_memcpy(call, &self.regions),
            None => warn!(
                call = call.no,
                resource = %format_args!("{owner:#x}"),
                "memcpy for nonexistent resource"
            ),
        }
    }

    /// Concatenated [`Resource::flatten`] output for every tracked
    /// resource, in creation order.
    pub fn squashed_calls(&self) -> Vec<Rc<Call>> {
        let mut aggregate = Vec::new();
        for address in &self.order {
            if let Some(resource) = self.resources.get(address) {
                aggregate.extend(resource.flatten());
            }
        }
        aggregate
    }

    pub fn resource(&self, address: u64) -> Option<&Resource> {
        self.resources.get(&address)
    }

    pub fn regions(&self) -> &RegionIndex {
        &self.regions
    }
}

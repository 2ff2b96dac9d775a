use hashbrown::HashMap;

/// Semantic class of a recorded call, as far as state squashing is
/// concerned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CallClass {
    /// Creates a trackable resource (CreateTexture).
    Create,
    /// Bulk copy into a memory-mapped region.
    Memcpy,
    /// Maps a sub-resource (TextureLockRect).
    Map,
    /// Unmaps a sub-resource (TextureUnlockRect).
    Unmap,
    /// AddRef/Release/QueryInterface/GetSurfaceLevel. Classified but never
    /// routed to resource state; refcounts stay at their creation value.
    Refcount,
    /// Everything else.
    Ignored,
}

/// Retrace opcode ids as assigned by codec versions 4 through 6. The ids
/// drift between codec versions, so they are never matched on directly;
/// [`OpcodeTable::for_version`] is the only consumer.
mod ids {
    pub const MEMCPY: u32 = 0;
    pub const IUNKNOWN_ADD_REF: u32 = 19;
    pub const IUNKNOWN_RELEASE: u32 = 20;
    pub const IUNKNOWN_RELEASE_2: u32 = 64;
    pub const IUNKNOWN_RELEASE_3: u32 = 317;
    pub const IUNKNOWN_QUERY_INTERFACE: u32 = 196;
    pub const TEXTURE_GET_SURFACE_LEVEL: u32 = 80;
    pub const TEXTURE_LOCK_RECT: u32 = 81;
    pub const TEXTURE_UNLOCK_RECT: u32 = 82;
    pub const VERTEX_BUFFER_LOCK: u32 = 150;
    pub const VERTEX_BUFFER_UNLOCK: u32 = 151;
    pub const DEVICE_TEST_COOPERATIVE_LEVEL: u32 = 199;
    pub const DEVICE_GET_DIRECT3D: u32 = 202;
    pub const DEVICE_PRESENT: u32 = 213;
    pub const DEVICE_CREATE_TEXTURE: u32 = 219;
    pub const DEVICE_CREATE_VERTEX_BUFFER: u32 = 222;
    pub const DEVICE_SET_VIEWPORT: u32 = 243;
    pub const DEVICE_SET_RENDER_STATE: u32 = 253;
    pub const DEVICE_SET_TEXTURE: u32 = 261;
    pub const DEVICE_SET_SAMPLER_STATE: u32 = 265;
    pub const DEVICE_CREATE_VERTEX_DECLARATION: u32 = 282;
    pub const DEVICE_SET_VERTEX_DECLARATION: u32 = 283;
    pub const DEVICE_CREATE_VERTEX_SHADER: u32 = 287;
    pub const DEVICE_SET_VERTEX_SHADER: u32 = 288;
    pub const DEVICE_SET_VERTEX_SHADER_CONSTANT_F: u32 = 290;
    pub const DEVICE_SET_STREAM_SOURCE: u32 = 296;
    pub const DEVICE_CREATE_PIXEL_SHADER: u32 = 302;
    pub const DEVICE_SET_PIXEL_SHADER: u32 = 303;
    pub const DEVICE_SET_PIXEL_SHADER_CONSTANT_F: u32 = 305;
    pub const D3D9_CREATE_DEVICE: u32 = 331;
    pub const DIRECT3D_CREATE_9: u32 = 559;
}

/// Maps codec opcode ids to [`CallClass`]. Built per trace from the codec
/// version probed out of the parser, since ids are not stable across
/// versions.
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    classes: HashMap<u32, CallClass>,
}

impl OpcodeTable {
    /// Table for the given codec version, or `None` when the version is
    /// not supported.
    pub fn for_version(version: u32) -> Option<Self> {
        match version {
            4..=6 => Some(Self::d3d9_retrace()),
            _ => None,
        }
    }

    fn d3d9_retrace() -> Self {
        use CallClass::*;

        let entries = [
            (ids::MEMCPY, Memcpy),
            (ids::IUNKNOWN_ADD_REF, Refcount),
            (ids::IUNKNOWN_RELEASE, Refcount),
            (ids::IUNKNOWN_RELEASE_2, Refcount),
            (ids::IUNKNOWN_RELEASE_3, Refcount),
            (ids::IUNKNOWN_QUERY_INTERFACE, Refcount),
            (ids::TEXTURE_GET_SURFACE_LEVEL, Refcount),
            (ids::TEXTURE_LOCK_RECT, Map),
            (ids::TEXTURE_UNLOCK_RECT, Unmap),
            (ids::VERTEX_BUFFER_LOCK, Ignored),
            (ids::VERTEX_BUFFER_UNLOCK, Ignored),
            (ids::DEVICE_TEST_COOPERATIVE_LEVEL, Ignored),
            (ids::DEVICE_GET_DIRECT3D, Ignored),
            (ids::DEVICE_PRESENT, Ignored),
            (ids::DEVICE_CREATE_TEXTURE, Create),
            (ids::DEVICE_CREATE_VERTEX_BUFFER, Ignored),
            (ids::DEVICE_SET_VIEWPORT, Ignored),
            (ids::DEVICE_SET_RENDER_STATE, Ignored),
            (ids::DEVICE_SET_TEXTURE, Ignored),
            (ids::DEVICE_SET_SAMPLER_STATE, Ignored),
            (ids::DEVICE_CREATE_VERTEX_DECLARATION, Ignored),
            (ids::DEVICE_SET_VERTEX_DECLARATION, Ignored),
            (ids::DEVICE_CREATE_VERTEX_SHADER, Ignored),
            (ids::DEVICE_SET_VERTEX_SHADER, Ignored),
            (ids::DEVICE_SET_VERTEX_SHADER_CONSTANT_F, Ignored),
            (ids::DEVICE_SET_STREAM_SOURCE, Ignored),
            (ids::DEVICE_CREATE_PIXEL_SHADER, Ignored),
            (ids::DEVICE_SET_PIXEL_SHADER, Ignored),
            (ids::DEVICE_SET_PIXEL_SHADER_CONSTANT_F, Ignored),
            (ids::D3D9_CREATE_DEVICE, Ignored),
            (ids::DIRECT3D_CREATE_9, Ignored),
        ];

        Self {
            classes: entries.into_iter().collect(),
        }
    }

    /// Opcode ids absent from the table classify as [`CallClass::Ignored`].
    pub fn classify(&self, id: u32) -> CallClass {
        self.classes.get(&id).copied().unwrap_or(CallClass::Ignored)
    }
}

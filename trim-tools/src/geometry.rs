//! Recovers mapped-region descriptors from TextureLockRect calls.

use trace::{Call, Value};

use crate::d3d9::{self, Format};
use crate::region::MappedRegion;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
    #[error("lock call carries no locked-rect descriptor")]
    MissingLockedRect,

    #[error("locked rect carries no pitch")]
    MissingPitch,

    #[error("locked rect carries no bits pointer")]
    MissingBits,

    #[error("lock rectangle is malformed")]
    MalformedRect,

    #[error("creation call carries no format")]
    MissingFormat,

    #[error("creation call carries no dimensions")]
    MissingDimensions,

    #[error("lock call carries no resource address")]
    MissingResource,

    #[error("lock call carries no sub-resource index")]
    MissingSubresource,
}

struct Rect {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

/// Computes the region a lock call mapped. The matching unlock carries no
/// geometry, so both the map and unmap paths recompute the descriptor from
/// the lock call and the texture's creation call.
pub fn mapped_region_for_lock(
    lock: &Call,
    creation: &Call,
) -> Result<MappedRegion, GeometryError> {
    // arg 2 is the D3DLOCKED_RECT out-parameter: { Pitch, pBits }.
    let locked_rect = first_struct(lock.arg(2)).ok_or(GeometryError::MissingLockedRect)?;
    let pitch = locked_rect
        .first()
        .and_then(Value::to_uint)
        .ok_or(GeometryError::MissingPitch)?;
    let bits = locked_rect
        .get(1)
        .and_then(Value::to_uint)
        .ok_or(GeometryError::MissingBits)?;

    // arg 3 is the optional RECT restricting the lock to a sub-rectangle.
    let rect = match first_struct(lock.arg(3)) {
        Some(members) => Some(decode_rect(members)?),
        None => None,
    };

    let format = creation
        .arg(5)
        .to_sint()
        .ok_or(GeometryError::MissingFormat)?;
    let format = Format::from_raw(format as i32);

    let (width, height) = match &rect {
        Some(rect) => ((rect.right - rect.left) as u32, (rect.bottom - rect.top) as u32),
        None => {
            let width = creation
                .arg(1)
                .to_uint()
                .ok_or(GeometryError::MissingDimensions)?;
            let height = creation
                .arg(2)
                .to_uint()
                .ok_or(GeometryError::MissingDimensions)?;
            (width as u32, height as u32)
        }
    };

    let size = d3d9::get_lock_size(format, width, height, pitch as u32);

    Ok(MappedRegion {
        base: bits,
        size,
        resource: lock
            .arg(0)
            .to_uint()
            .ok_or(GeometryError::MissingResource)?,
        subresource: lock
            .arg(1)
            .to_uint()
            .ok_or(GeometryError::MissingSubresource)?,
    })
}

fn decode_rect(members: &[Value]) -> Result<Rect, GeometryError> {
    let field = |index: usize| {
        members
            .get(index)
            .and_then(Value::to_sint)
            .ok_or(GeometryError::MalformedRect)
    };
    let rect = Rect {
        left: field(0)?,
        top: field(1)?,
        right: field(2)?,
        bottom: field(3)?,
    };
    if rect.right < rect.left || rect.bottom < rect.top {
        return Err(GeometryError::MalformedRect);
    }
    Ok(rect)
}

/// Pointer out-parameters are recorded as a one-element array wrapping the
/// pointee.
fn first_struct(value: &Value) -> Option<&[Value]> {
    value.as_array()?.first()?.as_struct()
}

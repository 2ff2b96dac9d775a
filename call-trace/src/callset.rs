use std::str::FromStr;

use crate::call::Call;

#[derive(thiserror::Error, Debug)]
pub enum CallSetError {
    #[error("empty call set entry")]
    Empty,

    #[error("invalid call number")]
    Number(#[from] std::num::ParseIntError),

    #[error("range start {0} exceeds range end {1}")]
    Backwards(u64, u64),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct CallRange {
    first: u64,
    last: u64,
}

/// Selection of call (or frame) numbers, parsed from `NUMBER | LO-HI | *`
/// with comma separation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSet {
    ranges: Vec<CallRange>,
}

impl CallSet {
    /// The empty selection.
    pub fn none() -> Self {
        Self::default()
    }

    /// The selection covering every call.
    pub fn all() -> Self {
        Self {
            ranges: vec![CallRange {
                first: 0,
                last: u64::MAX,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Greatest number covered by the selection, 0 when empty.
    pub fn last(&self) -> u64 {
        self.ranges.iter().map(|range| range.last).max().unwrap_or(0)
    }

    pub fn contains(&self, no: u64) -> bool {
        self.ranges
            .iter()
            .any(|range| range.first <= no && no <= range.last)
    }

    pub fn contains_call(&self, call: &Call) -> bool {
        self.contains(call.no)
    }

    pub fn contains_frame(&self, frame_index: u64, _flags: u32) -> bool {
        self.contains(frame_index)
    }

    /// Parses `text` and appends its ranges to the selection.
    pub fn merge(&mut self, text: &str) -> Result<(), CallSetError> {
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(CallSetError::Empty);
            }
            if part == "*" {
                self.ranges.push(CallRange {
                    first: 0,
                    last: u64::MAX,
                });
            } else if let Some((first, last)) = part.split_once('-') {
                let first = first.trim().parse()?;
                let last = last.trim().parse()?;
                if first > last {
                    return Err(CallSetError::Backwards(first, last));
                }
                self.ranges.push(CallRange { first, last });
            } else {
                let no = part.parse()?;
                self.ranges.push(CallRange { first: no, last: no });
            }
        }
        Ok(())
    }
}

impl FromStr for CallSet {
    type Err = CallSetError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut set = Self::none();
        set.merge(text)?;
        Ok(set)
    }
}

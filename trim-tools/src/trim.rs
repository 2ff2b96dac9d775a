//! The three-phase trim driver: sweep the squash prefix into the
//! aggregator, collect its survivors, then rewind and merge-emit.

use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use tracing::{info, warn};

use trace::{CallSet, CodecError, Parser, Writer};

use crate::aggregator::StateAggregator;
use crate::opcode::OpcodeTable;

#[derive(Debug, Default)]
pub struct TrimOptions {
    /// Calls to be included in the trimmed output.
    pub calls: CallSet,
    /// Frames to be included in the trimmed output.
    pub frames: CallSet,
    /// Emit only calls from these threads (empty means all threads).
    pub thread_ids: HashSet<u32>,
    /// Aggregate resource state over this many leading frames and emit it
    /// squashed. Zero disables squashing.
    pub squash_until_frame: u64,
    /// Output path; defaults to `<input without extension>-trim.trace`.
    pub output: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum TrimError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to create {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("unsupported trace version {0}")]
    UnsupportedVersion(u32),

    #[error("trace error")]
    Codec(#[from] CodecError),
}

#[derive(Debug)]
pub struct TrimSummary {
    pub output: PathBuf,
    /// Calls written to the output trace.
    pub written: u64,
    /// Squashed calls that were never encountered again during emission.
    pub unmatched_survivors: usize,
}

pub fn trim_trace(input: &Path, options: &TrimOptions) -> Result<TrimSummary, TrimError> {
    let mut parser = Parser::open(input).map_err(|source| TrimError::Open {
        path: input.to_path_buf(),
        source,
    })?;

    let table = OpcodeTable::for_version(parser.version())
        .ok_or(TrimError::UnsupportedVersion(parser.version()))?;
    let mut aggregator = StateAggregator::new(table);

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output(input));
    let mut writer =
        Writer::create(&output, parser.version(), parser.properties()).map_err(|source| {
            TrimError::Create {
                path: output.clone(),
                source,
            }
        })?;

    // Phase A: feed the prefix into the aggregator, recording per call
    // whether the aggregator claimed it.
    let bookmark = parser.bookmark()?;
    let mut absorbed = Vec::new();
    let mut frame: u64 = 0;
    while frame < options.squash_until_frame {
        let Some(call) = parser.parse_call()? else {
            break;
        };
        let end_of_frame = call.is_end_of_frame();
        absorbed.push(aggregator.add_call(call));
        if end_of_frame {
            frame += 1;
        }
    }

    // Phase B: the aggregator's chosen survivors, sorted by descending
    // sequence number so the emit loop can pop the next expected one from
    // the back.
    let mut survivors = aggregator.squashed_calls();
    survivors.sort_by(|lhs, rhs| rhs.no.cmp(&lhs.no));

    // Phase C: rewind and re-walk. Survivors are written at their original
    // positions; absorbed calls below the next survivor are dropped.
    parser.set_bookmark(bookmark)?;
    let mut frame: u64 = 0;
    let mut written: u64 = 0;
    let mut call_index = 0usize;
    while let Some(call) = parser.parse_call()? {
        let index = call_index;
        call_index += 1;

        // No use doing any work past the last call and frame requested.
        let calls_done = options.calls.is_empty() || call.no > options.calls.last();
        let frames_done = options.frames.is_empty() || frame > options.frames.last();
        if calls_done && frames_done {
            break;
        }

        let end_of_frame = call.is_end_of_frame();

        if !options.thread_ids.is_empty() && !options.thread_ids.contains(&call.thread_id) {
            if end_of_frame {
                frame += 1;
            }
            continue;
        }

        let mut ok_to_write = true;
        if index < absorbed.len() && absorbed[index] {
            if let Some(next) = survivors.last().map(|survivor| survivor.no) {
                if call.no < next {
                    ok_to_write = false;
                } else if call.no == next {
                    survivors.pop();
                }
            }
        }

        if ok_to_write
            && (options.calls.contains_call(&call)
                || options.frames.contains_frame(frame, call.flags))
        {
            writer.write_call(&call)?;
            written += 1;
        }

        if end_of_frame {
            frame += 1;
        }
    }
    writer.finish()?;

    if survivors.is_empty() {
        info!(written, "trim complete");
    } else {
        warn!(
            written,
            remaining = survivors.len(),
            "squashed calls were never matched during emission"
        );
    }

    Ok(TrimSummary {
        output,
        written,
        unmatched_survivors: survivors.len(),
    })
}

fn default_output(input: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    name.push("-trim.trace");
    input.with_file_name(name)
}

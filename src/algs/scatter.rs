//! Collective scatter: the root hands value `i` of its payload to rank `i`.
//!
//! The root validates its payload, encodes every outgoing value, posts one
//! send per non-root rank and keeps its own value without a round trip.
//! Every other rank performs exactly one receive from the root. Nothing is
//! cached between calls.
//!
//! Three entry points share the same delivery path:
//! - [`scatter`] for any `serde` value,
//! - [`scatter_pod`] for fixed-size [`Pod`] records,
//! - [`scatter_blocks`] for a sequence of any length, split into contiguous
//!   near-equal [`Block`]s.

use bytemuck::Pod;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::partition::block_ranges;
use crate::algs::wire::{self, KIND_BLOCK, KIND_SCATTER};
use crate::scatter_error::ScatterError;
use crate::topology::group::Group;

pub const DEFAULT_SCATTER_TAG: CommTag = CommTag::new(0x5CA7);

/// What a rank brings to a scatter: the full payload at the root, nothing elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RootInput<T> {
    Payload(Vec<T>),
    NonRoot,
}

impl<T> RootInput<T> {
    pub fn is_payload(&self) -> bool {
        matches!(self, RootInput::Payload(_))
    }

    pub fn into_payload(self) -> Option<Vec<T>> {
        match self {
            RootInput::Payload(v) => Some(v),
            RootInput::NonRoot => None,
        }
    }

    pub fn map_payload<U, F>(self, f: F) -> RootInput<U>
    where
        F: FnOnce(Vec<T>) -> Vec<U>,
    {
        match self {
            RootInput::Payload(v) => RootInput::Payload(f(v)),
            RootInput::NonRoot => RootInput::NonRoot,
        }
    }
}

impl<T> From<Option<Vec<T>>> for RootInput<T> {
    fn from(v: Option<Vec<T>>) -> Self {
        v.map_or(RootInput::NonRoot, RootInput::Payload)
    }
}

impl<T> From<Vec<T>> for RootInput<T> {
    fn from(v: Vec<T>) -> Self {
        RootInput::Payload(v)
    }
}

/// Policy for a payload supplied on a non-root rank.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonRootPayload {
    /// Drop it and carry on.
    #[default]
    Ignore,
    /// Fail with [`ScatterError::UnexpectedPayload`].
    Reject,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// Tag matching the messages of one call; concurrent scatters need distinct tags.
    pub tag: CommTag,
    pub non_root_payload: NonRootPayload,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_SCATTER_TAG,
            non_root_payload: NonRootPayload::Ignore,
        }
    }
}

impl ScatterConfig {
    pub fn with_tag(mut self, tag: CommTag) -> Self {
        self.tag = tag;
        self
    }

    /// Reject payloads on non-root ranks.
    pub fn strict(mut self) -> Self {
        self.non_root_payload = NonRootPayload::Reject;
        self
    }
}

/// A contiguous slice of the root's sequence and the index of its first item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block<T> {
    pub offset: usize,
    pub items: Vec<T>,
}

impl<T> Block<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Indices covered in the root's sequence.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.items.len()
    }
}

/// Split `items` into one block per rank following [`block_ranges`].
pub fn split_blocks<T>(items: Vec<T>, parts: usize) -> Vec<Block<T>> {
    let ranges = block_ranges(items.len(), parts);
    let mut rest = items.into_iter();
    ranges
        .into_iter()
        .map(|r| Block {
            offset: r.start,
            items: rest.by_ref().take(r.len()).collect(),
        })
        .collect()
}

/// Scatter one `serde` value per rank; rank `i` receives `payload[i]`.
///
/// `input` must be [`RootInput::Payload`] with exactly `comm.size()` values on
/// `root`. Elsewhere it is ignored or rejected according to `cfg`.
pub fn scatter<C, T>(
    comm: &C,
    root: usize,
    input: RootInput<T>,
    cfg: &ScatterConfig,
) -> Result<T, ScatterError>
where
    C: Communicator,
    T: Serialize + DeserializeOwned,
{
    scatter_with(
        comm,
        root,
        input,
        cfg,
        KIND_SCATTER,
        |v| wire::encode_serde(v).map_err(ScatterError::Encode),
        |peer, body| {
            wire::decode_serde(body).map_err(|source| ScatterError::Decode { peer, source })
        },
    )
}

/// Like [`scatter`], sending fixed-size records as raw bytes.
pub fn scatter_pod<C, T>(
    comm: &C,
    root: usize,
    input: RootInput<T>,
    cfg: &ScatterConfig,
) -> Result<T, ScatterError>
where
    C: Communicator,
    T: Pod,
{
    scatter_with(
        comm,
        root,
        input,
        cfg,
        KIND_SCATTER,
        |v| Ok(wire::encode_pod(v)),
        |peer, body| {
            wire::decode_pod(body).map_err(|source| ScatterError::Wire { peer, source })
        },
    )
}

/// Scatter a sequence of any length as contiguous blocks: every rank gets
/// `len / size` items and the first `len % size` ranks one more.
pub fn scatter_blocks<C, T>(
    comm: &C,
    root: usize,
    input: RootInput<T>,
    cfg: &ScatterConfig,
) -> Result<Block<T>, ScatterError>
where
    C: Communicator,
    T: Serialize + DeserializeOwned,
{
    let group = Group::of(comm)?;
    group.check_root(root)?;
    // only the root's payload is split; elsewhere it is dropped or rejected as is
    let blocks = if group.is_root(root) {
        input.map_payload(|items| split_blocks(items, group.size()))
    } else {
        input.map_payload(|_| Vec::new())
    };
    scatter_with(
        comm,
        root,
        blocks,
        cfg,
        KIND_BLOCK,
        |b| wire::encode_serde(b).map_err(ScatterError::Encode),
        |peer, body| {
            wire::decode_serde(body).map_err(|source| ScatterError::Decode { peer, source })
        },
    )
}

fn scatter_with<C, T, E, D>(
    comm: &C,
    root: usize,
    input: RootInput<T>,
    cfg: &ScatterConfig,
    kind: u16,
    encode: E,
    decode: D,
) -> Result<T, ScatterError>
where
    C: Communicator,
    E: Fn(&T) -> Result<Vec<u8>, ScatterError>,
    D: Fn(usize, &[u8]) -> Result<T, ScatterError>,
{
    let group = Group::of(comm)?;
    group.check_root(root)?;
    let tag = cfg.tag.as_u16();

    if !group.is_root(root) {
        // consume the root's frame even when the payload is rejected
        let raw = comm
            .recv(root, tag)
            .map_err(|e| ScatterError::from_comm(root, e))?;
        if input.is_payload() {
            match cfg.non_root_payload {
                NonRootPayload::Ignore => log::debug!(
                    "scatter: rank {} ignoring payload supplied on non-root",
                    group.rank()
                ),
                NonRootPayload::Reject => {
                    return Err(ScatterError::UnexpectedPayload { rank: group.rank() });
                }
            }
        }
        let body = wire::decode_frame(kind, &raw)
            .map_err(|source| ScatterError::Wire { peer: root, source })?;
        log::trace!(
            "scatter: rank {} received {} bytes from root {root}",
            group.rank(),
            body.len()
        );
        return decode(root, body);
    }

    let mut payload = input
        .into_payload()
        .ok_or(ScatterError::MissingRootPayload { root })?;
    if payload.len() != group.size() {
        return Err(ScatterError::ShapeMismatch {
            expected: group.size(),
            found: payload.len(),
        });
    }
    log::debug!(
        "scatter: root {root} distributing {} values (tag {tag:#06x})",
        group.size()
    );

    // 1) keep our own slice, encode every other one before the first send
    let own = payload.remove(root);
    let frames = group
        .peers_of(root)
        .zip(payload.iter())
        .map(|(dest, value)| -> Result<_, ScatterError> {
            let frame = wire::encode_frame(kind, &encode(value)?)
                .map_err(|source| ScatterError::Wire { peer: dest, source })?;
            Ok((dest, frame))
        })
        .collect::<Result<Vec<_>, ScatterError>>()?;

    // 2) post all sends
    let pending: Vec<_> = frames
        .iter()
        .map(|(dest, frame)| (*dest, comm.isend(*dest, tag, frame)))
        .collect();

    // 3) always drain every send handle before returning
    let mut maybe_err = None;
    for (dest, h) in pending {
        if let Err(e) = h.wait() {
            log::warn!("scatter: send to rank {dest} failed: {e}");
            if maybe_err.is_none() {
                maybe_err = Some(ScatterError::from_comm(dest, e));
            }
        }
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(own),
    }
}

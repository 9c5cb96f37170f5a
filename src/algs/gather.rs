//! Collective gather: every rank contributes one value, the root collects
//! them in rank order.
//!
//! The root posts all receives first, then waits on every handle, and only
//! reports the first failure after the last handle has been drained.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::algs::communicator::{CommError, CommTag, Communicator, Wait};
use crate::algs::wire::{self, KIND_GATHER};
use crate::scatter_error::ScatterError;
use crate::topology::group::Group;

pub const DEFAULT_GATHER_TAG: CommTag = CommTag::new(0x6A7E);

/// Returns `Some(values)` (index `i` from rank `i`) on `root`, `None` elsewhere.
pub fn gather<C, T>(
    comm: &C,
    root: usize,
    value: T,
    tag: CommTag,
) -> Result<Option<Vec<T>>, ScatterError>
where
    C: Communicator,
    T: Serialize + DeserializeOwned,
{
    let group = Group::of(comm)?;
    group.check_root(root)?;
    let tag = tag.as_u16();

    if !group.is_root(root) {
        let body = wire::encode_serde(&value).map_err(ScatterError::Encode)?;
        let frame = wire::encode_frame(KIND_GATHER, &body)
            .map_err(|source| ScatterError::Wire { peer: root, source })?;
        comm.send(root, tag, &frame)
            .map_err(|e| ScatterError::from_comm(root, e))?;
        log::trace!("gather: rank {} sent {} bytes to root {root}", group.rank(), body.len());
        return Ok(None);
    }

    log::debug!(
        "gather: root {root} collecting from {} ranks (tag {tag:#06x})",
        group.size()
    );

    // 1) post all receives
    let pending: Vec<(usize, C::RecvHandle)> = group
        .peers_of(root)
        .map(|src| (src, comm.irecv(src, tag)))
        .collect();

    // 2) wait for every receive, keep the first error but do not early-return
    let mut slots: Vec<Option<T>> = (0..group.size()).map(|_| None).collect();
    let mut maybe_err = None;
    for (src, h) in pending {
        let decoded = match h.wait() {
            Ok(Some(raw)) => wire::decode_frame(KIND_GATHER, &raw)
                .map_err(|source| ScatterError::Wire { peer: src, source })
                .and_then(|body| {
                    wire::decode_serde(body)
                        .map_err(|source| ScatterError::Decode { peer: src, source })
                }),
            Ok(None) => Err(ScatterError::from_comm(src, CommError::NoData { peer: src, tag })),
            Err(e) => Err(ScatterError::from_comm(src, e)),
        };
        match decoded {
            Ok(v) => slots[src] = Some(v),
            Err(err) => {
                log::warn!("gather: receive from rank {src} failed: {err}");
                if maybe_err.is_none() {
                    maybe_err = Some(err);
                }
            }
        }
    }
    if let Some(err) = maybe_err {
        return Err(err);
    }

    slots[root] = Some(value);
    Ok(Some(slots.into_iter().flatten().collect()))
}

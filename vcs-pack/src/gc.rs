//! Component G: the GC controller (§4.G). Reachability (via component K)
//! feeds a bounded delta search over a sliding window of recently seen
//! blobs/trees, then every object streams into a single new pack.
//! `prune` is a separate, explicit call: a pack is only safe to advertise
//! (and its loose duplicates only safe to delete) once the caller has
//! durably written the pack bytes and `.idx` to their backend, per §5's
//! "pack write is atomic at file level" rule — this crate has no opinion on
//! *where* that happens, so it does not prune automatically inside
//! `run_gc`.

use crate::index;
use crate::writer::PackWriter;
use crate::Error;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use vcs_features::CancelToken;
use vcs_hash::ObjectId;
use vcs_object::{Kind, codec};
use vcs_odb::raw::RawStoreExt;
use vcs_odb::{CommitStore, RawStore, TreeStore};

#[derive(Debug, Clone)]
pub struct GcOptions {
    /// How many prior same-kind objects are considered as delta bases.
    pub window: usize,
    /// A delta is kept only if its size is below `body_size * delta_factor`.
    pub delta_factor: f64,
    /// Checked between objects (§5's suspension-point cancellation); never
    /// set means the run never observes a cancel request.
    pub cancel: CancelToken,
}

impl Default for GcOptions {
    fn default() -> Self {
        GcOptions {
            window: 10,
            delta_factor: 0.5,
            cancel: CancelToken::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GcOutcome {
    pub objects_processed: usize,
    pub deltas_created: usize,
    pub duration: Duration,
    /// Best-effort estimate of bytes saved by delta compression versus
    /// storing every object whole.
    pub bytes_saved: i64,
    pub pack_bytes: Vec<u8>,
    pub index_bytes: Vec<u8>,
    pub pack_checksum: ObjectId,
    /// Every id now present in the pack, for a later [`prune`] call.
    pub packed_ids: Vec<ObjectId>,
}

/// One reachable object plus the snapshot of its same-kind sliding window
/// at the point it was visited, so the (expensive) delta search can run on
/// a worker pool while the pack writer still streams objects in walk order.
struct Candidate {
    kind: Kind,
    body: Vec<u8>,
    window: Vec<(ObjectId, Vec<u8>)>,
}

/// Walks every object reachable from `roots` (commits, their trees, and the
/// blobs those trees name) and streams them into one new pack, delta
/// compressing blobs and trees against a recent window of same-kind
/// objects when that shrinks them enough.
///
/// The window itself is built up sequentially (each object's window is the
/// prior same-kind objects in walk order), but searching that window for
/// the best delta base is the expensive part and has no cross-candidate
/// dependency, so it fans out across a thread pool the way the teacher's
/// `objects_to_entries_iter` parallelizes delta search with
/// `parallel::in_parallel`, then the results are streamed into the pack
/// writer serially to keep `OFS_DELTA` back-references in order.
pub fn run_gc(
    raw: &dyn RawStore,
    commits: &CommitStore,
    trees: &TreeStore,
    roots: &[ObjectId],
    options: GcOptions,
) -> Result<GcOutcome, Error> {
    let start = Instant::now();
    let objects = vcs_traverse::reachable(commits, trees, roots, &[])?;

    let mut windows: HashMap<Kind, VecDeque<(ObjectId, Vec<u8>)>> = HashMap::new();
    let mut bodies = Vec::with_capacity(objects.len());
    let mut candidates = Vec::with_capacity(objects.len());
    for (kind, id) in &objects {
        if options.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let framed = raw.get_bytes(id)?.ok_or(Error::NotFound(*id))?;
        let (_, body) = codec::decode(&framed)?;
        let body = body.to_vec();
        let window = windows.get(kind).map(|w| w.iter().cloned().collect()).unwrap_or_default();
        candidates.push(Candidate {
            kind: *kind,
            body: body.clone(),
            window,
        });

        if matches!(kind, Kind::Blob | Kind::Tree) {
            let window = windows.entry(*kind).or_default();
            window.push_back((*id, body.clone()));
            if window.len() > options.window {
                window.pop_front();
            }
        }
        bodies.push(body);
    }

    let delta_factor = options.delta_factor;
    let (chunk_size, threads) = vcs_features::parallel::optimize_chunk_size_and_thread_limit(0, Some(candidates.len()), None);
    let searched: Vec<Option<(ObjectId, Vec<u8>)>> = vcs_features::parallel::in_parallel(
        candidates,
        chunk_size,
        threads,
        move |chunk: Vec<Candidate>| -> Result<Vec<Option<(ObjectId, Vec<u8>)>>, Error> {
            Ok(chunk
                .into_iter()
                .map(|c| {
                    if !matches!(c.kind, Kind::Blob | Kind::Tree) {
                        return None;
                    }
                    let threshold = (c.body.len() as f64 * delta_factor) as usize;
                    best_delta_base(&c.window, &c.body).filter(|(_, delta)| delta.len() < threshold)
                })
                .collect())
        },
    )?;

    let mut pack_bytes = Vec::new();
    let mut writer = PackWriter::new(&mut pack_bytes, objects.len() as u32)?;
    let mut deltas_created = 0usize;
    let mut bytes_saved = 0i64;
    let mut packed_ids = Vec::with_capacity(objects.len());

    for (((kind, id), body), delta_candidate) in objects.iter().zip(bodies.iter()).zip(searched.into_iter()) {
        if options.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match delta_candidate {
            Some((base_id, delta)) => {
                writer.add_ofs_delta(*id, base_id, &delta)?;
                deltas_created += 1;
                bytes_saved += body.len() as i64 - delta.len() as i64;
            }
            None => writer.add_object(*id, *kind, body)?,
        }
        packed_ids.push(*id);
    }

    let outcome = writer.finalize()?;
    let index_bytes = index::write(&outcome.entries, outcome.pack_checksum);

    Ok(GcOutcome {
        objects_processed: objects.len(),
        deltas_created,
        duration: start.elapsed(),
        bytes_saved,
        pack_bytes,
        index_bytes,
        pack_checksum: outcome.pack_checksum,
        packed_ids,
    })
}

fn best_delta_base(window: &[(ObjectId, Vec<u8>)], body: &[u8]) -> Option<(ObjectId, Vec<u8>)> {
    window
        .iter()
        .map(|(id, candidate)| (*id, vcs_delta::create_delta(candidate, body)))
        .min_by_key(|(_, delta)| delta.len())
}

/// Deletes the loose copy of every id in `ids` that a caller has confirmed
/// is now durably packed. Idempotent: ids already absent are simply
/// skipped.
pub fn prune(raw: &dyn RawStore, ids: &[ObjectId]) -> Result<usize, Error> {
    let mut pruned = 0;
    for id in ids {
        if raw.delete(id)? {
            pruned += 1;
        }
    }
    Ok(pruned)
}

//! The queue-based blame walk itself (§4.J): pop the highest-priority
//! candidate, resolve it against its commit's parent(s), and either blame it
//! or push what's left further up the graph.

use crate::region::{split_regions_by_edits, Candidate, Queue, Region};
use crate::similarity::{is_binary, similarity_score};
use crate::{BlameResult, Entry, Error, Options};
use bstr::BString;
use vcs_object::{Commit, Identity, Mode};
use vcs_odb::{BlobStore, CommitStore, TreeStore};
use vcs_hash::ObjectId;

pub fn blame_file(
    commits: &CommitStore,
    trees: &TreeStore,
    blobs: &BlobStore,
    start_commit: ObjectId,
    path: &[u8],
    options: Options,
) -> Result<BlameResult, Error> {
    let start = commits.load(&start_commit)?.ok_or(Error::CommitNotFound(start_commit))?;
    let path = BString::from(path);
    let blob_id = find_path_in_tree(trees, start.tree, &path)?.ok_or_else(|| Error::PathNotFound(path.clone(), start_commit))?;
    let content = blobs.load_bytes(&blob_id)?.ok_or(Error::BlobNotFound(blob_id))?;
    let line_count = vcs_diff::split_lines(&content).len() as u32;

    let mut queue = Queue::new();
    queue.push_or_merge(Candidate {
        commit_id: start_commit,
        timestamp: start.committer.seconds,
        path: path.clone(),
        blob_id,
        regions: vec![Region { result_start: 0, length: line_count, source_start: 0 }],
    });

    let mut blamed: Vec<(Region, ObjectId, Identity, BString)> = Vec::new();
    let mut remaining = line_count;

    while remaining > 0 {
        let Some(candidate) = queue.pop_highest_priority() else { break };
        let commit = commits.load(&candidate.commit_id)?.ok_or(Error::CommitNotFound(candidate.commit_id))?;

        if commit.parents.is_empty() {
            remaining -= blame_regions(&mut blamed, &candidate, &commit);
            continue;
        }

        if commit.parents.len() == 1 {
            remaining -= step_single_parent(commits, trees, blobs, &mut queue, &candidate, &commit, commit.parents[0], &options, &mut blamed)?;
            continue;
        }

        remaining -= step_merge(commits, trees, blobs, &mut queue, &candidate, &commit, &mut blamed)?;
    }

    let mut entries: Vec<Entry> = Vec::with_capacity(blamed.len());
    blamed.sort_by_key(|(region, ..)| region.result_start);
    for (region, commit_id, author, source_path) in blamed {
        if let Some(last) = entries.last_mut() {
            if last.commit_id == commit_id
                && last.source_path == source_path
                && last.result_start + last.length == region.result_start
                && last.source_start + last.length == region.source_start
            {
                last.length += region.length;
                continue;
            }
        }
        entries.push(Entry {
            result_start: region.result_start,
            length: region.length,
            commit_id,
            author,
            source_path,
            source_start: region.source_start,
        });
    }

    Ok(BlameResult { entries, line_count })
}

fn blame_regions(
    blamed: &mut Vec<(Region, ObjectId, Identity, BString)>,
    candidate: &Candidate,
    commit: &Commit,
) -> u32 {
    let mut total = 0;
    for region in &candidate.regions {
        total += region.length;
        blamed.push((*region, candidate.commit_id, commit.author.clone(), candidate.path.clone()));
    }
    total
}

#[allow(clippy::too_many_arguments)]
fn step_single_parent(
    commits: &CommitStore,
    trees: &TreeStore,
    blobs: &BlobStore,
    queue: &mut Queue,
    candidate: &Candidate,
    commit: &Commit,
    parent_id: ObjectId,
    options: &Options,
    blamed: &mut Vec<(Region, ObjectId, Identity, BString)>,
) -> Result<u32, Error> {
    let parent = commits.load(&parent_id)?.ok_or(Error::CommitNotFound(parent_id))?;
    let found = find_path_in_tree(trees, parent.tree, &candidate.path)?;

    let (parent_path, parent_blob_id) = match found {
        Some(id) => (candidate.path.clone(), Some(id)),
        None if options.follow_renames => {
            let child_bytes = blobs.load_bytes(&candidate.blob_id)?.ok_or(Error::BlobNotFound(candidate.blob_id))?;
            match find_rename_candidate(trees, blobs, parent.tree, &child_bytes, options.similarity_threshold)? {
                Some((path, id)) => (path, Some(id)),
                None => (candidate.path.clone(), None),
            }
        }
        None => (candidate.path.clone(), None),
    };

    let Some(parent_blob_id) = parent_blob_id else {
        // No ancestor content could be located: this commit introduced these lines.
        return Ok(blame_regions(blamed, candidate, commit));
    };

    if parent_blob_id == candidate.blob_id {
        queue.push_or_merge(Candidate {
            commit_id: parent_id,
            timestamp: parent.committer.seconds,
            path: parent_path,
            blob_id: parent_blob_id,
            regions: candidate.regions.clone(),
        });
        return Ok(0);
    }

    let parent_bytes = blobs.load_bytes(&parent_blob_id)?.ok_or(Error::BlobNotFound(parent_blob_id))?;
    let child_bytes = blobs.load_bytes(&candidate.blob_id)?.ok_or(Error::BlobNotFound(candidate.blob_id))?;
    let edits = vcs_diff::diff_lines(&parent_bytes, &child_bytes, vcs_diff::Algorithm::Histogram);
    let (parent_regions, child_regions) = split_regions_by_edits(&candidate.regions, &edits);

    if !parent_regions.is_empty() {
        queue.push_or_merge(Candidate {
            commit_id: parent_id,
            timestamp: parent.committer.seconds,
            path: parent_path,
            blob_id: parent_blob_id,
            regions: parent_regions,
        });
    }

    let mut total = 0;
    for region in &child_regions {
        total += region.length;
        blamed.push((*region, candidate.commit_id, commit.author.clone(), candidate.path.clone()));
    }
    Ok(total)
}

fn step_merge(
    commits: &CommitStore,
    trees: &TreeStore,
    blobs: &BlobStore,
    queue: &mut Queue,
    candidate: &Candidate,
    commit: &Commit,
    blamed: &mut Vec<(Region, ObjectId, Identity, BString)>,
) -> Result<u32, Error> {
    for &parent_id in &commit.parents {
        let parent = commits.load(&parent_id)?.ok_or(Error::CommitNotFound(parent_id))?;
        if find_path_in_tree(trees, parent.tree, &candidate.path)? == Some(candidate.blob_id) {
            queue.push_or_merge(Candidate {
                commit_id: parent_id,
                timestamp: parent.committer.seconds,
                path: candidate.path.clone(),
                blob_id: candidate.blob_id,
                regions: candidate.regions.clone(),
            });
            return Ok(0);
        }
    }

    let mut remaining_regions = candidate.regions.clone();
    for &parent_id in &commit.parents {
        if remaining_regions.is_empty() {
            break;
        }
        let parent = commits.load(&parent_id)?.ok_or(Error::CommitNotFound(parent_id))?;
        let Some(parent_blob_id) = find_path_in_tree(trees, parent.tree, &candidate.path)? else {
            continue;
        };
        let parent_bytes = blobs.load_bytes(&parent_blob_id)?.ok_or(Error::BlobNotFound(parent_blob_id))?;
        let child_bytes = blobs.load_bytes(&candidate.blob_id)?.ok_or(Error::BlobNotFound(candidate.blob_id))?;
        let edits = vcs_diff::diff_lines(&parent_bytes, &child_bytes, vcs_diff::Algorithm::Histogram);
        let (parent_regions, child_regions) = split_regions_by_edits(&remaining_regions, &edits);

        if !parent_regions.is_empty() {
            queue.push_or_merge(Candidate {
                commit_id: parent_id,
                timestamp: parent.committer.seconds,
                path: candidate.path.clone(),
                blob_id: parent_blob_id,
                regions: parent_regions,
            });
        }
        remaining_regions = child_regions;
    }

    let mut total = 0;
    for region in &remaining_regions {
        total += region.length;
        blamed.push((*region, candidate.commit_id, commit.author.clone(), candidate.path.clone()));
    }
    Ok(total)
}

/// Descends `path` component by component from `tree_id`, returning the
/// blob id at the final component, or `None` if any component is missing.
pub(crate) fn find_path_in_tree(trees: &TreeStore, tree_id: ObjectId, path: &[u8]) -> Result<Option<ObjectId>, Error> {
    let components: Vec<&[u8]> = path.split(|&b| b == b'/').collect();
    if components.is_empty() {
        return Ok(None);
    }
    let mut current = tree_id;
    for (i, component) in components.iter().enumerate() {
        let Some(tree) = trees.load(&current)? else { return Ok(None) };
        let Some(entry) = tree.get(component) else { return Ok(None) };
        if i + 1 == components.len() {
            return Ok(Some(entry.id));
        }
        if !entry.mode.is_tree() {
            return Ok(None);
        }
        current = entry.id;
    }
    Ok(None)
}

fn collect_blobs(trees: &TreeStore, tree_id: ObjectId, prefix: &BString, out: &mut Vec<(BString, ObjectId)>) -> Result<(), Error> {
    let Some(tree) = trees.load(&tree_id)? else { return Ok(()) };
    for entry in &tree.entries {
        let mut path = prefix.clone();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.name);
        match entry.mode {
            Mode::Tree => collect_blobs(trees, entry.id, &path, out)?,
            Mode::File | Mode::Executable | Mode::Symlink => out.push((path, entry.id)),
            Mode::Gitlink => {}
        }
    }
    Ok(())
}

fn find_rename_candidate(
    trees: &TreeStore,
    blobs: &BlobStore,
    parent_tree: ObjectId,
    child_content: &[u8],
    threshold: u8,
) -> Result<Option<(BString, ObjectId)>, Error> {
    if is_binary(child_content) {
        return Ok(None);
    }
    let mut candidates = Vec::new();
    collect_blobs(trees, parent_tree, &BString::default(), &mut candidates)?;

    let mut best: Option<(u8, BString, ObjectId)> = None;
    for (path, blob_id) in candidates {
        let Some(content) = blobs.load_bytes(&blob_id)? else { continue };
        if is_binary(&content) {
            continue;
        }
        let score = similarity_score(child_content, &content);
        if score >= threshold && best.as_ref().map_or(true, |(best_score, ..)| score > *best_score) {
            best = Some((score, path, blob_id));
        }
    }
    Ok(best.map(|(_, path, id)| (path, id)))
}

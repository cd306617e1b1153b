//! In-progress operation states and their capability matrix (§4.I). A
//! repository's state is computed from which marker files/directories
//! exist under its control directory (§6: `MERGE_HEAD`, `ORIG_HEAD`,
//! `CHERRY_PICK_HEAD`, `REVERT_HEAD`, `rebase-apply/`, `rebase-merge/`
//! with an `interactive` marker, `BISECT_LOG`).

use std::fs;
use std::path::{Path, PathBuf};
use vcs_hash::ObjectId;

/// Which rebase flavor is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseKind {
    Classic,
    Merge,
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInfo {
    pub merge_head: ObjectId,
    pub orig_head: Option<ObjectId>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CherryPickInfo {
    pub cherry_pick_head: ObjectId,
    pub orig_head: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertInfo {
    pub revert_head: ObjectId,
    pub orig_head: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseInfo {
    pub kind: RebaseKind,
    pub onto: Option<ObjectId>,
    pub head: Option<ObjectId>,
    pub current_step: u32,
    pub total_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyInfo {
    pub current_step: u32,
    pub total_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectInfo {
    pub log: Vec<String>,
}

/// The working copy's repository-wide state (§4.I table). `Resolved`
/// variants are the same marker with all index conflicts cleared — the
/// caller decides which applies by also checking `Index::has_conflicts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Bare,
    Safe,
    Merging(MergeInfo),
    MergingResolved(MergeInfo),
    CherryPicking(CherryPickInfo),
    CherryPickingResolved(CherryPickInfo),
    Reverting(RevertInfo),
    RevertingResolved(RevertInfo),
    Rebasing(RebaseInfo),
    Apply(ApplyInfo),
    Bisecting(BisectInfo),
}

/// The `{can_checkout, can_commit, can_reset_head, can_amend, is_rebasing}`
/// tuple from §4.I's capability matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_checkout: bool,
    pub can_commit: bool,
    pub can_reset_head: bool,
    pub can_amend: bool,
    pub is_rebasing: bool,
}

const BARE: Capabilities = Capabilities {
    can_checkout: false,
    can_commit: false,
    can_reset_head: false,
    can_amend: false,
    is_rebasing: false,
};

impl OperationState {
    /// Looks up this state's row of §4.I's capability matrix.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            OperationState::Bare => BARE,
            OperationState::Safe => Capabilities {
                can_checkout: true,
                can_commit: true,
                can_reset_head: true,
                can_amend: true,
                is_rebasing: false,
            },
            OperationState::Merging(_) => Capabilities {
                can_reset_head: true,
                ..BARE
            },
            OperationState::MergingResolved(_) => Capabilities {
                can_commit: true,
                can_reset_head: true,
                ..BARE
            },
            OperationState::CherryPicking(_) => Capabilities {
                can_reset_head: true,
                ..BARE
            },
            OperationState::CherryPickingResolved(_) => Capabilities {
                can_commit: true,
                can_reset_head: true,
                ..BARE
            },
            OperationState::Reverting(_) => Capabilities {
                can_reset_head: true,
                ..BARE
            },
            OperationState::RevertingResolved(_) => Capabilities {
                can_commit: true,
                can_reset_head: true,
                ..BARE
            },
            OperationState::Rebasing(_) => Capabilities {
                can_amend: true,
                is_rebasing: true,
                ..BARE
            },
            OperationState::Apply(_) => Capabilities {
                can_amend: true,
                ..BARE
            },
            OperationState::Bisecting(_) => Capabilities {
                can_checkout: true,
                ..BARE
            },
        }
    }
}

fn read_id(path: &Path) -> std::io::Result<Option<ObjectId>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(ObjectId::from_hex(text.trim()).ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_text(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn orig_head(control_dir: &Path) -> std::io::Result<Option<ObjectId>> {
    read_id(&control_dir.join("ORIG_HEAD"))
}

/// Inspects `control_dir` (the directory that would be `.git` in a native
/// checkout) for the §6 state markers and reports which [`OperationState`]
/// applies. `has_conflicts` distinguishes a merge/cherry-pick/revert's
/// plain and `*Resolved` variants.
pub fn detect(control_dir: &Path, has_conflicts: bool) -> std::io::Result<OperationState> {
    if let Some(merge_head) = read_id(&control_dir.join("MERGE_HEAD"))? {
        let info = MergeInfo {
            merge_head,
            orig_head: orig_head(control_dir)?,
            message: read_text(&control_dir.join("MERGE_MSG"))?,
        };
        return Ok(if has_conflicts {
            OperationState::Merging(info)
        } else {
            OperationState::MergingResolved(info)
        });
    }
    if let Some(cherry_pick_head) = read_id(&control_dir.join("CHERRY_PICK_HEAD"))? {
        let info = CherryPickInfo {
            cherry_pick_head,
            orig_head: orig_head(control_dir)?,
        };
        return Ok(if has_conflicts {
            OperationState::CherryPicking(info)
        } else {
            OperationState::CherryPickingResolved(info)
        });
    }
    if let Some(revert_head) = read_id(&control_dir.join("REVERT_HEAD"))? {
        let info = RevertInfo {
            revert_head,
            orig_head: orig_head(control_dir)?,
        };
        return Ok(if has_conflicts {
            OperationState::Reverting(info)
        } else {
            OperationState::RevertingResolved(info)
        });
    }
    if let Some(info) = detect_rebase(control_dir)? {
        return Ok(OperationState::Rebasing(info));
    }
    if control_dir.join("rebase-apply").is_dir() && !control_dir.join("rebase-apply/rebasing").is_file() {
        let step = read_text(&control_dir.join("rebase-apply/next"))?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let total = read_text(&control_dir.join("rebase-apply/last"))?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        return Ok(OperationState::Apply(ApplyInfo {
            current_step: step,
            total_steps: total,
        }));
    }
    if control_dir.join("BISECT_LOG").is_file() {
        let log = read_text(&control_dir.join("BISECT_LOG"))?
            .map(|s| s.lines().map(str::to_owned).collect())
            .unwrap_or_default();
        return Ok(OperationState::Bisecting(BisectInfo { log }));
    }
    Ok(OperationState::Safe)
}

fn detect_rebase(control_dir: &Path) -> std::io::Result<Option<RebaseInfo>> {
    let (dir, kind) = if control_dir.join("rebase-merge").is_dir() {
        let base: PathBuf = control_dir.join("rebase-merge");
        let kind = if base.join("interactive").is_file() {
            RebaseKind::Interactive
        } else {
            RebaseKind::Merge
        };
        (base, kind)
    } else if control_dir.join("rebase-apply/rebasing").is_file() {
        (control_dir.join("rebase-apply"), RebaseKind::Classic)
    } else {
        return Ok(None);
    };

    let onto = read_id(&dir.join("onto"))?;
    let head = read_id(&dir.join("orig-head"))?.or(read_id(&dir.join("head-name"))?);
    let current_step = read_text(&dir.join("msgnum"))?
        .or(read_text(&dir.join("next"))?)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let total_steps = read_text(&dir.join("end"))?
        .or(read_text(&dir.join("last"))?)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);

    Ok(Some(RebaseInfo {
        kind,
        onto,
        head,
        current_step,
        total_steps,
    }))
}

use std::time::Instant;

/// Reports progress of a potentially long-running, hierarchical operation.
///
/// Callers that don't care pass [`Discard`]; tests and CLIs that do can
/// implement this for their own sink. Mirrors the shape used by the
/// teacher's `objects_to_entries_iter` and pack-index writer
/// (`init`/`inc`/`add_child`/`show_throughput`).
pub trait Progress {
    type SubProgress: Progress;

    /// Declare the total amount of work, if known, and a unit name.
    fn init(&mut self, max: Option<usize>, unit: Option<&'static str>);
    /// Advance by one step.
    fn inc(&mut self) {
        self.inc_by(1)
    }
    /// Advance by `n` steps.
    fn inc_by(&mut self, n: usize);
    /// Set the absolute step count.
    fn set(&mut self, step: usize);
    /// Spawn a named child tracking a sub-phase of this operation.
    fn add_child(&mut self, name: impl Into<String>) -> Self::SubProgress;
    /// Emit a human-oriented throughput summary; a no-op sink may ignore it.
    fn show_throughput(&mut self, _started: Instant, _items: u32, _unit: &'static str) {}
}

/// A [`Progress`] implementation that does nothing, for callers that don't
/// need reporting.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Progress for Discard {
    type SubProgress = Discard;
    fn init(&mut self, _max: Option<usize>, _unit: Option<&'static str>) {}
    fn inc_by(&mut self, _n: usize) {}
    fn set(&mut self, _step: usize) {}
    fn add_child(&mut self, _name: impl Into<String>) -> Self::SubProgress {
        Discard
    }
}

/// A [`Progress`] implementation that just counts steps, useful in tests
/// asserting an operation reported the expected amount of work.
#[derive(Debug, Default)]
pub struct Counting {
    pub max: Option<usize>,
    pub unit: Option<&'static str>,
    pub steps: usize,
    pub children: usize,
}

impl Progress for Counting {
    type SubProgress = Counting;
    fn init(&mut self, max: Option<usize>, unit: Option<&'static str>) {
        self.max = max;
        self.unit = unit;
    }
    fn inc_by(&mut self, n: usize) {
        self.steps += n;
    }
    fn set(&mut self, step: usize) {
        self.steps = step;
    }
    fn add_child(&mut self, _name: impl Into<String>) -> Self::SubProgress {
        self.children += 1;
        Counting::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_tracks_steps_and_children() {
        let mut p = Counting::default();
        p.init(Some(3), Some("objects"));
        p.inc();
        let mut child = p.add_child("resolving");
        child.inc_by(2);
        assert_eq!(p.steps, 1);
        assert_eq!(p.children, 1);
        assert_eq!(child.steps, 2);
    }
}

//! Pagination engine: reacts to notification batches with guarded passes

use crate::config::{PageMetrics, PaginationOptions};
use crate::document::BreakId;
use crate::error::Result;
use crate::layout::breaks::BreakPlan;
use crate::layout::detector::{self, ChangeClass, NotificationBatch};
use crate::layout::geometry::GeometryReader;
use crate::layout::page_count::{estimate, ChromeHold, RenderedExtent};
use crate::layout::state::OverlayState;
use crate::render::{LayoutSource, RenderTree, SpacerOps, SyncReport, Synchronizer};
use log::{debug, trace};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Meta key tagging the "page count changed" transaction
pub const PAGE_COUNT_META_KEY: &str = "PAGE_COUNT_META_KEY";
/// Meta key tagging the "break heights changed" transaction
pub const PAGE_BREAKS_META_KEY: &str = "PAGE_BREAKS_META_KEY";

/// Tells the rendering layer which overlay set to regenerate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    PageCount,
    Breaks,
}

impl Signal {
    pub fn meta_key(self) -> &'static str {
        match self {
            Signal::PageCount => PAGE_COUNT_META_KEY,
            Signal::Breaks => PAGE_BREAKS_META_KEY,
        }
    }
}

pub type Signals = SmallVec<[Signal; 2]>;

/// Result of a pass run against a host that applies the writes itself
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalPass {
    pub plan: BreakPlan,
    pub ops: SpacerOps,
    /// Chrome entries to mount before applying `ops`
    pub provisional_pages: usize,
}

/// Owns the overlay state and runs recompute passes against a render tree
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    metrics: PageMetrics,
    state: OverlayState,
    pass_active: bool,
    passes: u64,
    chrome_hold: Option<ChromeHold>,
    /// Last page-count change seen by `observe_page_count`, as (from, to)
    last_observed: Option<(usize, usize)>,
}

impl PaginationEngine {
    pub fn new(options: &PaginationOptions) -> Result<Self> {
        Ok(Self::from_metrics(options.metrics()?))
    }

    pub fn from_metrics(metrics: PageMetrics) -> Self {
        Self {
            metrics,
            state: OverlayState::new(),
            pass_active: false,
            passes: 0,
            chrome_hold: None,
            last_observed: None,
        }
    }

    pub fn metrics(&self) -> &PageMetrics {
        &self.metrics
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Completed recompute passes since creation or the last reset
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_pass_active(&self) -> bool {
        self.pass_active
    }

    /// Switch to new page geometry. All state is discarded; the caller is
    /// expected to force a recompute.
    pub fn reconfigure(&mut self, options: &PaginationOptions) -> Result<()> {
        self.metrics = options.metrics()?;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.passes = 0;
        self.chrome_hold = None;
        self.last_observed = None;
    }

    /// Forget records of markers no longer in the document
    pub fn retain_breaks(&mut self, live: &FxHashSet<BreakId>) {
        self.state.retain(live);
    }

    /// React to one notification batch. Batches arriving while a pass is
    /// active are dropped: the pass's own writes produce the next batch.
    pub fn handle<R: RenderTree + ?Sized>(
        &mut self,
        tree: &mut R,
        batch: &NotificationBatch,
    ) -> Signals {
        if self.pass_active {
            trace!("pass active, dropping {} notifications", batch.len());
            return Signals::new();
        }
        if batch.is_empty() {
            return Signals::new();
        }

        let class = detector::classify(&*tree, &self.state, batch);
        trace!("{} notifications classified as {:?}", batch.len(), class);
        match class {
            ChangeClass::Recompute => self.recompute(tree),
            ChangeClass::PageCountOnly => self.check_page_count(tree).into_iter().collect(),
            ChangeClass::Idle => Signals::new(),
        }
    }

    /// Run a full pass: measure, compute breaks, write spacers, settle
    /// chrome.
    pub fn recompute<R: RenderTree + ?Sized>(&mut self, tree: &mut R) -> Signals {
        if self.pass_active {
            return Signals::new();
        }
        self.pass_active = true;
        let signals = self.run_pass(tree);
        self.pass_active = false;
        signals
    }

    fn run_pass<R: RenderTree + ?Sized>(&mut self, tree: &mut R) -> Signals {
        let pages_before = self.state.page_count();

        let plan = BreakPlan::compute(&*tree, &self.metrics);
        let report: SyncReport =
            Synchronizer::new(&self.metrics).apply(&plan, tree, &mut self.chrome_hold);
        self.state.commit(&plan, report.page_count);
        self.refresh_min_height(tree);
        self.passes += 1;

        debug!(
            "pass {}: {} breaks, {} spacer writes, {} pages",
            self.passes,
            plan.len(),
            report.spacer_writes(),
            self.state.page_count()
        );

        let mut signals = Signals::new();
        if self.state.page_count() != pages_before {
            signals.push(Signal::PageCount);
        }
        signals.push(Signal::Breaks);
        signals
    }

    /// Settle chrome on the estimated page count without touching spacers.
    /// Also keeps the root's minimum height in step with the chrome.
    pub fn check_page_count<R: RenderTree + ?Sized>(&mut self, tree: &mut R) -> Option<Signal> {
        if self.pass_active {
            return None;
        }
        self.pass_active = true;
        let mounted = tree.chrome_entries();
        let count = Synchronizer::new(&self.metrics).settle_chrome(tree, &mut self.chrome_hold);
        let changed = count != mounted || count != self.state.page_count();
        if changed {
            debug!("page count {} -> {}", mounted, count);
            self.state.set_page_count(count);
        }
        self.refresh_min_height(tree);
        self.pass_active = false;
        changed.then_some(Signal::PageCount)
    }

    /// Record the estimated page count of a read-only source. Signals when
    /// either the mounted chrome or the recorded count disagrees with it.
    ///
    /// The host mounts one step per call, so an estimate that undoes the
    /// previous step keeps the larger count instead.
    pub fn observe_page_count<S: LayoutSource + ?Sized>(&mut self, source: &S) -> Option<Signal> {
        let current = source.chrome_entries();
        let extent = RenderedExtent::read(source);
        let target = estimate(extent, current, &self.metrics);

        let held = self
            .chrome_hold
            .as_mut()
            .is_some_and(|hold| hold.holds(current, target, extent.gap()));
        let next = if target == current || held {
            self.last_observed = None;
            current
        } else if self.last_observed == Some((target, current)) {
            let damped = ChromeHold::between(current, target, extent.gap());
            self.chrome_hold = Some(damped);
            damped.kept
        } else {
            target
        };
        if next != current {
            self.last_observed = Some((current, next));
        }

        let changed = next != current || next != self.state.page_count();
        if changed {
            debug!("page count {} -> {}", current, next);
            self.state.set_page_count(next);
        }
        changed.then_some(Signal::PageCount)
    }

    /// Classify a host tick for a host that reports only whether the root
    /// itself changed
    pub fn classify_external<S: LayoutSource + ?Sized>(
        &self,
        source: &S,
        targets_root: bool,
    ) -> ChangeClass {
        if detector::markers_changed(source, self.state.last_marker_tops()) {
            ChangeClass::Recompute
        } else if targets_root {
            ChangeClass::PageCountOnly
        } else {
            ChangeClass::Idle
        }
    }

    /// Plan a pass for a host that performs the writes itself. State is
    /// committed against the page count the host currently shows.
    pub fn plan_external<S: LayoutSource + ?Sized>(&mut self, source: &S) -> ExternalPass {
        let plan = BreakPlan::compute(source, &self.metrics);
        let ops = Synchronizer::reconcile(&plan, source);
        let current = source.chrome_entries();
        let provisional_pages =
            estimate(RenderedExtent::read(source), current, &self.metrics) + plan.len() + 2;

        self.state.commit(&plan, current);
        self.passes += 1;
        ExternalPass {
            plan,
            ops,
            provisional_pages,
        }
    }

    fn refresh_min_height<R: RenderTree + ?Sized>(&self, tree: &mut R) {
        let last = tree.chrome_breakers().last().copied();
        if let Some(breaker) = last {
            let bottom = GeometryReader::new(&*tree).measure(breaker).bottom();
            tree.set_min_height(bottom);
        }
    }
}

//! Views and the operation/commit state machine.
//!
//! A view is the managed counterpart of a backend surface: geometry,
//! flags, maximization state, membership in one sheet/group/output, an
//! optional tile attachment and an optional mark back-reference.
//!
//! Geometry changes are asynchronous: queuing an operation sends a
//! configure request to the backend and parks a [`PendingOperation`]
//! carrying the expected serial. The view is `dirty` until a commit with
//! a matching serial arrives, at which point the operation is applied
//! atomically. One operation may be in flight per view.

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::backend::{OutputId, Serial, SurfaceBackend};
use crate::geometry::Geometry;
use crate::layout::Tile;
use crate::mark::MarkId;
use crate::sheet::SheetIndex;

/// Unique, opaque identifier for a managed view.
///
/// Backends maintain a mapping from their protocol-specific surface
/// handle to this ID. Core never sees protocol handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view:{}", self.0)
    }
}

bitflags! {
    /// View state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ViewFlags: u8 {
        /// Excluded from the workspace's visible list and from group
        /// visible subsets.
        const HIDDEN    = 0b0000_0001;
        /// Never rendered or laid out, but still a member everywhere.
        const INVISIBLE = 0b0000_0010;
        /// Exempt from automatic layout.
        const FLOATING  = 0b0000_0100;
        /// Eligible for group operations from other workspaces.
        const PUBLIC    = 0b0000_1000;
        /// Size is frozen; layouts center it within its tile.
        const FORCED    = 0b0001_0000;
    }
}

/// Border visual state, driven by focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderState {
    None,
    Active,
    #[default]
    Inactive,
}

/// A saved position/length pair for one axis of a maximized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedSpan {
    pub pos: i32,
    pub len: u32,
}

/// Which axes are maximized, each remembering the unmaximized span.
/// Both axes together is full maximization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Maximization {
    pub vertical: Option<SavedSpan>,
    pub horizontal: Option<SavedSpan>,
}

impl Maximization {
    pub const fn is_none(self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    pub const fn is_full(self) -> bool {
        self.vertical.is_some() && self.horizontal.is_some()
    }
}

/// What a pending operation will do when its acknowledgement arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Resize,
    Reset,
    Unmaximize,
    MaximizeFull,
    MaximizeVertical,
    MaximizeHorizontal,
    /// Attach this tile on commit, detaching any previous one.
    Tile(Tile),
    /// Reassign to another output/sheet on commit.
    Migrate {
        output: OutputId,
        sheet: SheetIndex,
    },
}

/// A geometry change in flight, awaiting the backend's commit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub op: Operation,
    pub geometry: Geometry,
    /// Warp the cursor to the view once committed.
    pub center: bool,
    /// Serial the acknowledging commit must reach.
    pub serial: Serial,
}

/// A committed operation, returned so the server can run the
/// raise/cursor/membership fixups that need surrounding state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub op: Operation,
    pub center: bool,
}

/// Outcome of a queue entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueResult {
    /// The view was dirty or a state constraint forbade the operation.
    Rejected,
    /// Fast path: the requested size matched the current size, so the
    /// operation committed synchronously with no backend round-trip.
    Committed(Committed),
    /// A configure request is in flight under this serial.
    Queued(Serial),
}

impl QueueResult {
    pub const fn accepted(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// A managed view.
#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub app_id: String,
    pub title: String,
    pub geometry: Geometry,
    pub flags: ViewFlags,
    pub border: BorderState,
    pub maximization: Maximization,
    pub output: OutputId,
    pub sheet: SheetIndex,
    pub group: String,
    pub mark: Option<MarkId>,
    pub tile: Option<Tile>,
    pending: Option<PendingOperation>,
}

impl View {
    pub fn new(
        id: ViewId,
        app_id: String,
        title: String,
        geometry: Geometry,
        output: OutputId,
        sheet: SheetIndex,
        group: String,
    ) -> Self {
        Self {
            id,
            app_id,
            title,
            geometry,
            flags: ViewFlags::empty(),
            border: BorderState::default(),
            maximization: Maximization::default(),
            output,
            sheet,
            group,
            mark: None,
            tile: None,
            pending: None,
        }
    }

    // ── State predicates ─────────────────────────────────────────────

    /// An operation is in flight.
    pub const fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    pub const fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    pub const fn is_hidden(&self) -> bool {
        self.flags.contains(ViewFlags::HIDDEN)
    }

    pub const fn is_visible(&self) -> bool {
        !self.flags.intersects(ViewFlags::HIDDEN.union(ViewFlags::INVISIBLE))
    }

    pub const fn is_floating(&self) -> bool {
        self.flags.contains(ViewFlags::FLOATING)
    }

    pub const fn is_public(&self) -> bool {
        self.flags.contains(ViewFlags::PUBLIC)
    }

    /// Eligible for automatic layout placement: not floating, not
    /// invisible, not mid-operation. Hidden views are filtered by the
    /// sheet's visibility scan instead.
    pub const fn is_tileable(&self) -> bool {
        !self
            .flags
            .intersects(ViewFlags::FLOATING.union(ViewFlags::INVISIBLE))
            && self.pending.is_none()
    }

    pub const fn is_tiled(&self) -> bool {
        self.tile.is_some()
    }

    /// Frozen size for layouts, when the view's size must not change.
    pub fn forced_size(&self) -> Option<(u32, u32)> {
        self.flags
            .contains(ViewFlags::FORCED)
            .then(|| self.geometry.size())
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.flags.set(ViewFlags::HIDDEN, hidden);
    }

    /// Current geometry with any saved maximization spans restored.
    pub fn restored_geometry(&self) -> Geometry {
        let mut geo = self.geometry;
        if let Some(span) = self.maximization.vertical {
            geo.y = span.pos;
            geo.height = span.len;
        }
        if let Some(span) = self.maximization.horizontal {
            geo.x = span.pos;
            geo.width = span.len;
        }
        geo
    }

    // ── Queue entry points ───────────────────────────────────────────

    /// Plain move: synchronous, no serial involved. Rejected for fully
    /// maximized views.
    pub fn move_to(&mut self, x: i32, y: i32, backend: &mut dyn SurfaceBackend) -> bool {
        if self.maximization.is_full() {
            return false;
        }
        if (x, y) != (self.geometry.x, self.geometry.y) {
            self.geometry.x = x;
            self.geometry.y = y;
            backend.move_view(self.id, x, y);
        }
        true
    }

    pub fn queue_resize(
        &mut self,
        target: Geometry,
        center: bool,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        if self.maximization.is_full() {
            return QueueResult::Rejected;
        }
        self.queue(Operation::Resize, target, center, backend)
    }

    pub fn queue_reset(
        &mut self,
        target: Geometry,
        center: bool,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        self.queue(Operation::Reset, target, center, backend)
    }

    pub fn queue_unmaximize(
        &mut self,
        center: bool,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        if self.maximization.is_none() {
            return QueueResult::Rejected;
        }
        let target = self.restored_geometry();
        self.queue(Operation::Unmaximize, target, center, backend)
    }

    pub fn queue_maximize_full(
        &mut self,
        usable: Geometry,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        if self.maximization.is_full() {
            return QueueResult::Rejected;
        }
        self.queue(Operation::MaximizeFull, usable, false, backend)
    }

    pub fn queue_maximize_vertical(
        &mut self,
        usable: Geometry,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        if self.maximization.vertical.is_some() {
            return QueueResult::Rejected;
        }
        let target = Geometry::new(self.geometry.x, usable.y, self.geometry.width, usable.height);
        self.queue(Operation::MaximizeVertical, target, false, backend)
    }

    pub fn queue_maximize_horizontal(
        &mut self,
        usable: Geometry,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        if self.maximization.horizontal.is_some() {
            return QueueResult::Rejected;
        }
        let target = Geometry::new(usable.x, self.geometry.y, usable.width, self.geometry.height);
        self.queue(Operation::MaximizeHorizontal, target, false, backend)
    }

    pub fn queue_tile(
        &mut self,
        tile: Tile,
        center: bool,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        let target = tile.view_geometry;
        self.queue(Operation::Tile(tile), target, center, backend)
    }

    pub fn queue_migrate(
        &mut self,
        output: OutputId,
        sheet: SheetIndex,
        target: Geometry,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        self.queue(Operation::Migrate { output, sheet }, target, false, backend)
    }

    /// Shared guard, fast path and configure dispatch.
    fn queue(
        &mut self,
        op: Operation,
        target: Geometry,
        center: bool,
        backend: &mut dyn SurfaceBackend,
    ) -> QueueResult {
        if self.pending.is_some() {
            debug!(view = %self.id, ?op, "operation rejected: view is dirty");
            return QueueResult::Rejected;
        }

        // Fast path: an unchanged size never produces an acknowledging
        // commit, so the operation must complete within this call or it
        // would hang forever.
        if target.size() == self.geometry.size() {
            if (target.x, target.y) != (self.geometry.x, self.geometry.y) {
                backend.move_view(self.id, target.x, target.y);
            }
            trace!(view = %self.id, ?op, "synchronous commit (size unchanged)");
            return QueueResult::Committed(self.apply(PendingOperation {
                op,
                geometry: target,
                center,
                serial: Serial(0),
            }));
        }

        let serial = backend.configure(self.id, target.width, target.height);
        trace!(view = %self.id, ?op, serial = serial.0, "operation queued");
        self.pending = Some(PendingOperation {
            op,
            geometry: target,
            center,
            serial,
        });
        QueueResult::Queued(serial)
    }

    // ── Commit path ──────────────────────────────────────────────────

    /// Match a backend commit against the pending operation.
    ///
    /// `serial >= pending.serial` resolves out-of-order acknowledgements
    /// when several configures were issued before the client caught up;
    /// a stale serial is silently ignored.
    pub fn commit_serial(&mut self, serial: Serial) -> Option<Committed> {
        match &self.pending {
            Some(pending) if serial >= pending.serial => {}
            Some(pending) => {
                trace!(
                    view = %self.id,
                    got = serial.0,
                    want = pending.serial.0,
                    "stale commit serial ignored"
                );
                return None;
            }
            None => return None,
        }
        let pending = self.pending.take()?;
        Some(self.apply(pending))
    }

    /// Apply a (matched or fast-path) operation: geometry plus the
    /// per-tag maximization/tile bookkeeping.
    fn apply(&mut self, pending: PendingOperation) -> Committed {
        let PendingOperation {
            op,
            geometry,
            center,
            ..
        } = pending;

        match &op {
            Operation::Resize => {
                self.geometry = geometry;
            }
            Operation::Reset | Operation::Unmaximize => {
                self.geometry = geometry;
                self.maximization = Maximization::default();
            }
            Operation::MaximizeFull => {
                if self.maximization.vertical.is_none() {
                    self.maximization.vertical = Some(SavedSpan {
                        pos: self.geometry.y,
                        len: self.geometry.height,
                    });
                }
                if self.maximization.horizontal.is_none() {
                    self.maximization.horizontal = Some(SavedSpan {
                        pos: self.geometry.x,
                        len: self.geometry.width,
                    });
                }
                self.geometry = geometry;
            }
            Operation::MaximizeVertical => {
                self.maximization.vertical = Some(SavedSpan {
                    pos: self.geometry.y,
                    len: self.geometry.height,
                });
                self.geometry = geometry;
            }
            Operation::MaximizeHorizontal => {
                self.maximization.horizontal = Some(SavedSpan {
                    pos: self.geometry.x,
                    len: self.geometry.width,
                });
                self.geometry = geometry;
            }
            Operation::Tile(tile) => {
                // Any previous tile is implicitly detached; the server
                // prunes the old layout's records.
                self.tile = Some(*tile);
                self.maximization = Maximization::default();
                self.geometry = geometry;
            }
            Operation::Migrate { output, sheet } => {
                self.output = *output;
                self.sheet = *sheet;
                self.geometry = geometry;
            }
        }

        Committed { op, center }
    }

    /// Drop the tile attachment (view left the layout's managed set).
    pub fn detach_tile(&mut self) -> Option<Tile> {
        self.tile.take()
    }
}

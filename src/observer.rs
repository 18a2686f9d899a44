//! One observer front end: mode derivation plus the layout engine, driven
//! synchronously by incoming snapshots and local user actions.

use crate::error::LayoutError;
use crate::layout::{LayoutPolicy, ResolvedWidget, WidgetId, WidgetLayout};
use crate::mode::{DriverMode, ModeThresholds};
use crate::state::Snapshot;

/// Everything a renderer needs for one redraw.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub mode: DriverMode,
    pub editing: bool,
    /// Widget set or spans differ from the last drawn frame.
    pub layout_changed: bool,
    pub snapshot: &'a Snapshot,
    pub widgets: &'a [ResolvedWidget],
}

/// Draws a resolved frame. Called for every applied snapshot so live values
/// stay current; gauges, theming and widget content live behind this.
pub trait RenderSurface {
    fn draw(&mut self, frame: &Frame<'_>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverUpdate {
    pub mode: DriverMode,
    pub mode_changed: bool,
    pub editing_revoked: bool,
    pub layout_changed: bool,
}

pub struct ObserverSession {
    policy: LayoutPolicy,
    thresholds: ModeThresholds,
    layout: WidgetLayout,
    last: Option<Snapshot>,
    widgets: Vec<ResolvedWidget>,
    undrawn_layout: bool,
}

impl ObserverSession {
    pub fn new(policy: LayoutPolicy, thresholds: ModeThresholds) -> Self {
        let layout = WidgetLayout::new(&policy);
        let widgets = layout.resolve(&policy);
        Self { policy, thresholds, layout, last: None, widgets, undrawn_layout: true }
    }

    pub fn mode(&self) -> DriverMode {
        self.layout.mode()
    }

    pub fn editing(&self) -> bool {
        self.layout.editing()
    }

    pub fn order(&self) -> &[WidgetId] {
        self.layout.order()
    }

    pub fn widgets(&self) -> &[ResolvedWidget] {
        &self.widgets
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    /// Re-derive mode and layout for a new snapshot. Returns `None` for a
    /// snapshot older than one already applied.
    pub fn on_snapshot(&mut self, snapshot: Snapshot) -> Option<ObserverUpdate> {
        if let Some(last) = &self.last {
            if snapshot.tick != 0 && snapshot.tick <= last.tick {
                return None;
            }
        }
        self.last = Some(snapshot);

        let mode = self.thresholds.mode_for(snapshot.speed);
        let change = self.layout.set_mode(mode);
        let layout_changed = self.refresh();

        Some(ObserverUpdate {
            mode,
            mode_changed: change.changed,
            editing_revoked: change.editing_revoked,
            layout_changed,
        })
    }

    pub fn customize(&mut self) -> bool {
        let editing = self.layout.customize();
        self.refresh();
        editing
    }

    pub fn done(&mut self) {
        self.layout.done();
        self.refresh();
    }

    pub fn toggle_editing(&mut self) -> bool {
        let editing = self.layout.toggle_editing();
        self.refresh();
        editing
    }

    pub fn move_widget(&mut self, id: &WidgetId, to_index: usize) -> Result<(), LayoutError> {
        self.layout.move_widget(id, to_index)?;
        self.refresh();
        Ok(())
    }

    pub fn move_onto(&mut self, id: &WidgetId, over: &WidgetId) -> Result<(), LayoutError> {
        self.layout.move_onto(id, over)?;
        self.refresh();
        Ok(())
    }

    /// `None` until the first snapshot arrives.
    pub fn frame(&self) -> Option<Frame<'_>> {
        self.last.as_ref().map(|snapshot| Frame {
            mode: self.layout.mode(),
            editing: self.layout.editing(),
            layout_changed: self.undrawn_layout,
            snapshot,
            widgets: &self.widgets,
        })
    }

    /// Flag the next frame as a layout change, forcing a full redraw.
    pub fn invalidate(&mut self) {
        self.undrawn_layout = true;
    }

    /// Draw the current frame. The first draw always reports a layout change.
    pub fn render<S: RenderSurface>(&mut self, surface: &mut S) {
        let Some(frame) = self.frame() else {
            return;
        };
        surface.draw(&frame);
        self.undrawn_layout = false;
    }

    fn refresh(&mut self) -> bool {
        let widgets = self.layout.resolve(&self.policy);
        let changed = widgets != self.widgets;
        self.widgets = widgets;
        self.undrawn_layout |= changed;
        changed
    }
}

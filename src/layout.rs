//! Adaptive dashboard layout.
//!
//! Two halves:
//! - [`LayoutPolicy`]: a total table from `(widget, mode)` to a
//!   [`LayoutDescriptor`], plus the highway override.
//! - [`WidgetLayout`]: per-observer widget order and the editing flag, with
//!   reordering gated on editing and editing gated on being parked.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{ConfigError, LayoutError};
use crate::mode::DriverMode;

// ============================================
// Widget identification
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// Layout descriptors
// ============================================

/// What the renderer gets for one widget. Always defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutDescriptor {
    pub visible: bool,
    pub column_span: u8,
    pub row_span: u8,
}

impl LayoutDescriptor {
    pub const HIDDEN: LayoutDescriptor = LayoutDescriptor {
        visible: false,
        column_span: 0,
        row_span: 0,
    };

    pub fn shown(column_span: u8, row_span: u8) -> Self {
        Self { visible: true, column_span, row_span }
    }
}

/// One row of the placement table as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRule {
    pub widget: WidgetId,
    pub mode: DriverMode,
    pub columns: u8,
    pub rows: u8,
}

impl PlacementRule {
    fn new(widget: &str, mode: DriverMode, columns: u8, rows: u8) -> Self {
        Self { widget: widget.into(), mode, columns, rows }
    }
}

// ---------------------------------------------
// Config form of the policy
// ---------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub columns: u8,
    pub rows: u8,
    pub order: Vec<WidgetId>,
    /// Speed readout that stays visible and maximized on the highway.
    pub primary: WidgetId,
    pub highway_whitelist: Vec<WidgetId>,
    pub rules: Vec<PlacementRule>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        use DriverMode::{City, Parked};

        let mut rules = Vec::new();
        for mode in [Parked, City] {
            rules.push(PlacementRule::new("cluster", mode, 8, 4));
            rules.push(PlacementRule::new("map", mode, 4, 4));
            rules.push(PlacementRule::new("media", mode, 4, 2));
            rules.push(PlacementRule::new("status", mode, 4, 2));
        }

        Self {
            columns: 12,
            rows: 6,
            order: ["cluster", "map", "media", "status"].map(WidgetId::from).to_vec(),
            primary: "cluster".into(),
            highway_whitelist: vec!["cluster".into()],
            rules,
        }
    }
}

// ============================================
// Policy
// ============================================

#[derive(Debug, Clone)]
pub struct LayoutPolicy {
    columns: u8,
    rows: u8,
    default_order: Vec<WidgetId>,
    primary: WidgetId,
    highway_whitelist: HashSet<WidgetId>,
    table: HashMap<(WidgetId, DriverMode), LayoutDescriptor>,
}

impl LayoutPolicy {
    pub fn from_config(cfg: &LayoutConfig) -> Result<Self, ConfigError> {
        if cfg.columns == 0 || cfg.rows == 0 {
            return Err(ConfigError::Invalid {
                field: "layout.columns/rows",
                reason: format!("grid must be non-empty, got {}x{}", cfg.columns, cfg.rows),
            });
        }

        let mut seen = HashSet::new();
        for id in &cfg.order {
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateWidget { id: id.clone() });
            }
        }

        if !cfg.highway_whitelist.contains(&cfg.primary) {
            return Err(ConfigError::PrimaryNotWhitelisted { id: cfg.primary.clone() });
        }
        if !seen.contains(&cfg.primary) {
            return Err(ConfigError::Invalid {
                field: "layout.primary",
                reason: format!("'{}' is not in the widget order", cfg.primary),
            });
        }

        let mut table = HashMap::new();
        for rule in &cfg.rules {
            if rule.columns == 0 || rule.columns > cfg.columns || rule.rows == 0 || rule.rows > cfg.rows {
                return Err(ConfigError::Invalid {
                    field: "layout.rules",
                    reason: format!(
                        "{} in {} spans {}x{}, grid is {}x{}",
                        rule.widget, rule.mode, rule.columns, rule.rows, cfg.columns, cfg.rows
                    ),
                });
            }
            let key = (rule.widget.clone(), rule.mode);
            let descriptor = LayoutDescriptor::shown(rule.columns, rule.rows);
            if table.insert(key, descriptor).is_some() {
                return Err(ConfigError::Invalid {
                    field: "layout.rules",
                    reason: format!("{} in {} is defined twice", rule.widget, rule.mode),
                });
            }
        }

        Ok(Self {
            columns: cfg.columns,
            rows: cfg.rows,
            default_order: cfg.order.clone(),
            primary: cfg.primary.clone(),
            highway_whitelist: cfg.highway_whitelist.iter().cloned().collect(),
            table,
        })
    }

    pub fn primary(&self) -> &WidgetId {
        &self.primary
    }

    pub fn grid(&self) -> (u8, u8) {
        (self.columns, self.rows)
    }

    pub fn default_order(&self) -> &[WidgetId] {
        &self.default_order
    }

    /// Total: a missing table entry (or an unknown widget) is hidden.
    pub fn layout_for(&self, id: &WidgetId, mode: DriverMode) -> LayoutDescriptor {
        if mode == DriverMode::Highway {
            if *id == self.primary {
                return LayoutDescriptor::shown(self.columns, self.rows);
            }
            if !self.highway_whitelist.contains(id) {
                return LayoutDescriptor::HIDDEN;
            }
        }

        self.table
            .get(&(id.clone(), mode))
            .copied()
            .unwrap_or(LayoutDescriptor::HIDDEN)
    }
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        // The built-in config is always valid.
        match LayoutPolicy::from_config(&LayoutConfig::default()) {
            Ok(policy) => policy,
            Err(e) => unreachable!("built-in layout rejected: {e}"),
        }
    }
}

// ============================================
// Per-observer layout state
// ============================================

/// A widget the renderer should draw, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedWidget {
    pub id: WidgetId,
    pub layout: LayoutDescriptor,
    pub draggable: bool,
}

/// Result of feeding a new mode into [`WidgetLayout::set_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeChange {
    pub changed: bool,
    pub editing_revoked: bool,
}

#[derive(Debug, Clone)]
pub struct WidgetLayout {
    order: Vec<WidgetId>,
    editing: bool,
    mode: DriverMode,
}

impl WidgetLayout {
    /// Fresh session: default order, parked, not editing.
    pub fn new(policy: &LayoutPolicy) -> Self {
        Self {
            order: policy.default_order().to_vec(),
            editing: false,
            mode: DriverMode::Parked,
        }
    }

    pub fn order(&self) -> &[WidgetId] {
        &self.order
    }

    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    /// Editing never survives leaving PARKED.
    pub fn set_mode(&mut self, mode: DriverMode) -> ModeChange {
        let changed = mode != self.mode;
        self.mode = mode;

        let editing_revoked = self.editing && mode != DriverMode::Parked;
        if editing_revoked {
            self.editing = false;
        }

        ModeChange { changed, editing_revoked }
    }

    /// Enter editing. Only allowed while parked; returns whether editing is on.
    pub fn customize(&mut self) -> bool {
        if self.mode == DriverMode::Parked {
            self.editing = true;
        }
        self.editing
    }

    pub fn done(&mut self) {
        self.editing = false;
    }

    /// The CUSTOMIZE/DONE button.
    pub fn toggle_editing(&mut self) -> bool {
        if self.editing {
            self.done();
            false
        } else {
            self.customize()
        }
    }

    /// Move `id` to `to_index`, shifting the others. Indices past the end
    /// land at the end.
    pub fn move_widget(&mut self, id: &WidgetId, to_index: usize) -> Result<(), LayoutError> {
        if !self.editing {
            return Err(LayoutError::NotEditing);
        }
        debug_assert_eq!(self.mode, DriverMode::Parked);

        let from = self.index_of(id)?;
        let to = to_index.min(self.order.len() - 1);
        if from != to {
            let widget = self.order.remove(from);
            self.order.insert(to, widget);
        }
        Ok(())
    }

    /// Drag-end form: drop `id` where `over` currently sits.
    pub fn move_onto(&mut self, id: &WidgetId, over: &WidgetId) -> Result<(), LayoutError> {
        if !self.editing {
            return Err(LayoutError::NotEditing);
        }
        let to = self.index_of(over)?;
        self.move_widget(id, to)
    }

    /// Visible widgets for the current mode, in display order.
    pub fn resolve(&self, policy: &LayoutPolicy) -> Vec<ResolvedWidget> {
        self.order
            .iter()
            .filter_map(|id| {
                let layout = policy.layout_for(id, self.mode);
                layout.visible.then(|| ResolvedWidget {
                    id: id.clone(),
                    layout,
                    draggable: self.editing,
                })
            })
            .collect()
    }

    fn index_of(&self, id: &WidgetId) -> Result<usize, LayoutError> {
        self.order
            .iter()
            .position(|w| w == id)
            .ok_or_else(|| LayoutError::UnknownWidget { id: id.clone() })
    }
}

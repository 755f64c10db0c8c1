//! Damage-scoped render dispatch.
//!
//! The core never touches pixels. Each frame tick it composes a list of
//! [`DrawCommand`]s for the backend to execute, scoped against the
//! damage accumulated since the previous frame: a command whose
//! rectangle misses every damage region is culled before it is emitted.

use crate::backend::{TextRenderer, TextTexture};
use crate::config::{Color, Colors};
use crate::geometry::Geometry;
use crate::mode::Mode;
use crate::state::State;
use crate::view::{BorderState, ViewId};
use crate::workspace::Output;

/// What the backend should draw, in emission order (back to front).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    /// Wallpaper or solid fill covering the whole output.
    Background {
        geometry: Geometry,
        color: Color,
        texture: Option<String>,
    },
    /// A client surface at its view geometry.
    Surface { view: ViewId, geometry: Geometry },
    /// A border frame around a rectangle.
    Border {
        geometry: Geometry,
        width: u32,
        color: Color,
    },
    /// A solid rectangle (indicator bar plate, lock dim).
    Rect { geometry: Geometry, color: Color },
    /// Rasterized indicator text.
    Text {
        texture: TextTexture,
        geometry: Geometry,
    },
}

impl DrawCommand {
    fn geometry(&self) -> Geometry {
        match self {
            Self::Background { geometry, .. }
            | Self::Surface { geometry, .. }
            | Self::Rect { geometry, .. }
            | Self::Text { geometry, .. } => *geometry,
            Self::Border {
                geometry, width, ..
            } => geometry.grow(*width),
        }
    }
}

/// Accumulated damage for one output.
#[derive(Debug, Default)]
pub struct Damage {
    regions: Vec<Geometry>,
    full: bool,
}

impl Damage {
    pub fn add(&mut self, rect: Geometry) {
        if !self.full && !rect.is_empty() {
            self.regions.push(rect);
        }
    }

    /// Damage the whole output; individual regions are dropped.
    pub fn add_full(&mut self) {
        self.full = true;
        self.regions.clear();
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.regions.is_empty()
    }

    fn covers(&self, rect: Geometry) -> bool {
        self.full || self.regions.iter().any(|r| r.intersects(rect))
    }

    fn clear(&mut self) {
        self.full = false;
        self.regions.clear();
    }
}

/// Frame accounting.
#[derive(Debug, Default)]
pub struct RenderStats {
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub commands_emitted: u64,
    pub commands_culled: u64,
}

/// The indicator bar's cached text texture.
///
/// Rasterizing is the expensive step, so the texture is regenerated
/// only when the string changes; the change damages both the old and
/// the new bar rectangle, which differ in width.
#[derive(Debug, Default)]
pub struct IndicatorBar {
    text: String,
    texture: Option<TextTexture>,
}

impl IndicatorBar {
    /// Bring the cache up to date with `text`, recording damage when
    /// the content changed.
    pub fn update(
        &mut self,
        text: &str,
        font: &str,
        origin: (i32, i32),
        renderer: &mut dyn TextRenderer,
        damage: &mut Damage,
    ) {
        if self.text == text && self.texture.is_some() {
            return;
        }
        if let Some(old) = self.texture {
            damage.add(Geometry::new(origin.0, origin.1, old.width, old.height));
        }
        let texture = renderer.render_text(text, font);
        damage.add(Geometry::new(
            origin.0,
            origin.1,
            texture.width,
            texture.height,
        ));
        self.text = text.to_string();
        self.texture = Some(texture);
    }

    pub fn texture(&self) -> Option<TextTexture> {
        self.texture
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// The indicator bar's contents for the current mode.
pub fn indicator_text(state: &State, mode: &Mode) -> String {
    let focused = state
        .focused_view()
        .and_then(|id| state.view(id));
    let sheet = state
        .focused_output()
        .map(|o| o.workspace.current().to_string())
        .unwrap_or_default();

    match mode {
        Mode::Lock { denied: true, .. } => "locked: denied".to_string(),
        Mode::Lock { .. } => "locked".to_string(),
        Mode::Exec { buffer, .. } => format!("run: {}", buffer.content()),
        Mode::GroupAssign { buffer, .. } => format!("group: {}", buffer.content()),
        Mode::SheetAssign => "sheet?".to_string(),
        Mode::MarkAssign => "mark?".to_string(),
        Mode::MarkSelect => "goto mark?".to_string(),
        Mode::LayoutSelect => "layout?".to_string(),
        _ => match focused {
            Some(view) => {
                let mark = view
                    .mark
                    .map(|m| format!(" [{m}]"))
                    .unwrap_or_default();
                format!("{sheet} {} - {}{mark}", view.group, view.title)
            }
            None => sheet,
        },
    }
}

/// Border color for a view under the current mode.
fn border_color(border: BorderState, focused: bool, mode: &Mode, colors: &Colors) -> Color {
    if focused {
        match mode {
            Mode::GroupAssign { .. } | Mode::SheetAssign | Mode::MarkAssign => colors.insert,
            Mode::MarkSelect | Mode::LayoutSelect => colors.selected,
            Mode::Move(_) | Mode::Resize(_) | Mode::Dnd { .. } => colors.conflict,
            _ => colors.active,
        }
    } else {
        match border {
            BorderState::Active => colors.active,
            _ => colors.inactive,
        }
    }
}

/// Compose one output's frame. Returns the damage-scoped command list;
/// an empty damage region skips the frame entirely.
pub fn compose_frame(
    state: &State,
    mode: &Mode,
    output: &Output,
    bar: &IndicatorBar,
    bar_geometry: Geometry,
    damage: &mut Damage,
    stats: &mut RenderStats,
) -> Vec<DrawCommand> {
    if damage.is_empty() {
        stats.frames_skipped += 1;
        return Vec::new();
    }

    let colors = &state.config.colors;
    let border_width = state.config.spacing.border;
    let focused = state.focused_view();

    let mut candidates = Vec::new();
    candidates.push(DrawCommand::Background {
        geometry: output.geometry,
        color: colors.background,
        texture: output.background.clone(),
    });

    for id in output.workspace.visible_views(&state.views) {
        let Some(view) = state.view(id) else { continue };
        if !matches!(view.border, BorderState::None) {
            candidates.push(DrawCommand::Border {
                geometry: view.geometry,
                width: border_width,
                color: border_color(view.border, focused == Some(id), mode, colors),
            });
        }
        candidates.push(DrawCommand::Surface {
            view: id,
            geometry: view.geometry,
        });
    }

    if mode.is_locked() {
        // The lock screen hides everything behind a full dim; only the
        // bar text survives.
        candidates.clear();
        candidates.push(DrawCommand::Rect {
            geometry: output.geometry,
            color: colors.background,
        });
    }

    if !mode.is_normal() || focused.is_some() {
        candidates.push(DrawCommand::Rect {
            geometry: bar_geometry,
            color: colors.inactive,
        });
        if let Some(texture) = bar.texture() {
            candidates.push(DrawCommand::Text {
                texture,
                geometry: Geometry::new(bar_geometry.x, bar_geometry.y, texture.width, texture.height),
            });
        }
    }

    let commands: Vec<DrawCommand> = candidates
        .into_iter()
        .filter(|cmd| {
            let keep = damage.covers(cmd.geometry());
            if keep {
                stats.commands_emitted += 1;
            } else {
                stats.commands_culled += 1;
            }
            keep
        })
        .collect();

    stats.frames_rendered += 1;
    damage.clear();
    commands
}

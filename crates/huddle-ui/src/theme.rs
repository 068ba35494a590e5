//! Dark esports palette and the egui visuals built from it.

use egui::{Color32, CornerRadius, Stroke, Vec2, Visuals};

// Surfaces, darkest first
pub const BG_PRIMARY: Color32 = Color32::from_rgb(14, 16, 24);
pub const BG_SECONDARY: Color32 = Color32::from_rgb(24, 27, 40);
pub const BG_SURFACE: Color32 = Color32::from_rgb(38, 42, 60);
pub const BG_USER: Color32 = Color32::from_rgb(56, 38, 96);
pub const ERROR_BG: Color32 = Color32::from_rgb(58, 20, 28);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(232, 234, 245);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(148, 155, 184);

/// Neon violet used for headings, the user label and primary buttons
pub const ACCENT: Color32 = Color32::from_rgb(139, 92, 246);
pub const SUCCESS: Color32 = Color32::from_rgb(52, 211, 153);
pub const ERROR: Color32 = Color32::from_rgb(248, 80, 96);
pub const WARNING: Color32 = Color32::from_rgb(251, 191, 36);

pub const PANEL_ROUNDING: CornerRadius = CornerRadius::same(8);
pub const PANEL_PADDING: Vec2 = Vec2::new(14.0, 10.0);

/// Install the palette on an egui context. Called once, on the first frame.
pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.panel_fill = BG_PRIMARY;
    visuals.window_fill = BG_SECONDARY;
    visuals.extreme_bg_color = BG_SECONDARY;
    visuals.faint_bg_color = BG_SURFACE;
    visuals.window_corner_radius = PANEL_ROUNDING;
    visuals.hyperlink_color = ACCENT;
    visuals.warn_fg_color = WARNING;
    visuals.error_fg_color = ERROR;

    for widget in [&mut visuals.widgets.inactive, &mut visuals.widgets.hovered] {
        widget.bg_fill = BG_SURFACE;
        widget.weak_bg_fill = BG_SURFACE;
    }
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);
    visuals.widgets.active.bg_fill = ACCENT;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, TEXT_PRIMARY);

    visuals.selection.bg_fill = ACCENT.linear_multiply(0.35);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    ctx.set_visuals(visuals);
    ctx.style_mut(|style| {
        style.spacing.item_spacing = Vec2::new(8.0, 6.0);
        style.spacing.button_padding = Vec2::new(10.0, 4.0);
    });
}

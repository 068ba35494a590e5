//! Chat panel — transcript, failure banner and input field.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use crate::state::{ChatEntry, ErrorBanner, Role, UiState};
use crate::theme::*;

/// Render the chat panel. Returns Some(message) when user submits input.
/// The message shows up once the orchestrator has accepted the turn.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState, assistant_name: &str) -> Option<String> {
    let mut submitted = None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("Team Chat").color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status_color = if state.is_busy() {
                            WARNING
                        } else if state.error_banner.is_some() {
                            ERROR
                        } else {
                            SUCCESS
                        };
                        ui.label(RichText::new(&state.status_text).color(status_color).small());
                    });
                });

                ui.separator();

                let banner_height = if state.error_banner.is_some() { 60.0 } else { 0.0 };
                let available_height = ui.available_height() - 60.0 - banner_height;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for entry in &state.messages {
                            render_message(ui, entry, assistant_name);
                            ui.add_space(4.0);
                        }
                        if state.is_busy() {
                            ui.label(RichText::new("▌").color(ACCENT).strong());
                        }
                    });

                if let Some(banner) = &state.error_banner {
                    render_banner(ui, banner);
                }

                ui.add_space(8.0);

                // Input area
                ui.horizontal(|ui| {
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text("Ask about rosters, scrims, tournaments...")
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));

                    let response = ui.add_enabled(!state.busy, input);

                    let send_enabled = !state.input_text.trim().is_empty() && !state.is_busy();
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if (enter && send_enabled) || send_btn.clicked() {
                        let text = state.input_text.trim().to_string();
                        submitted = Some(text);
                        state.input_text.clear();
                        response.request_focus();
                    }
                });
            });
        });

    submitted
}

fn render_message(ui: &mut egui::Ui, entry: &ChatEntry, assistant_name: &str) {
    let (label, label_color, bg) = match entry.role {
        Role::User => ("You", ACCENT, BG_USER),
        Role::Assistant => (assistant_name, SUCCESS, BG_SECONDARY),
    };

    egui::Frame::default()
        .fill(bg)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(label).color(label_color).strong().small());
                if entry.demo {
                    ui.label(RichText::new("DEMO").color(WARNING).small().strong());
                }
            });
            ui.label(RichText::new(&entry.content).color(TEXT_PRIMARY));
        });
}

fn render_banner(ui: &mut egui::Ui, banner: &ErrorBanner) {
    egui::Frame::default()
        .fill(ERROR_BG)
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.label(RichText::new(banner.title()).color(ERROR).strong());
            ui.label(RichText::new(&banner.message).color(TEXT_PRIMARY).small());
            if banner.points_to_settings() {
                ui.label(
                    RichText::new("Open Settings to update your API key.")
                        .color(TEXT_SECONDARY)
                        .small()
                        .italics(),
                );
            }
        });
}

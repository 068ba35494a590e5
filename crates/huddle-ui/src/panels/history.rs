//! History panel — search, open and delete saved conversations.

use egui::{self, RichText, ScrollArea, Vec2};
use huddle_types::session::{ConversationSession, SessionSummary};
use crate::state::UiState;
use crate::theme::*;

/// What the caller should do after rendering the history panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    None,
    /// Reload the session list from the store
    Refresh,
    /// Load this session into the reading pane
    Open(String),
    /// Remove this session from the store
    Delete(String),
}

/// Render the history panel. Store access is left to the caller; editing
/// the search box marks the list stale.
pub fn history_panel(ui: &mut egui::Ui, state: &mut UiState) -> HistoryAction {
    let mut action = HistoryAction::None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.heading(RichText::new("Chat History").color(TEXT_PRIMARY).strong());
                if ui.small_button("⟳").on_hover_text("Reload").clicked() {
                    action = HistoryAction::Refresh;
                }
            });
            let search = ui.add(
                egui::TextEdit::singleline(&mut state.search_term)
                    .hint_text("Search conversations...")
                    .desired_width(f32::INFINITY),
            );
            if search.changed() {
                state.history_stale = true;
            }
            ui.separator();

            let mut clicked = None;
            let mut deleted = None;
            let selected = state.selected_id().map(str::to_string);

            ui.columns(2, |columns| {
                ScrollArea::vertical()
                    .id_salt("history_list")
                    .auto_shrink([false, false])
                    .show(&mut columns[0], |ui| {
                        if state.history.is_empty() {
                            let text = if state.search_term.trim().is_empty() {
                                "No saved conversations yet."
                            } else {
                                "No conversations match your search."
                            };
                            ui.label(RichText::new(text).color(TEXT_SECONDARY).italics());
                        }
                        for session in &state.history {
                            let is_selected = selected.as_deref() == Some(session.id.as_str());
                            match session_row(ui, session, is_selected) {
                                RowClick::Open => clicked = Some(session.id.clone()),
                                RowClick::Delete => deleted = Some(session.id.clone()),
                                RowClick::None => {}
                            }
                        }
                    });

                ScrollArea::vertical()
                    .id_salt("history_view")
                    .auto_shrink([false, false])
                    .show(&mut columns[1], |ui| match &state.selected {
                        Some(session) => render_session(ui, session),
                        None => {
                            ui.label(
                                RichText::new("Select a conversation to read it.")
                                    .color(TEXT_SECONDARY)
                                    .italics(),
                            );
                        }
                    });
            });

            if let Some(id) = clicked {
                action = HistoryAction::Open(id);
            }
            if let Some(id) = deleted {
                action = HistoryAction::Delete(id);
            }
        });

    action
}

enum RowClick {
    None,
    Open,
    Delete,
}

fn session_row(ui: &mut egui::Ui, session: &SessionSummary, selected: bool) -> RowClick {
    let mut click = RowClick::None;
    egui::Frame::default()
        .fill(if selected { BG_SURFACE } else { BG_SECONDARY })
        .corner_radius(PANEL_ROUNDING)
        .inner_margin(6.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    let title = ui.add(
                        egui::Label::new(RichText::new(&session.title).color(TEXT_PRIMARY).strong())
                            .sense(egui::Sense::click()),
                    );
                    if title.clicked() {
                        click = RowClick::Open;
                    }
                    ui.label(
                        RichText::new(format!(
                            "{} · {} messages",
                            session.updated_at.format("%Y-%m-%d %H:%M"),
                            session.message_count
                        ))
                        .color(TEXT_SECONDARY)
                        .small(),
                    );
                });
                let delete = ui.add(
                    egui::Button::new(RichText::new("Delete").color(ERROR).small())
                        .min_size(Vec2::new(48.0, 0.0)),
                );
                if delete.clicked() {
                    click = RowClick::Delete;
                }
            });
        });
    ui.add_space(4.0);
    click
}

fn render_session(ui: &mut egui::Ui, session: &ConversationSession) {
    ui.label(RichText::new(&session.title).color(ACCENT).strong());
    ui.label(
        RichText::new(format!("Started {}", session.created_at.format("%Y-%m-%d %H:%M")))
            .color(TEXT_SECONDARY)
            .small(),
    );
    ui.separator();
    for message in &session.messages {
        let label = if message.is_user() { "You" } else { "Assistant" };
        ui.label(RichText::new(label).color(ACCENT).small().strong());
        ui.label(RichText::new(&message.content).color(TEXT_PRIMARY));
        ui.add_space(4.0);
    }
}

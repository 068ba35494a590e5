//! Settings panel — API key, completion backend and storage mode.

use egui::{self, RichText, Vec2};
use huddle_types::config::{CompletionBackend, HuddleConfig, StorageBackendType};
use crate::state::UiState;
use crate::theme::*;

/// What the caller should do after rendering the settings panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    /// Nothing changed
    None,
    /// A config field was changed (auto-save)
    Changed,
    /// Submit this key through the credential update call
    UpdateKey(String),
    /// Remove the device-local key
    ClearKey,
}

/// Feedback from the last key action, passed in from the app layer
#[derive(Debug, Clone)]
pub struct SaveFeedback {
    pub message: String,
    pub success: bool,
}

/// Render the settings panel. Returns an action for the caller to handle.
pub fn settings_panel(
    ui: &mut egui::Ui,
    config: &mut HuddleConfig,
    state: &mut UiState,
    has_local_key: bool,
    feedback: Option<&SaveFeedback>,
) -> SettingsAction {
    let mut action = SettingsAction::None;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(TEXT_PRIMARY));
            ui.separator();

            // ── API Key Section ──────────────────────────────
            ui.label(RichText::new("OpenAI API Key").color(ACCENT).strong());
            ui.add_space(2.0);
            ui.label(
                RichText::new(if has_local_key {
                    "A key is stored on this device."
                } else {
                    "No key stored on this device."
                })
                .color(TEXT_SECONDARY)
                .small(),
            );

            let key_edit = egui::TextEdit::singleline(&mut state.api_key_input)
                .password(true)
                .hint_text("sk-...");
            ui.add(key_edit);

            ui.horizontal(|ui| {
                let can_update = !state.api_key_input.trim().is_empty();
                let update = ui.add_enabled(
                    can_update,
                    egui::Button::new(RichText::new("Update Key").color(TEXT_PRIMARY).strong())
                        .fill(if can_update { ACCENT } else { BG_SURFACE })
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(100.0, 24.0)),
                );
                if update.clicked() {
                    action = SettingsAction::UpdateKey(state.api_key_input.trim().to_string());
                }
                if ui
                    .add_enabled(has_local_key, egui::Button::new("Clear Key"))
                    .clicked()
                {
                    action = SettingsAction::ClearKey;
                }
            });

            if let Some(fb) = feedback {
                let color = if fb.success { SUCCESS } else { ERROR };
                ui.label(RichText::new(&fb.message).color(color).small());
            }

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(4.0);

            // ── Completion Section ───────────────────────────
            ui.label(RichText::new("Completion").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Backend").color(TEXT_SECONDARY).small());
            egui::ComboBox::from_id_salt("completion_backend")
                .selected_text(config.completion.backend.label())
                .show_ui(ui, |ui| {
                    for b in CompletionBackend::all() {
                        if ui
                            .selectable_value(&mut config.completion.backend, *b, b.label())
                            .changed()
                        {
                            action = SettingsAction::Changed;
                        }
                    }
                });

            if config.completion.backend == CompletionBackend::Direct {
                ui.label(RichText::new("Model").color(TEXT_SECONDARY).small());
                if ui.text_edit_singleline(&mut config.completion.model).changed() {
                    action = SettingsAction::Changed;
                }
                ui.label(RichText::new("Temperature").color(TEXT_SECONDARY).small());
                if ui
                    .add(egui::Slider::new(&mut config.completion.temperature, 0.0..=2.0))
                    .changed()
                {
                    action = SettingsAction::Changed;
                }
            }

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(4.0);

            // ── Storage Section ──────────────────────────────
            ui.label(RichText::new("Storage").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Backend").color(TEXT_SECONDARY).small());
            egui::ComboBox::from_id_salt("storage_backend")
                .selected_text(storage_label(&config.storage.backend))
                .show_ui(ui, |ui| {
                    for backend in storage_options() {
                        if ui
                            .selectable_value(&mut config.storage.backend, backend, storage_label(&backend))
                            .changed()
                        {
                            action = SettingsAction::Changed;
                        }
                    }
                });

            ui.add_space(4.0);
            ui.label(
                RichText::new(storage_description(&config.storage.backend))
                    .color(TEXT_SECONDARY)
                    .small()
                    .italics(),
            );
        });

    action
}

pub fn storage_label(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Auto-detect",
        StorageBackendType::Memory => "Memory",
        StorageBackendType::LocalStorage => "localStorage",
    }
}

fn storage_description(backend: &StorageBackendType) -> &'static str {
    match backend {
        StorageBackendType::Auto => "Uses localStorage when available, falls back to Memory. Applies on reload.",
        StorageBackendType::Memory => "Fast but volatile. History and keys are lost on page reload.",
        StorageBackendType::LocalStorage => "Persistent browser storage scoped to this site. Applies on reload.",
    }
}

fn storage_options() -> [StorageBackendType; 3] {
    [
        StorageBackendType::Auto,
        StorageBackendType::Memory,
        StorageBackendType::LocalStorage,
    ]
}

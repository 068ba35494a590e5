//! Main egui application — composes the panels and owns the orchestrator.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use huddle_core::credentials::{self, CredentialResolver, LocalCredentialStore, ServerCredentialState};
use huddle_core::event_bus::EventBus;
use huddle_core::exchange::{ExchangeOrchestrator, SendError};
use huddle_core::ports::{CompletionPort, CredentialUpdatePort, KeyValuePort};
use huddle_core::store::ConversationStore;
use huddle_platform::completion::completion_client;
use huddle_platform::credential_update::credential_updater;
use huddle_platform::storage::open_storage;
use huddle_types::config::{HuddleConfig, StorageBackendType};
use huddle_ui::panels::history::HistoryAction;
use huddle_ui::panels::settings::{SaveFeedback, SettingsAction};
use huddle_ui::panels::{chat, history, settings};
use huddle_ui::state::{UiState, View};
use huddle_ui::theme;

use crate::config_store::{load_config, save_config};

/// The main application state
pub struct HuddleApp {
    ui_state: UiState,
    config: HuddleConfig,
    event_bus: EventBus,
    /// Where the config itself lives; always the auto-detected backend
    config_storage: Rc<dyn KeyValuePort>,
    store: ConversationStore,
    local_key: LocalCredentialStore,
    server_credential: Rc<ServerCredentialState>,
    orchestrator: Rc<ExchangeOrchestrator>,
    completion: Rc<dyn CompletionPort>,
    updater: Rc<dyn CredentialUpdatePort>,
    key_feedback: Rc<RefCell<Option<SaveFeedback>>>,
    first_frame: bool,
}

impl HuddleApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config_storage = open_storage(StorageBackendType::Auto);
        let config = load_config(config_storage.as_ref());

        let storage = match config.storage.backend {
            StorageBackendType::Auto => config_storage.clone(),
            other => open_storage(other),
        };
        let store = ConversationStore::new(storage.clone(), config.storage.history_key.clone());
        let local_key = LocalCredentialStore::new(storage.clone(), config.storage.credential_key.clone());
        let server_credential = Rc::new(ServerCredentialState::new(
            config.credentials.server_api_key.clone(),
            storage,
            format!("{}:server-secret", config.storage.credential_key),
        ));

        let event_bus = EventBus::new();
        let resolver = CredentialResolver::new(server_credential.clone());
        let orchestrator = ExchangeOrchestrator::new(
            config.assistant.display_name.clone(),
            resolver,
            store.clone(),
            event_bus.clone(),
        );

        let mut ui_state = UiState::new();
        ui_state.load_transcript(&orchestrator.transcript());

        Self {
            completion: completion_client(&config.completion),
            updater: credential_updater(&config.credentials),
            ui_state,
            config,
            event_bus,
            config_storage,
            store,
            local_key,
            server_credential,
            orchestrator: Rc::new(orchestrator),
            key_feedback: Rc::new(RefCell::new(None)),
            first_frame: true,
        }
    }

    fn rebuild_clients(&mut self) {
        self.completion = completion_client(&self.config.completion);
        self.updater = credential_updater(&self.config.credentials);
    }

    fn persist_config(&mut self) {
        if let Err(e) = save_config(self.config_storage.as_ref(), &self.config) {
            log::warn!("Could not save config: {}", e);
            self.ui_state.notice = Some(format!("Settings not saved: {}", e));
        }
    }

    fn refresh_history(&mut self) {
        match self.store.list_summaries(&self.ui_state.search_term) {
            Ok(summaries) => self.ui_state.set_history(summaries),
            Err(e) => {
                log::error!("Could not load history: {}", e);
                self.ui_state.notice = Some(format!("Could not load history: {}", e));
                self.ui_state.history_stale = false;
            }
        }
    }

    fn open_session(&mut self, id: &str) {
        match self.store.get_session_by_id(id) {
            Ok(Some(session)) => self.ui_state.selected = Some(session),
            Ok(None) => {
                log::debug!("Session {} is no longer stored", id);
                self.ui_state.selected = None;
                self.refresh_history();
            }
            Err(e) => self.ui_state.notice = Some(format!("Could not open conversation: {}", e)),
        }
    }

    fn delete_session(&mut self, id: &str) {
        match self.store.delete_session(id) {
            Ok(true) => log::info!("Deleted session {}", id),
            Ok(false) => log::debug!("Session {} was already gone", id),
            Err(e) => self.ui_state.notice = Some(format!("Could not delete conversation: {}", e)),
        }
        self.ui_state.close_session(id);
        self.refresh_history();
    }

    fn new_chat(&mut self) {
        if self.orchestrator.reset() {
            self.ui_state.load_transcript(&self.orchestrator.transcript());
            self.ui_state.view = View::Chat;
        }
    }
}

impl eframe::App for HuddleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        // Drain events from the orchestrator
        let events = self.event_bus.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }

        if self.ui_state.is_busy() {
            ctx.request_repaint();
        }

        if self.ui_state.view == View::History && self.ui_state.history_stale {
            self.refresh_history();
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("eSports Huddle")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                ui.selectable_value(&mut self.ui_state.view, View::Chat, "Chat");
                ui.selectable_value(&mut self.ui_state.view, View::History, "History");
                if ui
                    .add_enabled(!self.ui_state.is_busy(), egui::Button::new("New Chat"))
                    .clicked()
                {
                    self.new_chat();
                }

                if let Some(notice) = self.ui_state.notice.clone() {
                    ui.separator();
                    ui.label(RichText::new(notice).color(theme::TEXT_SECONDARY).small());
                    if ui.small_button("✕").clicked() {
                        self.ui_state.notice = None;
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            let has_local_key = self.local_key.local_credential().is_some();
            let feedback = self.key_feedback.borrow().clone();
            let action = SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    settings::settings_panel(
                        ui,
                        &mut self.config,
                        &mut self.ui_state,
                        has_local_key,
                        feedback.as_ref(),
                    )
                })
                .inner;
            match action {
                SettingsAction::None => {}
                SettingsAction::Changed => {
                    self.rebuild_clients();
                    self.persist_config();
                }
                SettingsAction::UpdateKey(key) => self.dispatch_key_update(key, ctx),
                SettingsAction::ClearKey => self.clear_key(),
            }
        }

        // ── Main content ─────────────────────────────────────
        CentralPanel::default().show(ctx, |ui| match self.ui_state.view {
            View::Chat => {
                let name = self.config.assistant.display_name.clone();
                if let Some(user_msg) = chat::chat_panel(ui, &mut self.ui_state, &name) {
                    self.dispatch_message(user_msg, ctx);
                }
            }
            View::History => match history::history_panel(ui, &mut self.ui_state) {
                HistoryAction::None => {}
                HistoryAction::Refresh => self.refresh_history(),
                HistoryAction::Open(id) => self.open_session(&id),
                HistoryAction::Delete(id) => self.delete_session(&id),
            },
        });
    }
}

impl HuddleApp {
    /// Run one turn in the background. The local key is read now, so a key
    /// saved a moment ago is used by this turn.
    fn dispatch_message(&self, text: String, ctx: &egui::Context) {
        let orchestrator = self.orchestrator.clone();
        let completion = self.completion.clone();
        let client_key = self.local_key.local_credential();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let result = orchestrator
                .send_message(&text, client_key.as_deref(), completion.as_ref())
                .await;
            match result {
                Ok(_) => {}
                // Already reported through the event bus
                Err(SendError::Exchange(_)) => {}
                Err(e) => log::warn!("Message not sent: {}", e),
            }
            ctx.request_repaint();
        });
    }

    fn dispatch_key_update(&self, key: String, ctx: &egui::Context) {
        let updater = self.updater.clone();
        let local_key = self.local_key.clone();
        let server_credential = self.server_credential.clone();
        let event_bus = self.event_bus.clone();
        let feedback = self.key_feedback.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let result = credentials::apply_credential_update(
                updater.as_ref(),
                &key,
                &local_key,
                &server_credential,
                &event_bus,
            )
            .await;
            *feedback.borrow_mut() = Some(match result {
                Ok(_) => SaveFeedback {
                    message: "API key updated".to_string(),
                    success: true,
                },
                Err(e) => {
                    log::error!("API key update failed: {}", e);
                    SaveFeedback {
                        message: e.to_string(),
                        success: false,
                    }
                }
            });
            ctx.request_repaint();
        });
    }

    fn clear_key(&mut self) {
        let result = credentials::clear_credential(&self.local_key, &self.event_bus);
        *self.key_feedback.borrow_mut() = Some(match result {
            Ok(()) => SaveFeedback {
                message: "API key cleared".to_string(),
                success: true,
            },
            Err(e) => SaveFeedback {
                message: e.to_string(),
                success: false,
            },
        });
    }
}

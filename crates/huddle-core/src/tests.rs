#[cfg(test)]
mod tests {
    use crate::event_bus::{EventBus, MAX_PENDING};
    use crate::store::ConversationStore;
    use crate::credentials::*;
    use crate::classify::*;
    use crate::exchange::*;
    use crate::ports::*;
    use huddle_types::credential::{CredentialOrigin, PLACEHOLDER_CREDENTIAL};
    use huddle_types::event::HuddleEvent;
    use huddle_types::exchange::*;
    use huddle_types::message::*;
    use huddle_types::session::NEW_CONVERSATION_TITLE;
    use huddle_types::HuddleError;
    use async_trait::async_trait;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    // ─── Mocks ───────────────────────────────────────────────

    /// In-memory key-value port that counts writes
    #[derive(Default)]
    struct MockKv {
        data: RefCell<HashMap<String, String>>,
        writes: Cell<usize>,
    }

    impl MockKv {
        fn with(key: &str, value: &str) -> Self {
            let kv = Self::default();
            kv.data.borrow_mut().insert(key.to_string(), value.to_string());
            kv
        }
    }

    impl KeyValuePort for MockKv {
        fn get(&self, key: &str) -> huddle_types::Result<Option<String>> {
            Ok(self.data.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> huddle_types::Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.data.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> huddle_types::Result<()> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    /// Completion port that always answers with the same text
    struct MockCompletion {
        reply: String,
        calls: RefCell<Vec<CompletionRequest>>,
    }

    impl MockCompletion {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    #[async_trait(?Send)]
    impl CompletionPort for MockCompletion {
        async fn complete(&self, request: CompletionRequest) -> Result<String, ExchangeError> {
            self.calls.borrow_mut().push(request);
            Ok(self.reply.clone())
        }

        fn client_name(&self) -> &str {
            "mock"
        }
    }

    /// Completion port that always fails
    struct MockFailingCompletion(ExchangeError);

    #[async_trait(?Send)]
    impl CompletionPort for MockFailingCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, ExchangeError> {
            Err(self.0.clone())
        }

        fn client_name(&self) -> &str {
            "failing"
        }
    }

    /// Completion port that waits for the test to release it
    struct GatedCompletion {
        gate: RefCell<Option<oneshot::Receiver<String>>>,
    }

    #[async_trait(?Send)]
    impl CompletionPort for GatedCompletion {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, ExchangeError> {
            let rx = self.gate.borrow_mut().take().expect("gate used once");
            rx.await.map_err(|_| ExchangeError::server("gate dropped"))
        }

        fn client_name(&self) -> &str {
            "gated"
        }
    }

    struct MockUpdater(Result<CredentialUpdateOutcome, CredentialUpdateError>);

    #[async_trait(?Send)]
    impl CredentialUpdatePort for MockUpdater {
        async fn update_credential(
            &self,
            _api_key: &str,
        ) -> Result<CredentialUpdateOutcome, CredentialUpdateError> {
            self.0.clone()
        }
    }

    const HISTORY_KEY: &str = "chatHistory";
    const CREDENTIAL_KEY: &str = "openai_api_key";
    const SERVER_MARKER_KEY: &str = "openai_api_key:server-secret";

    fn server_state(kv: Rc<MockKv>) -> ServerCredentialState {
        ServerCredentialState::new(None, kv, SERVER_MARKER_KEY)
    }

    fn store_over(kv: Rc<MockKv>) -> ConversationStore {
        ConversationStore::new(kv, HISTORY_KEY)
    }

    fn orchestrator(
        server_key: Option<&str>,
        kv: Rc<MockKv>,
        bus: EventBus,
    ) -> ExchangeOrchestrator {
        let resolver = CredentialResolver::new(Rc::new(StaticServerCredential(
            server_key.map(str::to_string),
        )));
        ExchangeOrchestrator::new("Manager", resolver, store_over(kv), bus)
    }

    fn transcript(texts: &[&str]) -> Vec<Message> {
        let mut messages = vec![Message::greeting("Manager")];
        for (i, text) in texts.iter().enumerate() {
            if i % 2 == 0 {
                messages.push(Message::user(*text));
            } else {
                messages.push(Message::assistant(*text));
            }
        }
        messages
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        assert!(bus.is_empty());
        bus.emit(HuddleEvent::TurnStart { turn_id: 1 });
        bus.emit(HuddleEvent::TurnEnd { turn_id: 1 });
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.drain().len(), 2);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(HuddleEvent::CredentialCleared);
        assert_eq!(bus2.len(), 1);
        assert_eq!(bus2.drain().len(), 1);
        assert!(bus1.is_empty());
    }

    #[test]
    fn test_event_bus_sheds_oldest_when_full() {
        let bus = EventBus::new();
        for turn_id in 0..(MAX_PENDING as u64 + 3) {
            bus.emit(HuddleEvent::TurnStart { turn_id });
        }
        let events = bus.drain();
        assert_eq!(events.len(), MAX_PENDING);
        assert_eq!(events[0], HuddleEvent::TurnStart { turn_id: 3 });
    }

    // ─── ConversationStore Tests ─────────────────────────────

    #[test]
    fn test_store_empty_when_nothing_saved() {
        let store = store_over(Rc::new(MockKv::default()));
        assert!(store.get_all_sessions().unwrap().is_empty());
        assert!(store.get_session_by_id("chat-x").unwrap().is_none());
    }

    #[test]
    fn test_store_save_and_get() {
        let store = store_over(Rc::new(MockKv::default()));
        let messages = transcript(&["Hi", "Hello there"]);
        let id = store.save_session(&messages).unwrap();
        assert!(id.starts_with("chat-"));

        let session = store.get_session_by_id(&id).unwrap().unwrap();
        assert_eq!(session.title, "Hi");
        assert_eq!(session.messages, messages);
        assert_eq!(session.created_at, session.updated_at);
    }

    #[test]
    fn test_store_title_cases() {
        let store = store_over(Rc::new(MockKv::default()));
        let long = store
            .save_session(&transcript(&["Tell me about roster building for a new team", "ok"]))
            .unwrap();
        let none = store
            .save_session(&[Message::greeting("Manager"), Message::assistant("only me")])
            .unwrap();

        let long = store.get_session_by_id(&long).unwrap().unwrap();
        assert_eq!(long.title, "Tell me about roster building ...");
        let none = store.get_session_by_id(&none).unwrap().unwrap();
        assert_eq!(none.title, NEW_CONVERSATION_TITLE);
    }

    #[test]
    fn test_store_ids_unique() {
        let store = store_over(Rc::new(MockKv::default()));
        let a = store.save_session(&transcript(&["a", "b"])).unwrap();
        let b = store.save_session(&transcript(&["a", "b"])).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get_all_sessions().unwrap().len(), 2);
    }

    #[test]
    fn test_store_preserves_storage_order() {
        let store = store_over(Rc::new(MockKv::default()));
        let first = store.save_session(&transcript(&["first", "r"])).unwrap();
        let second = store.save_session(&transcript(&["second", "r"])).unwrap();
        let all = store.get_all_sessions().unwrap();
        assert_eq!(all[0].id, first);
        assert_eq!(all[1].id, second);
    }

    #[test]
    fn test_store_get_all_is_idempotent() {
        let store = store_over(Rc::new(MockKv::default()));
        store.save_session(&transcript(&["one", "two"])).unwrap();
        let a = store.get_all_sessions().unwrap();
        let b = store.get_all_sessions().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_store_delete_unknown_is_noop() {
        let kv = Rc::new(MockKv::default());
        let store = store_over(kv.clone());
        store.save_session(&transcript(&["keep", "me"])).unwrap();
        let before = store.get_all_sessions().unwrap();
        let writes = kv.writes.get();

        assert!(!store.delete_session("chat-missing").unwrap());
        assert_eq!(store.get_all_sessions().unwrap(), before);
        assert_eq!(kv.writes.get(), writes);
    }

    #[test]
    fn test_store_delete_existing() {
        let store = store_over(Rc::new(MockKv::default()));
        let a = store.save_session(&transcript(&["a", "b"])).unwrap();
        store.save_session(&transcript(&["c", "d"])).unwrap();

        assert!(store.delete_session(&a).unwrap());
        assert_eq!(store.get_all_sessions().unwrap().len(), 1);
        assert!(store.get_session_by_id(&a).unwrap().is_none());
        assert!(!store.delete_session(&a).unwrap());
    }

    #[test]
    fn test_store_update_keeps_title_and_created_at() {
        let store = store_over(Rc::new(MockKv::default()));
        let id = store.save_session(&transcript(&["Hi", "Hello"])).unwrap();
        let original = store.get_session_by_id(&id).unwrap().unwrap();

        let longer = transcript(&["Hi", "Hello", "Draft advice?", "Pick comfort picks"]);
        assert!(store.update_session(&id, &longer).unwrap());

        let updated = store.get_session_by_id(&id).unwrap().unwrap();
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.title, original.title);
        assert!(updated.updated_at >= updated.created_at);
        assert_eq!(updated.messages.len(), 5);
        assert_eq!(store.get_all_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_store_update_unknown_returns_false() {
        let store = store_over(Rc::new(MockKv::default()));
        assert!(!store.update_session("chat-missing", &transcript(&["x"])).unwrap());
        assert!(store.get_all_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_store_corrupt_data_is_an_error() {
        let store = store_over(Rc::new(MockKv::with(HISTORY_KEY, "{not json")));
        let err = store.get_all_sessions().unwrap_err();
        assert!(matches!(err, HuddleError::CorruptStorage { ref key, .. } if key == HISTORY_KEY));
        assert!(store.save_session(&transcript(&["a", "b"])).is_err());
    }

    #[test]
    fn test_store_reads_legacy_bot_sender() {
        let raw = r#"[{"id":"chat-1","title":"Hi","messages":[
            {"id":"welcome","content":"Hello","sender":"bot","timestamp":"2024-05-01T10:00:00.000Z"},
            {"id":"user-1","content":"Hi","sender":"user","timestamp":"2024-05-01T10:00:05.000Z"}],
            "createdAt":"2024-05-01T10:00:06.000Z","updatedAt":"2024-05-01T10:00:06.000Z"}]"#;
        let store = store_over(Rc::new(MockKv::with(HISTORY_KEY, raw)));
        let sessions = store.get_all_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].messages[0].sender, Sender::Assistant);
        assert_eq!(sessions[0].created_at.to_rfc3339(), "2024-05-01T10:00:06+00:00");
    }

    #[test]
    fn test_store_search() {
        let store = store_over(Rc::new(MockKv::default()));
        let scrim = store.save_session(&transcript(&["Scrim plan", "Three blocks"])).unwrap();
        let draft = store.save_session(&transcript(&["Draft prep", "Ban the meta"])).unwrap();

        let hits = store.search_sessions("SCRIM").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, scrim);

        let hits = store.search_sessions("meta").unwrap();
        assert_eq!(hits[0].id, draft);

        assert!(store.search_sessions("nothing matches").unwrap().is_empty());
    }

    #[test]
    fn test_store_search_sorted_by_updated_desc() {
        let store = store_over(Rc::new(MockKv::default()));
        let older = store.save_session(&transcript(&["older", "r"])).unwrap();
        let newer = store.save_session(&transcript(&["newer", "r"])).unwrap();
        store
            .update_session(&older, &transcript(&["older", "r", "again", "r"]))
            .unwrap();

        let all = store.search_sessions("").unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].updated_at >= all[1].updated_at);
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&older.as_str()) && ids.contains(&newer.as_str()));

        // Storage order is untouched by sorting a copy
        let stored = store.get_all_sessions().unwrap();
        assert_eq!(stored[0].id, older);
    }

    #[test]
    fn test_store_list_summaries() {
        let store = store_over(Rc::new(MockKv::default()));
        store.save_session(&transcript(&["Hi", "Hello"])).unwrap();
        store.save_session(&transcript(&["Roster moves", "Sign a support"])).unwrap();

        let summaries = store.list_summaries("").unwrap();
        assert_eq!(summaries.len(), 2);

        let summaries = store.list_summaries("roster").unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Roster moves");
        assert_eq!(summaries[0].message_count, 3);
    }

    // ─── Credential Tests ────────────────────────────────────

    fn resolver(server: Option<&str>) -> CredentialResolver {
        CredentialResolver::new(Rc::new(StaticServerCredential(server.map(str::to_string))))
    }

    #[test]
    fn test_resolve_prefers_server() {
        let cred = resolver(Some("sk-server")).resolve(Some("sk-client"));
        assert_eq!(cred.expose(), "sk-server");
        assert_eq!(cred.origin(), CredentialOrigin::ServerConfigured);
    }

    #[test]
    fn test_resolve_client_when_server_absent() {
        let cred = resolver(None).resolve(Some("sk-demo-1234"));
        assert_eq!(cred.expose(), "sk-demo-1234");
        assert_eq!(cred.origin(), CredentialOrigin::ClientSupplied);
        assert!(cred.is_well_formed());
    }

    #[test]
    fn test_resolve_skips_malformed_server_key() {
        let cred = resolver(Some("not-a-key")).resolve(Some("sk-client"));
        assert_eq!(cred.origin(), CredentialOrigin::ClientSupplied);
    }

    #[test]
    fn test_resolve_placeholder_when_nothing_usable() {
        let cred = resolver(None).resolve(None);
        assert_eq!(cred.expose(), PLACEHOLDER_CREDENTIAL);
        assert_eq!(cred.origin(), CredentialOrigin::Demo);
        assert!(!cred.is_well_formed());

        let cred = resolver(Some("")).resolve(Some("   "));
        assert_eq!(cred.origin(), CredentialOrigin::Demo);
    }

    #[test]
    fn test_local_credential_roundtrip() {
        let local = LocalCredentialStore::new(Rc::new(MockKv::default()), CREDENTIAL_KEY);
        assert!(local.local_credential().is_none());
        local.set_local_credential("  sk-local  ").unwrap();
        assert_eq!(local.local_credential().as_deref(), Some("sk-local"));
        local.clear_local_credential().unwrap();
        assert!(local.local_credential().is_none());
    }

    #[test]
    fn test_apply_update_local_writes_device_key() {
        let local = LocalCredentialStore::new(Rc::new(MockKv::default()), CREDENTIAL_KEY);
        let bus = EventBus::new();
        let updater = MockUpdater(Ok(CredentialUpdateOutcome {
            success: true,
            storage_method: StorageMethod::Local,
            message: String::new(),
        }));

        let kv = Rc::new(MockKv::default());
        let server = server_state(kv.clone());
        let method =
            block_on(apply_credential_update(&updater, "sk-new", &local, &server, &bus)).unwrap();
        assert_eq!(method, StorageMethod::Local);
        assert_eq!(local.local_credential().as_deref(), Some("sk-new"));
        assert!(!server.holds_secret());
        assert_eq!(
            bus.drain(),
            vec![HuddleEvent::CredentialUpdated { storage_method: StorageMethod::Local }]
        );
    }

    #[test]
    fn test_apply_update_secret_leaves_device_untouched() {
        let local = LocalCredentialStore::new(Rc::new(MockKv::default()), CREDENTIAL_KEY);
        let bus = EventBus::new();
        let updater = MockUpdater(Ok(CredentialUpdateOutcome {
            success: true,
            storage_method: StorageMethod::Secret,
            message: "stored".to_string(),
        }));

        let server = server_state(Rc::new(MockKv::default()));
        block_on(apply_credential_update(&updater, "sk-new", &local, &server, &bus)).unwrap();
        assert!(local.local_credential().is_none());
        assert!(server.holds_secret());
    }

    #[test]
    fn test_secret_update_takes_effect_on_next_turn() {
        let kv = Rc::new(MockKv::default());
        let local = LocalCredentialStore::new(kv.clone(), CREDENTIAL_KEY);
        let server = Rc::new(server_state(kv.clone()));
        let bus = EventBus::new();
        let orch = ExchangeOrchestrator::new(
            "Manager",
            CredentialResolver::new(server.clone()),
            store_over(kv),
            bus.clone(),
        );
        let updater = MockUpdater(Ok(CredentialUpdateOutcome {
            success: true,
            storage_method: StorageMethod::Secret,
            message: "API key updated".to_string(),
        }));

        block_on(apply_credential_update(&updater, "sk-real-key", &local, &server, &bus)).unwrap();

        let completion = MockCompletion::new("Scrim twice a week.");
        let reply =
            block_on(orch.send_message("hello", local.local_credential().as_deref(), &completion))
                .unwrap();
        assert!(!reply.demo);
        assert_eq!(reply.message.content, "Scrim twice a week.");
        // The relay uses its own secret; nothing is forwarded
        assert_eq!(completion.calls.borrow()[0].client_api_key, None);
    }

    #[test]
    fn test_resolve_server_held_secret_outranks_client() {
        let server = server_state(Rc::new(MockKv::with(SERVER_MARKER_KEY, "1")));
        let cred = CredentialResolver::new(Rc::new(server)).resolve(Some("sk-client"));
        assert_eq!(cred.origin(), CredentialOrigin::ServerHeld);
        assert!(cred.is_usable());
        assert!(!cred.is_well_formed());
    }

    #[test]
    fn test_resolve_configured_key_outranks_server_held() {
        let server = ServerCredentialState::new(
            Some("sk-config".to_string()),
            Rc::new(MockKv::with(SERVER_MARKER_KEY, "1")),
            SERVER_MARKER_KEY,
        );
        let cred = CredentialResolver::new(Rc::new(server)).resolve(None);
        assert_eq!(cred.origin(), CredentialOrigin::ServerConfigured);
        assert_eq!(cred.expose(), "sk-config");
    }

    #[test]
    fn test_apply_update_rejected() {
        let local = LocalCredentialStore::new(Rc::new(MockKv::default()), CREDENTIAL_KEY);
        let bus = EventBus::new();
        let updater = MockUpdater(Err(CredentialUpdateError::Rejected {
            kind: CredentialUpdateErrorKind::SecretUpdateError,
            message: "Failed to update API key".to_string(),
        }));

        let server = server_state(Rc::new(MockKv::default()));
        let err = block_on(apply_credential_update(&updater, "sk-new", &local, &server, &bus))
            .unwrap_err();
        assert!(matches!(
            err,
            CredentialUpdateError::Rejected { kind: CredentialUpdateErrorKind::SecretUpdateError, .. }
        ));
        assert!(local.local_credential().is_none());
        assert!(!server.holds_secret());
        assert!(bus.is_empty());
    }

    #[test]
    fn test_clear_credential_emits_event() {
        let local = LocalCredentialStore::new(
            Rc::new(MockKv::with(CREDENTIAL_KEY, "sk-old")),
            CREDENTIAL_KEY,
        );
        let bus = EventBus::new();
        clear_credential(&local, &bus).unwrap();
        assert!(local.local_credential().is_none());
        assert_eq!(bus.drain(), vec![HuddleEvent::CredentialCleared]);
    }

    // ─── Classification Tests ────────────────────────────────

    #[test]
    fn test_relay_success() {
        let text = decode_relay_reply(200, r#"{"response":"Run two scrims a day"}"#).unwrap();
        assert_eq!(text, "Run two scrims a day");
    }

    #[test]
    fn test_relay_typed_errors() {
        let cases = [
            ("QUOTA_EXCEEDED", ExchangeErrorKind::QuotaExceeded),
            ("INVALID_API_KEY", ExchangeErrorKind::InvalidApiKey),
            ("NO_API_KEY", ExchangeErrorKind::NoApiKey),
            ("API_ERROR", ExchangeErrorKind::ApiError),
            ("SERVER_ERROR", ExchangeErrorKind::ServerError),
        ];
        for (tag, kind) in cases {
            let body = format!(r#"{{"error":"boom","errorType":"{}"}}"#, tag);
            let err = decode_relay_reply(400, &body).unwrap_err();
            assert_eq!(err.kind, kind);
            assert_eq!(err.message, "boom");
        }
    }

    #[test]
    fn test_relay_error_in_2xx_body_is_failure() {
        let err = decode_relay_reply(200, r#"{"error":"nope","errorType":"NO_API_KEY"}"#)
            .unwrap_err();
        assert_eq!(err.kind, ExchangeErrorKind::NoApiKey);
    }

    #[test]
    fn test_relay_unknown_error_type_is_api_error() {
        let err = decode_relay_reply(400, r#"{"error":"odd","errorType":"WHAT"}"#).unwrap_err();
        assert_eq!(err.kind, ExchangeErrorKind::ApiError);
        let err = decode_relay_reply(400, r#"{"error":"untyped"}"#).unwrap_err();
        assert_eq!(err.kind, ExchangeErrorKind::ApiError);
    }

    #[test]
    fn test_relay_malformed_is_server_error() {
        assert_eq!(
            decode_relay_reply(200, "<html>").unwrap_err().kind,
            ExchangeErrorKind::ServerError
        );
        assert_eq!(
            decode_relay_reply(502, "Bad gateway").unwrap_err().kind,
            ExchangeErrorKind::ServerError
        );
        assert_eq!(
            decode_relay_reply(200, r#"{"unexpected":1}"#).unwrap_err().kind,
            ExchangeErrorKind::ServerError
        );
    }

    #[test]
    fn test_provider_quota() {
        let body = r#"{"error":{"message":"You exceeded your current quota, please check your plan","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        assert_eq!(classify_provider_error(429, body).kind, ExchangeErrorKind::QuotaExceeded);
    }

    #[test]
    fn test_provider_invalid_key() {
        let body = r#"{"error":{"message":"Incorrect API key provided: sk-abc.","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert_eq!(classify_provider_error(401, body).kind, ExchangeErrorKind::InvalidApiKey);
    }

    #[test]
    fn test_provider_other_error_keeps_message() {
        let body = r#"{"error":{"message":"The model is overloaded","type":"server_error"}}"#;
        let err = classify_provider_error(503, body);
        assert_eq!(err.kind, ExchangeErrorKind::ApiError);
        assert_eq!(err.message, "The model is overloaded");
    }

    #[test]
    fn test_provider_unstructured_error() {
        let err = classify_provider_error(500, "oops");
        assert_eq!(err.kind, ExchangeErrorKind::ApiError);
        assert_eq!(err.message, "Error connecting to OpenAI API");
    }

    // ─── Orchestrator Tests ──────────────────────────────────

    #[test]
    fn test_orchestrator_initial_state() {
        let orch = orchestrator(None, Rc::new(MockKv::default()), EventBus::new());
        assert_eq!(orch.state(), TurnState::Idle);
        let messages = orch.transcript();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, GREETING_ID);
        assert!(orch.session_id().is_none());
    }

    #[test]
    fn test_successful_turn_appends_and_persists() {
        let kv = Rc::new(MockKv::default());
        let bus = EventBus::new();
        let orch = orchestrator(None, kv.clone(), bus.clone());
        let llm = MockCompletion::new("Build around a shot-caller");

        let reply =
            block_on(orch.send_message("  How do I build a roster?  ", Some("sk-demo-1234"), &llm))
                .unwrap();

        assert!(!reply.demo);
        assert_eq!(reply.message.content, "Build around a shot-caller");
        let messages = orch.transcript();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].content, "How do I build a roster?");
        assert_eq!(messages[2].sender, Sender::Assistant);
        assert_eq!(orch.state(), TurnState::Idle);

        // 3 > 2: saved once
        let store = store_over(kv);
        let sessions = store.get_all_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(Some(sessions[0].id.clone()), reply.session_id);
        assert_eq!(sessions[0].messages.len(), 3);

        // The client key was forwarded
        let calls = llm.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].client_api_key.as_deref(), Some("sk-demo-1234"));
        assert_eq!(calls[0].content, "How do I build a roster?");

        let events = bus.drain();
        assert!(matches!(events.first(), Some(HuddleEvent::TurnStart { turn_id: 1 })));
        assert!(events.iter().any(|e| matches!(e, HuddleEvent::SessionSaved { .. })));
        assert!(matches!(events.last(), Some(HuddleEvent::TurnEnd { turn_id: 1 })));
    }

    #[test]
    fn test_demo_mode_without_credentials() {
        let kv = Rc::new(MockKv::default());
        let bus = EventBus::new();
        let orch = orchestrator(None, kv.clone(), bus.clone());
        let llm = MockCompletion::new("should not be used");

        let reply = block_on(orch.send_message("Scrim tips?", None, &llm)).unwrap();

        assert!(reply.demo);
        assert!(reply.message.content.contains("This is a demo response"));
        assert!(reply.message.content.contains("\"Scrim tips?\""));
        assert!(llm.calls.borrow().is_empty());
        assert_eq!(orch.transcript().len(), 3);
        assert_eq!(store_over(kv).get_all_sessions().unwrap().len(), 1);
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, HuddleEvent::ReplyReceived { demo: true, .. })));
    }

    #[test]
    fn test_demo_mode_with_malformed_client_key() {
        let orch = orchestrator(None, Rc::new(MockKv::default()), EventBus::new());
        let llm = MockCompletion::new("unused");
        let reply = block_on(orch.send_message("hi", Some("pk-wrong"), &llm)).unwrap();
        assert!(reply.demo);
        assert!(llm.calls.borrow().is_empty());
    }

    #[test]
    fn test_failed_turn_keeps_user_message_only() {
        let kv = Rc::new(MockKv::default());
        let bus = EventBus::new();
        let orch = orchestrator(Some("sk-server"), kv.clone(), bus.clone());
        let llm = MockFailingCompletion(ExchangeError::new(
            ExchangeErrorKind::QuotaExceeded,
            "quota gone",
        ));

        let err = block_on(orch.send_message("Plan my week", None, &llm)).unwrap_err();

        match err {
            SendError::Exchange(e) => assert_eq!(e.kind, ExchangeErrorKind::QuotaExceeded),
            other => panic!("unexpected error: {:?}", other),
        }
        let messages = orch.transcript();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(orch.state(), TurnState::Idle);
        assert!(store_over(kv).get_all_sessions().unwrap().is_empty());

        let events = bus.drain();
        let failures: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, HuddleEvent::TurnFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0],
            HuddleEvent::TurnFailed { kind: ExchangeErrorKind::QuotaExceeded, .. }
        ));
        assert!(matches!(events.last(), Some(HuddleEvent::TurnEnd { .. })));
    }

    #[test]
    fn test_every_outcome_appends_exactly_one_user_message_first() {
        let outcomes: Vec<Box<dyn CompletionPort>> = vec![
            Box::new(MockCompletion::new("ok")),
            Box::new(MockFailingCompletion(ExchangeError::server("down"))),
        ];
        for llm in outcomes {
            for key in [Some("sk-real"), None] {
                let orch = orchestrator(None, Rc::new(MockKv::default()), EventBus::new());
                let _ = block_on(orch.send_message("question", key, llm.as_ref()));
                let messages = orch.transcript();
                let users: Vec<_> = messages.iter().filter(|m| m.is_user()).collect();
                assert_eq!(users.len(), 1);
                assert_eq!(messages[1].sender, Sender::User);
            }
        }
    }

    #[test]
    fn test_empty_input_is_rejected_without_side_effects() {
        let bus = EventBus::new();
        let orch = orchestrator(None, Rc::new(MockKv::default()), bus.clone());
        let llm = MockCompletion::new("unused");
        let err = block_on(orch.send_message("   \n", None, &llm)).unwrap_err();
        assert_eq!(err, SendError::EmptyInput);
        assert_eq!(orch.transcript().len(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_greeting_only_is_never_persisted() {
        let kv = Rc::new(MockKv::default());
        let orch = orchestrator(None, kv.clone(), EventBus::new());
        let llm = MockFailingCompletion(ExchangeError::server("down"));
        let _ = block_on(orch.send_message("hello", Some("sk-real"), &llm));
        assert_eq!(kv.writes.get(), 0);
        assert!(orch.session_id().is_none());
    }

    #[test]
    fn test_second_turn_updates_same_session() {
        let kv = Rc::new(MockKv::default());
        let bus = EventBus::new();
        let orch = orchestrator(None, kv.clone(), bus.clone());
        let llm = MockCompletion::new("answer");

        let first = block_on(orch.send_message("Tell me about roster building for a new team", None, &llm))
            .unwrap();
        let created = store_over(kv.clone())
            .get_session_by_id(first.session_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        let second = block_on(orch.send_message("And scrims?", None, &llm)).unwrap();

        assert_eq!(first.session_id, second.session_id);
        let sessions = store_over(kv).get_all_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].messages.len(), 5);
        assert_eq!(sessions[0].created_at, created.created_at);
        assert_eq!(sessions[0].title, "Tell me about roster building ...");
        assert!(sessions[0].updated_at >= sessions[0].created_at);
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, HuddleEvent::SessionUpdated { .. })));
    }

    #[test]
    fn test_deleted_session_is_saved_again() {
        let kv = Rc::new(MockKv::default());
        let orch = orchestrator(None, kv.clone(), EventBus::new());
        let llm = MockCompletion::new("answer");

        let first = block_on(orch.send_message("one", None, &llm)).unwrap();
        let store = store_over(kv);
        assert!(store.delete_session(first.session_id.as_deref().unwrap()).unwrap());

        let second = block_on(orch.send_message("two", None, &llm)).unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(store.get_all_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_persist_failure_does_not_fail_turn() {
        let kv = Rc::new(MockKv::with(HISTORY_KEY, "corrupt"));
        let bus = EventBus::new();
        let orch = orchestrator(None, kv, bus.clone());
        let llm = MockCompletion::new("answer");

        let reply = block_on(orch.send_message("hi", None, &llm)).unwrap();
        assert!(reply.session_id.is_none());
        assert_eq!(orch.transcript().len(), 3);
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, HuddleEvent::PersistFailed { .. })));
    }

    #[test]
    fn test_concurrent_send_is_rejected() {
        let bus = EventBus::new();
        let orch = orchestrator(None, Rc::new(MockKv::default()), bus.clone());
        let (tx, rx) = oneshot::channel();
        let llm = GatedCompletion {
            gate: RefCell::new(Some(rx)),
        };

        let mut first = Box::pin(orch.send_message("first", Some("sk-real"), &llm));
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        assert!(first.poll_unpin(&mut cx).is_pending());
        assert_eq!(orch.state(), TurnState::Sending);

        let other = MockCompletion::new("second");
        let err = block_on(orch.send_message("second", Some("sk-real"), &other)).unwrap_err();
        assert_eq!(err, SendError::TurnInFlight);
        assert!(!orch.reset());

        tx.send("done".to_string()).unwrap();
        let reply = block_on(first).unwrap();
        assert_eq!(reply.message.content, "done");
        assert_eq!(orch.state(), TurnState::Idle);
        // greeting + first user + reply; the rejected send appended nothing
        assert_eq!(orch.transcript().len(), 3);
        let appended: Vec<_> = bus
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                HuddleEvent::UserMessageAppended { message } => Some(message.content),
                _ => None,
            })
            .collect();
        assert_eq!(appended, vec!["first".to_string()]);
    }

    #[test]
    fn test_abandoned_turn_returns_to_idle() {
        let orch = orchestrator(None, Rc::new(MockKv::default()), EventBus::new());
        let (_tx, rx) = oneshot::channel::<String>();
        let llm = GatedCompletion {
            gate: RefCell::new(Some(rx)),
        };
        {
            let mut pending = Box::pin(orch.send_message("hello", Some("sk-real"), &llm));
            let waker = futures::task::noop_waker();
            let mut cx = std::task::Context::from_waker(&waker);
            assert!(pending.poll_unpin(&mut cx).is_pending());
            assert_eq!(orch.state(), TurnState::Sending);
        }
        assert_eq!(orch.state(), TurnState::Idle);
        assert_eq!(orch.transcript().len(), 2);
    }

    #[test]
    fn test_credential_change_applies_next_turn() {
        let kv = Rc::new(MockKv::default());
        let local = LocalCredentialStore::new(kv.clone(), CREDENTIAL_KEY);
        let orch = orchestrator(None, kv, EventBus::new());
        let llm = MockCompletion::new("real answer");

        let first = block_on(orch.send_message("one", local.local_credential().as_deref(), &llm))
            .unwrap();
        assert!(first.demo);

        local.set_local_credential("sk-fresh").unwrap();
        let second = block_on(orch.send_message("two", local.local_credential().as_deref(), &llm))
            .unwrap();
        assert!(!second.demo);
        assert_eq!(second.message.content, "real answer");
    }

    #[test]
    fn test_reset_starts_new_conversation() {
        let orch = orchestrator(None, Rc::new(MockKv::default()), EventBus::new());
        let llm = MockCompletion::new("answer");
        block_on(orch.send_message("hi", None, &llm)).unwrap();
        assert!(orch.session_id().is_some());

        assert!(orch.reset());
        assert_eq!(orch.transcript().len(), 1);
        assert!(orch.session_id().is_none());
    }

    #[test]
    fn test_demo_reply_template() {
        let text = demo_reply("What comp?");
        assert!(text.starts_with("This is a demo response to your query: \"What comp?\""));
        assert!(text.contains("API key"));
    }
}

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use spacesync_engine::{
    create_entities, create_entries, ListQuery, LogLevel, MemorySink, Outcome, PushContext,
    RateLimiter, SpaceClient, SyncError, SyncResult,
};
use spacesync_types::{Entity, ResourceKind, SourcePair};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────

type CreateHook = Box<dyn Fn(ResourceKind, Option<&str>, &Entity) -> SyncResult<Entity> + Send + Sync>;
type UpdateHook = Box<dyn Fn(ResourceKind, &str, u64, &Entity) -> SyncResult<Entity> + Send + Sync>;

#[derive(Debug, Clone, Default)]
struct CallLog {
    creates: Vec<(ResourceKind, Option<String>)>,
    updates: Vec<(ResourceKind, String, u64)>,
}

impl CallLog {
    fn creates_with_id(&self) -> usize {
        self.creates.iter().filter(|(_, id)| id.is_some()).count()
    }

    fn plain_creates(&self) -> usize {
        self.creates.iter().filter(|(_, id)| id.is_none()).count()
    }
}

/// Space double: records every write, answers via injectable hooks.
struct MockSpace {
    log: Mutex<CallLog>,
    create_hook: CreateHook,
    update_hook: UpdateHook,
}

impl MockSpace {
    fn new() -> Self {
        Self {
            log: Mutex::new(CallLog::default()),
            create_hook: Box::new(|kind, id, _| Ok(written(kind, id))),
            update_hook: Box::new(|kind, id, _, _| Ok(written(kind, Some(id)))),
        }
    }

    fn on_create(mut self, hook: CreateHook) -> Self {
        self.create_hook = hook;
        self
    }

    fn on_update(mut self, hook: UpdateHook) -> Self {
        self.update_hook = hook;
        self
    }

    fn log(&self) -> CallLog {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpaceClient for MockSpace {
    async fn list(&self, _kind: ResourceKind, _query: &ListQuery) -> SyncResult<Vec<Entity>> {
        panic!("list is not exercised by these tests")
    }

    async fn create(
        &self,
        kind: ResourceKind,
        id: Option<&str>,
        entity: &Entity,
    ) -> SyncResult<Entity> {
        self.log
            .lock()
            .unwrap()
            .creates
            .push((kind, id.map(str::to_string)));
        (self.create_hook)(kind, id, entity)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        version: u64,
        entity: &Entity,
    ) -> SyncResult<Entity> {
        self.log
            .lock()
            .unwrap()
            .updates
            .push((kind, id.to_string(), version));
        (self.update_hook)(kind, id, version, entity)
    }
}

/// Remote entity as the backend would return it after a write.
fn written(kind: ResourceKind, id: Option<&str>) -> Entity {
    Entity::from_value(json!({
        "sys": {"id": id.unwrap_or("generated"), "type": kind.sys_type(), "version": 1}
    }))
    .unwrap()
}

fn pair(original: serde_json::Value, transformed: serde_json::Value) -> SourcePair {
    SourcePair::new(
        Entity::from_value(original).unwrap(),
        Entity::from_value(transformed).unwrap(),
    )
}

fn dest(id: &str, version: u64) -> Entity {
    Entity::from_value(json!({"sys": {"id": id, "version": version}})).unwrap()
}

fn generic_error(message: &str) -> SyncError {
    SyncError::Api {
        status: 500,
        message: message.to_string(),
    }
}

// ── Create entities ──────────────────────────────────────────────

#[tokio::test]
async fn create_entities_updates_existing_and_creates_missing() {
    let space = MockSpace::new();
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![
        pair(json!({"sys": {}}), json!({"sys": {"id": "123"}})),
        pair(json!({"sys": {}}), json!({"sys": {"id": "456"}})),
    ];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entities(&ctx, ResourceKind::Asset, &mut pairs, &destination).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(Outcome::is_written));

    let log = space.log();
    assert_eq!(log.creates_with_id(), 1);
    assert_eq!(log.updates.len(), 1);
    assert_eq!(log.updates[0], (ResourceKind::Asset, "123".to_string(), 6));

    assert_eq!(sink.len(), 2);
    assert_eq!(sink.count_at(LogLevel::Error), 0);
}

#[tokio::test]
async fn generic_update_error_is_isolated_and_logged() {
    let space = MockSpace::new()
        .on_update(Box::new(|_, _, _, _| Err(generic_error("could not create entity"))));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![pair(
        json!({"sys": {"contentType": {"sys": {"id": "ctid"}}}}),
        json!({"sys": {"id": "123"}, "fields": {"gonefield": "", "existingfield": ""}}),
    )];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entities(&ctx, ResourceKind::Asset, &mut pairs, &destination).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0], Outcome::Failed);
    assert_eq!(space.log().updates.len(), 1);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, LogLevel::Error);
    assert!(events[0]
        .detail
        .as_deref()
        .unwrap()
        .contains("could not create entity"));
}

#[tokio::test]
async fn outcome_order_matches_input_order() {
    let space = MockSpace::new().on_create(Box::new(|kind, id, _| match id {
        Some("bad") => Err(generic_error("rejected")),
        other => Ok(written(kind, other)),
    }));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![
        pair(json!({"sys": {}}), json!({"sys": {"id": "first"}})),
        pair(json!({"sys": {}}), json!({"sys": {"id": "bad"}})),
        pair(json!({"sys": {}}), json!({"sys": {"id": "third"}})),
    ];

    let outcomes = create_entities(&ctx, ResourceKind::Asset, &mut pairs, &[]).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].written().unwrap().id(), Some("first"));
    assert_eq!(outcomes[1], Outcome::Failed);
    assert_eq!(outcomes[2].written().unwrap().id(), Some("third"));
}

#[tokio::test]
async fn empty_input_yields_empty_output() {
    let space = MockSpace::new();
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let outcomes = create_entities(&ctx, ResourceKind::Asset, &mut [], &[]).await;

    assert!(outcomes.is_empty());
    assert!(space.log().creates.is_empty());
    assert!(sink.is_empty());
}

// ── Create entries ───────────────────────────────────────────────

#[tokio::test]
async fn create_entries_picks_update_create_with_id_or_plain_create() {
    let space = MockSpace::new();
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let original = json!({"sys": {"contentType": {"sys": {"id": "ctid"}}}});
    let mut pairs = vec![
        pair(original.clone(), json!({"sys": {"id": "123"}})),
        pair(original.clone(), json!({"sys": {"id": "456"}})),
        pair(original, json!({"sys": {}})),
    ];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entries(&ctx, &mut pairs, &destination).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(Outcome::is_written));

    let log = space.log();
    assert_eq!(log.creates_with_id(), 1);
    assert_eq!(log.plain_creates(), 1);
    assert_eq!(log.updates.len(), 1);

    assert_eq!(sink.len(), 3);
    assert_eq!(sink.count_at(LogLevel::Error), 0);
}

#[tokio::test]
async fn unknown_fields_are_pruned_and_the_write_retried() {
    let attempts = Arc::new(Mutex::new(0u32));
    let seen = attempts.clone();
    let space = MockSpace::new().on_update(Box::new(move |kind, id, _, _| {
        let mut attempts = seen.lock().unwrap();
        *attempts += 1;
        if *attempts == 1 {
            Err(SyncError::UnknownFields {
                fields: vec!["gonefield".to_string()],
            })
        } else {
            Ok(written(kind, Some(id)))
        }
    }));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: true,
    };

    let mut pairs = vec![pair(
        json!({"sys": {"contentType": {"sys": {"id": "ctid"}}}}),
        json!({"sys": {"id": "123"}, "fields": {"gonefield": "", "existingfield": ""}}),
    )];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entries(&ctx, &mut pairs, &destination).await;

    assert!(outcomes[0].is_written());
    assert_eq!(space.log().updates.len(), 2);

    let fields = pairs[0].transformed.fields().unwrap();
    assert!(fields.contains_key("existingfield"));
    assert!(!fields.contains_key("gonefield"));

    assert_eq!(sink.len(), 1);
    assert_eq!(sink.count_at(LogLevel::Warning), 1);
    assert_eq!(sink.count_at(LogLevel::Error), 0);
}

#[tokio::test]
async fn failure_after_pruning_falls_through_to_generic_handling() {
    let attempts = Arc::new(Mutex::new(0u32));
    let seen = attempts.clone();
    let space = MockSpace::new().on_update(Box::new(move |_, _, _, _| {
        let mut attempts = seen.lock().unwrap();
        *attempts += 1;
        if *attempts == 1 {
            Err(SyncError::UnknownFields {
                fields: vec!["gonefield".to_string()],
            })
        } else {
            Err(generic_error("still rejected"))
        }
    }));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![pair(
        json!({"sys": {"contentType": {"sys": {"id": "ctid"}}}}),
        json!({"sys": {"id": "123"}, "fields": {"gonefield": ""}}),
    )];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entries(&ctx, &mut pairs, &destination).await;

    assert_eq!(outcomes[0], Outcome::Failed);
    assert_eq!(space.log().updates.len(), 2);
    assert_eq!(sink.count_at(LogLevel::Warning), 1);
    assert_eq!(sink.count_at(LogLevel::Error), 1);
}

#[tokio::test]
async fn generic_entry_error_is_isolated_and_logged() {
    let space =
        MockSpace::new().on_update(Box::new(|_, _, _, _| Err(generic_error("Some creation error"))));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![pair(
        json!({"sys": {"contentType": {"sys": {"id": "ctid"}}}}),
        json!({"sys": {"id": "123"}, "fields": {"gonefield": "", "existingfield": ""}}),
    )];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entries(&ctx, &mut pairs, &destination).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0], Outcome::Failed);
    assert_eq!(space.log().updates.len(), 1);
    assert_eq!(sink.count_at(LogLevel::Warning), 0);
    assert_eq!(sink.count_at(LogLevel::Error), 1);
    assert!(sink.events()[0]
        .detail
        .as_deref()
        .unwrap()
        .contains("Some creation error"));
}

#[tokio::test]
async fn content_model_skip_leaves_fieldless_entries_alone() {
    let space = MockSpace::new();
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: true,
    };

    let mut pairs = vec![pair(
        json!({"sys": {"contentType": {"sys": {"id": "ctid"}}}}),
        json!({"sys": {"id": "123"}}),
    )];
    let destination = vec![dest("123", 6)];

    let outcomes = create_entries(&ctx, &mut pairs, &destination).await;

    assert_eq!(outcomes[0], Outcome::Unchanged);
    let log = space.log();
    assert!(log.creates.is_empty());
    assert!(log.updates.is_empty());
    assert!(sink.is_empty());
}

// ── Locales ──────────────────────────────────────────────────────

#[tokio::test]
async fn taken_locale_is_a_quiet_no_op() {
    let space = MockSpace::new().on_create(Box::new(|_, _, _| Err(SyncError::AlreadyExists)));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![pair(json!({"sys": {}}), json!({"sys": {}}))];
    let destination = vec![Entity::default()];

    let outcomes = create_entities(&ctx, ResourceKind::Locale, &mut pairs, &destination).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0], Outcome::Unchanged);
    assert_eq!(sink.count_at(LogLevel::Error), 0);
    assert!(sink.is_empty());
}

// ── Rate limiting ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn five_hundred_entities_survive_a_rate_limit_storm() {
    const ENTITY_COUNT: usize = 500;

    // Every id's first write attempt is answered 429 with a one-second
    // reset hint; the retry succeeds.
    let attempts: Arc<Mutex<HashMap<String, u32>>> = Arc::new(Mutex::new(HashMap::new()));

    let first_attempt_limited = {
        let attempts = attempts.clone();
        move |id: &str| {
            let mut attempts = attempts.lock().unwrap();
            let n = attempts.entry(id.to_string()).or_insert(0);
            *n += 1;
            *n == 1
        }
    };

    let limited_create = first_attempt_limited.clone();
    let limited_update = first_attempt_limited;
    let space = MockSpace::new()
        .on_create(Box::new(move |kind, id, _| {
            if limited_create(id.unwrap_or_default()) {
                Err(SyncError::RateLimited { reset_secs: 1 })
            } else {
                Ok(written(kind, id))
            }
        }))
        .on_update(Box::new(move |kind, id, _, _| {
            if limited_update(id) {
                Err(SyncError::RateLimited { reset_secs: 1 })
            } else {
                Ok(written(kind, Some(id)))
            }
        }));

    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs: Vec<SourcePair> = (0..ENTITY_COUNT)
        .map(|i| {
            pair(
                json!({"sys": {"id": i.to_string()}}),
                json!({"sys": {"id": i.to_string()}}),
            )
        })
        .collect();
    // Every even id already exists in the destination.
    let destination: Vec<Entity> = (0..ENTITY_COUNT / 2)
        .map(|i| dest(&(i * 2).to_string(), 4))
        .collect();

    let outcomes = create_entities(&ctx, ResourceKind::Asset, &mut pairs, &destination).await;

    assert_eq!(outcomes.len(), ENTITY_COUNT);
    assert!(outcomes.iter().all(Outcome::is_written));

    // One info event per entity; rate-limit retries log nothing.
    assert_eq!(sink.len(), ENTITY_COUNT);
    assert_eq!(sink.count_at(LogLevel::Error), 0);
    assert_eq!(sink.count_at(LogLevel::Info), ENTITY_COUNT);

    // Every entity was attempted exactly twice.
    let log = space.log();
    assert_eq!(log.creates.len(), ENTITY_COUNT);
    assert_eq!(log.updates.len(), ENTITY_COUNT);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_retry_honors_the_reset_hint() {
    let attempts = Arc::new(Mutex::new(0u32));
    let seen = attempts.clone();
    let space = MockSpace::new().on_create(Box::new(move |kind, id, _| {
        let mut attempts = seen.lock().unwrap();
        *attempts += 1;
        if *attempts == 1 {
            Err(SyncError::RateLimited { reset_secs: 3 })
        } else {
            Ok(written(kind, id))
        }
    }));
    let limiter = RateLimiter::new(100);
    let sink = MemorySink::new();
    let ctx = PushContext {
        space: &space,
        limiter: &limiter,
        sink: &sink,
        skip_content_model: false,
    };

    let mut pairs = vec![pair(json!({"sys": {}}), json!({"sys": {"id": "a1"}}))];

    let started = tokio::time::Instant::now();
    let outcomes = create_entities(&ctx, ResourceKind::Asset, &mut pairs, &[]).await;

    assert!(outcomes[0].is_written());
    assert!(started.elapsed() >= std::time::Duration::from_secs(3));
    assert_eq!(*attempts.lock().unwrap(), 2);
    assert_eq!(sink.len(), 1);
}

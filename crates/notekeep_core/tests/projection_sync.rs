use chrono::{DateTime, Duration, TimeZone, Utc};
use notekeep_core::{
    Clock, KeyValueRepository, ListProjection, LoadPhase, MemoryKeyValueRepository, NoteEvent,
    NoteEventSubscriber, NoteRecord, NoteService, NoteStore, RepoError, RepoResult, StoreError,
    StoreOptions, SyncNotifier, order_for_display,
};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

fn stepping_clock() -> Clock {
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
    let ticks = Arc::new(AtomicI64::new(0));
    Arc::new(move || start + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)))
}

fn service() -> NoteService<MemoryKeyValueRepository> {
    let store = NoteStore::new(MemoryKeyValueRepository::new(), StoreOptions::default())
        .with_clock(stepping_clock());
    NoteService::new(Arc::new(store))
}

#[tokio::test]
async fn create_and_edit_reach_every_projection() {
    let service = service();
    let list = Arc::new(ListProjection::new());
    let details = Arc::new(ListProjection::new());
    service.subscribe(&list);
    service.subscribe(&details);

    let first = service.create("First", "first body").await.unwrap();
    let second = service.create("Second", "second body").await.unwrap();
    assert_eq!(list.notes(), vec![second.clone(), first.clone()]);
    assert_eq!(details.notes(), list.notes());

    let edited = service.update(first.id(), "First", "edited body").await.unwrap();
    assert_eq!(list.notes(), vec![edited.clone(), second.clone()]);
    assert_eq!(details.notes(), list.notes());
    assert_eq!(list.notes(), order_for_display(&service.fetch_all().await));
}

#[tokio::test]
async fn edit_of_note_outside_projection_is_not_inserted() {
    let service = service();
    let hidden = service.create("Hidden", "not displayed").await.unwrap();

    let projection = Arc::new(ListProjection::new());
    service.subscribe(&projection);
    service.update(hidden.id(), "Hidden", "still hidden").await.unwrap();

    assert!(projection.is_empty());
}

#[tokio::test]
async fn deletion_is_broadcast_to_sibling_projections() {
    let service = service();
    let note = service.create("Doomed", "short lived").await.unwrap();
    let keep = service.create("Keeper", "stays around").await.unwrap();

    let initiator = Arc::new(ListProjection::new());
    let sibling = Arc::new(ListProjection::new());
    initiator.reload(service.store()).await.unwrap();
    sibling.reload(service.store()).await.unwrap();
    service.subscribe(&initiator);
    service.subscribe(&sibling);

    service.delete_from(&initiator, note.id()).await.unwrap();

    assert_eq!(initiator.notes(), vec![keep.clone()]);
    assert_eq!(sibling.notes(), vec![keep]);
    assert_eq!(service.fetch_one(note.id()).await, None);
}

#[tokio::test]
async fn reload_moves_through_load_phases() {
    let service = service();
    service.create("Older", "older body").await.unwrap();
    let newer = service.create("Newer", "newer body").await.unwrap();

    let projection = ListProjection::new();
    assert_eq!(projection.phase(), LoadPhase::Idle);
    assert_eq!(projection.reload(service.store()).await.unwrap(), 2);
    assert_eq!(projection.phase(), LoadPhase::Loaded);
    assert_eq!(projection.get(0), Some(newer.clone()));
    assert_eq!(projection.position(newer.id()), Some(0));
}

#[tokio::test]
async fn dropped_projection_is_no_longer_notified() {
    let service = service();
    let kept = Arc::new(ListProjection::new());
    let dropped = Arc::new(ListProjection::new());
    service.subscribe(&kept);
    service.subscribe(&dropped);
    drop(dropped);

    service.create("After", "after drop").await.unwrap();
    assert_eq!(service.notifier().subscriber_count(), 1);
    assert_eq!(kept.len(), 1);
}

#[tokio::test]
async fn failed_operations_publish_nothing() {
    let service = service();
    let projection = Arc::new(ListProjection::new());
    service.subscribe(&projection);

    assert!(service.create("ab", "valid text").await.is_err());
    let missing = uuid::Uuid::new_v4();
    let err = service.update(missing, "abc", "valid text").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(projection.is_empty());
}

#[tokio::test]
async fn shared_notifier_links_services_over_one_store() {
    let store = Arc::new(
        NoteStore::new(MemoryKeyValueRepository::new(), StoreOptions::default())
            .with_clock(stepping_clock()),
    );
    let notifier = Arc::new(SyncNotifier::new());
    let editor = NoteService::with_notifier(Arc::clone(&store), Arc::clone(&notifier));
    let list_owner = NoteService::with_notifier(store, notifier);

    let list = Arc::new(ListProjection::new());
    list_owner.subscribe(&list);
    let created = editor.create("Shared", "through notifier").await.unwrap();

    assert_eq!(list.notes(), vec![created]);
}

struct FlakyRepository {
    inner: MemoryKeyValueRepository,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyRepository {
    fn new() -> Self {
        Self {
            inner: MemoryKeyValueRepository::new(),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl KeyValueRepository for FlakyRepository {
    fn get(&self, key: &str) -> RepoResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("io error".to_string()));
        }
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("disk full".to_string()));
        }
        self.inner.put(key, value)
    }
}

#[tokio::test]
async fn failed_delete_restores_local_entry() {
    let repo = FlakyRepository::new();
    let fail_writes = Arc::clone(&repo.fail_writes);
    let store = NoteStore::new(repo, StoreOptions::default()).with_clock(stepping_clock());
    let service = NoteService::new(Arc::new(store));

    let older = service.create("Older", "older body").await.unwrap();
    let newer = service.create("Newer", "newer body").await.unwrap();
    let initiator = ListProjection::new();
    initiator.reload(service.store()).await.unwrap();
    let sibling = Arc::new(ListProjection::from_notes(service.fetch_all().await));
    service.subscribe(&sibling);

    fail_writes.store(true, Ordering::SeqCst);
    let err = service.delete_from(&initiator, older.id()).await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(_)));

    assert_eq!(initiator.notes(), vec![newer.clone(), older.clone()]);
    assert_eq!(sibling.notes(), vec![newer, older.clone()]);
    assert!(service.fetch_one(older.id()).await.is_some());
}

#[test]
fn events_expose_their_note_id() {
    let id = uuid::Uuid::new_v4();
    assert_eq!(NoteEvent::Deleted(id).note_id(), id);
    assert_eq!(NoteEvent::Deleted(id).kind(), "deleted");
}

#[tokio::test]
async fn failed_reload_keeps_mirror_and_reports_failure() {
    let repo = FlakyRepository::new();
    let fail_reads = Arc::clone(&repo.fail_reads);
    let store = NoteStore::new(repo, StoreOptions::default()).with_clock(stepping_clock());
    let service = NoteService::new(Arc::new(store));
    let note = service.create("Loaded", "loaded body").await.unwrap();

    let projection = ListProjection::new();
    projection.reload(service.store()).await.unwrap();

    fail_reads.store(true, Ordering::SeqCst);
    let err = projection.reload(service.store()).await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(RepoError::Unavailable(_))));
    assert_eq!(projection.phase(), LoadPhase::Failed);
    assert_eq!(projection.notes(), vec![note]);

    fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(projection.reload(service.store()).await.unwrap(), 1);
    assert_eq!(projection.phase(), LoadPhase::Loaded);
}

#[derive(Default)]
struct EditLog {
    texts: Mutex<Vec<String>>,
}

impl NoteEventSubscriber for EditLog {
    fn on_edited(&self, note: &NoteRecord) {
        self.texts.lock().unwrap().push(note.text().to_string());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_edits_reach_projections_in_commit_order() {
    const EDITORS: usize = 32;
    // Identical timestamps leave commit order as the only tie breaker.
    let fixed = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
    let store = NoteStore::new(MemoryKeyValueRepository::new(), StoreOptions::default())
        .with_clock(Arc::new(move || fixed));
    let service = NoteService::new(Arc::new(store));
    let note = service.create("Contended", "initial body").await.unwrap();

    let projection = Arc::new(ListProjection::from_notes(vec![note.clone()]));
    let edit_log = Arc::new(EditLog::default());
    service.subscribe(&projection);
    service.subscribe(&edit_log);

    let handles: Vec<_> = (0..EDITORS)
        .map(|idx| {
            let service = service.clone();
            let id = note.id();
            tokio::spawn(async move {
                service
                    .update(id, "Contended", &format!("version {idx}"))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let persisted = service.fetch_one(note.id()).await.unwrap();
    let texts = edit_log.texts.lock().unwrap().clone();
    assert_eq!(texts.len(), EDITORS);
    assert_eq!(texts.last().map(String::as_str), Some(persisted.text()));
    assert_eq!(projection.notes(), vec![persisted]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_and_delete_never_resurrect_notes() {
    let service = service();
    let projection = Arc::new(ListProjection::new());
    service.subscribe(&projection);

    let handles: Vec<_> = (0..16)
        .map(|idx| {
            let service = service.clone();
            tokio::spawn(async move {
                let note = service
                    .create(&format!("note {idx}"), "short lived body")
                    .await
                    .unwrap();
                if idx % 2 == 0 {
                    service.delete(note.id()).await.unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let persisted = service.fetch_all().await;
    assert_eq!(persisted.len(), 8);
    assert_eq!(projection.notes(), order_for_display(&persisted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reload_racing_mutations_keeps_every_event() {
    let service = service();
    for idx in 0..8 {
        service
            .create(&format!("seed {idx}"), "seeded body")
            .await
            .unwrap();
    }
    let projection = Arc::new(ListProjection::new());
    service.subscribe(&projection);

    let mut handles = Vec::new();
    for idx in 0..24 {
        let service = service.clone();
        let projection = Arc::clone(&projection);
        handles.push(tokio::spawn(async move {
            if idx % 3 == 0 {
                projection.reload(service.store()).await.unwrap();
            } else {
                service
                    .create(&format!("racer {idx}"), "raced body")
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(projection.phase(), LoadPhase::Loaded);
    assert_eq!(
        projection.notes(),
        order_for_display(&service.fetch_all().await)
    );
}

use draftvault_core::db::open_db_in_memory;
use draftvault_core::{DraftNote, DraftStore, SqliteDraftStore, StoreError};
use rusqlite::{params, Connection};

fn sample_draft() -> DraftNote {
    let mut draft = DraftNote::new("My draft", "# heading\n\nbody");
    draft.subtitle = "a subtitle".to_string();
    draft.cover = "data:image/png;base64,AAAA".to_string();
    draft.tags = vec!["travel".to_string(), "food".to_string()];
    draft
}

#[test]
fn save_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();

    let id = store.save_draft(&sample_draft()).unwrap();
    let loaded = store.get_draft(id).unwrap().unwrap();

    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.title, "My draft");
    assert_eq!(loaded.subtitle, "a subtitle");
    assert_eq!(loaded.tags, vec!["travel".to_string(), "food".to_string()]);
    assert!(loaded.created_at > 0);
    assert_eq!(loaded.created_at, loaded.updated_at);
    assert_eq!(loaded.publication_id, None);
}

#[test]
fn two_saves_without_id_create_two_records() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();

    let first = store.save_draft(&sample_draft()).unwrap();
    let second = store.save_draft(&sample_draft()).unwrap();

    assert_ne!(first, second);
    assert_eq!(store.list_drafts().unwrap().len(), 2);
}

#[test]
fn update_preserves_creation_time_and_advances_update_time() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();

    let id = store.save_draft(&sample_draft()).unwrap();
    let saved = store.get_draft(id).unwrap().unwrap();

    let mut edited = saved.clone();
    edited.title = "Edited".to_string();
    // A caller-supplied creation timestamp must never be trusted on update.
    edited.created_at = 12345;
    store.save_draft(&edited).unwrap();

    let reloaded = store.get_draft(id).unwrap().unwrap();
    assert_eq!(reloaded.title, "Edited");
    assert_eq!(reloaded.created_at, saved.created_at);
    assert!(reloaded.updated_at > saved.updated_at);
}

#[test]
fn update_time_strictly_increases_across_rapid_saves() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();

    let id = store.save_draft(&sample_draft()).unwrap();
    let mut last_updated_at = store.get_draft(id).unwrap().unwrap().updated_at;

    let mut draft = sample_draft();
    draft.id = Some(id);
    for _ in 0..5 {
        store.save_draft(&draft).unwrap();
        let updated_at = store.get_draft(id).unwrap().unwrap().updated_at;
        assert!(updated_at > last_updated_at);
        last_updated_at = updated_at;
    }
}

#[test]
fn update_with_unknown_id_fails_loudly() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();

    let mut draft = sample_draft();
    draft.id = Some(999);
    let err = store.save_draft(&draft).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(999)));
    assert!(store.get_draft(999).unwrap().is_none());
}

#[test]
fn list_orders_by_update_time_most_recent_first() {
    let mut conn = open_db_in_memory().unwrap();
    let (first, second, third) = {
        let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();
        (
            store.save_draft(&sample_draft()).unwrap(),
            store.save_draft(&sample_draft()).unwrap(),
            store.save_draft(&sample_draft()).unwrap(),
        )
    };

    conn.execute("UPDATE drafts SET updated_at = 3000 WHERE id = ?1;", params![second])
        .unwrap();
    conn.execute("UPDATE drafts SET updated_at = 2000 WHERE id = ?1;", params![first])
        .unwrap();
    conn.execute("UPDATE drafts SET updated_at = 1000 WHERE id = ?1;", params![third])
        .unwrap();

    let store = SqliteDraftStore::try_new(&mut conn).unwrap();
    let listed: Vec<_> = store
        .list_drafts()
        .unwrap()
        .into_iter()
        .map(|draft| draft.id.unwrap())
        .collect();
    assert_eq!(listed, vec![second, first, third]);
}

#[test]
fn get_missing_draft_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteDraftStore::try_new(&mut conn).unwrap();
    assert!(store.get_draft(42).unwrap().is_none());
}

#[test]
fn delete_missing_draft_is_a_noop() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();
    store.delete_draft(42).unwrap();
}

#[test]
fn store_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    let result = SqliteDraftStore::try_new(&mut conn);
    assert!(matches!(
        result,
        Err(StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn origin_publication_id_roundtrips() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteDraftStore::try_new(&mut conn).unwrap();

    let mut draft = sample_draft();
    draft.publication_id = Some("metafile://abc123i0".to_string());
    let id = store.save_draft(&draft).unwrap();

    let loaded = store.get_draft(id).unwrap().unwrap();
    assert_eq!(loaded.publication_id.as_deref(), Some("metafile://abc123i0"));
}

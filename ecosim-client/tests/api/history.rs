use std::fs;

use color_eyre::Result;
use ecosim_client::{FileStorage, Session, SimulatedPredictor};
use ecosim_core::history::HISTORY_KEY;
use ecosim_core::{
    ClassSet, FeatureSchema, InputRecord, KeyValueStorage, PredictionHistoryStore,
};

fn open(dir: &std::path::Path) -> PredictionHistoryStore<FileStorage> {
    PredictionHistoryStore::open(FileStorage::new(dir), ClassSet::forest_cover())
}

#[test]
fn history_survives_reopening() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let mut store = open(dir.path());
    store.append("Aspen")?;
    store.append("Krummholz")?;
    store.append("Aspen")?;
    assert!(store.is_persistent());
    drop(store);

    let store = open(dir.path());
    let ledger: Vec<&str> = store.ledger().iter().collect();
    assert_eq!(ledger, ["Aspen", "Krummholz", "Aspen"]);
    assert_eq!(store.counts().get("Aspen"), Some(2));
    assert_eq!(store.counts().get("Krummholz"), Some(1));
    assert_eq!(store.counts().get("Spruce/Fir"), Some(0));

    let raw = fs::read_to_string(dir.path().join("ecosim_history.json"))?;
    assert_eq!(raw, r#"["Aspen","Krummholz","Aspen"]"#);
    Ok(())
}

#[test]
fn clearing_is_persisted() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let mut store = open(dir.path());
    store.append("Douglas-fir")?;
    store.clear();
    drop(store);

    let store = open(dir.path());
    assert!(store.ledger().is_empty());
    assert_eq!(store.counts().total(), 0);
    Ok(())
}

#[test]
fn unreadable_slot_restores_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut storage = FileStorage::new(dir.path());
    storage.write(HISTORY_KEY, "{not a list")?;

    let mut store = open(dir.path());
    assert!(store.ledger().is_empty());

    store.append("Aspen")?;
    assert_eq!(storage.read(HISTORY_KEY)?.as_deref(), Some(r#"["Aspen"]"#));
    Ok(())
}

#[test]
fn unknown_labels_are_dropped_on_restore() -> Result<()> {
    let dir = tempfile::tempdir()?;
    FileStorage::new(dir.path()).write(HISTORY_KEY, r#"["Aspen","Baobab","Krummholz"]"#)?;

    let store = open(dir.path());
    let ledger: Vec<&str> = store.ledger().iter().collect();
    assert_eq!(ledger, ["Aspen", "Krummholz"]);
    Ok(())
}

#[test]
fn unwritable_directory_degrades_to_memory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    // A plain file where the history directory should be
    let blocked = dir.path().join("blocked");
    fs::write(&blocked, "")?;

    let mut store = open(&blocked);
    store.append("Aspen")?;
    assert!(!store.is_persistent());
    assert_eq!(store.counts().get("Aspen"), Some(1));
    Ok(())
}

#[tokio::test]
async fn session_history_is_shared_with_later_sessions() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let classes = ClassSet::forest_cover();

    let mut session = Session::new(
        FeatureSchema::forest_cover(),
        SimulatedPredictor::new(classes.clone(), 5),
        FileStorage::new(dir.path()),
    );
    session.submit(&InputRecord::example()).await?;
    session
        .submit(&InputRecord::example().with("Elevation", 2597))
        .await?;

    let later = Session::new(
        FeatureSchema::forest_cover(),
        SimulatedPredictor::new(classes, 5),
        FileStorage::new(dir.path()),
    )
    .with_history_max_len(1);
    let ledger: Vec<&str> = later.history().iter().collect();
    assert_eq!(ledger, ["Spruce/Fir"]);
    Ok(())
}

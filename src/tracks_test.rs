use std::path::{Path, PathBuf};

use crate::albums::Album;
use crate::common::Inserted;
use crate::performers::Performer;
use crate::testing;
use crate::tracks::Track;

#[test]
fn test_track_round_trip() {
    let (store, _temp_dir) = testing::store();
    let performer_id = store.insert_performer(&Performer::new("IU")).unwrap().id();
    let album = Album { id: 0, path: PathBuf::from("/music/iu/palette"), name: "Palette".to_string(), year: 2017 };
    let album_id = store.insert_album(&album).unwrap().id();

    let track = Track {
        id: 0,
        performer_id,
        album_id,
        path: PathBuf::from("/music/iu/palette/02 Palette.mp3"),
        title: "Palette".to_string(),
        track_number: 2,
        year: 2017,
        genre: "Ballad".to_string(),
    };
    let id = store.insert_track(&track).unwrap().id();
    let expected = Track { id, ..track.clone() };
    assert_eq!(store.get_track(id).unwrap(), Some(expected.clone()));
    assert_eq!(store.get_track_by_title_and_path("Palette", &track.path).unwrap(), Some(expected));
}

#[test]
fn test_track_dedup_by_title_and_path() {
    let (store, _temp_dir) = testing::seeded_store();
    let mut track = store.get_track(1).unwrap().unwrap();
    track.genre = "Something else".to_string();
    assert_eq!(store.insert_track(&track).unwrap(), Inserted::Existing(1));
    assert_eq!(store.list_tracks().unwrap().len(), 4);

    // Same title at another path is a different track.
    track.path = PathBuf::from("/music/bp/live/01 How You Like That.mp3");
    assert!(store.insert_track(&track).unwrap().is_new());
}

#[test]
fn test_album_dedup_by_name_and_path() {
    let (store, _temp_dir) = testing::store();
    let album = Album { id: 0, path: PathBuf::from("/music/a"), name: "Greatest Hits".to_string(), year: 2000 };
    assert!(store.insert_album(&album).unwrap().is_new());
    assert!(!store.insert_album(&album).unwrap().is_new());
    let elsewhere = Album { path: PathBuf::from("/music/b"), ..album };
    assert!(store.insert_album(&elsewhere).unwrap().is_new());
    assert!(store.get_album_by_name_and_path("Greatest Hits", Path::new("/music/b")).unwrap().is_some());
}

#[test]
fn test_update_track_relinks_performer() {
    let (store, _temp_dir) = testing::seeded_store();
    let mut track = store.get_track(4).unwrap().unwrap();
    track.performer_id = 2;
    track.title = "You & Me".to_string();
    assert!(store.update_track(&track).unwrap());
    assert_eq!(store.get_track(4).unwrap(), Some(track));
    assert!(store.tracks_by_performer(3).unwrap().is_empty());
    assert_eq!(store.tracks_by_performer(2).unwrap().len(), 2);
}

#[test]
fn test_tracks_by_performer_and_album() {
    let (store, _temp_dir) = testing::seeded_store();
    let titles = |tracks: Vec<Track>| tracks.into_iter().map(|t| t.title).collect::<Vec<_>>();
    assert_eq!(titles(store.tracks_by_performer(1).unwrap()), vec!["How You Like That", "Lovesick Girls"]);
    assert_eq!(titles(store.tracks_in_album(2).unwrap()), vec!["Solo", "Untitled"]);
}

#[test]
fn test_delete_track() {
    let (store, _temp_dir) = testing::seeded_store();
    assert!(store.delete_track(2).unwrap());
    assert!(!store.delete_track(2).unwrap());
    assert!(store.get_track(2).unwrap().is_none());
    assert_eq!(store.list_tracks().unwrap().iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3, 4]);
}

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tempfile::TempDir;

use crate::audiotags::{MetadataError, MetadataReader, RawTags};
use crate::store::Store;

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

// An empty store in a fresh temporary directory.
pub fn store() -> (Store, TempDir) {
    let temp_dir = init();
    let store = Store::open(&temp_dir.path().join("db").join("database.db")).expect("failed to open store");
    (store, temp_dir)
}

// A store seeded with a small library. The paths on disk do not exist.
//
// performers: 1 BLACKPINK (Group), 2 Jennie (Person), 3 Unknown (Unknown)
// albums:     1 The Album @ /music/bp/the-album, 2 Solo @ /music/jennie/solo
// tracks:     1 How You Like That, 2 Lovesick Girls, 3 Solo, 4 Untitled
pub fn seeded_store() -> (Store, TempDir) {
    let (store, temp_dir) = store();
    store
        .with_connection(|conn| {
            conn.execute_batch(
                r#"
INSERT INTO performers
       (id, type_id, name)
VALUES (1 , 1      , 'BLACKPINK')
     , (2 , 0      , 'Jennie')
     , (3 , 2      , 'Unknown');

INSERT INTO persons
       (id, stage_name, real_name  , birth_date  , death_date)
VALUES (1 , 'Jennie'  , 'Kim Jennie', '1996-01-16', null)
     , (2 , 'Lisa'    , 'Lalisa Manobal', '1997-03-27', null);

INSERT INTO "groups"
       (id, name       , start_date  , end_date)
VALUES (1 , 'BLACKPINK', '2016-08-08', null);

INSERT INTO membership
       (person_id, group_id)
VALUES (1        , 1)
     , (2        , 1);

INSERT INTO albums
       (id, path                  , name       , year)
VALUES (1 , '/music/bp/the-album' , 'The Album', 2020)
     , (2 , '/music/jennie/solo'  , 'Solo'     , 2018);

INSERT INTO tracks
       (id, performer_id, album_id, path                                       , title              , track_number, year, genre)
VALUES (1 , 1           , 1       , '/music/bp/the-album/01 How You Like That.mp3', 'How You Like That', 1          , 2020, 'K-Pop')
     , (2 , 1           , 1       , '/music/bp/the-album/02 Lovesick Girls.mp3'   , 'Lovesick Girls'   , 2          , 2020, 'K-Pop')
     , (3 , 2           , 2       , '/music/jennie/solo/01 Solo.mp3'              , 'Solo'             , 1          , 2018, 'Dance')
     , (4 , 3           , 2       , '/music/jennie/solo/02 untitled.mp3'          , 'Untitled'         , 0          , 2018, 'Unknown');
                "#,
            )?;
            Ok(())
        })
        .expect("failed to seed store");
    (store, temp_dir)
}

// Creates an empty file, and its parent directories.
pub fn touch(path: &Path) -> PathBuf {
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("failed to create dirs");
    fs::write(path, b"").expect("failed to write file");
    path.to_path_buf()
}

/// A reader that serves canned tags by file name and has a fixed creation year. Files without
/// canned tags fail to read.
#[derive(Debug, Clone, Default)]
pub struct FakeReader {
    pub tags: HashMap<String, RawTags>,
    pub creation_year: i32,
}

impl FakeReader {
    pub fn new(creation_year: i32) -> Self {
        FakeReader { tags: HashMap::new(), creation_year }
    }

    pub fn with(mut self, file_name: &str, tags: RawTags) -> Self {
        self.tags.insert(file_name.to_string(), tags);
        self
    }
}

impl MetadataReader for FakeReader {
    fn read(&self, path: &Path) -> Result<RawTags, MetadataError> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.tags.get(&name).cloned().ok_or_else(|| MetadataError::Other(format!("corrupt file {}", name)))
    }

    fn creation_year(&self, _path: &Path) -> io::Result<i32> {
        Ok(self.creation_year)
    }
}

pub fn tags(performer: &str, title: &str, album: &str) -> RawTags {
    RawTags {
        performer: Some(performer.to_string()),
        title: Some(title.to_string()),
        album: Some(album.to_string()),
        year: Some(2020),
        genre: Some("Pop".to_string()),
        track_number: Some(1),
        total_tracks: Some(10),
    }
}

// Record Store
// Key-value persistence of the app's record collections, one JSON array
// per collection under the data directory

use crate::models::{PostRecord, UserRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No current user in the users collection")]
    NoCurrentUser,
}

/// Logical collections kept by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Posts,
    Comments,
    Reels,
    Tracks,
}

impl Collection {
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::Reels => "reels",
            Collection::Tracks => "tracks",
        }
    }
}

pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_file(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.key()))
    }

    /// Load a collection; a missing file is an empty collection.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        let path = self.collection_file(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Replace a collection. Writes to a temp file first so readers never see
    /// a half-written array.
    pub fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.collection_file(collection);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(records)?;

        fs::write(&tmp, content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    /// The signed-in user is the first record of `users`.
    pub fn current_user(&self) -> Result<UserRecord, StoreError> {
        self.load::<UserRecord>(Collection::Users)?
            .into_iter()
            .next()
            .ok_or(StoreError::NoCurrentUser)
    }

    /// Seed `users` with `user` when the collection is empty. Returns whether
    /// anything was written.
    pub fn ensure_user(&self, user: UserRecord) -> Result<bool, StoreError> {
        let users: Vec<UserRecord> = self.load(Collection::Users)?;
        if !users.is_empty() {
            return Ok(false);
        }
        self.save(Collection::Users, &[user])?;
        Ok(true)
    }

    pub fn posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        self.load(Collection::Posts)
    }

    /// One past the largest stored id, or 1 for an empty collection. Records
    /// without a numeric id are skipped.
    pub fn next_post_id(&self) -> Result<u64, StoreError> {
        let posts: Vec<Value> = self.load(Collection::Posts)?;
        Ok(posts
            .iter()
            .filter_map(|p| p.get("id").and_then(Value::as_u64))
            .max()
            .map_or(1, |max| max + 1))
    }

    /// Prepend a finished post, newest first. Existing posts are written back
    /// exactly as other writers left them.
    pub fn add_post(&self, post: PostRecord) -> Result<(), StoreError> {
        let mut posts: Vec<Value> = self.load(Collection::Posts)?;
        let id = post.id;
        posts.insert(0, serde_json::to_value(post)?);
        self.save(Collection::Posts, &posts)?;
        info!(post_id = id, total = posts.len(), "record_store.post_added");
        Ok(())
    }
}

/// Profile used when the store has no users yet.
pub fn default_user() -> UserRecord {
    UserRecord {
        id: "1".to_string(),
        username: "johndoe".to_string(),
        full_name: "John Doe".to_string(),
        avatar: "https://i.pravatar.cc/150?img=1".to_string(),
        extra: serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn post(id: u64) -> PostRecord {
        PostRecord {
            id,
            user_id: "1".to_string(),
            images: vec![],
            videos: vec![],
            caption: String::new(),
            likes: 0,
            comments: 0,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            is_deepfake: false,
            deepfake_details: None,
        }
    }

    #[test]
    fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("records"));
        assert!(store.posts().unwrap().is_empty());
        assert_eq!(store.next_post_id().unwrap(), 1);
        assert!(matches!(store.current_user(), Err(StoreError::NoCurrentUser)));
    }

    #[test]
    fn test_add_post_prepends_and_ids_increase() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        store.add_post(post(4)).unwrap();
        assert_eq!(store.next_post_id().unwrap(), 5);
        store.add_post(post(5)).unwrap();

        let ids: Vec<u64> = store.posts().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[test]
    fn test_seed_user_once() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        assert!(store.ensure_user(default_user()).unwrap());
        let mut other = default_user();
        other.id = "2".to_string();
        assert!(!store.ensure_user(other).unwrap());
        assert_eq!(store.current_user().unwrap().id, "1");
    }

    #[test]
    fn test_unknown_user_fields_survive() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        fs::write(
            dir.path().join("users.json"),
            r#"[{"id": "9", "username": "janedoe", "followers": 12, "verified": true}]"#,
        )
        .unwrap();
        let user = store.current_user().unwrap();
        assert_eq!(user.username, "janedoe");
        assert_eq!(user.extra["followers"], 12);
    }

    #[test]
    fn test_foreign_post_fields_survive_publish() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        fs::write(
            dir.path().join("posts.json"),
            r#"[{"id": 1, "userId": "2", "images": [], "caption": "x", "likes": 5, "comments": 1,
                 "createdAt": "2024", "likedBy": ["3"], "location": "Paris"}]"#,
        )
        .unwrap();

        assert_eq!(store.next_post_id().unwrap(), 2);
        store.add_post(post(2)).unwrap();

        let raw: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("posts.json")).unwrap()).unwrap();
        assert_eq!(raw[0]["id"], 2);
        let old = raw[1].as_object().unwrap();
        assert_eq!(old["likedBy"], serde_json::json!(["3"]));
        assert_eq!(old["location"], "Paris");
        assert!(!old.contains_key("videos"));
        assert!(!old.contains_key("isDeepfake"));
        assert!(!old.contains_key("deepfakeDetails"));
    }

    #[test]
    fn test_legacy_deepfake_details_do_not_block_publish() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().to_path_buf());
        let legacy = r#"[{"id": 3, "userId": "1", "videos": ["data:video/mp4;base64,AAAA"],
            "caption": "", "createdAt": "2024",
            "deepfakeDetails": {"visual": {"is_deepfake": true, "confidence": 0.9},
                                "audio": null, "dominant_factor": "visual"}}]"#;
        fs::write(dir.path().join("posts.json"), legacy).unwrap();

        assert_eq!(store.next_post_id().unwrap(), 4);
        store.add_post(post(4)).unwrap();

        let raw: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("posts.json")).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1]["deepfakeDetails"]["dominant_factor"], "visual");
        assert_eq!(raw[1]["deepfakeDetails"]["visual"]["is_deepfake"], true);
    }
}

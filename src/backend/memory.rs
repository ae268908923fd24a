use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use super::models::{AuthUser, NewSnippet, Profile, Session, SignUpOutcome, Snippet};
use super::{AuthApi, FollowTable, ObjectStore, ProfileTable, SnippetTable};
use crate::colors::ColorPair;
use crate::error::{AppError, AppResult};

/// In-memory stand-in for every backend collaborator.
#[derive(Default)]
pub struct MemoryBackend {
    pub user: Mutex<Option<AuthUser>>,
    pub snippets: Mutex<Vec<(u64, Snippet)>>,
    pub profiles: Mutex<HashMap<String, Profile>>,
    pub follows: Mutex<Vec<(String, String)>>,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub seq: AtomicU64,
    pub delete_calls: AtomicU64,
    pub insert_calls: AtomicU64,
    pub color_updates: AtomicU64,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryBackend {
    pub fn signed_in(user_id: &str) -> Self {
        let backend = Self::default();
        *backend.user.lock().unwrap() = Some(AuthUser {
            id: user_id.to_string(),
            email: None,
        });
        backend
    }

    pub fn seed_snippet(&self, snippet: Snippet) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.snippets.lock().unwrap().push((seq, snippet));
    }

    pub fn seed_profile(&self, id: &str, name: &str) {
        self.profiles.lock().unwrap().insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                full_name: Some(name.to_string()),
                profile_image_url: None,
            },
        );
    }

    pub fn snippet(&self, id: &str) -> Option<Snippet> {
        self.snippets
            .lock()
            .unwrap()
            .iter()
            .find(|(_, s)| s.id == id)
            .map(|(_, s)| s.clone())
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                service: "memory",
                status: 500,
                message: "write failed".into(),
            });
        }
        Ok(())
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Api {
                service: "memory",
                status: 503,
                message: "read failed".into(),
            });
        }
        Ok(())
    }
}

/// A snippet row with the fields tests care about.
pub fn snippet(id: &str, user_id: &str, artist: &str) -> Snippet {
    Snippet {
        id: id.to_string(),
        user_id: user_id.to_string(),
        song_title: format!("Song {id}"),
        artist_name: artist.to_string(),
        album_art_url: None,
        artist_art_url: None,
        lyrics: "line one\nline two".to_string(),
        color: None,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_up(&self, email: &str, _password: &str) -> AppResult<SignUpOutcome> {
        let user = AuthUser {
            id: format!("user-{}", self.seq.fetch_add(1, Ordering::SeqCst)),
            email: Some(email.to_string()),
        };
        *self.user.lock().unwrap() = Some(user.clone());
        Ok(SignUpOutcome::SignedIn(user))
    }

    async fn sign_in(&self, email: &str, _password: &str) -> AppResult<Session> {
        let user = AuthUser {
            id: "user-1".into(),
            email: Some(email.to_string()),
        };
        *self.user.lock().unwrap() = Some(user.clone());
        Ok(Session {
            access_token: "token".into(),
            refresh_token: "refresh".into(),
            expires_at: i64::MAX,
            user,
        })
    }

    async fn request_password_reset(&self, _email: &str) -> AppResult<()> {
        Ok(())
    }

    async fn current_user(&self) -> AppResult<Option<AuthUser>> {
        Ok(self.user.lock().unwrap().clone())
    }

    async fn sign_out(&self) -> AppResult<()> {
        *self.user.lock().unwrap() = None;
        Ok(())
    }
}

#[async_trait]
impl SnippetTable for MemoryBackend {
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Snippet>> {
        self.check_read()?;
        let mut rows: Vec<(u64, Snippet)> = self
            .snippets
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows.into_iter().map(|(_, s)| s).collect())
    }

    async fn find_artist_art(&self, artist_name: &str) -> AppResult<Option<String>> {
        self.check_read()?;
        let rows = self.snippets.lock().unwrap();
        Ok(rows
            .iter()
            .rev()
            .filter(|(_, s)| s.artist_name == artist_name)
            .find_map(|(_, s)| s.artist_art_url.clone()))
    }

    async fn insert(&self, row: &NewSnippet) -> AppResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let snippet = Snippet {
            id: format!("snip-{seq}"),
            user_id: row.user_id.clone(),
            song_title: row.song_title.clone(),
            artist_name: row.artist_name.clone(),
            album_art_url: row.album_art_url.clone(),
            artist_art_url: row.artist_art_url.clone(),
            lyrics: row.lyrics.clone(),
            color: row.color.clone(),
            created_at: format!("{seq}"),
            updated_at: format!("{seq}"),
        };
        self.snippets.lock().unwrap().push((seq, snippet));
        Ok(())
    }

    async fn update_color(&self, id: &str, color: &ColorPair) -> AppResult<()> {
        self.color_updates.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        for (_, s) in self.snippets.lock().unwrap().iter_mut() {
            if s.id == id {
                s.color = Some(color.to_string());
            }
        }
        Ok(())
    }

    async fn update(&self, snippet: &Snippet) -> AppResult<()> {
        self.check_write()?;
        for (_, s) in self.snippets.lock().unwrap().iter_mut() {
            if s.id == snippet.id {
                s.song_title = snippet.song_title.clone();
                s.artist_name = snippet.artist_name.clone();
                s.album_art_url = snippet.album_art_url.clone();
                s.artist_art_url = snippet.artist_art_url.clone();
                s.lyrics = snippet.lyrics.clone();
                s.color = snippet.color.clone();
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.snippets.lock().unwrap().retain(|(_, s)| s.id != id);
        Ok(())
    }

    async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        self.check_read()?;
        Ok(self
            .snippets
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| s.user_id == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl ProfileTable for MemoryBackend {
    async fn get(&self, id: &str) -> AppResult<Option<Profile>> {
        self.check_read()?;
        Ok(self.profiles.lock().unwrap().get(id).cloned())
    }

    async fn get_many(&self, ids: &[String]) -> AppResult<Vec<Profile>> {
        self.check_read()?;
        let profiles = self.profiles.lock().unwrap();
        Ok(ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> AppResult<Vec<Profile>> {
        self.check_read()?;
        let needle = query.trim().to_lowercase();
        let mut hits: Vec<Profile> = self
            .profiles
            .lock()
            .unwrap()
            .values()
            .filter(|p| {
                p.full_name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert_name(&self, id: &str, full_name: &str) -> AppResult<()> {
        self.check_write()?;
        let mut profiles = self.profiles.lock().unwrap();
        let entry = profiles.entry(id.to_string()).or_insert_with(|| Profile {
            id: id.to_string(),
            full_name: None,
            profile_image_url: None,
        });
        entry.full_name = Some(full_name.to_string());
        Ok(())
    }

    async fn update_name(&self, id: &str, full_name: &str) -> AppResult<()> {
        self.check_write()?;
        if let Some(p) = self.profiles.lock().unwrap().get_mut(id) {
            p.full_name = Some(full_name.to_string());
        }
        Ok(())
    }

    async fn update_image_url(&self, id: &str, url: &str) -> AppResult<()> {
        self.check_write()?;
        if let Some(p) = self.profiles.lock().unwrap().get_mut(id) {
            p.profile_image_url = Some(url.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl FollowTable for MemoryBackend {
    async fn exists(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        self.check_read()?;
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .any(|(a, b)| a == follower_id && b == following_id))
    }

    async fn insert(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        self.check_write()?;
        self.follows
            .lock()
            .unwrap()
            .push((follower_id.to_string(), following_id.to_string()));
        Ok(())
    }

    async fn delete(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        self.check_write()?;
        self.follows
            .lock()
            .unwrap()
            .retain(|(a, b)| !(a == follower_id && b == following_id));
        Ok(())
    }

    async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        Ok(self.follower_ids(user_id).await?.len() as u64)
    }

    async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Ok(self.following_ids(user_id).await?.len() as u64)
    }

    async fn follower_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.check_read()?;
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, b)| b == user_id)
            .map(|(a, _)| a.clone())
            .collect())
    }

    async fn following_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.check_read()?;
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == user_id)
            .map(|(_, b)| b.clone())
            .collect())
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> AppResult<()> {
        self.check_write()?;
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{name}"), bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("https://objects.test/{bucket}/{name}")
    }
}

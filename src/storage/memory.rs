//! Concurrent in-memory store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{Book, NewBook, NewUser, RecordKind, User, UserUpdate};
use crate::storage::{SoftDeleteStore, Storage, StoreError, StoreResult};

/// In-memory store backed by sharded concurrent maps.
///
/// Purges run `retain` over each shard under its write lock, so a record
/// flagged concurrently is either removed by this purge or left for the next.
///
/// Emails of active users are claimed in `emails` through the entry API
/// before the user row is written. No method holds guards on two maps at
/// once.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    books: DashMap<String, Book>,
    /// email → uid, active users only.
    emails: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored rows of `kind`, soft-deleted included.
    pub fn stored_len(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Books => self.books.len(),
            RecordKind::Users => self.users.len(),
        }
    }

    /// Reserve `email` for `uid`, failing if another user holds it.
    fn claim_email(&self, email: &str, uid: &str) -> StoreResult<()> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(email.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(uid.to_string());
                Ok(())
            }
        }
    }

    fn release_email(&self, email: &str, uid: &str) {
        self.emails.remove_if(email, |_, owner| owner == uid);
    }

    fn not_found(kind: RecordKind, id: &str) -> StoreError {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl SoftDeleteStore for MemoryStore {
    async fn mark_deleted(&self, kind: RecordKind, id: &str) -> StoreResult<()> {
        let flagged = match kind {
            RecordKind::Books => self
                .books
                .get_mut(id)
                .filter(|book| !book.deleted)
                .map(|mut book| book.deleted = true),
            RecordKind::Users => {
                let email = self
                    .users
                    .get_mut(id)
                    .filter(|user| !user.deleted)
                    .map(|mut user| {
                        user.deleted = true;
                        user.email.clone()
                    });
                email.map(|email| self.release_email(&email, id))
            }
        };
        flagged.ok_or_else(|| Self::not_found(kind, id))
    }

    async fn purge_deleted(&self, kind: RecordKind) -> StoreResult<u64> {
        let mut removed = 0u64;
        let mut keep = |deleted: bool| {
            if deleted {
                removed += 1;
            }
            !deleted
        };
        match kind {
            RecordKind::Books => self.books.retain(|_, book| keep(book.deleted)),
            RecordKind::Users => self.users.retain(|_, user| keep(user.deleted)),
        }
        Ok(removed)
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn save_user(&self, user: NewUser) -> StoreResult<String> {
        let uid = uuid::Uuid::new_v4().to_string();
        self.claim_email(&user.email, &uid)?;
        self.users.insert(
            uid.clone(),
            User {
                uid: uid.clone(),
                name: user.name,
                email: user.email,
                pass_hash: user.pass_hash,
                deleted: false,
            },
        );
        Ok(uid)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<User> {
        let uid = self
            .emails
            .get(email)
            .map(|owner| owner.value().clone())
            .ok_or(StoreError::InvalidCredentials)?;
        self.users
            .get(&uid)
            .filter(|user| !user.deleted)
            .map(|user| user.value().clone())
            .ok_or(StoreError::InvalidCredentials)
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        let users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.value().clone())
            .collect();
        if users.is_empty() {
            return Err(StoreError::Empty(RecordKind::Users));
        }
        Ok(users)
    }

    async fn update_user(&self, uid: &str, update: UserUpdate) -> StoreResult<()> {
        let current = self
            .users
            .get(uid)
            .filter(|user| !user.deleted)
            .map(|user| user.email.clone())
            .ok_or_else(|| Self::not_found(RecordKind::Users, uid))?;

        let email = update.email.clone();
        let moving = current != email;
        if moving {
            self.claim_email(&email, uid)?;
        }

        let updated = self
            .users
            .get_mut(uid)
            .filter(|user| !user.deleted)
            .map(|mut user| {
                user.name = update.name;
                user.email = update.email;
                user.pass_hash = update.pass_hash;
            });

        match (updated, moving) {
            (Some(()), true) => self.release_email(&current, uid),
            (Some(()), false) => {}
            (None, true) => {
                self.release_email(&email, uid);
                return Err(Self::not_found(RecordKind::Users, uid));
            }
            (None, false) => return Err(Self::not_found(RecordKind::Users, uid)),
        }
        Ok(())
    }

    async fn save_book(&self, book: NewBook) -> StoreResult<String> {
        let bid = uuid::Uuid::new_v4().to_string();
        self.books.insert(
            bid.clone(),
            Book {
                bid: bid.clone(),
                label: book.label,
                author: book.author,
                deleted: false,
                user_uid: book.user_uid,
                created_at: Utc::now(),
            },
        );
        Ok(bid)
    }

    async fn book(&self, bid: &str) -> StoreResult<Book> {
        self.books
            .get(bid)
            .filter(|book| !book.deleted)
            .map(|book| book.value().clone())
            .ok_or_else(|| Self::not_found(RecordKind::Books, bid))
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        let books: Vec<Book> = self
            .books
            .iter()
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.value().clone())
            .collect();
        if books.is_empty() {
            return Err(StoreError::Empty(RecordKind::Books));
        }
        Ok(books)
    }

    async fn books_by_user(&self, uid: &str) -> StoreResult<Vec<Book>> {
        let books: Vec<Book> = self
            .books
            .iter()
            .filter(|entry| !entry.deleted && entry.user_uid == uid)
            .map(|entry| entry.value().clone())
            .collect();
        if books.is_empty() {
            return Err(StoreError::Empty(RecordKind::Books));
        }
        Ok(books)
    }
}

//! The account lookup contract consumed by the authenticator, plus an
//! in-memory implementation seeded from configuration.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::user::CredentialRecord;

/// Synchronous account storage.
///
/// `Ok(None)` means "no such active account"; `Err` is reserved for the
/// store itself failing.
pub trait UserStore: Send + Sync {
    fn find_active_by_email(&self, email: &str) -> AuthResult<Option<CredentialRecord>>;

    fn find_active_by_id(&self, id: Uuid) -> AuthResult<Option<CredentialRecord>>;

    /// Looks up an account regardless of its active flag.
    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<CredentialRecord>>;

    fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<()>;

    fn list(&self) -> AuthResult<Vec<CredentialRecord>>;

    /// Inserts a new account. Fails with [`AuthError::Conflict`] when the
    /// email or username is taken.
    fn create(&self, record: CredentialRecord) -> AuthResult<()>;

    /// Replaces the account with the same id. Fails with
    /// [`AuthError::UserNotFound`] for an unknown id and with
    /// [`AuthError::Conflict`] when another account holds the new email or
    /// username.
    fn update(&self, record: CredentialRecord) -> AuthResult<()>;

    /// Removes an account. Returns `false` when the id is unknown.
    fn delete(&self, id: Uuid) -> AuthResult<bool>;
}

/// Process-local account table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, CredentialRecord>>,
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::Store("user table lock poisoned".to_string())
}

fn check_unique<'a>(
    mut others: impl Iterator<Item = &'a CredentialRecord>,
    record: &CredentialRecord,
) -> AuthResult<()> {
    others.try_for_each(|u| {
        if u.email == record.email {
            Err(AuthError::Conflict(format!("email {} already registered", record.email)))
        } else if u.username == record.username {
            Err(AuthError::Conflict(format!("username {} already taken", record.username)))
        } else {
            Ok(())
        }
    })
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = CredentialRecord>) -> AuthResult<Self> {
        let store = Self::new();
        for record in records {
            store.create(record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStore for MemoryUserStore {
    fn find_active_by_email(&self, email: &str) -> AuthResult<Option<CredentialRecord>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|u| u.is_active && u.email == email)
            .cloned())
    }

    fn find_active_by_id(&self, id: Uuid) -> AuthResult<Option<CredentialRecord>> {
        Ok(self.find_by_id(id)?.filter(|u| u.is_active))
    }

    fn find_by_id(&self, id: Uuid) -> AuthResult<Option<CredentialRecord>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AuthError::Store(format!("no account with id {id}")))?;
        user.last_login_at = Some(at);
        Ok(())
    }

    fn list(&self) -> AuthResult<Vec<CredentialRecord>> {
        let users = self.users.read().map_err(poisoned)?;
        let mut all: Vec<CredentialRecord> = users.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }

    fn create(&self, record: CredentialRecord) -> AuthResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        check_unique(users.values(), &record)?;
        if users.contains_key(&record.id) {
            return Err(AuthError::Conflict(format!("id {} already exists", record.id)));
        }
        users.insert(record.id, record);
        Ok(())
    }

    fn update(&self, record: CredentialRecord) -> AuthResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        if !users.contains_key(&record.id) {
            return Err(AuthError::UserNotFound);
        }
        check_unique(users.values().filter(|u| u.id != record.id), &record)?;
        users.insert(record.id, record);
        Ok(())
    }

    fn delete(&self, id: Uuid) -> AuthResult<bool> {
        let mut users = self.users.write().map_err(poisoned)?;
        Ok(users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn record(username: &str, email: &str, active: bool) -> CredentialRecord {
        CredentialRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$placeholderplaceholderpl".to_string(),
            full_name: username.to_uppercase(),
            role: Role::Editor,
            avatar_url: None,
            is_active: active,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_accounts_are_invisible_to_active_lookups() {
        let dormant = record("dormant", "dormant@baiturrahim.test", false);
        let id = dormant.id;
        let store = MemoryUserStore::with_records([dormant]).unwrap();

        assert!(store.find_active_by_email("dormant@baiturrahim.test").unwrap().is_none());
        assert!(store.find_active_by_id(id).unwrap().is_none());
        assert!(store.find_by_id(id).unwrap().is_some());
    }

    #[test]
    fn duplicate_email_or_username_conflicts() {
        let store = MemoryUserStore::with_records([record("imam", "imam@baiturrahim.test", true)]).unwrap();
        assert!(matches!(
            store.create(record("imam2", "imam@baiturrahim.test", true)),
            Err(AuthError::Conflict(_))
        ));
        assert!(matches!(
            store.create(record("imam", "other@baiturrahim.test", true)),
            Err(AuthError::Conflict(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn record_login_sets_timestamp() {
        let rec = record("muadzin", "muadzin@baiturrahim.test", true);
        let id = rec.id;
        let store = MemoryUserStore::with_records([rec]).unwrap();
        let at = Utc::now();
        store.record_login(id, at).unwrap();
        assert_eq!(store.find_by_id(id).unwrap().unwrap().last_login_at, Some(at));
        assert!(store.record_login(Uuid::new_v4(), at).is_err());
    }

    #[test]
    fn update_replaces_record_and_hides_deactivated() {
        let mut rec = record("marbot", "marbot@baiturrahim.test", true);
        let id = rec.id;
        let store = MemoryUserStore::with_records([rec.clone()]).unwrap();
        rec.is_active = false;
        store.update(rec).unwrap();
        assert!(store.find_active_by_id(id).unwrap().is_none());
        assert!(store.find_by_id(id).unwrap().is_some());
    }

    #[test]
    fn update_checks_uniqueness_against_other_accounts_only() {
        let imam = record("imam", "imam@baiturrahim.test", true);
        let mut marbot = record("marbot", "marbot@baiturrahim.test", true);
        let store = MemoryUserStore::with_records([imam, marbot.clone()]).unwrap();

        marbot.full_name = "Marbot Masjid".to_string();
        store.update(marbot.clone()).unwrap();

        marbot.email = "imam@baiturrahim.test".to_string();
        assert!(matches!(store.update(marbot), Err(AuthError::Conflict(_))));
        assert!(matches!(
            store.update(record("ghost", "ghost@baiturrahim.test", true)),
            Err(AuthError::UserNotFound)
        ));
    }

    #[test]
    fn delete_removes_once() {
        let rec = record("takmir", "takmir@baiturrahim.test", true);
        let id = rec.id;
        let store = MemoryUserStore::with_records([rec]).unwrap();
        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn list_is_sorted_by_username() {
        let store = MemoryUserStore::with_records([
            record("zakat", "z@baiturrahim.test", true),
            record("admin", "a@baiturrahim.test", false),
        ])
        .unwrap();
        let names: Vec<String> = store.list().unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, ["admin", "zakat"]);
    }
}

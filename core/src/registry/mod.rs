//! Permission Registry
//!
//! The set of user identities and capability flags loaded once at boot
//! from the user registry text. Read-only after construction, so it can
//! be shared between threads without locking.

pub mod cursor;
pub mod parser;
pub mod user;

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::config::MAX_USERS;
use crate::error::ParseError;

pub use parser::{parse_users, ParseMode};
pub use user::{Capabilities, UserRecord};

/// Parsed user registry, in file order.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: Vec<UserRecord>,
    /// UID -> index of the first record carrying it
    by_uid: HashMap<String, usize>,
}

impl UserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse registry text leniently. Never fails.
    pub fn parse(text: &str) -> Self {
        let mut users = Vec::new();
        // Lenient mode has no error path.
        let _ = parse_users(text, ParseMode::Lenient, &mut users);
        Self::from_records(users)
    }

    /// Parse registry text with an explicit mode.
    pub fn parse_with(text: &str, mode: ParseMode) -> Result<Self, ParseError> {
        let mut users = Vec::new();
        parse_users(text, mode, &mut users)?;
        Ok(Self::from_records(users))
    }

    fn from_records(users: Vec<UserRecord>) -> Self {
        let mut by_uid = HashMap::with_capacity(users.len());
        for (index, user) in users.iter().enumerate() {
            by_uid.entry(String::from(user.uid())).or_insert(index);
        }

        log::debug!("[KEEL Users] Parsed {} users", users.len());

        Self { users, by_uid }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Hard upper bound on the number of records
    pub const fn capacity(&self) -> usize {
        MAX_USERS
    }

    /// Record at a file-order index
    pub fn get(&self, index: usize) -> Option<&UserRecord> {
        self.users.get(index)
    }

    /// First user with the given UID
    pub fn find_by_uid(&self, uid: &str) -> Option<&UserRecord> {
        self.by_uid.get(uid).map(|&index| &self.users[index])
    }

    /// First user with the given name
    pub fn find_by_name(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username() == username)
    }

    /// Iterate over all users in file order
    pub fn iter(&self) -> core::slice::Iter<'_, UserRecord> {
        self.users.iter()
    }
}

impl<'a> IntoIterator for &'a UserRegistry {
    type Item = &'a UserRecord;
    type IntoIter = core::slice::Iter<'a, UserRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = "root::0:0::\"/root\":\"/bin/sh\"::rwxsamndltcbu:/-\n\
                         alice::1000:1000::\"/home/alice\":\"/bin/sh\"::rwxs:/home-\n\
                         shadow::1000:1000::\"/\":\"/bin/false\"::r:/-\n";

    #[test]
    fn test_lookup_by_uid_prefers_first() {
        let registry = UserRegistry::parse(USERS);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.find_by_uid("1000").unwrap().username(), "alice");
        assert_eq!(registry.find_by_uid("0").unwrap().username(), "root");
        assert!(registry.find_by_uid("42").is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = UserRegistry::parse(USERS);
        let root = registry.find_by_name("root").unwrap();
        assert_eq!(root.capabilities(), Capabilities::all());
        assert!(registry.find_by_name("mallory").is_none());
    }

    #[test]
    fn test_file_order_preserved() {
        let registry = UserRegistry::parse(USERS);
        let names: Vec<&str> = registry.iter().map(|u| u.username()).collect();
        assert_eq!(names, ["root", "alice", "shadow"]);
    }
}

//! Friendship lookups used by friend-scoped listings and forks

use dashmap::{DashMap, DashSet};

/// Answers whether two users are confirmed friends
pub trait FriendOracle: Send + Sync {
    fn is_confirmed_friend(&self, a: &str, b: &str) -> bool;
}

/// In-process friendship registry
///
/// A friendship exists once one user has asked and the other has confirmed.
#[derive(Debug, Default)]
pub struct FriendRegistry {
    /// (requester, invitee) pairs awaiting confirmation
    pending: DashSet<(String, String)>,
    /// Confirmed friends per user, stored in both directions
    confirmed: DashMap<String, DashSet<String>>,
}

impl FriendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `requester` asked `invitee` to be friends
    pub fn add(&self, requester: &str, invitee: &str) {
        if requester == invitee || self.is_confirmed_friend(requester, invitee) {
            return;
        }
        self.pending
            .insert((requester.to_string(), invitee.to_string()));
    }

    /// `invitee` accepts `requester`'s request; false without a pending request
    pub fn confirm(&self, invitee: &str, requester: &str) -> bool {
        let key = (requester.to_string(), invitee.to_string());
        if self.pending.remove(&key).is_none() {
            return false;
        }
        self.link(requester, invitee);
        self.link(invitee, requester);
        true
    }

    /// End a friendship or withdraw a request in either direction
    pub fn remove(&self, a: &str, b: &str) {
        self.pending.remove(&(a.to_string(), b.to_string()));
        self.pending.remove(&(b.to_string(), a.to_string()));
        if let Some(friends) = self.confirmed.get(a) {
            friends.remove(b);
        }
        if let Some(friends) = self.confirmed.get(b) {
            friends.remove(a);
        }
    }

    /// Confirmed friends of `user`, sorted
    pub fn friends_of(&self, user: &str) -> Vec<String> {
        let mut friends: Vec<String> = self
            .confirmed
            .get(user)
            .map(|set| set.iter().map(|f| f.key().clone()).collect())
            .unwrap_or_default();
        friends.sort();
        friends
    }

    fn link(&self, from: &str, to: &str) {
        self.confirmed
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }
}

impl FriendOracle for FriendRegistry {
    fn is_confirmed_friend(&self, a: &str, b: &str) -> bool {
        self.confirmed
            .get(a)
            .is_some_and(|friends| friends.contains(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendship_needs_confirmation_from_the_other_side() {
        let registry = FriendRegistry::new();
        registry.add("roger", "colette");
        assert!(!registry.is_confirmed_friend("roger", "colette"));

        assert!(!registry.confirm("roger", "colette"));
        assert!(registry.confirm("colette", "roger"));
        assert!(registry.is_confirmed_friend("roger", "colette"));
        assert!(registry.is_confirmed_friend("colette", "roger"));
        assert_eq!(registry.friends_of("roger"), vec!["colette".to_string()]);
    }

    #[test]
    fn confirming_without_request_fails() {
        let registry = FriendRegistry::new();
        assert!(!registry.confirm("colette", "roger"));
        assert!(registry.friends_of("colette").is_empty());
    }

    #[test]
    fn remove_ends_friendship_both_ways() {
        let registry = FriendRegistry::new();
        registry.add("roger", "colette");
        registry.confirm("colette", "roger");
        registry.remove("colette", "roger");
        assert!(!registry.is_confirmed_friend("roger", "colette"));
        assert!(!registry.is_confirmed_friend("colette", "roger"));
    }

    #[test]
    fn self_requests_are_ignored() {
        let registry = FriendRegistry::new();
        registry.add("roger", "roger");
        assert!(!registry.confirm("roger", "roger"));
    }
}

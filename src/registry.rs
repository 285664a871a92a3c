//! Ordered collection of known networks.
//!
//! Rows are addressed by index. Each row carries the credential plus the
//! scan metadata of the current cycle and the `next` link that encodes the
//! ranked visitation order (see [`crate::scan::rank`]).

use crate::credential::NetworkCredential;
use crate::scan::Sighting;

/// RSSI value reported for an entry that was not seen in the last scan.
pub const NOT_VISIBLE: i32 = 0;

#[derive(Debug, Clone)]
pub struct NetworkEntry {
    pub credential: NetworkCredential,
    pub(crate) sighting: Option<Sighting>,
    pub(crate) next: Option<usize>,
}

impl NetworkEntry {
    fn new(credential: NetworkCredential) -> Self {
        NetworkEntry {
            credential,
            sighting: None,
            next: None,
        }
    }

    /// Signal strength of the last scan, or [`NOT_VISIBLE`].
    pub fn rssi(&self) -> i32 {
        self.sighting.as_ref().map_or(NOT_VISIBLE, |s| s.rssi)
    }

    /// Whether this entry was matched in the most recent scan.
    pub fn scanned(&self) -> bool {
        self.sighting.is_some()
    }

    pub fn sighting(&self) -> Option<&Sighting> {
        self.sighting.as_ref()
    }

    /// Next entry in the ranked order, if any.
    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

#[derive(Debug, Default)]
pub struct NetworkRegistry {
    entries: Vec<NetworkEntry>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential and returns its index.
    ///
    /// Front insertion shifts every existing index by one.
    pub fn register(&mut self, credential: NetworkCredential, at_front: bool) -> usize {
        let entry = NetworkEntry::new(credential);
        if at_front {
            self.entries.insert(0, entry);
            0
        } else {
            self.entries.push(entry);
            self.entries.len() - 1
        }
    }

    pub fn remove(&mut self, id: usize) -> Option<NetworkCredential> {
        if id >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(id);
        // Indices moved; any ranking is stale now.
        self.clear_links();
        Some(removed.credential)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: usize) -> Option<&NetworkEntry> {
        self.entries.get(id)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [NetworkEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkEntry> {
        self.entries.iter()
    }

    /// Forgets every sighting before a new scan is applied.
    pub fn mark_all_unseen(&mut self) {
        for entry in &mut self.entries {
            entry.sighting = None;
            entry.next = None;
        }
    }

    fn clear_links(&mut self) {
        for entry in &mut self.entries {
            entry.next = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{Bssid, Security};

    fn cred(ssid: &str) -> NetworkCredential {
        NetworkCredential::new(ssid, Some("password"), None).unwrap()
    }

    #[test]
    fn register_back_and_front() {
        let mut reg = NetworkRegistry::new();
        assert_eq!(reg.register(cred("a"), false), 0);
        assert_eq!(reg.register(cred("b"), false), 1);
        assert_eq!(reg.register(cred("c"), true), 0);

        let order: Vec<_> = reg.iter().map(|e| e.credential.ssid.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn duplicate_ssids_are_kept() {
        let mut reg = NetworkRegistry::new();
        reg.register(cred("home"), false);
        reg.register(cred("home"), false);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn remove_and_clear() {
        let mut reg = NetworkRegistry::new();
        reg.register(cred("a"), false);
        reg.register(cred("b"), false);

        assert_eq!(reg.remove(0).unwrap().ssid.as_str(), "a");
        assert!(reg.remove(5).is_none());
        assert_eq!(reg.get(0).unwrap().credential.ssid.as_str(), "b");

        reg.clear();
        assert!(reg.is_empty());
    }

    #[test]
    fn mark_all_unseen_resets_visibility() {
        let mut reg = NetworkRegistry::new();
        reg.register(cred("a"), false);
        {
            let entry = &mut reg.entries_mut()[0];
            entry.sighting = Some(Sighting {
                rssi: -50,
                security: Security::Wpa2,
                channel: 6,
                bssid: Bssid([1, 2, 3, 4, 5, 6]),
            });
            entry.next = Some(0);
        }
        assert!(reg.get(0).unwrap().scanned());

        reg.mark_all_unseen();
        let entry = reg.get(0).unwrap();
        assert_eq!(entry.rssi(), NOT_VISIBLE);
        assert!(!entry.scanned());
        assert!(entry.next().is_none());
    }
}

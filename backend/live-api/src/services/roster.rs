use crate::models::error::GameError;
use crate::models::participant::{ApprovalStatus, ParticipantEntry};

/// Ordered participant list for one session. Entries keep join order;
/// an id appears at most once for the life of the session.
#[derive(Debug, Default)]
pub struct ParticipantRoster {
    entries: Vec<ParticipantEntry>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant in `Waiting` state. Re-joining with a known
    /// id is a no-op returning the existing entry, so reconnects never
    /// duplicate or reset anyone.
    pub fn add_waiting(
        &mut self,
        participant_id: &str,
        display_name: &str,
    ) -> (ParticipantEntry, bool) {
        if let Some(entry) = self.get(participant_id) {
            return (entry.clone(), false);
        }
        let entry = ParticipantEntry::new(participant_id, display_name);
        self.entries.push(entry.clone());
        (entry, true)
    }

    pub fn approve(&mut self, participant_id: &str) -> Result<&ParticipantEntry, GameError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.participant_id == participant_id)
            .ok_or(GameError::ParticipantNotFound)?;
        entry.status = ApprovalStatus::Approved;
        Ok(entry)
    }

    pub fn remove(&mut self, participant_id: &str) -> Result<ParticipantEntry, GameError> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.participant_id == participant_id)
            .ok_or(GameError::ParticipantNotFound)?;
        Ok(self.entries.remove(idx))
    }

    pub fn get(&self, participant_id: &str) -> Option<&ParticipantEntry> {
        self.entries
            .iter()
            .find(|e| e.participant_id == participant_id)
    }

    pub fn get_mut(&mut self, participant_id: &str) -> Option<&mut ParticipantEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.participant_id == participant_id)
    }

    pub fn approved(&self) -> impl Iterator<Item = &ParticipantEntry> {
        self.entries.iter().filter(|e| e.is_approved())
    }

    pub fn approved_count(&self) -> usize {
        self.approved().count()
    }

    /// Join-ordered copy of the roster for snapshots and broadcasts.
    pub fn snapshot(&self) -> Vec<ParticipantEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_waiting_preserves_join_order() {
        let mut roster = ParticipantRoster::new();
        roster.add_waiting("p1", "Alice");
        roster.add_waiting("p2", "Bob");
        roster.add_waiting("p3", "Carol");

        let ids: Vec<_> = roster
            .snapshot()
            .into_iter()
            .map(|e| e.participant_id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn rejoin_does_not_duplicate_or_reset() {
        let mut roster = ParticipantRoster::new();
        roster.add_waiting("p1", "Alice");
        roster.approve("p1").unwrap();
        roster.get_mut("p1").unwrap().score = 500;

        let (entry, created) = roster.add_waiting("p1", "Alice");
        assert!(!created);
        assert_eq!(entry.score, 500);
        assert_eq!(entry.status, ApprovalStatus::Approved);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn approve_unknown_participant_fails() {
        let mut roster = ParticipantRoster::new();
        let err = roster.approve("ghost").unwrap_err();
        assert!(matches!(err, GameError::ParticipantNotFound));
    }

    #[test]
    fn remove_unknown_participant_fails() {
        let mut roster = ParticipantRoster::new();
        roster.add_waiting("p1", "Alice");
        let err = roster.remove("ghost").unwrap_err();
        assert!(matches!(err, GameError::ParticipantNotFound));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn approved_count_ignores_waiting_and_rejected() {
        let mut roster = ParticipantRoster::new();
        roster.add_waiting("p1", "Alice");
        roster.add_waiting("p2", "Bob");
        roster.add_waiting("p3", "Carol");
        roster.approve("p1").unwrap();
        roster.get_mut("p3").unwrap().status = ApprovalStatus::Rejected;

        assert_eq!(roster.approved_count(), 1);
    }

    #[test]
    fn remove_returns_the_entry() {
        let mut roster = ParticipantRoster::new();
        roster.add_waiting("p1", "Alice");
        let removed = roster.remove("p1").unwrap();
        assert_eq!(removed.participant_id, "p1");
        assert!(roster.is_empty());
    }
}

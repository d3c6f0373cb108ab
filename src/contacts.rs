use crate::errors::{AppError, AppResult};
use crate::models::{CallEvent, CallResult, Contact, ContactStatus, NewContactPayload, SequenceEnrollment};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Contact list snapshot keyed by contact id. Mutations return a new book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactBook {
    contacts: BTreeMap<String, Contact>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, contact_id: &str) -> Option<&Contact> {
        self.contacts.get(contact_id)
    }

    pub fn list(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    pub fn add_contact(&self, payload: NewContactPayload) -> AppResult<(Self, Contact)> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("contact name is required".to_string()));
        }
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            company: non_blank(payload.company),
            phone: non_blank(payload.phone),
            email: non_blank(payload.email),
            status: ContactStatus::New,
            calls: Vec::new(),
            enrollment: None,
            created_at: now,
            updated_at: now,
        };
        Ok((self.with_contact(contact.clone()), contact))
    }

    /// Appends a call to the contact's history and advances its status from
    /// the call result.
    pub fn log_call(&self, contact_id: &str, event: CallEvent) -> AppResult<(Self, Contact)> {
        let mut contact = self.require(contact_id)?.clone();
        if contact.status == ContactStatus::DoNotCall {
            return Err(AppError::Validation(format!(
                "contact {} is marked do-not-call",
                contact_id
            )));
        }

        contact.status = match (event.result, contact.status) {
            (CallResult::MeetingBooked, _) => ContactStatus::MeetingBooked,
            (CallResult::NotInterested, _) => ContactStatus::NotInterested,
            (_, ContactStatus::New) => ContactStatus::InProgress,
            (_, current) => current,
        };
        contact.calls.push(event);
        contact.updated_at = Utc::now();
        Ok((self.with_contact(contact.clone()), contact))
    }

    pub fn set_status(&self, contact_id: &str, status: ContactStatus) -> AppResult<(Self, Contact)> {
        let mut contact = self.require(contact_id)?.clone();
        contact.status = status;
        contact.updated_at = Utc::now();
        Ok((self.with_contact(contact.clone()), contact))
    }

    pub fn set_enrollment(
        &self,
        contact_id: &str,
        enrollment: Option<SequenceEnrollment>,
    ) -> AppResult<(Self, Contact)> {
        let mut contact = self.require(contact_id)?.clone();
        contact.enrollment = enrollment;
        contact.updated_at = Utc::now();
        Ok((self.with_contact(contact.clone()), contact))
    }

    pub fn all_calls(&self) -> Vec<CallEvent> {
        self.contacts
            .values()
            .flat_map(|contact| contact.calls.iter().cloned())
            .collect()
    }

    fn require(&self, contact_id: &str) -> AppResult<&Contact> {
        self.contacts
            .get(contact_id)
            .ok_or_else(|| AppError::NotFound(format!("contact {}", contact_id)))
    }

    fn with_contact(&self, contact: Contact) -> Self {
        let mut contacts = self.contacts.clone();
        contacts.insert(contact.id.clone(), contact);
        Self { contacts }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::ContactBook;
    use crate::models::{CallEvent, CallOutcome, CallResult, ContactStatus, NewContactPayload};
    use chrono::{TimeZone, Utc};

    fn payload(name: &str) -> NewContactPayload {
        NewContactPayload {
            name: name.to_string(),
            company: Some("Acme".to_string()),
            phone: Some("  ".to_string()),
            email: None,
        }
    }

    fn call(result: CallResult) -> CallEvent {
        let mut event = CallEvent::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 15, 30, 0).unwrap(),
            CallOutcome::DecisionMakerReached,
        );
        event.result = result;
        event
    }

    #[test]
    fn add_contact_requires_name_and_drops_blank_fields() {
        let book = ContactBook::new();
        assert!(book.add_contact(payload("  ")).is_err());

        let (book, contact) = book.add_contact(payload(" Dana Lee ")).expect("add");
        assert_eq!(contact.name, "Dana Lee");
        assert!(contact.phone.is_none());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn logging_calls_advances_status() {
        let (book, contact) = ContactBook::new().add_contact(payload("Dana")).expect("add");

        let (book, updated) = book.log_call(&contact.id, call(CallResult::FollowUp)).expect("log");
        assert_eq!(updated.status, ContactStatus::InProgress);

        let (book, updated) = book.log_call(&contact.id, call(CallResult::MeetingBooked)).expect("log");
        assert_eq!(updated.status, ContactStatus::MeetingBooked);
        assert_eq!(updated.calls.len(), 2);
        assert_eq!(book.all_calls().len(), 2);
    }

    #[test]
    fn do_not_call_contacts_reject_calls() {
        let (book, contact) = ContactBook::new().add_contact(payload("Dana")).expect("add");
        let (book, _) = book.set_status(&contact.id, ContactStatus::DoNotCall).expect("status");
        assert!(book.log_call(&contact.id, call(CallResult::None)).is_err());
    }

    #[test]
    fn unknown_contact_is_not_found() {
        let err = ContactBook::new()
            .log_call("missing", call(CallResult::None))
            .expect_err("missing contact");
        assert!(err.to_string().contains("NOT_FOUND"));
    }
}

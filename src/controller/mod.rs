//! Application state and its transitions.
//!
//! `Phonebook` owns the canonical contact list, the refresh token, the
//! filter text and both notification channels. Views never touch that state
//! directly: they dispatch an `Action` and carry out the returned `Effect`s.
//! Remote calls and notice timers are run by `effects::Executor`, whose
//! completions come back as further actions.

pub mod effects;
pub mod notice;

use std::time::Duration;

use uuid::Uuid;

use crate::contact::{self, Contact, NewContact};
use crate::filter;
use crate::remote::ServiceError;

pub use notice::{NoticeKind, Notification, Notices};

pub const NAME_REQUIRED: &str = "Name field is required!";
pub const LOAD_FAILED: &str = "Unable to load contacts from the server";

pub fn duplicate_message(name: &str) -> String {
    format!("{} is already added to phonebook", name)
}

pub fn added_message(name: &str) -> String {
    format!("'{}' added to phonebook", name)
}

pub fn add_failed_message(name: &str) -> String {
    format!("Error occurred while attempting to add '{}' to phonebook", name)
}

pub fn remove_failed_message(name: &str) -> String {
    format!(
        "Error occurred while attempting to remove '{}' from phonebook. Person might have already been deleted from the server",
        name
    )
}

/// Inputs to the phonebook: user intents and remote completions.
#[derive(Debug)]
pub enum Action {
    /// Initial load with the current refresh token
    Mount,
    /// Force a reload under a new refresh token
    Refresh,
    SetFilter(String),
    Submit { name: String, number: String },
    Delete(Contact),
    Loaded(Result<Vec<Contact>, ServiceError>),
    Created {
        name: String,
        result: Result<Contact, ServiceError>,
    },
    Deleted {
        contact: Contact,
        result: Result<(), ServiceError>,
    },
    NoticeExpired { kind: NoticeKind, generation: u64 },
}

/// Asynchronous work requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    FetchAll { token: Uuid },
    Create(NewContact),
    Delete(Contact),
    ClearNotice {
        kind: NoticeKind,
        generation: u64,
        after: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Task(Task),
    /// Blocking message for a submission rejected locally
    Alert(String),
    /// Empty the add-contact inputs
    ResetForm,
}

pub struct Phonebook {
    contacts: Vec<Contact>,
    refresh_token: Uuid,
    filter: String,
    notices: Notices,
}

impl Phonebook {
    pub fn new(notice_timeout: Duration) -> Self {
        Self {
            contacts: Vec::new(),
            refresh_token: Uuid::new_v4(),
            filter: String::new(),
            notices: Notices::new(notice_timeout),
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn visible(&self) -> Vec<&Contact> {
        filter::visible(&self.contacts, &self.filter)
    }

    #[cfg(test)]
    pub fn refresh_token(&self) -> Uuid {
        self.refresh_token
    }

    pub fn notice(&self, kind: NoticeKind) -> Option<&Notification> {
        self.notices.get(kind)
    }

    pub fn update(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Mount => self.mount(),
            Action::Refresh => self.refresh(),
            Action::SetFilter(text) => {
                self.set_filter(text);
                Vec::new()
            }
            Action::Submit { name, number } => self.submit(&name, &number),
            Action::Delete(contact) => self.delete(contact),
            Action::Loaded(result) => self.on_loaded(result),
            Action::Created { name, result } => self.on_created(&name, result),
            Action::Deleted { contact, result } => self.on_deleted(contact, result),
            Action::NoticeExpired { kind, generation } => {
                self.notices.expire(kind, generation);
                Vec::new()
            }
        }
    }

    pub fn mount(&mut self) -> Vec<Effect> {
        vec![Effect::Task(Task::FetchAll {
            token: self.refresh_token,
        })]
    }

    pub fn refresh(&mut self) -> Vec<Effect> {
        self.refresh_token = Uuid::new_v4();
        tracing::debug!(token = %self.refresh_token, "refresh requested");
        vec![Effect::Task(Task::FetchAll {
            token: self.refresh_token,
        })]
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter = text.into();
    }

    pub fn submit(&mut self, name: &str, number: &str) -> Vec<Effect> {
        if name.is_empty() {
            return vec![Effect::Alert(NAME_REQUIRED.to_string())];
        }
        if contact::find_by_name(&self.contacts, name).is_some() {
            return vec![Effect::Alert(duplicate_message(name))];
        }

        let payload = NewContact::candidate(&self.contacts, name, number);
        tracing::info!(name, candidate_id = payload.id, "submitting contact");
        vec![Effect::ResetForm, Effect::Task(Task::Create(payload))]
    }

    pub fn delete(&mut self, contact: Contact) -> Vec<Effect> {
        tracing::info!(id = contact.id, name = %contact.name, "deleting contact");
        vec![Effect::Task(Task::Delete(contact))]
    }

    fn on_loaded(&mut self, result: Result<Vec<Contact>, ServiceError>) -> Vec<Effect> {
        match result {
            Ok(contacts) => {
                tracing::debug!(count = contacts.len(), "contacts loaded");
                self.contacts = contacts;
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load contacts");
                vec![Effect::Task(self.notices.show(NoticeKind::Error, LOAD_FAILED))]
            }
        }
    }

    fn on_created(&mut self, name: &str, result: Result<Contact, ServiceError>) -> Vec<Effect> {
        match result {
            Ok(created) => {
                tracing::info!(id = created.id, name = %created.name, "contact added");
                let message = added_message(&created.name);
                self.contacts.push(created);
                vec![Effect::Task(self.notices.show(NoticeKind::Info, message))]
            }
            Err(err) => {
                tracing::warn!(name, error = %err, "failed to add contact");
                vec![Effect::Task(
                    self.notices.show(NoticeKind::Error, add_failed_message(name)),
                )]
            }
        }
    }

    fn on_deleted(&mut self, contact: Contact, result: Result<(), ServiceError>) -> Vec<Effect> {
        match result {
            Ok(()) => self.refresh(),
            Err(err) => {
                tracing::warn!(id = contact.id, error = %err, "failed to remove contact");
                vec![Effect::Task(self.notices.show(
                    NoticeKind::Error,
                    remove_failed_message(&contact.name),
                ))]
            }
        }
    }
}

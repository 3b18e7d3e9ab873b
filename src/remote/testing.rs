//! In-memory `ContactService` for tests.

use std::cell::{Cell, RefCell};

use http::StatusCode;

use crate::contact::{Contact, NewContact};
use crate::remote::{ContactService, ServiceError};

#[derive(Default)]
pub struct MemoryService {
    contacts: RefCell<Vec<Contact>>,
    /// When set, the server assigns this id to the next created contact
    next_id: Cell<Option<i64>>,
    fail_load: Cell<bool>,
    fail_create: Cell<bool>,
    pub loads: Cell<usize>,
    pub creates: Cell<usize>,
    pub deletes: Cell<usize>,
}

impl MemoryService {
    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: RefCell::new(contacts),
            ..Self::default()
        }
    }

    pub fn assign_next_id(&self, id: i64) {
        self.next_id.set(Some(id));
    }

    pub fn fail_load(&self, fail: bool) {
        self.fail_load.set(fail);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.set(fail);
    }

    /// Remove a contact behind the client's back
    pub fn remove(&self, id: i64) {
        self.contacts.borrow_mut().retain(|c| c.id != id);
    }

    pub fn snapshot(&self) -> Vec<Contact> {
        self.contacts.borrow().clone()
    }
}

impl ContactService for MemoryService {
    async fn get_all(&self) -> Result<Vec<Contact>, ServiceError> {
        self.loads.set(self.loads.get() + 1);
        if self.fail_load.get() {
            return Err(ServiceError::Server {
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        Ok(self.snapshot())
    }

    async fn create(&self, contact: &NewContact) -> Result<Contact, ServiceError> {
        self.creates.set(self.creates.get() + 1);
        if self.fail_create.get() {
            return Err(ServiceError::Validation {
                status: StatusCode::BAD_REQUEST,
            });
        }
        let id = self.next_id.take().unwrap_or(contact.id);
        let created = Contact::new(id, contact.name.clone(), contact.number.clone());
        self.contacts.borrow_mut().push(created.clone());
        Ok(created)
    }

    async fn delete_number(&self, contact: &Contact) -> Result<(), ServiceError> {
        self.deletes.set(self.deletes.get() + 1);
        let mut contacts = self.contacts.borrow_mut();
        let before = contacts.len();
        contacts.retain(|c| c.id != contact.id);
        if contacts.len() == before {
            return Err(ServiceError::NotFound { id: contact.id });
        }
        Ok(())
    }
}

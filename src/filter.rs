use crate::contact::Contact;

/// Contacts whose name contains `filter`, in list order.
///
/// Matching is a plain case-sensitive substring test; an empty filter keeps
/// everything.
pub fn visible<'a>(contacts: &'a [Contact], filter: &str) -> Vec<&'a Contact> {
    if filter.is_empty() {
        return contacts.iter().collect();
    }
    contacts
        .iter()
        .filter(|contact| contact.name.contains(filter))
        .collect()
}

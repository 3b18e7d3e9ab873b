use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A phonebook entry as the server stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    pub name: String,
    pub number: String,
}

impl Contact {
    pub fn new(id: i64, name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            number: number.into(),
        }
    }
}

/// Body posted to the collection when creating a contact.
///
/// The `id` is only a hint; the server's response carries the real one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewContact {
    pub name: String,
    pub number: String,
    pub id: i64,
}

impl NewContact {
    /// Build a create payload with an id one past the last contact's.
    pub fn candidate(existing: &[Contact], name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            id: next_candidate_id(existing),
        }
    }
}

pub fn next_candidate_id(existing: &[Contact]) -> i64 {
    existing.last().map(|contact| contact.id).unwrap_or(0) + 1
}

/// Exact, case-sensitive name lookup.
pub fn find_by_name<'a>(contacts: &'a [Contact], name: &str) -> Option<&'a Contact> {
    contacts.iter().find(|contact| contact.name == name)
}

// json-server 1.x hands out string ids ("3"), older releases use numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Number(i64),
        Text(String),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Number(id) => Ok(id),
        Helper::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("contact id `{}` is not an integer", text))),
    }
}

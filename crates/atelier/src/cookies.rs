//! Session cookie jar.
//!
//! Holds the `name=value` pairs the server set on earlier responses, in the
//! order they were first seen. A cookie whose name is already stored replaces
//! the stored entry in place; it never creates a second entry.

use crate::CookieName;

/// In-memory store of session cookies, one entry per cookie name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: Vec<String>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the raw `Set-Cookie` header values of one response.
    ///
    /// Only the leading `name=value` pair of each value is kept; attributes
    /// such as `Path` or `HttpOnly` are dropped. Values without a name are
    /// ignored.
    pub fn update<I, S>(&mut self, set_cookies: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in set_cookies {
            let pair = raw.as_ref().split(';').next().unwrap_or_default().trim();
            let Some(name) = cookie_name(pair) else {
                continue;
            };

            match self.position(&name) {
                Some(index) => self.entries[index] = pair.to_string(),
                None => self.entries.push(pair.to_string()),
            }
        }
    }

    /// Returns the stored `name=value` entries in insertion order.
    pub fn read(&self) -> &[String] {
        &self.entries
    }

    /// Returns the value of the outgoing `Cookie` header, or `None` when the
    /// jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.join("; "))
        }
    }

    /// Returns the stored value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = CookieName::new(name)?;
        self.position(&name)
            .and_then(|index| self.entries[index].split_once('='))
            .map(|(_, value)| value)
    }

    /// Number of stored cookies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no cookie has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &CookieName) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| cookie_name(entry).as_ref() == Some(name))
    }
}

/// Extracts the name of a `name=value` pair (the text before the first `=`).
fn cookie_name(pair: &str) -> Option<CookieName> {
    let name = pair.split('=').next().unwrap_or_default().trim();
    CookieName::new(name)
}

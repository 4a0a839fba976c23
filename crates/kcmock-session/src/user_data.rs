//! Derivation of user identity attributes from a username.

/// Identity attributes derived from a username.
///
/// A username containing `@` is treated as an email address: the local part
/// becomes the preferred username and the address itself the email. Any other
/// username is kept as-is and an email is fabricated from it and the server
/// hostname. Given and family name are guessed by splitting the preferred
/// username on `.`, `_` and spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    subject: String,
    preferred_username: String,
    given_name: Option<String>,
    family_name: String,
    email: String,
}

impl UserData {
    /// Derives identity attributes from a username and the hostname tokens
    /// are issued for.
    #[must_use]
    pub fn from_username_and_hostname(username: &str, hostname: &str) -> Self {
        let (preferred_username, email) = match username.find('@') {
            Some(index) if index > 0 => {
                (username[..index].to_string(), username.replace(' ', "+"))
            }
            _ => (
                username.to_string(),
                format!("{}@{hostname}", username.replace(' ', "+")),
            ),
        };
        let (given_name, family_name) = extract_name(&preferred_username);
        Self {
            subject: username.to_string(),
            preferred_username,
            given_name,
            family_name,
            email,
        }
    }

    /// The original username.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The preferred username.
    #[must_use]
    pub fn preferred_username(&self) -> &str {
        &self.preferred_username
    }

    /// The guessed given name, absent when the username has a single part.
    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.given_name.as_deref()
    }

    /// The guessed family name.
    #[must_use]
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// The email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The full name, assembled from given and family name.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.given_name {
            Some(given) => format!("{given} {}", self.family_name),
            None => self.family_name.clone(),
        }
    }
}

/// Splits a preferred username into given and family name parts.
///
/// All parts but the last form the given name; a single part is treated as a
/// family name only. An input without any usable parts is kept verbatim as
/// the family name.
fn extract_name(input: &str) -> (Option<String>, String) {
    let names: Vec<String> = input
        .split(['.', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect();
    match names.as_slice() {
        [] => (None, input.to_string()),
        [family] => (None, family.clone()),
        [given @ .., family] => (Some(given.join(" ")), family.clone()),
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

//! Pre-flight checks on user input. Nothing here touches the network.

use std::fmt::Display;

use email_address::EmailAddress;

const MIN_DISPLAY_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    DisplayName,
    Email,
    Password,
    Text,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DisplayName => "Display name",
            Self::Email => "Email",
            Self::Password => "Password",
            Self::Text => "Text",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    Required,
    TooShort(usize),
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    pub field: Field,
    pub reason: Reason,
}

impl Error {
    const fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }

    /// Inline text shown under the offending input.
    pub fn message(&self) -> String {
        match (self.field, self.reason) {
            (Field::Email, Reason::Malformed) => "Please enter a valid email".into(),
            (field, Reason::Required) => format!("{field} is required"),
            (field, Reason::TooShort(min)) => format!("{field} must be at least {min} characters"),
            (field, Reason::Malformed) => format!("{field} is not valid"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for Error {}

/// Returns the trimmed display name.
pub fn display_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::new(Field::DisplayName, Reason::Required));
    }
    if name.chars().count() < MIN_DISPLAY_NAME_LEN {
        return Err(Error::new(
            Field::DisplayName,
            Reason::TooShort(MIN_DISPLAY_NAME_LEN),
        ));
    }
    Ok(name)
}

/// Returns the trimmed email.
pub fn email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::new(Field::Email, Reason::Required));
    }

    // domain must contain a dot
    let well_formed = email
        .parse::<EmailAddress>()
        .is_ok_and(|e| e.domain().contains('.'));
    if !well_formed {
        return Err(Error::new(Field::Email, Reason::Malformed));
    }
    Ok(email)
}

/// Password typed at sign-in: only presence is checked.
pub fn password(password: &str) -> Result<&str> {
    if password.is_empty() {
        return Err(Error::new(Field::Password, Reason::Required));
    }
    Ok(password)
}

/// Password chosen at sign-up.
pub fn new_password(password: &str) -> Result<&str> {
    let password = self::password(password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::new(Field::Password, Reason::TooShort(MIN_PASSWORD_LEN)));
    }
    Ok(password)
}

/// Message or comment body; returns it trimmed.
pub fn text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::new(Field::Text, Reason::Required));
    }
    Ok(text)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_trim_display_name() {
        assert_eq!(display_name("  Jo  "), Ok("Jo"));
    }

    #[test]
    fn should_reject_short_display_name() {
        let err = display_name(" J ").unwrap_err();

        assert_eq!(err.reason, Reason::TooShort(2));
        assert_eq!(err.message(), "Display name must be at least 2 characters");
    }

    #[test]
    fn should_require_email() {
        assert_eq!(email("   ").unwrap_err().message(), "Email is required");
    }

    #[test]
    fn should_reject_malformed_email() {
        for bad in ["jora", "jora@", "jora@localhost", "@x.com"] {
            assert_eq!(
                email(bad).unwrap_err(),
                Error::new(Field::Email, Reason::Malformed),
                "{bad}"
            );
        }
        assert_eq!(email(" a@x.com "), Ok("a@x.com"));
    }

    #[test]
    fn should_require_six_char_password_on_sign_up() {
        assert_eq!(password("abc"), Ok("abc"));
        assert_eq!(
            new_password("abc").unwrap_err().message(),
            "Password must be at least 6 characters"
        );
        assert_eq!(new_password("").unwrap_err().reason, Reason::Required);
    }

    #[test]
    fn should_reject_blank_text() {
        assert_eq!(text(" \n ").unwrap_err().field, Field::Text);
        assert_eq!(text(" hi "), Ok("hi"));
    }
}

//! Signup form state, independent of any UI toolkit.
//!
//! A frontend feeds keystrokes and focus changes into [`SignupForm`] and
//! renders from its fields; the server re-checks the same
//! [`PasswordRequirements`] when the request arrives.

use serde::{Deserialize, Serialize};

use crate::SignupRequest;

/// Minimum password length, counted in Unicode scalar values. Characters
/// outside the BMP (e.g. emoji) count once, not as two UTF-16 units.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Characters that satisfy the special-character requirement.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// A single password rule shown under the password field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRequirement {
    CharacterLength,
    UppercaseCharacter,
    SpecialCharacter,
}

impl PasswordRequirement {
    pub const ALL: [PasswordRequirement; 3] = [
        Self::CharacterLength,
        Self::UppercaseCharacter,
        Self::SpecialCharacter,
    ];

    /// User-facing description of the rule.
    pub fn message(&self) -> &'static str {
        match self {
            Self::CharacterLength => "Needs to be at least 8 characters",
            Self::UppercaseCharacter => "Needs to have one upper-case character",
            Self::SpecialCharacter => "Needs to have one special character - e.g. !@#$%",
        }
    }
}

/// Which password rules the current password satisfies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PasswordRequirements {
    pub special_character: bool,
    pub character_length: bool,
    pub uppercase_character: bool,
}

impl PasswordRequirements {
    pub fn check(password: &str) -> Self {
        Self {
            special_character: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            character_length: password.chars().count() >= MIN_PASSWORD_LEN,
            uppercase_character: password.chars().any(|c| c.is_ascii_uppercase()),
        }
    }

    pub fn is_met(&self) -> bool {
        self.unmet().is_empty()
    }

    pub fn satisfies(&self, requirement: PasswordRequirement) -> bool {
        match requirement {
            PasswordRequirement::CharacterLength => self.character_length,
            PasswordRequirement::UppercaseCharacter => self.uppercase_character,
            PasswordRequirement::SpecialCharacter => self.special_character,
        }
    }

    /// Unmet rules, in display order.
    pub fn unmet(&self) -> Vec<PasswordRequirement> {
        PasswordRequirement::ALL
            .into_iter()
            .filter(|r| !self.satisfies(*r))
            .collect()
    }
}

/// Why [`SignupForm::submit`] refused to produce a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignupFormError {
    #[error("signup already submitted")]
    AlreadySubmitted,
    #[error("username is required")]
    MissingUsername,
    #[error("display name is required")]
    MissingDisplayName,
    #[error("password does not meet the requirements")]
    InvalidPassword,
}

/// State of the signup page.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub error: Option<String>,
    pub submitted: bool,
    pub successful_signup: bool,
    pub show_password_requirements: bool,
    pub password_requirements: PasswordRequirements,
    /// `None` until the password field is first edited.
    pub valid_password: Option<bool>,
}

impl SignupForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    /// Record a password edit and re-evaluate every requirement.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
        self.password_requirements = PasswordRequirements::check(&self.password);
        self.valid_password = Some(self.password_requirements.is_met());
    }

    /// The requirement list is only visible while the password field has focus.
    pub fn focus_password(&mut self, focused: bool) {
        self.show_password_requirements = focused;
    }

    pub fn can_submit(&self) -> bool {
        self.check_submittable().is_ok()
    }

    fn check_submittable(&self) -> Result<(), SignupFormError> {
        if self.submitted {
            return Err(SignupFormError::AlreadySubmitted);
        }
        if self.valid_password != Some(true) {
            return Err(SignupFormError::InvalidPassword);
        }
        if self.display_name.is_empty() {
            return Err(SignupFormError::MissingDisplayName);
        }
        if self.username.is_empty() {
            return Err(SignupFormError::MissingUsername);
        }
        Ok(())
    }

    /// Produce the request body and lock the form until the server answers.
    pub fn submit(&mut self) -> Result<SignupRequest, SignupFormError> {
        self.check_submittable()?;
        self.submitted = true;
        self.error = None;
        Ok(SignupRequest {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            password: self.password.clone(),
            device_name: None,
        })
    }

    /// The server rejected the signup: show the error and allow a retry.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.submitted = false;
    }

    pub fn succeed(&mut self) {
        self.successful_signup = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_track_each_rule() {
        let r = PasswordRequirements::check("abc");
        assert!(!r.character_length && !r.uppercase_character && !r.special_character);

        let r = PasswordRequirements::check("abcdefgh");
        assert!(r.character_length);
        assert_eq!(
            r.unmet(),
            vec![
                PasswordRequirement::UppercaseCharacter,
                PasswordRequirement::SpecialCharacter
            ]
        );

        let r = PasswordRequirements::check("Abcdefg!");
        assert!(r.is_met());
    }

    #[test]
    fn special_characters_match_the_form() {
        for c in ['!', '@', '#', '$', '%', '^', '[', ']', '\\', '/', '?', '"', '\''] {
            let pw = format!("Abcdefgh{c}");
            assert!(
                PasswordRequirements::check(&pw).special_character,
                "{c} should count as special"
            );
        }
        assert!(!PasswordRequirements::check("Abcdefgh~").special_character);
        assert!(!PasswordRequirements::check("Abcdefgh ").special_character);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(!PasswordRequirements::check("Ää!ää").character_length);
        assert!(PasswordRequirements::check("Ää!äääää").character_length);
        // Four emoji are eight UTF-16 units but only seven characters here.
        assert!(!PasswordRequirements::check("A!😀😀😀😀a").character_length);
    }

    #[test]
    fn valid_password_is_unset_until_first_edit() {
        let mut form = SignupForm::new();
        assert_eq!(form.valid_password, None);
        form.set_password("short");
        assert_eq!(form.valid_password, Some(false));
        form.set_password("LongEnough!");
        assert_eq!(form.valid_password, Some(true));
        form.set_password("longenough!");
        assert_eq!(form.valid_password, Some(false));
        assert!(!form.password_requirements.uppercase_character);
    }

    #[test]
    fn submit_requires_every_field() {
        let mut form = SignupForm::new();
        assert_eq!(form.submit(), Err(SignupFormError::InvalidPassword));

        form.set_password("Secret!pw");
        assert_eq!(form.submit(), Err(SignupFormError::MissingDisplayName));

        form.set_display_name("Alice");
        assert_eq!(form.submit(), Err(SignupFormError::MissingUsername));

        form.set_username("alice");
        assert!(form.can_submit());
        let req = form.submit().unwrap();
        assert_eq!(req.username, "alice");
        assert_eq!(req.display_name, "Alice");
        assert_eq!(req.password, "Secret!pw");

        assert!(form.submitted);
        assert_eq!(form.submit(), Err(SignupFormError::AlreadySubmitted));
    }

    #[test]
    fn failure_reenables_submit() {
        let mut form = SignupForm::new();
        form.set_username("alice");
        form.set_display_name("Alice");
        form.set_password("Secret!pw");
        form.submit().unwrap();

        form.fail("username already taken");
        assert_eq!(form.error.as_deref(), Some("username already taken"));
        assert!(form.can_submit());

        form.submit().unwrap();
        assert_eq!(form.error, None);
        form.succeed();
        assert!(form.successful_signup);
    }

    #[test]
    fn focus_toggles_requirement_visibility() {
        let mut form = SignupForm::new();
        form.focus_password(true);
        assert!(form.show_password_requirements);
        form.focus_password(false);
        assert!(!form.show_password_requirements);
    }
}

use crate::models::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    #[default]
    Email,
    Password,
}

/// Input state of the login and signup screens.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub field: AuthField,
}

impl AuthForm {
    fn current_mut(&mut self) -> &mut String {
        match self.field {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub fn push(&mut self, c: char) {
        self.current_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.current_mut().pop();
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        };
    }

    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }

    /// Credentials to submit, or `None` while either field is blank.
    pub fn credentials(&self) -> Option<Credentials> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return None;
        }
        Some(Credentials {
            email: email.to_string(),
            password: self.password.clone(),
        })
    }

    pub fn clear(&mut self) {
        *self = AuthForm::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typing_goes_to_focused_field() {
        let mut form = AuthForm::default();
        "me@x.io".chars().for_each(|c| form.push(c));
        form.next_field();
        "pw!".chars().for_each(|c| form.push(c));
        form.backspace();

        assert_eq!(form.email, "me@x.io");
        assert_eq!(form.password, "pw");
        assert_eq!(form.masked_password(), "**");
    }

    #[test]
    fn blank_fields_yield_no_credentials() {
        let mut form = AuthForm::default();
        form.email = "  ".into();
        form.password = "pw".into();
        assert!(form.credentials().is_none());

        form.email = " me@x.io ".into();
        let creds = form.credentials().unwrap();
        assert_eq!(creds.email, "me@x.io");

        form.clear();
        assert_eq!(form.field, AuthField::Email);
        assert!(form.password.is_empty());
    }
}

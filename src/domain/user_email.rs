use validator::validate_email;

#[derive(Debug, Clone, serde::Serialize)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(email: String) -> Result<UserEmail, String> {
        if !validate_email(&email) {
            return Err(format!("{} email is not valid", email));
        }

        Ok(Self(email))
    }
}

impl AsRef<str> for UserEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

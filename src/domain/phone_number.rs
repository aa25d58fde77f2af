const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// A phone number in E.164 form, e.g. `+6281234567890`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(phone: String) -> Result<PhoneNumber, String> {
        let digits = match phone.strip_prefix('+') {
            Some(digits) => digits,
            None => return Err(format!("{} must start with '+'", phone)),
        };
        let has_valid_length = (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len());
        let only_digits = digits.chars().all(|c| c.is_ascii_digit());

        if !has_valid_length || !only_digits || digits.starts_with('0') {
            return Err(format!("{} is not a valid E.164 phone number", phone));
        }

        Ok(Self(phone))
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

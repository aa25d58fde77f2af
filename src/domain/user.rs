use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::phone_number::PhoneNumber;
use crate::domain::user_email::UserEmail;
use crate::domain::user_name::UserName;

/// A user as stored in the directory. The pipeline never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub birthday: NaiveDate,
    pub joined_minute_at: i32,
    pub verified_status: bool,
    pub phone: String,
}

/// A validated user ready to be inserted into the directory.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: UserName,
    pub email: UserEmail,
    pub birthday: NaiveDate,
    pub joined_minute_at: JoinedMinute,
    pub verified_status: bool,
    pub phone: PhoneNumber,
}

/// Minute of the hour (0..=59) the user joined at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct JoinedMinute(i32);

impl JoinedMinute {
    pub fn parse(minute: i32) -> Result<JoinedMinute, String> {
        if !(0..60).contains(&minute) {
            return Err(format!("{} is not a valid minute of the hour", minute));
        }

        Ok(Self(minute))
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::user::User;

/// Messaging channels a notification can be requested on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Whatsapp,
    Sms,
    Email,
}

impl NotificationChannel {
    /// The user's contact address on this channel.
    pub fn recipient(&self, user: &User) -> String {
        match self {
            Self::Whatsapp | Self::Sms => user.phone.clone(),
            Self::Email => user.email.clone(),
        }
    }
}

impl AsRef<str> for NotificationChannel {
    fn as_ref(&self) -> &str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

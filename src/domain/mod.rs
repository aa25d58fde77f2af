pub mod notification_channel;
pub mod phone_number;
pub mod promo_code;
pub mod user;
pub mod user_email;
pub mod user_name;

pub use notification_channel::NotificationChannel;
pub use phone_number::PhoneNumber;
pub use promo_code::{NewPromoCode, PromoCode, PromoWindow};
pub use user::{JoinedMinute, NewUser, User};
pub use user_email::UserEmail;
pub use user_name::UserName;

use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::db::member::NewMember;

use super::admin::MIN_PASSWORD_LENGTH;

/// Raw member credentials, received on registration or login. Never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct MemberCredentials {
    pub username: String,
    pub password: String,
    /// Optional display name; defaults to the username.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TryFrom<MemberCredentials> for NewMember {
    type Error = ();

    /// Convert [`MemberCredentials`] to a new [`NewMember`] by hashing the
    /// password, with the same validation rules as admins.
    fn try_from(cred: MemberCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(());
        }

        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default()).unwrap(); // Safe because the default `Config` is valid.
        Ok(Self {
            display_name: cred.display_name.unwrap_or_else(|| cred.username.clone()),
            username: cred.username,
            password_hash,
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl MemberCredentials {
        pub fn example1() -> Self {
            Self {
                username: "sam-chess".into(),
                password: "knightstale".into(),
                display_name: Some("Sam".into()),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "jo-keeper".into(),
                password: "cleansheets".into(),
                display_name: Some("Jo".into()),
            }
        }
    }
}

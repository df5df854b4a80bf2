use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::db::{admin::Admin, member::Member};
use crate::model::mongodb::Id;

/// A user type that can authenticate against the backend.
pub trait User {
    /// The rights this user type holds.
    const RIGHTS: Rights;

    /// The user's unique ID.
    fn id(&self) -> Id;
}

/// Access rights of an authenticated user.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Member = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Member => "member",
                Self::Admin => "admin",
            }
        )
    }
}

impl User for Member {
    const RIGHTS: Rights = Rights::Member;

    fn id(&self) -> Id {
        self.id
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }
}

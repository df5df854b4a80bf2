use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The recipient of a notification.
///
/// Stored as an explicit tagged variant rather than a runtime-typed foreign
/// key, so the recipient kind is always known without inspecting other
/// collections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum Notifiable {
    Member(Id),
    Admin(Id),
    Club(Id),
}

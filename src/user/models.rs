use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Database model for the users table.
///
/// Account management is out of scope for the pipeline; users appear here
/// so winner records and notifications can carry names and addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModel {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

use std::fmt;

use thiserror::Error;

use crate::{
    EMAIL_OFFSET, EMAIL_SIZE, ID_OFFSET, ID_SIZE, ROW_SIZE, USERNAME_OFFSET, USERNAME_SIZE,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("{field} is {len} bytes long, at most {max} allowed")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("id {0} does not fit in a row key")]
    IdTooLarge(u32),
}

/// A single fixed-width record.
///
/// On disk the id is stored as `id + 1` so that a zero key always marks a
/// slot that was never written. `id` here is the value the user typed.
#[derive(Clone, PartialEq, Eq)]
pub struct Row {
    id: u32,
    username: [u8; USERNAME_SIZE],
    email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Largest id that can be stored without the key wrapping to the sentinel.
    pub const MAX_ID: u32 = u32::MAX - 1;

    pub fn new(id: u32, username: &str, email: &str) -> Result<Self, RowError> {
        if id > Self::MAX_ID {
            return Err(RowError::IdTooLarge(id));
        }
        Ok(Self {
            id,
            username: fixed_bytes("username", username)?,
            email: fixed_bytes("email", email)?,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Username bytes up to the first zero byte.
    pub fn username(&self) -> &[u8] {
        until_nul(&self.username)
    }

    pub fn email(&self) -> &[u8] {
        until_nul(&self.email)
    }

    /// Writes the row into a `ROW_SIZE` slot: key, username, email.
    pub fn serialize(&self, slot: &mut [u8]) {
        let key = self.id + 1;
        slot[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&key.to_le_bytes());
        slot[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        slot[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
    }

    /// Reads a row back out of a slot. Any byte pattern is accepted.
    pub fn deserialize(slot: &[u8]) -> Self {
        let mut username = [0u8; USERNAME_SIZE];
        let mut email = [0u8; EMAIL_SIZE];
        username.copy_from_slice(&slot[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        email.copy_from_slice(&slot[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Self {
            id: stored_key(slot).wrapping_sub(1),
            username,
            email,
        }
    }
}

/// Raw key of a serialized slot; zero means the slot was never written.
pub fn stored_key(slot: &[u8]) -> u32 {
    let mut key = [0u8; ID_SIZE];
    key.copy_from_slice(&slot[ID_OFFSET..ID_OFFSET + ID_SIZE]);
    u32::from_le_bytes(key)
}

pub fn is_empty_slot(slot: &[u8]) -> bool {
    debug_assert_eq!(slot.len(), ROW_SIZE);
    stored_key(slot) == 0
}

fn fixed_bytes<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], RowError> {
    let bytes = value.as_bytes();
    if bytes.len() > N {
        return Err(RowError::StringTooLong {
            field,
            len: bytes.len(),
            max: N,
        });
    }
    let mut buffer = [0u8; N];
    buffer[..bytes.len()].copy_from_slice(bytes);
    Ok(buffer)
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..len]
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.id,
            String::from_utf8_lossy(self.username()),
            String::from_utf8_lossy(self.email())
        )
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.id)
            .field("username", &String::from_utf8_lossy(self.username()))
            .field("email", &String::from_utf8_lossy(self.email()))
            .finish()
    }
}

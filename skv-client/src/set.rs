//! # Set Operations

use crate::client::StoreClient;
use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

impl StoreClient {
    /// Adds members to a set. Returns how many were not already present.
    pub fn add_members<M: AsRef<str>>(&self, key: &str, members: &[M]) -> ClientResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut args: Vec<&[u8]> = Vec::with_capacity(members.len() + 2);
        args.push(b"SADD");
        args.push(key.as_bytes());
        args.extend(members.iter().map(|member| member.as_ref().as_bytes()));
        match self.call(&args)? {
            RespValue::Integer(added) => Ok(added.max(0) as u64),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Lists every member; a missing key is an empty set.
    pub fn list_members(&self, key: &str) -> ClientResult<Vec<String>> {
        self.call(&[b"SMEMBERS", key.as_bytes()])?
            .into_array()?
            .into_iter()
            .map(RespValue::into_string)
            .collect()
    }

    /// Removes one member. Returns true when it was present.
    pub fn remove_member(&self, key: &str, member: &str) -> ClientResult<bool> {
        match self.call(&[b"SREM", key.as_bytes(), member.as_bytes()])? {
            RespValue::Integer(removed) => Ok(removed > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

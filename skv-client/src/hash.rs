//! # Hash Operations
//!
//! Field-mapped values stored under one key. Field names are UTF-8 strings;
//! field values are raw bytes.

use std::collections::HashMap;

use crate::client::StoreClient;
use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

impl StoreClient {
    /// Writes every `(field, value)` pair. Returns how many fields were new.
    ///
    /// Re-setting an existing field overwrites it and is not an error.
    pub fn set_fields<F, V>(&self, key: &str, fields: &[(F, V)]) -> ClientResult<u64>
    where
        F: AsRef<str>,
        V: AsRef<[u8]>,
    {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut args: Vec<&[u8]> = Vec::with_capacity(fields.len() * 2 + 2);
        args.push(b"HSET");
        args.push(key.as_bytes());
        for (field, value) in fields {
            args.push(field.as_ref().as_bytes());
            args.push(value.as_ref());
        }
        match self.call(&args)? {
            RespValue::Integer(added) => Ok(added.max(0) as u64),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Reads one field. A missing key or field is `ClientError::NotFound`.
    pub fn get_field(&self, key: &str, field: &str) -> ClientResult<Vec<u8>> {
        match self.call(&[b"HGET", key.as_bytes(), field.as_bytes()])? {
            RespValue::Bulk(Some(data)) => Ok(data),
            RespValue::Bulk(None) => Err(ClientError::NotFound),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Reads the whole hash; a missing key yields an empty map.
    pub fn get_all_fields(&self, key: &str) -> ClientResult<HashMap<String, Vec<u8>>> {
        let items = self.call(&[b"HGETALL", key.as_bytes()])?.into_array()?;
        if items.len() % 2 != 0 {
            return Err(ClientError::UnexpectedResponse);
        }
        let mut fields = HashMap::with_capacity(items.len() / 2);
        let mut items = items.into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            fields.insert(field.into_string()?, value.into_bytes()?);
        }
        Ok(fields)
    }

    /// Returns true when the field is present.
    pub fn field_exists(&self, key: &str, field: &str) -> ClientResult<bool> {
        match self.call(&[b"HEXISTS", key.as_bytes(), field.as_bytes()])? {
            RespValue::Integer(value) => Ok(value == 1),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Reads several fields at once; `None` marks absent fields.
    pub fn get_fields(&self, key: &str, fields: &[&str]) -> ClientResult<Vec<Option<Vec<u8>>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut args: Vec<&[u8]> = Vec::with_capacity(fields.len() + 2);
        args.push(b"HMGET");
        args.push(key.as_bytes());
        args.extend(fields.iter().map(|field| field.as_bytes()));

        let items = self.call(&args)?.into_array()?;
        if items.len() != fields.len() {
            return Err(ClientError::UnexpectedResponse);
        }
        items
            .into_iter()
            .map(|item| match item {
                RespValue::Bulk(data) => Ok(data),
                _ => Err(ClientError::UnexpectedResponse),
            })
            .collect()
    }

    /// Lists the field names of a hash.
    pub fn list_field_names(&self, key: &str) -> ClientResult<Vec<String>> {
        self.call(&[b"HKEYS", key.as_bytes()])?
            .into_array()?
            .into_iter()
            .map(RespValue::into_string)
            .collect()
    }
}

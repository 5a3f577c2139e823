use std::{
    collections::{hash_map::Entry, HashMap},
    str::FromStr,
};

use serde_json::Value;

use super::error::Error;

pub type FormData = HashMap<String, Value>;

/// Query-string parameters. A key given more than once holds an array.
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_query(query: &str) -> Self {
        let mut inner = FormData::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Value::String(value.into_owned());
            match inner.entry(key.into_owned()) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(mut entry) => match entry.get_mut() {
                    Value::Array(values) => values.push(value),
                    existing => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, value]);
                    }
                },
            }
        }

        Self { inner }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(v) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| Error::field(key, "A valid integer is required")),
            None => Ok(None),
        }
    }

    /// First value given for `key`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.inner.get(key)? {
            Value::Array(values) => values.first().and_then(Value::as_str).map(str::to_string),
            value => value.as_str().map(str::to_string),
        }
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(value) => value.as_str().map(str::to_string).into_iter().collect(),
            None => vec![],
        }
    }

    pub fn get_flag(&self, key: &str) -> bool {
        matches!(
            self.get_str(key).as_deref().map(str::trim),
            Some("1") | Some("true") | Some("True")
        )
    }
}

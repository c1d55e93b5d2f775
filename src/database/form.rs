use std::str::FromStr;

use crate::error::ValidationError;

/// Raw query-string pairs, in request order. Keys may repeat.
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &'static str) -> Result<Option<T>, ValidationError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => value
                .parse()
                .map(Some)
                .map_err(|_e| ValidationError::new(key, "A valid integer is required.")),
            _ => Ok(None),
        }
    }

    /// `1` and `true` switch a filter on; anything else, or a missing key, does not.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(self.get_str(key), Some("1") | Some("true"))
    }
}

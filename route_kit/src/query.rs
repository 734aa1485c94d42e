use crate::error::{Error, Result};

/// Ordered multimap of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    pairs: Vec<(String, String)>,
}

impl QueryValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Result<Self> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|e| Error::decode(format!("invalid query string: {e}")))?;
        Ok(QueryValues { pairs })
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn extend<I, K, V>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in iter {
            self.push(k, v);
        }
    }

    /// First value under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// `(subkey, first value)` for every key of the form `name[subkey]`, in
    /// first-seen order.
    pub fn bracketed(&self, name: &str) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::new();
        for (key, value) in &self.pairs {
            let Some(sub) = key
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('['))
                .and_then(|rest| rest.strip_suffix(']'))
            else {
                continue;
            };
            if !out.iter().any(|(seen, _)| *seen == sub) {
                out.push((sub, value.as_str()));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_keep_order() {
        let q = QueryValues::parse("tag=a&limit=10&tag=b").unwrap();
        assert_eq!(q.get_all("tag"), ["a", "b"]);
        assert_eq!(q.first("limit"), Some("10"));
        assert_eq!(q.first("missing"), None);
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let q = QueryValues::parse("name=hello%20world&f%5Bx%5D=1").unwrap();
        assert_eq!(q.first("name"), Some("hello world"));
        assert_eq!(q.bracketed("f"), [("x", "1")]);
    }

    #[test]
    fn bracketed_keys_take_first_value() {
        let q = QueryValues::parse("attrs[color]=red&attrs[size]=xl&attrs[color]=blue&attrsx=1")
            .unwrap();
        assert_eq!(q.bracketed("attrs"), [("color", "red"), ("size", "xl")]);
    }
}

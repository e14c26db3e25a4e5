use url::form_urlencoded;

/// Decoded request parameters from the query string and form body.
///
/// Query parameters come first, so a name present in both resolves to the
/// query value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    pairs: Vec<(String, String)>,
}

impl RequestParameters {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut parameters = Self::default();

        if let Some(query) = query {
            parameters.extend_urlencoded(query.as_bytes());
        }

        parameters
    }

    /// Appends the pairs of an `application/x-www-form-urlencoded` payload.
    pub fn extend_urlencoded(&mut self, input: &[u8]) {
        self.pairs.extend(
            form_urlencoded::parse(input).map(|(name, value)| (name.into_owned(), value.into_owned())),
        );
    }

    /// First value for the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_query() {
        let parameters = RequestParameters::from_query(Some("impersonate=alice%20smith&access_token=abc+def"));

        assert_eq!(parameters.get("impersonate"), Some("alice smith"));
        assert_eq!(parameters.get("access_token"), Some("abc def"));
        assert_eq!(parameters.get("missing"), None);
    }

    #[test]
    fn query_wins_over_form() {
        let mut parameters = RequestParameters::from_query(Some("impersonate=alice"));
        parameters.extend_urlencoded(b"impersonate=carol&access_token=token");

        assert_eq!(parameters.get("impersonate"), Some("alice"));
        assert_eq!(parameters.get("access_token"), Some("token"));
    }

    #[test]
    fn empty_value_is_present() {
        let parameters = RequestParameters::from_query(Some("impersonate="));

        assert_eq!(parameters.get("impersonate"), Some(""));
    }

    #[test]
    fn no_query() {
        assert!(RequestParameters::from_query(None).is_empty());
    }
}

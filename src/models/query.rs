/// Query parameters understood by the relay endpoint.
///
/// Every `url` occurrence is kept so that duplicates can be rejected instead of
/// silently picking one of them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelayQuery {
    pub urls: Vec<String>,
    pub code: Option<String>,
}

impl RelayQuery {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = RelayQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "url" => query.urls.push(value),
                // First occurrence wins
                "code" if query.code.is_none() => query.code = Some(value),
                _ => {}
            }
        }
        query
    }

    /// Access code to forward into rewritten URLs, if a non-empty one was supplied.
    pub fn access_code(&self) -> Option<&str> {
        self.code.as_deref().filter(|code| !code.is_empty())
    }
}

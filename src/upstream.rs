use url::Url;

/// the fixed anime api the json endpoints forward to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    base: Url,
}

impl Upstream {
    pub fn new(mut base: Url) -> Self {
        // endpoint names are appended straight onto the base path
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Self { base }
    }

    /// newest releases, one page at a time.
    pub fn latest(&self, page: &str) -> Url {
        self.endpoint("new", Some(("page", page)))
    }

    pub fn episodes(&self, title: &str) -> Url {
        self.endpoint("episodes", Some(("title", title)))
    }

    pub fn search(&self, title: &str) -> Url {
        self.endpoint("search", Some(("q", title)))
    }

    pub fn trending(&self) -> Url {
        self.endpoint("trending", None)
    }

    fn endpoint(&self, path: &str, param: Option<(&str, &str)>) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{path}", self.base.path()));
        url.set_query(None);

        if let Some((key, value)) = param {
            url.set_query(Some(&format!("{key}={}", urlencoding::encode(value))));
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> Upstream {
        Upstream::new(Url::parse("https://animeapi.skin").unwrap())
    }

    #[test]
    fn titles_are_percent_encoded() {
        assert_eq!(
            upstream().episodes("One Piece").as_str(),
            "https://animeapi.skin/episodes?title=One%20Piece"
        );
        assert_eq!(
            upstream().search("Re:Zero & friends").as_str(),
            "https://animeapi.skin/search?q=Re%3AZero%20%26%20friends"
        );
    }

    #[test]
    fn templating_is_deterministic() {
        let upstream = upstream();
        assert_eq!(upstream.episodes("One Piece"), upstream.episodes("One Piece"));
    }

    #[test]
    fn page_cannot_smuggle_parameters() {
        assert_eq!(
            upstream().latest("2&limit=999").as_str(),
            "https://animeapi.skin/new?page=2%26limit%3D999"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let upstream = Upstream::new(Url::parse("http://127.0.0.1:9000/v1").unwrap());
        assert_eq!(upstream.trending().as_str(), "http://127.0.0.1:9000/v1/trending");
        assert_eq!(
            upstream.search("x").as_str(),
            "http://127.0.0.1:9000/v1/search?q=x"
        );
    }
}

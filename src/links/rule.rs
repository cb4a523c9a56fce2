use crate::config::PathRuleKind;
use url::Url;

/// Decides whether a candidate URL looks like a page worth following
///
/// Rules are a per-deployment heuristic. The extractor applies one after a
/// candidate has been resolved to an absolute http(s) URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathRule {
    /// At least five path segments, the second one a four-digit year
    /// (`/section/2024/jan/05/title`)
    #[default]
    DatedArticle,

    /// Same host as the page the link was found on
    SameHost,

    /// Every candidate passes
    Any,
}

impl PathRule {
    /// Checks a candidate against this rule
    ///
    /// # Examples
    ///
    /// ```
    /// use depth_ripple::links::PathRule;
    /// use url::Url;
    ///
    /// let article = Url::parse("https://www.theguardian.com/world/2024/jan/05/story").unwrap();
    /// let section = Url::parse("https://www.theguardian.com/world").unwrap();
    ///
    /// assert!(PathRule::DatedArticle.matches(&article, None));
    /// assert!(!PathRule::DatedArticle.matches(&section, None));
    /// assert!(PathRule::Any.matches(&section, None));
    /// ```
    pub fn matches(&self, candidate: &Url, base: Option<&Url>) -> bool {
        match self {
            PathRule::DatedArticle => is_dated_article(candidate),
            PathRule::SameHost => match (base, candidate.host_str()) {
                (Some(base), Some(host)) => base.host_str() == Some(host),
                _ => false,
            },
            PathRule::Any => true,
        }
    }
}

impl From<PathRuleKind> for PathRule {
    fn from(kind: PathRuleKind) -> Self {
        match kind {
            PathRuleKind::DatedArticle => PathRule::DatedArticle,
            PathRuleKind::SameHost => PathRule::SameHost,
            PathRuleKind::Any => PathRule::Any,
        }
    }
}

fn is_dated_article(url: &Url) -> bool {
    let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();

    segments.len() >= 5
        && segments[1].len() == 4
        && segments[1].chars().all(|c| c.is_ascii_digit())
}

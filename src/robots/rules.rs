//! Rule table and matching for parsed robots.txt content

use crate::robots::parser::normalize_space;
use crate::Error;
use std::collections::HashMap;

/// Wildcard user-agent token that applies to every robot
pub const WILDCARD_AGENT: &str = "*";

/// Directive name to values, in order of appearance
pub type Directives = HashMap<String, Vec<String>>;

/// Parsed robots.txt content
///
/// Maps lowercase user-agent tokens to their directives. Every declared agent
/// has an entry, even when it carries no directives. An empty rule set
/// allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    agents: HashMap<String, Directives>,
    sitemaps: Vec<String>,
}

impl RuleSet {
    /// Creates an empty rule set (allow all)
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no user-agent sections were declared
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Returns the directives declared for an agent token
    pub fn agent(&self, agent: &str) -> Option<&Directives> {
        self.agents.get(agent)
    }

    /// Iterates over the declared agent tokens
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Returns the values of one directive for one agent token
    pub fn directive(&self, agent: &str, name: &str) -> Option<&[String]> {
        self.agents
            .get(agent)
            .and_then(|directives| directives.get(name))
            .map(Vec::as_slice)
    }

    /// Sitemap URLs listed anywhere in the file
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    pub(crate) fn declare_agent(&mut self, agent: &str) {
        self.agents.entry(agent.to_string()).or_default();
    }

    pub(crate) fn push_directive(&mut self, agent: &str, name: String, value: String) {
        self.agents
            .entry(agent.to_string())
            .or_default()
            .entry(name)
            .or_default()
            .push(value);
    }

    pub(crate) fn push_sitemap(&mut self, url: String) {
        self.sitemaps.push(url);
    }

    /// Checks a request path against the disallow rules
    ///
    /// Both the wildcard section and the section for the normalized agent are
    /// consulted; a case-sensitive prefix match in either disallows. Empty
    /// `Disallow:` values never match.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        for key in lookup_keys(user_agent) {
            let Some(disallowed) = self.directive(&key, "disallow") else {
                continue;
            };

            if disallowed
                .iter()
                .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
            {
                return false;
            }
        }
        true
    }

    /// Returns the crawl-delay in milliseconds for a user agent
    ///
    /// When both the wildcard and the specific section carry a crawl-delay,
    /// the specific one wins. Absent or non-integer values yield 0; more than
    /// one value is rejected with [`Error::AmbiguousCrawlDelay`].
    pub fn crawl_delay(&self, user_agent: &str) -> Result<u64, Error> {
        let mut found: Option<&[String]> = None;
        for key in lookup_keys(user_agent) {
            if let Some(values) = self.directive(&key, "crawl-delay") {
                found = Some(values);
            }
        }

        match found {
            None | Some([]) => Ok(0),
            Some([value]) => match value.parse::<u64>() {
                Ok(delay) => Ok(delay),
                Err(_) => {
                    tracing::warn!(
                        user_agent = %user_agent,
                        value = %value,
                        "Ignoring crawl-delay that is not an integer"
                    );
                    Ok(0)
                }
            },
            Some(values) => Err(Error::AmbiguousCrawlDelay {
                user_agent: normalize_user_agent(user_agent),
                values: values.to_vec(),
            }),
        }
    }
}

/// Reduces a User-Agent header value to the token robots.txt sections use
///
/// Keeps the product name only: everything from the first `(` and from the
/// first `/` is dropped, whitespace is normalized and the result lowercased.
///
/// ```
/// use mannerly::normalize_user_agent;
///
/// assert_eq!(normalize_user_agent("CustomBot/7.9 (+http://x)"), "custombot");
/// assert_eq!(normalize_user_agent("*"), "*");
/// ```
pub fn normalize_user_agent(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let product = lowered
        .split('(')
        .find(|part| !part.trim().is_empty())
        .unwrap_or("");
    let product = normalize_space(product);
    product
        .split('/')
        .find(|part| !part.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// The section keys consulted for a user agent: wildcard first, then specific
fn lookup_keys(user_agent: &str) -> Vec<String> {
    let agent = normalize_user_agent(user_agent);
    if agent.is_empty() || agent == WILDCARD_AGENT {
        vec![WILDCARD_AGENT.to_string()]
    } else {
        vec![WILDCARD_AGENT.to_string(), agent]
    }
}

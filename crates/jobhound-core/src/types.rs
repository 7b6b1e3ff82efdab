//! Shared types used across the crawl pipeline.
//!
//! This module defines the search criteria the caller hands in, the transient
//! card summary gathered before leaving the results view, and the validated
//! job record that is the pipeline's only output.

use crate::config::SearchConfig;
use crate::error::{JobhoundError, Result};
use crate::facets::{self, FacetKind, UNKNOWN_CITY};
use crate::obfuscation;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Immutable description of one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    query: String,
    city_code: String,
    city_label: String,
    salary: Option<String>,
    experience: Option<String>,
    degree: Option<String>,
    scroll_count: u32,
    tag_exclusions: Option<HashSet<String>>,
    company_blacklist: Option<HashSet<String>>,
}

impl SearchCriteria {
    /// Create criteria for a keyword and a city.
    ///
    /// `city` may be a city code or a known city name; names are normalised
    /// to their code. An unknown code is kept as-is and its label becomes
    /// [`UNKNOWN_CITY`].
    ///
    /// # Errors
    /// Returns error if `city` is blank.
    pub fn new(query: impl Into<String>, city: impl Into<String>) -> Result<Self> {
        let city = city.into();
        let city = city.trim();
        if city.is_empty() {
            return Err(JobhoundError::Validation(
                "search city must not be empty".to_string(),
            ));
        }

        let (city_code, city_label) = if let Some(label) = facets::city_label(city) {
            (city.to_string(), label.to_string())
        } else if let Some(code) = facets::city_code(city) {
            (code.to_string(), city.to_string())
        } else {
            tracing::warn!("Unknown city code '{}', city filter will expect '{}'", city, UNKNOWN_CITY);
            (city.to_string(), UNKNOWN_CITY.to_string())
        };

        Ok(Self {
            query: query.into().trim().to_string(),
            city_code,
            city_label,
            salary: None,
            experience: None,
            degree: None,
            scroll_count: 8,
            tag_exclusions: None,
            company_blacklist: None,
        })
    }

    /// Set the salary facet code. Blank codes are ignored.
    #[must_use]
    pub fn with_salary(mut self, code: impl Into<String>) -> Self {
        self.salary = non_blank(code.into());
        self
    }

    /// Set the experience facet code. Blank codes are ignored.
    #[must_use]
    pub fn with_experience(mut self, code: impl Into<String>) -> Self {
        self.experience = non_blank(code.into());
        self
    }

    /// Set the degree facet code. Blank codes are ignored.
    #[must_use]
    pub fn with_degree(mut self, code: impl Into<String>) -> Self {
        self.degree = non_blank(code.into());
        self
    }

    /// Set how many infinite-scroll iterations to perform.
    #[must_use]
    pub fn with_scroll_count(mut self, count: u32) -> Self {
        self.scroll_count = count;
        self
    }

    /// Skip cards whose tag label is one of `tags`. An empty set disables the stage.
    #[must_use]
    pub fn with_tag_exclusions<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = tags.into_iter().map(Into::into).collect();
        self.tag_exclusions = (!set.is_empty()).then_some(set);
        self
    }

    /// Never emit postings of these companies. An empty set disables the stage.
    #[must_use]
    pub fn with_company_blacklist<I, S>(mut self, companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = companies.into_iter().map(Into::into).collect();
        self.company_blacklist = (!set.is_empty()).then_some(set);
        self
    }

    /// Search keyword (trimmed).
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whitespace separated keyword tokens.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.query.split_whitespace()
    }

    /// City code sent to the site.
    #[must_use]
    pub fn city_code(&self) -> &str {
        &self.city_code
    }

    /// Human-readable city name every emitted record must match.
    #[must_use]
    pub fn city_label(&self) -> &str {
        &self.city_label
    }

    /// Facet code for `kind`, if configured.
    #[must_use]
    pub fn facet(&self, kind: FacetKind) -> Option<&str> {
        match kind {
            FacetKind::Salary => self.salary.as_deref(),
            FacetKind::Experience => self.experience.as_deref(),
            FacetKind::Degree => self.degree.as_deref(),
        }
    }

    /// Present facets in URL order.
    pub fn facets(&self) -> impl Iterator<Item = (FacetKind, &str)> {
        [FacetKind::Salary, FacetKind::Experience, FacetKind::Degree]
            .into_iter()
            .filter_map(|kind| self.facet(kind).map(|code| (kind, code)))
    }

    /// Number of pagination scrolls.
    #[must_use]
    pub fn scroll_count(&self) -> u32 {
        self.scroll_count
    }

    /// Tag labels to skip, if any.
    #[must_use]
    pub fn tag_exclusions(&self) -> Option<&HashSet<String>> {
        self.tag_exclusions.as_ref()
    }

    /// Blacklisted company names, if any.
    #[must_use]
    pub fn company_blacklist(&self) -> Option<&HashSet<String>> {
        self.company_blacklist.as_ref()
    }
}

impl TryFrom<&SearchConfig> for SearchCriteria {
    type Error = JobhoundError;

    fn try_from(config: &SearchConfig) -> Result<Self> {
        let mut criteria = Self::new(config.query.clone(), config.city.clone())?
            .with_scroll_count(config.scroll_count)
            .with_tag_exclusions(config.tag_exclusions.iter().cloned())
            .with_company_blacklist(config.company_blacklist.iter().cloned());
        if let Some(code) = &config.salary {
            criteria = criteria.with_salary(code.clone());
        }
        if let Some(code) = &config.experience {
            criteria = criteria.with_experience(code.clone());
        }
        if let Some(code) = &config.degree {
            criteria = criteria.with_degree(code.clone());
        }
        Ok(criteria)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Card-level data read before navigating into the detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSummary {
    /// Company name shown on the card
    pub company: String,
    /// Link to the detail page as found on the card
    pub href: Option<String>,
    /// Label of the card's tag icon, when one is shown
    pub tag: Option<String>,
    /// First location token shown on the card
    pub location_hint: Option<String>,
}

/// Raw field values collected for one listing, before validation.
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    /// Company name
    pub company: String,
    /// Job title
    pub title: String,
    /// Salary text as rendered, possibly obfuscated
    pub salary: String,
    /// Experience requirement
    pub experience: String,
    /// Free-text description
    pub description: String,
    /// Link to the detail page, absolute or site-relative
    pub href: Option<String>,
    /// Resolved city
    pub city: String,
}

/// A validated job posting.
///
/// The salary never contains obfuscated digits and the URL is either absolute
/// or empty; both are enforced by [`JobRecord::from_draft`], the only way to
/// build one. Records serialize for output but never deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    company: String,
    title: String,
    salary: String,
    experience: String,
    #[serde(rename = "desc")]
    description: String,
    url: String,
    city: String,
}

impl JobRecord {
    /// Build a record from collected fields, decoding the salary and
    /// resolving the link against `base_url`.
    #[must_use]
    pub fn from_draft(draft: JobDraft, base_url: &str) -> Self {
        Self {
            company: draft.company.trim().to_string(),
            title: draft.title.trim().to_string(),
            salary: obfuscation::decode(draft.salary.trim()),
            experience: draft.experience,
            description: draft.description.trim().to_string(),
            url: absolutize_url(base_url, draft.href.as_deref()),
            city: draft.city,
        }
    }

    /// Company name.
    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Job title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Decoded salary text.
    #[must_use]
    pub fn salary(&self) -> &str {
        &self.salary
    }

    /// Experience requirement.
    #[must_use]
    pub fn experience(&self) -> &str {
        &self.experience
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Absolute detail URL, or empty.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolved city.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Render the record as tagged text, one element per field.
    #[must_use]
    pub fn tagged_text(&self) -> String {
        format!(
            "<company>{}</company>\n<title>{}</title>\n<salary>{}</salary>\n<experience>{}</experience>\n<city>{}</city>\n<description>\n{}\n</description>",
            self.company, self.title, self.salary, self.experience, self.city, self.description
        )
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({}, {})", self.title, self.company, self.salary, self.city)
    }
}

/// Resolve a detail link against the site origin.
///
/// Absolute links are kept, site-relative links are prefixed with `base_url`
/// and a missing or blank link yields an empty string.
#[must_use]
pub fn absolutize_url(base_url: &str, href: Option<&str>) -> String {
    let Some(href) = href.map(str::trim).filter(|h| !h.is_empty()) else {
        return String::new();
    };

    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.zhipin.com";

    #[test]
    fn test_criteria_accepts_code_or_name() {
        let by_code = SearchCriteria::new("Python开发", "101010100").expect("valid criteria");
        assert_eq!(by_code.city_code(), "101010100");
        assert_eq!(by_code.city_label(), "北京");

        let by_name = SearchCriteria::new("Python开发", "北京").expect("valid criteria");
        assert_eq!(by_name.city_code(), "101010100");
        assert_eq!(by_name.city_label(), "北京");
    }

    #[test]
    fn test_criteria_unknown_city() {
        let criteria = SearchCriteria::new("Rust", "123").expect("valid criteria");
        assert_eq!(criteria.city_code(), "123");
        assert_eq!(criteria.city_label(), UNKNOWN_CITY);
    }

    #[test]
    fn test_criteria_rejects_blank_city() {
        assert!(SearchCriteria::new("Rust", "  ").is_err());
    }

    #[test]
    fn test_criteria_optional_sets() {
        let criteria = SearchCriteria::new("Rust", "上海")
            .expect("valid criteria")
            .with_tag_exclusions(Vec::<String>::new())
            .with_company_blacklist(["XCorp"])
            .with_salary("  ");
        assert!(criteria.tag_exclusions().is_none());
        assert!(criteria.company_blacklist().expect("blacklist set").contains("XCorp"));
        assert_eq!(criteria.facet(FacetKind::Salary), None);
    }

    #[test]
    fn test_criteria_from_config() {
        let config = SearchConfig {
            query: " 产品经理 ".to_string(),
            city: "深圳".to_string(),
            experience: Some("107".to_string()),
            scroll_count: 2,
            ..SearchConfig::default()
        };
        let criteria = SearchCriteria::try_from(&config).expect("valid config");
        assert_eq!(criteria.query(), "产品经理");
        assert_eq!(criteria.city_code(), "101280600");
        assert_eq!(criteria.scroll_count(), 2);
        let facets: Vec<_> = criteria.facets().collect();
        assert_eq!(facets, vec![(FacetKind::Experience, "107")]);
    }

    #[test]
    fn test_keywords_split_on_whitespace() {
        let criteria = SearchCriteria::new("rust  backend\tremote", "北京").expect("valid");
        let words: Vec<_> = criteria.keywords().collect();
        assert_eq!(words, vec!["rust", "backend", "remote"]);
    }

    #[test]
    fn test_absolutize_url() {
        assert_eq!(absolutize_url(BASE, Some("/job_detail/abc.html")), "https://www.zhipin.com/job_detail/abc.html");
        assert_eq!(absolutize_url(BASE, Some("https://m.zhipin.com/x")), "https://m.zhipin.com/x");
        assert_eq!(absolutize_url(BASE, Some("//www.zhipin.com/y")), "https://www.zhipin.com/y");
        assert_eq!(absolutize_url(BASE, Some("job/z")), "https://www.zhipin.com/job/z");
        assert_eq!(absolutize_url(BASE, Some("   ")), "");
        assert_eq!(absolutize_url(BASE, None), "");
    }

    #[test]
    fn test_record_from_draft_decodes_salary() {
        let draft = JobDraft {
            company: "Acme".to_string(),
            title: " Rust Engineer ".to_string(),
            salary: "\u{E032}\u{E031}-\u{E034}\u{E031}K".to_string(),
            experience: "3-5年".to_string(),
            description: "Build things".to_string(),
            href: Some("/job_detail/1.html".to_string()),
            city: "北京".to_string(),
        };
        let record = JobRecord::from_draft(draft, BASE);
        assert_eq!(record.salary(), "10-30K");
        assert_eq!(record.title(), "Rust Engineer");
        assert_eq!(record.url(), "https://www.zhipin.com/job_detail/1.html");
    }

    #[test]
    fn test_record_serializes_desc_field() {
        let record = JobRecord::from_draft(
            JobDraft {
                company: "Acme".to_string(),
                description: "text".to_string(),
                ..JobDraft::default()
            },
            BASE,
        );
        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["desc"], "text");
        assert_eq!(json["url"], "");
    }

    #[test]
    fn test_tagged_text() {
        let record = JobRecord::from_draft(
            JobDraft {
                company: "Acme".to_string(),
                title: "Dev".to_string(),
                salary: "10-20K".to_string(),
                experience: "不限".to_string(),
                description: "line".to_string(),
                href: None,
                city: "上海".to_string(),
            },
            BASE,
        );
        let text = record.tagged_text();
        assert!(text.starts_with("<company>Acme</company>\n<title>Dev</title>"));
        assert!(text.contains("<city>上海</city>"));
        assert!(text.ends_with("<description>\nline\n</description>"));
    }
}

//! Listing filters.

use jobhound_core::{JobRecord, ListingSummary, SearchCriteria};
use std::fmt;

/// Character agencies put in place of the real employer's name (`某知名公司`).
pub const AGENCY_MARKER: char = '某';

/// Units of recruiter inactivity that mark a posting as stale.
const STALE_UNITS: &[char] = &['周', '月', '年'];

/// Why a listing was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The card carries an excluded tag
    ExcludedTag(String),
    /// The recruiter was last active weeks, months or years ago
    StaleRecruiter(String),
    /// A query keyword appears in neither title nor description
    MissingKeyword(String),
    /// The job is in another city
    CityMismatch {
        /// City of the search
        expected: String,
        /// City resolved for the job
        found: String,
    },
    /// The company name hides the real employer
    AgencyPosting(String),
    /// The company is on the blacklist
    Blacklisted(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcludedTag(tag) => write!(f, "excluded tag '{tag}'"),
            Self::StaleRecruiter(active) => write!(f, "recruiter last active {active}"),
            Self::MissingKeyword(keyword) => write!(f, "keyword '{keyword}' not found"),
            Self::CityMismatch { expected, found } => {
                write!(f, "city '{found}' is not '{expected}'")
            }
            Self::AgencyPosting(company) => write!(f, "agency posting by '{company}'"),
            Self::Blacklisted(company) => write!(f, "company '{company}' is blacklisted"),
        }
    }
}

/// Outcome of one filter stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep going
    Accept,
    /// Drop the listing
    Reject(Rejection),
}

impl Verdict {
    /// Whether the listing passed.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

type RecordCheck = fn(&SearchCriteria, &JobRecord) -> Option<Rejection>;

/// Record-level stages in the order they run.
const RECORD_CHECKS: &[RecordCheck] = &[keyword_check, city_check, agency_check, blacklist_check];

/// Ordered, short-circuiting listing filters.
///
/// The stages run at different points of the crawl: the tag check on the
/// card, the staleness check once the detail view is open and the rest on the
/// extracted record.
#[derive(Debug, Clone, Copy)]
pub struct FilterChain<'a> {
    criteria: &'a SearchCriteria,
}

impl<'a> FilterChain<'a> {
    /// Filters for `criteria`.
    pub fn new(criteria: &'a SearchCriteria) -> Self {
        Self { criteria }
    }

    /// Tag exclusion, decided from the card alone.
    pub fn check_card(&self, summary: &ListingSummary) -> Verdict {
        match (self.criteria.tag_exclusions(), &summary.tag) {
            (Some(excluded), Some(tag)) if excluded.contains(tag) => {
                Verdict::Reject(Rejection::ExcludedTag(tag.clone()))
            }
            _ => Verdict::Accept,
        }
    }

    /// Recruiter staleness, from the last-active text of the detail view.
    pub fn check_activity(&self, last_active: Option<&str>) -> Verdict {
        match last_active {
            Some(text) if text.contains(STALE_UNITS) => {
                Verdict::Reject(Rejection::StaleRecruiter(text.trim().to_string()))
            }
            _ => Verdict::Accept,
        }
    }

    /// Keyword relevance, city consistency, agency heuristic and blacklist.
    pub fn check_record(&self, record: &JobRecord) -> Verdict {
        RECORD_CHECKS
            .iter()
            .find_map(|check| check(self.criteria, record))
            .map_or(Verdict::Accept, Verdict::Reject)
    }
}

fn keyword_check(criteria: &SearchCriteria, record: &JobRecord) -> Option<Rejection> {
    let title = record.title().to_lowercase();
    let description = record.description().to_lowercase();
    criteria
        .keywords()
        .find(|keyword| {
            let keyword = keyword.to_lowercase();
            !title.contains(&keyword) && !description.contains(&keyword)
        })
        .map(|keyword| Rejection::MissingKeyword(keyword.to_string()))
}

fn city_check(criteria: &SearchCriteria, record: &JobRecord) -> Option<Rejection> {
    (record.city() != criteria.city_label()).then(|| Rejection::CityMismatch {
        expected: criteria.city_label().to_string(),
        found: record.city().to_string(),
    })
}

fn agency_check(_criteria: &SearchCriteria, record: &JobRecord) -> Option<Rejection> {
    record
        .company()
        .contains(AGENCY_MARKER)
        .then(|| Rejection::AgencyPosting(record.company().to_string()))
}

fn blacklist_check(criteria: &SearchCriteria, record: &JobRecord) -> Option<Rejection> {
    criteria
        .company_blacklist()
        .filter(|blacklist| blacklist.contains(record.company()))
        .map(|_| Rejection::Blacklisted(record.company().to_string()))
}

//! Per-card extraction.
//!
//! Field values that the site renders in more than one place are resolved by
//! ordered lists of pure strategy functions over the evidence read from the
//! page. The first strategy that produces a meaningful value wins.

use crate::error::Result;
use jobhound_browser::{BrowserActions, Locator, Pacer};
use jobhound_core::facets::KNOWN_CITIES;
use jobhound_core::{JobDraft, JobRecord, ListingSummary, SearchCriteria, UNKNOWN_CITY};
use once_cell::sync::Lazy;
use regex::Regex;

/// Result card, relative to the results container.
pub const CARD: &str = ".job-card-box";
const CARD_TAG: &str = ".job-tag-icon";
const CARD_COMPANY: &str = ".boss-name";
const CARD_LINK: &str = ".job-name";
const CARD_LOCATIONS: &[&str] = &[
    ".job-area",
    ".job-limit",
    ".job-info .job-area",
    ".job-info .job-limit",
];

/// Detail pane shown next to the list after a card is clicked.
pub const DETAIL: &str = ".job-detail-box";
const DETAIL_TITLE: &str = ".job-name";
const DETAIL_SALARY: &str = ".job-salary";
const DETAIL_DESCRIPTION: &str = ".desc";
const DETAIL_RECRUITER: &str = ".job-boss-info";
const DETAIL_ACTIVITY: &str = ".boss-active-time";
const DETAIL_LOCATIONS: &[&str] = &[
    ".job-location",
    ".job-area",
    ".location",
    ".job-info .location",
    ".info-primary .location",
    ".job-primary .location",
    ".job-header .location",
    ".job-detail-header .location",
];
const INFO_BLOCKS: &[&str] = &[".info-primary", ".job-primary", ".job-header", ".job-detail-header"];

/// Experience text used when nothing more specific is found.
pub const DEFAULT_EXPERIENCE: &str = "不限";

static INFO_EXPERIENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+[-~]\d+年|\d+年以上|不限|应届|实习)")
        .expect("experience regex is hardcoded and valid")
});

static DESCRIPTION_EXPERIENCE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d+[-~]\d+年工作经验",
        r"\d+年以上工作经验",
        r"应届毕业生",
        r"\d+[-~]\d+年经验",
        r"\d+年以上经验",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("experience regex is hardcoded and valid"))
    .collect()
});

/// First token of a location text, splitting on whitespace and `·`.
///
/// `"北京·朝阳区 望京"` yields `"北京"`.
pub fn location_token(text: &str) -> Option<String> {
    text.trim()
        .split(|c: char| c.is_whitespace() || c == '·')
        .find(|t| !t.is_empty())
        .map(ToString::to_string)
}

/// Everything read from the page that says where a job is.
#[derive(Debug, Clone, Default)]
pub struct CityEvidence<'a> {
    /// Location token from the result card
    pub card_hint: Option<&'a str>,
    /// Location tokens from the detail view, in selector order
    pub detail_locations: &'a [String],
    /// Visible info block texts from the detail view
    pub info_blocks: &'a [String],
    /// City label of the search criteria
    pub default_label: &'a str,
}

impl CityEvidence<'_> {
    fn is_resolved(&self, city: &str) -> bool {
        !city.is_empty() && city != self.default_label && city != UNKNOWN_CITY
    }
}

type CityStrategy = fn(&CityEvidence<'_>) -> Option<String>;

const CITY_STRATEGIES: &[CityStrategy] = &[
    city_from_card_hint,
    city_from_detail_locations,
    city_from_info_text,
];

fn city_from_card_hint(evidence: &CityEvidence<'_>) -> Option<String> {
    evidence
        .card_hint
        .filter(|c| evidence.is_resolved(c))
        .map(ToString::to_string)
}

fn city_from_detail_locations(evidence: &CityEvidence<'_>) -> Option<String> {
    evidence
        .detail_locations
        .iter()
        .find(|c| evidence.is_resolved(c))
        .cloned()
}

// Any known city name in the text counts, even when it is incidental.
fn city_from_info_text(evidence: &CityEvidence<'_>) -> Option<String> {
    evidence
        .info_blocks
        .iter()
        .filter_map(|text| KNOWN_CITIES.iter().find(|city| text.contains(**city)))
        .find(|city| evidence.is_resolved(city))
        .map(|city| (*city).to_string())
}

/// Resolve a job's city, falling back to the criteria's own city.
///
/// A value equal to the default label (or to `未知`) does not count as
/// resolved, so the next strategy is still consulted.
pub fn resolve_city(evidence: &CityEvidence<'_>) -> String {
    CITY_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(evidence))
        .unwrap_or_else(|| evidence.default_label.to_string())
}

type ExperienceStrategy = fn(&[String], &str) -> Option<String>;

const EXPERIENCE_STRATEGIES: &[ExperienceStrategy] =
    &[experience_from_info_blocks, experience_from_description];

fn experience_from_info_blocks(info_blocks: &[String], _description: &str) -> Option<String> {
    info_blocks
        .iter()
        .find_map(|text| INFO_EXPERIENCE.find(text))
        .map(|m| m.as_str().to_string())
}

fn experience_from_description(_info_blocks: &[String], description: &str) -> Option<String> {
    DESCRIPTION_EXPERIENCE
        .iter()
        .find_map(|re| re.find(description))
        .map(|m| m.as_str().to_string())
}

/// Extract the experience requirement, defaulting to `不限`.
pub fn resolve_experience(info_blocks: &[String], description: &str) -> String {
    EXPERIENCE_STRATEGIES
        .iter()
        .filter_map(|strategy| strategy(info_blocks, description))
        .find(|e| e != DEFAULT_EXPERIENCE)
        .unwrap_or_else(|| DEFAULT_EXPERIENCE.to_string())
}

/// Reads cards and detail views into records.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    pacer: Pacer,
    base_url: String,
    element_timeout_ms: u64,
}

impl ListingExtractor {
    /// Create an extractor resolving links against `base_url`.
    pub fn new(pacer: Pacer, base_url: impl Into<String>, element_timeout_ms: u64) -> Self {
        Self {
            pacer,
            base_url: base_url.into(),
            element_timeout_ms,
        }
    }

    /// Read the card fields that are needed before the detail view replaces
    /// the selection.
    pub async fn summarize<D>(&self, driver: &D, card: &Locator) -> Result<ListingSummary>
    where
        D: BrowserActions + ?Sized,
    {
        let company = driver.text(&card.locate(CARD_COMPANY).first()).await?;

        let link = card.locate(CARD_LINK).first();
        let href = if driver.count(&link).await? > 0 {
            driver.attribute(&link, "href").await?
        } else {
            None
        };

        let tag_icon = card.locate(CARD_TAG).first();
        let tag = if driver.is_visible(&tag_icon).await? {
            driver.attribute(&tag_icon, "alt").await?
        } else {
            None
        };

        let mut location_hint = None;
        for selector in CARD_LOCATIONS {
            let Some(text) = driver.visible_text(&card.locate(*selector).first()).await? else {
                continue;
            };
            if let Some(token) = location_token(&text) {
                let known = token != UNKNOWN_CITY;
                location_hint = Some(token);
                if known {
                    break;
                }
            }
        }

        Ok(ListingSummary {
            company: company.trim().to_string(),
            href,
            tag,
            location_hint,
        })
    }

    /// Click the card and wait until its detail view is readable.
    ///
    /// Includes the reading dwell and a stray pointer movement.
    pub async fn open_detail<D>(&self, driver: &D, card: &Locator) -> Result<()>
    where
        D: BrowserActions + ?Sized,
    {
        let pacing = self.pacer.config();
        self.pacer.pause(&pacing.before_click).await;
        driver.click(card, self.pacer.click_delay_ms()).await?;
        self.pacer.pause(&pacing.after_click).await;

        let detail = Locator::css(DETAIL);
        driver
            .wait_visible(&detail.locate(DETAIL_DESCRIPTION).first(), self.element_timeout_ms)
            .await?;
        driver
            .wait_visible(&detail.locate(DETAIL_RECRUITER).first(), self.element_timeout_ms)
            .await?;

        self.pacer.pause(&pacing.detail_dwell).await;
        self.wander(driver).await;
        Ok(())
    }

    async fn wander<D>(&self, driver: &D)
    where
        D: BrowserActions + ?Sized,
    {
        let viewport = match driver.viewport().await {
            Ok(Some(viewport)) => viewport,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("Viewport unavailable: {}", e);
                return;
            }
        };
        let Some((x, y)) = Pacer::wander_point(viewport, 100) else {
            return;
        };
        match driver.move_pointer(x, y).await {
            Ok(()) => self.pacer.pause(&self.pacer.config().pointer_settle).await,
            Err(e) => tracing::debug!("Pointer move failed: {}", e),
        }
    }

    /// Recruiter last-active text of the open detail view, if shown.
    pub async fn recruiter_activity<D>(&self, driver: &D) -> Result<Option<String>>
    where
        D: BrowserActions + ?Sized,
    {
        let activity = Locator::css(DETAIL)
            .locate(DETAIL_RECRUITER)
            .locate(DETAIL_ACTIVITY)
            .first();
        Ok(driver.visible_text(&activity).await?)
    }

    /// Build the record for the open detail view.
    pub async fn extract<D>(
        &self,
        driver: &D,
        summary: &ListingSummary,
        criteria: &SearchCriteria,
    ) -> Result<JobRecord>
    where
        D: BrowserActions + ?Sized,
    {
        let detail = Locator::css(DETAIL);
        let title = driver.text(&detail.locate(DETAIL_TITLE).first()).await?;
        let salary = driver.text(&detail.locate(DETAIL_SALARY).first()).await?;
        let description = driver.text(&detail.locate(DETAIL_DESCRIPTION).first()).await?;

        let mut detail_locations = Vec::new();
        for selector in DETAIL_LOCATIONS {
            if let Some(text) = driver.visible_text(&detail.locate(*selector).first()).await? {
                detail_locations.extend(location_token(&text));
            }
        }

        let mut info_blocks = Vec::new();
        for selector in INFO_BLOCKS {
            if let Some(text) = driver.visible_text(&detail.locate(*selector).first()).await? {
                info_blocks.push(text);
            }
        }

        let city = resolve_city(&CityEvidence {
            card_hint: summary.location_hint.as_deref(),
            detail_locations: &detail_locations,
            info_blocks: &info_blocks,
            default_label: criteria.city_label(),
        });
        let experience = resolve_experience(&info_blocks, &description);

        Ok(JobRecord::from_draft(
            JobDraft {
                company: summary.company.clone(),
                title,
                salary,
                experience,
                description,
                href: summary.href.clone(),
                city,
            },
            &self.base_url,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_location_token() {
        assert_eq!(location_token("北京·朝阳区"), Some("北京".to_string()));
        assert_eq!(location_token("  上海 浦东新区 张江 "), Some("上海".to_string()));
        assert_eq!(location_token("·深圳"), Some("深圳".to_string()));
        assert_eq!(location_token("   "), None);
    }

    #[test]
    fn test_card_hint_wins() {
        let evidence = CityEvidence {
            card_hint: Some("上海"),
            detail_locations: &strings(&["杭州"]),
            info_blocks: &[],
            default_label: "北京",
        };
        assert_eq!(resolve_city(&evidence), "上海");
    }

    #[test]
    fn test_default_hint_consults_detail() {
        let evidence = CityEvidence {
            card_hint: Some("北京"),
            detail_locations: &strings(&["北京", "杭州"]),
            info_blocks: &[],
            default_label: "北京",
        };
        assert_eq!(resolve_city(&evidence), "杭州");
    }

    #[test]
    fn test_info_text_scan() {
        let info = strings(&["3-5年 本科 北京", "广州 天河区"]);
        let evidence = CityEvidence {
            card_hint: Some(UNKNOWN_CITY),
            detail_locations: &[],
            info_blocks: &info,
            default_label: "北京",
        };
        // The first block only names the default city, the second resolves
        assert_eq!(resolve_city(&evidence), "广州");
    }

    #[test]
    fn test_falls_back_to_criteria_city() {
        let evidence = CityEvidence {
            card_hint: Some(UNKNOWN_CITY),
            default_label: "北京",
            ..CityEvidence::default()
        };
        assert_eq!(resolve_city(&evidence), "北京");
        assert_eq!(
            resolve_city(&CityEvidence {
                default_label: "深圳",
                ..CityEvidence::default()
            }),
            "深圳"
        );
    }

    #[test]
    fn test_experience_from_info_block() {
        let info = strings(&["北京 朝阳区", "3-5年 本科"]);
        assert_eq!(resolve_experience(&info, "有5年以上经验优先"), "3-5年");
        assert_eq!(resolve_experience(&strings(&["10年以上 硕士"]), ""), "10年以上");
        assert_eq!(resolve_experience(&strings(&["实习 大专"]), ""), "实习");
    }

    #[test]
    fn test_experience_from_description() {
        assert_eq!(
            resolve_experience(&strings(&["经验不限 本科"]), "要求3~5年工作经验，熟悉 Rust"),
            "3~5年工作经验"
        );
        assert_eq!(resolve_experience(&[], "欢迎应届毕业生"), "应届毕业生");
        assert_eq!(resolve_experience(&[], "两年以上经验"), DEFAULT_EXPERIENCE);
        assert_eq!(resolve_experience(&[], "有2年以上经验"), "2年以上经验");
    }

    #[test]
    fn test_description_pattern_priority() {
        // Earlier patterns win regardless of position in the text
        assert_eq!(
            resolve_experience(&[], "1年以上经验，最好有3-5年工作经验"),
            "3-5年工作经验"
        );
    }
}

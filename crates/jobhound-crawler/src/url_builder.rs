//! Search URL encoding.

use jobhound_core::SearchCriteria;

/// Path of the job search page, relative to the site origin.
pub const SEARCH_PATH: &str = "/web/geek/jobs";

/// Encode the criteria as a search URL.
///
/// Parameters appear in a fixed order (`query`, `city`, then `salary`,
/// `experience` and `degree` when set) and are percent-encoded. Facets that
/// are not set are left out entirely.
pub fn build_search_url(base_url: &str, criteria: &SearchCriteria) -> String {
    let mut params = vec![("query", criteria.query()), ("city", criteria.city_code())];
    params.extend(criteria.facets().map(|(kind, code)| (kind.param(), code)));

    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}{SEARCH_PATH}?{query}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const BASE: &str = "https://www.zhipin.com";

    fn param_names(url: &str) -> Vec<String> {
        Url::parse(url)
            .expect("valid url")
            .query_pairs()
            .map(|(k, _)| k.into_owned())
            .collect()
    }

    #[test]
    fn test_mandatory_fields_only() {
        let criteria = SearchCriteria::new("Python开发", "101010100").expect("valid criteria");
        let url = build_search_url(BASE, &criteria);

        assert_eq!(param_names(&url), vec!["query", "city"]);
        assert!(url.starts_with("https://www.zhipin.com/web/geek/jobs?"));
    }

    #[test]
    fn test_all_facets_in_order() {
        let criteria = SearchCriteria::new("rust", "上海")
            .expect("valid criteria")
            .with_degree("204")
            .with_salary("105")
            .with_experience("104");
        let url = build_search_url(&format!("{BASE}/"), &criteria);

        assert_eq!(
            url,
            "https://www.zhipin.com/web/geek/jobs?query=rust&city=101020100&salary=105&experience=104&degree=204"
        );
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let criteria = SearchCriteria::new("数据 分析", "101010100").expect("valid criteria");
        let url = build_search_url(BASE, &criteria);

        assert!(url.contains("query=%E6%95%B0%E6%8D%AE%20%E5%88%86%E6%9E%90"));
        let pairs: Vec<_> = Url::parse(&url).expect("valid url").query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("query".to_string(), "数据 分析".to_string()));
    }
}

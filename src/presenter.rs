use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::models::{non_empty, CandidateRecord, ResultBundle};

const ALL: &str = "All";

/// Three-way hiring filter. `UnknownOrOther` is the exact complement of
/// `Hiring`, absent statuses included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HiringFilter {
    #[default]
    All,
    Hiring,
    UnknownOrOther,
}

impl HiringFilter {
    pub fn next(self) -> Self {
        match self {
            HiringFilter::All => HiringFilter::Hiring,
            HiringFilter::Hiring => HiringFilter::UnknownOrOther,
            HiringFilter::UnknownOrOther => HiringFilter::All,
        }
    }

    fn accepts(self, record: &CandidateRecord) -> bool {
        match self {
            HiringFilter::All => true,
            HiringFilter::Hiring => record.is_hiring(),
            HiringFilter::UnknownOrOther => !record.is_hiring(),
        }
    }
}

impl FromStr for HiringFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(HiringFilter::All),
            "hiring" => Ok(HiringFilter::Hiring),
            "other" | "unknown" | "unknown/other" => Ok(HiringFilter::UnknownOrOther),
            _ => Err(anyhow!(
                "Unknown hiring filter '{}'. Use: all, hiring, other",
                s
            )),
        }
    }
}

impl fmt::Display for HiringFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HiringFilter::All => "All",
            HiringFilter::Hiring => "Hiring",
            HiringFilter::UnknownOrOther => "Unknown/Other",
        };
        write!(f, "{}", label)
    }
}

/// Exact-match filter on one categorical field. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter(Option<String>);

impl CategoryFilter {
    pub fn all() -> Self {
        Self(None)
    }

    /// "All" (any case) or a blank value disables the filter.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
            Self::all()
        } else {
            Self(Some(value.to_string()))
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn accepts(&self, value: Option<&str>) -> bool {
        match &self.0 {
            None => true,
            Some(wanted) => value.map(str::trim) == Some(wanted.as_str()),
        }
    }

    /// Steps through All, then each choice in order, then back to All.
    pub fn cycle(&self, choices: &[String]) -> Self {
        let next = match &self.0 {
            None => choices.first(),
            Some(current) => choices
                .iter()
                .position(|c| c == current)
                .and_then(|i| choices.get(i + 1)),
        };
        Self(next.cloned())
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selected().unwrap_or(ALL))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub text: String,
    pub country: CategoryFilter,
    pub institution: CategoryFilter,
    pub hiring: HiringFilter,
}

impl Filters {
    pub fn is_default(&self) -> bool {
        *self == Filters::default()
    }

    fn accepts(&self, record: &CandidateRecord) -> bool {
        self.matches_text(record)
            && self.country.accepts(record.country.as_deref())
            && self.institution.accepts(Some(record.university.as_str()))
            && self.hiring.accepts(record)
    }

    fn matches_text(&self, record: &CandidateRecord) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        record.name.to_lowercase().contains(&needle)
            || record
                .department
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Holds the current result bundle and the active filters. The bundle is
/// only ever replaced, never edited.
#[derive(Debug, Default)]
pub struct ResultPresenter {
    bundle: ResultBundle,
    filters: Filters,
    countries: Vec<String>,
    institutions: Vec<String>,
}

impl ResultPresenter {
    pub fn new(bundle: ResultBundle) -> Self {
        let mut presenter = Self::default();
        presenter.replace_bundle(bundle);
        presenter
    }

    /// Swaps in a new search result. Filters reset, choice lists are rebuilt.
    pub fn replace_bundle(&mut self, bundle: ResultBundle) {
        self.countries = distinct_sorted(bundle.candidates.iter().map(|c| non_empty(&c.country)));
        self.institutions =
            distinct_sorted(bundle.candidates.iter().map(|c| Some(c.university.as_str())));
        self.bundle = bundle;
        self.filters = Filters::default();
        tracing::trace!(
            countries = self.countries.len(),
            institutions = self.institutions.len(),
            "recomputed filter choices"
        );
    }

    /// Drops the current result, e.g. while a new search is in flight.
    pub fn clear(&mut self) {
        self.replace_bundle(ResultBundle::default());
    }

    pub fn bundle(&self) -> &ResultBundle {
        &self.bundle
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
    }

    pub fn filters_mut(&mut self) -> &mut Filters {
        &mut self.filters
    }

    pub fn reset_filters(&mut self) {
        self.filters = Filters::default();
    }

    pub fn filtered_view(&self) -> Vec<&CandidateRecord> {
        self.bundle
            .candidates
            .iter()
            .filter(|record| self.filters.accepts(record))
            .collect()
    }

    pub fn available_countries(&self) -> &[String] {
        &self.countries
    }

    pub fn available_institutions(&self) -> &[String] {
        &self.institutions
    }
}

fn distinct_sorted<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_record;

    fn record(name: &str, university: &str, country: Option<&str>, hiring: Option<&str>) -> CandidateRecord {
        let mut r = sample_record(name, university);
        r.country = country.map(String::from);
        r.hiring_status = hiring.map(String::from);
        r
    }

    fn bundle() -> ResultBundle {
        let mut chen = record("B. Chen", "MIT", Some("USA"), Some("Likely Hiring"));
        chen.department = Some("Robotics Lab".to_string());
        let mut lee = record("A. Lee", "UBC", Some("Canada"), Some("Hiring"));
        lee.department = Some("Computer Science".to_string());

        ResultBundle::new(
            vec![
                chen,
                lee,
                record("C. Diaz", "Toronto", Some("Canada"), Some("Unknown")),
                record("D. Evans", "MIT", Some("USA"), None),
                record("E. Fox", "ETH", None, Some("Not Hiring")),
            ],
            Vec::new(),
        )
    }

    fn names(view: Vec<&CandidateRecord>) -> Vec<&str> {
        view.into_iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_default_filters_return_everything_in_order() {
        let presenter = ResultPresenter::new(bundle());
        assert!(presenter.filters().is_default());
        assert_eq!(
            names(presenter.filtered_view()),
            vec!["B. Chen", "A. Lee", "C. Diaz", "D. Evans", "E. Fox"]
        );
    }

    #[test]
    fn test_hiring_filter_and_complement() {
        let mut presenter = ResultPresenter::new(bundle());

        presenter.filters_mut().hiring = HiringFilter::Hiring;
        assert_eq!(
            names(presenter.filtered_view()),
            vec!["B. Chen", "A. Lee", "E. Fox"]
        );

        presenter.filters_mut().hiring = HiringFilter::UnknownOrOther;
        assert_eq!(names(presenter.filtered_view()), vec!["C. Diaz", "D. Evans"]);
    }

    #[test]
    fn test_text_filter_matches_name_or_department() {
        let mut presenter = ResultPresenter::new(bundle());

        presenter.filters_mut().text = "ROBOT".to_string();
        assert_eq!(names(presenter.filtered_view()), vec!["B. Chen"]);

        presenter.filters_mut().text = "lee".to_string();
        assert_eq!(names(presenter.filtered_view()), vec!["A. Lee"]);

        presenter.filters_mut().text = "   ".to_string();
        assert_eq!(presenter.filtered_view().len(), 5);
    }

    #[test]
    fn test_category_filters_combine_with_and() {
        let mut presenter = ResultPresenter::new(bundle());

        presenter.filters_mut().country = CategoryFilter::parse("Canada");
        assert_eq!(names(presenter.filtered_view()), vec!["A. Lee", "C. Diaz"]);

        presenter.filters_mut().institution = CategoryFilter::parse("UBC");
        assert_eq!(names(presenter.filtered_view()), vec!["A. Lee"]);

        presenter.filters_mut().hiring = HiringFilter::UnknownOrOther;
        assert!(presenter.filtered_view().is_empty());

        presenter.filters_mut().country = CategoryFilter::parse("All");
        presenter.filters_mut().institution = CategoryFilter::parse("MIT");
        assert_eq!(names(presenter.filtered_view()), vec!["D. Evans"]);
    }

    #[test]
    fn test_filtering_leaves_bundle_untouched() {
        let mut presenter = ResultPresenter::new(bundle());
        presenter.filters_mut().country = CategoryFilter::parse("USA");
        let _ = presenter.filtered_view();
        assert_eq!(presenter.bundle().candidates.len(), 5);
        assert_eq!(presenter.bundle(), &bundle());
    }

    #[test]
    fn test_available_choices_are_distinct_and_sorted() {
        let presenter = ResultPresenter::new(bundle());
        assert_eq!(presenter.available_countries(), &["Canada", "USA"]);
        assert_eq!(presenter.available_institutions(), &["ETH", "MIT", "Toronto", "UBC"]);
    }

    #[test]
    fn test_replace_bundle_recomputes_choices_and_resets_filters() {
        let mut presenter = ResultPresenter::new(bundle());
        presenter.filters_mut().country = CategoryFilter::parse("USA");

        presenter.replace_bundle(ResultBundle::new(
            vec![record("F. Gao", "NUS", Some("Singapore"), None)],
            Vec::new(),
        ));
        assert!(presenter.filters().is_default());
        assert_eq!(presenter.available_countries(), &["Singapore"]);
        assert_eq!(presenter.available_institutions(), &["NUS"]);

        presenter.clear();
        assert!(presenter.filtered_view().is_empty());
        assert!(presenter.available_countries().is_empty());
    }

    #[test]
    fn test_category_filter_cycle() {
        let choices = vec!["Canada".to_string(), "USA".to_string()];
        let all = CategoryFilter::all();
        let canada = all.cycle(&choices);
        assert_eq!(canada.selected(), Some("Canada"));
        let usa = canada.cycle(&choices);
        assert_eq!(usa.selected(), Some("USA"));
        assert_eq!(usa.cycle(&choices), CategoryFilter::all());
        assert_eq!(all.cycle(&[]), CategoryFilter::all());
    }

    #[test]
    fn test_hiring_filter_parse_and_cycle() {
        assert_eq!("hiring".parse::<HiringFilter>().unwrap(), HiringFilter::Hiring);
        assert_eq!("Other".parse::<HiringFilter>().unwrap(), HiringFilter::UnknownOrOther);
        assert_eq!("ALL".parse::<HiringFilter>().unwrap(), HiringFilter::All);
        assert!("maybe".parse::<HiringFilter>().is_err());

        assert_eq!(HiringFilter::All.next(), HiringFilter::Hiring);
        assert_eq!(HiringFilter::UnknownOrOther.next(), HiringFilter::All);
        assert_eq!(HiringFilter::UnknownOrOther.to_string(), "Unknown/Other");
    }
}

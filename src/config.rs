use crate::area::{classify, AdminLevel, AreaHierarchy, AreaInfo};
use crate::constants::*;
use crate::errors::{AppError, AppResult};
use crate::fetcher::RetryPolicy;
use crate::logging::{log, LogLevel};
use clap::ValueEnum;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProvinceLevel {
    /// Province file embeds city boundaries; city files are fetched.
    #[value(name = "city")]
    IncludeCityBoundaries,
    /// Province file embeds sub-boundaries; city and county files are fetched.
    #[value(name = "county")]
    IncludeCountyBoundaries,
    /// Province outline only.
    #[value(name = "none")]
    NoSubBoundaries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CityLevel {
    /// City file embeds county boundaries; county files are fetched.
    #[value(name = "county")]
    IncludeCountyBoundaries,
    /// City outline only.
    #[value(name = "none")]
    NoSubBoundaries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingMode {
    #[value(name = "code")]
    ByCode,
    #[value(name = "name")]
    ByChineseName,
}

#[derive(Debug, Clone)]
pub struct GranularityConfig {
    pub province_level: ProvinceLevel,
    pub city_level: CityLevel,
    pub municipality_children_go_to_city_bucket: bool,
    /// Empty means every province, in source order.
    pub selected_provinces: Vec<String>,
    pub naming_mode: NamingMode,
}

impl Default for GranularityConfig {
    fn default() -> Self {
        Self {
            province_level: ProvinceLevel::IncludeCityBoundaries,
            city_level: CityLevel::IncludeCountyBoundaries,
            municipality_children_go_to_city_bucket: false,
            selected_provinces: Vec::new(),
            naming_mode: NamingMode::ByCode,
        }
    }
}

impl GranularityConfig {
    pub fn fetches_cities(&self) -> bool {
        self.province_level != ProvinceLevel::NoSubBoundaries
    }

    pub fn fetches_counties(&self) -> bool {
        self.province_level == ProvinceLevel::IncludeCountyBoundaries
            || (self.fetches_cities() && self.city_level == CityLevel::IncludeCountyBoundaries)
    }

    pub fn province_wants_detailed(&self) -> bool {
        self.fetches_cities()
    }

    pub fn city_wants_detailed(&self) -> bool {
        self.city_level == CityLevel::IncludeCountyBoundaries
    }

    /// Rejects a selection that cannot name any province, before any
    /// network activity.
    pub fn validate(&self) -> AppResult<()> {
        if self.selected_provinces.is_empty() {
            return Ok(());
        }
        let any_province = self
            .selected_provinces
            .iter()
            .any(|c| classify(c.trim()) == Some(AdminLevel::Province));
        if any_province {
            Ok(())
        } else {
            Err(AppError::Configuration(format!(
                "no province codes in selection: {}",
                self.selected_provinces.join(", ")
            )))
        }
    }

    /// Resolves the province subset against the hierarchy.
    ///
    /// Unknown and duplicate codes are dropped with a warning; an empty
    /// result is a configuration error since nothing could be downloaded.
    pub fn resolve_provinces<'a>(&self, hierarchy: &'a AreaHierarchy) -> AppResult<Vec<&'a AreaInfo>> {
        let all = hierarchy.provinces();
        if self.selected_provinces.is_empty() {
            if all.is_empty() {
                return Err(AppError::Configuration(
                    "area index contains no provinces".into(),
                ));
            }
            return Ok(all);
        }

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.selected_provinces.len());
        let mut unknown = Vec::new();
        for code in &self.selected_provinces {
            let code = code.trim();
            if !seen.insert(code) {
                continue;
            }
            match all.iter().find(|p| p.code == code) {
                Some(info) => resolved.push(*info),
                None => unknown.push(code.to_string()),
            }
        }

        if !unknown.is_empty() {
            log(
                LogLevel::Warning,
                &format!("Ignoring unknown province codes: {}", unknown.join(", ")),
            );
        }
        if resolved.is_empty() {
            return Err(AppError::Configuration(
                "no valid provinces selected".into(),
            ));
        }
        Ok(resolved)
    }
}

/// Network knobs for the fetch layer.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub retry: RetryPolicy,
    pub post_download_delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            post_download_delay: Duration::from_millis(POST_DOWNLOAD_DELAY_MS),
        }
    }
}

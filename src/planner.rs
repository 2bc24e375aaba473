//! Turns the hierarchy and a granularity configuration into the exact list
//! of downloads, before any network activity.
//!
//! The orchestrator executes these lists verbatim, so the planned count is
//! the number of download attempts a run issues.

use crate::area::{is_municipality, AdminLevel, AreaHierarchy, AreaInfo};
use crate::config::GranularityConfig;
use crate::constants::*;
use crate::layout::{Bucket, OutputLayout};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    /// Base resource code; the detailed variant appends its suffix to it.
    pub code: String,
    pub level: AdminLevel,
    pub local_path: PathBuf,
    pub label: String,
    pub wants_detailed: bool,
    /// `None` for the nation file, which sits at the output root.
    pub bucket: Option<Bucket>,
}

#[derive(Debug, Clone)]
pub struct ProvincePlan {
    pub code: String,
    pub name: String,
    pub tasks: Vec<DownloadTask>,
}

impl ProvincePlan {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub nation: DownloadTask,
    pub provinces: Vec<ProvincePlan>,
}

impl DownloadPlan {
    /// Nation task plus every province's tasks.
    pub fn total_task_count(&self) -> usize {
        1 + self.provinces.iter().map(ProvincePlan::task_count).sum::<usize>()
    }
}

/// Where a county-tier file goes for the given province.
pub fn county_bucket(province_code: &str, config: &GranularityConfig) -> Bucket {
    if is_municipality(province_code) && config.municipality_children_go_to_city_bucket {
        Bucket::City
    } else {
        Bucket::County
    }
}

pub fn plan(
    hierarchy: &AreaHierarchy,
    provinces: &[&AreaInfo],
    config: &GranularityConfig,
    layout: &OutputLayout,
) -> DownloadPlan {
    DownloadPlan {
        nation: nation_task(hierarchy, layout),
        provinces: provinces
            .iter()
            .map(|p| plan_province(hierarchy, p, config, layout))
            .collect(),
    }
}

fn nation_task(hierarchy: &AreaHierarchy, layout: &OutputLayout) -> DownloadTask {
    let label = hierarchy
        .nation()
        .map(|n| n.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| NATION_LABEL.to_string());
    DownloadTask {
        code: NATION_CODE.to_string(),
        level: AdminLevel::Nation,
        local_path: layout.nation_path(),
        label,
        wants_detailed: false,
        bucket: None,
    }
}

pub fn plan_province(
    hierarchy: &AreaHierarchy,
    province: &AreaInfo,
    config: &GranularityConfig,
    layout: &OutputLayout,
) -> ProvincePlan {
    let mut tasks = Vec::new();

    let wants = config.province_wants_detailed();
    tasks.push(DownloadTask {
        code: province.code.clone(),
        level: AdminLevel::Province,
        local_path: layout.path_for(Bucket::Province, province, wants),
        label: format!("province {}", province.name),
        wants_detailed: wants,
        bucket: Some(Bucket::Province),
    });

    if config.fetches_cities() {
        let wants = config.city_wants_detailed();
        for city in hierarchy.cities(&province.code) {
            tasks.push(DownloadTask {
                code: city.code.clone(),
                level: AdminLevel::City,
                local_path: layout.path_for(Bucket::City, city, wants),
                label: format!("city {}", city.name),
                wants_detailed: wants,
                bucket: Some(Bucket::City),
            });
        }
    }

    if config.fetches_counties() {
        let bucket = county_bucket(&province.code, config);
        for county in hierarchy.counties(&province.code) {
            tasks.push(DownloadTask {
                code: county.code.clone(),
                level: AdminLevel::County,
                local_path: layout.path_for(bucket, county, false),
                label: format!("county {}", county.name),
                wants_detailed: false,
                bucket: Some(bucket),
            });
        }
    }

    ProvincePlan {
        code: province.code.clone(),
        name: province.name.clone(),
        tasks,
    }
}

//! Parent/child relationships derived purely from administrative codes.
//!
//! A code is six digits: the first two name the province, a trailing `"0000"`
//! marks a province, a trailing `"00"` marks a city, anything else is a
//! county. `"100000"` is the nation.

use crate::constants::*;
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdminLevel {
    Nation,
    Province,
    City,
    County,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaInfo {
    pub code: String,
    pub name: String,
    /// Fields the source carries that this crate only passes through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawAreaInfo {
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Classifies a well-formed code; `None` for anything that is not six digits.
pub fn classify(code: &str) -> Option<AdminLevel> {
    if !CODE_RE.is_match(code) {
        return None;
    }
    Some(if code == NATION_CODE {
        AdminLevel::Nation
    } else if code.ends_with("0000") {
        AdminLevel::Province
    } else if code.ends_with("00") {
        AdminLevel::City
    } else {
        AdminLevel::County
    })
}

/// Leading two digits; the whole input when it is shorter or not ASCII there.
pub fn province_prefix(code: &str) -> &str {
    code.get(..PROVINCE_PREFIX_LEN).unwrap_or(code)
}

pub fn is_municipality(province_code: &str) -> bool {
    MUNICIPALITY_CODES.contains(province_code)
}

/// Read-only view over the area index.
///
/// Keys are kept in a `BTreeMap`; for fixed-width numeric codes the string
/// order equals numeric order, which is the order the source index lists them.
#[derive(Debug, Clone, Default)]
pub struct AreaHierarchy {
    infos: BTreeMap<String, AreaInfo>,
    skipped: Vec<String>,
}

impl AreaHierarchy {
    /// Builds the hierarchy from the raw `code -> info` JSON object.
    /// Malformed codes are kept out of the hierarchy and reported by [`skipped`](Self::skipped).
    pub fn from_value(raw: Value) -> AppResult<Self> {
        let raw: BTreeMap<String, RawAreaInfo> = serde_json::from_value(raw)?;
        Ok(Self::from_entries(
            raw.into_iter().map(|(code, r)| AreaInfo {
                code,
                name: r.name,
                extra: r.extra,
            }),
        ))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = AreaInfo>,
    {
        let mut infos = BTreeMap::new();
        let mut skipped = Vec::new();
        for info in entries {
            if classify(&info.code).is_some() {
                infos.insert(info.code.clone(), info);
            } else {
                skipped.push(info.code);
            }
        }
        Self { infos, skipped }
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Codes dropped for not being six digits.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn get(&self, code: &str) -> Option<&AreaInfo> {
        self.infos.get(code)
    }

    pub fn nation(&self) -> Option<&AreaInfo> {
        self.infos.get(NATION_CODE)
    }

    pub fn provinces(&self) -> Vec<&AreaInfo> {
        self.infos
            .values()
            .filter(|i| classify(&i.code) == Some(AdminLevel::Province))
            .collect()
    }

    pub fn cities(&self, province_code: &str) -> Vec<&AreaInfo> {
        self.children(province_code, AdminLevel::City)
    }

    /// Every county sharing the province prefix, across all of its cities.
    pub fn counties(&self, province_code: &str) -> Vec<&AreaInfo> {
        self.children(province_code, AdminLevel::County)
    }

    fn children(&self, province_code: &str, level: AdminLevel) -> Vec<&AreaInfo> {
        let prefix = province_prefix(province_code);
        self.infos
            .range(prefix.to_string()..)
            .take_while(|(code, _)| code.starts_with(prefix))
            .map(|(_, info)| info)
            .filter(|info| info.code != province_code && classify(&info.code) == Some(level))
            .collect()
    }
}

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const BASE_URL: &str = "https://geo.datav.aliyun.com/areas_v3/bound/";
pub const INFO_RESOURCE: &str = "infos.json";
pub const OUT_DIR: &str = "./";

pub const NATION_CODE: &str = "100000";
pub const NATION_FILE_NAME: &str = "china.json";
pub const INFO_FILE_NAME: &str = "info.json";
pub const NATION_LABEL: &str = "全国";

pub const DETAILED_SUFFIX: &str = "_full";
pub const JSON_EXT: &str = "json";

pub const PROVINCE_DIR: &str = "province";
pub const CITY_DIR: &str = "citys";
pub const COUNTY_DIR: &str = "county";

pub const PROVINCE_PREFIX_LEN: usize = 2;

pub const HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const HTTP_CONNECT_TIMEOUT: u64 = 15;
pub const MAX_RETRIES: u32 = 3;
pub const BACKOFF_BASE_MS: u64 = 1000;
pub const POST_DOWNLOAD_DELAY_MS: u64 = 200;

pub const PROGRESS_BAR_WIDTH: usize = 30;

/// Province-tier units that also act as their own city tier.
pub static MUNICIPALITY_CODES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["110000", "120000", "310000", "500000"]));

pub static FORBIDDEN_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).unwrap());
pub static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
pub static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

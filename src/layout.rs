use crate::area::AreaInfo;
use crate::config::NamingMode;
use crate::constants::*;
use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Tier directory a boundary file lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Province,
    City,
    County,
}

impl Bucket {
    pub fn dir_name(self) -> &'static str {
        match self {
            Bucket::Province => PROVINCE_DIR,
            Bucket::City => CITY_DIR,
            Bucket::County => COUNTY_DIR,
        }
    }
}

pub fn clean_filename<S: AsRef<str>>(name: S) -> String {
    let cleaned = FORBIDDEN_CHARS_RE.replace_all(name.as_ref().trim(), "_");
    let cleaned = WHITESPACE_RE.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_matches(|c: char| c == '_' || c == '.');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Where each artifact goes under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    naming: NamingMode,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, naming: NamingMode) -> Self {
        Self {
            root: root.into(),
            naming,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.dir_name())
    }

    pub fn nation_path(&self) -> PathBuf {
        self.root.join(NATION_FILE_NAME)
    }

    pub fn info_path(&self) -> PathBuf {
        self.root.join(INFO_FILE_NAME)
    }

    /// File name for an area. The nation is always `china.json`; code naming
    /// ignores the detailed suffix so both variants share one path.
    pub fn file_name(&self, info: &AreaInfo, detailed: bool) -> String {
        if info.code == NATION_CODE {
            return NATION_FILE_NAME.to_string();
        }
        match self.naming {
            NamingMode::ByCode => format!("{}.{}", info.code, JSON_EXT),
            NamingMode::ByChineseName => {
                let suffix = if detailed { DETAILED_SUFFIX } else { "" };
                format!("{}{}.{}", clean_filename(&info.name), suffix, JSON_EXT)
            }
        }
    }

    pub fn path_for(&self, bucket: Bucket, info: &AreaInfo, detailed: bool) -> PathBuf {
        self.bucket_dir(bucket).join(self.file_name(info, detailed))
    }

    /// Creates the root and the three tier directories.
    pub async fn ensure_dirs(&self) -> AppResult<()> {
        let dirs = [
            self.root.clone(),
            self.bucket_dir(Bucket::Province),
            self.bucket_dir(Bucket::City),
            self.bucket_dir(Bucket::County),
        ];
        for dir in dirs {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| AppError::filesystem(&dir, e))?;
        }
        Ok(())
    }
}

//! Target platforms and platform-derived naming.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A platform a bundle can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Apple iOS, written as `ios`.
    Ios,
    /// Android, written as `android`.
    Android,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Ios, Platform::Android];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(format!("unsupported platform: {}", other)),
        }
    }
}

/// Default bundle file name for an entry file: `<stem>.<platform>.js`.
///
/// The entry's directory and extension are dropped, whatever the extension is.
///
/// ```
/// use quay_config::{default_outfile_name, Platform};
///
/// assert_eq!(default_outfile_name("src/index.tsx", Platform::Android), "index.android.js");
/// assert_eq!(default_outfile_name("src/entry.ts", Platform::Ios), "entry.ios.js");
/// ```
pub fn default_outfile_name(entry: impl AsRef<Path>, platform: Platform) -> String {
    let stem = entry
        .as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());

    format!("{}.{}.js", stem, platform)
}

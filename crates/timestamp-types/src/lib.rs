use std::collections::BTreeMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Named button colors accepted next to `#RRGGBB` hex values.
pub const NAMED_COLORS: [&str; 10] = [
    "blue", "red", "green", "yellow", "orange", "purple", "pink", "grey", "black", "white",
];

/// Return `true` when `value` is `#RRGGBB` or one of [`NAMED_COLORS`].
pub fn is_valid_color(value: &str) -> bool {
    is_hex_color(value) || NAMED_COLORS.contains(&value)
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Last-known play position per locator, in whole seconds.
///
/// Serialized as a plain JSON object (`{"<locator>": <seconds>}`). Loading is
/// lenient: float and numeric-string values are accepted, anything else is dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StartTimeMap(BTreeMap<String, u64>);

impl StartTimeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored position for `key`, `0` when unknown.
    pub fn start_for(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn set(&mut self, key: impl Into<String>, seconds: u64) {
        self.0.insert(key.into(), seconds);
    }

    pub fn remove(&mut self, key: &str) -> Option<u64> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<'de> Deserialize<'de> for StartTimeMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSeconds {
            Int(u64),
            Float(f64),
            Text(String),
            Other(de::IgnoredAny),
        }

        let raw = BTreeMap::<String, RawSeconds>::deserialize(deserializer)?;
        let map = raw
            .into_iter()
            .filter_map(|(key, value)| {
                let seconds = match value {
                    RawSeconds::Int(v) => Some(v),
                    RawSeconds::Float(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u64),
                    RawSeconds::Text(s) => s.trim().parse::<f64>().ok().and_then(|v| {
                        (v.is_finite() && v >= 0.0).then(|| v.round() as u64)
                    }),
                    _ => None,
                };
                seconds.map(|s| (key, s))
            })
            .collect();
        Ok(Self(map))
    }
}

/// User settings persisted by the host (one JSON document).
///
/// Field names follow the host data file (camelCase). Missing fields take their
/// defaults; numeric fields accept numbers or numeric strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Text inserted above a new online video button.
    pub note_title: String,
    /// Resume positions keyed by locator.
    pub url_start_time_map: StartTimeMap,
    /// Background color of video buttons.
    pub url_color: String,
    /// Background color of timestamp buttons.
    pub timestamp_color: String,
    /// Text color of video buttons.
    pub url_text_color: String,
    /// Text color of timestamp buttons.
    pub timestamp_text_color: String,
    /// Base forward seek in seconds.
    #[serde(deserialize_with = "lenient")]
    pub forward_seek: f64,
    /// Base backward seek in seconds.
    #[serde(deserialize_with = "lenient")]
    pub backwards_seek: f64,
    /// Per-repeat acceleration multiplier.
    #[serde(deserialize_with = "lenient")]
    pub seek_factor: f64,
    /// Gap (ms) after which seek acceleration resets.
    #[serde(deserialize_with = "lenient")]
    pub seek_repeat_reset_time: u64,
    /// Upper bound applied to `seek_factor`.
    #[serde(deserialize_with = "lenient")]
    pub max_cumulated_seek_factor: f64,
    /// Playback-rate step for speed up/down.
    #[serde(deserialize_with = "lenient")]
    pub speed_factor: f64,
    /// Open the player in a side pane instead of a new tab.
    pub open_in_right_pane: bool,
    /// Directory (relative to the vault) served by the local HTTP bridge.
    pub server_root: String,
    /// Port of the local HTTP bridge.
    #[serde(deserialize_with = "lenient")]
    pub server_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            note_title: String::new(),
            url_start_time_map: StartTimeMap::new(),
            url_color: "#277ab5".to_string(),
            timestamp_color: "#27b59d".to_string(),
            url_text_color: "white".to_string(),
            timestamp_text_color: "white".to_string(),
            forward_seek: 1.0,
            backwards_seek: 1.0,
            seek_factor: 1.5,
            seek_repeat_reset_time: 500,
            max_cumulated_seek_factor: 300.0,
            speed_factor: 0.10,
            open_in_right_pane: true,
            server_root: String::new(),
            server_port: 8080,
        }
    }
}

impl Settings {
    /// Replace out-of-range values with defaults.
    ///
    /// Returns the names of the fields that were reset.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Settings::default();
        let mut reset = Vec::new();

        let colors: [(&'static str, &mut String, &String); 4] = [
            ("urlColor", &mut self.url_color, &defaults.url_color),
            ("timestampColor", &mut self.timestamp_color, &defaults.timestamp_color),
            ("urlTextColor", &mut self.url_text_color, &defaults.url_text_color),
            (
                "timestampTextColor",
                &mut self.timestamp_text_color,
                &defaults.timestamp_text_color,
            ),
        ];
        for (name, value, default) in colors {
            if !is_valid_color(value) {
                *value = default.clone();
                reset.push(name);
            }
        }

        let amounts: [(&'static str, &mut f64, f64); 5] = [
            ("forwardSeek", &mut self.forward_seek, defaults.forward_seek),
            ("backwardsSeek", &mut self.backwards_seek, defaults.backwards_seek),
            ("seekFactor", &mut self.seek_factor, defaults.seek_factor),
            (
                "maxCumulatedSeekFactor",
                &mut self.max_cumulated_seek_factor,
                defaults.max_cumulated_seek_factor,
            ),
            ("speedFactor", &mut self.speed_factor, defaults.speed_factor),
        ];
        for (name, value, default) in amounts {
            if !value.is_finite() || *value <= 0.0 {
                *value = default;
                reset.push(name);
            }
        }

        if self.seek_repeat_reset_time == 0 {
            self.seek_repeat_reset_time = defaults.seek_repeat_reset_time;
            reset.push("seekRepeatResetTime");
        }
        if self.server_port == 0 {
            self.server_port = defaults.server_port;
            reset.push("serverPort");
        }

        reset
    }
}

/// Numeric settings field that tolerates loosely typed input.
trait LooseNumber: Sized {
    /// Placeholder for unreadable input; [`Settings::sanitize`] replaces it.
    const UNREADABLE: Self;

    fn from_f64(value: f64) -> Option<Self>;
}

impl LooseNumber for f64 {
    const UNREADABLE: Self = f64::NAN;

    fn from_f64(value: f64) -> Option<Self> {
        Some(value)
    }
}

impl LooseNumber for u64 {
    const UNREADABLE: Self = 0;

    fn from_f64(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0 && value <= u64::MAX as f64)
            .then(|| value.trunc() as u64)
    }
}

impl LooseNumber for u16 {
    const UNREADABLE: Self = 0;

    fn from_f64(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0 && value <= u16::MAX as f64)
            .then(|| value.trunc() as u16)
    }
}

/// Accept a JSON number or a numeric string; integers truncate fractions.
///
/// Anything unreadable becomes [`LooseNumber::UNREADABLE`] instead of failing
/// the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: LooseNumber,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(de::IgnoredAny),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Some(v),
        Raw::Text(s) => s.trim().parse::<f64>().ok(),
        Raw::Other(_) => None,
    };
    Ok(value.and_then(T::from_f64).unwrap_or(T::UNREADABLE))
}

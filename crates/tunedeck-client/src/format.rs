//! Display text for track features and durations.

use tunedeck_api_models::FeatureValue;

const PITCH_CLASSES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// Pitch class name for a key index (`0` = C).
#[must_use]
pub fn pitch_class(key: i64) -> Option<&'static str> {
    usize::try_from(key)
        .ok()
        .and_then(|index| PITCH_CLASSES.get(index).copied())
}

/// Human label for a feature field name.
#[must_use]
pub fn feature_label(name: &str) -> String {
    match name {
        "duration_ms" => "Duration".to_string(),
        "time_signature" => "Time Signature".to_string(),
        _ => {
            let mut chars = name.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>().replace('_', " ")
            })
        }
    }
}

/// Display text for one feature value.
#[must_use]
pub fn format_feature(name: &str, value: FeatureValue) -> String {
    match (name, value) {
        ("key", FeatureValue::Integer(key)) => {
            pitch_class(key).map_or_else(|| key.to_string(), str::to_string)
        }
        ("duration_ms", FeatureValue::Integer(ms)) => {
            format_duration(u64::try_from(ms).unwrap_or_default())
        }
        ("tempo", value) => format!("{} BPM", plain(value)),
        ("loudness", value) => format!("{} dB", plain(value)),
        ("time_signature", value) => format!("{} / 4", plain(value)),
        (_, value) => plain(value),
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

fn plain(value: FeatureValue) -> String {
    match value {
        FeatureValue::Integer(value) => value.to_string(),
        FeatureValue::Float(value) => value.to_string(),
    }
}

// Vidshift - Metadata Synthesizer
// Fabricates plausible provenance tags (capture date, device, software, location)
// that replace the source container's metadata. Fresh per call, never cached.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const DEVICES: &[(&str, &[&str])] = &[
    ("iPhone", &["11 Pro", "12", "13 Pro Max", "14", "15 Pro", "SE"]),
    ("Samsung Galaxy", &["S21", "S22 Ultra", "S23", "A53", "Note 20", "Z Flip 4"]),
    ("Google Pixel", &["6", "7 Pro", "8", "6a", "7a", "Fold"]),
    ("Xiaomi", &["Mi 11", "Redmi Note 10", "13T Pro", "Poco F5"]),
    ("OnePlus", &["9 Pro", "10T", "11", "Nord 3"]),
    ("Sony", &["Alpha a7 III", "Alpha a6400", "ZV-1", "RX100 VII"]),
    ("Canon", &["EOS R6", "EOS 90D", "PowerShot G7 X", "EOS M50"]),
    ("Nikon", &["Z6 II", "D780", "D7500", "Coolpix P1000"]),
    ("GoPro", &["Hero 10 Black", "Hero 11", "Max"]),
];

const SOFTWARE: &[&str] = &[
    "Instagram", "TikTok", "Snapchat", "Camera App", "Filmic Pro",
    "DJI Mimo", "Premiere Rush", "iMovie", "CapCut", "Adobe Premiere",
];

const RESOLUTIONS: &[&str] = &["1920x1080", "3840x2160", "1280x720", "2560x1440"];

const LOCATIONS: &[&str] = &[
    "New York", "Los Angeles", "Chicago", "Miami", "London", "Paris",
    "Tokyo", "Sydney", "Berlin", "Toronto", "Barcelona", "Seoul",
];

const AUDIO_CODECS: &[&str] = &["AAC-LC", "HE-AAC", "AAC", "Opus"];
const AUDIO_SAMPLE_RATES: &[&str] = &["44100", "48000"];
const AUDIO_BIT_RATES: &[&str] = &["128k", "160k", "192k", "256k", "320k"];

const AUDIO_EQUIPMENT: &[&str] = &[
    "Built-in Microphone", "Rode VideoMic Pro", "Shure MV88", "DJI Mic",
    "Rode Wireless GO II", "Zoom H1n", "Sennheiser MKE 400",
];

const AUDIO_SOFTWARE: &[&str] = &[
    "Voice Memos", "GarageBand", "Audacity", "Adobe Audition", "Ferrite",
    "Lexis Audio Editor", "Dolby On",
];

/// Fabricated container metadata for one output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetadataBundle {
    pub creation_time: String,
    pub date: String,
    pub year: String,
    pub device_model: String,
    pub encoder: String,
    pub software: String,
    pub resolution: String,
    pub location: String,
    pub gps: String,
    pub audio_codec: String,
    pub audio_sample_rate: String,
    pub audio_bit_rate: String,
    pub audio_equipment: String,
    pub audio_software: String,
}

fn pick<'a, R: Rng + ?Sized>(items: &[&'a str], rng: &mut R) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

impl MetadataBundle {
    /// Generate a new bundle. Capture dates fall in 2018-2024.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let year: i32 = rng.gen_range(2018..=2024);
        let month: u32 = rng.gen_range(1..=12);
        let day: u32 = rng.gen_range(1..=28);
        let (hour, minute, second): (u32, u32, u32) =
            (rng.gen_range(0..24), rng.gen_range(0..60), rng.gen_range(0..60));

        let (creation_time, date) = match NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
        {
            Some(dt) => (dt.format("%Y-%m-%d %H:%M:%S").to_string(), dt.format("%Y-%m-%d").to_string()),
            None => (format!("{}-01-01 00:00:00", year), format!("{}-01-01", year)),
        };

        let (brand, models) = DEVICES[rng.gen_range(0..DEVICES.len())];
        let device_model = format!("{} {}", brand, pick(models, rng));

        let lat = rng.gen_range(-90.0..=90.0_f64);
        let long = rng.gen_range(-180.0..=180.0_f64);

        Self {
            creation_time,
            date,
            year: year.to_string(),
            device_model,
            encoder: format!("video_processor_{}", rng.gen_range(1000..10000)),
            software: pick(SOFTWARE, rng).to_string(),
            resolution: pick(RESOLUTIONS, rng).to_string(),
            location: pick(LOCATIONS, rng).to_string(),
            gps: format!("{:.3}, {:.3}", lat, long),
            audio_codec: pick(AUDIO_CODECS, rng).to_string(),
            audio_sample_rate: pick(AUDIO_SAMPLE_RATES, rng).to_string(),
            audio_bit_rate: pick(AUDIO_BIT_RATES, rng).to_string(),
            audio_equipment: pick(AUDIO_EQUIPMENT, rng).to_string(),
            audio_software: pick(AUDIO_SOFTWARE, rng).to_string(),
        }
    }

    /// All tags as (key, value) pairs, in a stable order.
    pub fn tags(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("creation_time", self.creation_time.as_str()),
            ("date", self.date.as_str()),
            ("year", self.year.as_str()),
            ("device_model", self.device_model.as_str()),
            ("encoder", self.encoder.as_str()),
            ("software", self.software.as_str()),
            ("resolution", self.resolution.as_str()),
            ("location", self.location.as_str()),
            ("gps", self.gps.as_str()),
            ("audio_codec", self.audio_codec.as_str()),
            ("audio_sample_rate", self.audio_sample_rate.as_str()),
            ("audio_bit_rate", self.audio_bit_rate.as_str()),
            ("audio_equipment", self.audio_equipment.as_str()),
            ("audio_software", self.audio_software.as_str()),
        ]
    }

    /// The reduced tag set the rehash pass rewrites.
    pub fn rehash_tags(&self, stem: &str, edit_id: u32, comment: &str) -> Vec<(&'static str, String)> {
        vec![
            ("title", format!("{} fresh_edit_{}", stem, edit_id)),
            ("comment", comment.to_string()),
            ("creation_time", self.creation_time.clone()),
            ("software", self.software.clone()),
            ("encoder", self.encoder.clone()),
        ]
    }
}

/// Expand (key, value) tags into `-metadata key=value` argument pairs.
pub fn metadata_args<K: AsRef<str>, V: AsRef<str>>(tags: &[(K, V)]) -> Vec<String> {
    let mut args = Vec::with_capacity(tags.len() * 2);
    for (key, value) in tags {
        args.push("-metadata".to_string());
        args.push(format!("{}={}", key.as_ref(), value.as_ref()));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_fields_populated() {
        let mut rng = StdRng::seed_from_u64(1);
        let bundle = MetadataBundle::generate(&mut rng);
        for (key, value) in bundle.tags() {
            assert!(!value.is_empty(), "{} should be set", key);
        }
        let year: i32 = bundle.year.parse().unwrap();
        assert!((2018..=2024).contains(&year));
        assert!(bundle.date.starts_with(&bundle.year));
        assert!(bundle.creation_time.starts_with(&bundle.date));
        assert!(bundle.encoder.starts_with("video_processor_"));
    }

    #[test]
    fn test_gps_format() {
        let mut rng = StdRng::seed_from_u64(9);
        let bundle = MetadataBundle::generate(&mut rng);
        let (lat, long) = bundle.gps.split_once(", ").unwrap();
        let lat: f64 = lat.parse().unwrap();
        let long: f64 = long.parse().unwrap();
        assert!((-90.0..=90.0).contains(&lat));
        assert!((-180.0..=180.0).contains(&long));
    }

    #[test]
    fn test_fresh_per_call() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = MetadataBundle::generate(&mut rng);
        let b = MetadataBundle::generate(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_metadata_args_pairs() {
        let args = metadata_args(&[("title", "clip fresh_edit_3"), ("comment", "x")]);
        assert_eq!(args, vec!["-metadata", "title=clip fresh_edit_3", "-metadata", "comment=x"]);
    }

    #[test]
    fn test_rehash_tags_subset() {
        let mut rng = StdRng::seed_from_u64(2);
        let bundle = MetadataBundle::generate(&mut rng);
        let tags = bundle.rehash_tags("clip", 42, "note");
        let keys: Vec<_> = tags.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["title", "comment", "creation_time", "software", "encoder"]);
        assert_eq!(tags[0].1, "clip fresh_edit_42");
    }
}

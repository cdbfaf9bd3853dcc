//! Composition model — song config, rhythm patterns, and their JSON documents.
//!
//! A [`Composition`] is a value object: built once per request, validated,
//! compiled, and dropped. Patterns never reference each other.

pub mod normalize;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, GridError, PatternRef, Result, Violation};

pub use normalize::{check_pan, check_velocity, normalize_pan, MIDI_MAX, PAN_CENTER};

/// Velocity given to hits when a document omits `velocities`.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Global tempo and meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongConfig {
    pub bpm: u32,
    pub time_signature: (u32, u32),
    /// Reserved; not applied by the compiler.
    #[serde(default)]
    pub swing_amount: f64,
}

impl SongConfig {
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm,
            ..Self::default()
        }
    }

    pub fn with_time_signature(mut self, numerator: u32, denominator: u32) -> Self {
        self.time_signature = (numerator, denominator);
        self
    }

    pub fn with_swing(mut self, swing_amount: f64) -> Self {
        self.swing_amount = swing_amount;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=999).contains(&self.bpm) {
            return Err(Error::SongConfig(Violation::Bpm(self.bpm)));
        }
        let (num, den) = self.time_signature;
        if num == 0 || den == 0 {
            return Err(Error::SongConfig(Violation::TimeSignature(num, den)));
        }
        if !(0.0..=1.0).contains(&self.swing_amount) {
            return Err(Error::SongConfig(Violation::Swing(self.swing_amount)));
        }
        Ok(())
    }
}

impl Default for SongConfig {
    fn default() -> Self {
        Self {
            bpm: 130,
            time_signature: (4, 4),
            swing_amount: 0.0,
        }
    }
}

/// One instrument's hit grid with per-hit expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    /// 1 = hit, 0 = rest; one entry per division.
    pub hits: Vec<u8>,
    pub divisions: u32,
    pub triplet: bool,
    /// MIDI channel, 1-based.
    pub channel: u8,
    pub note: u8,
    /// One entry per hit, in hit-occurrence order.
    pub velocities: Vec<u8>,
    /// Canonical pan (64 = center), one entry per hit.
    pub panning: Vec<u8>,
    pub name: String,
    pub bars: u32,
}

impl Pattern {
    /// A single-bar pattern on channel 1, note 36, with flat velocity and centered pan.
    pub fn new(hits: Vec<u8>) -> Self {
        let count = hit_count(&hits);
        Self {
            divisions: hits.len() as u32,
            hits,
            triplet: false,
            channel: 1,
            note: 36,
            velocities: vec![DEFAULT_VELOCITY; count],
            panning: vec![PAN_CENTER; count],
            name: String::new(),
            bars: 1,
        }
    }

    pub fn with_divisions(mut self, divisions: u32) -> Self {
        self.divisions = divisions;
        self
    }

    pub fn with_triplet(mut self, triplet: bool) -> Self {
        self.triplet = triplet;
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_note(mut self, note: u8) -> Self {
        self.note = note;
        self
    }

    pub fn with_velocities(mut self, velocities: Vec<u8>) -> Self {
        self.velocities = velocities;
        self
    }

    pub fn with_panning(mut self, panning: Vec<u8>) -> Self {
        self.panning = panning;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_bars(mut self, bars: u32) -> Self {
        self.bars = bars;
        self
    }

    /// Number of hits (1 flags) in the grid.
    pub fn hit_count(&self) -> usize {
        hit_count(&self.hits)
    }

    /// Steps per bar, or the grid error that prevents an even split.
    pub fn steps_per_bar(&self) -> std::result::Result<u32, GridError> {
        if self.bars < 1 {
            return Err(GridError::NoBars(self.bars));
        }
        if self.divisions < self.bars {
            return Err(GridError::TooFewDivisions {
                divisions: self.divisions,
                bars: self.bars,
            });
        }
        if self.divisions % self.bars != 0 {
            return Err(GridError::UnevenDivision {
                divisions: self.divisions,
                bars: self.bars,
            });
        }
        Ok(self.divisions / self.bars)
    }

    /// Check every per-pattern invariant. `index` is used to name the pattern in errors.
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |violation| Error::Validation {
            pattern: PatternRef::new(index, &self.name),
            violation,
        };

        self.steps_per_bar().map_err(|violation| Error::Configuration {
            pattern: PatternRef::new(index, &self.name),
            violation,
        })?;

        if self.hits.len() != self.divisions as usize {
            return Err(invalid(Violation::HitsLength {
                hits: self.hits.len(),
                divisions: self.divisions,
            }));
        }
        for (i, &hit) in self.hits.iter().enumerate() {
            check_hit(i, i32::from(hit)).map_err(invalid)?;
        }
        check_channel(i32::from(self.channel)).map_err(invalid)?;
        check_note(i32::from(self.note)).map_err(invalid)?;

        let hits = self.hit_count();
        if self.velocities.len() != hits {
            return Err(invalid(Violation::VelocityCount {
                hits,
                velocities: self.velocities.len(),
            }));
        }
        if self.panning.len() != hits {
            return Err(invalid(Violation::PanCount {
                hits,
                panning: self.panning.len(),
            }));
        }
        for (i, &v) in self.velocities.iter().enumerate() {
            check_velocity(i, i32::from(v)).map_err(invalid)?;
        }
        for (i, &p) in self.panning.iter().enumerate() {
            check_pan(i, i32::from(p)).map_err(invalid)?;
        }
        Ok(())
    }
}

fn hit_count(hits: &[u8]) -> usize {
    hits.iter().filter(|&&h| h == 1).count()
}

fn check_hit(index: usize, value: i32) -> std::result::Result<u8, Violation> {
    match value {
        0 | 1 => Ok(value as u8),
        _ => Err(Violation::HitFlag { index, value }),
    }
}

fn check_channel(value: i32) -> std::result::Result<u8, Violation> {
    u8::try_from(value)
        .ok()
        .filter(|c| (1..=16).contains(c))
        .ok_or(Violation::Channel(value))
}

fn check_note(value: i32) -> std::result::Result<u8, Violation> {
    u8::try_from(value)
        .ok()
        .filter(|n| *n <= MIDI_MAX)
        .ok_or(Violation::Note(value))
}

/// Song config plus an ordered list of patterns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    config: SongConfig,
    patterns: Vec<Pattern>,
}

impl Composition {
    pub fn new(config: SongConfig, patterns: Vec<Pattern>) -> Self {
        Self { config, patterns }
    }

    pub fn config(&self) -> &SongConfig {
        &self.config
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Parse a canonical document (pan already in 0–127).
    ///
    /// Numbers outside their MIDI range are reported as validation errors
    /// naming the pattern, not as parse errors.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json.trim())?;
        doc.into_composition(PanInput::Canonical)
    }

    /// Parse a generator-style document whose pan values use a signed convention.
    pub fn from_legacy_json(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json.trim())?;
        doc.into_composition(PanInput::Signed)
    }

    /// Serialize to a pretty-printed canonical document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the song config and every pattern, stopping at the first violation.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        let mut channels = HashSet::new();
        for (index, pattern) in self.patterns.iter().enumerate() {
            pattern.validate(index)?;
            if !channels.insert(pattern.channel) {
                tracing::warn!(
                    pattern = %PatternRef::new(index, &pattern.name),
                    channel = pattern.channel,
                    "channel shared with an earlier pattern"
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum PanInput {
    /// Already 0–127.
    Canonical,
    /// `[-64,64]` or `[-100,100]`, see [`normalize_pan`].
    Signed,
}

#[derive(Debug, Deserialize)]
struct Document {
    config: SongConfig,
    patterns: Vec<PatternDoc>,
}

impl Document {
    fn into_composition(self, pans: PanInput) -> Result<Composition> {
        let patterns = self
            .patterns
            .into_iter()
            .enumerate()
            .map(|(index, doc)| doc.into_pattern(index, pans))
            .collect::<Result<Vec<_>>>()?;
        Ok(Composition::new(self.config, patterns))
    }
}

/// Wire shape of a pattern. Numbers are read wide and narrowed with range
/// checks; optional expression lists are filled on conversion.
#[derive(Debug, Deserialize)]
struct PatternDoc {
    hits: Vec<i32>,
    divisions: u32,
    #[serde(default)]
    triplet: bool,
    channel: i32,
    note: i32,
    #[serde(default)]
    velocities: Option<Vec<i32>>,
    #[serde(default)]
    panning: Option<Vec<i32>>,
    #[serde(default)]
    name: String,
    #[serde(default = "one_bar")]
    bars: u32,
}

fn one_bar() -> u32 {
    1
}

impl PatternDoc {
    fn into_pattern(self, index: usize, pans: PanInput) -> Result<Pattern> {
        let pattern = || PatternRef::new(index, &self.name);
        let invalid = |violation| Error::Validation {
            pattern: pattern(),
            violation,
        };

        let hits = self
            .hits
            .iter()
            .enumerate()
            .map(|(i, &h)| check_hit(i, h).map_err(invalid))
            .collect::<Result<Vec<u8>>>()?;
        let channel = check_channel(self.channel).map_err(invalid)?;
        let note = check_note(self.note).map_err(invalid)?;

        let count = hit_count(&hits);
        let velocities = match &self.velocities {
            Some(values) => values
                .iter()
                .enumerate()
                .map(|(i, &v)| check_velocity(i, v).map_err(invalid))
                .collect::<Result<Vec<u8>>>()?,
            None => vec![DEFAULT_VELOCITY; count],
        };
        let panning = match &self.panning {
            Some(values) => values
                .iter()
                .enumerate()
                .map(|(i, &p)| match pans {
                    PanInput::Canonical => check_pan(i, p).map_err(invalid),
                    PanInput::Signed => normalize_pan(p).map_err(|source| Error::PanRange {
                        pattern: pattern(),
                        source,
                    }),
                })
                .collect::<Result<Vec<u8>>>()?,
            None => vec![PAN_CENTER; count],
        };

        Ok(Pattern {
            hits,
            divisions: self.divisions,
            triplet: self.triplet,
            channel,
            note,
            velocities,
            panning,
            name: self.name,
            bars: self.bars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick() -> Pattern {
        Pattern::new(vec![1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0])
            .with_name("kick")
            .with_velocities(vec![127, 120, 127, 125])
    }

    #[test]
    fn new_pattern_fills_defaults() {
        let p = Pattern::new(vec![1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(p.divisions, 16);
        assert_eq!(p.velocities, vec![100; 4]);
        assert_eq!(p.panning, vec![64; 4]);
        assert_eq!(p.bars, 1);
        assert_eq!(p.channel, 1);
        assert_eq!(p.note, 36);
    }

    #[test]
    fn valid_pattern_passes() {
        assert!(kick().validate(0).is_ok());
    }

    #[test]
    fn velocity_count_mismatch_rejected() {
        let p = kick().with_velocities(vec![127, 120, 127]);
        let err = p.validate(2).unwrap_err();
        match err {
            Error::Validation { pattern, violation } => {
                assert_eq!(pattern, PatternRef::new(2, "kick"));
                assert_eq!(
                    violation,
                    Violation::VelocityCount {
                        hits: 4,
                        velocities: 3
                    }
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn pan_count_mismatch_rejected() {
        let p = kick().with_panning(vec![64; 5]);
        assert!(matches!(
            p.validate(0),
            Err(Error::Validation {
                violation: Violation::PanCount { .. },
                ..
            })
        ));
    }

    #[test]
    fn hits_length_must_match_divisions() {
        let p = kick().with_divisions(8).with_bars(1);
        assert!(matches!(
            p.validate(0),
            Err(Error::Validation {
                violation: Violation::HitsLength { .. },
                ..
            })
        ));
    }

    #[test]
    fn non_binary_hit_rejected() {
        let p = Pattern::new(vec![1, 2, 0, 0]).with_velocities(vec![100]).with_panning(vec![64]);
        assert!(matches!(
            p.validate(0),
            Err(Error::Validation {
                violation: Violation::HitFlag { index: 1, value: 2 },
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_values_rejected() {
        assert!(kick().with_channel(0).validate(0).is_err());
        assert!(kick().with_channel(17).validate(0).is_err());
        assert!(kick().with_note(128).validate(0).is_err());
        assert!(kick()
            .with_velocities(vec![127, 128, 127, 127])
            .validate(0)
            .is_err());
        assert!(kick().with_panning(vec![64, 64, 200, 64]).validate(0).is_err());
    }

    #[test]
    fn grid_errors() {
        let uneven = Pattern::new(vec![0; 10]).with_bars(3);
        assert_eq!(
            uneven.steps_per_bar(),
            Err(GridError::UnevenDivision {
                divisions: 10,
                bars: 3
            })
        );
        assert!(matches!(
            uneven.validate(0),
            Err(Error::Configuration { .. })
        ));

        let no_bars = Pattern::new(vec![0; 4]).with_bars(0);
        assert_eq!(no_bars.steps_per_bar(), Err(GridError::NoBars(0)));

        let too_few = Pattern::new(vec![0; 2]).with_bars(4);
        assert!(matches!(
            too_few.steps_per_bar(),
            Err(GridError::TooFewDivisions { .. })
        ));

        assert_eq!(Pattern::new(vec![0; 32]).with_bars(2).steps_per_bar(), Ok(16));
    }

    #[test]
    fn song_config_validation() {
        assert!(SongConfig::default().validate().is_ok());
        assert!(SongConfig::new(0).validate().is_err());
        assert!(SongConfig::new(1000).validate().is_err());
        assert!(SongConfig::new(120)
            .with_time_signature(0, 4)
            .validate()
            .is_err());
        assert!(SongConfig::new(120).with_swing(1.5).validate().is_err());
    }

    #[test]
    fn json_round_trip_preserves_everything() {
        let comp = Composition::new(
            SongConfig::new(135).with_time_signature(7, 8).with_swing(0.25),
            vec![
                kick(),
                Pattern::new(vec![1, 0, 1, 0, 1, 0])
                    .with_triplet(true)
                    .with_channel(2)
                    .with_note(42)
                    .with_name("hat")
                    .with_panning(vec![40, 64, 90]),
            ],
        );
        let json = comp.to_json().unwrap();
        let restored = Composition::from_json(&json).unwrap();
        assert_eq!(restored, comp);
    }

    #[test]
    fn parse_fills_missing_optional_fields() {
        let json = r#"{
            "config": {"bpm": 128, "time_signature": [4, 4]},
            "patterns": [
                {"hits": [1, 0, 1, 0], "divisions": 4, "channel": 10, "note": 38}
            ]
        }"#;
        let comp = Composition::from_json(json).unwrap();
        assert_eq!(comp.config().swing_amount, 0.0);
        let p = &comp.patterns()[0];
        assert!(!p.triplet);
        assert_eq!(p.bars, 1);
        assert_eq!(p.name, "");
        assert_eq!(p.velocities, vec![100, 100]);
        assert_eq!(p.panning, vec![64, 64]);
    }

    #[test]
    fn missing_required_keys_fail_to_parse() {
        let no_patterns = r#"{"config": {"bpm": 128, "time_signature": [4, 4]}}"#;
        assert!(matches!(
            Composition::from_json(no_patterns),
            Err(Error::Parse(_))
        ));

        let no_note = r#"{
            "config": {"bpm": 128, "time_signature": [4, 4]},
            "patterns": [{"hits": [1], "divisions": 1, "channel": 1}]
        }"#;
        assert!(matches!(Composition::from_json(no_note), Err(Error::Parse(_))));
    }

    #[test]
    fn legacy_document_normalizes_pan() {
        let json = r#"{
            "config": {"bpm": 130, "time_signature": [4, 4], "swing_amount": 0.0},
            "patterns": [{
                "name": "kick",
                "hits": [1, 0, 0, 0, 1, 0, 0, 0],
                "divisions": 8,
                "triplet": false,
                "channel": 1,
                "note": 36,
                "velocities": [127, 120],
                "panning": [-64, 64]
            }]
        }"#;
        let comp = Composition::from_legacy_json(json).unwrap();
        assert_eq!(comp.patterns()[0].panning, vec![0, 127]);
    }

    #[test]
    fn legacy_document_rejects_wild_pan() {
        let json = r#"{
            "config": {"bpm": 130, "time_signature": [4, 4]},
            "patterns": [{
                "name": "hat", "hits": [1], "divisions": 1,
                "channel": 2, "note": 42, "panning": [150]
            }]
        }"#;
        match Composition::from_legacy_json(json) {
            Err(Error::PanRange { pattern, source }) => {
                assert_eq!(pattern, PatternRef::new(0, "hat"));
                assert_eq!(source.0, 150);
            }
            other => panic!("expected pan range error, got {other:?}"),
        }
    }

    fn one_hit_document(fields: &str) -> String {
        format!(
            r#"{{
                "config": {{"bpm": 120, "time_signature": [4, 4]}},
                "patterns": [
                    {{"name": "kick", "hits": [1, 0], "divisions": 2, "channel": 1, "note": 36}},
                    {{"name": "snare", "hits": [0, 1], "divisions": 2, {fields}}}
                ]
            }}"#
        )
    }

    fn violation_of(json: &str) -> (PatternRef, Violation) {
        match Composition::from_json(json) {
            Err(Error::Validation { pattern, violation }) => (pattern, violation),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn document_velocity_above_range_names_pattern() {
        let json = one_hit_document(r#""channel": 2, "note": 38, "velocities": [300]"#);
        let (pattern, violation) = violation_of(&json);
        assert_eq!(pattern, PatternRef::new(1, "snare"));
        assert_eq!(violation, Violation::VelocityRange { index: 0, value: 300 });
    }

    #[test]
    fn document_negative_velocity_names_pattern() {
        let json = one_hit_document(r#""channel": 2, "note": 38, "velocities": [-1]"#);
        let (pattern, violation) = violation_of(&json);
        assert_eq!(pattern, PatternRef::new(1, "snare"));
        assert_eq!(violation, Violation::VelocityRange { index: 0, value: -1 });
    }

    #[test]
    fn document_note_out_of_range_names_pattern() {
        let json = one_hit_document(r#""channel": 2, "note": 200"#);
        let (pattern, violation) = violation_of(&json);
        assert_eq!(pattern, PatternRef::new(1, "snare"));
        assert_eq!(violation, Violation::Note(200));
        assert!(Composition::from_json(&json)
            .unwrap_err()
            .to_string()
            .starts_with("pattern #1 'snare': note 200"));
    }

    #[test]
    fn document_channel_pan_and_hit_ranges() {
        let json = one_hit_document(r#""channel": 99, "note": 38"#);
        assert_eq!(violation_of(&json).1, Violation::Channel(99));

        let json = one_hit_document(r#""channel": 2, "note": 38, "panning": [-5]"#);
        assert_eq!(
            violation_of(&json).1,
            Violation::PanOutOfRange { index: 0, value: -5 }
        );

        let json = r#"{
            "config": {"bpm": 120, "time_signature": [4, 4]},
            "patterns": [{"hits": [0, -1], "divisions": 2, "channel": 1, "note": 36}]
        }"#;
        assert_eq!(
            violation_of(json).1,
            Violation::HitFlag { index: 1, value: -1 }
        );
    }

    #[test]
    fn composition_validate_reports_first_bad_pattern() {
        let comp = Composition::new(
            SongConfig::default(),
            vec![kick(), kick().with_name("broken").with_panning(vec![])],
        );
        let err = comp.validate().unwrap_err();
        assert!(err.to_string().starts_with("pattern #1 'broken'"));
    }
}

//! Pitch names to frequencies on the standard 88-key layout.
//!
//! Names use scientific pitch notation: a letter `A`–`G`, an optional `#`
//! or `b`, and an octave number (`C4`, `A#5`, `Db5`). Key 1 is A0 and key 88
//! is C8; names outside that range are not in the table.

use serde::{Deserialize, Serialize};

/// Lowest and highest key numbers on the keyboard.
pub const FIRST_KEY: i32 = 1;
pub const LAST_KEY: i32 = 88;

/// Octaves `note_to_midi` accepts; MIDI notes span C-1 to G9.
const MIN_OCTAVE: i32 = -1;
const MAX_OCTAVE: i32 = 9;

/// Key number of A4.
const A4_KEY: i32 = 49;

/// Equal-temperament lookup table, tuned relative to A4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchTable {
    /// Frequency of A4 in Hz.
    pub tuning_pitch: f64,
}

impl Default for PitchTable {
    fn default() -> Self {
        PitchTable { tuning_pitch: 440.0 }
    }
}

impl PitchTable {
    pub fn with_tuning(tuning_pitch: f64) -> Self {
        PitchTable { tuning_pitch }
    }

    /// Frequency for a pitch name, or `None` if the name is not in the table.
    pub fn lookup(&self, pitch: &str) -> Option<f64> {
        let key = key_number(pitch)?;
        Some(self.key_frequency(key))
    }

    /// `f = tuning * 2^((n - 49) / 12)`.
    pub fn key_frequency(&self, key: i32) -> f64 {
        self.tuning_pitch * 2.0_f64.powf((key - A4_KEY) as f64 / 12.0)
    }
}

/// Key number (1..=88) of a pitch name.
pub fn key_number(pitch: &str) -> Option<i32> {
    let key = note_to_midi(pitch)?.checked_sub(20)?;
    (FIRST_KEY..=LAST_KEY).contains(&key).then_some(key)
}

/// Parse a pitch name into a MIDI note number (C4 = 60).
pub fn note_to_midi(pitch: &str) -> Option<i32> {
    let mut chars = pitch.chars();
    let base = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (semitone, octave) = if let Some(o) = rest.strip_prefix('#') {
        (base + 1, o)
    } else if let Some(o) = rest.strip_prefix('b') {
        (base - 1, o)
    } else {
        (base, rest)
    };

    let digits = octave.strip_prefix('-').unwrap_or(octave);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // One canonical spelling per octave: no leading zeros, no "-0".
    if (digits.len() > 1 && digits.starts_with('0')) || octave == "-0" {
        return None;
    }
    let octave: i32 = octave.parse().ok()?;
    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
        return None;
    }
    (octave + 1).checked_mul(12)?.checked_add(semitone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_tuning_pitch() {
        let table = PitchTable::default();
        assert!((table.lookup("A4").unwrap() - 440.0).abs() < 1e-9);
        let table = PitchTable::with_tuning(432.0);
        assert!((table.lookup("A4").unwrap() - 432.0).abs() < 1e-9);
    }

    #[test]
    fn melody_notes_match_equal_temperament() {
        let table = PitchTable::default();
        let cases = [("C5", 523.251), ("E5", 659.255), ("G5", 783.991), ("G4", 391.995)];
        for (name, hz) in cases {
            let f = table.lookup(name).unwrap();
            assert!((f - hz).abs() < 0.01, "{name} should be {hz} Hz, got {f}");
        }
    }

    #[test]
    fn sharps_and_flats_are_enharmonic() {
        let table = PitchTable::default();
        let sharp = table.lookup("C#5").unwrap();
        let flat = table.lookup("Db5").unwrap();
        assert!((sharp - flat).abs() < 1e-9);
        assert!((table.lookup("A#5").unwrap() - 932.328).abs() < 0.01);
    }

    #[test]
    fn keyboard_edges() {
        assert_eq!(key_number("A0"), Some(1));
        assert_eq!(key_number("C8"), Some(88));
        assert_eq!(key_number("G#0"), None);
        assert_eq!(key_number("C#8"), None);
        let table = PitchTable::default();
        assert!((table.lookup("A0").unwrap() - 27.5).abs() < 1e-9);
        assert!((table.lookup("C8").unwrap() - 4186.009).abs() < 0.01);
    }

    #[test]
    fn unknown_names_miss() {
        let table = PitchTable::default();
        for name in [
            "Z9", "", "H4", "A", "A#", "Ax4", "a4", "A+4", "C99", "A04", "A-0", "A 4",
            "C2147483647", "C-300000000", "C99999999999",
        ] {
            assert_eq!(table.lookup(name), None, "{name:?} should not be in the table");
        }
    }

    #[test]
    fn note_to_midi_basic() {
        assert_eq!(note_to_midi("A4"), Some(69));
        assert_eq!(note_to_midi("C4"), Some(60));
        assert_eq!(note_to_midi("C-1"), Some(0));
        assert_eq!(note_to_midi("Cb4"), Some(59));
        assert_eq!(note_to_midi("G9"), Some(127));
    }

    #[test]
    fn out_of_range_octaves_do_not_overflow() {
        assert_eq!(note_to_midi("C2147483647"), None);
        assert_eq!(note_to_midi("C-2147483648"), None);
        assert_eq!(note_to_midi("C-300000000"), None);
        assert_eq!(note_to_midi("C10"), None);
        assert_eq!(note_to_midi("C-2"), None);
        assert_eq!(key_number("C-2147483648"), None);
    }
}

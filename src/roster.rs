//! Ordered participant list
//!
//! Position in the list is the wheel segment index; identity is the stable `id`.
//! Every mutation bumps `revision`, which the render cache compares against.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::consts::{MAX_NAME_LEN, MIN_PARTICIPANTS};
use crate::error::{StorageError, ValidationError};
use crate::persistence::Store;

/// Slice palette, assigned by position
pub const PALETTE: [&str; 50] = [
    "#DC2626", "#EF4444", "#B91C1C", "#991B1B", "#7F1D1D", // Reds
    "#16A34A", "#22C55E", "#15803D", "#166534", "#14532D", // Greens
    "#F59E0B", "#FBBF24", "#D97706", "#B45309", "#92400E", // Golds
    "#2563EB", "#3B82F6", "#1D4ED8", "#1E40AF", "#1E3A8A", // Blues
    "#8B5CF6", "#A78BFA", "#7C3AED", "#6D28D9", "#5B21B6", // Purples
    "#EC4899", "#F472B6", "#DB2777", "#BE185D", "#9D174D", // Pinks
    "#06B6D4", "#22D3EE", "#0891B2", "#0E7490", "#0C4A6E", // Cyans
    "#84CC16", "#A3E635", "#65A30D", "#4D7C0F", "#3F6212", // Limes
    "#F97316", "#FB923C", "#EA580C", "#C2410C", "#9A3412", // Oranges
    "#6366F1", "#818CF8", "#4F46E5", "#4338CA", "#3730A3", // Indigos
];

/// Color for the segment at `position`
pub fn palette_color(position: usize) -> &'static str {
    PALETTE[position % PALETTE.len()]
}

/// One wheel entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stored ids may be strings or numbers; numbers are kept in their decimal form
    #[serde(deserialize_with = "id_from_value")]
    pub id: String,
    pub name: String,
    /// CSS hex color, reassigned whenever positions shift
    #[serde(default)]
    pub color: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: palette_color(position).to_string(),
        }
    }
}

fn id_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid participant id: {}", other))),
    }
}

/// Storage key for the participant list
pub const STORAGE_KEY: &str = "lucky_draw_participants";

/// The participant sequence
#[derive(Debug, Clone)]
pub struct Roster {
    participants: Vec<Participant>,
    revision: u64,
    max_name_len: usize,
    rng: Pcg32,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::with_rng(Pcg32::from_rng(&mut rand::rng()))
    }

    /// Deterministic ids and shuffles
    pub fn with_rng(rng: Pcg32) -> Self {
        Self {
            participants: Vec::new(),
            revision: 0,
            max_name_len: MAX_NAME_LEN,
            rng,
        }
    }

    pub fn set_max_name_len(&mut self, max: usize) {
        self.max_name_len = max.max(1);
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.id == id)
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        for (i, p) in self.participants.iter_mut().enumerate() {
            p.color = palette_color(i).to_string();
        }
        self.revision += 1;
    }

    fn next_id(&mut self) -> String {
        const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let suffix: String = (0..6)
            .map(|_| DIGITS[self.rng.random_range(0..DIGITS.len())] as char)
            .collect();
        format!("{}-{}", to_base36(crate::now_ms() as u64), suffix)
    }

    /// Trimmed name, or why it is rejected
    pub fn validate_name(&self, raw: &str) -> Result<String, ValidationError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        let len = name.chars().count();
        if len > self.max_name_len {
            return Err(ValidationError::NameTooLong {
                len,
                max: self.max_name_len,
            });
        }
        Ok(name.to_string())
    }

    /// Append one participant
    pub fn add(&mut self, raw_name: &str) -> Result<Participant, ValidationError> {
        let name = self.validate_name(raw_name)?;
        let id = self.next_id();
        let participant = Participant::new(id, name, self.participants.len());
        self.participants.push(participant.clone());
        self.touch();
        Ok(participant)
    }

    /// Append every valid name, skipping blank and overlong ones
    pub fn add_bulk<I, S>(&mut self, names: I) -> Result<Vec<Participant>, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for raw in names {
            let Ok(name) = self.validate_name(raw.as_ref()) else {
                continue;
            };
            let id = self.next_id();
            let participant = Participant::new(id, name, self.participants.len());
            self.participants.push(participant.clone());
            added.push(participant);
        }

        if added.is_empty() {
            return Err(ValidationError::NoValidNames);
        }
        self.touch();
        Ok(added)
    }

    /// Split pasted text into names, one per line
    pub fn add_lines(&mut self, text: &str) -> Result<Vec<Participant>, ValidationError> {
        self.add_bulk(text.lines())
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Participant> {
        if index >= self.participants.len() {
            return None;
        }
        let removed = self.participants.remove(index);
        self.touch();
        Some(removed)
    }

    pub fn remove(&mut self, id: &str) -> Result<Participant, ValidationError> {
        let index = self
            .position(id)
            .ok_or_else(|| ValidationError::NotFound(id.to_string()))?;
        self.remove_at(index)
            .ok_or_else(|| ValidationError::NotFound(id.to_string()))
    }

    /// Remove the first participant with this name
    pub fn remove_by_name(&mut self, raw_name: &str) -> Result<Participant, ValidationError> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        let index = self
            .participants
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ValidationError::NotFound(name.to_string()))?;
        self.remove_at(index)
            .ok_or_else(|| ValidationError::NotFound(name.to_string()))
    }

    pub fn clear(&mut self) {
        self.participants.clear();
        self.touch();
    }

    /// Fisher-Yates reorder
    pub fn shuffle(&mut self) -> Result<(), ValidationError> {
        if self.participants.len() < MIN_PARTICIPANTS {
            return Err(ValidationError::TooFewParticipants {
                count: self.participants.len(),
                min: MIN_PARTICIPANTS,
            });
        }
        self.participants.shuffle(&mut self.rng);
        self.touch();
        Ok(())
    }

    /// Replace the whole list (restored or server-provided)
    pub fn replace(&mut self, participants: Vec<Participant>) {
        self.participants = participants;
        self.touch();
    }

    /// Build participants from stored JSON: either full records or raw
    /// values (strings/numbers), which get fresh ids.
    pub fn parse(&mut self, json: &str) -> Result<Vec<Participant>, StorageError> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        let mut out = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            let participant = match value {
                Value::Object(_) => {
                    let mut p: Participant = serde_json::from_value(value)?;
                    p.color = palette_color(i).to_string();
                    p
                }
                Value::String(s) => Participant::new(self.next_id(), s, i),
                other => Participant::new(self.next_id(), other.to_string(), i),
            };
            out.push(participant);
        }
        Ok(out)
    }

    /// Restore from `store`; missing or corrupt data yields an empty roster
    pub fn load(&mut self, store: &dyn Store) {
        let restored = match store.get(STORAGE_KEY) {
            Ok(Some(json)) => match self.parse(&json) {
                Ok(list) => {
                    log::info!("Loaded {} participants", list.len());
                    list
                }
                Err(e) => {
                    log::warn!("Discarding stored participants: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => {
                log::info!("No stored participants, starting empty");
                Vec::new()
            }
            Err(e) => {
                log::warn!("Could not read participants: {}", e);
                Vec::new()
            }
        };
        self.replace(restored);
    }

    /// Write the current list to `store`
    pub fn save(&self, store: &mut dyn Store) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.participants)?;
        store.set(STORAGE_KEY, &json)?;
        log::debug!("Participants saved ({} entries)", self.participants.len());
        Ok(())
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

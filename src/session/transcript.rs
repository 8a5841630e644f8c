use super::model::{Speaker, TranscriptEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an append did to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new entry was pushed at the end
    Appended,
    /// The trailing interim entry of the same speaker was rewritten in place
    Coalesced,
    /// Text was blank after trimming; nothing changed
    Ignored,
}

/// Ordered speech turns of one session.
///
/// Interim entries may be superseded in place by the same speaker until they
/// are finalized. A final entry is never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` for `speaker`, coalescing into the trailing interim entry
    /// of the same speaker when there is one.
    ///
    /// `now` is clamped so timestamps never go backwards within the log.
    pub fn append(
        &mut self,
        speaker: Speaker,
        text: &str,
        is_final: bool,
        now: DateTime<Utc>,
    ) -> AppendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return AppendOutcome::Ignored;
        }

        if let Some(last) = self.entries.last_mut() {
            if last.speaker == speaker && !last.is_final {
                last.text = text.to_string();
                last.is_final = is_final;
                return AppendOutcome::Coalesced;
            }
        }

        let timestamp = match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        self.entries.push(TranscriptEntry {
            speaker,
            text: text.to_string(),
            timestamp,
            is_final,
        });
        AppendOutcome::Appended
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finals(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter().filter(|e| e.is_final)
    }

    pub fn final_count(&self) -> usize {
        self.finals().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_interim_then_final_collapses_to_one_entry() {
        let mut log = TranscriptLog::new();
        let t0 = Utc::now();

        assert_eq!(log.append(Speaker::User, "hello", false, t0), AppendOutcome::Appended);
        assert_eq!(
            log.append(Speaker::User, "hello there", true, t0 + Duration::seconds(1)),
            AppendOutcome::Coalesced
        );

        assert_eq!(log.len(), 1);
        let entry = &log.entries()[0];
        assert_eq!(entry.text, "hello there");
        assert!(entry.is_final);
        assert_eq!(entry.timestamp, t0, "coalescing keeps the original timestamp");
    }

    #[test]
    fn test_final_entry_is_never_rewritten() {
        let mut log = TranscriptLog::new();
        let now = Utc::now();

        log.append(Speaker::User, "first answer", true, now);
        log.append(Speaker::User, "second", false, now);
        log.append(Speaker::User, "second answer", true, now);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].text, "first answer");
        assert_eq!(log.entries()[1].text, "second answer");
    }

    #[test]
    fn test_other_speaker_does_not_coalesce() {
        let mut log = TranscriptLog::new();
        let now = Utc::now();

        log.append(Speaker::User, "um", false, now);
        log.append(Speaker::Bot, "Take your time.", true, now);

        assert_eq!(log.len(), 2);
        assert!(!log.entries()[0].is_final);
        assert_eq!(log.final_count(), 1);
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let mut log = TranscriptLog::new();
        assert_eq!(log.append(Speaker::Bot, "   \n", true, Utc::now()), AppendOutcome::Ignored);
        assert!(log.is_empty());
    }

    #[test]
    fn test_text_is_trimmed() {
        let mut log = TranscriptLog::new();
        log.append(Speaker::Bot, "  Welcome!  ", true, Utc::now());
        assert_eq!(log.last().map(|e| e.text.as_str()), Some("Welcome!"));
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut log = TranscriptLog::new();
        let later = Utc::now();
        let earlier = later - Duration::seconds(5);

        log.append(Speaker::User, "a", true, later);
        log.append(Speaker::Bot, "b", true, earlier);

        assert_eq!(log.entries()[1].timestamp, later);
    }

    #[test]
    fn test_no_interim_is_followed_by_same_speaker() {
        let mut log = TranscriptLog::new();
        let now = Utc::now();
        let script = [
            (Speaker::User, "a", false),
            (Speaker::User, "ab", false),
            (Speaker::User, "abc", true),
            (Speaker::User, "d", false),
            (Speaker::Bot, "ok", true),
            (Speaker::User, "e", false),
            (Speaker::User, "ef", true),
            (Speaker::User, "g", true),
        ];
        for (speaker, text, is_final) in script {
            log.append(speaker, text, is_final, now);
        }

        for pair in log.entries().windows(2) {
            assert!(
                !(pair[0].speaker == pair[1].speaker && !pair[0].is_final),
                "interim entry followed by same speaker: {:?}",
                pair
            );
        }
        assert_eq!(log.final_count(), 4);
    }
}

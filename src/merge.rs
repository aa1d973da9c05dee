//! Combines a stored episode table with freshly extracted episodes.
//!
//! Stored rows always win over incoming rows with the same `episode_number`.
//! The result is ordered by [`EpisodeNumber`] descending; ties keep insertion
//! order (stored rows first, then new rows in extraction order).

use compact_str::CompactString;
use hashbrown::{HashMap, HashSet, hash_map::Entry};

use crate::episode::{EpisodeNumber, Record};

#[derive(Debug, Default)]
pub struct Merged {
    pub episodes: Vec<Record>,
    /// Number of rows that came from the incoming side.
    pub inserted: usize,
}

struct Slot {
    number: EpisodeNumber,
    record: Record,
    stored: bool,
}

impl Slot {
    fn new(record: Record, stored: bool) -> Self {
        Self {
            number: record.number(),
            record,
            stored,
        }
    }
}

pub fn merge<P, I>(stored: P, incoming: I) -> Merged
where
    P: IntoIterator<Item = Record>,
    I: IntoIterator<Item = Record>,
{
    let mut slots = Vec::<Slot>::new();
    let mut index = HashMap::<CompactString, usize>::new();
    let mut unknown = HashSet::<Record>::new();

    for record in stored {
        // "Unknown" carries no identity, every such row is kept.
        if record.is_unknown() {
            unknown.insert(record.clone());
            slots.push(Slot::new(record, true));
            continue;
        }
        match index.entry(record.episode_number.clone()) {
            Entry::Occupied(e) => {
                tracing::warn!(target: "merge", "episode {} is stored twice, keeping the later row", e.key());
                slots[*e.get()].record = record;
            }
            Entry::Vacant(e) => {
                e.insert(slots.len());
                slots.push(Slot::new(record, true));
            }
        }
    }

    let mut inserted = 0;
    for record in incoming {
        if record.is_unknown() {
            if unknown.insert(record.clone()) {
                slots.push(Slot::new(record, false));
                inserted += 1;
            }
            continue;
        }
        match index.entry(record.episode_number.clone()) {
            Entry::Occupied(e) => {
                let slot = &mut slots[*e.get()];
                if !slot.stored {
                    slot.record = record;
                }
            }
            Entry::Vacant(e) => {
                e.insert(slots.len());
                slots.push(Slot::new(record, false));
                inserted += 1;
            }
        }
    }

    slots.sort_by(|a, b| b.number.cmp(&a.number));

    Merged {
        episodes: slots.into_iter().map(|s| s.record).collect(),
        inserted,
    }
}

#[cfg(test)]
mod tests {
    use super::merge;
    use crate::episode::Record;

    fn ep(number: &str, title: &str) -> Record {
        Record {
            episode_number: number.into(),
            title: title.to_owned(),
            url: format!("https://example.org/{title}"),
            date: "2024-01-01".to_owned(),
            topic: "Prayer".to_owned(),
            description: String::new(),
        }
    }

    fn numbers(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.episode_number.as_str()).collect()
    }

    #[test]
    fn orders_by_bucket_then_value() {
        let m = merge(
            [ep("2100", "a"), ep("S1E2", "b")],
            [ep("2200", "c"), ep("Unknown", "d")],
        );
        assert_eq!(numbers(&m.episodes), ["2200", "2100", "S1E2", "Unknown"]);
        assert_eq!(m.inserted, 2);
    }

    #[test]
    fn stored_row_is_never_overwritten() {
        let m = merge([ep("7", "old")], [ep("7", "new"), ep("8", "fresh")]);
        assert_eq!(m.inserted, 1);
        assert_eq!(m.episodes.len(), 2);
        assert_eq!(m.episodes[1], ep("7", "old"));
    }

    #[test]
    fn empty_incoming_only_resorts() {
        let stored = [ep("S2E1", "x"), ep("5", "y"), ep("bogus", "z"), ep("10", "w")];
        let m = merge(stored.clone(), Vec::new());
        assert_eq!(m.inserted, 0);
        assert_eq!(numbers(&m.episodes), ["10", "5", "S2E1", "bogus"]);
        for r in &stored {
            assert!(m.episodes.contains(r));
        }
    }

    #[test]
    fn last_incoming_duplicate_wins_in_first_position() {
        let m = merge(Vec::new(), [ep("bad", "first"), ep("also bad", "other"), ep("bad", "second")]);
        assert_eq!(m.inserted, 2);
        assert_eq!(m.episodes, [ep("bad", "second"), ep("also bad", "other")]);
    }

    #[test]
    fn duplicate_stored_keys_keep_last_read() {
        let m = merge([ep("3", "one"), ep("4", "x"), ep("3", "two")], Vec::new());
        assert_eq!(m.episodes, [ep("4", "x"), ep("3", "two")]);
    }

    #[test]
    fn unknown_rows_are_kept_apart_but_not_repeated() {
        let stored = [ep("Unknown", "a"), ep("Unknown", "b")];
        let m = merge(stored.clone(), [ep("Unknown", "a"), ep("Unknown", "c")]);
        assert_eq!(m.inserted, 1);
        assert_eq!(
            m.episodes,
            [ep("Unknown", "a"), ep("Unknown", "b"), ep("Unknown", "c")]
        );
    }

    #[test]
    fn repeated_unknown_rows_in_one_scrape_collapse() {
        let incoming = (0..1000).map(|i| ep("Unknown", &format!("t{}", i % 10)));
        let m = merge([ep("Unknown", "t3")], incoming);
        assert_eq!(m.inserted, 9);
        assert_eq!(m.episodes.len(), 10);
        assert_eq!(m.episodes[0], ep("Unknown", "t3"));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let m = merge([ep("junk", "1"), ep("S1E1", "2")], [ep("?", "3"), ep("Unknown", "4")]);
        assert_eq!(numbers(&m.episodes), ["S1E1", "junk", "?", "Unknown"]);
    }

    #[test]
    fn deterministic_and_bounded() {
        let stored = vec![ep("1", "a"), ep("S3E9", "b"), ep("12", "c")];
        let incoming = vec![ep("12", "d"), ep("S3E10", "e"), ep("2", "f")];
        let a = merge(stored.clone(), incoming.clone());
        let b = merge(stored.clone(), incoming.clone());
        assert_eq!(a.episodes, b.episodes);
        assert!(a.episodes.len() <= stored.len() + incoming.len());
        assert_eq!(a.episodes.len(), stored.len() + a.inserted);
        assert_eq!(numbers(&a.episodes), ["12", "2", "1", "S3E10", "S3E9"]);
    }
}

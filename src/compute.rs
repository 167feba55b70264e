use crate::parse::fingerprint;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

pub type Key = Box<[u8]>;

/// Running statistics for one key. `mean` is only meaningful after [`Measurement::finalize`].
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
    pub mean: f64,
}
impl Measurement {
    #[inline]
    pub fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
            mean: 0.,
        }
    }
    #[inline]
    pub fn insert(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
    #[inline]
    pub fn merge(&mut self, other: Measurement) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
    pub fn finalize(&mut self) {
        if self.count > 0 {
            self.mean = self.sum / self.count as f64;
        }
    }
}

#[derive(Debug)]
struct Slot {
    key: Key,
    measurement: Measurement,
}

/// Statistics per key, indexed by key fingerprint.
///
/// Each slot keeps the spelling of the first key that landed on its fingerprint, and every
/// lookup compares against it. A different key with the same fingerprint goes to `collided`,
/// which is keyed by the full bytes, so two keys are never folded together.
#[derive(Debug, Default)]
pub struct AggTable {
    slots: FxHashMap<u64, Slot>,
    collided: FxHashMap<Key, Measurement>,
}

impl AggTable {
    #[inline]
    pub fn insert(&mut self, key: &[u8], value: f64) {
        self.insert_with_fingerprint(fingerprint(key), key, value);
    }

    #[inline]
    pub(crate) fn insert_with_fingerprint(&mut self, fp: u64, key: &[u8], value: f64) {
        match self.slots.entry(fp) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                if *slot.key == *key {
                    slot.measurement.insert(value);
                } else if let Some(m) = self.collided.get_mut(key) {
                    m.insert(value);
                } else {
                    self.collided.insert(key.into(), Measurement::new(value));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot {
                    key: key.into(),
                    measurement: Measurement::new(value),
                });
            }
        }
    }

    fn merge_entry(&mut self, fp: u64, key: Key, measurement: Measurement) {
        match self.slots.entry(fp) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                if slot.key == key {
                    slot.measurement.merge(measurement);
                } else {
                    self.collided
                        .entry(key)
                        .and_modify(|m| m.merge(measurement))
                        .or_insert(measurement);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot { key, measurement });
            }
        }
    }

    /// Folds `other` into `self`. Min/max/sum/count combine, so the order of merges doesn't
    /// matter. Means are stale until the next [`AggTable::finalize`].
    pub fn merge(&mut self, other: AggTable) {
        for (fp, slot) in other.slots {
            self.merge_entry(fp, slot.key, slot.measurement);
        }
        for (key, measurement) in other.collided {
            self.merge_entry(fingerprint(&key), key, measurement);
        }
    }

    pub fn finalize(&mut self) {
        self.slots
            .values_mut()
            .map(|slot| &mut slot.measurement)
            .chain(self.collided.values_mut())
            .for_each(Measurement::finalize);
    }

    pub fn get(&self, key: &[u8]) -> Option<&Measurement> {
        match self.slots.get(&fingerprint(key)) {
            Some(slot) if *slot.key == *key => Some(&slot.measurement),
            Some(_) => self.collided.get(key),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() + self.collided.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of keys that share a fingerprint with an earlier, different key.
    pub fn collisions(&self) -> usize {
        self.collided.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Measurement)> {
        self.slots
            .values()
            .map(|slot| (&*slot.key, &slot.measurement))
            .chain(self.collided.iter().map(|(k, m)| (&**k, m)))
    }

    /// Entries ordered by key bytes.
    pub fn sorted(&self) -> Vec<(&[u8], &Measurement)> {
        let mut result = self.iter().collect::<Vec<_>>();
        result.sort_unstable_by(|a, b| a.0.cmp(b.0));
        result
    }
}

/// Reduces per-chunk tables into one and computes every mean.
pub fn merge_tables(tables: impl IntoIterator<Item = AggTable>) -> AggTable {
    let mut totals = tables
        .into_iter()
        .reduce(|mut a, mut b| {
            // fold the smaller table into the bigger one
            if a.len() < b.len() {
                std::mem::swap(&mut a, &mut b);
            }
            a.merge(b);
            a
        })
        .unwrap_or_default();
    totals.finalize();
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Alphanumeric, rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    const STATIONS: [&str; 6] = ["Bālgudar", "Craig", "Formigine", "Gobernador Virasora", "Taraz", "Tokyo"];

    fn random_records(rng: &mut StdRng, n: usize) -> Vec<(&'static str, f64)> {
        (0..n)
            .map(|_| {
                let station = *STATIONS.choose(rng).unwrap();
                (station, rng.gen_range(-999..=999) as f64 / 10.)
            })
            .collect()
    }

    fn table_of(records: &[(&str, f64)]) -> AggTable {
        let mut table = AggTable::default();
        for (k, v) in records {
            table.insert(k.as_bytes(), *v);
        }
        table
    }

    fn assert_same(a: &AggTable, b: &AggTable) {
        let (a, b) = (a.sorted(), b.sorted());
        assert_eq!(a.len(), b.len());
        for ((ka, ma), (kb, mb)) in a.into_iter().zip(b) {
            assert_eq!(ka, kb);
            assert_eq!(ma.count, mb.count);
            assert_eq!(ma.min, mb.min);
            assert_eq!(ma.max, mb.max);
            assert!((ma.sum - mb.sum).abs() < 1e-6, "{} != {}", ma.sum, mb.sum);
        }
    }

    #[test]
    fn test_insert() {
        let mut table = table_of(&[("London", 10.5), ("Tokyo", 20.0), ("London", 5.0)]);
        table.finalize();
        assert_eq!(table.len(), 2);

        let london = table.get(b"London").unwrap();
        assert_eq!(london.count, 2);
        assert_eq!(london.min, 5.0);
        assert_eq!(london.max, 10.5);
        assert_eq!(london.sum, 15.5);
        assert_eq!(london.mean, 7.75);

        let tokyo = table.get(b"Tokyo").unwrap();
        assert_eq!((tokyo.min, tokyo.max, tokyo.count), (20.0, 20.0, 1));
        assert!(table.get(b"Paris").is_none());
    }

    #[test]
    fn test_insert_order_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut records = random_records(&mut rng, 500);
            let expected = table_of(&records);
            records.shuffle(&mut rng);
            assert_same(&expected, &table_of(&records));
        }
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let records = random_records(&mut rng, 1000);
            let expected = merge_tables([table_of(&records)]);

            // random partition into up to 8 parts
            let mut cuts = (0..rng.gen_range(0..8))
                .map(|_| rng.gen_range(0..=records.len()))
                .collect::<Vec<_>>();
            cuts.push(0);
            cuts.push(records.len());
            cuts.sort_unstable();
            let mut parts = cuts
                .windows(2)
                .map(|w| table_of(&records[w[0]..w[1]]))
                .collect::<Vec<_>>();
            parts.shuffle(&mut rng);

            let merged = merge_tables(parts);
            assert_same(&expected, &merged);
            for (key, m) in merged.iter() {
                let e = expected.get(key).unwrap();
                assert!((m.mean - e.mean).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_merge_is_associative() {
        let mut rng = StdRng::seed_from_u64(3);
        let (a, b, c) = (
            random_records(&mut rng, 200),
            random_records(&mut rng, 200),
            random_records(&mut rng, 200),
        );

        let mut left = table_of(&a);
        left.merge(table_of(&b));
        left.merge(table_of(&c));

        let mut bc = table_of(&b);
        bc.merge(table_of(&c));
        let mut right = table_of(&a);
        right.merge(bc);

        assert_same(&left, &right);
    }

    #[test]
    fn test_merge_empty() {
        let merged = merge_tables(Vec::new());
        assert!(merged.is_empty());
        assert_eq!(merged.len(), 0);
    }

    #[test]
    fn test_colliding_keys_stay_apart() {
        let mut table = AggTable::default();
        table.insert_with_fingerprint(1, b"London", 10.0);
        table.insert_with_fingerprint(1, b"Tokyo", 20.0);
        table.insert_with_fingerprint(1, b"London", 2.0);
        table.insert_with_fingerprint(1, b"Tokyo", 30.0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.collisions(), 1);

        let sorted = table.sorted();
        assert_eq!(sorted[0].0, b"London");
        assert_eq!((sorted[0].1.min, sorted[0].1.max, sorted[0].1.count), (2.0, 10.0, 2));
        assert_eq!(sorted[1].0, b"Tokyo");
        assert_eq!((sorted[1].1.min, sorted[1].1.max, sorted[1].1.count), (20.0, 30.0, 2));
    }

    #[test]
    fn test_merge_keeps_colliding_keys_apart() {
        let mut a = AggTable::default();
        a.insert_with_fingerprint(fingerprint(b"London"), b"London", 1.0);
        // "Tokyo" pretends to collide with "London" in this table only
        a.insert_with_fingerprint(fingerprint(b"London"), b"Tokyo", 5.0);
        let mut b = AggTable::default();
        b.insert(b"London", 3.0);

        let merged = merge_tables([b, a]);
        assert_eq!(merged.len(), 2);
        let london = merged.get(b"London").unwrap();
        assert_eq!((london.count, london.min, london.max), (2, 1.0, 3.0));
        assert_eq!(london.mean, 2.0);
    }

    #[test]
    fn test_random_keys_keep_their_spelling() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut table = AggTable::default();
        let mut keys = Vec::new();
        for _ in 0..50_000 {
            let len = rng.gen_range(1..=16);
            let key: Vec<u8> = (&mut rng).sample_iter(&Alphanumeric).take(len).collect();
            table.insert(&key, 1.0);
            keys.push(key);
        }
        keys.sort_unstable();
        keys.dedup();

        assert_eq!(table.collisions(), 0, "fingerprint bound two spellings");
        assert_eq!(table.len(), keys.len());
        for (fp, slot) in &table.slots {
            assert_eq!(*fp, fingerprint(&slot.key));
        }
    }
}

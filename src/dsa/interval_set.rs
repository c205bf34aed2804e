use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

// inclusive slot range, slots are 1-based
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,PartialOrd,Ord,Serialize,Deserialize)]
pub struct SlotInterval {
    pub first:usize,
    pub last:usize,
}

impl SlotInterval {
    pub const fn new(first:usize,last:usize) -> Self {
        Self {first,last}
    }
    // band of `width` slots starting at `first`, None on zero width
    pub fn with_width(first:usize,width:usize) -> Option<Self> {
        if width == 0 {return None}
        Some(Self {first,last:first + width - 1})
    }
    pub fn is_valid(&self) -> bool {
        self.first <= self.last
    }
    pub fn width(&self) -> usize {
        (self.last + 1).saturating_sub(self.first)
    }
    pub fn contains(&self,other:&Self) -> bool {
        self.first <= other.first && other.last <= self.last
    }
    pub fn intersects(&self,other:&Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }
    pub fn intersection(&self,other:&Self) -> Option<Self> {
        if !self.intersects(other) {return None}
        Some(Self {
            first:self.first.max(other.first),
            last:self.last.min(other.last)
        })
    }
}

impl Display for SlotInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"[{},{}]",self.first,self.last)
    }
}

/* ordered set of disjoint inclusive intervals
keyed by first slot, value is last slot
two stored intervals never overlap and never touch:
touching intervals are merged on insertion */
#[derive(Clone,Debug,Default,PartialEq,Eq)]
pub struct IntervalSet {
    bounds:BTreeMap<usize,usize>
}

impl IntervalSet {
    pub fn new() -> Self {
        Self {bounds:BTreeMap::new()}
    }
    pub fn from_interval(interval:SlotInterval) -> Self {
        let mut set = Self::new();
        if interval.is_valid() {
            set.bounds.insert(interval.first,interval.last);
        }
        set
    }
    pub fn len(&self) -> usize {
        self.bounds.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = SlotInterval> + '_ {
        self.bounds.iter().map(|(first,last)| SlotInterval::new(*first,*last))
    }
    pub fn to_vec(&self) -> Vec<SlotInterval> {
        self.iter().collect()
    }
    pub fn total_width(&self) -> usize {
        self.iter().map(|i| i.width()).sum()
    }
    pub fn largest(&self) -> Option<SlotInterval> {
        // ties resolved towards the lowest slot
        self.iter().fold(None,|best:Option<SlotInterval>,i| match best {
            Some(b) if b.width() >= i.width() => Some(b),
            _ => Some(i)
        })
    }

    // the stored interval that fully contains `interval`
    pub fn containing(&self,interval:&SlotInterval) -> Option<SlotInterval> {
        let (first,last) = self.bounds.range(..=interval.first).next_back()?;
        let candidate = SlotInterval::new(*first,*last);
        if candidate.contains(interval) {Some(candidate)} else {None}
    }

    pub fn intersects_any(&self,interval:&SlotInterval) -> bool {
        // stored intervals are sorted and disjoint, only the last one
        // starting at or before interval.last can reach interval.first
        match self.bounds.range(..=interval.last).next_back() {
            Some((_,last)) => *last >= interval.first,
            None => false
        }
    }

    // carves `interval` out of the stored interval that contains it,
    // leaving zero, one or two remainders. false if not fully contained
    pub fn remove_within(&mut self,interval:&SlotInterval) -> bool {
        let Some(host) = self.containing(interval) else {return false};

        self.bounds.remove(&host.first);
        if interval.first > host.first {
            self.bounds.insert(host.first,interval.first - 1);
        }
        if interval.last < host.last {
            self.bounds.insert(interval.last + 1,host.last);
        }
        #[cfg(debug_assertions)]
        self.assert_coalesced();
        true
    }

    // inserts and merges with touching neighbours. false if `interval`
    // overlaps something already stored
    pub fn insert_coalesced(&mut self,interval:&SlotInterval) -> bool {
        if self.intersects_any(interval) {
            return false;
        }
        let mut merged = *interval;

        let before = self.bounds.range(..interval.first).next_back().map(|(f,l)| (*f,*l));
        if let Some((first,last)) = before {
            if last + 1 == interval.first {
                self.bounds.remove(&first);
                merged.first = first;
            }
        }
        let after = self.bounds.get(&(interval.last + 1)).copied();
        if let Some(last) = after {
            self.bounds.remove(&(interval.last + 1));
            merged.last = last;
        }
        self.bounds.insert(merged.first,merged.last);

        #[cfg(debug_assertions)]
        self.assert_coalesced();
        true
    }

    // sweep over both ordered lists keeping what is in both
    pub fn intersect(a:&[SlotInterval],b:&[SlotInterval]) -> Vec<SlotInterval> {
        let mut result = Vec::with_capacity(a.len().min(b.len()));
        let (mut i,mut j) = (0,0);
        while i < a.len() && j < b.len() {
            if let Some(common) = a[i].intersection(&b[j]) {
                result.push(common);
            }
            // advance whichever ends first, both if they end together
            if a[i].last < b[j].last {
                i += 1;
            } else if b[j].last < a[i].last {
                j += 1;
            } else {
                i += 1;
                j += 1;
            }
        }
        result
    }

    fn assert_coalesced(&self) {
        let mut previous:Option<SlotInterval> = None;
        for interval in self.iter() {
            assert!(interval.is_valid(),"stored interval {interval} is malformed");
            if let Some(p) = previous {
                assert!(p.last + 1 < interval.first,"intervals {p} and {interval} touch or overlap");
            }
            previous = Some(interval);
        }
    }
}

impl FromIterator<SlotInterval> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = SlotInterval>>(iter: T) -> Self {
        let mut set = Self::new();
        for interval in iter {
            set.insert_coalesced(&interval);
        }
        set
    }
}

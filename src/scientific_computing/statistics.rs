use std::collections::BTreeMap;

use serde::Serialize;

// why an arriving request could not be served
#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord,Hash,Serialize)]
pub enum BlockCause {
    Transponder,
    Spectrum,
    QotNew,
    QotOthers,
    Other,
}

/* outcome counters of one replication,
filled by the driver from establish/release results */
#[derive(Clone,Debug,Default,PartialEq,Serialize)]
pub struct BlockingStatistics {
    pub requests:usize,
    pub accepted:usize,
    pub blocked_by:BTreeMap<BlockCause,usize>,
    pub requested_bandwidth:f64,
    pub blocked_bandwidth:f64,
    pub max_utilization:f64,
    // mean external fragmentation summed over every observation
    pub fragmentation_sum:f64,
    pub fragmentation_samples:usize,
}

impl BlockingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accept(&mut self,bandwidth:f64) {
        self.requests += 1;
        self.accepted += 1;
        self.requested_bandwidth += bandwidth;
    }

    pub fn record_block(&mut self,bandwidth:f64,cause:BlockCause) {
        self.requests += 1;
        self.requested_bandwidth += bandwidth;
        self.blocked_bandwidth += bandwidth;
        *self.blocked_by.entry(cause).or_default() += 1;
    }

    pub fn observe_utilization(&mut self,utilization:f64) {
        self.max_utilization = self.max_utilization.max(utilization);
    }

    pub fn observe_fragmentation(&mut self,fragmentation:f64) {
        self.fragmentation_sum += fragmentation;
        self.fragmentation_samples += 1;
    }

    pub fn mean_fragmentation(&self) -> f64 {
        if self.fragmentation_samples == 0 {return 0.0}
        self.fragmentation_sum/self.fragmentation_samples as f64
    }

    pub fn blocked(&self) -> usize {
        self.blocked_by.values().sum()
    }

    pub fn blocked_by(&self,cause:BlockCause) -> usize {
        self.blocked_by.get(&cause).copied().unwrap_or(0)
    }

    pub fn blocking_probability(&self) -> f64 {
        if self.requests == 0 {return 0.0}
        self.blocked() as f64/self.requests as f64
    }

    pub fn bandwidth_blocking_ratio(&self) -> f64 {
        if self.requested_bandwidth <= 0.0 {return 0.0}
        self.blocked_bandwidth/self.requested_bandwidth
    }
}

// mean and spread of a metric across replications, welford update
#[derive(Clone,Copy,Debug,Default,PartialEq)]
pub struct RunningStats {
    count:usize,
    mean:f64,
    m2:f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self,x:f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta/self.count as f64;
        self.m2 += delta*(x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }
    pub fn mean(&self) -> f64 {
        self.mean
    }

    // sample variance, 0 below two samples
    pub fn variance(&self) -> f64 {
        if self.count < 2 {return 0.0}
        self.m2/(self.count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    // half width of the normal 95% confidence interval of the mean
    pub fn confidence_95(&self) -> f64 {
        if self.count < 2 {return 0.0}
        1.96*self.std_dev()/(self.count as f64).sqrt()
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I:IntoIterator<Item = f64>>(iter:I) -> Self {
        let mut stats = Self::new();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

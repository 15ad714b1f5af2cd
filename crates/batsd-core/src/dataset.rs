use crate::error::Result;
use crate::key::{keyname, Kind, Measure};
use crate::models::{Sample, Values};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::iter::FusedIterator;
use std::slice;

/// Which series a [`DataSet`] was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesId {
    pub kind: Kind,
    pub name: String,
    pub subname: Option<String>,
    pub measure: Option<Measure>,
}

impl SeriesId {
    pub fn key(&self) -> String {
        keyname(self.kind, &self.name, self.subname.as_deref(), self.measure)
    }
}

/// Samples returned for one query, in server order. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    id: SeriesId,
    interval: u64,
    start: i64,
    end: i64,
    samples: Vec<Sample>,
}

impl DataSet {
    pub fn new(id: SeriesId, interval: u64, start: i64, end: i64, samples: Vec<Sample>) -> Self {
        Self {
            id,
            interval,
            start,
            end,
            samples,
        }
    }

    /// Picks the series for `id` out of a `values` reply.
    pub fn from_values(id: SeriesId, mut values: Values, start: i64, end: i64) -> Result<Self> {
        let samples = values.take_series(&id.key())?;
        Ok(Self::new(id, values.interval, start, end, samples))
    }

    pub fn size(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Requested lower bound, not necessarily the first timestamp present.
    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn id(&self) -> &SeriesId {
        &self.id
    }

    pub fn kind(&self) -> Kind {
        self.id.kind
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn subname(&self) -> Option<&str> {
        self.id.subname.as_deref()
    }

    pub fn measure(&self) -> Option<Measure> {
        self.id.measure
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Fresh iterator over `(timestamp, value)` pairs; each call starts over.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.samples.iter(),
        }
    }

    pub fn export(&self) -> Export {
        Export {
            interval: self.interval,
            series: self.samples.clone(),
            start: self.start,
            end: self.end,
            name: self.id.name.clone(),
            subname: self.id.subname.clone(),
            measure: self.id.measure,
            kind: self.id.kind.type_name().to_string(),
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let key = self.id.key();
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["key", "timestamp", "value"])?;
        for (timestamp, value) in self {
            let (timestamp, value) = (timestamp.to_string(), value.to_string());
            csv_writer.write_record([key.as_str(), timestamp.as_str(), value.as_str()])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = (i64, f64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: slice::Iter<'a, Sample>,
}

impl Iterator for Iter<'_> {
    type Item = (i64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|s| (s.timestamp, s.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|s| (s.timestamp, s.value))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

/// Serializable snapshot of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub interval: u64,
    pub series: Vec<Sample>,
    pub start: i64,
    pub end: i64,
    pub name: String,
    pub subname: Option<String>,
    pub measure: Option<Measure>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Export {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

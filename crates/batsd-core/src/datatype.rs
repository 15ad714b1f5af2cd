//! Typed handles for the three key namespaces.
//!
//! A handle borrows the [`Connection`] it queries through; it never opens or
//! closes the socket. Handles are immutable and cheap to clone.

use crate::connection::Connection;
use crate::dataset::{DataSet, SeriesId};
use crate::error::Result;
use crate::key::{keyname, Kind, Measure};
use crate::models::TimeRange;

/// Sub-name timers are queried under when none is given.
pub const TIMER_DEFAULT_SUBNAME: &str = "total";

pub trait DataType: Sized {
    const KIND: Kind;

    fn name(&self) -> &str;

    fn connection(&self) -> &Connection;

    fn prefix(&self) -> &'static str {
        Self::KIND.prefix()
    }

    fn keyname(&self, subname: Option<&str>, measure: Option<Measure>) -> String {
        keyname(Self::KIND, self.name(), subname, measure)
    }

    fn get(
        &self,
        start: i64,
        end: i64,
        subname: Option<&str>,
        measure: Option<Measure>,
    ) -> Result<DataSet> {
        fetch(self, start, end, subname, measure)
    }

    fn get_range(
        &self,
        range: TimeRange,
        subname: Option<&str>,
        measure: Option<Measure>,
    ) -> Result<DataSet> {
        self.get(range.start, range.end, subname, measure)
    }
}

fn fetch<T: DataType>(
    datatype: &T,
    start: i64,
    end: i64,
    subname: Option<&str>,
    measure: Option<Measure>,
) -> Result<DataSet> {
    let id = SeriesId {
        kind: T::KIND,
        name: datatype.name().to_string(),
        subname: subname.map(str::to_string),
        measure,
    };
    let values = datatype.connection().values(&id.key(), start, end)?;
    DataSet::from_values(id, values, start, end)
}

/// Summed per interval.
#[derive(Debug, Clone)]
pub struct Counter<'c> {
    name: String,
    connection: &'c Connection,
}

impl<'c> Counter<'c> {
    pub fn new<N: Into<String>>(connection: &'c Connection, name: N) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }
}

impl DataType for Counter<'_> {
    const KIND: Kind = Kind::Counter;

    fn name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &Connection {
        self.connection
    }
}

/// Latest sample per interval, unaggregated.
#[derive(Debug, Clone)]
pub struct Gauge<'c> {
    name: String,
    connection: &'c Connection,
}

impl<'c> Gauge<'c> {
    pub fn new<N: Into<String>>(connection: &'c Connection, name: N) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }
}

impl DataType for Gauge<'_> {
    const KIND: Kind = Kind::Gauge;

    fn name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &Connection {
        self.connection
    }
}

/// Distribution summarised per interval; every query selects one [`Measure`].
#[derive(Debug, Clone)]
pub struct Timer<'c> {
    name: String,
    connection: &'c Connection,
}

impl<'c> Timer<'c> {
    pub fn new<N: Into<String>>(connection: &'c Connection, name: N) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }

    pub fn get_measure(
        &self,
        measure: Measure,
        start: i64,
        end: i64,
        subname: Option<&str>,
    ) -> Result<DataSet> {
        self.get(start, end, subname, Some(measure))
    }

    pub fn get_mean(&self, start: i64, end: i64, subname: Option<&str>) -> Result<DataSet> {
        self.get_measure(Measure::Mean, start, end, subname)
    }

    pub fn get_min(&self, start: i64, end: i64, subname: Option<&str>) -> Result<DataSet> {
        self.get_measure(Measure::Min, start, end, subname)
    }

    pub fn get_max(&self, start: i64, end: i64, subname: Option<&str>) -> Result<DataSet> {
        self.get_measure(Measure::Max, start, end, subname)
    }

    pub fn get_count(&self, start: i64, end: i64, subname: Option<&str>) -> Result<DataSet> {
        self.get_measure(Measure::Count, start, end, subname)
    }

    pub fn get_upper_90(&self, start: i64, end: i64, subname: Option<&str>) -> Result<DataSet> {
        self.get_measure(Measure::Upper90, start, end, subname)
    }

    pub fn get_stddev(&self, start: i64, end: i64, subname: Option<&str>) -> Result<DataSet> {
        self.get_measure(Measure::Stddev, start, end, subname)
    }
}

impl DataType for Timer<'_> {
    const KIND: Kind = Kind::Timer;

    fn name(&self) -> &str {
        &self.name
    }

    fn connection(&self) -> &Connection {
        self.connection
    }

    /// Defaults to the `total` sub-series and the `mean` measure.
    fn get(
        &self,
        start: i64,
        end: i64,
        subname: Option<&str>,
        measure: Option<Measure>,
    ) -> Result<DataSet> {
        fetch(
            self,
            start,
            end,
            Some(subname.unwrap_or(TIMER_DEFAULT_SUBNAME)),
            Some(measure.unwrap_or(Measure::Mean)),
        )
    }
}

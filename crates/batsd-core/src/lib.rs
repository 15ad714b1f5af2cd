pub mod config;
pub mod connection;
pub mod dataset;
pub mod datatype;
pub mod error;
pub mod key;
pub mod models;
pub mod timeutils;

pub use config::{Config, ConnectionConfig, LoggingConfig, QueryConfig};
pub use connection::{Catalog, Connection, State};
pub use dataset::{DataSet, Export, SeriesId};
pub use datatype::{Counter, DataType, Gauge, Timer, TIMER_DEFAULT_SUBNAME};
pub use error::{BatsdError, Result};
pub use key::{keyname, Kind, Measure};
pub use models::{Sample, TimeRange, Values};
pub use timeutils::{now_utc, parse_range, utc_from_timestamp};

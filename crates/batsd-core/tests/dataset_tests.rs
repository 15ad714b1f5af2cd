use batsd_core::{DataSet, Export, Kind, Measure, Sample, SeriesId};

fn sample_set() -> DataSet {
    let id = SeriesId {
        kind: Kind::Timer,
        name: "api".into(),
        subname: Some("latency".into()),
        measure: Some(Measure::Upper90),
    };
    let samples = vec![
        Sample { timestamp: 100, value: 3.0 },
        Sample { timestamp: 110, value: 5.5 },
        Sample { timestamp: 120, value: -1.25 },
    ];
    DataSet::new(id, 10, 90, 130, samples)
}

#[test]
fn size_matches_series_and_iteration_restarts() {
    let set = sample_set();
    let first: Vec<(i64, f64)> = set.iter().collect();
    let second: Vec<(i64, f64)> = (&set).into_iter().collect();
    assert_eq!(set.size(), first.len());
    assert_eq!(set.iter().len(), 3);
    assert_eq!(first, second);
    assert_eq!(first[0], (100, 3.0));
    assert_eq!(set.iter().next_back(), Some((120, -1.25)));
}

#[test]
fn export_survives_json_round_trip() {
    let set = sample_set();
    let json = set.export().to_json().unwrap();

    let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(raw["interval"], 10);
    assert_eq!(raw["start"], 90);
    assert_eq!(raw["end"], 130);
    assert_eq!(raw["type"], "Timer");
    assert_eq!(raw["measure"], "upper_90");
    assert_eq!(raw["series"][1]["value"], 5.5);

    let back: Export = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set.export());
}

#[test]
fn csv_lists_every_sample_under_its_key() {
    let set = sample_set();
    let mut buf = Vec::new();
    set.write_csv(&mut buf).unwrap();
    let content = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "key,timestamp,value");
    assert_eq!(lines[1], "timers:api.latency:upper_90,100,3");
    assert_eq!(lines.len(), 4);
}

#[test]
fn sample_datetime_is_utc() {
    let s = Sample { timestamp: 86_400, value: 1.0 };
    let when = s.datetime().unwrap();
    assert_eq!(when.unix_timestamp(), 86_400);
    assert_eq!(when.offset(), time::UtcOffset::UTC);

    let far = Sample { timestamp: i64::MAX, value: 1.0 };
    assert!(far.datetime().is_err());
}

use batsd_core::{keyname, Kind, Measure};
use proptest::prelude::*;

fn any_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Counter), Just(Kind::Gauge), Just(Kind::Timer)]
}

fn any_measure() -> impl Strategy<Value = Measure> {
    prop_oneof![
        Just(Measure::Mean),
        Just(Measure::Min),
        Just(Measure::Max),
        Just(Measure::Count),
        Just(Measure::Upper90),
        Just(Measure::Stddev),
    ]
}

proptest! {
    #[test]
    fn full_key_is_prefix_name_sub_measure(
        kind in any_kind(),
        name in "[A-Za-z0-9_.]{1,24}",
        sub in "[A-Za-z0-9_]{1,12}",
        measure in any_measure(),
    ) {
        let key = keyname(kind, &name, Some(&sub), Some(measure));
        prop_assert_eq!(key, format!("{}{}.{}:{}", kind.prefix(), name, sub, measure));
    }

    #[test]
    fn bare_key_is_prefix_name_and_splits_back(
        kind in any_kind(),
        name in "[A-Za-z0-9_.]{1,24}",
    ) {
        let key = keyname(kind, &name, None, None);
        prop_assert_eq!(&key, &format!("{}{}", kind.prefix(), name));
        prop_assert_eq!(Kind::split_key(&key), Some((kind, name.as_str())));
    }
}

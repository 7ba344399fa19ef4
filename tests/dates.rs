use retriever::{
    date_boundaries, date_boundaries_iso, date_to_epoch, end_epoch, epoch_to_datetime, format_date, parse_iso_date,
    start_epoch, tomorrow_utc, windows, FreqUnit, QueryFreq, RetrieverError, MAX_FREQ_MULTIPLE,
};
use time::macros::date;

fn iso(dates: &[time::Date]) -> Vec<String> {
    dates.iter().map(|d| format_date(*d)).collect()
}

/// 7-day windows starting on the first, with a partial trailing window.
#[test]
fn seven_day_boundaries_keep_partial_tail() {
    let b = date_boundaries_iso("2020-01-01", "2020-01-10", "7D").unwrap();
    assert_eq!(iso(&b), vec!["2020-01-01", "2020-01-08", "2020-01-10"]);

    let w: Vec<_> = windows(&b).collect();
    assert_eq!(w, vec![(date!(2020 - 01 - 01), date!(2020 - 01 - 08)), (date!(2020 - 01 - 08), date!(2020 - 01 - 10))]);
}

#[test]
fn exact_multiple_has_no_extra_boundary() {
    let b = date_boundaries_iso("2020-01-01", "2020-01-15", "7D").unwrap();
    assert_eq!(iso(&b), vec!["2020-01-01", "2020-01-08", "2020-01-15"]);
}

/// Weekly offsets anchor on Sundays; the start is prepended when it is not one.
#[test]
fn weeks_anchor_on_sunday() {
    // 2020-01-01 is a Wednesday.
    let b = date_boundaries_iso("2020-01-01", "2020-01-20", "W").unwrap();
    assert_eq!(iso(&b), vec!["2020-01-01", "2020-01-05", "2020-01-12", "2020-01-19", "2020-01-20"]);
}

#[test]
fn month_and_year_offsets() {
    let ms = date_boundaries_iso("2020-01-15", "2020-04-01", "MS").unwrap();
    assert_eq!(iso(&ms), vec!["2020-01-15", "2020-02-01", "2020-03-01", "2020-04-01"]);

    let me = date_boundaries_iso("2020-01-15", "2020-03-10", "M").unwrap();
    assert_eq!(iso(&me), vec!["2020-01-15", "2020-01-31", "2020-02-29", "2020-03-10"]);

    let y = date_boundaries_iso("2019-06-01", "2020-06-01", "1Y").unwrap();
    assert_eq!(iso(&y), vec!["2019-06-01", "2019-12-31", "2020-06-01"]);
}

#[test]
fn frequency_aliases_parse() {
    assert_eq!("7D".parse::<QueryFreq>().unwrap(), QueryFreq { n: 7, unit: FreqUnit::Day });
    assert_eq!("W".parse::<QueryFreq>().unwrap(), QueryFreq { n: 1, unit: FreqUnit::Week });
    assert_eq!("2MS".parse::<QueryFreq>().unwrap(), QueryFreq { n: 2, unit: FreqUnit::MonthStart });
    assert_eq!("A".parse::<QueryFreq>().unwrap(), QueryFreq { n: 1, unit: FreqUnit::YearEnd });
    assert_eq!("AS".parse::<QueryFreq>().unwrap(), QueryFreq { n: 1, unit: FreqUnit::YearStart });
    assert_eq!("7D".parse::<QueryFreq>().unwrap().to_string(), "7D");

    for bad in ["", "0D", "7X", "D7", "seven days"] {
        assert!(
            matches!(bad.parse::<QueryFreq>(), Err(RetrieverError::InvalidFrequency(_))),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn oversized_multiples_are_rejected() {
    let max = format!("{}D", MAX_FREQ_MULTIPLE);
    assert_eq!(max.parse::<QueryFreq>().unwrap(), QueryFreq { n: MAX_FREQ_MULTIPLE, unit: FreqUnit::Day });

    for bad in ["2147483647Y".to_string(), "4294967295MS".to_string(), format!("{}W", MAX_FREQ_MULTIPLE + 1)] {
        assert!(
            matches!(bad.parse::<QueryFreq>(), Err(RetrieverError::InvalidFrequency(_))),
            "{:?} should be rejected",
            bad
        );
    }
}

/// A step past the end of the calendar stops the walk instead of overflowing.
#[test]
fn huge_steps_end_the_walk() {
    let (start, end) = (date!(2020 - 01 - 01), date!(2021 - 06 - 01));

    let y = date_boundaries(start, end, QueryFreq { n: u32::MAX, unit: FreqUnit::YearEnd }).unwrap();
    assert_eq!(iso(&y), vec!["2020-01-01", "2020-12-31", "2021-06-01"]);

    let ys = date_boundaries(start, end, QueryFreq { n: u32::MAX, unit: FreqUnit::YearStart }).unwrap();
    assert_eq!(iso(&ys), vec!["2020-01-01", "2021-06-01"]);

    let ms = date_boundaries(start, end, QueryFreq { n: u32::MAX, unit: FreqUnit::MonthStart }).unwrap();
    assert_eq!(iso(&ms), vec!["2020-01-01", "2021-06-01"]);

    let me = date_boundaries(start, end, QueryFreq { n: u32::MAX, unit: FreqUnit::MonthEnd }).unwrap();
    assert_eq!(iso(&me), vec!["2020-01-01", "2020-01-31", "2021-06-01"]);

    let d = date_boundaries(start, end, QueryFreq { n: u32::MAX, unit: FreqUnit::Day }).unwrap();
    assert_eq!(iso(&d), vec!["2020-01-01", "2021-06-01"]);
}

/// No offset date inside the range is a configuration error, as is start > end.
#[test]
fn incompatible_ranges_are_configuration_errors() {
    let err = date_boundaries_iso("2020-01-02", "2020-01-20", "MS").unwrap_err();
    assert!(matches!(err, RetrieverError::IncompatibleDateRange { .. }));
    assert!(err.is_configuration());

    let err = date_boundaries(date!(2020 - 02 - 01), date!(2020 - 01 - 01), QueryFreq::days(1)).unwrap_err();
    assert!(matches!(err, RetrieverError::IncompatibleDateRange { .. }));
}

#[test]
fn dates_are_utc_midnight() {
    assert_eq!(date_to_epoch(date!(2020 - 01 - 01)), 1_577_836_800);
    assert_eq!(start_epoch(Some("2020-01-01")).unwrap(), 1_577_836_800);
    assert_eq!(start_epoch(None).unwrap(), date_to_epoch(date!(2005 - 08 - 01)));
    assert_eq!(end_epoch(None).unwrap(), date_to_epoch(tomorrow_utc()));

    let dt = epoch_to_datetime(1_577_836_800 + 3_661);
    assert_eq!(dt.date(), date!(2020 - 01 - 01));
    assert_eq!((dt.hour(), dt.minute(), dt.second()), (1, 1, 1));
}

#[test]
fn malformed_dates_are_rejected() {
    assert!(matches!(parse_iso_date("2020-13-01"), Err(RetrieverError::InvalidDate(_))));
    assert!(matches!(parse_iso_date("01/02/2020"), Err(RetrieverError::InvalidDate(_))));
    assert!(start_epoch(Some("yesterday")).is_err());
}

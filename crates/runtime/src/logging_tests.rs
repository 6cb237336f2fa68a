use super::*;
use log::{Level, Metadata, Record};
use serial_test::serial;

#[test]
#[serial]
fn env_level_filter_parses_cases() {
    let cases: &[(Option<&str>, LevelFilter)] = &[
        (None, LevelFilter::Warn),
        (Some("trace"), LevelFilter::Trace),
        (Some("debug"), LevelFilter::Debug),
        (Some("DEBUG"), LevelFilter::Debug),
        (Some("info"), LevelFilter::Info),
        (Some("warn"), LevelFilter::Warn),
        (Some("error"), LevelFilter::Error),
        (Some("off"), LevelFilter::Off),
        (Some("garbage"), LevelFilter::Warn),
        (Some(""), LevelFilter::Warn),
    ];

    for (value, expected) in cases {
        match value {
            Some(v) => unsafe { std::env::set_var(PROGRAM_LOG_LEVEL, v) },
            None => unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) },
        }

        let filter = env_level_filter();
        assert_eq!(
            filter, *expected,
            "env {value:?} should yield filter {expected:?}, got {filter:?}"
        );
    }

    unsafe { std::env::remove_var(PROGRAM_LOG_LEVEL) };
}

#[test]
#[serial]
fn enabled_follows_the_global_max_level() {
    log::set_max_level(LevelFilter::Info);

    let info = Metadata::builder().level(Level::Info).target("t").build();
    let debug = Metadata::builder().level(Level::Debug).target("t").build();
    assert!(LOGGER.enabled(&info));
    assert!(!LOGGER.enabled(&debug));

    log::set_max_level(LevelFilter::Off);
    assert!(!LOGGER.enabled(&info));

    log::set_max_level(LevelFilter::Warn);
}

#[test]
#[serial]
fn logger_writes_all_levels_without_panicking() {
    log::set_max_level(LevelFilter::Trace);

    for lvl in [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ] {
        LOGGER.log(
            &Record::builder()
                .level(lvl)
                .target("pronto::test")
                .args(format_args!("message"))
                .build(),
        );
    }
    LOGGER.flush();

    log::set_max_level(LevelFilter::Warn);
}

#[test]
#[serial]
fn second_install_fails_and_keeps_the_first() {
    // Whichever call lands first in the test binary owns the logger slot.
    let first = init_with(LevelFilter::Error);
    let second = init_with(LevelFilter::Trace);
    assert!(second.is_err(), "second install must be rejected");
    if first.is_ok() {
        assert_eq!(log::max_level(), LevelFilter::Error);
    }

    log::set_max_level(LevelFilter::Warn);
}

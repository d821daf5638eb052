// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn set_color_env(no_color: Option<&str>, color: Option<&str>) {
    match no_color {
        Some(v) => std::env::set_var("NO_COLOR", v),
        None => std::env::remove_var("NO_COLOR"),
    }
    match color {
        Some(v) => std::env::set_var("COLOR", v),
        None => std::env::remove_var("COLOR"),
    }
}

#[test]
#[serial(env)]
fn no_color_beats_force() {
    set_color_env(Some("1"), Some("1"));
    assert!(!enabled(true));
    set_color_env(None, None);
}

#[test]
#[serial(env)]
fn force_color_without_terminal() {
    set_color_env(None, Some("1"));
    assert!(enabled(false));
    set_color_env(None, None);
}

#[test]
#[serial(env)]
fn terminal_decides_by_default() {
    set_color_env(None, None);
    assert!(enabled(true));
    assert!(!enabled(false));
}

#[test]
#[serial(env)]
fn styles_are_plain_when_color_disabled() {
    set_color_env(Some("1"), None);
    let plain = format!("{:?}", styles());
    set_color_env(None, None);

    assert_eq!(plain, format!("{:?}", Styles::plain()));
}

#[test]
#[serial(env)]
fn failure_banner_is_red_when_forced() {
    set_color_env(None, Some("1"));
    let banner = failure("JOB FAILURE:");
    set_color_env(None, None);

    assert_eq!(banner, "\x1b[1;31mJOB FAILURE:\x1b[0m");
}

#[test]
#[serial(env)]
fn failure_banner_is_plain_when_disabled() {
    set_color_env(Some("1"), None);
    let banner = failure("JOB FAILURE:");
    set_color_env(None, None);

    assert_eq!(banner, "JOB FAILURE:");
}

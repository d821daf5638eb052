// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn script_without_interpreter_gets_bash() {
    assert_eq!(
        Payload::script("echo hi"),
        Payload::Script("#!/bin/bash\necho hi".to_string())
    );
}

#[yare::parameterized(
    sh     = { "#!/bin/sh\necho hi" },
    python = { "#!/usr/bin/env python3\nprint('hi')\n" },
)]
fn script_with_interpreter_is_untouched(script: &str) {
    assert_eq!(Payload::script(script), Payload::Script(script.to_string()));
}

#[test]
fn inline_command_joins_words() {
    assert_eq!(
        Payload::inline_command(&["make", "-j4", "test"]),
        Payload::Script("#!/bin/bash\nmake -j4 test".to_string())
    );
}

#[test]
fn describe_payloads() {
    assert_eq!(
        Payload::exec(["ls", "-l"]).describe(),
        "exec: ls -l"
    );
    assert_eq!(
        Payload::script("echo hi").describe(),
        "script (2 lines): echo hi"
    );
}

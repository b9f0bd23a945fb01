//! BDD step definitions for `tests/features/callmon_cli.feature`.

use super::support::*;

use std::cell::RefCell;
use std::process::ExitCode;

use rstest_bdd_macros::{given, scenario, then, when};

#[given("a fake device streaming a ring, pick-up and hang-up")]
fn given_fake_device(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .start_device(RING_AND_HANG_UP, 7)
        .expect("failed to start fake device");
}

#[given("no device is listening")]
fn given_no_device(world: &RefCell<TestWorld>) {
    let port = unused_port().expect("probe port");
    world.borrow_mut().point_at(port);
}

#[given("a capture file containing a ring, pick-up and hang-up")]
fn given_capture_file(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .write_capture(RING_AND_HANG_UP)
        .expect("failed to write capture");
}

#[when("the operator runs \"{command}\"")]
fn when_operator_runs(world: &RefCell<TestWorld>, command: String) {
    world.borrow_mut().run(&command).expect("run completes");
}

#[then("the command succeeds")]
fn then_succeeds(world: &RefCell<TestWorld>) {
    world
        .borrow()
        .assert_exit_code(ExitCode::SUCCESS)
        .expect("successful exit");
}

#[then("the command fails")]
fn then_fails(world: &RefCell<TestWorld>) {
    world
        .borrow()
        .assert_exit_code(ExitCode::FAILURE)
        .expect("failing exit");
}

#[then("stdout lists the kinds \"{kinds}\"")]
fn then_stdout_kinds(world: &RefCell<TestWorld>, kinds: String) {
    let expected: Vec<&str> = kinds.split(", ").collect();
    let actual = world.borrow().stdout_kinds().expect("json stdout");
    assert_eq!(actual, expected);
}

#[then("stdout mentions \"{text}\"")]
fn then_stdout_mentions(world: &RefCell<TestWorld>, text: String) {
    let stdout = world.borrow().stdout_text().expect("stdout text");
    assert!(stdout.contains(&text), "stdout {stdout:?} lacks {text:?}");
}

#[then("stderr mentions \"{text}\"")]
fn then_stderr_mentions(world: &RefCell<TestWorld>, text: String) {
    let stderr = world.borrow().stderr_text().expect("stderr text");
    assert!(stderr.contains(&text), "stderr {stderr:?} lacks {text:?}");
}

#[scenario(path = "tests/features/callmon_cli.feature")]
fn callmon_cli_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}

use super::support::{StaticConfigLoader, TestWorld, build_args};

use std::process::ExitCode;

use callmon_config::Config;
use rstest::rstest;

use crate::{IoStreams, OutputFormat, ResolvedOutputFormat, run_with_loader};

fn run_with_config(config: Config, command: &str) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(config);
    let mut io = IoStreams::new(&mut stdout, &mut stderr, false);
    let exit = run_with_loader(build_args(command), &mut io, &loader);
    (
        exit,
        String::from_utf8(stdout).expect("stdout utf8"),
        String::from_utf8(stderr).expect("stderr utf8"),
    )
}

#[rstest]
#[case(OutputFormat::Auto, true, ResolvedOutputFormat::Human)]
#[case(OutputFormat::Auto, false, ResolvedOutputFormat::Json)]
#[case(OutputFormat::Human, false, ResolvedOutputFormat::Human)]
#[case(OutputFormat::Json, true, ResolvedOutputFormat::Json)]
fn output_format_resolves_against_terminal(
    #[case] format: OutputFormat,
    #[case] is_terminal: bool,
    #[case] expected: ResolvedOutputFormat,
) {
    assert_eq!(format.resolve(is_terminal), expected);
}

#[test]
fn replay_uses_configured_delimiter() {
    let mut world = TestWorld::default();
    world
        .write_capture(b"01.02.23 10:11:12;RING;5;a;b;\n01.02.23 10:12:02;DISCONNECT;5;9;\n")
        .expect("capture written");
    world.config.line_delimiter = String::from("\\n");

    world
        .run("replay {capture} --output json")
        .expect("run completes");

    world
        .assert_exit_code(ExitCode::SUCCESS)
        .expect("replay succeeds");
    assert_eq!(
        world.stdout_kinds().expect("json output"),
        ["ring", "hangUp"]
    );
}

#[test]
fn replay_skips_noise_and_flushes_unterminated_tail() {
    let mut world = TestWorld::default();
    world
        .write_capture(b"garbage\r\n\r\n01.02.23 10:12:02;DISCONNECT;5;9;")
        .expect("capture written");

    world.run("replay {capture} --output json").expect("run");

    assert_eq!(world.stdout_kinds().expect("json output"), ["hangUp"]);
}

#[test]
fn empty_delimiter_is_a_configuration_error() {
    let config = Config {
        line_delimiter: String::new(),
        ..Config::default()
    };
    let (exit, _, stderr) = run_with_config(config, "replay -");

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stderr.contains("line delimiter must not be empty"), "{stderr}");
}

#[rstest]
#[case("", "Usage")]
#[case("listen", "Usage")]
#[case("watch --output xml", "invalid value 'xml'")]
fn usage_errors_fail_without_loading(#[case] command: &str, #[case] expected: &str) {
    let (exit, stdout, stderr) = run_with_config(Config::default(), command);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(stderr.contains(expected), "{stderr}");
}

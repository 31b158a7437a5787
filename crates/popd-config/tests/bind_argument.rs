//! Resolution of the leading bind argument and the forwarded vector.

use std::ffi::OsString;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;

use popd_config::{DEFAULT_PORT, Invocation, ServerConfig};
use rstest::rstest;

fn argv(items: &[&str]) -> Vec<OsString> {
    items.iter().map(OsString::from).collect()
}

fn serve(items: &[&str]) -> (ServerConfig, Vec<OsString>) {
    match Invocation::parse(argv(items)).expect("parse") {
        Invocation::Serve { config, forwarded } => (config, forwarded.as_slice().to_vec()),
        Invocation::Version => panic!("unexpected version query"),
    }
}

#[rstest]
#[case(&["popd", "199.46.50.7:8110", "-S"], SocketAddrV4::new(Ipv4Addr::new(199, 46, 50, 7), 8110))]
#[case(&["popd", "8110", "-S"], SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8110))]
#[case(&["popd", ":8110", "-S"], SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8110))]
#[case(&["popd", "10.0.0.2", "-S"], SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), DEFAULT_PORT))]
#[case(&["popd", "-S"], SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))]
fn resolves_bind_address(#[case] items: &[&str], #[case] expected: SocketAddrV4) {
    let (config, _) = serve(items);
    assert_eq!(config.bind(), expected);
}

#[test]
fn forwarded_vector_drops_only_the_bind_argument() {
    let (_, forwarded) = serve(&["/usr/sbin/popd", "8110", "-S", "-T600", "-b", "/var/spool/bulls"]);
    assert_eq!(
        forwarded,
        argv(&["/usr/sbin/popd", "-S", "-T600", "-b", "/var/spool/bulls"])
    );
}

#[test]
fn forwarded_vector_is_untouched_without_bind_argument() {
    let items = ["popd", "-d", "-t", "/tmp/pop.trace", "-R"];
    let (_, forwarded) = serve(&items);
    assert_eq!(forwarded, argv(&items));
}

#[test]
fn trace_flag_sets_debug_and_path() {
    let (config, _) = serve(&["popper", "110", "-t", "/tmp/pop.trace"]);
    assert!(config.debug());
    assert_eq!(config.trace_path(), Some(Path::new("/tmp/pop.trace")));
    assert_eq!(config.program_name(), "popper");
}

#[test]
fn debug_flag_without_trace() {
    let (config, _) = serve(&["popd", "-d"]);
    assert!(config.debug());
    assert_eq!(config.trace_path(), None);
}

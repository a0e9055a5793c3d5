#![cfg(feature = "live")]

use std::process::{Command, Output};

const USAGE: &str = "syntax: pcap-test <interface>\nsample: pcap-test wlan0\n";

fn pcap_test(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pcap-test"))
        .args(args)
        .output()
        .expect("run pcap-test")
}

#[test]
fn test_missing_interface_prints_usage() {
    let out = pcap_test(&[]);
    assert!(!out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), USAGE);
}

#[test]
fn test_extra_argument_prints_usage() {
    let out = pcap_test(&["eth0", "eth1"]);
    assert!(!out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), USAGE);
}

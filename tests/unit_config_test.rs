use ctdbrec::config::Config;
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn minimal_config_fills_in_every_default() {
    let file = write_config("local_nid = 3\n");
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.local_nid, 3);
    assert_eq!(config.socket, "/var/run/ctdbrec/ctdbd.sock");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.tick_interval, std::time::Duration::from_secs(1));
    assert_eq!(config.rpc_deadline, std::time::Duration::from_secs(2));
}

#[test]
fn explicit_fields_override_defaults() {
    let file = write_config(
        "local_nid = 1\nsocket = \"/tmp/ctdbd.sock\"\ntick_interval = \"500ms\"\nrpc_deadline = \"3s\"\nrole = \"trust-external-election\"\n",
    );
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.socket, "/tmp/ctdbd.sock");
    assert_eq!(config.tick_interval, std::time::Duration::from_millis(500));
    assert_eq!(config.rpc_deadline, std::time::Duration::from_secs(3));
}

#[test]
fn missing_file_is_an_error() {
    assert!(Config::from_file("/nonexistent/path/recoveryd.toml").is_err());
}

#[test]
fn malformed_toml_is_an_error() {
    let file = write_config("this is not valid toml {{{");
    assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
}

#[test]
fn empty_socket_path_is_rejected() {
    let file = write_config("local_nid = 0\nsocket = \"\"\n");
    assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
}

#[test]
fn zero_tick_interval_is_rejected() {
    let file = write_config("local_nid = 0\ntick_interval = \"0s\"\n");
    assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
}

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use vigil_config::{ConfigError, RawSettings, Settings, parse_raw};
use yare::parameterized;

const FILE_LAYER: &str = r#"
managers:
  - name: manager-1
    public_ip: 10.0.0.1
    private_ip: 192.168.0.1
  - name: manager-2
    public_ip: 10.0.0.2
credentials:
  username: file-user
  password: file-pass
timeouts:
  poll_interval_ms: 3000
  leader_election_ms: 150000
"#;

const HANDLER_LAYER: &str = r#"
credentials:
  password: handler-pass
ssh:
  user: rocky
  key_path: /keys/id_rsa
"#;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_configured() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::resolve(RawSettings::default(), RawSettings::default(), env(&[]))?;
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.timeouts.leader_election, Duration::from_secs(150));
    assert_eq!(settings.credentials.tenant, "default_tenant");
    assert!(!settings.no_cleanup);
    Ok(())
}

#[test]
fn precedence_env_over_handler_over_file() -> Result<(), Box<dyn std::error::Error>> {
    let file = parse_raw(FILE_LAYER)?;
    let handler = parse_raw(HANDLER_LAYER)?;
    let settings = Settings::resolve(
        file,
        handler,
        env(&[("VIGIL_SSH_USER", "admin"), ("VIGIL_POLL_INTERVAL_MS", "500")]),
    )?;

    // file only
    assert_eq!(settings.credentials.username, "file-user");
    // handler beats file
    assert_eq!(settings.credentials.password, "handler-pass");
    // env beats handler
    assert_eq!(settings.ssh.user, "admin");
    assert_eq!(settings.ssh.key_path.as_deref(), Some(std::path::Path::new("/keys/id_rsa")));
    // env beats file
    assert_eq!(settings.timeouts.poll_interval, Duration::from_millis(500));
    assert_eq!(settings.timeouts.leader_election, Duration::from_secs(150));
    Ok(())
}

#[test]
fn private_ip_defaults_to_public() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_raw(parse_raw(FILE_LAYER)?)?;
    assert_eq!(settings.managers.len(), 2);
    let m2 = &settings.managers[1];
    assert_eq!(m2.private_ip, "10.0.0.2".parse::<IpAddr>()?);
    assert_eq!(settings.managers[0].private_ip, "192.168.0.1".parse::<IpAddr>()?);
    Ok(())
}

#[test]
fn duplicate_host_names_rejected() {
    let raw = parse_raw(
        "managers:\n  - { name: m, public_ip: 10.0.0.1 }\n  - { name: m, public_ip: 10.0.0.2 }\n",
    )
    .unwrap();
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, ConfigError::Constraint { .. }), "got {err:?}");
}

#[test]
fn handler_hosts_replace_file_hosts() -> Result<(), Box<dyn std::error::Error>> {
    let file = parse_raw(FILE_LAYER)?;
    let handler = parse_raw("managers:\n  - { name: only, public_ip: 10.1.1.1 }\n")?;
    let settings = Settings::resolve(file, handler, env(&[]))?;
    assert_eq!(settings.managers.len(), 1);
    assert_eq!(settings.managers[0].name, "only");
    Ok(())
}

#[test]
fn invalid_timeout_env_is_reported() {
    let err = Settings::resolve(
        RawSettings::default(),
        RawSettings::default(),
        env(&[("VIGIL_HEALTH_TIMEOUT_MS", "soon")]),
    )
    .unwrap_err();
    assert!(err.to_string().contains("VIGIL_HEALTH_TIMEOUT_MS"), "got {err}");
}

#[test]
fn zero_poll_interval_rejected() {
    let raw = parse_raw("timeouts:\n  poll_interval_ms: 0\n").unwrap();
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn empty_document_is_empty_layer() {
    assert_eq!(parse_raw("   \n").unwrap(), RawSettings::default());
}

#[test]
fn malformed_yaml_is_parse_error() {
    assert!(matches!(parse_raw("managers: [unclosed"), Err(ConfigError::Parse(_))));
}

#[parameterized(
    one = { "1", true },
    yes = { "yes", true },
    true_word = { "true", true },
    zero = { "0", false },
    false_word = { "FALSE", false },
    blank = { "  ", false },
)]
fn no_cleanup_flag(value: &str, expected: bool) {
    let settings = Settings::resolve(
        RawSettings::default(),
        RawSettings::default(),
        env(&[("CLOUDIFY_TEST_NO_CLEANUP", value)]),
    )
    .unwrap();
    assert_eq!(settings.no_cleanup, expected);
}

//! Integration tests for the non-interactive phonebook commands

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// How the fake collection misbehaves
#[derive(Clone, Copy, Default)]
struct Faults {
    /// GET answers 500
    fail_list: bool,
    /// DELETE answers 404 even for listed ids
    stale_delete: bool,
}

/// Minimal HTTP/1.1 responder serving a `/persons` collection
struct FakeServer {
    url: String,
    contacts: Arc<Mutex<Vec<Value>>>,
}

impl FakeServer {
    fn start(contacts: Value) -> Self {
        Self::start_with(contacts, Faults::default())
    }

    fn start_with(contacts: Value, faults: Faults) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
        let port = listener.local_addr().expect("local addr").port();
        let contacts = Arc::new(Mutex::new(
            contacts.as_array().cloned().expect("contacts array"),
        ));

        let shared = Arc::clone(&contacts);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve(stream, &shared, faults);
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}/persons"),
            contacts,
        }
    }

    fn names(&self) -> Vec<String> {
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn contacts(&self) -> Vec<Value> {
        self.contacts.lock().unwrap().clone()
    }
}

fn serve(mut stream: TcpStream, contacts: &Mutex<Vec<Value>>, faults: Faults) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) if line == "\r\n" => break,
            Ok(_) => {
                if let Some((key, value)) = line.split_once(':') {
                    if key.trim().eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();

    let (status, payload) = match (method, path) {
        ("GET", "/persons") if faults.fail_list => ("500 Internal Server Error", json!({})),
        ("GET", "/persons") => ("200 OK", Value::Array(contacts.lock().unwrap().clone())),
        ("POST", "/persons") => match serde_json::from_slice::<Value>(&body) {
            Ok(created) => {
                contacts.lock().unwrap().push(created.clone());
                ("201 Created", created)
            }
            Err(_) => ("400 Bad Request", json!({ "error": "malformed" })),
        },
        ("DELETE", path) if path.starts_with("/persons/") => {
            let id: Option<i64> = path["/persons/".len()..].parse().ok();
            let mut contacts = contacts.lock().unwrap();
            let index = contacts.iter().position(|c| c["id"].as_i64() == id);
            match index {
                Some(index) if !faults.stale_delete => {
                    contacts.remove(index);
                    ("200 OK", json!({}))
                }
                _ => ("404 Not Found", json!({})),
            }
        }
        _ => ("404 Not Found", json!({})),
    };

    let payload = payload.to_string();
    let _ = write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let _ = stream.flush();
}

fn seed() -> Value {
    json!([
        { "id": 1, "name": "Arto Hellas", "number": "040-123456" },
        { "id": 2, "name": "Ada Lovelace", "number": "39-44-5323523" },
        { "id": "3", "name": "Dan Abramov", "number": "12-43-234345" }
    ])
}

/// Temporary config directory pointing at `server_url`
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new(server_url: &str) -> Self {
        Self::with_extra(server_url, "")
    }

    fn with_extra(server_url: &str, extra: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let log_file = temp_dir.path().join("phonebook.log");
        let contents = format!(
            "server_url = '{}'\nlog_file = '{}'\nrequest_timeout_ms = 3000\n{}",
            server_url,
            log_file.display(),
            extra
        );
        fs::write(&config_path, contents).unwrap();
        Self {
            temp_dir,
            config_path,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = phonebook_cmd();
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }

    fn log_contents(&self) -> String {
        fs::read_to_string(self.temp_dir.path().join("phonebook.log")).unwrap_or_default()
    }
}

fn phonebook_cmd() -> Command {
    let mut cmd = Command::cargo_bin("phonebook").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// A loopback port with nothing listening on it
fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/persons")
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    phonebook_cmd()
        .arg("--config")
        .arg(&missing)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_key_collision_is_rejected() {
    let server = FakeServer::start(seed());
    let env = TestEnv::with_extra(&server.url, "\n[keys.list]\ndelete = \"q\"\n");

    env.cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("key binding collision in [keys.list]"));
}

#[test]
fn test_invalid_server_override_is_rejected() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["--server", "ftp://example.com/persons", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http or https"));
}

#[test]
fn test_server_override_takes_precedence() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&closed_port_url());

    env.cmd()
        .args(["--server", &server.url, "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Arto Hellas"));
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_list_prints_rows_in_server_order() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd().arg("list").assert().success().stdout(
        "1\tArto Hellas\t040-123456\n2\tAda Lovelace\t39-44-5323523\n3\tDan Abramov\t12-43-234345\n",
    );
    assert!(env.log_contents().contains("starting phonebook"));
}

#[test]
fn test_list_filter_is_case_sensitive() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["list", "--filter", "A"])
        .assert()
        .success()
        .stdout("1\tArto Hellas\t040-123456\n2\tAda Lovelace\t39-44-5323523\n3\tDan Abramov\t12-43-234345\n");

    env.cmd()
        .args(["list", "--filter", "ada"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_list_reports_unreachable_server() {
    let env = TestEnv::new(&closed_port_url());

    env.cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Unable to load contacts from the server",
        ));
}

#[test]
fn test_list_reports_server_error() {
    let server = FakeServer::start_with(
        seed(),
        Faults {
            fail_list: true,
            ..Faults::default()
        },
    );
    let env = TestEnv::new(&server.url);

    env.cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Unable to load contacts from the server",
        ));
}

#[test]
fn test_add_creates_contact_with_next_id() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["add", "Mary Poppendieck", "39-23-6423122"])
        .assert()
        .success()
        .stdout("'Mary Poppendieck' added to phonebook\n");

    let created = server.contacts().last().cloned().unwrap();
    assert_eq!(created["name"], "Mary Poppendieck");
    assert_eq!(created["number"], "39-23-6423122");
    assert_eq!(created["id"], 4);
}

#[test]
fn test_add_duplicate_name_is_refused() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["add", "Arto Hellas", "000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Arto Hellas is already added to phonebook",
        ));
    assert_eq!(server.contacts().len(), 3);
}

#[test]
fn test_add_empty_name_is_refused() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["add", "", "000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Name field is required!"));
    assert_eq!(server.contacts().len(), 3);
}

#[test]
fn test_delete_removes_contact() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["delete", "Ada Lovelace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'Ada Lovelace' removed from phonebook"));

    assert_eq!(server.names(), vec!["Arto Hellas", "Dan Abramov"]);
}

#[test]
fn test_delete_already_gone_reports_error() {
    let server = FakeServer::start_with(
        seed(),
        Faults {
            stale_delete: true,
            ..Faults::default()
        },
    );
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["delete", "Ada Lovelace"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error occurred while attempting to remove 'Ada Lovelace' from phonebook",
        ));
}

#[test]
fn test_delete_unknown_name_fails() {
    let server = FakeServer::start(seed());
    let env = TestEnv::new(&server.url);

    env.cmd()
        .args(["delete", "Nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No contact named 'Nobody'"));
    assert_eq!(server.contacts().len(), 3);
}

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

#[tokio::test]
async fn test_login_stores_token_and_profile() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(serde_json::json!({"username": "joao", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "abc123",
            "token_type": "bearer",
            "username": "joao",
            "nome_completo": "João Silva"
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args(["login", "-u", "joao", "-p", "secret1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as João Silva."));

    let stored: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("credentials.json")).unwrap())
            .unwrap();
    assert_eq!(stored["rfid_token"], "abc123");
    assert!(stored["rfid_user"].as_str().unwrap().contains("joao"));

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Username:  joao"))
        .stdout(predicate::str::contains("Full name: João Silva"));
}

#[tokio::test]
async fn test_login_with_bad_credentials() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"detail": "Usuário ou senha incorretos"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args(["login", "-u", "joao", "-p", "wrong1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid username or password."));

    assert!(!dir.path().join("credentials.json").exists());
}

#[tokio::test]
async fn test_login_while_authenticated_reports_user() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("credentials.json"),
        serde_json::json!({
            "rfid_token": "abc123",
            "rfid_user": "{\"username\":\"joao\"}"
        })
        .to_string(),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args(["login", "-u", "maria", "-p", "secret1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already logged in as joao."));
}

#[tokio::test]
async fn test_login_gate_ignores_corrupt_profile() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("credentials.json"),
        serde_json::json!({
            "rfid_token": "abc123",
            "rfid_user": "{not json"
        })
        .to_string(),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "other",
            "token_type": "bearer",
            "username": "maria"
        })))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args(["login", "-u", "maria", "-p", "secret1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already logged in (no profile stored)."));

    let contents = fs::read_to_string(dir.path().join("credentials.json")).unwrap();
    assert!(contents.contains("abc123"));
}

#[test]
fn test_logout_clears_credentials() {
    let dir = tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");
    fs::write(
        &credentials,
        serde_json::json!({
            "rfid_token": "abc123",
            "rfid_user": "{\"username\":\"joao\"}"
        })
        .to_string(),
    )
    .unwrap();

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    let contents = fs::read_to_string(&credentials).unwrap();
    assert!(!contents.contains("rfid_token"));
    assert!(!contents.contains("rfid_user"));

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/usuarios"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"detail": "Usuário já existe"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args([
            "register",
            "-u",
            "joao",
            "-p",
            "secret1",
            "--confirm-password",
            "secret1",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Username already exists."));
}

#[tokio::test]
async fn test_register_validates_before_sending() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/usuarios"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args([
            "register",
            "-u",
            "maria",
            "-p",
            "secret1",
            "--confirm-password",
            "secret2",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Passwords do not match"));

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args(["register", "-u", "maria", "-p", "abc", "--confirm-password", "abc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[tokio::test]
async fn test_register_success() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/usuarios"))
        .and(body_json(serde_json::json!({
            "username": "maria",
            "password": "secret1",
            "nome_completo": "Maria Souza"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Usuário criado com sucesso",
            "username": "maria"
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("rfidctl")
        .env("RFID_HOME", dir.path())
        .env("RFID_API_URL", api_url(&server))
        .args([
            "register",
            "-u",
            "maria",
            "-p",
            "secret1",
            "--confirm-password",
            "secret1",
            "--name",
            "Maria Souza",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("User 'maria' created."));

    // Registering does not log in.
    assert!(!dir.path().join("credentials.json").exists());
}

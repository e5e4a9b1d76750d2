//! Drives the UCI client against a shell-script engine that speaks just
//! enough of the protocol to exercise the handshake, scoring and shutdown
//! paths without a real engine binary.

#![cfg(unix)]

use repertoire_engine::{replay_tokens, EngineConfig, EvalScore, GoLimit, UciEngine};
use repertoire_notation::split_moves;
use shakmaty::Color;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const STUB_ENGINE: &str = r#"#!/bin/sh
while read line; do
  case "$line" in
    uci)
      echo "id name stub-engine"
      echo "uciok"
      ;;
    isready)
      echo "readyok"
      ;;
    go*)
      echo "info depth 1 score cp 34 pv e2e4"
      echo "info depth 2 score cp 51 pv e2e4"
      echo "bestmove e2e4"
      ;;
    quit)
      exit 0
      ;;
  esac
done
"#;

fn write_stub(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("stub-engine.sh");
    std::fs::write(&path, STUB_ENGINE).expect("write stub");
    let mut perms = std::fs::metadata(&path).expect("stat stub").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod stub");
    path
}

fn config(path: PathBuf) -> EngineConfig {
    EngineConfig {
        path,
        threads: 1,
        hash_mb: 16,
        limit: GoLimit::MoveTime(Duration::from_millis(10)),
    }
}

#[tokio::test]
async fn scores_positions_from_the_requested_pov() {
    let temp = TempDir::new().expect("tempdir");
    let mut engine = UciEngine::spawn(&config(write_stub(&temp)))
        .await
        .expect("spawn stub engine");

    // After 1. e4 it is Black to move: the stub's +51 is relative to Black.
    let position = replay_tokens(&split_moves("e4")).expect("replay").position;

    let black_pov = engine.evaluate_pov(&position, Color::Black).await;
    assert_eq!(black_pov, Some(EvalScore::Cp(51)));

    let white_pov = engine.evaluate_pov(&position, Color::White).await;
    assert_eq!(white_pov, Some(EvalScore::Cp(-51)));

    engine.close().await;
}

#[tokio::test]
async fn failed_spawn_is_an_error_not_a_hang() {
    let config = config(PathBuf::from("/nonexistent/engine/binary"));
    assert!(UciEngine::spawn(&config).await.is_err());
}

use crate::error::{EngineError, Result};
use crate::replay::fen_of;
use crate::score::{to_pov, EvalScore};
use shakmaty::{Chess, Color, Position};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);
/// Slack on top of `go movetime` before a search is declared stuck.
const SEARCH_GRACE: Duration = Duration::from_secs(10);
const DEPTH_SEARCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-query search budget.
#[derive(Debug, Clone, Copy)]
pub enum GoLimit {
    MoveTime(Duration),
    Depth(u32),
}

impl GoLimit {
    fn command(self) -> String {
        match self {
            Self::MoveTime(t) => format!("go movetime {}", t.as_millis()),
            Self::Depth(d) => format!("go depth {d}"),
        }
    }

    fn deadline(self) -> Duration {
        match self {
            Self::MoveTime(t) => t + SEARCH_GRACE,
            Self::Depth(_) => DEPTH_SEARCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub threads: usize,
    pub hash_mb: usize,
    pub limit: GoLimit,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockfish"),
            threads: 2,
            hash_mb: 128,
            limit: GoLimit::MoveTime(Duration::from_millis(80)),
        }
    }
}

/// A running UCI engine session.
///
/// One serial process: queries go through `&mut self`, so callers cannot
/// overlap searches. Spawned once per run and [`UciEngine::close`]d at the
/// end; the child is also killed on drop as a backstop.
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    limit: GoLimit,
}

impl UciEngine {
    /// Spawn the engine process and run the UCI handshake.
    ///
    /// Handshake failures are fatal (the caller must know before any
    /// detection work whether keep decisions can be evaluator-driven);
    /// option-setting failures are only logged, matching how the session
    /// has always degraded.
    pub async fn spawn(config: &EngineConfig) -> Result<Self> {
        let mut child = Command::new(&config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::protocol("engine stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::protocol("engine stdout unavailable"))?;

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            limit: config.limit,
        };

        engine.send("uci").await?;
        engine.wait_for("uciok", HANDSHAKE_TIMEOUT).await?;
        engine.set_option("Threads", config.threads).await;
        engine.set_option("Hash", config.hash_mb).await;
        engine.send("isready").await?;
        engine.wait_for("readyok", HANDSHAKE_TIMEOUT).await?;

        log::info!("UCI engine ready: {}", config.path.display());
        Ok(engine)
    }

    /// Score a position from `pov`'s point of view; `None` when the engine
    /// produced no usable score. Never fails the caller.
    pub async fn evaluate_pov(&mut self, position: &Chess, pov: Color) -> Option<EvalScore> {
        let fen = fen_of(position);
        let relative = match self.analyse(&fen).await {
            Ok(score) => score,
            Err(e) => {
                log::warn!("Evaluation failed for '{fen}': {e}");
                None
            }
        }?;
        Some(to_pov(relative, position.turn(), pov))
    }

    async fn analyse(&mut self, fen: &str) -> Result<Option<EvalScore>> {
        self.send(&format!("position fen {fen}")).await?;
        let go = self.limit.command();
        self.send(&go).await?;

        let deadline = tokio::time::Instant::now() + self.limit.deadline();
        let mut last_score = None;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let line = timeout(remaining, self.stdout.next_line())
                .await
                .map_err(|_| EngineError::Timeout("bestmove"))??
                .ok_or_else(|| EngineError::protocol("engine closed its stdout mid-search"))?;

            if let Some(score) = parse_info_score(&line) {
                last_score = Some(score);
            }
            if line.starts_with("bestmove") {
                return Ok(last_score);
            }
        }
    }

    async fn set_option(&mut self, name: &str, value: usize) {
        if let Err(e) = self.send(&format!("setoption name {name} value {value}")).await {
            log::warn!("Failed to set engine option {name}={value}: {e}");
        }
    }

    async fn wait_for(&mut self, token: &'static str, budget: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let line = timeout(remaining, self.stdout.next_line())
                .await
                .map_err(|_| EngineError::Timeout(token))??
                .ok_or_else(|| {
                    EngineError::protocol(format!("engine closed its stdout before {token}"))
                })?;
            if line.trim() == token {
                return Ok(());
            }
        }
    }

    async fn send(&mut self, command: &str) -> Result<()> {
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Release the session: ask for a clean quit, kill on a slow exit.
    pub async fn close(mut self) {
        let _ = self.send("quit").await;
        match timeout(QUIT_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => log::debug!("Engine exited: {status}"),
            _ => {
                log::warn!("Engine did not quit in time, killing it");
                let _ = self.child.kill().await;
            }
        }
    }
}

/// Extract the score from a UCI `info` line, if it carries one.
fn parse_info_score(line: &str) -> Option<EvalScore> {
    if !line.starts_with("info") {
        return None;
    }
    let mut words = line.split_whitespace();
    while let Some(word) = words.next() {
        if word != "score" {
            continue;
        }
        let kind = words.next()?;
        let value: i32 = words.next()?.parse().ok()?;
        return match kind {
            "cp" => Some(EvalScore::Cp(value)),
            "mate" => Some(EvalScore::Mate(value)),
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_cp_and_mate_scores() {
        assert_eq!(
            parse_info_score("info depth 12 seldepth 18 score cp -34 nodes 4242 pv e7e5"),
            Some(EvalScore::Cp(-34))
        );
        assert_eq!(
            parse_info_score("info depth 20 score mate -2 pv d8h4"),
            Some(EvalScore::Mate(-2))
        );
    }

    #[test]
    fn tolerates_bound_markers_and_unrelated_lines() {
        assert_eq!(
            parse_info_score("info depth 5 score cp 101 lowerbound nodes 99"),
            Some(EvalScore::Cp(101))
        );
        assert_eq!(parse_info_score("bestmove e2e4 ponder e7e5"), None);
        assert_eq!(parse_info_score("info string NNUE evaluation enabled"), None);
        assert_eq!(parse_info_score("info depth 1 score wdl 1 0 0"), None);
    }
}

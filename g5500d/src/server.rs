//! TCP command listeners.
//!
//! Two dialects are served simultaneously on separate ports:
//!
//! - **rotctld**: the Hamlib-compatible line protocol. Set-type commands
//!   answer `RPRT n` with `n` = 0 or the negative error code; `p` answers
//!   two lines of degrees.
//! - **direct**: a permissive dialect for humans and scripts: bare verbs,
//!   bare coordinate pairs, and a one-shot HTTP `GET` with an
//!   `az=..&el=..` query answered as plain text.
//!
//! Both translate lines into [`Surface`] calls; all policy lives behind
//! the surface.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use g5500_common::state::MoveDir;
use g5500_control::Surface;
use tracing::{debug, warn};

/// A parsed client command, shared by both dialects.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    GetPos,
    SetPos(f64, f64),
    Move(MoveDir),
    Stop,
    Park,
    SimMode(u8),
    Info,
    Caps,
    Quit,
    Unknown,
}

enum LineResult {
    Reply(String),
    Quit,
}

// ─── rotctld dialect ────────────────────────────────────────────────

fn parse_rotctld(line: &str) -> Command {
    let mut tokens = line.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Command::Unknown;
    };
    match verb {
        "p" | "get_pos" => Command::GetPos,
        "P" | "set_pos" => {
            let az = tokens.next().and_then(|t| t.parse().ok());
            let el = tokens.next().and_then(|t| t.parse().ok());
            match (az, el) {
                (Some(az), Some(el)) => Command::SetPos(az, el),
                _ => Command::Unknown,
            }
        }
        // Second operand is speed; this hardware has none.
        "M" | "move" => tokens
            .next()
            .and_then(|t| t.parse().ok())
            .and_then(MoveDir::from_hamlib)
            .map_or(Command::Unknown, Command::Move),
        "S" | "stop" => Command::Stop,
        "K" | "park" => Command::Park,
        "_" | "get_info" => Command::Info,
        "1" | "dump_caps" => Command::Caps,
        "q" | "Q" | "quit" => Command::Quit,
        _ => Command::Unknown,
    }
}

fn rprt(code: i32) -> String {
    format!("RPRT {code}\n")
}

fn handle_rotctld_line(line: &str, surface: &Surface) -> LineResult {
    let reply = match parse_rotctld(line) {
        Command::GetPos => match surface.get_position() {
            Ok((az, el)) => format!("{az:.6}\n{el:.6}\n"),
            Err(e) => rprt(e.code()),
        },
        Command::SetPos(az, el) => match surface.set_position(az, el) {
            Ok(()) => rprt(0),
            Err(e) => rprt(e.code()),
        },
        Command::Move(dir) => match surface.move_dir(dir) {
            Ok(()) => rprt(0),
            Err(e) => rprt(e.code()),
        },
        Command::Stop => {
            surface.stop();
            rprt(0)
        }
        Command::Park => match surface.park() {
            Ok(()) => rprt(0),
            Err(e) => rprt(e.code()),
        },
        Command::SimMode(n) => match surface.set_sim_mode(n) {
            Ok(()) => rprt(0),
            Err(e) => rprt(e.code()),
        },
        Command::Info => format!("{}\n", surface.get_info()),
        Command::Caps => caps_text(surface),
        Command::Quit => return LineResult::Quit,
        Command::Unknown => rprt(-1),
    };
    LineResult::Reply(reply)
}

fn caps_text(surface: &Surface) -> String {
    let caps = surface.dump_caps();
    format!(
        "Model: {}\nAz range: {:.0}..{:.0}\nEl range: {:.0}..{:.0}\nStatus: {:?}\n",
        caps.model, caps.az_min_deg, caps.az_max_deg, caps.el_min_deg, caps.el_max_deg,
        caps.status
    )
}

// ─── direct dialect ─────────────────────────────────────────────────

fn parse_direct(line: &str) -> Command {
    let lower = line.to_ascii_lowercase();
    let mut tokens = lower.split_whitespace();
    let Some(verb) = tokens.next() else {
        return Command::Unknown;
    };

    // A bare coordinate pair is a set_pos.
    if let Ok(az) = verb.parse::<f64>() {
        if let Some(el) = tokens.next().and_then(|t| t.parse().ok()) {
            return Command::SetPos(az, el);
        }
        return Command::Unknown;
    }

    match verb {
        "p" | "pos" | "get_pos" => Command::GetPos,
        "set_pos" => {
            let az = tokens.next().and_then(|t| t.parse().ok());
            let el = tokens.next().and_then(|t| t.parse().ok());
            match (az, el) {
                (Some(az), Some(el)) => Command::SetPos(az, el),
                _ => Command::Unknown,
            }
        }
        "move" => match tokens.next() {
            Some("left" | "ccw") => Command::Move(MoveDir::Left),
            Some("right" | "cw") => Command::Move(MoveDir::Right),
            Some("up") => Command::Move(MoveDir::Up),
            Some("down") => Command::Move(MoveDir::Down),
            _ => Command::Unknown,
        },
        "s" | "stop" => Command::Stop,
        "k" | "park" => Command::Park,
        "sim" | "simulator" => tokens
            .next()
            .and_then(|t| t.parse().ok())
            .map_or(Command::Unknown, Command::SimMode),
        "info" => Command::Info,
        "caps" | "status" => Command::Caps,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Unknown,
    }
}

fn handle_direct_line(line: &str, surface: &Surface) -> LineResult {
    let reply = match parse_direct(line) {
        Command::GetPos => position_text(surface),
        Command::SetPos(az, el) => match surface.set_position(az, el) {
            Ok(()) => "OK\n".to_string(),
            Err(e) => format!("ERR {} {e}\n", e.code()),
        },
        Command::Move(dir) => match surface.move_dir(dir) {
            Ok(()) => "OK\n".to_string(),
            Err(e) => format!("ERR {} {e}\n", e.code()),
        },
        Command::Stop => {
            surface.stop();
            "OK\n".to_string()
        }
        Command::Park => match surface.park() {
            Ok(()) => "OK\n".to_string(),
            Err(e) => format!("ERR {} {e}\n", e.code()),
        },
        Command::SimMode(n) => match surface.set_sim_mode(n) {
            Ok(()) => "OK\n".to_string(),
            Err(e) => format!("ERR {} {e}\n", e.code()),
        },
        Command::Info => format!("{}\n", surface.get_info()),
        Command::Caps => caps_text(surface),
        Command::Quit => return LineResult::Quit,
        Command::Unknown => "ERR -1 unknown command\n".to_string(),
    };
    LineResult::Reply(reply)
}

fn position_text(surface: &Surface) -> String {
    match surface.get_position() {
        Ok((az, el)) => format!("AZ={az:.1} EL={el:.1}\n"),
        Err(e) => format!("ERR {} {e}\n", e.code()),
    }
}

// ─── one-shot HTTP over the direct port ─────────────────────────────

/// Pull `az` and `el` out of a request target's query string.
fn parse_query(target: &str) -> Option<(f64, f64)> {
    let (_, query) = target.split_once('?')?;
    let mut az = None;
    let mut el = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "az" => az = value.parse().ok(),
            "el" => el = value.parse().ok(),
            _ => {}
        }
    }
    Some((az?, el?))
}

fn handle_http(request_line: &str, surface: &Surface) -> String {
    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let body = match parse_query(target) {
        Some((az, el)) => match surface.set_position(az, el) {
            Ok(()) => "OK\n".to_string(),
            Err(e) => format!("ERR {} {e}\n", e.code()),
        },
        None => position_text(surface),
    };
    format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

// ─── listeners ──────────────────────────────────────────────────────

/// Accept loop for the rotctld dialect; one thread per connection.
pub fn serve_rotctld(listener: TcpListener, surface: Arc<Surface>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let surface = Arc::clone(&surface);
                let _ = thread::Builder::new()
                    .name("rotctld-conn".into())
                    .spawn(move || {
                        if let Err(e) = rotctld_conn(stream, &surface) {
                            debug!(%e, "rotctld connection closed");
                        }
                    });
            }
            Err(e) => warn!(%e, "rotctld accept failed"),
        }
    }
}

/// Accept loop for the direct dialect; one thread per connection.
pub fn serve_direct(listener: TcpListener, surface: Arc<Surface>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let surface = Arc::clone(&surface);
                let _ = thread::Builder::new()
                    .name("direct-conn".into())
                    .spawn(move || {
                        if let Err(e) = direct_conn(stream, &surface) {
                            debug!(%e, "direct connection closed");
                        }
                    });
            }
            Err(e) => warn!(%e, "direct accept failed"),
        }
    }
}

fn rotctld_conn(stream: TcpStream, surface: &Surface) -> std::io::Result<()> {
    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match handle_rotctld_line(line, surface) {
            LineResult::Reply(text) => writer.write_all(text.as_bytes())?,
            LineResult::Quit => break,
        }
    }
    Ok(())
}

fn direct_conn(stream: TcpStream, surface: &Surface) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let mut first = String::new();
    reader.read_line(&mut first)?;

    // A browser or curl speaks HTTP; answer the one request and close.
    if first.starts_with("GET ") {
        writer.write_all(handle_http(first.trim(), surface).as_bytes())?;
        return Ok(());
    }

    let line = first.trim();
    if !line.is_empty() {
        match handle_direct_line(line, surface) {
            LineResult::Reply(text) => writer.write_all(text.as_bytes())?,
            LineResult::Quit => return Ok(()),
        }
    }
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match handle_direct_line(line, surface) {
            LineResult::Reply(text) => writer.write_all(text.as_bytes())?,
            LineResult::Quit => break,
        }
    }
    Ok(())
}

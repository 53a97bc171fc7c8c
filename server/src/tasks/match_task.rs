//! The match session state machine: invitation over UDP, dual TCP join,
//! word-by-word play, scoring, and persistence.
//!
//! Composes the same async idioms used elsewhere in this crate — bounded
//! timeouts, `tokio::select!` racing multiple readiness sources, a small
//! owned-state struct — scaled up from one connection to two.

use crate::context::AppContext;
use crate::error::TaskError;
use crate::mail::Mail;
use crate::translator::normalize;
use rand::seq::SliceRandom;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::UdpSocket;
use wq_commons::ProtocolError;

/// Small, fixed vocabulary words are drawn from without repeats within a
/// single match (the "dictionary duplicate suppression" edge case).
const ITALIAN_WORDS: &[&str] = &[
    "casa", "cane", "gatto", "libro", "acqua", "pane", "sole", "luna", "mare",
    "montagna", "fiume", "albero", "fiore", "uccello", "pesce", "stella",
    "notte", "giorno", "amico", "citta",
];

pub async fn run(
    ctx: AppContext,
    challenger_conn: SocketAddr,
    challenger: String,
    friend: String,
) -> Result<(), TaskError> {
    if let Err(e) = precheck(&ctx, &challenger, &friend) {
        reply(&ctx, challenger_conn, e.to_string()).await?;
        return Err(e.into());
    }

    let invite_addr = ctx
        .presence
        .invite_address(&friend)
        .expect("presence checked online in precheck");

    let udp = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
        .await
        .map_err(anyhow::Error::from)?;
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
        .await
        .map_err(anyhow::Error::from)?;
    let match_port = listener.local_addr().map_err(anyhow::Error::from)?.port();

    udp.send_to(format!("{challenger}/{match_port}").as_bytes(), invite_addr)
        .await
        .map_err(anyhow::Error::from)?;

    let mut buf = [0u8; 512];
    let response = tokio::time::timeout(ctx.invitation_duration, udp.recv_from(&mut buf)).await;

    let accepted = match response {
        Err(_elapsed) => {
            let _ = udp
                .send_to(format!("TIMEOUT/{challenger}").as_bytes(), invite_addr)
                .await;
            let err = ProtocolError::InvitationTimedOut(friend.clone());
            reply(&ctx, challenger_conn, err.to_string()).await?;
            return Err(err.into());
        }
        Ok(Err(e)) => return Err(anyhow::Error::from(e).into()),
        Ok(Ok((n, _src))) => std::str::from_utf8(&buf[..n]).unwrap_or("").to_string(),
    };

    if accepted.trim() != "Y" {
        let err = ProtocolError::InvitationRefused(friend.clone());
        reply(&ctx, challenger_conn, err.to_string()).await?;
        return Err(err.into());
    }

    reply(
        &ctx,
        challenger_conn,
        format!("{friend} accepted your match invitation./{match_port}"),
    )
    .await?;

    let (chal_stream, chld_stream) =
        match await_join(&listener, challenger_conn.ip(), invite_addr.ip()).await {
            Ok(pair) => pair,
            Err(e) => return Err(e.into()),
        };

    let words = draw_words(&ctx).await;

    let outcome = play(&ctx, chal_stream, chld_stream, &words).await;
    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => return Err(e.into()),
    };

    if !outcome.scored {
        tracing::info!(%challenger, %friend, "match aborted: translation service unavailable, no scoring");
        return Ok(());
    }

    ctx.store
        .set_score(&challenger, outcome.challenger_score)
        .await
        .map_err(TaskError::from)?;
    ctx.store
        .set_score(&friend, outcome.challenged_score)
        .await
        .map_err(TaskError::from)?;

    tracing::info!(
        %challenger, %friend,
        challenger_score = outcome.challenger_score,
        challenged_score = outcome.challenged_score,
        "match finished"
    );

    Ok(())
}

fn precheck(ctx: &AppContext, challenger: &str, friend: &str) -> Result<(), ProtocolError> {
    if challenger == friend {
        return Err(ProtocolError::SelfFriend);
    }
    let user = ctx
        .store
        .get(challenger)
        .ok_or(ProtocolError::NotLoggedIn)?;
    if !user.friends.iter().any(|f| f == friend) {
        return Err(ProtocolError::NotFriends(friend.to_string()));
    }
    if !ctx.presence.is_online(friend) {
        return Err(ProtocolError::FriendOffline(friend.to_string()));
    }
    Ok(())
}

async fn reply(ctx: &AppContext, connection: SocketAddr, message: String) -> Result<(), TaskError> {
    ctx.depot
        .send(Mail {
            destination: connection,
            body: format!("{message}\n"),
        })
        .await
        .map_err(|_| anyhow::anyhow!("depot closed"))?;
    Ok(())
}

/// Accepts exactly two inbound connections and attributes each to the
/// challenger or the challenged player by comparing its remote IP against
/// the addresses recorded for the match.
async fn await_join(
    listener: &TcpListener,
    challenger_ip: std::net::IpAddr,
    challenged_ip: std::net::IpAddr,
) -> anyhow::Result<(TcpStream, TcpStream)> {
    let mut chal: Option<TcpStream> = None;
    let mut chld: Option<TcpStream> = None;

    while chal.is_none() || chld.is_none() {
        let (stream, peer) = listener.accept().await?;
        if peer.ip() == challenger_ip && chal.is_none() {
            chal = Some(stream);
        } else if peer.ip() == challenged_ip && chld.is_none() {
            chld = Some(stream);
        }
    }

    Ok((chal.unwrap(), chld.unwrap()))
}

async fn draw_words(ctx: &AppContext) -> Vec<(String, Vec<String>)> {
    let mut rng = rand::thread_rng();
    let chosen: Vec<&&str> = ITALIAN_WORDS
        .choose_multiple(&mut rng, ctx.num_words.min(ITALIAN_WORDS.len()))
        .collect();

    let mut words = Vec::with_capacity(chosen.len());
    for word in chosen {
        match ctx.translator.translate(word).await {
            Ok(translations) => words.push((word.to_string(), translations)),
            Err(e) => {
                tracing::warn!(word, error = %e, "translation unavailable for match");
                return Vec::new();
            }
        }
    }
    words
}

struct MatchOutcome {
    challenger_score: i64,
    challenged_score: i64,
    /// `false` on the translator-unavailable path: the match terminated
    /// early, both players were informed, and no score is owed to either
    /// (spec §7(d): "no scoring, no persistence").
    scored: bool,
}

/// Runs the word-by-word play loop against both player connections until
/// the deadline or both players have answered every word, then scores.
async fn play(
    ctx: &AppContext,
    chal_stream: TcpStream,
    chld_stream: TcpStream,
    words: &[(String, Vec<String>)],
) -> anyhow::Result<MatchOutcome> {
    if words.is_empty() {
        let (mut chal_w, _) = tokio::io::split(chal_stream);
        let (mut chld_w, _) = tokio::io::split(chld_stream);
        let msg = "END/Sorry, the translation service is unavailable. Try later.\n";
        let _ = chal_w.write_all(msg.as_bytes()).await;
        let _ = chld_w.write_all(msg.as_bytes()).await;
        return Ok(MatchOutcome {
            challenger_score: 0,
            challenged_score: 0,
            scored: false,
        });
    }

    let n = words.len();
    let (chal_r, mut chal_w) = tokio::io::split(chal_stream);
    let (chld_r, mut chld_w) = tokio::io::split(chld_stream);
    let mut chal_lines = BufReader::new(chal_r).lines();
    let mut chld_lines = BufReader::new(chld_r).lines();

    let mut idx_chal = 0usize;
    let mut idx_chld = 0usize;
    let mut ans_chal: Vec<String> = Vec::with_capacity(n);
    let mut ans_chld: Vec<String> = Vec::with_capacity(n);
    let mut chal_done = false;
    let mut chld_done = false;

    let deadline = tokio::time::Instant::now() + ctx.match_duration;
    let mut timed_out = false;

    while (!chal_done || !chld_done) && !timed_out {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining == Duration::ZERO {
            timed_out = true;
            break;
        }

        tokio::select! {
            line = chal_lines.next_line(), if !chal_done => {
                match line? {
                    Some(frame) => handle_frame(&frame, &mut idx_chal, &mut ans_chal, &mut chal_w, words).await?,
                    None => { fill_remaining(&mut ans_chal, n); idx_chal = n; chal_done = true; }
                }
            }
            line = chld_lines.next_line(), if !chld_done => {
                match line? {
                    Some(frame) => handle_frame(&frame, &mut idx_chld, &mut ans_chld, &mut chld_w, words).await?,
                    None => { fill_remaining(&mut ans_chld, n); idx_chld = n; chld_done = true; }
                }
            }
            _ = tokio::time::sleep(remaining) => {
                timed_out = true;
            }
        }

        if idx_chal >= n {
            chal_done = true;
        }
        if idx_chld >= n {
            chld_done = true;
        }
    }

    fill_remaining(&mut ans_chal, n);
    fill_remaining(&mut ans_chld, n);

    let chal_score = score_answers(&ans_chal, words);
    let chld_score = score_answers(&ans_chld, words);
    let (chal_score, chld_score) = apply_bonus(chal_score, chld_score);

    let chal_msg = result_message(chal_score, chld_score, timed_out);
    let chld_msg = result_message(chld_score, chal_score, timed_out);
    let _ = chal_w.write_all(format!("END/{chal_msg}\n").as_bytes()).await;
    let _ = chld_w.write_all(format!("END/{chld_msg}\n").as_bytes()).await;

    Ok(MatchOutcome {
        challenger_score: chal_score,
        challenged_score: chld_score,
        scored: true,
    })
}

async fn handle_frame(
    frame: &str,
    idx: &mut usize,
    answers: &mut Vec<String>,
    writer: &mut tokio::io::WriteHalf<TcpStream>,
    words: &[(String, Vec<String>)],
) -> anyhow::Result<()> {
    let body = frame.split('/').next().unwrap_or("").to_string();

    if body != "START" {
        answers.push(body);
        *idx += 1;
    }

    if *idx < words.len() {
        writer
            .write_all(format!("{}\n", words[*idx].0).as_bytes())
            .await?;
    }
    Ok(())
}

fn fill_remaining(answers: &mut Vec<String>, n: usize) {
    while answers.len() < n {
        answers.push(String::new());
    }
}

/// +2 for an exact (case-sensitive, post-normalization) match against any
/// acceptable translation, 0 for an empty answer, -1 otherwise.
fn score_answers(answers: &[String], words: &[(String, Vec<String>)]) -> i64 {
    answers
        .iter()
        .zip(words)
        .map(|(answer, (_, acceptable))| {
            if answer.is_empty() {
                0
            } else if acceptable.iter().any(|a| a == &normalize(answer)) {
                2
            } else {
                -1
            }
        })
        .sum()
}

fn apply_bonus(chal: i64, chld: i64) -> (i64, i64) {
    match chal.cmp(&chld) {
        std::cmp::Ordering::Greater => (chal + 3, chld),
        std::cmp::Ordering::Less => (chal, chld + 3),
        std::cmp::Ordering::Equal => (chal, chld),
    }
}

fn result_message(own: i64, other: i64, timed_out: bool) -> String {
    let prefix = if timed_out { "Time out: " } else { "" };
    let verdict = match own.cmp(&other) {
        std::cmp::Ordering::Greater => "You won.",
        std::cmp::Ordering::Less => "You lost.",
        std::cmp::Ordering::Equal => "You drew.",
    };
    format!("{prefix}Your score: {own}. Opponent's score: {other}. {verdict}")
}

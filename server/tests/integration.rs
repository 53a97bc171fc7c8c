//! End-to-end scenarios driven over real `TcpStream`s against a reactor
//! bound to an ephemeral port, the way the teacher's own integration tests
//! prefer real sockets over mocking them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::UdpSocket;
use wordquizzle_server::context::AppContext;
use wordquizzle_server::mail;
use wordquizzle_server::mail::MailRegistry;
use wordquizzle_server::presence::Presence;
use wordquizzle_server::reactor;
use wordquizzle_server::store::UserStore;
use wordquizzle_server::translator::Translator;

/// Binds a reactor to an ephemeral port over the given data directory and
/// returns its address, with the translator, word count and invitation
/// timeout the match scenarios need to control. Tests that need pre-seeded
/// users load and mutate the store directly before calling this, then hand
/// the directory off so the reactor's own `UserStore` reads the same
/// `Database.json`.
async fn spawn_server_with(
    data_dir: &std::path::Path,
    translator_url: &str,
    num_words: usize,
    invitation_secs: u64,
) -> SocketAddr {
    let store = Arc::new(UserStore::load(data_dir).await.unwrap());
    let presence = Arc::new(Presence::new());
    let registry = MailRegistry::new();
    let (depot, depot_rx) = mail::depot_channel();
    mail::spawn_mailman(depot_rx, registry.clone());

    let ctx = AppContext {
        store,
        presence,
        depot,
        registry,
        translator: Translator::new(translator_url.to_string()),
        num_words,
        match_duration: Duration::from_secs(60),
        invitation_duration: Duration::from_secs(invitation_secs),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(reactor::serve(ctx, listener, 4));
    addr
}

async fn spawn_server(data_dir: &std::path::Path) -> SocketAddr {
    spawn_server_with(data_dir, "http://localhost", 5, 1).await
}

/// A tiny HTTP stand-in for the MyMemory translation vendor: replies to
/// every request with the `{responseData: {translatedText}}`-shaped JSON
/// the real `Translator` expects, translating by a fixed Italian -> English
/// mapping that mirrors `match_task`'s own vocabulary so any word it happens
/// to draw resolves to a known answer.
async fn spawn_fake_translator() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let n = match stream.read(&mut buf).await {
                    Ok(n) if n > 0 => n,
                    _ => return,
                };
                let request = String::from_utf8_lossy(&buf[..n]);
                let word = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_once("q="))
                    .map(|(_, rest)| rest)
                    .and_then(|rest| rest.split(['&', ' ']).next())
                    .unwrap_or("");
                let translation = italian_to_english(word);
                let body = format!(r#"{{"responseData":{{"translatedText":"{translation}"}}}}"#);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            });
        }
    });
    addr
}

/// Mirrors `match_task::ITALIAN_WORDS`' fixed vocabulary so a test client
/// can answer correctly no matter which subset a match happens to draw.
fn italian_to_english(word: &str) -> &'static str {
    match word {
        "casa" => "house",
        "cane" => "dog",
        "gatto" => "cat",
        "libro" => "book",
        "acqua" => "water",
        "pane" => "bread",
        "sole" => "sun",
        "luna" => "moon",
        "mare" => "sea",
        "montagna" => "mountain",
        "fiume" => "river",
        "albero" => "tree",
        "fiore" => "flower",
        "uccello" => "bird",
        "pesce" => "fish",
        "stella" => "star",
        "notte" => "night",
        "giorno" => "day",
        "amico" => "friend",
        "citta" => "city",
        other => other,
    }
}

/// Drives one side of a match connection: announces itself, answers every
/// word the server sends with its known translation, and returns the text
/// after `END/` once both players are done.
async fn play_all_correctly(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    nick: &str,
) -> String {
    writer
        .write_all(format!("START/{nick}\n").as_bytes())
        .await
        .unwrap();
    loop {
        let line = read_line(reader).await;
        if let Some(result) = line.strip_prefix("END/") {
            return result.to_string();
        }
        let translation = italian_to_english(&line);
        writer
            .write_all(format!("{translation}/{nick}\n").as_bytes())
            .await
            .unwrap();
    }
}

async fn read_line(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> String {
    let mut buf = String::new();
    reader.read_line(&mut buf).await.unwrap();
    buf.trim_end_matches('\n').to_string()
}

async fn connect(
    addr: SocketAddr,
) -> (
    tokio::net::tcp::OwnedWriteHalf,
    BufReader<tokio::net::tcp::OwnedReadHalf>,
) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, write_half) = stream.into_split();
    (write_half, BufReader::new(read_half))
}

#[tokio::test]
async fn login_against_unknown_user_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server(dir.path()).await;
    let (mut w, mut r) = connect(addr).await;

    w.write_all(b"0 ghost pw 40000\n").await.unwrap();
    let resp = read_line(&mut r).await;
    assert!(resp.starts_with("Login error: user ghost not found"));
}

#[tokio::test]
async fn login_then_logout_closes_the_connection() {
    let dir = tempfile::tempdir().unwrap();
    {
        let seed = UserStore::load(dir.path()).await.unwrap();
        seed.register("alice", "a").await.unwrap();
    }
    let addr = spawn_server(dir.path()).await;
    let (mut w, mut r) = connect(addr).await;

    w.write_all(b"0 alice a 40000\n").await.unwrap();
    assert_eq!(read_line(&mut r).await, "Login successful.");

    w.write_all(b"1\n").await.unwrap();
    assert_eq!(read_line(&mut r).await, "Logout successful.");

    let mut buf = String::new();
    let n = r.read_line(&mut buf).await.unwrap();
    assert_eq!(n, 0, "connection should be closed after a successful logout");
}

#[tokio::test]
async fn friendship_is_symmetric_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    {
        let seed = UserStore::load(dir.path()).await.unwrap();
        seed.register("alice", "a").await.unwrap();
        seed.register("bob", "b").await.unwrap();
    }
    let addr = spawn_server(dir.path()).await;

    let (mut alice_w, mut alice_r) = connect(addr).await;
    let (mut bob_w, mut bob_r) = connect(addr).await;

    alice_w.write_all(b"0 alice a 40000\n").await.unwrap();
    assert_eq!(read_line(&mut alice_r).await, "Login successful.");

    bob_w.write_all(b"0 bob b 40001\n").await.unwrap();
    assert_eq!(read_line(&mut bob_r).await, "Login successful.");

    alice_w.write_all(b"2 bob\n").await.unwrap();
    assert_eq!(read_line(&mut alice_r).await, "bob is now your friend.");

    bob_w.write_all(b"3\n").await.unwrap();
    assert_eq!(read_line(&mut bob_r).await, "Your friends are: alice");
}

#[tokio::test]
async fn scoreboard_orders_by_score_descending() {
    let dir = tempfile::tempdir().unwrap();
    {
        let seed = UserStore::load(dir.path()).await.unwrap();
        seed.register("alice", "a").await.unwrap();
        seed.register("bob", "b").await.unwrap();
        seed.register("carol", "c").await.unwrap();
        seed.add_friend("alice", "bob").await.unwrap();
        seed.add_friend("alice", "carol").await.unwrap();
        seed.set_score("alice", 10).await.unwrap();
        seed.set_score("bob", 3).await.unwrap();
        seed.set_score("carol", 7).await.unwrap();
    }
    let addr = spawn_server(dir.path()).await;

    let (mut w, mut r) = connect(addr).await;
    w.write_all(b"0 alice a 40000\n").await.unwrap();
    assert_eq!(read_line(&mut r).await, "Login successful.");

    w.write_all(b"5\n").await.unwrap();
    assert_eq!(read_line(&mut r).await, "alice 10 carol 7 bob 3");
}

#[tokio::test]
async fn second_login_of_the_same_nickname_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    {
        let seed = UserStore::load(dir.path()).await.unwrap();
        seed.register("alice", "a").await.unwrap();
    }
    let addr = spawn_server(dir.path()).await;

    let (mut first_w, mut first_r) = connect(addr).await;
    first_w.write_all(b"0 alice a 40000\n").await.unwrap();
    assert_eq!(read_line(&mut first_r).await, "Login successful.");

    let (mut second_w, mut second_r) = connect(addr).await;
    second_w.write_all(b"0 alice a 40001\n").await.unwrap();
    assert_eq!(
        read_line(&mut second_r).await,
        "Login error: alice is already logged in."
    );
}

#[tokio::test]
async fn invitation_timeout_notifies_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    {
        let seed = UserStore::load(dir.path()).await.unwrap();
        seed.register("alice", "a").await.unwrap();
        seed.register("bob", "b").await.unwrap();
        seed.add_friend("alice", "bob").await.unwrap();
    }
    let addr = spawn_server_with(dir.path(), "http://localhost", 3, 1).await;

    let (mut alice_w, mut alice_r) = connect(addr).await;
    alice_w.write_all(b"0 alice a 40000\n").await.unwrap();
    assert_eq!(read_line(&mut alice_r).await, "Login successful.");

    // bob's discovery client: a UDP socket bound at login time that the
    // invite is addressed to, and that never answers it.
    let bob_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let bob_udp_port = bob_udp.local_addr().unwrap().port();
    let (mut bob_w, mut bob_r) = connect(addr).await;
    bob_w
        .write_all(format!("0 bob b {bob_udp_port}\n").as_bytes())
        .await
        .unwrap();
    assert_eq!(read_line(&mut bob_r).await, "Login successful.");

    alice_w.write_all(b"6 bob\n").await.unwrap();

    let mut buf = [0u8; 512];
    let (n, _src) = bob_udp.recv_from(&mut buf).await.unwrap();
    let invite = std::str::from_utf8(&buf[..n]).unwrap();
    assert!(invite.starts_with("alice/"), "unexpected invite: {invite}");

    assert_eq!(
        read_line(&mut alice_r).await,
        "Match error: invitation to bob timed out."
    );

    let (n, _src) = bob_udp.recv_from(&mut buf).await.unwrap();
    assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), "TIMEOUT/alice");
}

#[tokio::test]
async fn happy_path_match_ends_in_a_tie() {
    let translator_addr = spawn_fake_translator().await;
    let dir = tempfile::tempdir().unwrap();
    {
        let seed = UserStore::load(dir.path()).await.unwrap();
        seed.register("alice", "a").await.unwrap();
        seed.register("bob", "b").await.unwrap();
        seed.add_friend("alice", "bob").await.unwrap();
    }
    let addr = spawn_server_with(
        dir.path(),
        &format!("http://{translator_addr}"),
        3,
        2,
    )
    .await;

    let (mut alice_w, mut alice_r) = connect(addr).await;
    alice_w.write_all(b"0 alice a 40000\n").await.unwrap();
    assert_eq!(read_line(&mut alice_r).await, "Login successful.");

    let bob_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let bob_udp_port = bob_udp.local_addr().unwrap().port();
    let (mut bob_w, mut bob_r) = connect(addr).await;
    bob_w
        .write_all(format!("0 bob b {bob_udp_port}\n").as_bytes())
        .await
        .unwrap();
    assert_eq!(read_line(&mut bob_r).await, "Login successful.");

    alice_w.write_all(b"6 bob\n").await.unwrap();

    let mut buf = [0u8; 512];
    let (n, invite_src) = bob_udp.recv_from(&mut buf).await.unwrap();
    let invite = std::str::from_utf8(&buf[..n]).unwrap();
    let (from, match_port) = invite.split_once('/').unwrap();
    assert_eq!(from, "alice");
    bob_udp.send_to(b"Y", invite_src).await.unwrap();

    assert_eq!(
        read_line(&mut alice_r).await,
        format!("bob accepted your match invitation./{match_port}")
    );

    let match_port: u16 = match_port.parse().unwrap();
    let match_addr = SocketAddr::from(([127, 0, 0, 1], match_port));

    // The match task attributes the two join connections by remote IP, and
    // both sides are loopback here, so whichever stream connects first is
    // treated as the challenger's: connect alice's first.
    let (mut alice_match_w, mut alice_match_r) = connect(match_addr).await;
    let (mut bob_match_w, mut bob_match_r) = connect(match_addr).await;

    let (alice_result, bob_result) = tokio::join!(
        play_all_correctly(&mut alice_match_w, &mut alice_match_r, "alice"),
        play_all_correctly(&mut bob_match_w, &mut bob_match_r, "bob"),
    );

    assert!(
        alice_result.ends_with("You drew."),
        "alice's result: {alice_result}"
    );
    assert!(
        bob_result.ends_with("You drew."),
        "bob's result: {bob_result}"
    );

    // A tie draws no bonus, so each player keeps exactly 2 points per word.
    assert!(alice_result.contains("Your score: 6."));
    assert!(bob_result.contains("Your score: 6."));
}

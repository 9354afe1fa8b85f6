// tests/socket_helpers.rs

//! Loopback TCP endpoints: port publication into argv, single-connection
//! negotiation, and server-socket closure.

use std::error::Error;

use ffdrive::{FfdriveError, FfmpegJob, Input, Output, TcpServer};
use test_utils::{init_tracing, with_timeout};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type TestResult = Result<(), Box<dyn Error>>;

/// Extract `port` from a `scheme://127.0.0.1:<port><suffix>` token.
fn port_of(url: &str) -> u16 {
    let rest = url
        .split("127.0.0.1:")
        .nth(1)
        .unwrap_or_else(|| panic!("no loopback host in {url}"));
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().expect("port digits")
}

#[tokio::test]
async fn bound_server_has_a_real_port() -> TestResult {
    init_tracing();

    let server = TcpServer::bind_loopback().await?;
    assert_ne!(server.port()?, 0);
    Ok(())
}

#[tokio::test]
async fn socket_input_serves_one_connection_and_closes() -> TestResult {
    init_tracing();

    let payload = [7u8; 64];
    let mut input = Input::from_socket("tcp", move |server: TcpListener| async move {
        let (mut conn, _) = server.accept().await?;
        conn.write_all(&payload).await?;
        Ok::<(), FfdriveError>(())
    });

    let worker = input
        .helper_worker()
        .await?
        .expect("socket input has a helper worker");

    // The published URL lands in argv at the -i slot with the real port.
    let job = FfmpegJob::new("ffmpeg")
        .input(input)
        .overwrite(true)
        .output(Output::to_url("out.mkv"));
    let argv = job.build_arguments()?;
    let i_slot = argv.iter().position(|t| t == "-i").expect("-i present");
    let url = &argv[i_slot + 1];
    assert!(url.starts_with("tcp://127.0.0.1:"), "unexpected url {url}");
    let port = port_of(url);
    assert_ne!(port, 0, "argv must never contain the unbound port");

    let serving = tokio::spawn(worker);

    // Dial in as the child would and take delivery of the payload.
    let mut conn = with_timeout(TcpStream::connect(("127.0.0.1", port))).await?;
    let mut received = [0u8; 64];
    with_timeout(conn.read_exact(&mut received)).await?;
    assert_eq!(received, payload);

    with_timeout(serving).await??;

    // Negotiation is over, so the server socket is gone.
    assert!(
        TcpStream::connect(("127.0.0.1", port)).await.is_err(),
        "server socket must be closed after negotiation"
    );
    Ok(())
}

#[tokio::test]
async fn socket_output_drains_the_connection() -> TestResult {
    init_tracing();

    let mut output = Output::to_socket_with_suffix("tcp", "?listen=0", |server: TcpListener| async move {
        let (mut conn, _) = server.accept().await?;
        let mut drained = Vec::new();
        conn.read_to_end(&mut drained).await?;
        if drained.len() != 64 {
            return Err(FfdriveError::IllegalState(format!(
                "expected 64 bytes, got {}",
                drained.len()
            )));
        }
        Ok::<(), FfdriveError>(())
    });

    let worker = output
        .helper_worker()
        .await?
        .expect("socket output has a helper worker");

    let job = FfmpegJob::new("ffmpeg")
        .input(Input::from_url("a.mp4"))
        .overwrite(true)
        .output(output);
    let argv = job.build_arguments()?;
    let url = argv.last().expect("output url is last");
    assert!(url.starts_with("tcp://127.0.0.1:"), "unexpected url {url}");
    assert!(url.ends_with("?listen=0"), "suffix must be preserved");
    let port = port_of(url);

    let serving = tokio::spawn(worker);

    let mut conn = with_timeout(TcpStream::connect(("127.0.0.1", port))).await?;
    conn.write_all(&[3u8; 64]).await?;
    drop(conn);

    with_timeout(serving).await??;
    Ok(())
}

#[tokio::test]
async fn failing_negotiator_fails_the_worker() -> TestResult {
    init_tracing();

    let mut input = Input::from_socket("tcp", |server: TcpListener| async move {
        drop(server);
        Err::<(), FfdriveError>(FfdriveError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "negotiation failed",
        )))
    });

    let worker = input.helper_worker().await?.expect("helper worker");
    assert!(with_timeout(worker).await.is_err());
    Ok(())
}

#[tokio::test]
async fn socket_input_cannot_be_primed_twice() -> TestResult {
    init_tracing();

    let mut input = Input::from_socket("tcp", |server: TcpListener| async move {
        drop(server);
        Ok::<(), FfdriveError>(())
    });

    let first = input.helper_worker().await?;
    assert!(first.is_some());

    match input.helper_worker().await {
        Err(FfdriveError::IllegalState(_)) => Ok(()),
        Ok(_) => panic!("expected IllegalState, got Ok"),
        Err(other) => panic!("expected IllegalState, got {other:?}"),
    }
}
